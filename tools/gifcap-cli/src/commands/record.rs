//! One-shot recording.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use gifcap_capture::{GstScreenProvider, SessionStatus};
use gifcap_common::config::ConfigStore;
use gifcap_host::{Host, Recorder, RegionSelector, SelectionOutcome, SlopSelector};
use gifcap_model::Region;
use tokio::sync::broadcast;

pub async fn run(
    store: Arc<ConfigStore>,
    region: Option<Region>,
    select: bool,
    duration: Option<u64>,
) -> anyhow::Result<()> {
    let region = if select {
        match SlopSelector::new().select().await? {
            SelectionOutcome::Confirmed(region) => Some(region),
            SelectionOutcome::Cancelled => {
                println!("Selection cancelled.");
                return Ok(());
            }
        }
    } else {
        region
    };

    let host = Arc::new(Host::new(store));
    let recorder = Recorder::new(
        host.clone(),
        Arc::new(GstScreenProvider::new()),
        SessionStatus::new(),
    );

    match region {
        Some(region) => println!("Recording region {region}"),
        None => println!("Recording the primary screen"),
    }
    match duration {
        Some(secs) => println!("Stopping after {secs}s or on Ctrl+C..."),
        None => println!("Press Ctrl+C to stop recording..."),
    }

    let stop = async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        };
        match duration {
            Some(secs) => {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                    _ = ctrl_c => {}
                }
            }
            None => ctrl_c.await,
        }
        println!();
        println!("Stopping, converting to GIF...");
    };

    let mut progress = host.subscribe_progress();
    tokio::spawn(async move {
        loop {
            match progress.recv().await {
                Ok(update) => {
                    print!("\r  {:.1}s encoded", update.out_time_secs);
                    let _ = std::io::stdout().flush();
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let path = recorder.record(region, stop).await?;
    println!();
    println!("Recording saved to: {}", path.display());
    Ok(())
}
