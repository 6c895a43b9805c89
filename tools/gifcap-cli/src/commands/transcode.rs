//! Convert an existing video file.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use gifcap_common::config::ConfigStore;
use gifcap_model::{EncodeConfig, Region, TranscodeJob, ARTIFACT_EXTENSION};
use gifcap_transcode::{transcode, TranscodeOptions, TranscodeProgress};
use tokio::sync::broadcast;

pub async fn run(
    store: Arc<ConfigStore>,
    input: PathBuf,
    region: Option<Region>,
    fps: Option<u32>,
    max_width: Option<u32>,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = store.get();
    let mut encode = EncodeConfig::from(&config);
    if let Some(fps) = fps {
        anyhow::ensure!(fps > 0, "--fps must be greater than zero");
        encode.fps = fps;
    }
    if let Some(max_width) = max_width {
        encode.max_width = max_width;
    }

    let output = output.unwrap_or_else(|| input.with_extension(ARTIFACT_EXTENSION));
    anyhow::ensure!(
        output != input,
        "output would overwrite the input; pass --output"
    );

    println!("Transcoding {} -> {}", input.display(), output.display());
    let job = TranscodeJob::new(&input, &output, encode).with_region(region);

    let (progress_tx, mut progress_rx) = broadcast::channel::<TranscodeProgress>(16);
    let reporter = tokio::spawn(async move {
        let mut reported = false;
        loop {
            match progress_rx.recv().await {
                Ok(progress) => {
                    reported = true;
                    print!("\r  {:.1}s encoded", progress.out_time_secs);
                    let _ = std::io::stdout().flush();
                }
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        if reported {
            println!();
        }
    });

    let options = TranscodeOptions::from_config(&config).with_progress(progress_tx);
    let result = transcode(&job, &options).await;
    drop(options);
    let _ = reporter.await;

    let path = result?;
    println!("Wrote {}", path.display());
    Ok(())
}
