//! Host protocol over stdio for a UI process.

use std::sync::Arc;

use gifcap_common::config::ConfigStore;
use gifcap_host::{run_ui_trigger_bridge, transport, Host};
use tokio::io::BufReader;

use super::trigger_setup;

pub async fn run(store: Arc<ConfigStore>) -> anyhow::Result<()> {
    // The UI reports recording state; nothing is derived here.
    let setup = trigger_setup(None);
    let host = Arc::new(Host::new(store).with_trigger(setup.controller));
    if let Err(e) = host.register_shortcut().await {
        tracing::warn!(error = %e, "Shortcut not registered; trigger disabled");
    }

    let bridge = tokio::spawn(run_ui_trigger_bridge(host.clone(), setup.inputs));
    tracing::info!("Serving host protocol on stdio");

    let result = transport::serve(
        host.clone(),
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    let _ = setup.shutdown.send(true);
    let _ = bridge.await;
    host.shutdown().await;
    result?;
    Ok(())
}
