//! Shortcut-driven recording.

use std::sync::Arc;

use anyhow::Context;
use gifcap_capture::{GstScreenProvider, SessionStatus};
use gifcap_common::config::ConfigStore;
use gifcap_host::{run_daemon, FixedRegionSelector, Host, Recorder, RegionSelector, SlopSelector};
use gifcap_model::Region;

use super::{print_outcomes, shutdown_on_ctrl_c, trigger_setup};

pub async fn run(store: Arc<ConfigStore>, region: Option<Region>) -> anyhow::Result<()> {
    let status = SessionStatus::new();
    let setup = trigger_setup(Some(status.subscribe()));
    let host = Arc::new(Host::new(store).with_trigger(setup.controller));

    let shortcut = host.config().shortcut;
    host.register_shortcut()
        .await
        .with_context(|| format!("registering global shortcut {shortcut}"))?;

    let selector: Arc<dyn RegionSelector> = match region {
        Some(region) => Arc::new(FixedRegionSelector(region)),
        None => Arc::new(SlopSelector::new()),
    };
    let recorder = Recorder::new(host.clone(), Arc::new(GstScreenProvider::new()), status);

    println!("GifCap is running.");
    println!("  {shortcut}: select a region and start recording, press again to stop");
    println!("  Saving to: {}", host.store().dir().display());
    println!("Press Ctrl+C to quit.");
    println!();

    print_outcomes(host.subscribe());
    shutdown_on_ctrl_c(setup.shutdown);
    run_daemon(host, recorder, selector, setup.inputs).await?;
    Ok(())
}
