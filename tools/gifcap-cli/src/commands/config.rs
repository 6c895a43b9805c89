//! Read and change settings.

use std::sync::Arc;

use gifcap_common::config::{ConfigPatch, ConfigStore};

use crate::ConfigAction;

pub fn run(store: Arc<ConfigStore>, action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get => {
            println!("{}", serde_json::to_string_pretty(&store.get())?);
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
        }
        ConfigAction::Set {
            save_path,
            shortcut,
            fps,
            max_width,
            encoder_path,
            encoder_timeout,
        } => {
            let patch = ConfigPatch {
                save_path,
                shortcut,
                fps,
                max_width,
                encoder_path,
                encoder_timeout_secs: encoder_timeout,
            };
            anyhow::ensure!(!patch.is_empty(), "nothing to set; pass at least one option");
            let updated = store.set(&patch)?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
    }
    Ok(())
}
