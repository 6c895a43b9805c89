//! Manage saved recordings.

use std::path::PathBuf;
use std::sync::Arc;

use gifcap_common::config::ConfigStore;
use gifcap_store::ArtifactStore;

pub async fn list(store: Arc<ConfigStore>, json: bool) -> anyhow::Result<()> {
    let artifacts = ArtifactStore::from_config(&store.get());
    let entries = artifacts.list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No recordings in {}", artifacts.dir().display());
        return Ok(());
    }

    println!("Recordings in {}:", artifacts.dir().display());
    for entry in &entries {
        println!(
            "  {}  {:>10}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            human_size(entry.size_bytes),
            entry.name
        );
    }
    Ok(())
}

pub async fn delete(store: Arc<ConfigStore>, path: PathBuf) -> anyhow::Result<()> {
    ArtifactStore::from_config(&store.get()).delete(&path).await?;
    println!("Deleted {}", path.display());
    Ok(())
}

pub fn reveal(store: Arc<ConfigStore>, path: PathBuf) -> anyhow::Result<()> {
    ArtifactStore::from_config(&store.get()).reveal(&path)?;
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.5 KiB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
