use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gifcap_common::config::{ConfigPatch, ConfigStore};
use gifcap_host::{transport, Host};
use serde_json::Value;
use tokio::io::AsyncReadExt;

fn load_fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("protocol")
        .join(name);

    let content = std::fs::read_to_string(path).expect("fixture should be readable");
    content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|line| format!("{line}\n"))
        .collect()
}

fn host_in(dir: &Path) -> Arc<Host> {
    let config = ConfigStore::open(dir.join("config.json"));
    config
        .set(&ConfigPatch {
            save_path: Some(dir.join("recordings").to_string_lossy().into_owned()),
            ..Default::default()
        })
        .unwrap();
    Arc::new(Host::new(Arc::new(config)))
}

async fn replay(host: Arc<Host>, transcript: &str) -> Vec<Value> {
    let (mut client, server) = tokio::io::duplex(256 * 1024);
    transport::serve(host, transcript.as_bytes(), server)
        .await
        .unwrap();

    let mut output = String::new();
    client.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn ui_session_transcript_gets_one_reply_per_request() {
    let dir = tempfile::tempdir().unwrap();
    let host = host_in(dir.path());
    let lines = replay(host.clone(), &load_fixture("ui-session.jsonl")).await;

    let replies: Vec<&Value> = lines.iter().filter(|v| v.get("success").is_some()).collect();
    let by_id: HashMap<u64, &Value> = replies
        .iter()
        .filter_map(|v| Some((v.get("id")?.as_u64()?, *v)))
        .collect();

    // Six identified requests plus the unparsable one, which has no id.
    assert_eq!(replies.len(), 7, "{replies:#?}");
    assert_eq!(by_id.len(), 6);

    assert_eq!(by_id[&1]["success"], true);

    assert_eq!(by_id[&2]["success"], true);
    assert_eq!(by_id[&2]["config"]["fps"], 24);
    assert_eq!(by_id[&2]["config"]["maxWidth"], 640);

    assert_eq!(by_id[&3]["artifacts"], serde_json::json!([]));

    assert_eq!(by_id[&4]["success"], false);
    assert!(by_id[&4]["error"].is_string());

    // Paths outside the save folder are refused.
    assert_eq!(by_id[&5]["success"], false);
    assert!(dir.path().join("config.json").exists());

    assert_eq!(by_id[&6]["success"], false);

    let malformed: Vec<&&Value> = replies.iter().filter(|v| v.get("id").is_none()).collect();
    assert_eq!(malformed.len(), 1);
    assert_eq!(malformed[0]["success"], false);

    assert_eq!(host.config().fps, 24);
    assert_eq!(host.config().max_width, 640);
}
