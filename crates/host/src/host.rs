//! Request dispatch for UI surfaces.
//!
//! Every request is answered with the uniform `{success, ...}` shape;
//! errors never escape as anything else.

use std::path::PathBuf;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gifcap_common::clock::file_timestamp_now;
use gifcap_common::config::{AppConfig, ConfigPatch, ConfigStore};
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::{
    EncodeConfig, HostEvent, HostRequest, HostResponse, Region, ResponseBody, Resolution,
    SaveRecordingRequest, TranscodeJob,
};
use gifcap_store::{ArtifactStore, RawCapture};
use gifcap_transcode::{transcode, TranscodeOptions, TranscodeProgress};
use gifcap_trigger::{TriggerAction, TriggerController};
use tokio::sync::{broadcast, oneshot, Mutex};

use crate::selector::SelectionOutcome;

const EVENT_CAPACITY: usize = 64;
const PROGRESS_CAPACITY: usize = 32;

/// The privileged side of the command boundary.
pub struct Host {
    config: Arc<ConfigStore>,
    trigger: Option<Arc<Mutex<TriggerController>>>,
    /// Serializes encoder runs.
    transcode_lock: Mutex<()>,
    pending_selection: Mutex<Option<oneshot::Sender<SelectionOutcome>>>,
    events: broadcast::Sender<HostEvent>,
    progress: broadcast::Sender<TranscodeProgress>,
}

impl Host {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (progress, _) = broadcast::channel(PROGRESS_CAPACITY);
        Self {
            config,
            trigger: None,
            transcode_lock: Mutex::new(()),
            pending_selection: Mutex::new(None),
            events,
            progress,
        }
    }

    /// Attach the trigger controller that owns the global shortcut.
    pub fn with_trigger(mut self, trigger: TriggerController) -> Self {
        self.trigger = Some(Arc::new(Mutex::new(trigger)));
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.get()
    }

    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::from_config(&self.config.get())
    }

    /// Subscribe to host notifications. Dropping the receiver
    /// unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Subscribe to encoder progress.
    pub fn subscribe_progress(&self) -> broadcast::Receiver<TranscodeProgress> {
        self.progress.subscribe()
    }

    pub fn emit(&self, event: HostEvent) {
        tracing::debug!(?event, "Host event");
        // Nobody listening is fine.
        let _ = self.events.send(event);
    }

    /// Register the configured shortcut with the attached controller.
    pub async fn register_shortcut(&self) -> GifcapResult<()> {
        let Some(trigger) = &self.trigger else {
            return Ok(());
        };
        let shortcut = self.config.get().shortcut;
        trigger.lock().await.register(&shortcut)
    }

    /// Handle one press of the shortcut.
    pub async fn press(&self) -> Option<TriggerAction> {
        let trigger = self.trigger.as_ref()?;
        let action = trigger.lock().await.trigger();
        Some(action)
    }

    pub async fn set_recording_owner(&self, owner: &str) {
        if let Some(trigger) = &self.trigger {
            trigger.lock().await.set_recording_owner(owner);
        }
    }

    /// Release the shortcut.
    pub async fn shutdown(&self) {
        if let Some(trigger) = &self.trigger {
            trigger.lock().await.unregister();
        }
        self.resolve_selection(SelectionOutcome::Cancelled).await;
    }

    /// Ask UI surfaces for a region. Any earlier pending selection is
    /// cancelled.
    pub async fn begin_selection(&self) -> oneshot::Receiver<SelectionOutcome> {
        let (tx, rx) = oneshot::channel();
        if let Some(previous) = self.pending_selection.lock().await.replace(tx) {
            let _ = previous.send(SelectionOutcome::Cancelled);
        }
        self.emit(HostEvent::StartSelection);
        rx
    }

    async fn resolve_selection(&self, outcome: SelectionOutcome) {
        if let Some(pending) = self.pending_selection.lock().await.take() {
            let _ = pending.send(outcome);
        }
    }

    /// Dispatch a request. Fire-and-forget requests yield `None`.
    pub async fn handle(&self, request: HostRequest) -> Option<HostResponse> {
        let expects_reply = request.expects_reply();
        let response = match request {
            HostRequest::SelectRegion { region } if region.is_empty() => {
                tracing::warn!(%region, "Selected region has no area; treating as cancelled");
                self.resolve_selection(SelectionOutcome::Cancelled).await;
                self.emit(HostEvent::SelectionCancelled);
                HostResponse::ok_empty()
            }
            HostRequest::SelectRegion { region } => {
                tracing::info!(%region, "Region selected");
                self.resolve_selection(SelectionOutcome::Confirmed(region))
                    .await;
                self.emit(HostEvent::RegionConfirmed { region });
                HostResponse::ok_empty()
            }
            HostRequest::CancelSelection => {
                tracing::info!("Selection cancelled");
                self.resolve_selection(SelectionOutcome::Cancelled).await;
                self.emit(HostEvent::SelectionCancelled);
                HostResponse::ok_empty()
            }
            HostRequest::SaveRecording(request) => self
                .save_recording(request)
                .await
                .map(|path| ResponseBody::Saved { path })
                .into(),
            HostRequest::GetConfig => HostResponse::ok(ResponseBody::Config {
                config: self.config.get(),
            }),
            HostRequest::SetConfig { config } => self
                .set_config(&config)
                .await
                .map(|config| ResponseBody::Config { config })
                .into(),
            HostRequest::ListArtifacts => self
                .store()
                .list()
                .await
                .map(|artifacts| ResponseBody::Artifacts { artifacts })
                .into(),
            HostRequest::ReadArtifact { path } => self
                .store()
                .read(&path)
                .await
                .map(|bytes| ResponseBody::Data {
                    data: STANDARD.encode(bytes),
                })
                .into(),
            HostRequest::DeleteArtifact { path } => self.store().delete(&path).await.into(),
            HostRequest::RevealArtifact { path } => self.store().reveal(&path).into(),
            HostRequest::SetRecordingState { recording } => {
                if let Some(trigger) = &self.trigger {
                    trigger.lock().await.set_recording_state(recording);
                }
                HostResponse::ok_empty()
            }
        };

        if !response.success {
            tracing::warn!(error = ?response.error, "Request failed");
        }
        expects_reply.then_some(response)
    }

    /// Apply a config patch. A new shortcut is registered before anything
    /// is persisted; if either step fails, the stored config and the
    /// active shortcut stay as they were.
    async fn set_config(&self, patch: &ConfigPatch) -> GifcapResult<AppConfig> {
        let before = self.config.get();
        let next = self.config.preview(patch)?;

        let Some(trigger) = self.trigger.as_ref().filter(|_| next.shortcut != before.shortcut)
        else {
            return self.config.set(patch);
        };

        let mut trigger = trigger.lock().await;
        let result = trigger
            .register(&next.shortcut)
            .and_then(|()| self.config.set(patch));
        if result.is_err() {
            if let Err(e) = trigger.register(&before.shortcut) {
                tracing::warn!(shortcut = %before.shortcut, error = %e, "Could not restore previous shortcut");
            }
        }
        result
    }

    /// Decode, persist, and transcode a recording sent by a UI surface.
    pub async fn save_recording(&self, request: SaveRecordingRequest) -> GifcapResult<PathBuf> {
        let limit = self.config.get().max_payload_bytes;
        let bytes = match request.video_data.decode(limit) {
            Ok(bytes) => bytes,
            Err(e) => {
                self.emit(HostEvent::RecordingFailed {
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let region = match (request.region, request.display_size, request.source_size) {
            (Some(region), Some(display), Some(source)) => {
                Some(region.map_between(display, source))
            }
            (region, _, _) => region,
        };
        self.save_blob(&bytes, region, request.source_size).await
    }

    /// Write the raw capture, transcode it, and drop the raw file on
    /// success. A failed transcode keeps the raw file for diagnosis.
    pub async fn save_blob(
        &self,
        bytes: &[u8],
        region: Option<Region>,
        source: Option<Resolution>,
    ) -> GifcapResult<PathBuf> {
        let result = self.save_blob_inner(bytes, region, source).await;
        match &result {
            Ok(path) => self.emit(HostEvent::RecordingSaved { path: path.clone() }),
            Err(e) => self.emit(HostEvent::RecordingFailed {
                error: e.to_string(),
            }),
        }
        result
    }

    async fn save_blob_inner(
        &self,
        bytes: &[u8],
        region: Option<Region>,
        source: Option<Resolution>,
    ) -> GifcapResult<PathBuf> {
        if bytes.is_empty() {
            return Err(GifcapError::invalid_payload("recording is empty"));
        }

        let config = self.config.get();
        let store = ArtifactStore::from_config(&config);
        let RawCapture {
            path: raw,
            artifact: output,
        } = store
            .write_raw_capture(bytes, &file_timestamp_now())
            .await?;

        let job = TranscodeJob::new(&raw, &output, EncodeConfig::from(&config))
            .with_region(region)
            .with_source(source);
        let options = TranscodeOptions::from_config(&config).with_progress(self.progress.clone());

        let result = {
            let _serial = self.transcode_lock.lock().await;
            transcode(&job, &options).await
        };

        match result {
            Ok(path) => {
                if let Err(e) = store.discard_raw_capture(&raw).await {
                    tracing::warn!(path = %raw.display(), error = %e, "Failed to remove raw capture");
                }
                tracing::info!(path = %path.display(), "Recording saved");
                Ok(path)
            }
            Err(e) => {
                tracing::warn!(
                    raw = %raw.display(),
                    error = %e,
                    "Transcode failed; raw capture kept"
                );
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use gifcap_common::error::EncodeFailure;
    use gifcap_model::VideoPayload;
    use gifcap_trigger::{NullHotkeyBackend, DEFAULT_OWNER};
    use tokio::sync::mpsc;

    use super::*;
    use crate::testing::*;

    fn save_request(bytes: &[u8]) -> HostRequest {
        HostRequest::SaveRecording(SaveRecordingRequest {
            video_data: VideoPayload::encode(bytes),
            region: None,
            source_size: None,
            display_size: None,
        })
    }

    #[tokio::test]
    async fn config_round_trips_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));

        let response = host
            .handle(HostRequest::SetConfig {
                config: ConfigPatch {
                    fps: Some(24),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(response.success);

        match host.handle(HostRequest::GetConfig).await.unwrap().body {
            ResponseBody::Config { config } => {
                assert_eq!(config.fps, 24);
                assert_eq!(config.shortcut, AppConfig::default().shortcut);
            }
            other => panic!("unexpected body {other:?}"),
        }

        let reopened = ConfigStore::open(dir.path().join("config.json"));
        assert_eq!(reopened.get().fps, 24);
    }

    #[tokio::test]
    async fn invalid_config_is_reported_not_stored() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));

        let response = host
            .handle(HostRequest::SetConfig {
                config: ConfigPatch {
                    fps: Some(0),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(!response.success);
        assert!(response.error.is_some());
        assert_eq!(host.config().fps, AppConfig::default().fps);
    }

    #[tokio::test]
    async fn fire_and_forget_requests_get_no_reply() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));

        assert!(host.handle(HostRequest::CancelSelection).await.is_none());
        assert!(host
            .handle(HostRequest::SetRecordingState { recording: true })
            .await
            .is_none());
        assert!(host
            .handle(HostRequest::SelectRegion {
                region: Region::new(0, 0, 4, 4).unwrap()
            })
            .await
            .is_none());
        assert!(host.handle(HostRequest::ListArtifacts).await.is_some());
    }

    #[tokio::test]
    async fn selection_resolves_from_ui_messages() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));
        let mut events = host.subscribe();

        let first = host.begin_selection().await;
        let second = host.begin_selection().await;
        assert_eq!(first.await.unwrap(), SelectionOutcome::Cancelled);

        let region = Region::new(5, 6, 70, 80).unwrap();
        host.handle(HostRequest::SelectRegion { region }).await;
        assert_eq!(second.await.unwrap(), SelectionOutcome::Confirmed(region));

        assert_eq!(events.try_recv().unwrap(), HostEvent::StartSelection);
        assert_eq!(events.try_recv().unwrap(), HostEvent::StartSelection);
        assert_eq!(
            events.try_recv().unwrap(),
            HostEvent::RegionConfirmed { region }
        );
    }

    #[tokio::test]
    async fn notified_recording_turns_press_into_stop() {
        let dir = tempfile::tempdir().unwrap();
        let (actions, mut received) = mpsc::unbounded_channel();
        let controller = TriggerController::new(Box::new(NullHotkeyBackend), actions);
        let host = Host::new(config_store(dir.path())).with_trigger(controller);

        assert_eq!(host.press().await, Some(TriggerAction::OpenSelection));

        host.handle(HostRequest::SetRecordingState { recording: true })
            .await;
        let stop = TriggerAction::StopRecording {
            owner: DEFAULT_OWNER.to_string(),
        };
        assert_eq!(host.press().await, Some(stop.clone()));

        assert_eq!(received.recv().await, Some(TriggerAction::OpenSelection));
        assert_eq!(received.recv().await, Some(stop));
    }

    #[tokio::test]
    async fn empty_recording_is_rejected_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));
        let mut events = host.subscribe();

        let response = host
            .handle(HostRequest::SaveRecording(SaveRecordingRequest {
                video_data: VideoPayload::from(String::new()),
                region: None,
                source_size: None,
                display_size: None,
            }))
            .await
            .unwrap();
        assert!(!response.success);
        assert!(matches!(
            events.try_recv().unwrap(),
            HostEvent::RecordingFailed { .. }
        ));
        assert!(file_names(&dir.path().join("out")).is_empty());

        let err = host.save_blob(&[], None, None).await.unwrap_err();
        assert!(matches!(err, GifcapError::InvalidPayload { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_transcode_keeps_the_raw_capture() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_store(dir.path());
        config
            .set(&ConfigPatch {
                encoder_path: Some(fake_encoder(
                    dir.path(),
                    "echo 'in.webm: Invalid data found when processing input' >&2\nexit 1",
                )),
                ..Default::default()
            })
            .unwrap();
        let host = Host::new(config);
        let mut events = host.subscribe();

        let err = host
            .save_recording(SaveRecordingRequest {
                video_data: VideoPayload::encode(b"not really webm"),
                region: None,
                source_size: None,
                display_size: None,
            })
            .await
            .unwrap_err();
        match &err {
            GifcapError::Encode {
                failure,
                diagnostics,
            } => {
                assert_eq!(*failure, EncodeFailure::Exit(1));
                assert!(diagnostics.contains("Invalid data"), "{diagnostics}");
            }
            other => panic!("unexpected error {other:?}"),
        }

        let names = file_names(&dir.path().join("out"));
        assert_eq!(names.len(), 1, "{names:?}");
        assert!(names[0].starts_with("temp_") && names[0].ends_with(".webm"));
        assert_eq!(
            std::fs::read(dir.path().join("out").join(&names[0])).unwrap(),
            b"not really webm"
        );
        assert!(matches!(
            events.try_recv().unwrap(),
            HostEvent::RecordingFailed { .. }
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn saved_recording_can_be_listed_read_and_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_store(dir.path());
        config
            .set(&ConfigPatch {
                encoder_path: Some(fake_encoder(dir.path(), WRITES_OUTPUT)),
                ..Default::default()
            })
            .unwrap();
        let host = Host::new(config);

        let path = match host.handle(save_request(b"webm")).await.unwrap().body {
            ResponseBody::Saved { path } => path,
            other => panic!("unexpected body {other:?}"),
        };
        assert_eq!(file_names(&dir.path().join("out")).len(), 1);

        match host.handle(HostRequest::ListArtifacts).await.unwrap().body {
            ResponseBody::Artifacts { artifacts } => {
                assert_eq!(artifacts.len(), 1);
                assert_eq!(artifacts[0].size_bytes, 6);
            }
            other => panic!("unexpected body {other:?}"),
        }

        match host
            .handle(HostRequest::ReadArtifact { path: path.clone() })
            .await
            .unwrap()
            .body
        {
            ResponseBody::Data { data } => assert_eq!(STANDARD.decode(data).unwrap(), b"GIF89a"),
            other => panic!("unexpected body {other:?}"),
        }

        let deleted = host
            .handle(HostRequest::DeleteArtifact { path: path.clone() })
            .await
            .unwrap();
        assert!(deleted.success);
        assert!(!path.exists());

        let again = host
            .handle(HostRequest::DeleteArtifact { path })
            .await
            .unwrap();
        assert!(!again.success);
    }

    #[tokio::test]
    async fn rejected_shortcut_leaves_config_and_hotkey_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let registered = Arc::new(std::sync::Mutex::new(None));
        let backend = ClaimedBackend {
            taken: "Ctrl+Alt+R".to_string(),
            registered: registered.clone(),
        };
        let (actions, _received) = mpsc::unbounded_channel();
        let controller = TriggerController::new(Box::new(backend), actions);
        let host = Host::new(config_store(dir.path())).with_trigger(controller);
        host.register_shortcut().await.unwrap();
        assert_eq!(registered.lock().unwrap().as_deref(), Some("Ctrl+Shift+G"));

        let response = host
            .handle(HostRequest::SetConfig {
                config: ConfigPatch {
                    shortcut: Some("ctrl+alt+r".to_string()),
                    fps: Some(30),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(!response.success);

        assert_eq!(host.config().shortcut, AppConfig::default().shortcut);
        assert_eq!(host.config().fps, AppConfig::default().fps);
        let reopened = ConfigStore::open(dir.path().join("config.json"));
        assert_eq!(reopened.get().shortcut, AppConfig::default().shortcut);
        assert_eq!(reopened.get().fps, AppConfig::default().fps);
        assert_eq!(registered.lock().unwrap().as_deref(), Some("Ctrl+Shift+G"));

        let response = host
            .handle(HostRequest::SetConfig {
                config: ConfigPatch {
                    shortcut: Some("Ctrl+Alt+S".to_string()),
                    ..Default::default()
                },
            })
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(host.config().shortcut, "Ctrl+Alt+S");
        assert_eq!(registered.lock().unwrap().as_deref(), Some("Ctrl+Alt+S"));
    }

    #[tokio::test]
    async fn zero_area_selection_is_a_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let host = Host::new(config_store(dir.path()));
        let mut events = host.subscribe();
        let pending = host.begin_selection().await;

        let request: gifcap_model::RequestEnvelope = serde_json::from_str(
            r#"{"type":"select-region","region":{"x":10,"y":10,"width":0.3,"height":50}}"#,
        )
        .unwrap();
        assert!(host.handle(request.request).await.is_none());

        assert_eq!(pending.await.unwrap(), SelectionOutcome::Cancelled);
        assert_eq!(events.try_recv().unwrap(), HostEvent::StartSelection);
        assert_eq!(events.try_recv().unwrap(), HostEvent::SelectionCancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn concurrent_saves_keep_both_recordings() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_store(dir.path());
        config
            .set(&ConfigPatch {
                encoder_path: Some(fake_encoder(dir.path(), WRITES_OUTPUT)),
                ..Default::default()
            })
            .unwrap();
        let host = Host::new(config);

        let (first, second) = tokio::join!(
            host.save_blob(b"first", None, None),
            host.save_blob(b"second", None, None)
        );
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first, second);
        assert!(first.exists() && second.exists());

        let names = file_names(&dir.path().join("out"));
        assert_eq!(names.len(), 2, "{names:?}");
        assert!(names.iter().all(|n| n.starts_with("recording_")), "{names:?}");
    }
}
