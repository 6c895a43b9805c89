//! Messages between the privileged host and a UI surface.
//!
//! Each message is one JSON object per line. Requests carry an optional
//! `id` that is echoed on the reply; fire-and-forget messages get no reply.
//! Every reply has the uniform `{ "success": bool, ... }` shape and
//! failures carry an `error` string.

use std::path::PathBuf;

use gifcap_common::config::{AppConfig, ConfigPatch};
use gifcap_common::error::GifcapError;
use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactInfo;
use crate::payload::VideoPayload;
use crate::region::{Region, Resolution};

/// A request with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(flatten)]
    pub request: HostRequest,
}

/// Messages a UI surface sends to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HostRequest {
    /// The overlay confirmed a rectangle.
    SelectRegion { region: Region },

    /// The overlay was dismissed.
    CancelSelection,

    /// Persist and transcode a finished capture.
    SaveRecording(SaveRecordingRequest),

    GetConfig,

    SetConfig {
        #[serde(default)]
        config: ConfigPatch,
    },

    ListArtifacts,

    ReadArtifact { path: PathBuf },

    DeleteArtifact { path: PathBuf },

    RevealArtifact { path: PathBuf },

    /// A UI-side capture started or stopped.
    SetRecordingState { recording: bool },
}

impl HostRequest {
    /// Fire-and-forget messages produce no reply.
    pub fn expects_reply(&self) -> bool {
        !matches!(
            self,
            HostRequest::SelectRegion { .. }
                | HostRequest::CancelSelection
                | HostRequest::SetRecordingState { .. }
        )
    }
}

/// Payload of a save-recording request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecordingRequest {
    /// Base64 video data.
    pub video_data: VideoPayload,

    /// Crop rectangle; `None` keeps the full frame.
    #[serde(default)]
    pub region: Option<Region>,

    /// Resolution the capture was actually negotiated at.
    #[serde(default)]
    pub source_size: Option<Resolution>,

    /// Logical display size the region was drawn in, when it differs
    /// from `source_size`.
    #[serde(default)]
    pub display_size: Option<Resolution>,
}

/// A reply with its correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,

    #[serde(flatten)]
    pub response: HostResponse,
}

/// Uniform reply shape. Absence of `success: true` is the only failure
/// signal a UI needs to check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostResponse {
    pub success: bool,

    #[serde(flatten)]
    pub body: ResponseBody,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Successful reply contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Saved { path: PathBuf },
    Config { config: AppConfig },
    Artifacts { artifacts: Vec<ArtifactInfo> },
    /// Base64 file contents.
    Data { data: String },
    Empty {},
}

impl HostResponse {
    pub fn ok(body: ResponseBody) -> Self {
        Self {
            success: true,
            body,
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self::ok(ResponseBody::Empty {})
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            body: ResponseBody::Empty {},
            error: Some(message.into()),
        }
    }
}

impl From<&GifcapError> for HostResponse {
    fn from(err: &GifcapError) -> Self {
        HostResponse::failure(err.to_string())
    }
}

impl<T: Into<ResponseBody>> From<Result<T, GifcapError>> for HostResponse {
    fn from(result: Result<T, GifcapError>) -> Self {
        match result {
            Ok(body) => HostResponse::ok(body.into()),
            Err(err) => HostResponse::from(&err),
        }
    }
}

impl From<()> for ResponseBody {
    fn from(_: ()) -> Self {
        ResponseBody::Empty {}
    }
}

/// Notifications the host pushes to UI surfaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum HostEvent {
    /// Ask the UI to open the region-selection overlay.
    StartSelection,
    RegionConfirmed { region: Region },
    SelectionCancelled,
    /// Ask the surface owning the current recording to stop it.
    StopRecording { owner: String },
    RecordingStarted { owner: String },
    RecordingSaved { path: PathBuf },
    RecordingFailed { error: String },
}
