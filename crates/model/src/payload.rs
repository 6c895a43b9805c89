//! Binary payloads crossing the host/UI boundary.
//!
//! Video data travels as a base64 string. The decoded size is checked
//! against a limit before any allocation for the decoded bytes happens.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use gifcap_common::error::{GifcapError, GifcapResult};
use serde::{Deserialize, Serialize};

/// A base64-encoded video blob, optionally wrapped in a `data:` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoPayload(String);

impl VideoPayload {
    /// Encode raw bytes for transport.
    pub fn encode(bytes: &[u8]) -> Self {
        Self(STANDARD.encode(bytes))
    }

    /// The encoded text without any `data:...;base64,` prefix.
    fn body(&self) -> &str {
        let trimmed = self.0.trim();
        match trimmed.split_once(";base64,") {
            Some((prefix, body)) if prefix.starts_with("data:") => body,
            _ => trimmed,
        }
    }

    /// Decode, rejecting payloads above `max_bytes` and empty payloads.
    pub fn decode(&self, max_bytes: usize) -> GifcapResult<Vec<u8>> {
        let body = self.body();
        if body.is_empty() {
            return Err(GifcapError::invalid_payload("video data is empty"));
        }

        let estimate = base64::decoded_len_estimate(body.len());
        // The estimate may overshoot by up to two bytes of padding.
        if estimate > max_bytes.saturating_add(2) {
            return Err(GifcapError::PayloadTooLarge {
                size: estimate,
                limit: max_bytes,
            });
        }

        let bytes = STANDARD
            .decode(body)
            .map_err(|e| GifcapError::invalid_payload(format!("bad base64: {e}")))?;
        if bytes.len() > max_bytes {
            return Err(GifcapError::PayloadTooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(GifcapError::invalid_payload("video data is empty"));
        }
        Ok(bytes)
    }
}

impl From<String> for VideoPayload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_data_url_forms() {
        let payload = VideoPayload::encode(b"webm-bytes");
        assert_eq!(payload.decode(1024).unwrap(), b"webm-bytes");

        let wrapped = VideoPayload::from(format!(
            "data:video/webm;base64,{}",
            STANDARD.encode(b"webm-bytes")
        ));
        assert_eq!(wrapped.decode(1024).unwrap(), b"webm-bytes");
    }

    #[test]
    fn oversized_payload_is_rejected_before_decoding() {
        let payload = VideoPayload::encode(&[7u8; 4096]);
        let err = payload.decode(1024).unwrap_err();
        assert!(matches!(err, GifcapError::PayloadTooLarge { limit: 1024, .. }));
    }

    #[test]
    fn exact_limit_is_accepted() {
        let payload = VideoPayload::encode(&[1u8; 100]);
        assert_eq!(payload.decode(100).unwrap().len(), 100);
        assert!(payload.decode(99).is_err());
    }

    #[test]
    fn empty_and_malformed_payloads_are_invalid() {
        assert!(matches!(
            VideoPayload::from(String::new()).decode(10),
            Err(GifcapError::InvalidPayload { .. })
        ));
        assert!(matches!(
            VideoPayload::from("!!!not base64".to_string()).decode(1024),
            Err(GifcapError::InvalidPayload { .. })
        ));
    }
}
