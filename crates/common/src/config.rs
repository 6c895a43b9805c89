//! Application configuration and its on-disk store.
//!
//! The config is a single JSON record. A missing file is created with
//! defaults on first access; a corrupt file is logged and left in place
//! while defaults are served from memory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GifcapError, GifcapResult};

/// Default global shortcut.
pub const DEFAULT_SHORTCUT: &str = "Ctrl+Shift+G";

/// Default output frame rate.
pub const DEFAULT_FPS: u32 = 15;

/// Subfolder created under the documents directory when no save path is set.
pub const DEFAULT_SAVE_FOLDER: &str = "GifCapture";

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    /// Directory where artifacts are written. Empty means the platform default.
    pub save_path: String,

    /// Global shortcut toggling selection / stop.
    pub shortcut: String,

    /// Output frame rate.
    pub fps: u32,

    /// Maximum output width in pixels (0 = unconstrained).
    pub max_width: u32,

    /// Explicit encoder binary, tried before any other location.
    pub encoder_path: Option<PathBuf>,

    /// Upper bound for one encoder run in seconds (0 disables the bound).
    pub encoder_timeout_secs: u64,

    /// Largest decoded video payload accepted across the host boundary.
    pub max_payload_bytes: usize,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "gifcap=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            shortcut: DEFAULT_SHORTCUT.to_string(),
            fps: DEFAULT_FPS,
            max_width: 0,
            encoder_path: None,
            encoder_timeout_secs: 600,
            max_payload_bytes: 512 * 1024 * 1024,
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Directory artifacts are written to, resolving the empty default.
    pub fn save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            default_save_dir()
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    /// Encoder time bound, if any.
    pub fn encoder_timeout(&self) -> Option<Duration> {
        (self.encoder_timeout_secs > 0).then(|| Duration::from_secs(self.encoder_timeout_secs))
    }

    fn apply(&mut self, patch: &ConfigPatch) -> GifcapResult<()> {
        if let Some(fps) = patch.fps {
            if fps == 0 {
                return Err(GifcapError::config("fps must be greater than zero"));
            }
        }
        if let Some(shortcut) = &patch.shortcut {
            validate_shortcut_syntax(shortcut)?;
        }

        if let Some(save_path) = &patch.save_path {
            self.save_path = save_path.clone();
        }
        if let Some(shortcut) = &patch.shortcut {
            self.shortcut = shortcut.trim().to_string();
        }
        if let Some(fps) = patch.fps {
            self.fps = fps;
        }
        if let Some(max_width) = patch.max_width {
            self.max_width = max_width;
        }
        if let Some(encoder_path) = &patch.encoder_path {
            self.encoder_path = if encoder_path.as_os_str().is_empty() {
                None
            } else {
                Some(encoder_path.clone())
            };
        }
        if let Some(timeout) = patch.encoder_timeout_secs {
            self.encoder_timeout_secs = timeout;
        }
        Ok(())
    }
}

/// A partial update. `None` fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConfigPatch {
    pub save_path: Option<String>,
    pub shortcut: Option<String>,
    pub fps: Option<u32>,
    pub max_width: Option<u32>,
    /// An empty path clears the explicit encoder location.
    pub encoder_path: Option<PathBuf>,
    pub encoder_timeout_secs: Option<u64>,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self == &ConfigPatch::default()
    }
}

/// Owner of the persisted configuration file.
pub struct ConfigStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

#[derive(Debug)]
struct StoreState {
    current: AppConfig,
    /// The file on disk failed to parse and has not been replaced yet.
    corrupt_on_disk: bool,
}

impl ConfigStore {
    /// Open the store at the standard location.
    pub fn open_default() -> Self {
        Self::open(config_file_path())
    }

    /// Open the store at `path`, creating the file with defaults if missing.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let (current, corrupt_on_disk) = match load_from(&path) {
            Ok(Some(config)) => (config, false),
            Ok(None) => {
                let config = AppConfig::default();
                if let Err(e) = write_to(&path, &config) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to write default config");
                } else {
                    tracing::info!(path = %path.display(), "Created default config");
                }
                (config, false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Using default configuration in memory");
                (AppConfig::default(), true)
            }
        };

        Self {
            path,
            state: Mutex::new(StoreState {
                current,
                corrupt_on_disk,
            }),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current configuration.
    pub fn get(&self) -> AppConfig {
        self.lock().current.clone()
    }

    /// The config `patch` would produce, without storing it.
    pub fn preview(&self, patch: &ConfigPatch) -> GifcapResult<AppConfig> {
        let mut next = self.get();
        next.apply(patch)?;
        Ok(next)
    }

    /// Apply a partial update, persist it, and return the full config.
    pub fn set(&self, patch: &ConfigPatch) -> GifcapResult<AppConfig> {
        let mut state = self.lock();
        let mut next = state.current.clone();
        next.apply(patch)?;

        if state.corrupt_on_disk {
            let backup = self.path.with_extension("json.corrupt");
            match std::fs::rename(&self.path, &backup) {
                Ok(()) => tracing::warn!(
                    backup = %backup.display(),
                    "Moved corrupt config aside before saving"
                ),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not move corrupt config aside; overwriting"
                ),
            }
        }

        write_to(&self.path, &next)?;
        state.corrupt_on_disk = false;
        state.current = next.clone();
        tracing::debug!(path = %self.path.display(), "Config saved");
        Ok(next)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Read the config at `path`. `Ok(None)` means the file does not exist.
fn load_from(path: &Path) -> GifcapResult<Option<AppConfig>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(GifcapError::ConfigCorrupt {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| GifcapError::ConfigCorrupt {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn write_to(path: &Path, config: &AppConfig) -> GifcapResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn validate_shortcut_syntax(shortcut: &str) -> GifcapResult<()> {
    let trimmed = shortcut.trim();
    if trimmed.is_empty() || trimmed.split('+').any(|part| part.trim().is_empty()) {
        return Err(GifcapError::config(format!(
            "Invalid shortcut {shortcut:?}: expected a combination like Ctrl+Shift+G"
        )));
    }
    Ok(())
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("gifcap")
        .join("config.json")
}

/// Default artifact directory.
pub fn default_save_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(DEFAULT_SAVE_FOLDER)
}
