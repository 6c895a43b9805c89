//! Fakes shared by the host tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gifcap_capture::{MediaStream, ScreenSourceProvider, StreamPoll};
use gifcap_common::config::{ConfigPatch, ConfigStore};
use gifcap_common::error::{GifcapError, GifcapResult};
use gifcap_model::Resolution;
use gifcap_platform_core::{MonitorInfo, ScreenSource};
use gifcap_trigger::{HotkeyBackend, Shortcut};

pub fn monitor(x: i32, width: u32, height: u32) -> MonitorInfo {
    MonitorInfo {
        name: "HDMI-1".to_string(),
        width,
        height,
        x,
        y: 0,
        scale_factor: 1.0,
        primary: true,
    }
}

/// Config store in `dir` saving into `dir/out`.
pub fn config_store(dir: &Path) -> Arc<ConfigStore> {
    let config = ConfigStore::open(dir.join("config.json"));
    config
        .set(&ConfigPatch {
            save_path: Some(dir.join("out").to_string_lossy().into_owned()),
            ..Default::default()
        })
        .unwrap();
    Arc::new(config)
}

/// Executable shell script standing in for the encoder.
#[cfg(unix)]
pub fn fake_encoder(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-ffmpeg");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Writes a tiny GIF to the last argument.
pub const WRITES_OUTPUT: &str = "for last; do :; done\nprintf GIF89a > \"$last\"";

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

pub struct ScriptedStream {
    polls: VecDeque<StreamPoll>,
    exhausted: StreamPoll,
    tail: Vec<Vec<u8>>,
}

impl MediaStream for ScriptedStream {
    fn resolution(&self) -> Resolution {
        Resolution::new(640, 480)
    }

    fn poll_chunk(&mut self) -> GifcapResult<StreamPoll> {
        Ok(self
            .polls
            .pop_front()
            .unwrap_or_else(|| self.exhausted.clone()))
    }

    fn finish(&mut self) -> GifcapResult<Vec<Vec<u8>>> {
        Ok(std::mem::take(&mut self.tail))
    }

    fn release(&mut self) {}
}

/// One 640x480 screen whose stream replays `polls`, then repeats
/// `exhausted`.
pub struct ScriptedProvider {
    pub polls: Vec<StreamPoll>,
    pub exhausted: StreamPoll,
    pub tail: Vec<Vec<u8>>,
    pub opened: Mutex<usize>,
}

impl ScriptedProvider {
    pub fn ending(polls: Vec<StreamPoll>) -> Self {
        Self {
            polls,
            exhausted: StreamPoll::Ended,
            tail: Vec::new(),
            opened: Mutex::new(0),
        }
    }

    pub fn endless(polls: Vec<StreamPoll>, tail: Vec<Vec<u8>>) -> Self {
        Self {
            polls,
            exhausted: StreamPoll::Pending,
            tail,
            opened: Mutex::new(0),
        }
    }
}

impl ScreenSourceProvider for ScriptedProvider {
    fn sources(&self) -> GifcapResult<Vec<ScreenSource>> {
        Ok(ScreenSource::from_monitors(&[monitor(0, 640, 480)]))
    }

    fn open(
        &self,
        _source: &ScreenSource,
        _requested: Resolution,
    ) -> GifcapResult<Box<dyn MediaStream>> {
        *self.opened.lock().unwrap() += 1;
        Ok(Box::new(ScriptedStream {
            polls: self.polls.clone().into(),
            exhausted: self.exhausted.clone(),
            tail: self.tail.clone(),
        }))
    }
}

pub struct NoScreens;

impl ScreenSourceProvider for NoScreens {
    fn sources(&self) -> GifcapResult<Vec<ScreenSource>> {
        Ok(Vec::new())
    }

    fn open(
        &self,
        _source: &ScreenSource,
        _requested: Resolution,
    ) -> GifcapResult<Box<dyn MediaStream>> {
        Err(GifcapError::NoSourceAvailable)
    }
}

/// Hotkey backend that accepts every combination except `taken`, and
/// shares the currently registered one with the test.
pub struct ClaimedBackend {
    pub taken: String,
    pub registered: Arc<Mutex<Option<String>>>,
}

impl HotkeyBackend for ClaimedBackend {
    fn register(&mut self, shortcut: &Shortcut) -> GifcapResult<()> {
        if shortcut.to_string() == self.taken {
            return Err(GifcapError::HotkeyRegistrationFailed {
                shortcut: shortcut.to_string(),
                reason: "already claimed by another application".into(),
            });
        }
        *self.registered.lock().unwrap() = Some(shortcut.to_string());
        Ok(())
    }

    fn unregister(&mut self, _shortcut: &Shortcut) -> GifcapResult<()> {
        *self.registered.lock().unwrap() = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "claimed"
    }
}
