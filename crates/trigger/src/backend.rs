//! Global shortcut backends.
//!
//! [`GlobalHotkeyBackend`] keeps the OS hotkey manager on a dedicated
//! thread and forwards presses of the active combination over a channel.
//! [`NullHotkeyBackend`] is used where no global shortcut facility exists.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread;

use gifcap_common::error::{GifcapError, GifcapResult};
use global_hotkey::hotkey::HotKey;
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::mpsc;

use crate::shortcut::Shortcut;

/// A press of the registered shortcut.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyPressed;

/// Registers and unregisters one combination with the system.
pub trait HotkeyBackend: Send {
    fn register(&mut self, shortcut: &Shortcut) -> GifcapResult<()>;

    fn unregister(&mut self, shortcut: &Shortcut) -> GifcapResult<()>;

    fn name(&self) -> &str;
}

enum ManagerCommand {
    Register(HotKey, std_mpsc::Sender<Result<(), String>>),
    Unregister(HotKey, std_mpsc::Sender<Result<(), String>>),
}

/// System-wide shortcuts through the `global-hotkey` crate.
pub struct GlobalHotkeyBackend {
    commands: std_mpsc::Sender<ManagerCommand>,
    active_id: Arc<AtomicU32>,
}

impl GlobalHotkeyBackend {
    /// Start the manager and event threads. Presses of the active
    /// combination are sent to `presses`.
    pub fn start(presses: mpsc::UnboundedSender<HotkeyPressed>) -> GifcapResult<Self> {
        let (commands, command_rx) = std_mpsc::channel::<ManagerCommand>();
        let (ready_tx, ready_rx) = std_mpsc::channel::<Result<(), String>>();

        thread::Builder::new()
            .name("gifcap-hotkey-manager".into())
            .spawn(move || manager_thread(command_rx, ready_tx))
            .map_err(|e| GifcapError::platform(format!("Failed to start hotkey thread: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| GifcapError::platform("Hotkey manager thread exited"))?
            .map_err(|e| GifcapError::platform(format!("Hotkey manager unavailable: {e}")))?;

        let active_id = Arc::new(AtomicU32::new(0));
        let forward_id = active_id.clone();
        thread::Builder::new()
            .name("gifcap-hotkey-events".into())
            .spawn(move || {
                let events = GlobalHotKeyEvent::receiver();
                while let Ok(event) = events.recv() {
                    if event.state != HotKeyState::Pressed {
                        continue;
                    }
                    let active = forward_id.load(Ordering::SeqCst);
                    if active == 0 || event.id != active {
                        continue;
                    }
                    if presses.send(HotkeyPressed).is_err() {
                        break;
                    }
                }
                tracing::debug!("Hotkey event forwarding stopped");
            })
            .map_err(|e| GifcapError::platform(format!("Failed to start hotkey thread: {e}")))?;

        tracing::info!("Global hotkey backend started");
        Ok(Self {
            commands,
            active_id,
        })
    }

    fn request(
        &self,
        shortcut: &Shortcut,
        build: impl FnOnce(HotKey, std_mpsc::Sender<Result<(), String>>) -> ManagerCommand,
    ) -> GifcapResult<u32> {
        let failed = |reason: String| GifcapError::HotkeyRegistrationFailed {
            shortcut: shortcut.to_string(),
            reason,
        };
        let hotkey: HotKey = shortcut
            .to_string()
            .parse()
            .map_err(|e| failed(format!("{e}")))?;
        let id = hotkey.id();

        let (reply_tx, reply_rx) = std_mpsc::channel();
        self.commands
            .send(build(hotkey, reply_tx))
            .map_err(|_| failed("hotkey manager is not running".into()))?;
        reply_rx
            .recv()
            .map_err(|_| failed("hotkey manager is not running".into()))?
            .map_err(failed)?;
        Ok(id)
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(&mut self, shortcut: &Shortcut) -> GifcapResult<()> {
        let id = self.request(shortcut, ManagerCommand::Register)?;
        self.active_id.store(id, Ordering::SeqCst);
        Ok(())
    }

    fn unregister(&mut self, shortcut: &Shortcut) -> GifcapResult<()> {
        self.active_id.store(0, Ordering::SeqCst);
        self.request(shortcut, ManagerCommand::Unregister)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "global-hotkey"
    }
}

fn manager_thread(
    commands: std_mpsc::Receiver<ManagerCommand>,
    ready: std_mpsc::Sender<Result<(), String>>,
) {
    let manager = match GlobalHotKeyManager::new() {
        Ok(manager) => {
            let _ = ready.send(Ok(()));
            manager
        }
        Err(e) => {
            let _ = ready.send(Err(e.to_string()));
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            ManagerCommand::Register(hotkey, reply) => {
                let _ = reply.send(manager.register(hotkey).map_err(|e| e.to_string()));
            }
            ManagerCommand::Unregister(hotkey, reply) => {
                let _ = reply.send(manager.unregister(hotkey).map_err(|e| e.to_string()));
            }
        }
    }
    tracing::debug!("Hotkey manager thread stopped");
}

/// A backend for sessions without global shortcut support.
#[derive(Debug, Default)]
pub struct NullHotkeyBackend;

impl HotkeyBackend for NullHotkeyBackend {
    fn register(&mut self, shortcut: &Shortcut) -> GifcapResult<()> {
        Err(GifcapError::HotkeyRegistrationFailed {
            shortcut: shortcut.to_string(),
            reason: "global shortcuts are not available in this session".into(),
        })
    }

    fn unregister(&mut self, _shortcut: &Shortcut) -> GifcapResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "none"
    }
}
