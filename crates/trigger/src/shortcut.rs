//! Keyboard shortcut parsing and normalization.

use std::fmt;
use std::str::FromStr;

use gifcap_common::error::GifcapError;

/// A normalized key combination such as `Ctrl+Shift+G`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    ctrl: bool,
    alt: bool,
    shift: bool,
    super_key: bool,
    key: String,
}

impl Shortcut {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.alt || self.shift || self.super_key
    }

    fn invalid(input: &str, reason: impl Into<String>) -> GifcapError {
        GifcapError::HotkeyRegistrationFailed {
            shortcut: input.to_string(),
            reason: reason.into(),
        }
    }
}

impl FromStr for Shortcut {
    type Err = GifcapError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut shortcut = Shortcut {
            ctrl: false,
            alt: false,
            shift: false,
            super_key: false,
            key: String::new(),
        };

        for token in input.split('+').map(str::trim) {
            if token.is_empty() {
                return Err(Self::invalid(input, "empty key in combination"));
            }
            match token.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => shortcut.ctrl = true,
                "alt" | "option" => shortcut.alt = true,
                "shift" => shortcut.shift = true,
                "super" | "meta" | "cmd" | "command" => shortcut.super_key = true,
                "commandorcontrol" | "cmdorctrl" | "commandorctrl" | "cmdorcontrol" => {
                    if cfg!(target_os = "macos") {
                        shortcut.super_key = true;
                    } else {
                        shortcut.ctrl = true;
                    }
                }
                _ => {
                    if !shortcut.key.is_empty() {
                        return Err(Self::invalid(input, "more than one non-modifier key"));
                    }
                    shortcut.key = normalize_key(token)
                        .ok_or_else(|| Self::invalid(input, format!("unknown key {token:?}")))?;
                }
            }
        }

        if shortcut.key.is_empty() {
            return Err(Self::invalid(input, "missing non-modifier key"));
        }
        Ok(shortcut)
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (on, name) in [
            (self.ctrl, "Ctrl"),
            (self.alt, "Alt"),
            (self.shift, "Shift"),
            (self.super_key, "Super"),
        ] {
            if on {
                write!(f, "{name}+")?;
            }
        }
        f.write_str(&self.key)
    }
}

fn normalize_key(token: &str) -> Option<String> {
    let upper = token.to_ascii_uppercase();

    if upper.len() == 1 {
        let c = upper.chars().next()?;
        return (c.is_ascii_alphanumeric()).then(|| upper.clone());
    }

    if let Some(n) = upper.strip_prefix('F').and_then(|n| n.parse::<u8>().ok()) {
        return (1..=24).contains(&n).then(|| format!("F{n}"));
    }

    let named = match upper.as_str() {
        "SPACE" => "Space",
        "TAB" => "Tab",
        "ENTER" | "RETURN" => "Enter",
        "ESC" | "ESCAPE" => "Escape",
        "BACKSPACE" => "Backspace",
        "DELETE" | "DEL" => "Delete",
        "INSERT" => "Insert",
        "HOME" => "Home",
        "END" => "End",
        "PAGEUP" => "PageUp",
        "PAGEDOWN" => "PageDown",
        "UP" | "ARROWUP" => "ArrowUp",
        "DOWN" | "ARROWDOWN" => "ArrowDown",
        "LEFT" | "ARROWLEFT" => "ArrowLeft",
        "RIGHT" | "ARROWRIGHT" => "ArrowRight",
        "PRINTSCREEN" => "PrintScreen",
        _ => return None,
    };
    Some(named.to_string())
}
