//! Display server detection and monitor enumeration.

use std::process::Command;

use gifcap_common::error::{GifcapError, GifcapResult};
pub use gifcap_platform_core::{DisplayServer, MonitorInfo};

/// Detect the current display server.
pub fn detect_display_server() -> DisplayServer {
    if std::env::var_os("WAYLAND_DISPLAY").is_some() {
        DisplayServer::Wayland
    } else if std::env::var_os("DISPLAY").is_some() {
        DisplayServer::X11
    } else {
        DisplayServer::Unknown
    }
}

/// Detect connected monitors using `xrandr`.
///
/// Works on X11 and on Wayland sessions running XWayland. The scale
/// factor comes from `GDK_SCALE` when set, since xrandr reports
/// physical pixels only.
pub fn detect_monitors() -> GifcapResult<Vec<MonitorInfo>> {
    tracing::debug!("Detecting monitors");

    let output = Command::new("xrandr")
        .arg("--query")
        .output()
        .map_err(|e| GifcapError::platform(format!("Failed to run xrandr: {e}")))?;

    if !output.status.success() {
        return Err(GifcapError::platform(format!(
            "xrandr failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let scale_factor = std::env::var("GDK_SCALE")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| *v > 0.0)
        .unwrap_or(1.0);

    let monitors = parse_xrandr(&String::from_utf8_lossy(&output.stdout), scale_factor);
    tracing::debug!(count = monitors.len(), "Monitors detected");
    Ok(monitors)
}

/// Parse the `connected` lines of `xrandr --query` output.
///
/// ```text
/// HDMI-1 connected primary 2560x1440+0+0 (normal left inverted) 597mm x 336mm
/// DP-2 connected 1920x1080+2560+0 (normal left inverted) 527mm x 296mm
/// ```
pub fn parse_xrandr(output: &str, scale_factor: f64) -> Vec<MonitorInfo> {
    output
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let name = tokens.next()?;
            if tokens.next()? != "connected" {
                return None;
            }
            let mut primary = false;
            let geometry = tokens.find_map(|token| {
                if token == "primary" {
                    primary = true;
                    None
                } else {
                    parse_geometry(token)
                }
            })?;
            let (width, height, x, y) = geometry;
            Some(MonitorInfo {
                name: name.to_string(),
                width,
                height,
                x,
                y,
                scale_factor,
                primary,
            })
        })
        .collect()
}

/// Parse `WxH+X+Y` (offsets may be negative: `WxH-X+Y`).
fn parse_geometry(token: &str) -> Option<(u32, u32, i32, i32)> {
    let (width, rest) = token.split_once('x')?;
    let width = width.parse().ok()?;

    let offset_start = rest.find(['+', '-'])?;
    let height = rest[..offset_start].parse().ok()?;
    let offsets = &rest[offset_start..];

    let second = offsets[1..].find(['+', '-'])? + 1;
    let x = offsets[..second].parse().ok()?;
    let y = offsets[second..].parse().ok()?;
    Some((width, height, x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Screen 0: minimum 320 x 200, current 4480 x 1440, maximum 16384 x 16384
HDMI-1 connected primary 2560x1440+0+0 (normal left inverted right x axis y axis) 597mm x 336mm
   2560x1440     59.95*+
DP-2 connected 1920x1080-1920+180 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+
DP-3 disconnected (normal left inverted right x axis y axis)
";

    #[test]
    fn test_parse_xrandr_connected_outputs() {
        let monitors = parse_xrandr(SAMPLE, 1.0);
        assert_eq!(monitors.len(), 2);

        assert_eq!(monitors[0].name, "HDMI-1");
        assert!(monitors[0].primary);
        assert_eq!((monitors[0].width, monitors[0].height), (2560, 1440));
        assert_eq!((monitors[0].x, monitors[0].y), (0, 0));

        assert_eq!(monitors[1].name, "DP-2");
        assert!(!monitors[1].primary);
        assert_eq!((monitors[1].x, monitors[1].y), (-1920, 180));
    }

    #[test]
    fn test_connected_without_mode_is_skipped() {
        let monitors = parse_xrandr("VGA-1 connected (normal left inverted)\n", 1.0);
        assert!(monitors.is_empty());
    }

    #[test]
    fn test_scale_factor_is_applied() {
        let monitors = parse_xrandr(SAMPLE, 2.0);
        assert_eq!(monitors[0].logical_width(), 1280);
    }
}
