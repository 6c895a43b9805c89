//! Capability detection and guidance for Linux.
//!
//! GifCap relies on a graphical session, GStreamer capture elements, a
//! region selector, and a file browser launcher. The encoder itself is
//! checked by the transcode crate's resolver.

use crate::display::{detect_display_server, DisplayServer};

/// A system capability that GifCap may need.
#[derive(Debug, Clone)]
pub struct Capability {
    pub name: String,
    pub description: String,
    pub available: bool,
    pub required: bool,
    pub fix_instructions: Option<String>,
}

/// Check all capabilities and report status.
pub fn check_capabilities() -> Vec<Capability> {
    vec![
        check_display_session(),
        check_gstreamer_capture(),
        check_region_selector(),
        check_file_browser(),
    ]
}

/// Whether an executable is reachable through `PATH`.
pub fn command_exists(binary: &str) -> bool {
    which::which(binary).is_ok()
}

fn check_display_session() -> Capability {
    let server = detect_display_server();
    let available = server == DisplayServer::X11
        || (server == DisplayServer::Wayland && std::env::var_os("DISPLAY").is_some());

    Capability {
        name: "X11 Display".to_string(),
        description: "X11 session (or XWayland) for screen capture and global shortcuts"
            .to_string(),
        available,
        required: true,
        fix_instructions: (!available).then(|| {
            "Run inside an X11 session, or enable XWayland on Wayland compositors".to_string()
        }),
    }
}

fn check_gstreamer_capture() -> Capability {
    let available = std::process::Command::new("gst-inspect-1.0")
        .args(["--exists", "ximagesrc"])
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    Capability {
        name: "GStreamer Capture".to_string(),
        description: "ximagesrc and vp8enc elements for live capture".to_string(),
        available,
        required: true,
        fix_instructions: (!available).then(|| {
            "Install GStreamer plugins: sudo apt install gstreamer1.0-plugins-good gstreamer1.0-tools"
                .to_string()
        }),
    }
}

fn check_region_selector() -> Capability {
    let available = command_exists("slop");

    Capability {
        name: "Region Selector".to_string(),
        description: "slop for interactive region selection".to_string(),
        available,
        required: false,
        fix_instructions: (!available).then(|| {
            "Install slop (sudo apt install slop) or pass --region x,y,width,height".to_string()
        }),
    }
}

fn check_file_browser() -> Capability {
    let available = command_exists("xdg-open");

    Capability {
        name: "File Browser".to_string(),
        description: "xdg-open for revealing saved recordings".to_string(),
        available,
        required: false,
        fix_instructions: (!available)
            .then(|| "Install xdg-utils: sudo apt install xdg-utils".to_string()),
    }
}

/// Print a user-friendly capability report.
pub fn print_capability_report(capabilities: &[Capability]) {
    println!("GifCap System Capabilities:");
    println!("{}", "-".repeat(60));

    for cap in capabilities {
        let status = if cap.available {
            "[OK]"
        } else if cap.required {
            "[MISSING - REQUIRED]"
        } else {
            "[MISSING - OPTIONAL]"
        };

        println!("  {} {}: {}", status, cap.name, cap.description);

        if let Some(ref fix) = cap.fix_instructions {
            println!("    Fix: {fix}");
        }
    }
}
