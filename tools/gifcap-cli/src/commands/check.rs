//! Check system capabilities.

use std::sync::Arc;

use gifcap_common::config::ConfigStore;
use gifcap_common::error::GifcapError;
use gifcap_platform_linux::{detect_display_server, DisplayServer};
use gifcap_transcode::EncoderResolver;

pub fn run(store: Arc<ConfigStore>) -> anyhow::Result<()> {
    println!("GifCap System Check");
    println!("{}", "=".repeat(50));

    let ds = detect_display_server();
    match ds {
        DisplayServer::X11 => println!("[OK] Display server: X11"),
        DisplayServer::Wayland => println!("[OK] Display server: Wayland (capture via XWayland)"),
        _ => println!("[WARN] Display server: Unknown"),
    }

    match gifcap_platform_linux::detect_monitors() {
        Ok(monitors) => {
            println!("[OK] Monitors detected: {}", monitors.len());
            for m in &monitors {
                println!(
                    "     {} {}x{}+{}+{} (scale: {}x) {}",
                    m.name,
                    m.width,
                    m.height,
                    m.x,
                    m.y,
                    m.scale_factor,
                    if m.primary { "(primary)" } else { "" }
                );
            }
        }
        Err(e) => println!("[WARN] Monitors: {e}"),
    }

    let config = store.get();
    let encoder_ok = match EncoderResolver::ffmpeg(config.encoder_path.as_deref()).resolve() {
        Ok(path) => {
            println!("[OK] Encoder: {}", path.display());
            true
        }
        Err(GifcapError::EncoderNotFound { attempts }) => {
            println!("[MISSING - REQUIRED] Encoder: ffmpeg not found");
            for attempt in &attempts {
                println!("     tried {attempt}");
            }
            println!("    Fix: install ffmpeg or run `gifcap config set --encoder-path <path>`");
            false
        }
        Err(e) => {
            println!("[MISSING - REQUIRED] Encoder: {e}");
            false
        }
    };

    let capabilities = gifcap_platform_linux::permissions::check_capabilities();
    println!();
    gifcap_platform_linux::permissions::print_capability_report(&capabilities);

    let all_required_ok = encoder_ok
        && capabilities
            .iter()
            .filter(|c| c.required)
            .all(|c| c.available);

    println!();
    println!("Config: {}", store.path().display());
    println!("Save folder: {}", config.save_dir().display());
    if all_required_ok {
        println!("All required capabilities are available. GifCap is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }

    Ok(())
}
