use anyhow::{Context, Result};
use log::{error, info};
use spi_wifi_link::{LinkConfig, Session};
use std::fs;

fn main() -> Result<()> {
    // Initialize logging
    init_logger();

    // Configuration path is optional; the defaults match the documented wiring
    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            let content = fs::read_to_string(&path)
                .context(format!("Failed to read config file: {}", path))?;
            serde_yaml::from_str(&content).context("Failed to parse configuration file")?
        }
        None => {
            info!("No config path given, using built-in defaults");
            LinkConfig::default()
        }
    };

    info!("SPI Wifi Link starting...");

    let mut session = Session::open(&config).context("Failed to claim SPI bus and GPIO lines")?;

    // Ctrl+C aborts a pending handshake wait instead of hanging on it
    let cancel = session.cancel_handle();
    ctrlc::set_handler(move || {
        info!("Received Ctrl+C, cancelling");
        cancel.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    session.power_on().context("Power-on sequence failed")?;
    info!("Module powered on, sending probe command");

    match session.send_command(b"AT\r\n") {
        Ok(response) => {
            info!("Module responded: {:?}", String::from_utf8_lossy(&response));
        }
        Err(e) => {
            error!("AT probe failed: {}", e);
            session.power_off().context("Power-off after failure also failed")?;
            return Err(e).context("AT probe failed");
        }
    }

    session.power_off().context("Power-off sequence failed")?;
    info!("SPI Wifi Link shutdown complete");
    Ok(())
}

fn init_logger() {
    // Use `env_logger` for logging. Systemd/journald will capture stdout/stderr.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}
