use color_eyre::{eyre::eyre, Result};
use spacenav::config::Configuration;
use spacenav::controller::GilrsDevice;
use spacenav::driver::DriverHandle;
use spacenav::host::headless::headless_collaborators;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config().await;

    info!("Initializing input device");
    let device = GilrsDevice::create(config.device_settings())
        .map_err(|e| eyre!("Failed to open input backend: {}", e))?
        .open();

    let host = headless_collaborators(config.nudge.default_snap);
    let handle = DriverHandle::spawn(&config, Box::new(device), host);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| eyre!("Failed to listen for ctrl-c: {}", e))?;
    info!("Shutting down");

    let stats = handle.shutdown().await?;
    info!(
        "Ran {} ticks: {} camera pushes, {} nudges, {} external camera changes",
        stats.ticks, stats.camera_pushes, stats.nudges, stats.external_changes
    );
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Config file from the first argument, or the per-user default location
async fn load_config() -> Configuration {
    let path = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => path,
        None => match Configuration::default_path() {
            Ok(path) => path,
            Err(e) => {
                warn!("{}, using default configuration", e);
                return Configuration::default();
            }
        },
    };
    Configuration::load_or_default(&path).await
}
