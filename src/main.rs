//! Keyboard backlight daemon
//!
//! Dims the keyboard backlight while no input arrives and fades it back in
//! on the next key press.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use kbd_backlightd::backlight;
use kbd_backlightd::{
    Backend, Config, Daemon, DeviceEnumerator, InputDeviceEnumerator, ServiceConfig,
};

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("kbd_backlightd={default_level}"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .init();

    let (config, config_path) = Config::load(cli.config.as_deref())?;
    match &config_path {
        Some(path) => info!("Using configuration file at: {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    match cli.command {
        None | Some(Commands::Run) => run(config, cli.dry_run).await,
        Some(Commands::Detect) => detect(&config),
    }
}

async fn run(config: Config, dry_run: bool) -> Result<()> {
    let light = backlight::open_light(&config, dry_run).context("cannot open backlight")?;
    let enumerator = Arc::new(InputDeviceEnumerator::from_config(&config));

    let daemon = Daemon::new(ServiceConfig::from(&config), light, enumerator);
    daemon.run(CancellationToken::new()).await?;
    Ok(())
}

fn detect(config: &Config) -> Result<()> {
    match config.backend {
        Backend::Sysfs => {
            let path = backlight::resolve_sysfs_path(config, Path::new(kbd_light::LEDS_PATH))?;
            println!("Backlight: {}", path.display());
        }
        Backend::Aurora => println!("Backlight: Aurora USB HID"),
    }

    let enumerator = InputDeviceEnumerator::from_config(config);
    println!("Input devices:");
    for candidate in enumerator.candidates()? {
        match std::fs::canonicalize(&candidate) {
            Ok(resolved) if resolved != candidate => {
                println!("  {} -> {}", candidate.display(), resolved.display())
            }
            Ok(_) => println!("  {}", candidate.display()),
            Err(e) => println!("  {} ({e})", candidate.display()),
        }
    }
    Ok(())
}
