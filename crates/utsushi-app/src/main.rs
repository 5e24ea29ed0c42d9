use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use utsushi_config::{Settings, default_config_path};
use utsushi_ocr::ScreenGrabber;
use utsushi_ui::ChannelOverlay;

mod controller;
mod events;
mod io;
mod state;

#[cfg(test)]
mod tests;

use self::controller::{AppController, ChannelSet};
use self::state::AppState;

/// Select a screen region, OCR it and translate it with several engines at once.
#[derive(Debug, Parser)]
#[command(name = "utsushi", version)]
struct Cli {
    /// Settings file [default: <config dir>/utsushi/config.json]
    #[arg(long, env = "UTSUSHI_CONFIG")]
    config: Option<PathBuf>,

    /// Log as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Use the terminal front-end even when the desktop one is available
    #[arg(long)]
    headless: bool,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let path = cli.config.clone().unwrap_or_else(default_config_path);
    let settings = Settings::load(&path)
        .with_context(|| format!("failed to load settings from {}", path.display()))?;
    tracing::info!("Settings loaded from {}", path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let result = run(&runtime, &cli, Arc::new(settings));
    runtime.shutdown_timeout(Duration::from_secs(2));
    if let Err(e) = &result {
        tracing::error!("{e:#}");
    }
    result
}

fn run(runtime: &tokio::runtime::Runtime, cli: &Cli, settings: Arc<Settings>) -> anyhow::Result<()> {
    let _enter = runtime.enter();
    let channels = ChannelSet::new();

    let overlay = Arc::new(ChannelOverlay::new(channels.overlay.0.clone()));
    let state = runtime.block_on(AppState::init(
        settings,
        overlay,
        screen_grabber(),
        channels.translation.0.clone(),
    ))?;

    let mut controller = AppController::new(channels, Arc::new(state));
    controller.spawn_core();

    #[cfg(feature = "desktop")]
    if !cli.headless {
        controller.spawn_desktop();
        let ui_result = utsushi_ui::run_desktop(
            controller.state().selector.clone(),
            controller.channels().app_to_ui.1.clone(),
            controller.channels().ui_to_app.0.clone(),
        );
        controller.shutdown();
        runtime.block_on(controller.wait());
        return ui_result;
    }

    #[cfg(not(feature = "desktop"))]
    if !cli.headless {
        tracing::info!("Built without the desktop feature, using the terminal front-end");
    }

    controller.spawn_console()?;
    runtime.block_on(controller.wait());
    Ok(())
}

#[cfg(feature = "desktop")]
fn screen_grabber() -> Arc<dyn ScreenGrabber> {
    Arc::new(utsushi_ocr::XcapGrabber)
}

#[cfg(not(feature = "desktop"))]
fn screen_grabber() -> Arc<dyn ScreenGrabber> {
    Arc::new(utsushi_ocr::SyntheticGrabber::default())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // stdout belongs to the console front-end
    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_ansi(atty::is(atty::Stream::Stderr))
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
