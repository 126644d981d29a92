// THEORY:
// `compass_viewer` is the desktop front end for `motion_compass`. It owns the
// only window and the only camera handle. The library owns everything in
// between: the capture loop runs on tokio's blocking pool and hands the newest
// annotated frame back through a watch channel, so this thread only ever
// draws the latest state and reacts to keys.
//
// Without a display (`--headless`) the same monitor runs and direction changes
// are logged until Ctrl-C.

mod camera;
mod display;

use anyhow::{Context, Result};
use camera::OpenCvOpener;
use clap::Parser;
use motion_compass::{DirectionLabel, MonitorConfig, MonitorEvent, MotionMonitor, StartOutcome};
use opencv::{core::Mat, highgui, prelude::*};
use std::path::PathBuf;

/// Milliseconds the UI waits for a key between redraws.
const UI_REFRESH_MS: i32 = 30;
const KEY_ESCAPE: i32 = 27;

#[derive(Parser, Debug)]
#[command(name = "compass_viewer", about = "Reports which third of the camera view has motion")]
struct Cli {
    /// TOML config file.
    #[arg(long, env = "COMPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Camera index, overrides the config file.
    #[arg(long)]
    device: Option<u32>,

    /// Minimum region area in pixels.
    #[arg(long)]
    min_area: Option<u64>,

    /// Log direction changes instead of opening a window.
    #[arg(long)]
    headless: bool,

    /// Start the camera without waiting for the `s` key.
    #[arg(long)]
    autostart: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // --- 1. Argument Parsing & Setup ---
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = MonitorConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(device) = cli.device {
        config.device_index = device;
    }
    if let Some(area) = cli.min_area {
        config.classifier.min_region_area = area;
    }
    config.validate().context("validating command line overrides")?;
    log::info!(
        "using camera {} with min region area {}",
        config.device_index,
        config.classifier.min_region_area
    );

    // --- 2. Monitor Initialization ---
    let mut monitor = MotionMonitor::new(OpenCvOpener, config);

    // --- 3. Run ---
    let result = if cli.headless {
        run_headless(&mut monitor).await
    } else {
        run_window(&mut monitor, cli.autostart).await
    };

    // --- 4. Shutdown ---
    monitor.stop().await.context("stopping capture loop")?;
    result
}

async fn start_monitor(monitor: &mut MotionMonitor<OpenCvOpener>) {
    match monitor.start().await {
        Ok(StartOutcome::Started) => log::info!("camera started"),
        Ok(StartOutcome::AlreadyRunning) => log::debug!("camera already running"),
        // The window shows the failure through the DeviceUnavailable event.
        Err(err) => log::warn!("could not start camera: {err}"),
    }
}

async fn run_window(monitor: &mut MotionMonitor<OpenCvOpener>, autostart: bool) -> Result<()> {
    highgui::named_window(display::WINDOW_NAME, highgui::WINDOW_AUTOSIZE)?;
    let mut events = monitor.subscribe();
    if autostart {
        start_monitor(monitor).await;
    }

    let mut canvas = Mat::default();
    loop {
        if canvas.empty() || events.has_changed().unwrap_or(false) {
            // No borrow of the channel may be held while drawing.
            let event = events.borrow_and_update().clone();
            canvas = display::compose(&event, monitor.status_text())?;
        }
        highgui::imshow(display::WINDOW_NAME, &canvas)?;

        let key = highgui::wait_key(UI_REFRESH_MS)?;
        if key < 0 {
            continue;
        }
        match key & 0xFF {
            k if k == 's' as i32 => start_monitor(monitor).await,
            k if k == 'x' as i32 => {
                if let Err(err) = monitor.stop().await {
                    log::warn!("could not stop camera cleanly: {err}");
                }
                // Stopped is republished even if the value did not change.
                canvas = Mat::default();
            }
            k if k == 'q' as i32 || k == KEY_ESCAPE => break,
            _ => {}
        }
    }

    highgui::destroy_all_windows()?;
    Ok(())
}

async fn run_headless(monitor: &mut MotionMonitor<OpenCvOpener>) -> Result<()> {
    let mut events = monitor.subscribe();
    monitor.start().await.context("starting camera")?;
    log::info!("running headless, press Ctrl-C to quit");

    let mut last = DirectionLabel::None;
    loop {
        tokio::select! {
            changed = events.changed() => {
                if changed.is_err() {
                    break;
                }
                let event = events.borrow_and_update().clone();
                match event {
                    MonitorEvent::Frame(update) => {
                        if update.direction.is_motion() && update.direction != last {
                            last = update.direction;
                            log::info!("frame {}: {}", update.sequence, update.status);
                        }
                    }
                    MonitorEvent::Stopped => {
                        log::warn!("capture loop ended");
                        break;
                    }
                    MonitorEvent::DeviceUnavailable(reason) => {
                        anyhow::bail!("camera unavailable: {reason}");
                    }
                    MonitorEvent::Idle => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("interrupted");
                break;
            }
        }
    }
    Ok(())
}
