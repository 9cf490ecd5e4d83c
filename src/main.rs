// src/main.rs

//! Host binary: runs the bootscreen against terminal and headless displays.
//!
//! - `SIGUSR1` fires the finalize trigger (fade out, then framebuffer).
//! - `SIGINT` / `SIGTERM` unload and exit.

use bootscreen::config::{FramebufferConfig, CONFIG};
use bootscreen::devices::{ConsoleDisplay, HeadlessDisplay};
use bootscreen::source::FramebufferDevice;
use bootscreen::worker::{StopToken, Worker};
use bootscreen::{Bootscreen, Resolution};

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use nix::sys::signal::{SigSet, Signal};
use std::sync::mpsc::{channel, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const DEFAULT_MIRROR_INTERVAL_MS: u64 = 200;

enum HostEvent {
    Finalize,
    Exit(Signal),
}

/// Blocks the handled signals for this thread and every thread spawned after
/// it, so they are only ever consumed by `sigwait` in the signal thread.
fn block_signals() -> Result<SigSet> {
    let mut mask = SigSet::empty();
    mask.add(Signal::SIGUSR1);
    mask.add(Signal::SIGINT);
    mask.add(Signal::SIGTERM);
    mask.thread_block().context("Failed to block signals")?;
    Ok(mask)
}

fn spawn_signal_thread(mask: SigSet, events: Sender<HostEvent>) -> Result<()> {
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || loop {
            let event = match mask.wait() {
                Ok(Signal::SIGUSR1) => HostEvent::Finalize,
                Ok(signal) => HostEvent::Exit(signal),
                Err(e) => {
                    error!("Signals: sigwait failed: {}", e);
                    return;
                }
            };
            if events.send(event).is_err() {
                return;
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn register_displays(app: &Bootscreen) -> Result<()> {
    let console = &CONFIG.console;
    if console.enabled {
        let device = Arc::new(ConsoleDisplay::stdout(Resolution::new(
            console.width,
            console.height,
        )));
        app.register_client(device)
            .context("Failed to register console display")?;
    }
    for (i, size) in console.headless.iter().enumerate() {
        let device = Arc::new(HeadlessDisplay::new(
            format!("headless{}", i),
            Resolution::new(size.width, size.height),
        ));
        app.register_client(device)
            .with_context(|| format!("Failed to register headless display {}", i))?;
    }
    Ok(())
}

/// Streams the configured file, one frame-sized chunk at a time, into `device`.
fn mirror(device: &FramebufferDevice, data: &[u8], interval: Duration, token: &StopToken) {
    for chunk in data.chunks(device.len().max(1)) {
        if let Err(e) = device.write(0, chunk) {
            warn!("Mirror: write rejected: {}", e);
        }
        if token.sleep(interval) {
            return;
        }
    }
    debug!("Mirror: input exhausted");
}

fn start_mirror(app: &Bootscreen, config: &FramebufferConfig) -> Result<Option<Worker>> {
    let Some(path) = &config.mirror_input else {
        return Ok(None);
    };
    let Some(device) = app.framebuffer_devices().into_iter().next() else {
        warn!("Mirror: no framebuffer device to mirror into");
        return Ok(None);
    };

    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read mirror input {}", path.display()))?;
    let interval = Duration::from_millis(
        config
            .mirror_interval_ms
            .unwrap_or(DEFAULT_MIRROR_INTERVAL_MS),
    );
    info!(
        "Mirror: streaming {} bytes from {} into {}",
        data.len(),
        path.display(),
        device.client()
    );
    let worker = Worker::spawn("mirror", move |token| {
        mirror(&device, &data, interval, &token)
    })?;
    Ok(Some(worker))
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    info!("Starting bootscreen...");

    CONFIG.validate().context("Invalid configuration")?;

    // Must run before any other thread exists so they all inherit the mask.
    let mask = block_signals()?;

    let app = Bootscreen::load(CONFIG.timing()).context("Failed to load bootscreen")?;
    register_displays(&app)?;

    let (events_tx, events_rx) = channel();
    spawn_signal_thread(mask, events_tx.clone())?;

    let _auto_finalize = match CONFIG.control.auto_finalize_ms {
        Some(ms) => {
            let events = events_tx.clone();
            Some(Worker::spawn("auto-finalize", move |token| {
                if !token.sleep(Duration::from_millis(ms)) {
                    let _ = events.send(HostEvent::Finalize);
                }
            })?)
        }
        None => None,
    };
    drop(events_tx);

    let mut mirror_worker = None;
    for event in events_rx {
        match event {
            HostEvent::Finalize => {
                if !app.trigger_finalize() {
                    debug!("Finalize already triggered");
                    continue;
                }
                match start_mirror(&app, &CONFIG.framebuffer) {
                    Ok(worker) => mirror_worker = worker,
                    Err(e) => error!("{:#}", e),
                }
            }
            HostEvent::Exit(signal) => {
                info!("Received {}, shutting down", signal);
                break;
            }
        }
    }

    drop(mirror_worker);
    app.unload();
    info!("Bootscreen exited.");
    Ok(())
}
