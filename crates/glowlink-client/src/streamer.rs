//! Color streaming engine
//!
//! A repeating timer pulls one region sample per tick from the capture
//! collaborator, publishes it for local display, and — while a session is
//! connected — runs delta → encode → send. The periodic trigger and the
//! per-tick logic are separate: [`ColorStreamer::tick`] is public so tests
//! drive one tick synchronously without a timer.

use crate::connection::ConnectionManager;
use glowlink_core::RegionColors;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Normalized crop rectangle handed to the capture collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Default for CropRect {
    fn default() -> Self {
        Self {
            left: 0.0,
            top: 0.0,
            right: 1.0,
            bottom: 1.0,
        }
    }
}

/// Produces region color samples. `None` means "no sample this tick" and
/// the engine skips the tick; it is not an error.
pub trait CaptureSource: Send + Sync {
    fn capture(&self, crop: &CropRect) -> Option<RegionColors>;
}

impl<F> CaptureSource for F
where
    F: Fn(&CropRect) -> Option<RegionColors> + Send + Sync,
{
    fn capture(&self, crop: &CropRect) -> Option<RegionColors> {
        self(crop)
    }
}

/// Read-only streaming settings. Changes take effect by restarting the
/// engine with the new config, never by mutating a running interval.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Frames per second; the tick period is `1000 / update_rate` ms
    pub update_rate: f64,
    pub crop: CropRect,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            update_rate: 10.0,
            crop: CropRect::default(),
        }
    }
}

impl StreamConfig {
    fn tick_period(&self) -> Duration {
        // update_rate is specified positive; clamp anyway rather than panic
        Duration::from_secs_f64(1.0 / self.update_rate.max(0.001))
    }
}

/// The periodic capture → delta → encode → send engine
pub struct ColorStreamer {
    manager: Arc<ConnectionManager>,
    capture: Arc<dyn CaptureSource>,
    colors: Arc<watch::Sender<RegionColors>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ColorStreamer {
    pub fn new(manager: Arc<ConnectionManager>, capture: Arc<dyn CaptureSource>) -> Self {
        let (colors, _) = watch::channel(RegionColors::neutral());
        Self {
            manager,
            capture,
            colors: Arc::new(colors),
            task: Mutex::new(None),
        }
    }

    /// Locally displayed colors: the latest sample while running, the
    /// neutral placeholder otherwise
    pub fn colors(&self) -> watch::Receiver<RegionColors> {
        self.colors.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Run one tick. Skips entirely when the capture source has no sample;
    /// publishes the sample for display either way, and only encodes and
    /// sends while a session is connected.
    pub async fn tick(&self, crop: &CropRect) {
        run_tick(&self.manager, self.capture.as_ref(), &self.colors, crop).await;
    }

    /// Start (or restart) the periodic engine. Any previous timer is
    /// cancelled first, so a config change is exactly a restart.
    pub fn start(&self, config: StreamConfig) {
        self.cancel_task();

        info!(
            "streaming at {:.1} fps (every {:?})",
            config.update_rate,
            config.tick_period()
        );

        let manager = self.manager.clone();
        let capture = self.capture.clone();
        let colors = self.colors.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.tick_period());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                run_tick(&manager, capture.as_ref(), &colors, &config.crop).await;
            }
        });

        *self.task.lock() = Some(task);
    }

    /// Stop the engine: cancel the pending tick and reset the displayed
    /// colors to the neutral placeholder. No dangling periodic job remains.
    pub fn stop(&self) {
        self.cancel_task();
        let _ = self.colors.send(RegionColors::neutral());
    }

    fn cancel_task(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for ColorStreamer {
    fn drop(&mut self) {
        self.cancel_task();
    }
}

async fn run_tick(
    manager: &ConnectionManager,
    capture: &dyn CaptureSource,
    colors: &watch::Sender<RegionColors>,
    crop: &CropRect,
) {
    let Some(sample) = capture.capture(crop) else {
        debug!("no capture sample, skipping tick");
        return;
    };

    // Local display stays live whether or not anything is connected
    let _ = colors.send(sample);

    // Delta baseline and sequence live in the session; without one there
    // is nothing to encode against and nothing to send
    if let Some(frame) = manager.encode_next_frame(sample.streamed()) {
        manager.send_frame(frame).await;
    }
}
