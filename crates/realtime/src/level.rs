//! Microphone level metering.

use std::sync::Arc;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::debug;

/// Weight of the previous level in the exponential smoothing.
pub const SMOOTHING: f32 = 0.8;

/// RMS of a PCM16 frame, normalized to `[0, 1]`.
pub fn rms(frame: &[i16]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum: f64 = frame.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
    let rms = (sum / frame.len() as f64).sqrt() / f64::from(i16::MAX);
    (rms as f32).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy)]
pub struct LevelMeter {
    level: f32,
    smoothing: f32,
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(SMOOTHING)
    }
}

impl LevelMeter {
    pub fn new(smoothing: f32) -> Self {
        Self {
            level: 0.0,
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn update(&mut self, frame: &[i16]) -> f32 {
        self.level = self.smoothing * self.level + (1.0 - self.smoothing) * rms(frame);
        self.level
    }
}

/// Meters `frames` into `level` until the capture ends, then resets the level
/// and signals `capture_ended`.
pub fn spawn_meter(
    mut frames: mpsc::Receiver<Vec<i16>>,
    level: Arc<watch::Sender<f32>>,
    capture_ended: mpsc::Sender<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut meter = LevelMeter::default();
        while let Some(frame) = frames.recv().await {
            level.send_replace(meter.update(&frame));
        }
        level.send_replace(0.0);
        debug!("Microphone capture ended");
        let _ = capture_ended.send(()).await;
    })
}
