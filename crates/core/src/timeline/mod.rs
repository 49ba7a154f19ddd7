use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Duration substituted while the clock cannot report one.
pub const DEFAULT_DURATION: f64 = 100.0;

/// Converts clock readings into normalised progress.
#[derive(Debug, Clone)]
pub struct ProgressMapper {
    fallback_duration: f64,
    fallback_logged: bool,
}

impl Default for ProgressMapper {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}

impl ProgressMapper {
    pub fn new(fallback_duration: f64) -> Self {
        Self {
            fallback_duration,
            fallback_logged: false,
        }
    }

    pub fn fallback_duration(&self) -> f64 {
        self.fallback_duration
    }

    /// Maps `current_time` onto progress. No upper clamp is applied, so a
    /// clock running past its duration yields values above 1.
    pub fn update(&mut self, current_time: f64, duration: Option<f64>) -> f64 {
        let duration = match duration {
            Some(duration) if duration.is_finite() && duration > 0.0 => duration,
            _ => {
                if !self.fallback_logged {
                    tracing::warn!(
                        reported = ?duration,
                        fallback = self.fallback_duration,
                        "clock has no usable duration, using fallback"
                    );
                    self.fallback_logged = true;
                }
                self.fallback_duration
            }
        };

        current_time.max(0.0) / duration
    }
}

/// Creates the single writer and a reader for a fresh progress value.
pub fn shared_progress() -> (ProgressWriter, ProgressReader) {
    let cell = Arc::new(AtomicU64::new(0.0_f64.to_bits()));
    (
        ProgressWriter { cell: cell.clone() },
        ProgressReader { cell },
    )
}

/// The only handle allowed to publish progress. Deliberately not `Clone`.
#[derive(Debug)]
pub struct ProgressWriter {
    cell: Arc<AtomicU64>,
}

impl ProgressWriter {
    pub fn set(&self, progress: f64) {
        self.cell.store(progress.to_bits(), Ordering::Release);
    }

    pub fn reader(&self) -> ProgressReader {
        ProgressReader {
            cell: self.cell.clone(),
        }
    }
}

/// Read-only view of the shared progress value.
#[derive(Debug, Clone)]
pub struct ProgressReader {
    cell: Arc<AtomicU64>,
}

impl ProgressReader {
    pub fn get(&self) -> f64 {
        f64::from_bits(self.cell.load(Ordering::Acquire))
    }
}
