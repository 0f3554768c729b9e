use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::sim::link::{BerPoint, SweepObserver};
use crate::utils::consts::PROGRESS_UPDATE_INTERVAL_MS;

pub struct ProgressManager {
    mp: MultiProgress,
    bars: Arc<Mutex<HashMap<String, ProgressBar>>>,
}

impl ProgressManager {
    pub fn new() -> Self {
        Self {
            mp: MultiProgress::new(),
            bars: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a new progress bar
    /// - `id`: unique bar identifier
    /// - `total`: total progress value
    /// - `template`: indicatif style template
    /// - `message`: initial message
    pub fn create_bar(
        &self,
        id: &str,
        total: u64,
        template: &str,
        message: &str,
    ) -> Result<(), String> {
        let mut bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;

        if bars.contains_key(id) {
            return Err(format!("Progress bar '{}' already exists", id));
        }

        let pb = self
            .mp
            .add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .map_err(|e| format!("Bad template: {}", e))?
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(PROGRESS_UPDATE_INTERVAL_MS));

        bars.insert(id.to_string(), pb);
        Ok(())
    }

    pub fn inc(&self, id: &str, value: u64) -> Result<(), String> {
        self.with_bar(id, |pb| pb.inc(value))
    }

    pub fn set_message(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| pb.set_message(message.to_string()))
    }

    /// Finish a bar and keep it on screen
    pub fn finish(&self, id: &str, message: &str) -> Result<(), String> {
        self.with_bar(id, |pb| pb.finish_with_message(message.to_string()))
    }

    pub fn exists(&self, id: &str) -> bool {
        if let Ok(bars) = self.bars.lock() {
            bars.contains_key(id)
        } else {
            false
        }
    }

    pub fn position(&self, id: &str) -> Result<u64, String> {
        self.with_bar(id, |pb| pb.position())
    }

    /// Finish every bar
    pub fn finish_all(&self) {
        if let Ok(mut bars) = self.bars.lock() {
            for (_, pb) in bars.drain() {
                pb.finish();
            }
        }
    }

    fn with_bar<T>(&self, id: &str, f: impl FnOnce(&ProgressBar) -> T) -> Result<T, String> {
        let bars = self
            .bars
            .lock()
            .map_err(|e| format!("Lock error: {}", e))?;
        match bars.get(id) {
            Some(pb) => Ok(f(pb)),
            None => Err(format!("Progress bar '{}' not found", id)),
        }
    }
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

/// One bar per receiver, advanced once per finished SNR point.
impl SweepObserver for ProgressManager {
    fn receiver_started(&self, label: &str, points: usize) {
        if let Err(e) = self.create_bar(label, points as u64, templates::SWEEP, label) {
            tracing::warn!("{}", e);
        }
    }

    fn point_done(&self, label: &str, point: &BerPoint) {
        let message = format!("{} {:.1} dB → {:.2e}", label, point.snr_db, point.ber);
        let _ = self.set_message(label, &message);
        let _ = self.inc(label, 1);
    }

    fn receiver_finished(&self, label: &str, elapsed_secs: f64) {
        let _ = self.finish(label, &format!("{} done in {:.1}s", label, elapsed_secs));
    }
}

pub mod templates {
    pub const SWEEP: &str =
        "{spinner} SNR [{bar:30.cyan}] {pos}/{len} points {elapsed_precise} {msg}";
}
