use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::detector::{FireflyDetector, FireflyParams, KBestDetector, Receiver};
use crate::error::{SimError, SimResult};
use crate::sim::modem::Modem;
use crate::utils::consts::*;

/// Receiver under test, as written in a sweep configuration.
///
/// ```json
/// { "kind": "firefly", "nb_iter": 40, "gamma": 0.5, "k": 1.0 }
/// { "kind": "kbest", "k": 16 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReceiverSpec {
    Firefly(FireflyParams),
    Kbest { k: usize },
}

impl ReceiverSpec {
    pub fn build(&self) -> SimResult<Box<dyn Receiver>> {
        let receiver: Box<dyn Receiver> = match self {
            ReceiverSpec::Firefly(params) => Box::new(FireflyDetector::new(*params)?),
            ReceiverSpec::Kbest { k } => Box::new(KBestDetector::new(*k)?),
        };
        Ok(receiver)
    }
}

/// BER sweep settings. Missing JSON fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub nb_tx: usize,
    pub nb_rx: usize,
    pub modem: Modem,
    /// SNR points in dB
    pub snr_db: Vec<f64>,
    /// Stop an SNR point once this many bit errors were counted
    pub target_errors: u64,
    /// Stop an SNR point after this many chunks regardless of errors
    pub max_chunks: u64,
    /// Bits per chunk, must fill whole channel uses
    pub chunk_bits: usize,
    pub seed: u64,
    pub receivers: Vec<ReceiverSpec>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        let (start, stop, step) = DEFAULT_SNR_DB;
        let mut receivers = vec![ReceiverSpec::Kbest { k: DEFAULT_KBEST_K }];
        receivers.extend(
            DEFAULT_SWEEP_ITERATIONS
                .iter()
                .map(|&n| ReceiverSpec::Firefly(FireflyParams::with_iterations(n))),
        );

        Self {
            nb_tx: DEFAULT_NB_TX,
            nb_rx: DEFAULT_NB_RX,
            modem: Modem::Qpsk,
            snr_db: snr_range(start, stop, step),
            target_errors: DEFAULT_TARGET_ERRORS,
            max_chunks: (DEFAULT_TARGET_ERRORS as f64 / TARGET_BER_FLOOR).ceil() as u64,
            chunk_bits: DEFAULT_CHUNK_BITS,
            seed: DEFAULT_SEED,
            receivers,
        }
    }
}

impl SweepConfig {
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let file = File::open(path.as_ref())?;
        let config: SweepConfig = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    /// Bits carried by one channel use
    pub fn bits_per_block(&self) -> usize {
        self.nb_tx * self.modem.bits_per_symbol()
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.nb_tx == 0 || self.nb_rx < self.nb_tx {
            return Err(SimError::Config(format!(
                "need 0 < nb_tx <= nb_rx, got {} x {}",
                self.nb_tx, self.nb_rx
            )));
        }
        if self.chunk_bits == 0 || self.chunk_bits % self.bits_per_block() != 0 {
            return Err(SimError::Config(format!(
                "chunk_bits {} is not a multiple of {} bits per channel use",
                self.chunk_bits,
                self.bits_per_block()
            )));
        }
        if self.snr_db.is_empty() {
            return Err(SimError::Config("no SNR points".to_string()));
        }
        if self.receivers.is_empty() {
            return Err(SimError::Config("no receivers to compare".to_string()));
        }
        if self.target_errors == 0 || self.max_chunks == 0 {
            return Err(SimError::Config(
                "target_errors and max_chunks must be positive".to_string(),
            ));
        }
        for spec in &self.receivers {
            spec.build()?;
        }
        Ok(())
    }
}

/// `start, start + step, ...` up to but excluding `stop`
pub fn snr_range(start: f64, stop: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 {
        return vec![start];
    }
    let count = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..count).map(|i| start + i as f64 * step).collect()
}
