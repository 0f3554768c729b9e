//! Link-level bit-error-rate simulation
//!
//! For every SNR point: draw a chunk of random bits, modulate, send each
//! block of `nb_tx` symbols through a fresh channel realization, detect,
//! demodulate and count bit errors. A point stops once `target_errors`
//! errors were seen or `max_chunks` chunks were sent.
//!
//! SNR points run in parallel on the rayon pool. Each point owns its
//! channel copy and a generator seeded from the sweep seed and the point
//! index, so results do not depend on scheduling.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::detector::Receiver;
use crate::error::{SimError, SimResult};
use crate::sim::channel::MimoFlatChannel;
use crate::sim::config::SweepConfig;
use crate::sim::modem::Modem;
use crate::sim::report::{ReceiverReport, SweepReport};

/// Result of one SNR point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BerPoint {
    pub snr_db: f64,
    pub bits: u64,
    pub errors: u64,
    pub chunks: u64,
    pub ber: f64,
}

/// When to stop accumulating an SNR point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StopCriteria {
    pub max_chunks: u64,
    pub target_errors: u64,
    pub chunk_bits: usize,
}

impl From<&SweepConfig> for StopCriteria {
    fn from(config: &SweepConfig) -> Self {
        Self {
            max_chunks: config.max_chunks,
            target_errors: config.target_errors,
            chunk_bits: config.chunk_bits,
        }
    }
}

/// Progress hooks for a running sweep. All methods default to no-ops.
pub trait SweepObserver: Sync {
    fn receiver_started(&self, _label: &str, _points: usize) {}
    fn point_done(&self, _label: &str, _point: &BerPoint) {}
    fn receiver_finished(&self, _label: &str, _elapsed_secs: f64) {}
}

/// Observer that ignores every event.
pub struct Silent;

impl SweepObserver for Silent {}

/// Modem, channel and receiver of one simulated link.
pub struct LinkModel {
    modem: Modem,
    channel: MimoFlatChannel,
    receiver: Box<dyn Receiver>,
}

impl LinkModel {
    pub fn new(modem: Modem, channel: MimoFlatChannel, receiver: Box<dyn Receiver>) -> Self {
        Self {
            modem,
            channel,
            receiver,
        }
    }

    pub fn label(&self) -> String {
        self.receiver.label()
    }

    /// Simulate one SNR point until the stop criteria are met.
    pub fn simulate_snr(
        &self,
        snr_db: f64,
        criteria: &StopCriteria,
        seed: u64,
        cancel: &AtomicBool,
    ) -> SimResult<BerPoint> {
        let mut channel = self.channel.clone();
        channel.set_snr_db(snr_db, self.modem.es());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut bits = 0u64;
        let mut errors = 0u64;
        let mut chunks = 0u64;
        while chunks < criteria.max_chunks && errors < criteria.target_errors {
            if cancel.load(Ordering::Relaxed) {
                tracing::warn!(
                    "{} @ {:.1} dB interrupted after {} chunks",
                    self.label(),
                    snr_db,
                    chunks
                );
                break;
            }
            errors += self.transmit_chunk(&channel, criteria.chunk_bits, &mut rng)?;
            bits += criteria.chunk_bits as u64;
            chunks += 1;
        }

        let ber = if bits == 0 { 0.0 } else { errors as f64 / bits as f64 };
        tracing::info!(
            "{} @ {:.1} dB: BER {:.3e} ({} errors / {} bits)",
            self.label(),
            snr_db,
            ber,
            errors,
            bits
        );
        Ok(BerPoint {
            snr_db,
            bits,
            errors,
            chunks,
            ber,
        })
    }

    /// Send one chunk of random bits, return the number of bit errors.
    pub fn transmit_chunk(
        &self,
        channel: &MimoFlatChannel,
        chunk_bits: usize,
        rng: &mut StdRng,
    ) -> SimResult<u64> {
        let sent: Vec<u8> = (0..chunk_bits).map(|_| rng.random::<bool>() as u8).collect();
        let nb_tx = channel.nb_tx();
        let symbols_per_chunk = chunk_bits / self.modem.bits_per_symbol();
        if chunk_bits % self.modem.bits_per_symbol() != 0 || symbols_per_chunk % nb_tx != 0 {
            return Err(SimError::RaggedBlock {
                symbols: symbols_per_chunk,
                nb_tx,
            });
        }

        let received = match self.modem {
            Modem::Bpsk => {
                let symbols = self.modem.modulate_real(&sent);
                let mut decided = Vec::with_capacity(symbols.len());
                for block in symbols.chunks_exact(nb_tx) {
                    let (y, h) = channel.propagate_real(block, rng)?;
                    decided.extend(self.receiver.receive_real(&y, &h, rng)?);
                }
                self.modem.demodulate_real(&decided)
            }
            Modem::Qpsk => {
                let symbols = self.modem.modulate_complex(&sent)?;
                let mut decided = Vec::with_capacity(symbols.len());
                for block in symbols.chunks_exact(nb_tx) {
                    let (y, h) = channel.propagate_complex(block, rng)?;
                    decided.extend(self.receiver.receive_complex(&y, &h, rng)?);
                }
                self.modem.demodulate_complex(&decided)
            }
        };

        Ok(sent
            .iter()
            .zip(received.iter())
            .filter(|(a, b)| a != b)
            .count() as u64)
    }
}

/// Generator seed of SNR point `index`
fn point_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// BER curve of one link over a set of SNR points.
pub fn link_performance(
    model: &LinkModel,
    snrs: &[f64],
    criteria: &StopCriteria,
    seed: u64,
    cancel: &AtomicBool,
    observer: &dyn SweepObserver,
) -> SimResult<Vec<BerPoint>> {
    let label = model.label();
    snrs.par_iter()
        .enumerate()
        .map(|(index, &snr_db)| -> SimResult<BerPoint> {
            let point = model.simulate_snr(snr_db, criteria, point_seed(seed, index), cancel)?;
            observer.point_done(&label, &point);
            Ok(point)
        })
        .collect()
}

/// Run every configured receiver over the SNR grid and time each one.
pub fn run_sweep(
    config: &SweepConfig,
    cancel: &AtomicBool,
    observer: &dyn SweepObserver,
) -> SimResult<SweepReport> {
    config.validate()?;
    let criteria = StopCriteria::from(config);
    let channel = MimoFlatChannel::new(config.nb_tx, config.nb_rx)?;

    let mut receivers = Vec::with_capacity(config.receivers.len());
    for spec in &config.receivers {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let model = LinkModel::new(config.modem, channel.clone(), spec.build()?);
        let label = model.label();
        tracing::info!("Computing {}", label);
        observer.receiver_started(&label, config.snr_db.len());

        let start = Instant::now();
        let points = link_performance(
            &model,
            &config.snr_db,
            &criteria,
            config.seed,
            cancel,
            observer,
        )?;
        let elapsed_secs = start.elapsed().as_secs_f64();

        tracing::info!("Finished {} in {:.2} min", label, elapsed_secs / 60.0);
        observer.receiver_finished(&label, elapsed_secs);
        receivers.push(ReceiverReport {
            label,
            receiver: spec.clone(),
            elapsed_secs,
            points,
        });
    }

    Ok(SweepReport {
        config: config.clone(),
        interrupted: cancel.load(Ordering::Relaxed),
        receivers,
    })
}
