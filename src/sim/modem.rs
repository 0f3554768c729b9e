//! Antipodal modulation for the link simulation

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Bipolar mapping of one bit: 0 → +1, 1 → -1
fn bipolar(bit: u8) -> f64 {
    if bit == 0 { 1.0 } else { -1.0 }
}

fn hard_bit(value: f64) -> u8 {
    if value < 0.0 { 1 } else { 0 }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modem {
    /// Real antipodal symbols over a real channel
    Bpsk,
    /// 4-QAM, one bipolar bit on each of I and Q
    Qpsk,
}

impl Modem {
    pub fn bits_per_symbol(&self) -> usize {
        match self {
            Modem::Bpsk => 1,
            Modem::Qpsk => 2,
        }
    }

    /// Average symbol energy
    pub fn es(&self) -> f64 {
        self.bits_per_symbol() as f64
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Modem::Qpsk)
    }

    /// BPSK symbols; callers must not use a complex modem here
    pub fn modulate_real(&self, bits: &[u8]) -> Vec<f64> {
        bits.iter().map(|&b| bipolar(b)).collect()
    }

    /// QPSK symbols, first bit of each pair on I
    pub fn modulate_complex(&self, bits: &[u8]) -> SimResult<Vec<Complex64>> {
        if bits.len() % 2 != 0 {
            return Err(SimError::Config(format!(
                "QPSK needs an even number of bits, got {}",
                bits.len()
            )));
        }
        Ok(bits
            .chunks_exact(2)
            .map(|pair| Complex64::new(bipolar(pair[0]), bipolar(pair[1])))
            .collect())
    }

    pub fn demodulate_real(&self, symbols: &[f64]) -> Vec<u8> {
        symbols.iter().map(|&s| hard_bit(s)).collect()
    }

    pub fn demodulate_complex(&self, symbols: &[Complex64]) -> Vec<u8> {
        symbols
            .iter()
            .flat_map(|s| [hard_bit(s.re), hard_bit(s.im)])
            .collect()
    }
}
