//! Single detection problems read from JSON.
//!
//! ```json
//! { "h": [[1.0, 0.2], [0.1, 0.9]], "y": [1.1, -0.8] }
//! { "h": [[[1.0, 0.5]]], "y": [[0.9, -1.4]] }
//! ```
//!
//! Complex entries are `[re, im]` pairs. Rows of `h` are receive antennas.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::io::Read;

use crate::detector::{ChannelScalar, Detection, FireflyDetector, FireflyParams};
use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Problem {
    Real { h: Vec<Vec<f64>>, y: Vec<f64> },
    Complex { h: Vec<Vec<Complex64>>, y: Vec<Complex64> },
}

/// Serializable detection outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution<T> {
    pub symbols: Vec<T>,
    pub bipolar: Vec<i8>,
    pub residual_energy: f64,
    pub degenerate_decisions: usize,
    pub weak_pivot: Option<usize>,
}

impl<T> From<Detection<T>> for Solution<T> {
    fn from(d: Detection<T>) -> Self {
        Self {
            symbols: d.symbols,
            bipolar: d.bipolar,
            residual_energy: d.residual_energy,
            degenerate_decisions: d.diagnostics.degenerate_decisions,
            weak_pivot: d.diagnostics.weak_pivot,
        }
    }
}

fn matrix_from_rows<T: ChannelScalar>(rows: &[Vec<T>]) -> SimResult<DMatrix<T>> {
    let cols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().position(|r| r.len() != cols) {
        return Err(SimError::Config(format!(
            "row {} of h has {} entries, expected {}",
            bad,
            rows[bad].len(),
            cols
        )));
    }
    Ok(DMatrix::from_row_iterator(
        rows.len(),
        cols,
        rows.iter().flat_map(|r| r.iter().copied()),
    ))
}

fn solve<T: ChannelScalar + Serialize>(
    h: &[Vec<T>],
    y: &[T],
    detector: &FireflyDetector,
    rng: &mut StdRng,
) -> SimResult<serde_json::Value> {
    let h = matrix_from_rows(h)?;
    let y = DVector::from_column_slice(y);
    let solution = Solution::from(detector.detect(&y, &h, rng)?);
    Ok(serde_json::to_value(solution)?)
}

impl Problem {
    pub fn from_reader(src: impl Read) -> SimResult<Self> {
        Ok(serde_json::from_reader(src)?)
    }

    pub fn is_complex(&self) -> bool {
        matches!(self, Problem::Complex { .. })
    }

    /// Run the firefly detector with a seeded generator.
    pub fn solve(&self, params: FireflyParams, seed: u64) -> SimResult<serde_json::Value> {
        let detector = FireflyDetector::new(params)?;
        let mut rng = StdRng::seed_from_u64(seed);
        match self {
            Problem::Real { h, y } => solve(h, y, &detector, &mut rng),
            Problem::Complex { h, y } => solve(h, y, &detector, &mut rng),
        }
    }
}
