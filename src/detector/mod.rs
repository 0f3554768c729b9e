//! # MIMO Detection
//!
//! Bipolar symbol detectors over a QR-triangularized channel.
//!
//! - [`FireflyDetector`]: randomized candidate pool, each coordinate
//!   decided by an attractiveness-weighted coin flip, minimum residual wins.
//! - [`KBestDetector`]: deterministic breadth-first tree search keeping the
//!   K lowest partial metrics, used as the reference receiver.
//!
//! Both accept real channels or complex channels (expanded to the real
//! block form internally) and plug into the link simulation through
//! [`Receiver`].
//!
//! ```rust
//! use firefly_mimo::detector::{FireflyDetector, FireflyParams};
//! use nalgebra::{DMatrix, DVector};
//! use rand::SeedableRng;
//!
//! let h = DMatrix::<f64>::identity(2, 2);
//! let y = DVector::from_vec(vec![1.0, -1.0]);
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//!
//! let detector = FireflyDetector::new(FireflyParams::with_iterations(64)).unwrap();
//! let detection = detector.detect(&y, &h, &mut rng).unwrap();
//! assert_eq!(detection.symbols, vec![1.0, -1.0]);
//! ```

pub mod firefly;
pub mod kbest;
pub mod system;

pub use firefly::{FireflyDetector, FireflyParams, firefly};
pub use kbest::KBestDetector;
pub use system::{ChannelScalar, TriangularSystem};

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::RngCore;

use crate::error::DetectResult;

/// Numeric events observed during one detection call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Decisions where both attractiveness scores underflowed
    pub degenerate_decisions: usize,
    /// First coordinate whose R diagonal is negligible, if any
    pub weak_pivot: Option<usize>,
}

impl Diagnostics {
    pub fn ill_conditioned(&self) -> bool {
        self.weak_pivot.is_some()
    }
}

/// Outcome of a detection call.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection<T> {
    /// Decisions in the caller's scalar domain (±1, or ±1 ± j)
    pub symbols: Vec<T>,
    /// Real bipolar decisions before complex folding
    pub bipolar: Vec<i8>,
    /// `‖Qᵀy − R·x‖²` of the returned candidate
    pub residual_energy: f64,
    pub diagnostics: Diagnostics,
}

/// A detector the link simulation can drive.
///
/// Receivers hold no state between calls; all randomness comes from the
/// generator handed in by the caller.
pub trait Receiver: Send + Sync {
    /// Short name used in reports, e.g. `FA-20`
    fn label(&self) -> String;

    fn receive_complex(
        &self,
        y: &DVector<Complex64>,
        h: &DMatrix<Complex64>,
        rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<Complex64>>;

    fn receive_real(
        &self,
        y: &DVector<f64>,
        h: &DMatrix<f64>,
        rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<f64>>;
}

impl Receiver for FireflyDetector {
    fn label(&self) -> String {
        format!("FA-{}", self.params().nb_iter)
    }

    fn receive_complex(
        &self,
        y: &DVector<Complex64>,
        h: &DMatrix<Complex64>,
        rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<Complex64>> {
        Ok(self.detect(y, h, rng)?.symbols)
    }

    fn receive_real(
        &self,
        y: &DVector<f64>,
        h: &DMatrix<f64>,
        rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<f64>> {
        Ok(self.detect(y, h, rng)?.symbols)
    }
}

impl Receiver for KBestDetector {
    fn label(&self) -> String {
        format!("KSE-{}", self.k())
    }

    fn receive_complex(
        &self,
        y: &DVector<Complex64>,
        h: &DMatrix<Complex64>,
        _rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<Complex64>> {
        Ok(self.detect(y, h)?.symbols)
    }

    fn receive_real(
        &self,
        y: &DVector<f64>,
        h: &DMatrix<f64>,
        _rng: &mut dyn RngCore,
    ) -> DetectResult<Vec<f64>> {
        Ok(self.detect(y, h)?.symbols)
    }
}
