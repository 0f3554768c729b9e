use nalgebra::{DMatrix, DVector};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::system::{ChannelScalar, TriangularSystem};
use super::{Detection, Diagnostics};
use crate::error::{DetectError, DetectResult};
use crate::utils::consts::{
    DEFAULT_FIREFLY_GAMMA, DEFAULT_FIREFLY_ITERATIONS, DEFAULT_FIREFLY_K, ILL_CONDITIONED_RATIO,
};

/// Firefly detector parameters. Missing serialized fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireflyParams {
    /// Candidate pool size
    pub nb_iter: usize,
    /// Decay scale of the attractiveness function
    pub gamma: f64,
    /// Exponent applied to the squared distance
    pub k: f64,
}

impl Default for FireflyParams {
    fn default() -> Self {
        Self {
            nb_iter: DEFAULT_FIREFLY_ITERATIONS,
            gamma: DEFAULT_FIREFLY_GAMMA,
            k: DEFAULT_FIREFLY_K,
        }
    }
}

impl FireflyParams {
    pub fn with_iterations(nb_iter: usize) -> Self {
        Self {
            nb_iter,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> DetectResult<()> {
        if self.nb_iter == 0 {
            return Err(DetectError::InvalidParameter {
                name: "nb_iter",
                reason: "pool needs at least one candidate".to_string(),
            });
        }
        for (name, value) in [("gamma", self.gamma), ("k", self.k)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(DetectError::InvalidParameter {
                    name,
                    reason: format!("must be positive and finite, got {}", value),
                });
            }
        }
        Ok(())
    }
}

/// Randomized firefly detector.
///
/// Every candidate of the pool walks the triangular system from the last
/// coordinate to the first. At each coordinate the two bipolar hypotheses
/// get an attractiveness `exp(-gamma · d^k)` from their squared residual
/// `d`, and the candidate picks -1 with probability
/// `a(-1) / (a(-1) + a(+1))`. The candidate with the lowest accumulated
/// residual is returned.
///
/// Draw order is fixed: coordinates outer (N-1 down to 0), candidates inner,
/// one `f64` per candidate per coordinate. The same seed therefore always
/// reproduces the same decision.
#[derive(Debug, Clone)]
pub struct FireflyDetector {
    params: FireflyParams,
}

impl FireflyDetector {
    pub fn new(params: FireflyParams) -> DetectResult<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &FireflyParams {
        &self.params
    }

    pub fn detect<T, R>(
        &self,
        y: &DVector<T>,
        h: &DMatrix<T>,
        rng: &mut R,
    ) -> DetectResult<Detection<T>>
    where
        T: ChannelScalar,
        R: Rng + ?Sized,
    {
        let system = TriangularSystem::new(y, h)?;
        let mut diagnostics = Diagnostics {
            weak_pivot: system.weak_pivot(ILL_CONDITIONED_RATIO),
            ..Default::default()
        };
        if let Some(row) = diagnostics.weak_pivot {
            tracing::debug!(
                "Near-singular channel: R[{},{}] = {:e}, detection accuracy degraded",
                row,
                row,
                system.r(row, row)
            );
        }

        let (bipolar, residual_energy) = self.sweep(&system, rng, &mut diagnostics);
        if diagnostics.degenerate_decisions > 0 {
            tracing::debug!(
                "{} decisions fell back after attractiveness underflow",
                diagnostics.degenerate_decisions
            );
        }

        Ok(Detection {
            symbols: T::fold(&bipolar),
            bipolar,
            residual_energy,
            diagnostics,
        })
    }

    /// Decide every coordinate for the whole pool, return the best candidate.
    fn sweep<R: Rng + ?Sized>(
        &self,
        system: &TriangularSystem,
        rng: &mut R,
        diagnostics: &mut Diagnostics,
    ) -> (Vec<i8>, f64) {
        let n = system.dims();
        let pool_size = self.params.nb_iter;
        let mut pool = vec![1i8; pool_size * n];
        let mut energy = vec![0.0f64; pool_size];

        for i in (0..n).rev() {
            let yt = system.yt(i);
            let rii = system.r(i, i);

            for (x, e) in pool.chunks_exact_mut(n).zip(energy.iter_mut()) {
                let partial = system.partial_sum(i, x);
                let (p_minus, degenerate) =
                    minus_probability(yt - partial, rii, self.params.gamma, self.params.k);
                if degenerate {
                    diagnostics.degenerate_decisions += 1;
                }

                let alpha: f64 = rng.random();
                if alpha < p_minus {
                    x[i] = -1;
                }
                *e += system.row_residual(i, x[i] as f64, partial);
            }
        }

        // first minimum wins
        let mut best = 0;
        for (c, &e) in energy.iter().enumerate().skip(1) {
            if e < energy[best] {
                best = c;
            }
        }
        (pool[best * n..(best + 1) * n].to_vec(), energy[best])
    }
}

/// Probability of deciding -1 on a row with pivot `rii` once the decided
/// interference is removed (`offset = yt - s`), and whether the fallback
/// was needed.
///
/// When both attractiveness scores underflow the ratio is replaced by its
/// exact limit, the logistic of the scaled distance difference. When the
/// distances themselves overflow, the closer hypothesis is read from the
/// signs: -1 is closer exactly when `offset` and `rii` have opposite signs.
/// A true tie defaults to the +1 placeholder.
fn minus_probability(offset: f64, rii: f64, gamma: f64, k: f64) -> (f64, bool) {
    let d_minus = (offset + rii).powi(2).powf(k);
    let d_plus = (offset - rii).powi(2).powf(k);
    let a_minus = (-gamma * d_minus).exp();
    let a_plus = (-gamma * d_plus).exp();
    let total = a_minus + a_plus;
    if total > 0.0 && total.is_finite() {
        return (a_minus / total, false);
    }

    let p = 1.0 / (1.0 + (gamma * (d_minus - d_plus)).exp());
    if p.is_finite() {
        (p, true)
    } else if offset * rii < 0.0 {
        (1.0, true)
    } else {
        (0.0, true)
    }
}

/// One-shot firefly detection with explicit parameters.
pub fn firefly<T, R>(
    y: &DVector<T>,
    h: &DMatrix<T>,
    nb_iter: usize,
    gamma: f64,
    k: f64,
    rng: &mut R,
) -> DetectResult<Vec<T>>
where
    T: ChannelScalar,
    R: Rng + ?Sized,
{
    let detector = FireflyDetector::new(FireflyParams { nb_iter, gamma, k })?;
    Ok(detector.detect(y, h, rng)?.symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_complex::Complex64;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn channel_4x4() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            4,
            4,
            &[
                3.0, 0.4, -0.2, 0.1, //
                0.3, 2.8, 0.5, -0.4, //
                -0.1, 0.2, 3.2, 0.3, //
                0.5, -0.3, 0.1, 2.9,
            ],
        )
    }

    #[test]
    fn test_identity_scenario() {
        let h = DMatrix::<f64>::identity(2, 2);
        let y = DVector::from_vec(vec![1.0, -1.0]);
        let mut rng = StdRng::seed_from_u64(1);

        let detector = FireflyDetector::new(FireflyParams::with_iterations(64)).unwrap();
        let detection = detector.detect(&y, &h, &mut rng).unwrap();
        assert_eq!(detection.bipolar, vec![1, -1]);
        assert!(detection.residual_energy < 1e-20);
    }

    #[test]
    fn test_noiseless_round_trip() {
        let h = channel_4x4();
        let x = [-1i8, 1, 1, -1];
        let y = &h * DVector::from_iterator(4, x.iter().map(|&v| v as f64));

        for seed in 0..10 {
            let mut rng = StdRng::seed_from_u64(seed);
            let decided = firefly(&y, &h, 50, 0.5, 1.0, &mut rng).unwrap();
            assert_eq!(decided, vec![-1.0, 1.0, 1.0, -1.0], "seed {}", seed);
        }
    }

    #[test]
    fn test_same_seed_same_decision() {
        let h = channel_4x4();
        let y = DVector::from_vec(vec![0.4, -2.1, 3.3, -0.2]);
        let detector = FireflyDetector::new(FireflyParams {
            nb_iter: 5,
            gamma: 0.05,
            k: 1.0,
        })
        .unwrap();

        let first = detector.detect(&y, &h, &mut StdRng::seed_from_u64(99)).unwrap();
        let second = detector.detect(&y, &h, &mut StdRng::seed_from_u64(99)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_consumes_one_draw_per_candidate_per_coordinate() {
        let h = channel_4x4();
        let y = DVector::from_vec(vec![1.0, 1.0, -1.0, 1.0]);
        let detector = FireflyDetector::new(FireflyParams::with_iterations(7)).unwrap();

        let mut used = StdRng::seed_from_u64(5);
        detector.detect(&y, &h, &mut used).unwrap();

        let mut reference = StdRng::seed_from_u64(5);
        for _ in 0..7 * 4 {
            let _: f64 = reference.random();
        }
        assert_eq!(used.random::<u64>(), reference.random::<u64>());
    }

    #[test]
    fn test_outputs_are_bipolar() {
        let h = channel_4x4();
        let y = DVector::from_vec(vec![0.3, -0.7, 12.0, -5.5]);
        let mut rng = StdRng::seed_from_u64(11);
        let decided = firefly(&y, &h, 20, 0.5, 2.0, &mut rng).unwrap();
        assert!(decided.iter().all(|&v| v == 1.0 || v == -1.0));
    }

    #[test]
    fn test_complex_output_folds_halves() {
        let h = DMatrix::<Complex64>::identity(2, 2);
        let y = DVector::from_vec(vec![Complex64::new(1.0, -1.0), Complex64::new(-1.0, -1.0)]);
        let mut rng = StdRng::seed_from_u64(2);

        let detector = FireflyDetector::new(FireflyParams::with_iterations(64)).unwrap();
        let detection = detector.detect(&y, &h, &mut rng).unwrap();
        assert_eq!(detection.bipolar, vec![1, -1, -1, -1]);
        assert_eq!(detection.symbols, y.as_slice());
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(matches!(
            FireflyDetector::new(FireflyParams::with_iterations(0)),
            Err(DetectError::InvalidParameter { name: "nb_iter", .. })
        ));
        let bad_gamma = FireflyParams {
            gamma: -0.5,
            ..Default::default()
        };
        assert!(matches!(
            bad_gamma.validate(),
            Err(DetectError::InvalidParameter { name: "gamma", .. })
        ));
        let bad_k = FireflyParams {
            k: f64::NAN,
            ..Default::default()
        };
        assert!(bad_k.validate().is_err());
    }

    #[test]
    fn test_shape_mismatch_fails_fast() {
        let h = channel_4x4();
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let mut rng = StdRng::seed_from_u64(0);
        let err = firefly(&y, &h, 10, 0.5, 1.0, &mut rng).unwrap_err();
        assert_eq!(err, DetectError::ShapeMismatch { rows: 4, len: 3 });
    }

    #[test]
    fn test_underflow_falls_back_to_closer_hypothesis() {
        // distances of ~1e6 push both exponentials to zero
        let (p, degenerate) = minus_probability(-1000.0, 1.0, 0.5, 1.0);
        assert!(degenerate);
        assert_eq!(p, 1.0);

        let (p, degenerate) = minus_probability(1000.0, 1.0, 0.5, 1.0);
        assert!(degenerate);
        assert_eq!(p, 0.0);

        let (p, degenerate) = minus_probability(f64::INFINITY, 1.0, 0.5, 1.0);
        assert!(degenerate);
        assert_eq!(p, 0.0);

        let (p, degenerate) = minus_probability(-1.0, 1.0, 0.5, 1.0);
        assert!(!degenerate);
        assert!((p - 1.0 / (1.0 + (-2.0f64).exp())).abs() < 1e-12);
    }

    #[test]
    fn test_overflowing_distances_keep_closer_hypothesis() {
        let (p, degenerate) = minus_probability(-1.0e200, 1.0, 0.5, 1.0);
        assert!(degenerate);
        assert_eq!(p, 1.0);

        let (p, _) = minus_probability(-1.0e200, -1.0, 0.5, 1.0);
        assert_eq!(p, 0.0);

        let h = DMatrix::<f64>::identity(2, 2);
        let y = DVector::from_vec(vec![1.0e200, -1.0e200]);
        let mut rng = StdRng::seed_from_u64(3);
        let decided = firefly(&y, &h, 4, 0.5, 1.0, &mut rng).unwrap();
        assert_eq!(decided, vec![1.0, -1.0]);
    }

    #[test]
    fn test_tied_residuals_keep_first_candidate() {
        // both hypotheses of y = 0 on a unit channel have residual 1
        let h = DMatrix::<f64>::identity(1, 1);
        let y = DVector::from_vec(vec![0.0]);
        let detector = FireflyDetector::new(FireflyParams::with_iterations(8)).unwrap();

        for seed in 0..20 {
            let first_draw: f64 = StdRng::seed_from_u64(seed).random();
            let expected = if first_draw < 0.5 { -1 } else { 1 };

            let detection = detector.detect(&y, &h, &mut StdRng::seed_from_u64(seed)).unwrap();
            assert_eq!(detection.bipolar, vec![expected], "seed {}", seed);
            assert!((detection.residual_energy - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_reported_energy_is_residual_of_winner() {
        let h = channel_4x4();
        let detector = FireflyDetector::new(FireflyParams {
            nb_iter: 6,
            gamma: 0.1,
            k: 1.0,
        })
        .unwrap();
        let mut rng = StdRng::seed_from_u64(21);

        for _ in 0..50 {
            let y = DVector::from_fn(4, |_, _| rng.random_range(-4.0..4.0));
            let detection = detector.detect(&y, &h, &mut rng).unwrap();
            let system = TriangularSystem::new(&y, &h).unwrap();
            let expected = system.residual_energy(&detection.bipolar);
            assert!(
                (detection.residual_energy - expected).abs() <= 1e-9 * (1.0 + expected),
                "{} vs {}",
                detection.residual_energy,
                expected
            );
        }
    }

    #[test]
    fn test_wide_channel_is_not_fatal() {
        let h = DMatrix::from_row_slice(1, 2, &[1.0, 1.0]);
        let y = DVector::from_vec(vec![2.0]);
        let mut rng = StdRng::seed_from_u64(6);

        let detector = FireflyDetector::new(FireflyParams::with_iterations(64)).unwrap();
        let detection = detector.detect(&y, &h, &mut rng).unwrap();
        assert_eq!(detection.bipolar, vec![1, 1]);
        assert!(detection.residual_energy.is_finite());
        assert!(detection.residual_energy < 1e-20);
        assert_eq!(detection.diagnostics.weak_pivot, Some(1));
    }

    #[test]
    fn test_large_received_values_stay_finite() {
        let h = DMatrix::<f64>::identity(3, 3);
        let y = DVector::from_vec(vec![1.0e4, -1.0e4, 3.0e3]);
        let mut rng = StdRng::seed_from_u64(4);

        let detector = FireflyDetector::new(FireflyParams::with_iterations(8)).unwrap();
        let detection = detector.detect(&y, &h, &mut rng).unwrap();
        assert!(detection.diagnostics.degenerate_decisions > 0);
        assert!(detection.residual_energy.is_finite());
        assert_eq!(detection.bipolar, vec![1, -1, 1]);
    }

    #[test]
    fn test_singular_channel_is_not_fatal() {
        let h = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let y = DVector::from_vec(vec![3.0, 6.0]);
        let mut rng = StdRng::seed_from_u64(8);

        let detector = FireflyDetector::new(FireflyParams::with_iterations(16)).unwrap();
        let detection = detector.detect(&y, &h, &mut rng).unwrap();
        assert!(detection.diagnostics.ill_conditioned());
        assert!(detection.residual_energy.is_finite());
        assert!(detection.bipolar.iter().all(|&b| b == 1 || b == -1));
    }
}
