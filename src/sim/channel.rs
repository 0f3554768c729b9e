//! MIMO flat-fading channel for link simulation
//!
//! Every channel use draws a fresh matrix with i.i.d. Rayleigh entries
//! (N(0,1) for real channels, CN(0,1) for complex ones), then adds white
//! Gaussian noise sized for the configured SNR.
//!
//! SNR is measured per receive antenna: with unit-power fading each
//! antenna collects `nb_tx · Es` of signal energy, so the noise variance is
//! `N0 = nb_tx · Es / SNR`. Complex noise splits `N0` evenly between I and Q.

use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone)]
pub struct MimoFlatChannel {
    nb_tx: usize,
    nb_rx: usize,
    /// Total noise variance per receive antenna
    noise_variance: f64,
}

fn gaussian<R: Rng + ?Sized>(rng: &mut R, std_dev: f64) -> f64 {
    let z: f64 = StandardNormal.sample(rng);
    z * std_dev
}

impl MimoFlatChannel {
    pub fn new(nb_tx: usize, nb_rx: usize) -> SimResult<Self> {
        if nb_tx == 0 || nb_rx < nb_tx {
            return Err(SimError::Config(format!(
                "channel needs 0 < nb_tx <= nb_rx, got {} x {}",
                nb_tx, nb_rx
            )));
        }
        Ok(Self {
            nb_tx,
            nb_rx,
            noise_variance: 0.0,
        })
    }

    pub fn nb_tx(&self) -> usize {
        self.nb_tx
    }

    pub fn nb_rx(&self) -> usize {
        self.nb_rx
    }

    pub fn noise_variance(&self) -> f64 {
        self.noise_variance
    }

    pub fn set_snr_db(&mut self, snr_db: f64, es: f64) {
        let snr = 10f64.powf(snr_db / 10.0);
        self.noise_variance = self.nb_tx as f64 * es / snr;
    }

    /// Remove the noise entirely
    pub fn set_noiseless(&mut self) {
        self.noise_variance = 0.0;
    }

    pub fn real_fading<R: Rng + ?Sized>(&self, rng: &mut R) -> DMatrix<f64> {
        DMatrix::from_fn(self.nb_rx, self.nb_tx, |_, _| gaussian(&mut *rng, 1.0))
    }

    pub fn complex_fading<R: Rng + ?Sized>(&self, rng: &mut R) -> DMatrix<Complex64> {
        let std_dev = std::f64::consts::FRAC_1_SQRT_2;
        DMatrix::from_fn(self.nb_rx, self.nb_tx, |_, _| {
            Complex64::new(gaussian(&mut *rng, std_dev), gaussian(&mut *rng, std_dev))
        })
    }

    /// One channel use with a real channel; `x` holds one symbol per antenna.
    pub fn propagate_real<R: Rng + ?Sized>(
        &self,
        x: &[f64],
        rng: &mut R,
    ) -> SimResult<(DVector<f64>, DMatrix<f64>)> {
        self.check_block(x.len())?;
        let h = self.real_fading(rng);
        let std_dev = self.noise_variance.sqrt();
        let mut y = &h * DVector::from_column_slice(x);
        for v in y.iter_mut() {
            *v += gaussian(rng, std_dev);
        }
        Ok((y, h))
    }

    /// One channel use with a complex channel; `x` holds one symbol per antenna.
    pub fn propagate_complex<R: Rng + ?Sized>(
        &self,
        x: &[Complex64],
        rng: &mut R,
    ) -> SimResult<(DVector<Complex64>, DMatrix<Complex64>)> {
        self.check_block(x.len())?;
        let h = self.complex_fading(rng);
        let std_dev = (self.noise_variance / 2.0).sqrt();
        let mut y = &h * DVector::from_column_slice(x);
        for v in y.iter_mut() {
            *v += Complex64::new(gaussian(rng, std_dev), gaussian(rng, std_dev));
        }
        Ok((y, h))
    }

    fn check_block(&self, len: usize) -> SimResult<()> {
        if len != self.nb_tx {
            return Err(SimError::RaggedBlock {
                symbols: len,
                nb_tx: self.nb_tx,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_noise_variance_from_snr() {
        let mut channel = MimoFlatChannel::new(4, 4).unwrap();
        channel.set_snr_db(10.0, 2.0);
        assert!((channel.noise_variance() - 0.8).abs() < 1e-12);
        channel.set_snr_db(0.0, 1.0);
        assert!((channel.noise_variance() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_noiseless_propagation_is_linear() {
        let channel = MimoFlatChannel::new(2, 3).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let x = [Complex64::new(1.0, -1.0), Complex64::new(-1.0, -1.0)];
        let (y, h) = channel.propagate_complex(&x, &mut rng).unwrap();

        assert_eq!(h.shape(), (3, 2));
        let expected = &h * DVector::from_column_slice(&x);
        for (a, b) in y.iter().zip(expected.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_fading_has_unit_power() {
        let channel = MimoFlatChannel::new(4, 4).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let mut power = 0.0;
        let draws = 2000;
        for _ in 0..draws {
            power += channel.complex_fading(&mut rng).iter().map(|c| c.norm_sqr()).sum::<f64>();
        }
        let mean = power / (draws * 16) as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean fading power {}", mean);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(MimoFlatChannel::new(0, 4).is_err());
        assert!(MimoFlatChannel::new(4, 2).is_err());

        let channel = MimoFlatChannel::new(2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            channel.propagate_real(&[1.0, 1.0, 1.0], &mut rng),
            Err(SimError::RaggedBlock { symbols: 3, nb_tx: 2 })
        ));
    }
}
