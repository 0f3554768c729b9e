use nalgebra::{DMatrix, DVector};
use num_complex::Complex64;

use crate::error::{DetectError, DetectResult};

/// Scalar type a channel can be expressed in.
///
/// Detection always runs on real-valued systems. Complex channels are
/// expanded into the equivalent real block form before triangularization
/// and the bipolar decisions are folded back afterwards.
pub trait ChannelScalar: nalgebra::Scalar + Copy {
    /// Real-equivalent channel matrix
    fn expand_matrix(h: &DMatrix<Self>) -> DMatrix<f64>;

    /// Real-equivalent received vector, consistent with [`expand_matrix`](Self::expand_matrix)
    fn expand_vector(y: &DVector<Self>) -> DVector<f64>;

    /// Map real bipolar decisions back into this scalar domain
    fn fold(bipolar: &[i8]) -> Vec<Self>;
}

impl ChannelScalar for f64 {
    fn expand_matrix(h: &DMatrix<f64>) -> DMatrix<f64> {
        h.clone()
    }

    fn expand_vector(y: &DVector<f64>) -> DVector<f64> {
        y.clone()
    }

    fn fold(bipolar: &[i8]) -> Vec<f64> {
        bipolar.iter().map(|&b| b as f64).collect()
    }
}

impl ChannelScalar for Complex64 {
    /// `[[Re, -Im], [Im, Re]]`
    fn expand_matrix(h: &DMatrix<Complex64>) -> DMatrix<f64> {
        let (rows, cols) = h.shape();
        DMatrix::from_fn(2 * rows, 2 * cols, |i, j| {
            let c = h[(i % rows, j % cols)];
            match (i < rows, j < cols) {
                (true, true) | (false, false) => c.re,
                (true, false) => -c.im,
                (false, true) => c.im,
            }
        })
    }

    /// `[Re y; Im y]`
    fn expand_vector(y: &DVector<Complex64>) -> DVector<f64> {
        let n = y.len();
        DVector::from_fn(2 * n, |i, _| if i < n { y[i].re } else { y[i - n].im })
    }

    fn fold(bipolar: &[i8]) -> Vec<Complex64> {
        let half = bipolar.len() / 2;
        (0..half)
            .map(|i| Complex64::new(bipolar[i] as f64, bipolar[half + i] as f64))
            .collect()
    }
}

/// Channel shape checks shared by every receiver, run before any expansion.
pub fn validate_shape<T: ChannelScalar>(y: &DVector<T>, h: &DMatrix<T>) -> DetectResult<()> {
    let (rows, cols) = h.shape();
    if y.len() != rows {
        return Err(DetectError::ShapeMismatch { rows, len: y.len() });
    }
    if rows == 0 || cols == 0 {
        return Err(DetectError::EmptyChannel);
    }
    Ok(())
}

/// Upper-triangular real system `yt = R·x` obtained from `h = Q·R`.
///
/// `R` is always square in the transmit dimensions. A channel with fewer
/// observations than unknowns leaves the trailing rows of `R` and `yt` at
/// zero, so those coordinates carry no metric and show up as weak pivots.
#[derive(Debug, Clone)]
pub struct TriangularSystem {
    r: DMatrix<f64>,
    yt: DVector<f64>,
}

impl TriangularSystem {
    /// Validate, expand to real form and triangularize.
    pub fn new<T: ChannelScalar>(y: &DVector<T>, h: &DMatrix<T>) -> DetectResult<Self> {
        validate_shape(y, h)?;
        Ok(Self::from_real(T::expand_vector(y), T::expand_matrix(h)))
    }

    fn from_real(y: DVector<f64>, h: DMatrix<f64>) -> Self {
        let n = h.ncols();
        let qr = h.qr();
        let yt = qr.q().tr_mul(&y).resize_vertically(n, 0.0);
        let r = qr.r().resize_vertically(n, 0.0);
        Self { r, yt }
    }

    /// Number of real transmit dimensions N
    pub fn dims(&self) -> usize {
        self.r.ncols()
    }

    pub fn r(&self, i: usize, j: usize) -> f64 {
        self.r[(i, j)]
    }

    pub fn yt(&self, i: usize) -> f64 {
        self.yt[i]
    }

    /// Interference of the already-decided coordinates on row `i`:
    /// `Σ_{j>i} R[i,j]·x[j]`
    pub fn partial_sum(&self, i: usize, x: &[i8]) -> f64 {
        (i + 1..self.dims())
            .map(|j| self.r[(i, j)] * x[j] as f64)
            .sum()
    }

    /// Squared residual of row `i` when `x[i]` takes `value`.
    pub fn row_residual(&self, i: usize, value: f64, partial: f64) -> f64 {
        let e = self.yt[i] - self.r[(i, i)] * value - partial;
        e * e
    }

    /// `‖yt − R·x‖²` for a complete bipolar vector
    pub fn residual_energy(&self, x: &[i8]) -> f64 {
        (0..self.dims())
            .map(|i| self.row_residual(i, x[i] as f64, self.partial_sum(i, x)))
            .sum()
    }

    /// First row whose diagonal is negligible next to the largest one.
    pub fn weak_pivot(&self, ratio: f64) -> Option<usize> {
        let n = self.dims();
        let max = (0..n).map(|i| self.r[(i, i)].abs()).fold(0.0, f64::max);
        (0..n).find(|&i| self.r[(i, i)].abs() <= ratio * max)
    }
}
