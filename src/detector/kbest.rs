use nalgebra::{DMatrix, DVector};

use super::system::{ChannelScalar, TriangularSystem};
use super::{Detection, Diagnostics};
use crate::error::{DetectError, DetectResult};
use crate::utils::consts::ILL_CONDITIONED_RATIO;

/// K-best tree search over the bipolar alphabet.
///
/// Walks the triangular system from the last coordinate to the first,
/// extending every survivor with both symbols and keeping the `k` lowest
/// accumulated metrics.
#[derive(Debug, Clone)]
pub struct KBestDetector {
    k: usize,
}

impl KBestDetector {
    pub fn new(k: usize) -> DetectResult<Self> {
        if k == 0 {
            return Err(DetectError::InvalidParameter {
                name: "k",
                reason: "K-best needs at least one survivor".to_string(),
            });
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn detect<T: ChannelScalar>(
        &self,
        y: &DVector<T>,
        h: &DMatrix<T>,
    ) -> DetectResult<Detection<T>> {
        let system = TriangularSystem::new(y, h)?;
        let n = system.dims();

        let mut survivors: Vec<(Vec<i8>, f64)> = vec![(vec![1; n], 0.0)];
        for i in (0..n).rev() {
            let mut children = Vec::with_capacity(survivors.len() * 2);
            for (x, metric) in &survivors {
                let partial = system.partial_sum(i, x);
                for symbol in [-1i8, 1] {
                    let mut child = x.clone();
                    child[i] = symbol;
                    let residual = system.row_residual(i, symbol as f64, partial);
                    children.push((child, metric + residual));
                }
            }
            // stable: ties keep the -1 branch of the earlier survivor first
            children.sort_by(|a, b| a.1.total_cmp(&b.1));
            children.truncate(self.k);
            survivors = children;
        }

        let (bipolar, residual_energy) = survivors.swap_remove(0);
        Ok(Detection {
            symbols: T::fold(&bipolar),
            bipolar,
            residual_energy,
            diagnostics: Diagnostics {
                weak_pivot: system.weak_pivot(ILL_CONDITIONED_RATIO),
                ..Default::default()
            },
        })
    }
}
