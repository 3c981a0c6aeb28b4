use ndarray::{Array2, Array4};

use super::gram_matrix;

/// Measures how far the current Gram statistics drift from a frozen target.
///
/// Pass-through like [`super::ContentLoss`]; only the Gram matrix of the
/// construction-time feature map is kept, not the feature map itself.
#[derive(Clone)]
pub struct StyleLoss {
    target: Array2<f32>,
    x: Array4<f32>,
}

impl StyleLoss {
    pub fn new(target_feature: &Array4<f32>) -> Self {
        Self {
            target: gram_matrix(target_feature),
            x: Array4::zeros(target_feature.dim()),
        }
    }

    /// Mean squared error between the input's Gram matrix and the target's.
    pub fn forward(&mut self, x: &Array4<f32>) -> f32 {
        self.x = x.clone();
        (&gram_matrix(x) - &self.target)
            .mapv(|v| v.powi(2))
            .mean()
            .unwrap_or_default()
    }

    /// Gradient of the last `forward` with respect to its input.
    ///
    /// With `F` the `[n, h·w]` flattening of the input (`n = b·c`,
    /// `m = b·c·h·w`), `G = F·Fᵀ/m` and `L = mean((G − T)²)`, the chain
    /// rule gives `dL/dF = (2/m) · (dL/dG) · F` because `dL/dG` is
    /// symmetric.
    pub fn grad(&self) -> Array4<f32> {
        let (b, c, h, w) = self.x.dim();
        let n = b * c;
        let m = n * h * w;
        let f = self.x.view().into_shape_with_order((n, h * w)).unwrap();
        let g = f.dot(&f.t()) / m as f32;
        let dg = (&g - &self.target) * (2.0 / (n * n) as f32);
        let df = dg.dot(&f) * (2.0 / m as f32);
        df.into_shape_with_order((b, c, h, w)).unwrap()
    }
}
