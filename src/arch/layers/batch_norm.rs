use ndarray::{Array1, Array4, Axis};

use crate::error::{Result, StyleErr};

/// Inference-mode batch normalization: a fixed per-channel affine transform
/// built from running statistics. No statistics are updated here.
#[derive(Clone)]
pub struct BatchNorm2d {
    gamma: Array1<f32>,
    beta: Array1<f32>,
    mean: Array1<f32>,
    var: Array1<f32>,
    eps: f32,
}

impl BatchNorm2d {
    pub fn new(
        gamma: Array1<f32>,
        beta: Array1<f32>,
        mean: Array1<f32>,
        var: Array1<f32>,
        eps: f32,
    ) -> Self {
        Self {
            gamma,
            beta,
            mean,
            var,
            eps,
        }
    }

    pub fn forward(&mut self, x: &Array4<f32>) -> Result<Array4<f32>> {
        let c = x.dim().1;
        if c != self.gamma.len() {
            return Err(StyleErr::ShapeMismatch {
                what: "batch norm input channels".into(),
                got: vec![c],
                expected: vec![self.gamma.len()],
            });
        }

        let mut out = x.clone();
        for (ci, mut plane) in out.axis_iter_mut(Axis(1)).enumerate() {
            let scale = self.gamma[ci] / (self.var[ci] + self.eps).sqrt();
            let shift = self.beta[ci] - self.mean[ci] * scale;
            plane.mapv_inplace(|v| v * scale + shift);
        }
        Ok(out)
    }

    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let mut dx = d.clone();
        for (ci, mut plane) in dx.axis_iter_mut(Axis(1)).enumerate() {
            let scale = self.gamma[ci] / (self.var[ci] + self.eps).sqrt();
            plane.mapv_inplace(|g| g * scale);
        }
        dx
    }
}
