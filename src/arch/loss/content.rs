use ndarray::Array4;

/// Measures how far the current activations drift from a frozen target.
///
/// The module is pass-through: it never alters the data flowing down the
/// pipeline, it only reads it. `forward` hands the loss straight back to
/// the caller; the cached input exists so `grad` can be evaluated during
/// the backward pass.
#[derive(Clone)]
pub struct ContentLoss {
    target: Array4<f32>,
    x: Array4<f32>,
}

impl ContentLoss {
    /// Freezes `target` as the reference activation. The target never
    /// receives gradients.
    pub fn new(target: Array4<f32>) -> Self {
        let x = Array4::zeros(target.dim());
        Self { target, x }
    }

    /// Mean squared error between `x` and the frozen target.
    pub fn forward(&mut self, x: &Array4<f32>) -> f32 {
        self.x = x.clone();
        (&self.x - &self.target)
            .mapv(|v| v.powi(2))
            .mean()
            .unwrap_or_default()
    }

    /// Gradient of the last `forward` with respect to its input.
    pub fn grad(&self) -> Array4<f32> {
        (&self.x - &self.target) * (2.0 / self.target.len() as f32)
    }
}
