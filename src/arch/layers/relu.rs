use ndarray::Array4;

/// Out-of-place rectified linear unit.
///
/// Keeps the pre-activation input so downstream loss modules can read the
/// values a layer produced without this activation clobbering them, and so
/// `backward` can mask the gradient.
#[derive(Clone)]
pub struct Relu {
    x: Array4<f32>,
}

impl Relu {
    pub fn new() -> Self {
        Self {
            x: Array4::zeros((0, 0, 0, 0)),
        }
    }

    pub fn forward(&mut self, x: &Array4<f32>) -> Array4<f32> {
        self.x = x.clone();
        x.mapv(|v| v.max(0.0))
    }

    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let mut dx = d.clone();
        dx.zip_mut_with(&self.x, |g, &v| {
            if v <= 0.0 {
                *g = 0.0;
            }
        });
        dx
    }
}
