use ndarray::{Array4, Axis};

use crate::error::{Result, StyleErr};

/// Maps an input image to `(image − mean) / std`, broadcast per channel.
/// Sits in front of every pipeline so images in `[0, 1]` match the
/// statistics the pretrained network was trained with.
#[derive(Clone)]
pub struct Normalization {
    mean: [f32; 3],
    std: [f32; 3],
}

impl Normalization {
    pub fn new(mean: [f32; 3], std: [f32; 3]) -> Self {
        Self { mean, std }
    }

    pub fn forward(&self, x: &Array4<f32>) -> Result<Array4<f32>> {
        let c = x.dim().1;
        if c != 3 {
            return Err(StyleErr::ShapeMismatch {
                what: "normalization input channels".into(),
                got: vec![c],
                expected: vec![3],
            });
        }

        let mut out = x.clone();
        for (ci, mut plane) in out.axis_iter_mut(Axis(1)).enumerate() {
            let (m, s) = (self.mean[ci], self.std[ci]);
            plane.mapv_inplace(|v| (v - m) / s);
        }
        Ok(out)
    }

    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let mut dx = d.clone();
        for (ci, mut plane) in dx.axis_iter_mut(Axis(1)).enumerate() {
            let s = self.std[ci];
            plane.mapv_inplace(|g| g / s);
        }
        dx
    }
}
