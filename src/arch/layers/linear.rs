use ndarray::{Array1, Array2, Array4, linalg};

use crate::error::{Result, StyleErr};

/// Fully-connected layer over flattened feature maps, weight layout
/// `[out_features, in_features]`. Classification networks end in a stack of
/// these; the feature extractor refuses them, but the sequence type still
/// has to be able to represent a full source network.
#[derive(Clone)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,

    // Forward metadata
    x_dim: (usize, usize, usize, usize),
}

impl Linear {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        Self {
            weight,
            bias,
            x_dim: (0, 0, 0, 0),
        }
    }

    pub fn forward(&mut self, x: &Array4<f32>) -> Result<Array4<f32>> {
        let (b, c, h, w) = x.dim();
        let features = c * h * w;
        if features != self.weight.ncols() {
            return Err(StyleErr::ShapeMismatch {
                what: "linear input features".into(),
                got: vec![features],
                expected: vec![self.weight.ncols()],
            });
        }

        let xf = x.view().into_shape_with_order((b, features)).unwrap();
        let out_n = self.weight.nrows();
        let mut z = Array2::zeros((b, out_n));
        linalg::general_mat_mul(1.0, &xf, &self.weight.t(), 0.0, &mut z);
        z += &self.bias;

        self.x_dim = (b, c, h, w);
        Ok(z.into_shape_with_order((b, out_n, 1, 1)).unwrap())
    }

    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let (b, o, _, _) = d.dim();
        let df = d.view().into_shape_with_order((b, o)).unwrap();
        let mut dx = Array2::zeros((b, self.weight.ncols()));
        linalg::general_mat_mul(1.0, &df, &self.weight, 0.0, &mut dx);
        dx.into_shape_with_order(self.x_dim).unwrap()
    }
}
