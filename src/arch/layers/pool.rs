use ndarray::Array4;

use crate::error::{Result, StyleErr};

/// Max pooling over non-padded windows, floor semantics on the output size.
#[derive(Clone)]
pub struct MaxPool2d {
    kernel: (usize, usize),
    stride: (usize, usize),

    // Forward metadata: winner coordinates per output cell, plus the input
    // shape backward has to reproduce.
    argmax: Array4<(usize, usize)>,
    input_dim: (usize, usize, usize, usize),
}

impl MaxPool2d {
    pub fn new(kernel: (usize, usize), stride: (usize, usize)) -> Self {
        Self {
            kernel,
            stride,
            argmax: Array4::from_elem((0, 0, 0, 0), (0, 0)),
            input_dim: (0, 0, 0, 0),
        }
    }

    pub fn forward(&mut self, x: &Array4<f32>) -> Result<Array4<f32>> {
        let (b, c, h, w) = x.dim();
        let (kh, kw) = self.kernel;
        let (sh, sw) = self.stride;
        if h < kh || w < kw {
            return Err(StyleErr::ShapeMismatch {
                what: "max pool input extent".into(),
                got: vec![h, w],
                expected: vec![kh, kw],
            });
        }

        let oh_n = (h - kh) / sh + 1;
        let ow_n = (w - kw) / sw + 1;
        let mut out = Array4::zeros((b, c, oh_n, ow_n));
        let mut argmax = Array4::from_elem((b, c, oh_n, ow_n), (0usize, 0usize));

        for bi in 0..b {
            for ci in 0..c {
                for oh in 0..oh_n {
                    for ow in 0..ow_n {
                        let mut best = f32::NEG_INFINITY;
                        let mut at = (0, 0);
                        for i in 0..kh {
                            for j in 0..kw {
                                let ih = oh * sh + i;
                                let iw = ow * sw + j;
                                let v = x[[bi, ci, ih, iw]];
                                if v > best {
                                    best = v;
                                    at = (ih, iw);
                                }
                            }
                        }
                        out[[bi, ci, oh, ow]] = best;
                        argmax[[bi, ci, oh, ow]] = at;
                    }
                }
            }
        }

        self.argmax = argmax;
        self.input_dim = (b, c, h, w);
        Ok(out)
    }

    /// Routes each output gradient back to the cell that won its window.
    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let mut dx = Array4::zeros(self.input_dim);
        let (b, c, oh_n, ow_n) = d.dim();
        for bi in 0..b {
            for ci in 0..c {
                for oh in 0..oh_n {
                    for ow in 0..ow_n {
                        let (ih, iw) = self.argmax[[bi, ci, oh, ow]];
                        dx[[bi, ci, ih, iw]] += d[[bi, ci, oh, ow]];
                    }
                }
            }
        }
        dx
    }
}
