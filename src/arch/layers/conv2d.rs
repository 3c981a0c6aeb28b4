use ndarray::parallel::prelude::*;
use ndarray::{Array1, Array4, Axis};

use crate::error::{Result, StyleErr};

/// 2D convolution with frozen parameters.
///
/// The weight layout is `[out_channels, in_channels, kernel_h, kernel_w]`.
/// `forward` keeps the input around so `backward` can push gradients down to
/// it; the parameters themselves never receive gradients.
#[derive(Clone)]
pub struct Conv2d {
    weight: Array4<f32>,
    bias: Array1<f32>,
    stride: (usize, usize),
    padding: (usize, usize),

    // Forward metadata
    x: Array4<f32>,
}

impl Conv2d {
    pub fn new(
        weight: Array4<f32>,
        bias: Array1<f32>,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Self {
        Self {
            weight,
            bias,
            stride,
            padding,
            x: Array4::zeros((1, 1, 1, 1)),
        }
    }

    pub fn out_channels(&self) -> usize {
        self.weight.dim().0
    }

    pub fn in_channels(&self) -> usize {
        self.weight.dim().1
    }

    /// Direct convolution, parallel over output channels.
    pub fn forward(&mut self, x: &Array4<f32>) -> Result<Array4<f32>> {
        let (b, c, h, w) = x.dim();
        let (oc_n, ic_n, kh, kw) = self.weight.dim();
        if c != ic_n {
            return Err(StyleErr::ShapeMismatch {
                what: "conv2d input channels".into(),
                got: vec![c],
                expected: vec![ic_n],
            });
        }
        if h + 2 * self.padding.0 < kh || w + 2 * self.padding.1 < kw {
            return Err(StyleErr::ShapeMismatch {
                what: "conv2d input extent".into(),
                got: vec![h, w],
                expected: vec![kh, kw],
            });
        }

        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;
        let oh_n = (h + 2 * ph - kh) / sh + 1;
        let ow_n = (w + 2 * pw - kw) / sw + 1;

        let mut out = Array4::zeros((b, oc_n, oh_n, ow_n));
        let weight = &self.weight;
        let bias = &self.bias;
        out.axis_iter_mut(Axis(1))
            .into_par_iter()
            .enumerate()
            .for_each(|(oc, mut plane)| {
                for bi in 0..b {
                    for oh in 0..oh_n {
                        for ow in 0..ow_n {
                            let mut sum = bias[oc];
                            for ic in 0..ic_n {
                                for i in 0..kh {
                                    for j in 0..kw {
                                        let ih_pos = oh * sh + i;
                                        let iw_pos = ow * sw + j;
                                        if ih_pos < ph || iw_pos < pw {
                                            continue;
                                        }
                                        let ih = ih_pos - ph;
                                        let iw = iw_pos - pw;
                                        if ih < h && iw < w {
                                            sum += x[[bi, ic, ih, iw]] * weight[[oc, ic, i, j]];
                                        }
                                    }
                                }
                            }
                            plane[[bi, oh, ow]] = sum;
                        }
                    }
                }
            });

        self.x = x.clone();
        Ok(out)
    }

    /// Gradient with respect to the input of the last `forward`.
    ///
    /// Gather form: `dx[bi, ic, ih, iw] = Σ d[bi, oc, oh, ow] · w[oc, ic, i, j]`
    /// over every `(oc, i, j)` whose output coordinates land on the stride
    /// grid. Parallel over input channels so no two writers share a cell.
    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        let (b, c, h, w) = self.x.dim();
        let (oc_n, _, kh, kw) = self.weight.dim();
        let (_, _, oh_n, ow_n) = d.dim();
        let (sh, sw) = self.stride;
        let (ph, pw) = self.padding;

        let mut dx = Array4::zeros((b, c, h, w));
        let weight = &self.weight;
        dx.axis_iter_mut(Axis(1))
            .into_par_iter()
            .enumerate()
            .for_each(|(ic, mut plane)| {
                for bi in 0..b {
                    for ih in 0..h {
                        for iw in 0..w {
                            let mut sum = 0.0;
                            for oc in 0..oc_n {
                                for i in 0..kh {
                                    for j in 0..kw {
                                        let ih_pos = ih + ph;
                                        let iw_pos = iw + pw;
                                        if i > ih_pos || j > iw_pos {
                                            continue;
                                        }
                                        let oh_s = ih_pos - i;
                                        let ow_s = iw_pos - j;
                                        if oh_s % sh != 0 || ow_s % sw != 0 {
                                            continue;
                                        }
                                        let oh = oh_s / sh;
                                        let ow = ow_s / sw;
                                        if oh < oh_n && ow < ow_n {
                                            sum += d[[bi, oc, oh, ow]] * weight[[oc, ic, i, j]];
                                        }
                                    }
                                }
                            }
                            plane[[bi, ih, iw]] = sum;
                        }
                    }
                }
            });

        dx
    }
}
