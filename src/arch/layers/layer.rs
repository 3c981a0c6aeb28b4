use ndarray::{Array1, Array2, Array4};

use super::{BatchNorm2d, Conv2d, Linear, MaxPool2d, Relu};
use crate::error::Result;

/// A frozen network layer.
///
/// Parameters are read-only; `backward` only propagates gradients to the
/// layer's input.
#[derive(Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    Relu(Relu),
    MaxPool2d(MaxPool2d),
    BatchNorm2d(BatchNorm2d),
    Linear(Linear),
}
use Layer::*;

impl Layer {
    pub fn conv2d(
        weight: Array4<f32>,
        bias: Array1<f32>,
        stride: (usize, usize),
        padding: (usize, usize),
    ) -> Self {
        Self::Conv2d(Conv2d::new(weight, bias, stride, padding))
    }

    pub fn relu() -> Self {
        Self::Relu(Relu::new())
    }

    pub fn max_pool2d(kernel: (usize, usize), stride: (usize, usize)) -> Self {
        Self::MaxPool2d(MaxPool2d::new(kernel, stride))
    }

    pub fn batch_norm2d(
        gamma: Array1<f32>,
        beta: Array1<f32>,
        mean: Array1<f32>,
        var: Array1<f32>,
        eps: f32,
    ) -> Self {
        Self::BatchNorm2d(BatchNorm2d::new(gamma, beta, mean, var, eps))
    }

    pub fn linear(weight: Array2<f32>, bias: Array1<f32>) -> Self {
        Self::Linear(Linear::new(weight, bias))
    }

    pub fn forward(&mut self, x: &Array4<f32>) -> Result<Array4<f32>> {
        match self {
            Conv2d(l) => l.forward(x),
            Relu(l) => Ok(l.forward(x)),
            MaxPool2d(l) => l.forward(x),
            BatchNorm2d(l) => l.forward(x),
            Linear(l) => l.forward(x),
        }
    }

    pub fn backward(&self, d: &Array4<f32>) -> Array4<f32> {
        match self {
            Conv2d(l) => l.backward(d),
            Relu(l) => l.backward(d),
            MaxPool2d(l) => l.backward(d),
            BatchNorm2d(l) => l.backward(d),
            Linear(l) => l.backward(d),
        }
    }

    /// The class name used in error messages.
    pub fn class(&self) -> &'static str {
        match self {
            Conv2d(_) => "Conv2d",
            Relu(_) => "Relu",
            MaxPool2d(_) => "MaxPool2d",
            BatchNorm2d(_) => "BatchNorm2d",
            Linear(_) => "Linear",
        }
    }
}
