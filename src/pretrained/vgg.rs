use std::path::Path;

use ndarray::{Array1, Array4};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Normal;
use rand::Rng;
use safetensors::{Dtype, SafeTensors};

use crate::{
    arch::layers::Layer,
    error::{Result, StyleErr},
};

/// Per-channel statistics the pretrained network was trained with; images
/// in `[0, 1]` are normalized with these before any layer sees them.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// VGG-19 feature section: convolution output channels in order, `None`
/// marking a 2×2/2 max pool. Every convolution is 3×3, stride 1, padding 1,
/// followed by a ReLU.
const VGG19_PLAN: &[Option<usize>] = &[
    Some(64),
    Some(64),
    None,
    Some(128),
    Some(128),
    None,
    Some(256),
    Some(256),
    Some(256),
    Some(256),
    None,
    Some(512),
    Some(512),
    Some(512),
    Some(512),
    None,
    Some(512),
    Some(512),
    Some(512),
    Some(512),
    None,
];

/// The VGG-19 feature extractor with He-initialized random weights.
///
/// Layer sequence and shapes match [`load_vgg19`] exactly; useful when no
/// pretrained snapshot is at hand.
pub fn vgg19() -> Vec<Layer> {
    random_features(VGG19_PLAN, &mut rand::rng())
}

/// Loads the VGG-19 feature section from a safetensors snapshot keyed the
/// way torchvision indexes it (`features.{i}.weight` / `features.{i}.bias`).
///
/// # Errors
/// `MissingTensor`, `ShapeMismatch` or `UnsupportedDtype` when the snapshot
/// does not carry the architecture it claims to; `Weights`/`Io` when the
/// file itself is unreadable.
pub fn load_vgg19(path: &Path) -> Result<Vec<Layer>> {
    let raw = std::fs::read(path)?;
    let tensors = SafeTensors::deserialize(&raw)?;
    load_features(&tensors, VGG19_PLAN)
}

pub(crate) fn random_features(plan: &[Option<usize>], rng: &mut impl Rng) -> Vec<Layer> {
    let mut layers = Vec::new();
    let mut in_ch = 3;
    for slot in plan {
        match *slot {
            Some(out_ch) => {
                let std = (2.0 / (in_ch * 9) as f32).sqrt();
                let dist = Normal::new(0.0, std).unwrap();
                let weight = Array4::random_using((out_ch, in_ch, 3, 3), dist, rng);
                layers.push(Layer::conv2d(weight, Array1::zeros(out_ch), (1, 1), (1, 1)));
                layers.push(Layer::relu());
                in_ch = out_ch;
            }
            None => layers.push(Layer::max_pool2d((2, 2), (2, 2))),
        }
    }
    layers
}

pub(crate) fn load_features(tensors: &SafeTensors, plan: &[Option<usize>]) -> Result<Vec<Layer>> {
    let mut layers = Vec::new();
    let mut in_ch = 3;
    let mut slot = 0; // index in the torchvision `features` sequence
    for entry in plan {
        match *entry {
            Some(out_ch) => {
                let weight = conv_weight(tensors, slot, out_ch, in_ch)?;
                let bias = conv_bias(tensors, slot, out_ch)?;
                layers.push(Layer::conv2d(weight, bias, (1, 1), (1, 1)));
                layers.push(Layer::relu());
                in_ch = out_ch;
                slot += 2; // conv + relu
            }
            None => {
                layers.push(Layer::max_pool2d((2, 2), (2, 2)));
                slot += 1;
            }
        }
    }
    Ok(layers)
}

fn conv_weight(
    tensors: &SafeTensors,
    slot: usize,
    out_ch: usize,
    in_ch: usize,
) -> Result<Array4<f32>> {
    let name = format!("features.{slot}.weight");
    let (shape, data) = floats(tensors, &name)?;
    let expected = vec![out_ch, in_ch, 3, 3];
    if shape != expected {
        return Err(StyleErr::ShapeMismatch {
            what: name,
            got: shape,
            expected,
        });
    }
    Ok(Array4::from_shape_vec((out_ch, in_ch, 3, 3), data).unwrap())
}

fn conv_bias(tensors: &SafeTensors, slot: usize, out_ch: usize) -> Result<Array1<f32>> {
    let name = format!("features.{slot}.bias");
    let (shape, data) = floats(tensors, &name)?;
    if shape != vec![out_ch] {
        return Err(StyleErr::ShapeMismatch {
            what: name,
            got: shape,
            expected: vec![out_ch],
        });
    }
    Ok(Array1::from_vec(data))
}

fn floats(tensors: &SafeTensors, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = tensors
        .tensor(name)
        .map_err(|_| StyleErr::MissingTensor {
            name: name.to_string(),
        })?;
    if view.dtype() != Dtype::F32 {
        return Err(StyleErr::UnsupportedDtype {
            name: name.to_string(),
            dtype: format!("{:?}", view.dtype()),
        });
    }
    // The copy also fixes up the (unaligned) byte offsets of the snapshot.
    Ok((view.shape().to_vec(), bytemuck::pod_collect_to_vec(view.data())))
}
