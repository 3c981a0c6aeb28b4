use log::warn;
use ndarray::Array4;

use super::pipeline::{FeatureExtractor, Stage};
use crate::{
    arch::{
        Normalization,
        layers::Layer,
        loss::{ContentLoss, StyleLoss},
    },
    error::{Result, StyleErr},
};

/// Builds the truncated feature-extraction pipeline.
///
/// Walks `layers` in their original order, assigning deterministic names
/// (`conv_i` increments the index, `relu_i`/`pool_i`/`bn_i` inherit it).
/// After appending a layer whose name is in `content_layers` the pipeline
/// built so far is run on the content image and the resulting activation is
/// frozen into a [`ContentLoss`]; `style_layers` works the same way with the
/// style image and a Gram-matrix target. Everything past the last loss
/// module is cut: those layers cannot influence the optimized objective.
///
/// # Returns
/// The truncated pipeline with its embedded loss modules, in order.
///
/// # Errors
/// `UnrecognizedLayer` if the sequence contains a layer kind the pipeline
/// cannot hold (for instance a classifier's `Linear`), naming its class.
pub fn build(
    layers: Vec<Layer>,
    normalization: Normalization,
    content_img: &Array4<f32>,
    style_img: &Array4<f32>,
    content_layers: &[String],
    style_layers: &[String],
) -> Result<FeatureExtractor> {
    let mut stages: Vec<Stage> = Vec::new();
    let mut conv_idx = 0usize;

    for (position, layer) in layers.into_iter().enumerate() {
        let name = match &layer {
            Layer::Conv2d(_) => {
                conv_idx += 1;
                format!("conv_{conv_idx}")
            }
            Layer::Relu(_) => format!("relu_{conv_idx}"),
            Layer::MaxPool2d(_) => format!("pool_{conv_idx}"),
            Layer::BatchNorm2d(_) => format!("bn_{conv_idx}"),
            Layer::Linear(_) => {
                return Err(StyleErr::UnrecognizedLayer {
                    position,
                    class: layer.class(),
                });
            }
        };

        let is_content = content_layers.iter().any(|l| l == &name);
        let is_style = style_layers.iter().any(|l| l == &name);
        stages.push(Stage::Layer { name, layer });

        if is_content {
            let target = forward_prefix(&normalization, &mut stages, content_img)?;
            stages.push(Stage::Content(ContentLoss::new(target)));
        }
        if is_style {
            let target = forward_prefix(&normalization, &mut stages, style_img)?;
            stages.push(Stage::Style(StyleLoss::new(&target)));
        }
    }

    for requested in content_layers.iter().chain(style_layers) {
        if !stages.iter().any(|s| s.name() == Some(requested.as_str())) {
            warn!("capture layer '{requested}' not present in the network");
        }
    }

    let cut = stages.iter().rposition(Stage::is_loss).map_or(0, |i| i + 1);
    stages.truncate(cut);

    Ok(FeatureExtractor::new(normalization, stages))
}

/// Runs the pipeline built so far on `img`, returning the tip activation.
/// Loss stages are pass-through, so only the layers run.
fn forward_prefix(
    normalization: &Normalization,
    stages: &mut [Stage],
    img: &Array4<f32>,
) -> Result<Array4<f32>> {
    let mut x = normalization.forward(img)?;
    for stage in stages.iter_mut() {
        if let Stage::Layer { layer, .. } = stage {
            x = layer.forward(&x)?;
        }
    }
    Ok(x)
}
