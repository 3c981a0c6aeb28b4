use log::info;
use ndarray::Array4;

use crate::{
    arch::{Normalization, layers::Layer},
    config::TransferConfig,
    error::Result,
    extractor,
    optimization::Lbfgs,
};

/// Optimizes a copy of `content_img` so it keeps the content image's
/// structure while adopting `style_img`'s texture statistics.
///
/// The loop runs until `config.num_steps` loss evaluations have happened
/// (an iteration cap, not a convergence test); a budget of zero returns the
/// clamped content image untouched.
///
/// # Arguments
/// * `layers` - The frozen source network. Consumed; clone it first if it
///   is needed again.
/// * `normalization` - The per-channel statistics stage put in front of it.
/// * `content_img` - The image whose structure is preserved; also the
///   starting point of the optimization.
/// * `style_img` - The image whose texture statistics are imitated.
/// * `config` - Weights, capture layers and the evaluation budget.
///
/// # Returns
/// The optimized image, clamped into `[0, 1]`.
pub fn run_style_transfer(
    layers: Vec<Layer>,
    normalization: Normalization,
    content_img: &Array4<f32>,
    style_img: &Array4<f32>,
    config: &TransferConfig,
) -> Result<Array4<f32>> {
    info!("building the style transfer model");
    let mut model = extractor::build(
        layers,
        normalization,
        content_img,
        style_img,
        &config.content_layers,
        &config.style_layers,
    )?;

    info!(
        "optimizing for {} steps ({} content / {} style captures)",
        config.num_steps,
        model.num_content_losses(),
        model.num_style_losses()
    );

    let mut output = content_img.clone();
    let mut optimizer = Lbfgs::new(config.history);
    let mut run = 0usize;
    let mut failure = None;

    while run < config.num_steps && failure.is_none() {
        optimizer.step(&mut output, &mut |img: &mut Array4<f32>| {
            img.mapv_inplace(|v| v.clamp(0.0, 1.0));

            let losses = match model.forward(img) {
                Ok(losses) => losses,
                Err(e) => {
                    failure = Some(e);
                    return (0.0, Array4::zeros(img.dim()));
                }
            };
            let style_score = config.style_weight * losses.style_total();
            let content_score = config.content_weight * losses.content_total();
            let grad = model.backward(config.content_weight, config.style_weight);

            run += 1;
            if run % 50 == 0 {
                info!("run {run}: style loss {style_score:.4}, content loss {content_score:.4}");
            }

            (style_score + content_score, grad)
        });
    }
    if let Some(e) = failure {
        return Err(e);
    }

    output.mapv_inplace(|v| v.clamp(0.0, 1.0));
    Ok(output)
}
