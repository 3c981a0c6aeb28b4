use ndarray::Array4;

use crate::{
    arch::{
        Normalization,
        layers::Layer,
        loss::{ContentLoss, StyleLoss},
    },
    error::Result,
};

/// One slot of the truncated pipeline: a named network layer or an embedded
/// loss module.
pub enum Stage {
    Layer { name: String, layer: Layer },
    Content(ContentLoss),
    Style(StyleLoss),
}

impl Stage {
    pub fn is_loss(&self) -> bool {
        matches!(self, Stage::Content(_) | Stage::Style(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Stage::Layer { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Loss readings collected during one forward pass, in pipeline order.
#[derive(Debug, Clone, Default)]
pub struct Losses {
    pub content: Vec<f32>,
    pub style: Vec<f32>,
}

impl Losses {
    pub fn content_total(&self) -> f32 {
        self.content.iter().sum()
    }

    pub fn style_total(&self) -> f32 {
        self.style.iter().sum()
    }
}

/// The truncated prefix of a frozen feature-extraction network with loss
/// modules spliced in after the capture points.
///
/// Structurally immutable once built; the stages keep per-pass activation
/// caches, which is what `forward` refreshes and `backward` consumes.
pub struct FeatureExtractor {
    normalization: Normalization,
    stages: Vec<Stage>,
    input_dim: (usize, usize, usize, usize),
}

impl FeatureExtractor {
    pub(crate) fn new(normalization: Normalization, stages: Vec<Stage>) -> Self {
        Self {
            normalization,
            stages,
            input_dim: (0, 0, 0, 0),
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn num_content_losses(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, Stage::Content(_)))
            .count()
    }

    pub fn num_style_losses(&self) -> usize {
        self.stages
            .iter()
            .filter(|s| matches!(s, Stage::Style(_)))
            .count()
    }

    /// Runs `img` through every stage, collecting each loss module's
    /// reading. The readings belong to this pass only; the next `forward`
    /// recomputes all of them.
    pub fn forward(&mut self, img: &Array4<f32>) -> Result<Losses> {
        self.input_dim = img.dim();
        let mut losses = Losses::default();
        let mut x = self.normalization.forward(img)?;
        for stage in &mut self.stages {
            match stage {
                Stage::Layer { layer, .. } => x = layer.forward(&x)?,
                Stage::Content(l) => losses.content.push(l.forward(&x)),
                Stage::Style(l) => losses.style.push(l.forward(&x)),
            }
        }
        Ok(losses)
    }

    /// Gradient of `content_weight·Σcontent + style_weight·Σstyle` with
    /// respect to the image handed to the last `forward`.
    ///
    /// Walks the stages in reverse: each loss module injects its weighted
    /// gradient where it sits, each layer pushes the running gradient one
    /// stage closer to the image.
    pub fn backward(&self, content_weight: f32, style_weight: f32) -> Array4<f32> {
        let mut d: Option<Array4<f32>> = None;
        for stage in self.stages.iter().rev() {
            match stage {
                Stage::Layer { layer, .. } => {
                    d = d.map(|g| layer.backward(&g));
                }
                Stage::Content(l) => {
                    let g = l.grad() * content_weight;
                    d = Some(match d {
                        Some(acc) => acc + g,
                        None => g,
                    });
                }
                Stage::Style(l) => {
                    let g = l.grad() * style_weight;
                    d = Some(match d {
                        Some(acc) => acc + g,
                        None => g,
                    });
                }
            }
        }
        match d {
            Some(g) => self.normalization.backward(&g),
            None => Array4::zeros(self.input_dim),
        }
    }
}
