use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Knobs of a style-transfer run.
///
/// Every field has a sensible default; a JSON settings file may override
/// any subset of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Evaluation budget for the optimizer (a hard cap, not a convergence
    /// test).
    pub num_steps: usize,
    pub style_weight: f32,
    pub content_weight: f32,
    /// Names of the layers whose raw activations anchor the content.
    pub content_layers: Vec<String>,
    /// Names of the layers whose Gram matrices anchor the style.
    pub style_layers: Vec<String>,
    /// Both images are resized to `image_size × image_size` before the run.
    pub image_size: usize,
    /// How many curvature pairs the optimizer keeps.
    pub history: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            num_steps: 300,
            style_weight: 100_000.0,
            content_weight: 1.0,
            content_layers: vec!["conv_4".to_string()],
            style_layers: (1..=5).map(|i| format!("conv_{i}")).collect(),
            image_size: 128,
            history: 100,
        }
    }
}

impl TransferConfig {
    /// Loads a config from a JSON file; missing fields keep their defaults.
    pub fn from_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_cover_the_standard_run() {
        let config = TransferConfig::default();
        assert_eq!(config.num_steps, 300);
        assert_eq!(config.style_weight, 100_000.0);
        assert_eq!(config.content_weight, 1.0);
        assert_eq!(config.content_layers, vec!["conv_4"]);
        assert_eq!(
            config.style_layers,
            vec!["conv_1", "conv_2", "conv_3", "conv_4", "conv_5"]
        );
        assert_eq!(config.image_size, 128);
    }

    #[test]
    fn partial_json_keeps_the_other_defaults() {
        let config: TransferConfig =
            serde_json::from_str(r#"{ "num_steps": 10, "style_weight": 500.0 }"#).unwrap();
        assert_eq!(config.num_steps, 10);
        assert_eq!(config.style_weight, 500.0);
        assert_eq!(config.content_layers, vec!["conv_4"]);
        assert_eq!(config.image_size, 128);
    }
}
