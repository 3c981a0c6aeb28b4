mod builder;
mod pipeline;

pub use builder::build;
pub use pipeline::{FeatureExtractor, Losses, Stage};
