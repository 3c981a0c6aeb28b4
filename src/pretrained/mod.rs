mod vgg;

pub use vgg::{IMAGENET_MEAN, IMAGENET_STD, load_vgg19, vgg19};

#[cfg(test)]
pub(crate) use vgg::random_features;
