mod batch_norm;
mod conv2d;
mod layer;
mod linear;
mod pool;
mod relu;

pub use batch_norm::BatchNorm2d;
pub use conv2d::Conv2d;
pub use layer::Layer;
pub use linear::Linear;
pub use pool::MaxPool2d;
pub use relu::Relu;
