use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used across the whole crate.
pub type Result<T> = std::result::Result<T, StyleErr>;

/// All errors that can occur during a style-transfer run.
///
/// There is no recovery path for any of these: every anomaly is fatal and
/// surfaces to the caller.
#[derive(Debug)]
pub enum StyleErr {
    /// The source network contains a layer kind the extractor cannot place
    /// in the pipeline — caught while building, before any optimization.
    UnrecognizedLayer { position: usize, class: &'static str },
    /// A tensor or parameter arrived with dimensions that violate the
    /// operation's contract.
    ShapeMismatch {
        what: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    /// A weight snapshot lacks a tensor the architecture requires.
    MissingTensor { name: String },
    /// A weight snapshot stores a tensor in a dtype other than f32.
    UnsupportedDtype { name: String, dtype: String },
    /// The weight snapshot itself is malformed.
    Weights(safetensors::SafeTensorError),
    /// The settings file is not valid JSON for a `TransferConfig`.
    Config(serde_json::Error),
    /// An image file could not be decoded or encoded.
    Image(image::ImageError),
    /// An underlying I/O error not covered by the above variants.
    Io(io::Error),
}

impl Display for StyleErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedLayer { position, class } => {
                write!(f, "unrecognized layer at position {position}: {class}")
            }
            Self::ShapeMismatch {
                what,
                got,
                expected,
            } => {
                write!(f, "shape mismatch for {what}: got {got:?}, expected {expected:?}")
            }
            Self::MissingTensor { name } => write!(f, "weight snapshot has no tensor '{name}'"),
            Self::UnsupportedDtype { name, dtype } => {
                write!(f, "tensor '{name}' has unsupported dtype {dtype}, expected F32")
            }
            Self::Weights(e) => write!(f, "weight snapshot error: {e}"),
            Self::Config(e) => write!(f, "invalid settings file: {e}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for StyleErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Weights(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<safetensors::SafeTensorError> for StyleErr {
    fn from(e: safetensors::SafeTensorError) -> Self {
        Self::Weights(e)
    }
}

impl From<serde_json::Error> for StyleErr {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e)
    }
}

impl From<image::ImageError> for StyleErr {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<io::Error> for StyleErr {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
