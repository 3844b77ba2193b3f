use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by layer setup and by the forward/backward passes.
///
/// Every variant is fatal to the layer instance that produced it; nothing in
/// this crate retries or skips.
#[derive(Error, Debug)]
pub enum LayerError {
    /// Invalid configuration or malformed manifest.
    #[error("configuration error: {0}")]
    Config(String),

    /// The manifest file could not be read. Raised at setup, like `Config`.
    #[error("cannot read manifest `{}`: {source}", .path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input blobs disagree on shape.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// An image or label image could not be opened or decoded.
    #[error("cannot decode `{}`: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// A label is neither a valid class index nor the ignore label.
    #[error("label {label} at element {index} is outside [0, {num_classes})")]
    LabelOutOfRange {
        label: i64,
        index: usize,
        num_classes: usize,
    },

    /// A stored label value is not an integer.
    #[error("label value {value} at element {index} is not an integer")]
    NonIntegerLabel { value: f64, index: usize },
}

pub type Result<T> = std::result::Result<T, LayerError>;
