pub mod data_config;
pub mod decode;
pub mod manifest;

pub use data_config::DenseImageDataConfig;
pub use manifest::{Manifest, ManifestEntry};
