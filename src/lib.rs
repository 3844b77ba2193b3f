pub mod error;
pub mod math;
pub mod layers;
pub mod loss;
pub mod data;
pub mod check;
pub mod pipeline;

// Convenience re-exports
pub use error::{LayerError, Result};
pub use math::blob::{Blob, Shape};
pub use math::filler::{GaussianFiller, UniformFiller};
pub use layers::layer::Layer;
pub use layers::softmax::SoftmaxLayer;
pub use layers::softmax_loss::SoftmaxWithLossLayer;
pub use layers::dense_image_data::DenseImageDataLayer;
pub use data::data_config::DenseImageDataConfig;
pub use loss::loss_config::{LossConfig, Normalization};
pub use loss::label_stats::LabelStats;
pub use check::gradient::{GradientChecker, GradientCheckError};
pub use pipeline::spec::PipelineSpec;
