pub mod loss_config;
pub mod weighting;
pub mod label_stats;

pub use loss_config::{LossConfig, Normalization};
pub use weighting::{effective_weights, LabelTally};
pub use label_stats::LabelStats;
