use serde::{Deserialize, Serialize};

use crate::data::data_config::DenseImageDataConfig;
use crate::layers::dense_image_data::DenseImageDataLayer;
use crate::layers::softmax_loss::SoftmaxWithLossLayer;
use crate::loss::loss_config::LossConfig;

fn default_loss_weight() -> f64 {
    1.0
}

/// A fully serializable description of a segmentation input pipeline: where
/// the data comes from and how the per-pixel loss is computed.
///
/// `PipelineSpec` is stored as JSON so experiment configurations can be kept
/// next to the manifests they read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Human-readable experiment name.
    pub name: String,
    /// Number of label classes, excluding the ignore label.
    pub num_classes: usize,
    pub data: DenseImageDataConfig,
    #[serde(default)]
    pub loss: LossConfig,
    /// Multiplier applied to the reported loss and its gradient.
    #[serde(default = "default_loss_weight")]
    pub loss_weight: f64,
}

impl PipelineSpec {
    pub fn data_layer(&self) -> DenseImageDataLayer {
        DenseImageDataLayer::new(self.data.clone())
    }

    pub fn loss_layer(&self) -> SoftmaxWithLossLayer {
        SoftmaxWithLossLayer::new(self.loss.clone(), self.loss_weight)
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a `PipelineSpec` from a JSON file.
    pub fn load_json(path: &str) -> std::io::Result<PipelineSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
