use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// How the summed loss is divided before it is reported.
///
/// - `Valid`     — by the number of elements whose label is not ignored.
/// - `BatchSize` — by the batch size N.
/// - `None`      — not divided; the raw weighted sum.
///
/// Every divisor is floored at 1, so a batch in which every element is
/// ignored reports zero loss instead of dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    #[default]
    Valid,
    BatchSize,
    None,
}

impl Normalization {
    pub fn divisor(self, contributing: usize, batch_size: usize) -> f64 {
        let d = match self {
            Normalization::Valid => contributing,
            Normalization::BatchSize => batch_size,
            Normalization::None => 1,
        };
        d.max(1) as f64
    }
}

/// Options of a `SoftmaxWithLossLayer`. Fixed once the layer is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LossConfig {
    /// Elements whose label equals this value add nothing to loss or gradient.
    pub ignore_label: Option<i64>,
    pub normalization: Normalization,
    /// One weight per class. Empty means every class weighs 1.
    pub class_weighting: Vec<f64>,
    /// Divide each class weight by that class's frequency among the
    /// contributing elements of the current batch.
    pub weight_by_label_freqs: bool,
}

impl LossConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ignore_label(mut self, label: i64) -> Self {
        self.ignore_label = Some(label);
        self
    }

    /// `true` selects `Normalization::Valid`, `false` selects `Normalization::None`.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalization = if normalize { Normalization::Valid } else { Normalization::None };
        self
    }

    pub fn with_normalization(mut self, normalization: Normalization) -> Self {
        self.normalization = normalization;
        self
    }

    pub fn with_class_weighting(mut self, weights: Vec<f64>) -> Self {
        self.class_weighting = weights;
        self
    }

    pub fn with_weight_by_label_freqs(mut self, enabled: bool) -> Self {
        self.weight_by_label_freqs = enabled;
        self
    }

    /// Checks the options against the number of classes seen at setup.
    pub fn validate(&self, num_classes: usize) -> Result<()> {
        if self.class_weighting.is_empty() {
            return Ok(());
        }
        if self.class_weighting.len() != num_classes {
            return Err(LayerError::Config(format!(
                "class_weighting has {} entries but the scores have {} classes",
                self.class_weighting.len(),
                num_classes
            )));
        }
        if let Some(w) = self.class_weighting.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(LayerError::Config(format!(
                "class weights must be finite and non-negative, got {}",
                w
            )));
        }
        Ok(())
    }

    /// Configured weight of `class` before any frequency scaling.
    pub fn base_weight(&self, class: usize) -> f64 {
        self.class_weighting.get(class).copied().unwrap_or(1.0)
    }
}
