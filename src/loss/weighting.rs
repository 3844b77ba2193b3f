use crate::error::{LayerError, Result};
use crate::loss::loss_config::LossConfig;

/// Interprets a stored label value. Returns `None` for the ignore label and
/// the class index otherwise.
pub fn class_of(
    value: f64,
    index: usize,
    num_classes: usize,
    ignore_label: Option<i64>,
) -> Result<Option<usize>> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(LayerError::NonIntegerLabel { value, index });
    }
    let label = value as i64;
    if ignore_label == Some(label) {
        return Ok(None);
    }
    if label < 0 || label as usize >= num_classes {
        return Err(LayerError::LabelOutOfRange { label, index, num_classes });
    }
    Ok(Some(label as usize))
}

/// Per-class counts of the contributing (non-ignored) labels in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelTally {
    pub counts: Vec<usize>,
    pub contributing: usize,
}

impl LabelTally {
    pub fn new(num_classes: usize) -> LabelTally {
        LabelTally {
            counts: vec![0; num_classes],
            contributing: 0,
        }
    }

    /// Adds every label in `labels`, failing on the first out-of-range value.
    pub fn count(&mut self, labels: &[f64], ignore_label: Option<i64>) -> Result<()> {
        let num_classes = self.counts.len();
        for (index, &value) in labels.iter().enumerate() {
            if let Some(class) = class_of(value, index, num_classes, ignore_label)? {
                self.counts[class] += 1;
                self.contributing += 1;
            }
        }
        Ok(())
    }

    /// Fraction of contributing labels that belong to `class`.
    pub fn frequency(&self, class: usize) -> f64 {
        if self.contributing == 0 {
            return 0.0;
        }
        self.counts[class] as f64 / self.contributing as f64
    }
}

/// Effective weight of every class for one batch.
///
/// Without frequency weighting this is the configured weight. With it, the
/// configured weight is divided by the class frequency in `tally`; classes
/// absent from the batch keep their configured weight since no element
/// uses it.
pub fn effective_weights(config: &LossConfig, tally: &LabelTally) -> Vec<f64> {
    (0..tally.counts.len())
        .map(|class| {
            let base = config.base_weight(class);
            if config.weight_by_label_freqs && tally.counts[class] > 0 {
                base / tally.frequency(class)
            } else {
                base
            }
        })
        .collect()
}
