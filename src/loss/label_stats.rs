use crate::error::Result;
use crate::loss::weighting::LabelTally;
use crate::math::blob::Blob;

/// Running per-class pixel histogram over label blobs.
///
/// Used to derive `class_weighting` values for a dataset by median-frequency
/// balancing: `weight(c) = median(freq) / freq(c)`.
#[derive(Debug, Clone)]
pub struct LabelStats {
    ignore_label: Option<i64>,
    tally: LabelTally,
}

impl LabelStats {
    pub fn new(num_classes: usize, ignore_label: Option<i64>) -> LabelStats {
        LabelStats {
            ignore_label,
            tally: LabelTally::new(num_classes),
        }
    }

    pub fn accumulate(&mut self, labels: &Blob) -> Result<()> {
        self.accumulate_values(labels.data())
    }

    pub fn accumulate_values(&mut self, labels: &[f64]) -> Result<()> {
        self.tally.count(labels, self.ignore_label)
    }

    pub fn counts(&self) -> &[usize] {
        &self.tally.counts
    }

    /// Number of non-ignored pixels seen so far.
    pub fn total(&self) -> usize {
        self.tally.contributing
    }

    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.tally.counts.len())
            .map(|c| self.tally.frequency(c))
            .collect()
    }

    /// Median-frequency class weights. Classes never seen get weight 0.
    pub fn median_frequency_weights(&self) -> Vec<f64> {
        let freqs = self.frequencies();
        let mut present: Vec<f64> = freqs.iter().copied().filter(|f| *f > 0.0).collect();
        if present.is_empty() {
            return vec![0.0; freqs.len()];
        }
        present.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = present.len() / 2;
        let median = if present.len() % 2 == 0 {
            (present[mid - 1] + present[mid]) / 2.0
        } else {
            present[mid]
        };
        freqs
            .iter()
            .map(|&f| if f > 0.0 { median / f } else { 0.0 })
            .collect()
    }
}
