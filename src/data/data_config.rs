use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LayerError, Result};

/// Options of a `DenseImageDataLayer`.
///
/// Fields:
/// - `source`       — manifest file listing `image label` path pairs
/// - `batch_size`   — pairs per forward pass
/// - `shuffle`      — permute the manifest at setup and on every wrap-around
/// - `new_height`,
///   `new_width`    — resize target; `0` keeps each image's native size
/// - `seed`         — seed for shuffling, `rand_skip` and `mirror`
/// - `root_folder`  — prefix joined onto every manifest path
/// - `rand_skip`    — skip a random number of entries in `[0, rand_skip)` at setup
/// - `is_color`     — decode images as RGB (3 channels) or grayscale (1 channel)
/// - `mirror`       — flip each image/label pair horizontally with probability 1/2
/// - `scale`,
///   `mean_values`  — image pixels become `(v - mean[c]) * scale`; labels are untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseImageDataConfig {
    pub source: PathBuf,
    pub batch_size: usize,
    pub shuffle: bool,
    pub new_height: u32,
    pub new_width: u32,
    pub seed: u64,
    pub root_folder: PathBuf,
    pub rand_skip: usize,
    pub is_color: bool,
    pub mirror: bool,
    pub scale: f64,
    pub mean_values: Vec<f64>,
}

impl Default for DenseImageDataConfig {
    fn default() -> Self {
        DenseImageDataConfig {
            source: PathBuf::new(),
            batch_size: 1,
            shuffle: false,
            new_height: 0,
            new_width: 0,
            seed: 1701,
            root_folder: PathBuf::new(),
            rand_skip: 0,
            is_color: true,
            mirror: false,
            scale: 1.0,
            mean_values: Vec::new(),
        }
    }
}

impl DenseImageDataConfig {
    pub fn new<P: Into<PathBuf>>(source: P) -> Self {
        DenseImageDataConfig {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn with_resize(mut self, height: u32, width: u32) -> Self {
        self.new_height = height;
        self.new_width = width;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_root_folder<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root_folder = root.into();
        self
    }

    pub fn with_rand_skip(mut self, rand_skip: usize) -> Self {
        self.rand_skip = rand_skip;
        self
    }

    pub fn with_color(mut self, is_color: bool) -> Self {
        self.is_color = is_color;
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_mean_values(mut self, mean_values: Vec<f64>) -> Self {
        self.mean_values = mean_values;
        self
    }

    /// Channels of the image output: 3 for color, 1 for grayscale.
    pub fn channels(&self) -> usize {
        if self.is_color { 3 } else { 1 }
    }

    /// `(height, width)` every pair is resized to, if any.
    pub fn resize_target(&self) -> Option<(u32, u32)> {
        if self.new_height > 0 && self.new_width > 0 {
            Some((self.new_height, self.new_width))
        } else {
            None
        }
    }

    /// Mean subtracted from channel `c`.
    pub fn mean_for(&self, c: usize) -> f64 {
        match self.mean_values.len() {
            0 => 0.0,
            1 => self.mean_values[0],
            _ => self.mean_values[c],
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LayerError::Config("batch_size must be at least 1".to_string()));
        }
        if (self.new_height == 0) != (self.new_width == 0) {
            return Err(LayerError::Config(format!(
                "new_height and new_width must be set together, got {}x{}",
                self.new_height, self.new_width
            )));
        }
        let means = self.mean_values.len();
        if means > 1 && means != self.channels() {
            return Err(LayerError::Config(format!(
                "mean_values has {} entries; expected 0, 1 or {}",
                means,
                self.channels()
            )));
        }
        if !self.scale.is_finite() {
            return Err(LayerError::Config(format!("scale must be finite, got {}", self.scale)));
        }
        Ok(())
    }
}
