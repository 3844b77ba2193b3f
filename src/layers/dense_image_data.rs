use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::data::data_config::DenseImageDataConfig;
use crate::data::decode::{load_image, load_label, Planes};
use crate::data::manifest::{Manifest, ManifestEntry};
use crate::error::{LayerError, Result};
use crate::layers::layer::Layer;
use crate::math::blob::{Blob, Shape};

/// A decoded image with its label plane, both at the same resolution.
struct Example {
    image: Planes,
    label: Planes,
}

/// Everything that only exists once `setup` has read the manifest.
struct Cursor {
    manifest: Manifest,
    order: Vec<usize>,
    position: usize,
}

/// Data layer that streams image / label-image pairs listed in a manifest.
///
/// Tops: images `(batch, C, H, W)` with C = 3 (or 1 for grayscale) and labels
/// `(batch, 1, H, W)`. With a resize target every batch has that size.
/// Without one each batch takes the native size of its first pair, and the
/// batch ends early at the first pair whose size differs, so a manifest of
/// mixed sizes yields batches of one.
///
/// The read position wraps around at the end of the manifest; with
/// `shuffle` a new permutation is drawn at setup and on every wrap.
pub struct DenseImageDataLayer {
    config: DenseImageDataConfig,
    rng: StdRng,
    cursor: Option<Cursor>,
}

impl DenseImageDataLayer {
    pub fn new(config: DenseImageDataConfig) -> DenseImageDataLayer {
        let rng = StdRng::seed_from_u64(config.seed);
        DenseImageDataLayer {
            config,
            rng,
            cursor: None,
        }
    }

    pub fn config(&self) -> &DenseImageDataConfig {
        &self.config
    }

    /// Number of pairs in the manifest; zero before `setup`.
    pub fn len(&self) -> usize {
        self.cursor.as_ref().map_or(0, |c| c.manifest.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Manifest entries in the order the next pass will read them.
    pub fn pass_order(&self) -> Vec<&ManifestEntry> {
        match &self.cursor {
            Some(cursor) => cursor
                .order
                .iter()
                .filter_map(|&i| cursor.manifest.get(i))
                .collect(),
            None => Vec::new(),
        }
    }

    fn load(&mut self, entry: &ManifestEntry) -> Result<Example> {
        let resize = self.config.resize_target();
        let mut image = load_image(&entry.image, self.config.is_color, resize)?;
        let mut label = load_label(&entry.label, resize)?;
        if (image.height, image.width) != (label.height, label.width) {
            return Err(LayerError::Shape(format!(
                "label `{}` is {}x{} but image `{}` is {}x{}",
                entry.label.display(),
                label.height,
                label.width,
                entry.image.display(),
                image.height,
                image.width
            )));
        }
        if self.config.mirror && self.rng.gen::<bool>() {
            image.flip_horizontal();
            label.flip_horizontal();
        }
        let plane = image.height * image.width;
        for (c, values) in image.data.chunks_exact_mut(plane).enumerate() {
            let mean = self.config.mean_for(c);
            for v in values {
                *v = (*v - mean) * self.config.scale;
            }
        }
        Ok(Example { image, label })
    }

    fn current_entry(&self) -> Result<ManifestEntry> {
        let cursor = self.cursor.as_ref().ok_or_else(|| {
            LayerError::Config("DenseImageData: forward called before setup".to_string())
        })?;
        let index = cursor.order[cursor.position];
        Ok(cursor.manifest.entries()[index].clone())
    }

    fn advance(&mut self) {
        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };
        cursor.position += 1;
        if cursor.position >= cursor.order.len() {
            cursor.position = 0;
            debug!("DenseImageData: restarting from the start of the manifest");
            if self.config.shuffle {
                cursor.order.shuffle(&mut self.rng);
            }
        }
    }

    fn top_shapes(&self, num: usize, height: usize, width: usize) -> (Shape, Shape) {
        (
            Shape::new(num, self.config.channels(), height, width),
            Shape::new(num, 1, height, width),
        )
    }
}

impl Layer for DenseImageDataLayer {
    fn layer_type(&self) -> &'static str {
        "DenseImageData"
    }

    fn num_bottom_blobs(&self) -> usize {
        0
    }

    fn num_top_blobs(&self) -> usize {
        2
    }

    fn layer_setup(&mut self, _bottom: &[Blob], top: &mut [Blob]) -> Result<()> {
        self.config.validate()?;
        let manifest = Manifest::read(&self.config.source, &self.config.root_folder)?;
        info!(
            "DenseImageData: {} pairs from {}",
            manifest.len(),
            self.config.source.display()
        );

        let mut order: Vec<usize> = (0..manifest.len()).collect();
        if self.config.shuffle {
            info!("DenseImageData: shuffling (seed {})", self.config.seed);
            order.shuffle(&mut self.rng);
        }
        let mut position = 0;
        if self.config.rand_skip > 0 {
            let skip = self.rng.gen_range(0..self.config.rand_skip);
            if skip >= manifest.len() {
                return Err(LayerError::Config(format!(
                    "rand_skip drew {} but the manifest only has {} pairs",
                    skip,
                    manifest.len()
                )));
            }
            info!("DenseImageData: skipping the first {} pairs", skip);
            position = skip;
        }
        self.cursor = Some(Cursor { manifest, order, position });

        // Peek at the first pair to size the tops.
        let entry = self.current_entry()?;
        let first = self.load(&entry)?;
        let (image_shape, label_shape) =
            self.top_shapes(self.config.batch_size, first.image.height, first.image.width);
        top[0].reshape(image_shape);
        top[1].reshape(label_shape);
        info!("DenseImageData: output image {}, label {}", image_shape, label_shape);
        Ok(())
    }

    /// Tops are sized by `layer_forward`, which knows the batch's native size.
    fn reshape(&mut self, _bottom: &[Blob], _top: &mut [Blob]) -> Result<()> {
        Ok(())
    }

    fn layer_forward(&mut self, _bottom: &[Blob], top: &mut [Blob]) -> Result<f64> {
        let batch_size = self.config.batch_size;
        let mut batch_hw = None;
        let mut filled = 0;

        while filled < batch_size {
            let entry = self.current_entry()?;
            let example = self.load(&entry)?;
            let hw = (example.image.height, example.image.width);
            match batch_hw {
                None => {
                    let (image_shape, label_shape) = self.top_shapes(batch_size, hw.0, hw.1);
                    if top[0].shape() != image_shape {
                        debug!("DenseImageData: reshaping output to {}", image_shape);
                    }
                    top[0].reshape(image_shape);
                    top[1].reshape(label_shape);
                    batch_hw = Some(hw);
                }
                Some(expected) if expected != hw => {
                    warn!(
                        "DenseImageData: `{}` is {}x{}, batch started at {}x{}; ending batch at {} of {}",
                        entry.image.display(),
                        hw.0,
                        hw.1,
                        expected.0,
                        expected.1,
                        filled,
                        batch_size
                    );
                    break;
                }
                Some(_) => {}
            }

            let image_len = example.image.data.len();
            let label_len = example.label.data.len();
            top[0].data_mut()[filled * image_len..(filled + 1) * image_len]
                .copy_from_slice(&example.image.data);
            top[1].data_mut()[filled * label_len..(filled + 1) * label_len]
                .copy_from_slice(&example.label.data);
            filled += 1;
            self.advance();
        }

        if filled < batch_size {
            let image_shape = top[0].shape().with_num(filled);
            let label_shape = top[1].shape().with_num(filled);
            top[0].reshape(image_shape);
            top[1].reshape(label_shape);
        }
        Ok(0.0)
    }

    fn layer_backward(
        &mut self,
        _top: &[Blob],
        _propagate_down: &[bool],
        _bottom: &mut [Blob],
    ) -> Result<()> {
        Ok(())
    }
}
