use thiserror::Error;

use crate::error::LayerError;
use crate::layers::layer::Layer;
use crate::math::blob::Blob;

#[derive(Error, Debug)]
pub enum GradientCheckError {
    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(
        "gradient mismatch at top {top_id}[{top_data_id}] w.r.t. bottom {blob_id}[{feat_id}]: \
         analytic {computed}, numeric {estimated}"
    )]
    Mismatch {
        top_id: usize,
        top_data_id: usize,
        blob_id: usize,
        feat_id: usize,
        computed: f64,
        estimated: f64,
    },
}

/// Compares a layer's `backward` against central finite differences of its
/// `forward`.
///
/// For each checked top element the objective is that element's value. The
/// analytic and numeric gradients must satisfy
/// `|a - e| <= threshold * max(|a|, |e|, 1)`. Inputs within
/// `kink ± kink_range` are skipped, for layers with non-smooth points.
#[derive(Debug, Clone, Copy)]
pub struct GradientChecker {
    pub stepsize: f64,
    pub threshold: f64,
    pub kink: f64,
    pub kink_range: f64,
}

impl GradientChecker {
    pub fn new(stepsize: f64, threshold: f64) -> GradientChecker {
        GradientChecker {
            stepsize,
            threshold,
            kink: 0.0,
            kink_range: -1.0,
        }
    }

    pub fn with_kink(mut self, kink: f64, kink_range: f64) -> GradientChecker {
        self.kink = kink;
        self.kink_range = kink_range;
        self
    }

    /// Sets the layer up, then checks every element of every top against
    /// bottom `check_bottom` (or every bottom when `None`).
    pub fn check_gradient_exhaustive<L: Layer + ?Sized>(
        &self,
        layer: &mut L,
        bottom: &mut [Blob],
        top: &mut [Blob],
        check_bottom: Option<usize>,
    ) -> Result<(), GradientCheckError> {
        layer.setup(bottom, top)?;
        for top_id in 0..top.len() {
            for top_data_id in 0..top[top_id].count() {
                self.check_gradient_single(layer, bottom, top, check_bottom, top_id, top_data_id)?;
            }
        }
        Ok(())
    }

    /// Checks one top element. The layer must already be set up.
    pub fn check_gradient_single<L: Layer + ?Sized>(
        &self,
        layer: &mut L,
        bottom: &mut [Blob],
        top: &mut [Blob],
        check_bottom: Option<usize>,
        top_id: usize,
        top_data_id: usize,
    ) -> Result<(), GradientCheckError> {
        let checked: Vec<usize> = match check_bottom {
            Some(b) if b >= bottom.len() => {
                return Err(LayerError::Config(format!(
                    "cannot check bottom {} of a layer with {} bottom blobs",
                    b,
                    bottom.len()
                ))
                .into());
            }
            Some(b) => vec![b],
            None => (0..bottom.len()).collect(),
        };
        let propagate_down: Vec<bool> = (0..bottom.len()).map(|b| checked.contains(&b)).collect();

        // Analytic gradient of top[top_id][top_data_id].
        layer.forward(bottom, top)?;
        if top_id >= top.len() || top_data_id >= top[top_id].count() {
            return Err(LayerError::Config(format!("top {}[{}] does not exist", top_id, top_data_id)).into());
        }
        for blob in top.iter_mut() {
            blob.fill_diff(0.0);
        }
        top[top_id].diff_mut()[top_data_id] = 1.0;
        for &b in &checked {
            bottom[b].fill_diff(0.0);
        }
        layer.backward(top, &propagate_down, bottom)?;
        let computed: Vec<Vec<f64>> = checked.iter().map(|&b| bottom[b].diff().to_vec()).collect();

        for (k, &blob_id) in checked.iter().enumerate() {
            for feat_id in 0..bottom[blob_id].count() {
                let feature = bottom[blob_id].data()[feat_id];

                bottom[blob_id].data_mut()[feat_id] = feature + self.stepsize;
                layer.forward(bottom, top)?;
                let positive = top[top_id].data()[top_data_id];

                bottom[blob_id].data_mut()[feat_id] = feature - self.stepsize;
                layer.forward(bottom, top)?;
                let negative = top[top_id].data()[top_data_id];

                bottom[blob_id].data_mut()[feat_id] = feature;

                let magnitude = feature.abs();
                if magnitude >= self.kink - self.kink_range && magnitude <= self.kink + self.kink_range {
                    continue;
                }
                let estimated = (positive - negative) / (2.0 * self.stepsize);
                let analytic = computed[k][feat_id];
                let scale = analytic.abs().max(estimated.abs()).max(1.0);
                if (analytic - estimated).abs() > self.threshold * scale {
                    return Err(GradientCheckError::Mismatch {
                        top_id,
                        top_data_id,
                        blob_id,
                        feat_id,
                        computed: analytic,
                        estimated,
                    });
                }
            }
        }
        Ok(())
    }
}
