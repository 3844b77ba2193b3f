use crate::error::{LayerError, Result};
use crate::math::blob::Blob;

/// A computation stage that reads `bottom` blobs and writes `top` blobs.
///
/// Callers run `setup` once, then any number of `forward` / `backward`
/// pairs. `forward` re-runs `reshape` first, so bottoms may change shape
/// between calls as long as they stay mutually consistent.
pub trait Layer {
    /// Short type name used in log lines and error messages.
    fn layer_type(&self) -> &'static str;

    fn num_bottom_blobs(&self) -> usize;

    fn num_top_blobs(&self) -> usize;

    /// One-time initialisation that depends on the configuration and the
    /// first set of inputs.
    fn layer_setup(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()>;

    /// Validates bottom shapes and sizes the tops to match.
    fn reshape(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()>;

    /// Computes the tops. Returns this layer's contribution to the objective
    /// (zero for non-loss layers).
    fn layer_forward(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<f64>;

    /// Writes the bottom diffs from the top diffs. `propagate_down[i]` says
    /// whether bottom `i` needs a gradient.
    fn layer_backward(
        &mut self,
        top: &[Blob],
        propagate_down: &[bool],
        bottom: &mut [Blob],
    ) -> Result<()>;

    fn setup(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()> {
        self.check_blob_counts(bottom.len(), top.len())?;
        self.layer_setup(bottom, top)?;
        self.reshape(bottom, top)
    }

    fn forward(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<f64> {
        self.check_blob_counts(bottom.len(), top.len())?;
        self.reshape(bottom, top)?;
        self.layer_forward(bottom, top)
    }

    fn backward(
        &mut self,
        top: &[Blob],
        propagate_down: &[bool],
        bottom: &mut [Blob],
    ) -> Result<()> {
        self.check_blob_counts(bottom.len(), top.len())?;
        if propagate_down.len() != bottom.len() {
            return Err(LayerError::Config(format!(
                "{}: propagate_down has {} entries for {} bottom blobs",
                self.layer_type(),
                propagate_down.len(),
                bottom.len()
            )));
        }
        self.layer_backward(top, propagate_down, bottom)
    }

    fn check_blob_counts(&self, bottoms: usize, tops: usize) -> Result<()> {
        check_blob_count(self.layer_type(), "bottom", self.num_bottom_blobs(), bottoms)?;
        check_blob_count(self.layer_type(), "top", self.num_top_blobs(), tops)
    }
}

fn check_blob_count(layer: &str, side: &str, expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(LayerError::Config(format!(
            "{} takes exactly {} {} blob(s), got {}",
            layer, expected, side, got
        )));
    }
    Ok(())
}
