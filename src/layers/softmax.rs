use crate::error::{LayerError, Result};
use crate::layers::layer::Layer;
use crate::math::blob::Blob;

/// Softmax over the channel axis of an `(N, C, H, W)` blob, computed
/// independently at every `(n, h, w)` position.
#[derive(Debug, Default)]
pub struct SoftmaxLayer;

impl SoftmaxLayer {
    pub fn new() -> SoftmaxLayer {
        SoftmaxLayer
    }
}

impl Layer for SoftmaxLayer {
    fn layer_type(&self) -> &'static str {
        "Softmax"
    }

    fn num_bottom_blobs(&self) -> usize {
        1
    }

    fn num_top_blobs(&self) -> usize {
        1
    }

    fn layer_setup(&mut self, _bottom: &[Blob], _top: &mut [Blob]) -> Result<()> {
        Ok(())
    }

    fn reshape(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()> {
        if bottom[0].channels() == 0 {
            return Err(LayerError::Shape(format!(
                "softmax input {} has no channels",
                bottom[0].shape()
            )));
        }
        top[0].reshape(bottom[0].shape());
        Ok(())
    }

    fn layer_forward(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<f64> {
        let shape = bottom[0].shape();
        let (channels, inner) = (shape.channels, shape.spatial());
        let input = bottom[0].data();
        let output = top[0].data_mut();

        for n in 0..shape.num {
            let base = n * channels * inner;
            for s in 0..inner {
                let at = |c: usize| base + c * inner + s;
                // Subtract the max so exp() cannot overflow.
                let max = (0..channels)
                    .map(|c| input[at(c)])
                    .fold(f64::NEG_INFINITY, f64::max);
                let mut sum = 0.0;
                for c in 0..channels {
                    let e = (input[at(c)] - max).exp();
                    output[at(c)] = e;
                    sum += e;
                }
                for c in 0..channels {
                    output[at(c)] /= sum;
                }
            }
        }
        Ok(0.0)
    }

    fn layer_backward(
        &mut self,
        top: &[Blob],
        propagate_down: &[bool],
        bottom: &mut [Blob],
    ) -> Result<()> {
        if !propagate_down[0] {
            return Ok(());
        }
        let shape = top[0].shape();
        let (channels, inner) = (shape.channels, shape.spatial());
        let y = top[0].data();
        let dy = top[0].diff();
        let dx = bottom[0].diff_mut();

        // dx = y * (dy - sum_c(dy * y))
        for n in 0..shape.num {
            let base = n * channels * inner;
            for s in 0..inner {
                let at = |c: usize| base + c * inner + s;
                let dot: f64 = (0..channels).map(|c| dy[at(c)] * y[at(c)]).sum();
                for c in 0..channels {
                    dx[at(c)] = y[at(c)] * (dy[at(c)] - dot);
                }
            }
        }
        Ok(())
    }
}
