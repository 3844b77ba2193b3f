use log::debug;

use crate::error::{LayerError, Result};
use crate::layers::layer::Layer;
use crate::layers::softmax::SoftmaxLayer;
use crate::loss::loss_config::LossConfig;
use crate::loss::weighting::{class_of, effective_weights, LabelTally};
use crate::math::blob::{Blob, Shape};

/// Softmax cross-entropy between per-element class scores and integer labels.
///
/// Bottoms: scores `(N, C, H, W)` and labels `(N, 1, H, W)`.
/// Top: a single scalar `(1, 1, 1, 1)` holding
/// `loss_weight * sum(-w(label) * ln(softmax[label])) / normalizer`
/// over every element whose label is not ignored.
///
/// The label input is not differentiable; only the scores get a gradient.
#[derive(Debug)]
pub struct SoftmaxWithLossLayer {
    config: LossConfig,
    loss_weight: f64,
    softmax: SoftmaxLayer,
    prob: Blob,
    // Per-class weights and divisor of the last forward pass, reused by backward.
    weights: Vec<f64>,
    normalizer: f64,
}

impl SoftmaxWithLossLayer {
    pub fn new(config: LossConfig, loss_weight: f64) -> SoftmaxWithLossLayer {
        SoftmaxWithLossLayer {
            config,
            loss_weight,
            softmax: SoftmaxLayer::new(),
            prob: Blob::default(),
            weights: Vec::new(),
            normalizer: 1.0,
        }
    }

    pub fn config(&self) -> &LossConfig {
        &self.config
    }

    pub fn loss_weight(&self) -> f64 {
        self.loss_weight
    }

    /// Class probabilities computed by the last forward pass, shaped like the scores.
    pub fn prob(&self) -> &Blob {
        &self.prob
    }

    fn check_shapes(scores: Shape, labels: Shape) -> Result<()> {
        if labels.num != scores.num
            || labels.channels != 1
            || labels.height != scores.height
            || labels.width != scores.width
        {
            return Err(LayerError::Shape(format!(
                "labels {} do not match scores {}; expected ({}, 1, {}, {})",
                labels, scores, scores.num, scores.height, scores.width
            )));
        }
        Ok(())
    }
}

impl Layer for SoftmaxWithLossLayer {
    fn layer_type(&self) -> &'static str {
        "SoftmaxWithLoss"
    }

    fn num_bottom_blobs(&self) -> usize {
        2
    }

    fn num_top_blobs(&self) -> usize {
        1
    }

    fn layer_setup(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()> {
        self.softmax
            .setup(&bottom[..1], std::slice::from_mut(&mut self.prob))?;
        self.config.validate(bottom[0].channels())?;
        top[0].reshape(Shape::new(1, 1, 1, 1));
        top[0].fill_diff(1.0);
        debug!(
            "SoftmaxWithLoss: {} classes, ignore_label {:?}, {:?} normalization, loss weight {}",
            bottom[0].channels(),
            self.config.ignore_label,
            self.config.normalization,
            self.loss_weight
        );
        Ok(())
    }

    fn reshape(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<()> {
        Self::check_shapes(bottom[0].shape(), bottom[1].shape())?;
        self.config.validate(bottom[0].channels())?;
        self.softmax
            .reshape(&bottom[..1], std::slice::from_mut(&mut self.prob))?;
        if top[0].count() != 1 {
            top[0].reshape(Shape::new(1, 1, 1, 1));
            top[0].fill_diff(1.0);
        }
        Ok(())
    }

    fn layer_forward(&mut self, bottom: &[Blob], top: &mut [Blob]) -> Result<f64> {
        self.softmax
            .forward(&bottom[..1], std::slice::from_mut(&mut self.prob))?;

        let shape = bottom[0].shape();
        let (num_classes, inner) = (shape.channels, shape.spatial());
        let labels = bottom[1].data();
        let prob = self.prob.data();

        // Pass 1: class counts over contributing elements.
        let mut tally = LabelTally::new(num_classes);
        tally.count(labels, self.config.ignore_label)?;
        self.weights = effective_weights(&self.config, &tally);

        // Pass 2: weighted negative log-likelihood.
        let mut loss = 0.0;
        for n in 0..shape.num {
            for s in 0..inner {
                let index = n * inner + s;
                let label = match class_of(labels[index], index, num_classes, self.config.ignore_label)? {
                    Some(label) => label,
                    None => continue,
                };
                let p = prob[(n * num_classes + label) * inner + s];
                loss -= self.weights[label] * p.max(f64::MIN_POSITIVE).ln();
            }
        }

        self.normalizer = self
            .config
            .normalization
            .divisor(tally.contributing, shape.num);
        let value = self.loss_weight * loss / self.normalizer;
        top[0].data_mut()[0] = value;
        Ok(value)
    }

    fn layer_backward(
        &mut self,
        top: &[Blob],
        propagate_down: &[bool],
        bottom: &mut [Blob],
    ) -> Result<()> {
        if propagate_down[1] {
            return Err(LayerError::Config(
                "SoftmaxWithLoss cannot backpropagate to label inputs".to_string(),
            ));
        }
        if !propagate_down[0] {
            return Ok(());
        }

        let (scores, rest) = bottom.split_at_mut(1);
        let labels = rest[0].data();
        let shape = scores[0].shape();
        let (num_classes, inner) = (shape.channels, shape.spatial());
        Self::check_shapes(shape, rest[0].shape())?;
        if self.weights.len() != num_classes || self.prob.shape() != shape {
            return Err(LayerError::Config(
                "SoftmaxWithLoss: backward called before forward on these inputs".to_string(),
            ));
        }
        let scale = self.loss_weight * top[0].diff()[0] / self.normalizer;
        let prob = self.prob.data();
        let grad = scores[0].diff_mut();

        // d/dz of -w * ln(softmax(z)[label]) is w * (softmax(z) - one_hot(label)).
        for n in 0..shape.num {
            for s in 0..inner {
                let index = n * inner + s;
                let at = |c: usize| (n * num_classes + c) * inner + s;
                match class_of(labels[index], index, num_classes, self.config.ignore_label)? {
                    None => {
                        for c in 0..num_classes {
                            grad[at(c)] = 0.0;
                        }
                    }
                    Some(label) => {
                        let w = self.weights[label] * scale;
                        for c in 0..num_classes {
                            let target = if c == label { 1.0 } else { 0.0 };
                            grad[at(c)] = w * (prob[at(c)] - target);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
