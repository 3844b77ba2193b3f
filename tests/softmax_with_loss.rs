use approx::assert_relative_eq;
use ferrite_seg::{
    Blob, GaussianFiller, GradientChecker, Layer, LayerError, LossConfig, Normalization, Shape,
    SoftmaxLayer, SoftmaxWithLossLayer,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 1701;

/// Scores `(10, 5, 2, 3)` drawn from N(0, 10²) and labels drawn from {0..4}.
fn fixture() -> Vec<Blob> {
    let mut scores = Blob::new(10, 5, 2, 3);
    GaussianFiller::new(0.0, 10.0, SEED).fill(&mut scores);
    let mut labels = Blob::new(10, 1, 2, 3);
    let mut rng = StdRng::seed_from_u64(SEED);
    for v in labels.data_mut() {
        *v = rng.gen_range(0..5) as f64;
    }
    vec![scores, labels]
}

/// Eight classes over `(10, 8, 3, 4)` with uneven label counts.
fn imbalanced_fixture() -> Vec<Blob> {
    let mut scores = Blob::new(10, 8, 3, 4);
    GaussianFiller::new(0.0, 10.0, SEED).fill(&mut scores);
    let mut labels = Blob::new(10, 1, 3, 4);
    let mut rng = StdRng::seed_from_u64(SEED + 1);
    for v in labels.data_mut() {
        // Skewed towards low classes.
        let a: u32 = rng.gen_range(0..8);
        let b: u32 = rng.gen_range(0..8);
        *v = a.min(b) as f64;
    }
    vec![scores, labels]
}

/// Two-class dense fixture: row 0 is labelled 1, row 1 is labelled 0.
///
/// Scores per channel:
///   c0: [w- w- w- w-]   c1: [w+ w+ w+ w+]
///       [b+ b+ b+ b+]       [b- b- b- b-]
fn set_up_dense(bottom: &mut [Blob], black_pos: f64, black_neg: f64, white_pos: f64, white_neg: f64) {
    let label_shape = Shape::new(10, 1, 2, 4);
    bottom[1].reshape(label_shape);
    for n in 0..10 {
        for h in 0..2 {
            for w in 0..4 {
                let at = bottom[1].offset(n, 0, h, w);
                bottom[1].data_mut()[at] = (1 - h) as f64;
            }
        }
    }

    bottom[0].reshape(Shape::new(10, 2, 2, 4));
    for n in 0..10 {
        for c in 0..2 {
            for h in 0..2 {
                let val = match (c, h) {
                    (1, 1) => black_neg,
                    (1, _) => white_pos,
                    (_, 1) => black_pos,
                    _ => white_neg,
                };
                for w in 0..4 {
                    let at = bottom[0].offset(n, c, h, w);
                    bottom[0].data_mut()[at] = val;
                }
            }
        }
    }
}

fn top() -> Vec<Blob> {
    vec![Blob::default()]
}

fn loss_of(config: LossConfig, loss_weight: f64, bottom: &[Blob]) -> f64 {
    let mut layer = SoftmaxWithLossLayer::new(config, loss_weight);
    let mut top = top();
    layer.setup(bottom, &mut top).unwrap();
    layer.forward(bottom, &mut top).unwrap()
}

#[test]
fn larger_margin_lowers_loss() {
    let mut bottom = fixture();
    let mut top = top();
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 1.0);
    set_up_dense(&mut bottom, 1.0, -1.0, 1.0, -1.0);
    layer.setup(&bottom, &mut top).unwrap();
    layer.forward(&bottom, &mut top).unwrap();
    let full_loss = top[0].data()[0];

    set_up_dense(&mut bottom, 2.0, -1.0, 1.0, -1.0);
    layer.forward(&bottom, &mut top).unwrap();
    let better_loss = top[0].data()[0];
    assert!(better_loss < full_loss, "{} !< {}", better_loss, full_loss);
}

#[test]
fn gradient() {
    let mut bottom = fixture();
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 3.0);
    GradientChecker::new(1e-2, 1e-2)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), Some(0))
        .unwrap();
}

#[test]
fn frequency_weighted_gradient() {
    let mut bottom = imbalanced_fixture();
    let config = LossConfig::new()
        .with_class_weighting(vec![2.0; 8])
        .with_weight_by_label_freqs(true);
    let mut layer = SoftmaxWithLossLayer::new(config, 3.0);
    GradientChecker::new(1e-2, 1e-2)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), Some(0))
        .unwrap();
}

#[test]
fn forward_ignore_label() {
    let bottom = fixture();
    let base = LossConfig::new().with_normalize(false);
    let full_loss = loss_of(base.clone(), 1.0, &bottom);

    // Ignore each label in {0, ..., 4} in turn.
    let accum_loss: f64 = (0..5)
        .map(|label| loss_of(base.clone().with_ignore_label(label), 1.0, &bottom))
        .sum();
    // Every element is counted in all runs but one.
    assert_relative_eq!(accum_loss, 4.0 * full_loss, epsilon = 1e-4);
}

#[test]
fn gradient_ignore_label() {
    let mut bottom = fixture();
    // Labels are in {0, ..., 4}, so about a fifth are ignored.
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new().with_ignore_label(0), 1.0);
    GradientChecker::new(1e-2, 1e-2)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), Some(0))
        .unwrap();

    // Ignored elements get exactly zero gradient.
    let labels = bottom[1].data().to_vec();
    let inner = bottom[0].height() * bottom[0].width();
    for (index, &label) in labels.iter().enumerate() {
        if label == 0.0 {
            let (n, s) = (index / inner, index % inner);
            for c in 0..5 {
                assert_eq!(bottom[0].diff()[(n * 5 + c) * inner + s], 0.0);
            }
        }
    }
}

#[test]
fn gradient_unnormalized() {
    let mut bottom = fixture();
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new().with_normalize(false), 1.0);
    GradientChecker::new(1e-2, 1e-2)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), Some(0))
        .unwrap();
}

#[test]
fn gradient_batch_size_normalization() {
    let mut bottom = fixture();
    let config = LossConfig::new().with_normalization(Normalization::BatchSize);
    let mut layer = SoftmaxWithLossLayer::new(config, 1.0);
    GradientChecker::new(1e-2, 1e-2)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), Some(0))
        .unwrap();
}

#[test]
fn normalization_modes_scale_the_same_sum() {
    let bottom = fixture();
    let raw = loss_of(LossConfig::new().with_normalize(false), 1.0, &bottom);
    let valid = loss_of(LossConfig::new(), 1.0, &bottom);
    let batch = loss_of(LossConfig::new().with_normalization(Normalization::BatchSize), 1.0, &bottom);
    assert_relative_eq!(valid, raw / 60.0, epsilon = 1e-12);
    assert_relative_eq!(batch, raw / 10.0, epsilon = 1e-12);

    // Ignoring label 0 shrinks the valid divisor to the remaining count.
    let ignored = bottom[1].data().iter().filter(|&&v| v == 0.0).count();
    let raw_ignoring = loss_of(LossConfig::new().with_normalize(false).with_ignore_label(0), 1.0, &bottom);
    let valid_ignoring = loss_of(LossConfig::new().with_ignore_label(0), 1.0, &bottom);
    assert_relative_eq!(valid_ignoring, raw_ignoring / (60 - ignored) as f64, epsilon = 1e-12);
}

#[test]
fn loss_weight_and_class_weights_scale_linearly() {
    let bottom = fixture();
    let plain = loss_of(LossConfig::new(), 1.0, &bottom);
    assert_relative_eq!(loss_of(LossConfig::new(), 3.0, &bottom), 3.0 * plain, epsilon = 1e-12);
    let doubled = LossConfig::new().with_class_weighting(vec![2.0; 5]);
    assert_relative_eq!(loss_of(doubled, 1.0, &bottom), 2.0 * plain, epsilon = 1e-12);
}

#[test]
fn frequency_weighting_balances_classes() {
    // Three elements of class 0, one of class 1, uniform scores.
    let scores = Blob::from_data(Shape::new(4, 2, 1, 1), vec![0.0; 8]).unwrap();
    let labels = Blob::from_data(Shape::new(4, 1, 1, 1), vec![0.0, 0.0, 0.0, 1.0]).unwrap();
    let bottom = vec![scores, labels];
    let config = LossConfig::new().with_weight_by_label_freqs(true);
    // Weights 4/3 and 4: (3 * 4/3 + 4) * ln 2 / 4 = 2 ln 2.
    assert_relative_eq!(loss_of(config, 1.0, &bottom), 2.0 * 2f64.ln(), epsilon = 1e-12);
}

#[test]
fn all_ignored_batch_has_zero_loss_and_gradient() {
    let mut bottom = fixture();
    bottom[1].fill_data(4.0);
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new().with_ignore_label(4), 1.0);
    let mut top = top();
    layer.setup(&bottom, &mut top).unwrap();
    let loss = layer.forward(&bottom, &mut top).unwrap();
    assert_eq!(loss, 0.0);
    bottom[0].fill_diff(7.0);
    layer.backward(&top, &[true, false], &mut bottom).unwrap();
    assert!(bottom[0].diff().iter().all(|&g| g == 0.0));
}

#[test]
fn prob_is_the_softmax_of_the_scores() {
    let bottom = fixture();
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 1.0);
    let mut top = top();
    layer.setup(&bottom, &mut top).unwrap();
    layer.forward(&bottom, &mut top).unwrap();
    let prob = layer.prob();
    assert_eq!(prob.shape(), bottom[0].shape());
    let sum: f64 = (0..5).map(|c| prob.data()[prob.offset(3, c, 1, 2)]).sum();
    assert_relative_eq!(sum, 1.0, epsilon = 1e-12);
}

#[test]
fn mismatched_label_shape_is_a_shape_error() {
    let mut bottom = fixture();
    bottom[1].reshape(Shape::new(10, 1, 3, 2));
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 1.0);
    let err = layer.setup(&bottom, &mut top()).unwrap_err();
    assert!(matches!(err, LayerError::Shape(_)));
}

#[test]
fn shape_is_revalidated_on_forward() {
    let mut bottom = fixture();
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 1.0);
    let mut top = top();
    layer.setup(&bottom, &mut top).unwrap();
    bottom[1].reshape(Shape::new(9, 1, 2, 3));
    let err = layer.forward(&bottom, &mut top).unwrap_err();
    assert!(matches!(err, LayerError::Shape(_)));
}

#[test]
fn wrong_weight_count_is_a_config_error() {
    let bottom = fixture();
    let config = LossConfig::new().with_class_weighting(vec![1.0; 4]);
    let mut layer = SoftmaxWithLossLayer::new(config, 1.0);
    let err = layer.setup(&bottom, &mut top()).unwrap_err();
    assert!(matches!(err, LayerError::Config(_)));
}

#[test]
fn out_of_range_label_is_reported() {
    let mut bottom = fixture();
    bottom[1].data_mut()[17] = 5.0;
    let mut layer = SoftmaxWithLossLayer::new(LossConfig::new(), 1.0);
    let mut top = top();
    layer.setup(&bottom, &mut top).unwrap();
    let err = layer.forward(&bottom, &mut top).unwrap_err();
    assert!(matches!(err, LayerError::LabelOutOfRange { label: 5, index: 17, num_classes: 5 }));
}

#[test]
fn forward_is_deterministic() {
    let bottom = fixture();
    let a = loss_of(LossConfig::new().with_ignore_label(2), 1.0, &bottom);
    let b = loss_of(LossConfig::new().with_ignore_label(2), 1.0, &bottom);
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn softmax_gradient() {
    let mut bottom = vec![Blob::new(2, 4, 2, 2)];
    GaussianFiller::new(0.0, 1.0, SEED).fill(&mut bottom[0]);
    let mut layer = SoftmaxLayer::new();
    GradientChecker::new(1e-2, 1e-3)
        .check_gradient_exhaustive(&mut layer, &mut bottom, &mut top(), None)
        .unwrap();
}
