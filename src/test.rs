#![cfg(test)]

use ndarray::{Array1, Array2, Array4};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    arch::{Normalization, layers::Layer},
    config::TransferConfig,
    error::StyleErr,
    extractor::{self, Stage},
    pretrained::random_features,
    run_style_transfer,
};

// Enough convolutions for the default capture sets (conv_1..conv_5).
const FIVE_CONV_PLAN: &[Option<usize>] = &[Some(2), Some(2), None, Some(3), Some(3), Some(4)];

fn plain_normalization() -> Normalization {
    Normalization::new([0.0; 3], [1.0; 3])
}

fn small_config(num_steps: usize, image_size: usize) -> TransferConfig {
    TransferConfig {
        num_steps,
        image_size,
        ..TransferConfig::default()
    }
}

#[test]
fn default_captures_embed_one_content_and_five_style_losses() {
    let mut rng = StdRng::seed_from_u64(40);
    let layers = random_features(FIVE_CONV_PLAN, &mut rng);
    let img = Array4::from_elem((1, 3, 16, 16), 0.3);
    let config = TransferConfig::default();

    let model = extractor::build(
        layers,
        plain_normalization(),
        &img,
        &img,
        &config.content_layers,
        &config.style_layers,
    )
    .unwrap();

    assert_eq!(model.num_content_losses(), 1);
    assert_eq!(model.num_style_losses(), 5);
    assert!(model.stages().last().unwrap().is_loss());
}

#[test]
fn no_layer_survives_past_the_last_loss_module() {
    let mut rng = StdRng::seed_from_u64(41);
    let layers = random_features(FIVE_CONV_PLAN, &mut rng);
    let img = Array4::from_elem((1, 3, 16, 16), 0.3);

    // Capture only conv_2: conv_3..conv_5 and the pool behind it are dead
    // weight and must be gone.
    let model = extractor::build(
        layers,
        plain_normalization(),
        &img,
        &img,
        &[],
        &["conv_2".to_string()],
    )
    .unwrap();

    assert!(model.stages().last().unwrap().is_loss());
    assert!(
        !model
            .stages()
            .iter()
            .any(|s| matches!(s.name(), Some("conv_3" | "conv_4" | "conv_5")))
    );
}

#[test]
fn layer_names_follow_the_convolution_counter() {
    let mut rng = StdRng::seed_from_u64(42);
    let dist = Uniform::new(-0.5f32, 0.5).unwrap();
    let layers = vec![
        Layer::conv2d(
            Array4::random_using((2, 3, 3, 3), dist, &mut rng),
            Array1::zeros(2),
            (1, 1),
            (1, 1),
        ),
        Layer::batch_norm2d(
            Array1::ones(2),
            Array1::zeros(2),
            Array1::zeros(2),
            Array1::ones(2),
            1e-5,
        ),
        Layer::relu(),
        Layer::max_pool2d((2, 2), (2, 2)),
        Layer::conv2d(
            Array4::random_using((2, 2, 3, 3), dist, &mut rng),
            Array1::zeros(2),
            (1, 1),
            (1, 1),
        ),
    ];
    let img = Array4::from_elem((1, 3, 6, 6), 0.5);

    let model = extractor::build(
        layers,
        plain_normalization(),
        &img,
        &img,
        &[],
        &["conv_2".to_string()],
    )
    .unwrap();

    let names: Vec<_> = model.stages().iter().filter_map(Stage::name).collect();
    assert_eq!(names, ["conv_1", "bn_1", "relu_1", "pool_1", "conv_2"]);
}

#[test]
fn a_classifier_layer_aborts_the_build() {
    let layers = vec![
        Layer::linear(Array2::zeros((2, 27)), Array1::zeros(2)),
        Layer::relu(),
    ];
    let img = Array4::from_elem((1, 3, 3, 3), 0.5);

    match extractor::build(
        layers,
        plain_normalization(),
        &img,
        &img,
        &[],
        &["conv_1".to_string()],
    ) {
        Err(StyleErr::UnrecognizedLayer { position, class }) => {
            assert_eq!(position, 0);
            assert_eq!(class, "Linear");
        }
        Err(e) => panic!("expected UnrecognizedLayer, got {e}"),
        Ok(_) => panic!("expected UnrecognizedLayer, got a pipeline"),
    }
}

#[test]
fn identical_gray_images_leave_the_output_gray() {
    // content == style means every capture target equals the output's own
    // activations: zero loss, zero gradient, nothing to optimize.
    let mut rng = StdRng::seed_from_u64(43);
    let layers = random_features(FIVE_CONV_PLAN, &mut rng);
    let gray = Array4::from_elem((1, 3, 16, 16), 0.5);

    let out = run_style_transfer(
        layers,
        plain_normalization(),
        &gray,
        &gray,
        &small_config(10, 16),
    )
    .unwrap();

    for &v in out.iter() {
        assert!((v - 0.5).abs() < 1e-4);
    }
}

#[test]
fn zero_step_budget_returns_the_clamped_input() {
    let mut rng = StdRng::seed_from_u64(44);
    let layers = random_features(FIVE_CONV_PLAN, &mut rng);
    let content = Array4::random_using(
        (1, 3, 16, 16),
        Uniform::new(0.0f32, 1.0).unwrap(),
        &mut rng,
    );
    let style = Array4::random_using(
        (1, 3, 16, 16),
        Uniform::new(0.0f32, 1.0).unwrap(),
        &mut rng,
    );

    let out = run_style_transfer(
        layers,
        plain_normalization(),
        &content,
        &style,
        &small_config(0, 16),
    )
    .unwrap();

    for (a, b) in out.iter().zip(content.iter()) {
        assert!((a - b).abs() < 1e-6);
    }
}

#[test]
fn zero_step_budget_still_clamps_out_of_range_pixels() {
    let mut rng = StdRng::seed_from_u64(45);
    let layers = random_features(FIVE_CONV_PLAN, &mut rng);
    let content = Array4::random_using(
        (1, 3, 16, 16),
        Uniform::new(-0.5f32, 1.5).unwrap(),
        &mut rng,
    );
    let style = Array4::from_elem((1, 3, 16, 16), 0.5);

    let out = run_style_transfer(
        layers,
        plain_normalization(),
        &content,
        &style,
        &small_config(0, 16),
    )
    .unwrap();

    for (&a, &b) in out.iter().zip(content.iter()) {
        assert!((a - b.clamp(0.0, 1.0)).abs() < 1e-6);
    }
}

#[test]
fn pipeline_gradient_matches_finite_differences() {
    // Convolutions only: the objective is smooth in the image, so a
    // central difference nails the analytic gradient.
    let mut rng = StdRng::seed_from_u64(46);
    let dist = Uniform::new(-0.5f32, 0.5).unwrap();
    let dist01 = Uniform::new(0.0f32, 1.0).unwrap();
    let layers = vec![
        Layer::conv2d(
            Array4::random_using((2, 3, 3, 3), dist, &mut rng),
            Array1::zeros(2),
            (1, 1),
            (1, 1),
        ),
        Layer::conv2d(
            Array4::random_using((2, 2, 3, 3), dist, &mut rng),
            Array1::zeros(2),
            (1, 1),
            (1, 1),
        ),
    ];
    let content = Array4::random_using((1, 3, 6, 6), dist01, &mut rng);
    let style = Array4::random_using((1, 3, 6, 6), dist01, &mut rng);

    let mut model = extractor::build(
        layers,
        plain_normalization(),
        &content,
        &style,
        &["conv_2".to_string()],
        &["conv_1".to_string()],
    )
    .unwrap();

    let (cw, sw) = (1.0, 50.0);
    let img = Array4::random_using((1, 3, 6, 6), dist01, &mut rng);
    model.forward(&img).unwrap();
    let grad = model.backward(cw, sw);

    let mut objective = |p: &Array4<f32>| {
        let losses = model.forward(p).unwrap();
        cw * losses.content_total() + sw * losses.style_total()
    };

    let h = 1e-2;
    for idx in [[0, 0, 0, 0], [0, 1, 3, 2], [0, 2, 5, 5], [0, 0, 2, 4]] {
        let mut plus = img.clone();
        plus[idx] += h;
        let mut minus = img.clone();
        minus[idx] -= h;
        let fd = (objective(&plus) - objective(&minus)) / (2.0 * h);
        assert!(
            (fd - grad[idx]).abs() < 1e-3 + 0.05 * grad[idx].abs(),
            "fd {fd} vs analytic {} at {idx:?}",
            grad[idx]
        );
    }
}

#[test]
fn optimization_never_increases_the_objective() {
    let mut rng = StdRng::seed_from_u64(47);
    let layers = random_features(&[Some(2), Some(2)], &mut rng);
    let dist01 = Uniform::new(0.0f32, 1.0).unwrap();
    let content = Array4::random_using((1, 3, 8, 8), dist01, &mut rng);
    let style = Array4::random_using((1, 3, 8, 8), dist01, &mut rng);

    let config = TransferConfig {
        num_steps: 15,
        style_weight: 1_000.0,
        content_weight: 1.0,
        content_layers: vec!["conv_2".to_string()],
        style_layers: vec!["conv_1".to_string(), "conv_2".to_string()],
        image_size: 8,
        ..TransferConfig::default()
    };

    let out = run_style_transfer(
        layers.clone(),
        plain_normalization(),
        &content,
        &style,
        &config,
    )
    .unwrap();

    let mut probe = extractor::build(
        layers,
        plain_normalization(),
        &content,
        &style,
        &config.content_layers,
        &config.style_layers,
    )
    .unwrap();

    let objective = |losses: &crate::extractor::Losses| {
        config.content_weight * losses.content_total() + config.style_weight * losses.style_total()
    };
    let before = objective(&probe.forward(&content).unwrap());
    let after = objective(&probe.forward(&out).unwrap());
    assert!(after <= before + 1e-4, "objective rose from {before} to {after}");
}

#[test]
fn non_rgb_content_fails_the_whole_run() {
    let mut rng = StdRng::seed_from_u64(48);
    let layers = random_features(&[Some(2)], &mut rng);
    let content = Array4::from_elem((1, 4, 8, 8), 0.5);
    let style = Array4::from_elem((1, 3, 8, 8), 0.5);

    assert!(matches!(
        run_style_transfer(
            layers,
            plain_normalization(),
            &content,
            &style,
            &small_config(5, 8),
        ),
        Err(StyleErr::ShapeMismatch { .. })
    ));
}
