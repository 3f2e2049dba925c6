//! Cross-module end-to-end tests for the HDC classifier core: encoder +
//! trainer + evaluator + GA working together, and the item-memory CSV
//! round-trip through a full build. Exercises spec §8's end-to-end
//! scenarios E1-E6 at the integration level (unit-level variants of the
//! same invariants also live next to the code they test).

use rand::rngs::StdRng;
use rand::SeedableRng;

use hdc_classifier::config::{GaConfig, HdcConfig, SelectionMode};
use hdc_classifier::ga::{FitnessContext, GaOptimizer};
use hdc_classifier::io::csv::{self, StoreFormat};
use hdc_classifier::model::{Evaluator, Trainer};
use hdc_classifier::simd;
use hdc_classifier::vsa::encoder::Encoder;
use hdc_classifier::vsa::memory::{ContinuousItemMemory, ItemMemory};
use hdc_classifier::vsa::ops::VsaOps;
use hdc_classifier::vsa::{Dimension, Mode};

fn ops() -> VsaOps {
    VsaOps::new(simd::best_kernel())
}

fn identity_perm(n: usize) -> Vec<usize> {
    (0..n).collect()
}

fn build_encoder(mode: Mode, n_gram: usize, features: usize, levels: usize) -> (Encoder, VsaOps) {
    let ops = ops();
    let dim = Dimension::TEST;
    let mut rng = StdRng::seed_from_u64(123);
    let im = ItemMemory::random(features, dim, mode, &ops, &mut rng);
    let perm = identity_perm(dim.0);
    let cims: Vec<_> = (0..features)
        .map(|_| ContinuousItemMemory::uniform_full_budget(dim, mode, levels, &perm, &ops).unwrap())
        .collect();
    let enc = Encoder::with_im_cim(im, cims, 0.0, 1.0, n_gram).unwrap();
    (enc, ops)
}

/// Two well-separated clusters per class; enough margin that a correctly
/// wired encode -> train -> classify pipeline should separate them cleanly.
fn two_cluster_dataset(samples_per_class: usize, features: usize) -> (Vec<Vec<f64>>, Vec<i64>) {
    let mut data = Vec::new();
    let mut labels = Vec::new();
    for _ in 0..samples_per_class {
        data.push(vec![0.1; features]);
        labels.push(0i64);
    }
    for _ in 0..samples_per_class {
        data.push(vec![0.9; features]);
        labels.push(1i64);
    }
    (data, labels)
}

#[test]
fn end_to_end_train_and_classify_bipolar() {
    let (enc, ops) = build_encoder(Mode::Bipolar, 3, 4, 9);
    let (data, labels) = two_cluster_dataset(15, 4);
    let mem = Trainer::train(&enc, &ops, &data, &labels, 2, true, 0.1).unwrap();

    let result = Evaluator::evaluate_direct(&enc, &ops, &mem, &data, &labels, 2).unwrap();
    assert!(
        result.overall_accuracy > 0.8,
        "expected strong separation between well-clustered classes, got {}",
        result.overall_accuracy
    );

    let sum: u64 = result.confusion.iter().flatten().sum();
    assert_eq!(sum, result.correct + result.not_correct + result.transition_error);
}

#[test]
fn end_to_end_train_and_classify_binary() {
    let (enc, ops) = build_encoder(Mode::Binary, 3, 4, 9);
    let (data, labels) = two_cluster_dataset(15, 4);
    let mem = Trainer::train(&enc, &ops, &data, &labels, 2, false, 0.1).unwrap();

    let result = Evaluator::evaluate_direct(&enc, &ops, &mem, &data, &labels, 2).unwrap();
    assert!(result.overall_accuracy > 0.8, "accuracy was {}", result.overall_accuracy);
}

#[test]
fn end_to_end_general_non_temporal_training() {
    let (enc, ops) = build_encoder(Mode::Bipolar, 1, 3, 7);
    let (data, labels) = two_cluster_dataset(20, 3);
    let mem = Trainer::train_general(&enc, &ops, &data, &labels, 2, true, 0.1).unwrap();
    let result = Evaluator::evaluate_general(&enc, &ops, &mem, &data, &labels, 2).unwrap();
    assert!(result.overall_accuracy > 0.8);
    assert_eq!(result.transition_error, 0);
}

#[test]
fn e5_transition_accounting_end_to_end() {
    // n=3, labels [0,0,1,1,1,1], both windows predicted as class 1.
    let (enc, ops) = build_encoder(Mode::Bipolar, 3, 1, 5);
    let labels = vec![0i64, 0, 1, 1, 1, 1];
    let data: Vec<Vec<f64>> = vec![
        vec![0.1],
        vec![0.1],
        vec![0.9],
        vec![0.9],
        vec![0.9],
        vec![0.9],
    ];
    // Train only on the stable class-1 windows so the prototype always wins.
    let mem = Trainer::train(&enc, &ops, &data, &labels, 2, false, -1.0).unwrap();
    let result = Evaluator::evaluate_direct(&enc, &ops, &mem, &data, &labels, 2).unwrap();

    // window [0,0,1]: plurality 0, labels[0]!=labels[2] -> transition window.
    // window [1,1,1]: plurality 1, stable -> correct.
    assert_eq!(result.total, 2);
    assert_eq!(result.correct, 1);
    assert_eq!(result.transition_error + result.not_correct, 1);
}

#[test]
fn ga_end_to_end_improves_separation() {
    let ops = ops();
    let dim = Dimension(300);
    let mut rng = StdRng::seed_from_u64(17);
    let num_features = 2;
    let num_classes = 2;

    let im = ItemMemory::random(num_features, dim, Mode::Bipolar, &ops, &mut rng);
    let permutations: Vec<Vec<usize>> = (0..num_features).map(|_| identity_perm(dim.0)).collect();

    let (train_data, train_labels) = two_cluster_dataset(12, num_features);
    let (eval_data, eval_labels) = two_cluster_dataset(8, num_features);

    let ctx = FitnessContext {
        dim,
        mode: Mode::Bipolar,
        num_levels: 6,
        min_level: 0.0,
        max_level: 1.0,
        n_gram_size: 1,
        num_classes,
        normalize: false,
        cut_angle_threshold: 0.1,
        precomputed_item_memory: false,
        im,
        permutations,
        train_data,
        train_labels,
        eval_data,
        eval_labels,
    };

    let config = GaConfig {
        population_size: 8,
        generations: 4,
        crossover_rate: 0.7,
        mutation_rate: 0.2,
        tournament_size: 3,
        seed: 2024,
        max_flips_cim: dim.0,
        selection_mode: SelectionMode::Pareto,
        init_uniform: true,
    };

    let optimizer = GaOptimizer::new(config);
    let result = optimizer.run(&ctx, ctx.num_levels - 1).unwrap();

    assert!(result.best_accuracy >= 0.5, "GA should find a reasonably separating genome");
    assert_eq!(result.best_genome.len(), ctx.num_levels - 1);
    assert!(result.best_genome.sum() <= dim.0);
}

#[test]
fn ga_worker_pool_independent_determinism() {
    // §5's determinism contract: same seed/config/data -> byte-identical
    // winning genome, independent of how many threads ran the fan-out.
    let ops = ops();
    let dim = Dimension(200);
    let mut rng = StdRng::seed_from_u64(3);
    let num_features = 2;
    let im = ItemMemory::random(num_features, dim, Mode::Bipolar, &ops, &mut rng);
    let permutations: Vec<Vec<usize>> = (0..num_features).map(|_| identity_perm(dim.0)).collect();
    let (train_data, train_labels) = two_cluster_dataset(10, num_features);

    let ctx = FitnessContext {
        dim,
        mode: Mode::Bipolar,
        num_levels: 5,
        min_level: 0.0,
        max_level: 1.0,
        n_gram_size: 1,
        num_classes: 2,
        normalize: false,
        cut_angle_threshold: 0.1,
        precomputed_item_memory: false,
        im,
        permutations,
        train_data: train_data.clone(),
        train_labels: train_labels.clone(),
        eval_data: train_data,
        eval_labels: train_labels,
    };

    let config = GaConfig {
        population_size: 6,
        generations: 3,
        crossover_rate: 0.6,
        mutation_rate: 0.15,
        tournament_size: 2,
        seed: 77,
        max_flips_cim: dim.0,
        selection_mode: SelectionMode::Accuracy,
        init_uniform: false,
    };

    let a = GaOptimizer::new(config).run(&ctx, ctx.num_levels - 1).unwrap();
    let b = GaOptimizer::new(config).run(&ctx, ctx.num_levels - 1).unwrap();
    assert_eq!(a.best_genome.genes(), b.best_genome.genes());
    assert_eq!(a.best_accuracy, b.best_accuracy);
    assert_eq!(a.best_similarity, b.best_similarity);
}

#[test]
fn item_memory_csv_round_trip_through_encoder() {
    let ops = ops();
    let dim = Dimension::TEST;
    let mut rng = StdRng::seed_from_u64(55);
    let features = 3;
    let im = ItemMemory::random(features, dim, Mode::Bipolar, &ops, &mut rng);

    let mut buf = Vec::new();
    csv::write_vectors(&mut buf, im.vectors(), StoreFormat::Elementwise).unwrap();
    let (_, loaded_vectors) =
        csv::read_vectors(buf.as_slice(), dim, Mode::Bipolar, StoreFormat::Elementwise).unwrap();
    let loaded_im = ItemMemory::from_vectors(dim, Mode::Bipolar, loaded_vectors);

    let perm = identity_perm(dim.0);
    let cims: Vec<_> = (0..features)
        .map(|_| ContinuousItemMemory::uniform_full_budget(dim, Mode::Bipolar, 5, &perm, &ops).unwrap())
        .collect();
    let original_encoder = Encoder::with_im_cim(im, cims.clone(), 0.0, 1.0, 1).unwrap();
    let loaded_encoder = Encoder::with_im_cim(loaded_im, cims, 0.0, 1.0, 1).unwrap();

    let sample = vec![0.2, 0.5, 0.9];
    let a = original_encoder.encode_timestamp(&sample, &ops).unwrap();
    let b = loaded_encoder.encode_timestamp(&sample, &ops).unwrap();
    assert_eq!(a, b, "round-tripped item memory must encode identically");
}

#[test]
fn config_rejects_window_not_multiple_of_ngram_before_training() {
    let mut cfg = HdcConfig::default();
    cfg.n_gram_size = 4;
    cfg.window = 10;
    assert!(cfg.validate().is_err());
}

#[test]
fn config_check_fits_guards_ngram_against_short_data() {
    let mut cfg = HdcConfig::default();
    cfg.n_gram_size = 5;
    assert!(cfg.check_fits(3).is_err());
    assert!(cfg.check_fits(10).is_ok());
}

#[test]
fn sliding_window_evaluator_end_to_end() {
    let (enc, ops) = build_encoder(Mode::Bipolar, 3, 1, 5);
    let data: Vec<Vec<f64>> = (0..18).map(|i| vec![if i < 9 { 0.1 } else { 0.9 }]).collect();
    let labels: Vec<i64> = (0..18).map(|i| if i < 9 { 0 } else { 1 }).collect();
    let mem = Trainer::train(&enc, &ops, &data, &labels, 2, false, 0.1).unwrap();
    let result = Evaluator::evaluate_sliding(&enc, &ops, &mem, &data, &labels, 2, 9).unwrap();
    assert_eq!(result.transition_error, 0);
    assert!(result.overall_accuracy > 0.5);
}
