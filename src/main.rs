//! `hdc` CLI: a thin demonstration/inspection shell over the `hdc_classifier`
//! core (spec §1: dataset loading, partitioning, and result-CSV logging for
//! specific datasets are out of scope and stay external to this binary).

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand::Rng;
use tracing::info;

use hdc_classifier::config::{GaConfig, HdcConfig, SelectionMode as CfgSelectionMode};
use hdc_classifier::ga::{FitnessContext, GaOptimizer};
use hdc_classifier::io::csv as im_csv;
use hdc_classifier::io::StoreFormat;
use hdc_classifier::model::{Evaluator, Trainer};
use hdc_classifier::simd;
use hdc_classifier::vsa::encoder::Encoder;
use hdc_classifier::vsa::memory::{ContinuousItemMemory, ItemMemory};
use hdc_classifier::vsa::ops::VsaOps;
use hdc_classifier::vsa::{Dimension, Mode};

#[derive(Parser)]
#[command(name = "hdc", version, about = "HDC classifier core — inspection and demo CLI")]
struct Cli {
    /// Hypervector dimension (D).
    #[arg(long, global = true, default_value = "10000")]
    dimension: usize,

    /// Representation mode.
    #[arg(long, global = true, value_enum, default_value = "bipolar")]
    mode: ModeArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Binary,
    Bipolar,
}

impl From<ModeArg> for Mode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Binary => Mode::Binary,
            ModeArg::Bipolar => Mode::Bipolar,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreFormatArg {
    Elementwise,
    Packed,
}

impl From<StoreFormatArg> for StoreFormat {
    fn from(value: StoreFormatArg) -> Self {
        match value {
            StoreFormatArg::Elementwise => StoreFormat::Elementwise,
            StoreFormatArg::Packed => StoreFormat::PackedBitstring,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SelectionModeArg {
    Pareto,
    Multi,
    Accuracy,
}

impl From<SelectionModeArg> for CfgSelectionMode {
    fn from(value: SelectionModeArg) -> Self {
        match value {
            SelectionModeArg::Pareto => CfgSelectionMode::Pareto,
            SelectionModeArg::Multi => CfgSelectionMode::Multi,
            SelectionModeArg::Accuracy => CfgSelectionMode::Accuracy,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the default configuration, or validate one loaded from a TOML file.
    Config {
        /// Path to a TOML config to load and validate instead of printing the default.
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Build a random item memory and write it out as CSV.
    ItemMemory {
        /// Number of features (N).
        #[arg(long, default_value = "8")]
        features: usize,

        /// RNG seed.
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,

        #[arg(long, value_enum, default_value = "elementwise")]
        format: StoreFormatArg,
    },

    /// Build a continuous item memory (CiM) ladder from an explicit flip-count
    /// genome and write it out as CSV.
    Cim {
        /// Number of levels (L).
        #[arg(long, default_value = "21")]
        levels: usize,

        /// Flip budget K. Defaults to D (uniform full-budget ladder).
        #[arg(long)]
        budget: Option<usize>,

        /// RNG seed used to derive the level-0 permutation.
        #[arg(long, default_value = "0")]
        seed: u64,

        #[arg(long)]
        out: PathBuf,

        #[arg(long, value_enum, default_value = "elementwise")]
        format: StoreFormatArg,
    },

    /// Convert an item-memory CSV between elementwise and packed-bitstring form.
    Convert {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, value_enum)]
        from: StoreFormatArg,
        #[arg(long)]
        output: PathBuf,
        #[arg(long, value_enum)]
        to: StoreFormatArg,
        #[arg(long)]
        num_vectors: usize,
    },

    /// Run a self-contained train + evaluate demonstration over synthetically
    /// generated in-memory data (no dataset file format is read — spec §1).
    Demo {
        #[arg(long, default_value = "4")]
        features: usize,
        #[arg(long, default_value = "3")]
        classes: usize,
        #[arg(long, default_value = "5")]
        n_gram: usize,
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Run the genetic optimizer over a CiM flip-count genome, fitness scored
    /// by training+evaluating against synthetic data.
    Optimize {
        #[arg(long, default_value = "4")]
        features: usize,
        #[arg(long, default_value = "3")]
        classes: usize,
        #[arg(long, default_value = "9")]
        levels: usize,
        #[arg(long, default_value = "16")]
        population: usize,
        #[arg(long, default_value = "10")]
        generations: usize,
        #[arg(long, value_enum, default_value = "pareto")]
        selection: SelectionModeArg,
        #[arg(long, default_value = "0")]
        seed: u64,
    },
}

/// Synthetic two-cluster-per-class dataset, purely in-memory: class `c`'s
/// samples cluster around `c / (classes-1)` in every feature, perturbed by
/// small uniform noise. Stands in for the external dataset loader this core
/// deliberately does not own (spec §1).
fn synthetic_dataset(
    num_samples: usize,
    num_features: usize,
    num_classes: usize,
    rng: &mut impl Rng,
) -> (Vec<Vec<f64>>, Vec<i64>) {
    let mut data = Vec::with_capacity(num_samples);
    let mut labels = Vec::with_capacity(num_samples);
    for i in 0..num_samples {
        let cls = i % num_classes;
        let center = if num_classes > 1 {
            cls as f64 / (num_classes - 1) as f64
        } else {
            0.5
        };
        let sample: Vec<f64> = (0..num_features)
            .map(|_| (center + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0))
            .collect();
        data.push(sample);
        labels.push(cls as i64);
    }
    (data, labels)
}

fn build_encoder(
    cfg: &HdcConfig,
    ops: &VsaOps,
    rng: &mut impl Rng,
) -> Result<Encoder> {
    let dim = Dimension(cfg.dimension);
    let im = ItemMemory::random(cfg.num_features, dim, cfg.mode, ops, rng);
    let perm: Vec<usize> = identity_or_shuffled(dim.0, rng);
    let cims: Result<Vec<ContinuousItemMemory>, _> = (0..cfg.num_features)
        .map(|_| {
            let mut p = perm.clone();
            shuffle(&mut p, rng);
            ContinuousItemMemory::uniform_full_budget(dim, cfg.mode, cfg.num_levels, &p, ops)
        })
        .collect();
    let cims = cims.into_diagnostic()?;
    Encoder::with_im_cim(im, cims, cfg.min_level, cfg.max_level, cfg.n_gram_size).into_diagnostic()
}

fn identity_or_shuffled(n: usize, rng: &mut impl Rng) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    shuffle(&mut perm, rng);
    perm
}

fn shuffle(perm: &mut [usize], rng: &mut impl Rng) {
    for i in (1..perm.len()).rev() {
        let j = rng.gen_range(0..=i);
        perm.swap(i, j);
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let dim = Dimension(cli.dimension);
    let mode: Mode = cli.mode.into();

    match cli.command {
        Commands::Config { path } => {
            let cfg = match path {
                Some(p) => HdcConfig::load_toml(&p).into_diagnostic()?,
                None => HdcConfig::default(),
            };
            cfg.validate().into_diagnostic()?;
            println!("{}", toml::to_string_pretty(&cfg).into_diagnostic()?);
        }

        Commands::ItemMemory { features, seed, out, format } => {
            let ops = VsaOps::new(simd::best_kernel());
            let mut rng = StdRng::seed_from_u64(seed);
            let im = ItemMemory::random(features, dim, mode, &ops, &mut rng);
            let mut writer = BufWriter::new(File::create(&out).into_diagnostic()?);
            im_csv::write_vectors(&mut writer, im.vectors(), format.into()).into_diagnostic()?;
            info!(features, dim = dim.0, path = %out.display(), "wrote item memory");
        }

        Commands::Cim { levels, budget, seed, out, format } => {
            let ops = VsaOps::new(simd::best_kernel());
            let mut rng = StdRng::seed_from_u64(seed);
            let perm = identity_or_shuffled(dim.0, &mut rng);
            let budget = budget.unwrap_or(dim.0);
            let cim = ContinuousItemMemory::uniform(dim, mode, levels, budget, &perm, &ops)
                .into_diagnostic()?;
            let mut writer = BufWriter::new(File::create(&out).into_diagnostic()?);
            im_csv::write_vectors(&mut writer, cim.levels(), format.into()).into_diagnostic()?;
            info!(levels, budget, path = %out.display(), "wrote continuous item memory");
        }

        Commands::Convert { input, from, output, to, num_vectors } => {
            let reader = BufReader::new(File::open(&input).into_diagnostic()?);
            let (header, vectors) =
                im_csv::read_vectors(reader, dim, mode, from.into()).into_diagnostic()?;
            if vectors.len() != num_vectors {
                return Err(miette::miette!(
                    "expected {num_vectors} vectors, CSV had {}",
                    vectors.len()
                ));
            }
            let mut writer = BufWriter::new(File::create(&output).into_diagnostic()?);
            if let Some(fields) = header {
                im_csv::write_header(&mut writer, &fields).into_diagnostic()?;
            }
            im_csv::write_vectors(&mut writer, &vectors, to.into()).into_diagnostic()?;
        }

        Commands::Demo { features, classes, n_gram, seed } => {
            let mut cfg = HdcConfig::default();
            cfg.dimension = dim.0;
            cfg.num_features = features;
            cfg.num_classes = classes;
            cfg.n_gram_size = n_gram;
            cfg.mode = mode;
            cfg.min_level = 0.0;
            cfg.max_level = 1.0;
            cfg.validate().into_diagnostic()?;

            let ops = VsaOps::new(simd::best_kernel());
            let mut rng = StdRng::seed_from_u64(seed);
            let encoder = build_encoder(&cfg, &ops, &mut rng)?;
            cfg.check_fits(200).into_diagnostic()?;

            let (train_data, train_labels) = synthetic_dataset(200, features, classes, &mut rng);
            let (test_data, test_labels) = synthetic_dataset(60, features, classes, &mut rng);

            let mem = Trainer::train(
                &encoder,
                &ops,
                &train_data,
                &train_labels,
                classes,
                cfg.normalize,
                cfg.cut_angle_threshold,
            )
            .into_diagnostic()?;

            let result = Evaluator::evaluate_direct(&encoder, &ops, &mem, &test_data, &test_labels, classes)
                .into_diagnostic()?;

            println!("overall_accuracy: {:.4}", result.overall_accuracy);
            println!("class_average_accuracy: {:.4}", result.class_average_accuracy);
            println!("mean_inter_class_similarity: {:.4}", result.mean_inter_class_similarity);
            println!(
                "correct={} not_correct={} transition_error={} total={}",
                result.correct, result.not_correct, result.transition_error, result.total
            );
        }

        Commands::Optimize { features, classes, levels, population, generations, selection, seed } => {
            let ops = VsaOps::new(simd::best_kernel());
            let mut rng = StdRng::seed_from_u64(seed);

            let im = ItemMemory::random(features, dim, mode, &ops, &mut rng);
            let permutations: Vec<Vec<usize>> = (0..features)
                .map(|_| identity_or_shuffled(dim.0, &mut rng))
                .collect();

            let (train_data, train_labels) = synthetic_dataset(200, features, classes, &mut rng);
            let (eval_data, eval_labels) = synthetic_dataset(60, features, classes, &mut rng);

            let ctx = FitnessContext {
                dim,
                mode,
                num_levels: levels,
                min_level: 0.0,
                max_level: 1.0,
                n_gram_size: 1,
                num_classes: classes,
                normalize: mode == Mode::Bipolar,
                cut_angle_threshold: 0.1,
                precomputed_item_memory: false,
                im,
                permutations,
                train_data,
                train_labels,
                eval_data,
                eval_labels,
            };

            let ga_config = GaConfig {
                population_size: population,
                generations,
                crossover_rate: 0.7,
                mutation_rate: 0.1,
                tournament_size: 3.min(population).max(1),
                seed,
                max_flips_cim: dim.0,
                selection_mode: selection.into(),
                init_uniform: true,
            };

            let optimizer = GaOptimizer::new(ga_config);
            let result = optimizer.run(&ctx, levels - 1).into_diagnostic()?;

            println!("best_accuracy: {:.4}", result.best_accuracy);
            println!("best_similarity: {:.4}", result.best_similarity);
            println!("best_genome: {:?}", result.best_genome.genes());
            for gen in &result.history {
                println!(
                    "gen {:>3}: best_accuracy={:.4} best_similarity={:.4}",
                    gen.generation, gen.best_accuracy, gen.best_similarity
                );
            }
        }
    }

    Ok(())
}
