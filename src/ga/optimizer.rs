//! GA optimizer: the generational loop with a `rayon` fan-out per
//! generation over independent fitness tasks — spec §4.I, §5.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{GaConfig, SelectionMode};
use crate::error::{GaError, HdcResult, VsaError};
use crate::model::{Evaluator, Trainer};
use crate::simd;
use crate::vsa::encoder::Encoder;
use crate::vsa::memory::{ContinuousItemMemory, ItemMemory, PrecomputedItemMemory};
use crate::vsa::ops::VsaOps;
use crate::vsa::{Dimension, Mode};

use super::genome::Genome;
use super::population::{select_survivors, tournament_select, Individual};

// Named RNG sub-streams: a single GA_SEED xor-mixed with fixed per-purpose
// constants, per spec §5's "determinism contract" and §9's redesign note on
// per-thread randomness. Each task gets a fresh kernel/ops instance (cheap,
// stateless) rather than sharing one across threads.
const INIT_TAG: u64 = 0x9E37_79B9_7F4A_7C15;
const SELECT_TAG: u64 = 0xC2B2_AE3D_27D4_EB4F;

fn sub_seed(seed: u64, tag: u64) -> u64 {
    seed ^ tag
}

/// Everything a fitness evaluation needs that stays fixed across the whole
/// GA run: the base item memory, per-feature permutations, quantizer
/// parameters, and the train/eval data splits. Immutable and shared
/// read-only across the `rayon` fan-out (spec §5's "shared resource policy").
pub struct FitnessContext {
    pub dim: Dimension,
    pub mode: Mode,
    pub num_levels: usize,
    pub min_level: f64,
    pub max_level: f64,
    pub n_gram_size: usize,
    pub num_classes: usize,
    pub normalize: bool,
    pub cut_angle_threshold: f32,
    pub precomputed_item_memory: bool,
    pub im: ItemMemory,
    /// One permutation per feature (even when `precomputed_item_memory` is
    /// off and every feature shares one ladder genome, each feature still
    /// gets its own permutation so per-feature CiMs don't collapse to
    /// identical ladders).
    pub permutations: Vec<Vec<usize>>,
    pub train_data: Vec<Vec<f64>>,
    pub train_labels: Vec<i64>,
    /// Validation or test split; falls back to the training split when absent
    /// (spec §4.I "Evaluator sub-routine").
    pub eval_data: Vec<Vec<f64>>,
    pub eval_labels: Vec<i64>,
}

impl FitnessContext {
    fn eval_split(&self) -> (&[Vec<f64>], &[i64]) {
        if self.eval_data.is_empty() {
            (&self.train_data, &self.train_labels)
        } else {
            (&self.eval_data, &self.eval_labels)
        }
    }

    fn num_features(&self) -> usize {
        self.im.len()
    }
}

/// Build the encoder for one genome, run a full train+evaluate pass, and
/// return `(accuracy, mean_inter_class_similarity)` — the fitness
/// sub-evaluator of spec §4.I.
fn evaluate_genome(ctx: &FitnessContext, genome: &Genome, ops: &VsaOps) -> Result<(f64, f32), VsaError> {
    let ladder_len = ctx.num_levels - 1;
    let num_features = ctx.num_features();

    let cims: Vec<ContinuousItemMemory> = (0..num_features)
        .map(|f| {
            let b = if ctx.precomputed_item_memory {
                genome.ladder(f, ladder_len)
            } else {
                genome.genes()
            };
            ContinuousItemMemory::from_b(ctx.dim, ctx.mode, b, &ctx.permutations[f], ops)
                .map_err(|e| to_vsa_error(e))
        })
        .collect::<Result<_, _>>()?;

    let encoder = if ctx.precomputed_item_memory {
        let pim =
            PrecomputedItemMemory::build(&ctx.im, &cims, ops).map_err(to_vsa_error)?;
        Encoder::with_precomputed(pim, ctx.min_level, ctx.max_level, ctx.n_gram_size)
            .map_err(to_vsa_error)?
    } else {
        Encoder::with_im_cim(ctx.im.clone(), cims, ctx.min_level, ctx.max_level, ctx.n_gram_size)
            .map_err(to_vsa_error)?
    };

    let mem = Trainer::train(
        &encoder,
        ops,
        &ctx.train_data,
        &ctx.train_labels,
        ctx.num_classes,
        ctx.normalize,
        ctx.cut_angle_threshold,
    )
    .map_err(to_vsa_error)?;

    let (eval_data, eval_labels) = ctx.eval_split();
    let result = Evaluator::evaluate_general(&encoder, ops, &mem, eval_data, eval_labels, ctx.num_classes)
        .map_err(to_vsa_error)?;

    Ok((result.overall_accuracy, result.mean_inter_class_similarity))
}

/// `HdcError` already wraps a `VsaError`, `ConfigError`, etc; fitness tasks
/// only ever need to report `VsaError` up through `GaError::FitnessFailed`,
/// so config-shaped failures (which can't arise from a GA-generated genome,
/// since genomes are always non-negative and length-checked at construction)
/// are folded into `VsaError::AllocFailure` as an unreachable-in-practice path.
fn to_vsa_error(err: crate::error::HdcError) -> VsaError {
    match err {
        crate::error::HdcError::Vsa(e) => e,
        _ => VsaError::AllocFailure { dim: 0 },
    }
}

pub struct GenerationSummary {
    pub generation: usize,
    pub best_accuracy: f64,
    pub best_similarity: f32,
}

pub struct GaResult {
    pub best_genome: Genome,
    pub best_accuracy: f64,
    pub best_similarity: f32,
    pub history: Vec<GenerationSummary>,
}

pub struct GaOptimizer {
    config: GaConfig,
}

impl GaOptimizer {
    pub fn new(config: GaConfig) -> Self {
        Self { config }
    }

    /// Run the full generational loop. `genome_len` is
    /// `HdcConfig::genome_len()` for the caller's memory layout.
    pub fn run(&self, ctx: &FitnessContext, genome_len: usize) -> HdcResult<GaResult> {
        if self.config.population_size == 0 {
            return Err(GaError::EmptyPopulation.into());
        }

        let mut rng_init = StdRng::seed_from_u64(sub_seed(self.config.seed, INIT_TAG));
        let genomes: Vec<Genome> = (0..self.config.population_size)
            .map(|_| {
                if self.config.init_uniform {
                    Genome::uniform_init(genome_len, self.config.max_flips_cim, &mut rng_init)
                } else {
                    Genome::equal_init(genome_len, self.config.max_flips_cim)
                }
            })
            .collect();

        let mut population = self.evaluate_population(ctx, genomes)?;
        let mut rng_select = StdRng::seed_from_u64(sub_seed(self.config.seed, SELECT_TAG));
        let mut history = Vec::with_capacity(self.config.generations);
        let mut best = best_individual(&population, self.config.selection_mode).clone();

        for generation in 0..self.config.generations {
            let offspring_genomes: Vec<Genome> = (0..self.config.population_size)
                .map(|_| {
                    let a = tournament_select(
                        &population,
                        self.config.tournament_size,
                        self.config.selection_mode,
                        &mut rng_select,
                    );
                    let b = tournament_select(
                        &population,
                        self.config.tournament_size,
                        self.config.selection_mode,
                        &mut rng_select,
                    );
                    let mut child = Genome::crossover(
                        &population[a].genome,
                        &population[b].genome,
                        self.config.crossover_rate,
                        &mut rng_select,
                    );
                    child.mutate(self.config.mutation_rate, &mut rng_select);
                    child
                })
                .collect();

            let offspring = self.evaluate_population(ctx, offspring_genomes)?;

            let merged: Vec<Individual> = population.into_iter().chain(offspring).collect();
            population = select_survivors(merged, self.config.population_size, self.config.selection_mode);

            let generation_best = best_individual(&population, self.config.selection_mode);
            if is_better(generation_best, &best, self.config.selection_mode) {
                best = generation_best.clone();
            }
            debug!(
                generation,
                best_accuracy = best.accuracy,
                best_similarity = best.similarity,
                "generation complete"
            );
            history.push(GenerationSummary {
                generation,
                best_accuracy: best.accuracy,
                best_similarity: best.similarity,
            });
        }

        info!(
            generations = self.config.generations,
            best_accuracy = best.accuracy,
            best_similarity = best.similarity,
            "GA run complete"
        );

        Ok(GaResult {
            best_genome: best.genome,
            best_accuracy: best.accuracy,
            best_similarity: best.similarity,
            history,
        })
    }

    /// Evaluate a batch of genomes in parallel (`rayon`), each task building
    /// its own `VsaOps`/kernel instance — stateless, so cheap to rebuild per
    /// task rather than sharing one across threads. A pre-sized result slot
    /// per individual means any completion order yields the same vector.
    fn evaluate_population(&self, ctx: &FitnessContext, genomes: Vec<Genome>) -> HdcResult<Vec<Individual>> {
        let results: Vec<Result<(f64, f32), VsaError>> = genomes
            .par_iter()
            .map(|genome| {
                let ops = VsaOps::new(simd::best_kernel());
                evaluate_genome(ctx, genome, &ops)
            })
            .collect();

        let mut individuals = Vec::with_capacity(genomes.len());
        for (index, (genome, result)) in genomes.into_iter().zip(results).enumerate() {
            match result {
                Ok((accuracy, similarity)) => individuals.push(Individual::new(genome, accuracy, similarity)),
                Err(source) => return Err(GaError::FitnessFailed { index, source }.into()),
            }
        }
        Ok(individuals)
    }
}

fn best_individual(population: &[Individual], mode: SelectionMode) -> &Individual {
    population
        .iter()
        .max_by(|a, b| match mode {
            SelectionMode::Pareto => {
                if a.rank != b.rank {
                    b.rank.cmp(&a.rank)
                } else {
                    a.crowding.partial_cmp(&b.crowding).unwrap()
                }
            }
            SelectionMode::Multi | SelectionMode::Accuracy => a
                .scalar_fitness(mode)
                .partial_cmp(&b.scalar_fitness(mode))
                .unwrap(),
        })
        .expect("population is nonempty")
}

fn is_better(candidate: &Individual, incumbent: &Individual, mode: SelectionMode) -> bool {
    match mode {
        SelectionMode::Pareto => {
            candidate.rank < incumbent.rank
                || (candidate.rank == incumbent.rank && candidate.crowding > incumbent.crowding)
        }
        SelectionMode::Multi | SelectionMode::Accuracy => {
            candidate.scalar_fitness(mode) > incumbent.scalar_fitness(mode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn synthetic_context(seed: u64) -> FitnessContext {
        let dim = Dimension(200);
        let ops = VsaOps::new(simd::best_kernel());
        let mut rng = StdRng::seed_from_u64(seed);
        let num_features = 2;
        let im = ItemMemory::random(num_features, dim, Mode::Bipolar, &ops, &mut rng);
        let permutations: Vec<Vec<usize>> = (0..num_features)
            .map(|_| {
                let mut perm: Vec<usize> = (0..dim.0).collect();
                for i in (1..perm.len()).rev() {
                    let j = rng.gen_range(0..=i);
                    perm.swap(i, j);
                }
                perm
            })
            .collect();

        let num_classes = 2;
        let train_data: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let base = if i < 10 { 0.1 } else { 0.8 };
                vec![base, base]
            })
            .collect();
        let train_labels: Vec<i64> = (0..20).map(|i| if i < 10 { 0 } else { 1 }).collect();

        FitnessContext {
            dim,
            mode: Mode::Bipolar,
            num_levels: 5,
            min_level: 0.0,
            max_level: 1.0,
            n_gram_size: 1,
            num_classes,
            normalize: false,
            cut_angle_threshold: 0.1,
            precomputed_item_memory: false,
            im,
            permutations,
            train_data: train_data.clone(),
            train_labels: train_labels.clone(),
            eval_data: train_data,
            eval_labels: train_labels,
        }
    }

    #[test]
    fn ga_run_improves_or_holds_best_accuracy_across_generations() {
        let ctx = synthetic_context(5);
        let config = GaConfig {
            population_size: 6,
            generations: 3,
            crossover_rate: 0.7,
            mutation_rate: 0.2,
            tournament_size: 2,
            seed: 42,
            max_flips_cim: dim_budget(&ctx),
            selection_mode: SelectionMode::Accuracy,
            init_uniform: true,
        };
        let optimizer = GaOptimizer::new(config);
        let result = optimizer.run(&ctx, ctx.num_levels - 1).unwrap();
        assert!(result.best_accuracy >= 0.0 && result.best_accuracy <= 1.0);
        assert_eq!(result.history.len(), 3);
        // Best-so-far is monotone non-decreasing by construction.
        for w in result.history.windows(2) {
            assert!(w[1].best_accuracy >= w[0].best_accuracy - 1e-9);
        }
    }

    fn dim_budget(ctx: &FitnessContext) -> usize {
        ctx.dim.0
    }

    #[test]
    fn ga_determinism_same_seed_same_winner() {
        let ctx = synthetic_context(9);
        let config = GaConfig {
            population_size: 4,
            generations: 2,
            crossover_rate: 0.6,
            mutation_rate: 0.3,
            tournament_size: 2,
            seed: 123,
            max_flips_cim: ctx.dim.0,
            selection_mode: SelectionMode::Pareto,
            init_uniform: true,
        };
        let a = GaOptimizer::new(config).run(&ctx, ctx.num_levels - 1).unwrap();
        let b = GaOptimizer::new(config).run(&ctx, ctx.num_levels - 1).unwrap();
        assert_eq!(a.best_genome.genes(), b.best_genome.genes());
        assert_eq!(a.best_accuracy, b.best_accuracy);
    }
}
