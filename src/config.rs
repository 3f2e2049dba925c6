//! `HdcConfig`: every knob enumerated in spec §6, with `validate()` and
//! TOML-backed load/save (teacher's `workspace.rs`/`seeds/mod.rs` idiom of
//! `toml::from_str`/`toml::to_string_pretty` over a `serde`-derived struct).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IoError};
use crate::vsa::Mode;

/// GA selection strategy (spec §4.I).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SelectionMode {
    /// NSGA-II: non-dominated sort + crowding distance over (accuracy, -similarity).
    Pareto,
    /// Scalar fitness = accuracy - similarity, generational replacement.
    Multi,
    /// Scalar fitness = accuracy only.
    Accuracy,
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Pareto
    }
}

/// GA knobs (spec §6 `GA_*` rows).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaConfig {
    pub population_size: usize,
    pub generations: usize,
    pub crossover_rate: f64,
    pub mutation_rate: f64,
    pub tournament_size: usize,
    pub seed: u64,
    /// Flip budget `K` per ladder (`GA_MAX_FLIPS_CIM`).
    pub max_flips_cim: usize,
    pub selection_mode: SelectionMode,
    /// `true` = random (`GA_INIT_UNIFORM=1`), `false` = equal-distribution init.
    pub init_uniform: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 32,
            generations: 20,
            crossover_rate: 0.7,
            mutation_rate: 0.05,
            tournament_size: 3,
            seed: 0,
            max_flips_cim: 10_000,
            selection_mode: SelectionMode::Pareto,
            init_uniform: true,
        }
    }
}

impl GaConfig {
    pub fn validate(&self, dimension: usize) -> Result<(), ConfigError> {
        if self.population_size == 0 {
            return Err(ConfigError::Invalid {
                message: "GA_POPULATION_SIZE must be > 0".into(),
            });
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(ConfigError::Invalid {
                message: format!(
                    "GA_TOURNAMENT_SIZE ({}) must be in [1, GA_POPULATION_SIZE={}]",
                    self.tournament_size, self.population_size
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(ConfigError::Invalid {
                message: format!("GA_CROSSOVER_RATE must be in [0,1], got {}", self.crossover_rate),
            });
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(ConfigError::Invalid {
                message: format!("GA_MUTATION_RATE must be in [0,1], got {}", self.mutation_rate),
            });
        }
        if self.max_flips_cim > dimension {
            return Err(ConfigError::Invalid {
                message: format!(
                    "GA_MAX_FLIPS_CIM ({}) must not exceed VECTOR_DIMENSION ({})",
                    self.max_flips_cim, dimension
                ),
            });
        }
        Ok(())
    }
}

/// Every recognized configuration knob from spec §6, minus the
/// collaborator-owned `DOWNSAMPLE`/`VALIDATION_RATIO` (§1 non-goals: dataset
/// partitioning/down-sampling stay external, and §9's open question on them
/// is resolved by the core simply never seeing those knobs).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HdcConfig {
    /// D: hypervector length.
    pub dimension: usize,
    /// F: input channels.
    pub num_features: usize,
    /// K: class count.
    pub num_classes: usize,
    /// L: CiM level count.
    pub num_levels: usize,
    pub min_level: f64,
    pub max_level: f64,
    /// n: temporal window size.
    pub n_gram_size: usize,
    /// Sliding-window evaluator size; must be a positive multiple of `n_gram_size`.
    pub window: usize,
    /// BIPOLAR_MODE: Binary (0) or Bipolar (1) representation.
    pub mode: Mode,
    /// Post-train divide each prototype by its count (Bipolar only).
    pub normalize: bool,
    /// Bipolar `AssocMem::add` skip threshold.
    pub cut_angle_threshold: f32,
    pub precomputed_item_memory: bool,
    pub use_genetic_item_memory: bool,
    pub ga: GaConfig,
}

impl Default for HdcConfig {
    fn default() -> Self {
        Self {
            dimension: 10_000,
            num_features: 8,
            num_classes: 4,
            num_levels: 21,
            min_level: -1.0,
            max_level: 1.0,
            n_gram_size: 5,
            window: 25,
            mode: Mode::Bipolar,
            normalize: true,
            cut_angle_threshold: 0.1,
            precomputed_item_memory: false,
            use_genetic_item_memory: false,
            ga: GaConfig::default(),
        }
    }
}

impl HdcConfig {
    /// Validate every knob that doesn't require runtime data to check
    /// (`n_gram_size <= T` needs the training/eval data length and is
    /// checked by `Trainer`/`Evaluator` instead).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dimension == 0 || self.num_features == 0 || self.num_classes == 0 {
            return Err(ConfigError::Invalid {
                message: "VECTOR_DIMENSION, NUM_FEATURES and NUM_CLASSES must all be > 0".into(),
            });
        }
        if self.num_levels <= 1 {
            return Err(ConfigError::TooFewLevels {
                levels: self.num_levels,
            });
        }
        if self.n_gram_size == 0 {
            return Err(ConfigError::Invalid {
                message: "N_GRAM_SIZE must be > 0".into(),
            });
        }
        if self.window == 0 || self.window % self.n_gram_size != 0 {
            return Err(ConfigError::InvalidSlidingWindow {
                window: self.window,
                n_gram: self.n_gram_size,
            });
        }
        if !(-1.0..=1.0).contains(&self.cut_angle_threshold) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "CUT_ANGLE_THRESHOLD must be in [-1,1], got {}",
                    self.cut_angle_threshold
                ),
            });
        }
        if self.min_level >= self.max_level {
            return Err(ConfigError::Invalid {
                message: format!(
                    "MIN_LEVEL ({}) must be < MAX_LEVEL ({})",
                    self.min_level, self.max_level
                ),
            });
        }
        self.ga.validate(self.dimension)?;
        Ok(())
    }

    /// Length of a GA genome under this config's memory layout: a single
    /// ladder (`L-1` genes) or one ladder per feature (`F*(L-1)` genes) when
    /// `precomputed_item_memory` is set — the two "GA individual" layouts
    /// named in spec §3.
    pub fn genome_len(&self) -> usize {
        let per_ladder = self.num_levels - 1;
        if self.precomputed_item_memory {
            self.num_features * per_ladder
        } else {
            per_ladder
        }
    }

    pub fn check_genome_len(&self, actual: usize) -> Result<(), ConfigError> {
        let expected = self.genome_len();
        if actual != expected {
            return Err(ConfigError::GenomeLayoutMismatch { expected, actual });
        }
        Ok(())
    }

    /// Check that an n-gram of `n_gram_size` fits within `total_timesteps`
    /// samples (spec §6/§9; this is the one knob-vs-data check that can't be
    /// done in `validate()` alone).
    pub fn check_fits(&self, total_timesteps: usize) -> Result<(), ConfigError> {
        if self.n_gram_size > total_timesteps {
            return Err(ConfigError::NgramExceedsSamples {
                n_gram: self.n_gram_size,
                total: total_timesteps,
            });
        }
        Ok(())
    }

    pub fn load_toml(path: &Path) -> Result<Self, IoError> {
        let text = std::fs::read_to_string(path).map_err(|source| IoError::Io { source })?;
        toml::from_str(&text).map_err(|e| IoError::MalformedHeader {
            message: e.to_string(),
        })
    }

    pub fn save_toml(&self, path: &Path) -> Result<(), IoError> {
        let text = toml::to_string_pretty(self).expect("HdcConfig serializes infallibly");
        std::fs::write(path, text).map_err(|source| IoError::Io { source })
    }
}
