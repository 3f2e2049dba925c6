//! Rich diagnostic error types for the HDC classifier core.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so callers know exactly
//! what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the HDC classifier core.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum HdcError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Vsa(#[from] VsaError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ga(#[from] GaError),
}

// ---------------------------------------------------------------------------
// VSA / algebra errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum VsaError {
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(hdc::vsa::dim_mismatch),
        help(
            "All hypervectors in an operation must share the same dimension D. \
             Check that they were created from the same Dimension/Mode pair."
        )
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("mode mismatch: expected {expected}, got {actual}")]
    #[diagnostic(
        code(hdc::vsa::mode_mismatch),
        help("Binary and Bipolar hypervectors cannot be combined in one operation.")
    )]
    ModeMismatch { expected: String, actual: String },

    #[error("empty bundle: cannot bundle zero hypervectors")]
    #[diagnostic(
        code(hdc::vsa::empty_bundle),
        help("Provide at least one hypervector to bundle/bundle_multi.")
    )]
    EmptyBundle,

    #[error("classify called on an associative memory with no trained prototypes")]
    #[diagnostic(
        code(hdc::vsa::empty_classify),
        help("Train the AssocMem (or call Trainer::train*) before calling classify().")
    )]
    EmptyClassify,

    #[error("degenerate norm: similarity is undefined for a zero-norm bipolar vector")]
    #[diagnostic(
        code(hdc::vsa::degenerate_norm),
        help(
            "Cosine similarity requires both operands to have nonzero magnitude. \
             This can happen for an all-zero accumulator before any bundle() call."
        )
    )]
    DegenerateNorm,

    #[error("allocation failure: could not allocate a hypervector buffer of dimension {dim}")]
    #[diagnostic(
        code(hdc::vsa::alloc_failure),
        help("Retry with a smaller VECTOR_DIMENSION or GA_POPULATION_SIZE.")
    )]
    AllocFailure { dim: usize },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("NUM_LEVELS must be > 1, got {levels}")]
    #[diagnostic(
        code(hdc::config::too_few_levels),
        help("A continuous item memory needs at least two levels to form a ladder.")
    )]
    TooFewLevels { levels: usize },

    #[error("N_GRAM_SIZE ({n_gram}) exceeds the number of available timesteps ({total})")]
    #[diagnostic(
        code(hdc::config::ngram_exceeds_samples),
        help("Reduce N_GRAM_SIZE or supply a longer window of samples.")
    )]
    NgramExceedsSamples { n_gram: usize, total: usize },

    #[error("WINDOW ({window}) must be a positive multiple of N_GRAM_SIZE ({n_gram})")]
    #[diagnostic(
        code(hdc::config::invalid_sliding_window),
        help("Set WINDOW to cover at least one full n-gram.")
    )]
    InvalidSlidingWindow { window: usize, n_gram: usize },

    #[error("negative or out-of-range flip count at index {index}: {value}")]
    #[diagnostic(
        code(hdc::config::negative_gene),
        help("Every gene of a GA genome must lie in [0, D].")
    )]
    InvalidGene { index: usize, value: i64 },

    #[error("genome length {actual} does not match the expected layout length {expected}")]
    #[diagnostic(
        code(hdc::config::genome_layout_mismatch),
        help(
            "With PRECOMPUTED_ITEM_MEMORY off the genome has L-1 genes; \
             with it on (per-feature ladders) it has NUM_FEATURES*(L-1) genes."
        )
    )]
    GenomeLayoutMismatch { expected: usize, actual: usize },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(hdc::config::invalid), help("{message}"))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// I/O / CSV errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IoError {
    #[error("I/O error: {source}")]
    #[diagnostic(
        code(hdc::io::io),
        help("Check that the path exists and is readable/writable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("CSV row {row} has {actual} columns, expected {expected}")]
    #[diagnostic(
        code(hdc::io::column_mismatch),
        help("Every data row of an item-memory CSV must have exactly D elements.")
    )]
    ColumnCountMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("unparsable element {value:?} at row {row}, column {col}")]
    #[diagnostic(
        code(hdc::io::unparsable_element),
        help("Binary rows must contain only 0/1; bipolar rows only -1/1.")
    )]
    UnparsableElement {
        row: usize,
        col: usize,
        value: String,
    },

    #[error("malformed header: {message}")]
    #[diagnostic(
        code(hdc::io::malformed_header),
        help("The optional comment header must be `# key=value,key=value,...`.")
    )]
    MalformedHeader { message: String },

    #[error("binary snapshot decode error: {message}")]
    #[diagnostic(
        code(hdc::io::bincode_decode),
        help("The file was not written by a compatible version of this crate's binary format.")
    )]
    BincodeDecode { message: String },
}

// ---------------------------------------------------------------------------
// GA errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GaError {
    #[error("fitness evaluation failed for individual {index}: {source}")]
    #[diagnostic(
        code(hdc::ga::fitness_failed),
        help(
            "A fitness sub-evaluation (train+evaluate) aborted the generation. \
             The GA does not swallow sub-evaluation errors; fix the underlying \
             cause (usually a VsaError) and re-run."
        )
    )]
    FitnessFailed {
        index: usize,
        #[source]
        source: VsaError,
    },

    #[error("empty population: population_size must be > 0")]
    #[diagnostic(
        code(hdc::ga::empty_population),
        help("Set GA_POPULATION_SIZE to at least 1.")
    )]
    EmptyPopulation,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

/// Convenience alias for functions returning hdc-classifier results.
pub type HdcResult<T> = std::result::Result<T, HdcError>;
