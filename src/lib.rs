// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # hdc-classifier
//!
//! A hyperdimensional-computing (HDC) classifier core for multi-channel
//! time-series signals (e.g. sEMG gesture/movement streams).
//!
//! ## Architecture
//!
//! - **VSA core** (`vsa`): hypervectors, bind/bundle/permute/similarity,
//!   item memories, and the n-gram encoder over configurable-dimension
//!   Binary/Bipolar representations.
//! - **SIMD acceleration** (`simd`): runtime-dispatched AVX2/generic kernels.
//! - **Classification model** (`model`): associative memory, trainer,
//!   evaluator.
//! - **Genetic optimizer** (`ga`): evolves continuous-item-memory flip-count
//!   genomes against a train+evaluate fitness loop.
//! - **I/O** (`io`): item-memory CSV/binary round-trip, predicted-labels
//!   side channel.
//!
//! ## Library usage
//!
//! ```no_run
//! use hdc_classifier::simd;
//! use hdc_classifier::vsa::ops::VsaOps;
//! use hdc_classifier::vsa::{Dimension, Mode};
//! use rand::SeedableRng;
//!
//! let ops = VsaOps::new(simd::best_kernel());
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let a = ops.random(Dimension::TEST, Mode::Bipolar, &mut rng);
//! let b = ops.random(Dimension::TEST, Mode::Bipolar, &mut rng);
//! let bound = ops.bind(&a, &b).unwrap();
//! assert!(ops.similarity(&bound, &a).unwrap() < 0.5);
//! ```

pub mod config;
pub mod error;
pub mod ga;
pub mod io;
pub mod model;
pub mod simd;
pub mod vsa;
