//! Item Memory (IM), Continuous Item Memory (CiM) and Precomputed Item
//! Memory (pIM) — spec §4.C/§4.D.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, HdcResult};

use super::ops::VsaOps;
use super::{Dimension, HyperVec, Mode};

/// Random HVs, one per feature index. No mutation after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemMemory {
    dim: Dimension,
    mode: Mode,
    vectors: Vec<HyperVec>,
}

impl ItemMemory {
    /// `IM::random(N, D, mode, rng)`.
    pub fn random(n: usize, dim: Dimension, mode: Mode, ops: &VsaOps, rng: &mut impl rand::Rng) -> Self {
        let vectors = (0..n).map(|_| ops.random(dim, mode, rng)).collect();
        Self { dim, mode, vectors }
    }

    pub fn from_vectors(dim: Dimension, mode: Mode, vectors: Vec<HyperVec>) -> Self {
        Self { dim, mode, vectors }
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// `IM[f] -> HV`, constant-time lookup.
    pub fn get(&self, f: usize) -> &HyperVec {
        &self.vectors[f]
    }

    pub fn vectors(&self) -> &[HyperVec] {
        &self.vectors
    }
}

/// FNV-1a over a permutation's indices — gives the CiM ladder's level-0
/// vector a seed that depends only on the permutation, so two calls with the
/// same permutation always produce byte-identical CiMs (spec §4.D, property 7).
fn seed_from_permutation(permutation: &[usize]) -> u64 {
    const OFFSET: u64 = 0xcbf29ce484222325;
    const PRIME: u64 = 0x100000001b3;
    let mut hash = OFFSET;
    for &idx in permutation {
        for byte in (idx as u64).to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(PRIME);
        }
    }
    hash
}

/// A monotone ladder of `L` hypervectors representing quantization levels.
///
/// Construction always goes through [`ContinuousItemMemory::from_b`]: given
/// an explicit flip-count vector `B` and permutation, the result is fully
/// determined (no internal guessing of the flip budget — spec §9's open
/// question on `K=D` vs `K=D/2` is resolved by requiring the caller to name
/// the budget explicitly, which the `uniform_*` convenience constructors do
/// in their own names).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinuousItemMemory {
    dim: Dimension,
    mode: Mode,
    levels: Vec<HyperVec>,
    b: Vec<usize>,
    permutation: Vec<usize>,
}

impl ContinuousItemMemory {
    /// B-driven construction (spec §4.D "B-driven"): `b` has length `L-1`,
    /// `permutation` is a permutation of `[0, D)`. Cumulative target
    /// `T_l = sum(b[..l])`, clamped to `D`; step `l`'s flips are
    /// `permutation[T_{l-1}..T_l]`.
    pub fn from_b(
        dim: Dimension,
        mode: Mode,
        b: &[usize],
        permutation: &[usize],
        ops: &VsaOps,
    ) -> HdcResult<Self> {
        let levels = b.len() + 1;
        if levels <= 1 {
            return Err(ConfigError::TooFewLevels { levels }.into());
        }
        if permutation.len() != dim.0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "CiM permutation length {} does not match dimension {}",
                    permutation.len(),
                    dim.0
                ),
            }
            .into());
        }

        let seed = seed_from_permutation(permutation);
        let mut rng = StdRng::seed_from_u64(seed);
        let level0 = ops.random(dim, mode, &mut rng);

        let mut ladder = Vec::with_capacity(levels);
        ladder.push(level0);
        let mut cumulative = 0usize;
        for &flips in b {
            let mut next = ladder.last().expect("level0 just pushed").clone();
            let end = (cumulative + flips).min(dim.0);
            for &idx in &permutation[cumulative..end] {
                next.flip_bit(idx);
            }
            cumulative = end;
            ladder.push(next);
        }

        Ok(Self {
            dim,
            mode,
            levels: ladder,
            b: b.to_vec(),
            permutation: permutation.to_vec(),
        })
    }

    /// Default uniform ladder with an explicit flip budget `K`: target
    /// cumulative flips at level `l` is `round(l*K/(L-1))`, giving an
    /// equidistant ladder in Hamming/sign-flip distance.
    pub fn uniform(
        dim: Dimension,
        mode: Mode,
        levels: usize,
        flip_budget: usize,
        permutation: &[usize],
        ops: &VsaOps,
    ) -> HdcResult<Self> {
        if levels <= 1 {
            return Err(ConfigError::TooFewLevels { levels }.into());
        }
        let mut b = Vec::with_capacity(levels - 1);
        let mut prev_target = 0i64;
        for l in 1..levels {
            let target = ((l as f64) * (flip_budget as f64) / ((levels - 1) as f64)).round() as i64;
            let target = target.clamp(0, flip_budget as i64);
            b.push((target - prev_target).max(0) as usize);
            prev_target = target;
        }
        Self::from_b(dim, mode, &b, permutation, ops)
    }

    /// Convenience constructor naming the `K=D` default explicitly.
    pub fn uniform_full_budget(
        dim: Dimension,
        mode: Mode,
        levels: usize,
        permutation: &[usize],
        ops: &VsaOps,
    ) -> HdcResult<Self> {
        Self::uniform(dim, mode, levels, dim.0, permutation, ops)
    }

    /// Convenience constructor naming the `K=D/2` default explicitly.
    pub fn uniform_half_budget(
        dim: Dimension,
        mode: Mode,
        levels: usize,
        permutation: &[usize],
        ops: &VsaOps,
    ) -> HdcResult<Self> {
        Self::uniform(dim, mode, levels, dim.0 / 2, permutation, ops)
    }

    /// Equal-distribution init (spec §4.I "Equal init"): `B_i = K/(L-1)`
    /// with boundary rounding that respects cumulative targets. Identical to
    /// `uniform` for the ladder itself; kept as a distinct named entry point
    /// so GA genome seeding (`GA_INIT_UNIFORM=0`) and plain CiM construction
    /// read the same way at call sites.
    pub fn equal(
        dim: Dimension,
        mode: Mode,
        levels: usize,
        flip_budget: usize,
        permutation: &[usize],
        ops: &VsaOps,
    ) -> HdcResult<Self> {
        Self::uniform(dim, mode, levels, flip_budget, permutation, ops)
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    pub fn b(&self) -> &[usize] {
        &self.b
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Constant-time level lookup.
    pub fn get(&self, level: usize) -> &HyperVec {
        &self.levels[level]
    }

    pub fn levels(&self) -> &[HyperVec] {
        &self.levels
    }

    /// Count of differing components between two ladder rungs — the
    /// Binary-mode Hamming distance, or its Bipolar-mode sign-disagreement
    /// analogue. Used to check the monotonicity invariant (spec property 6).
    pub fn disagreement(&self, i: usize, j: usize) -> usize {
        let a = &self.levels[i];
        let b = &self.levels[j];
        (0..self.dim.0).filter(|&k| a.get(k) != b.get(k)).count()
    }
}

/// `pIM[level, feature] = IM[feature] XOR CiM_feature[level]`, precomputed
/// so encoding a timestamp skips per-feature binding. Each feature has its
/// own independent ladder. When a pIM is used, IM and CiM are not consulted
/// (spec §3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecomputedItemMemory {
    dim: Dimension,
    mode: Mode,
    num_features: usize,
    num_levels: usize,
    /// Row-major, level-major: `row = level * num_features + feature`,
    /// matching the CSV layout of spec §6.
    vectors: Vec<HyperVec>,
}

impl PrecomputedItemMemory {
    /// Build from an IM and one independent CiM ladder per feature.
    pub fn build(im: &ItemMemory, cims: &[ContinuousItemMemory], ops: &VsaOps) -> HdcResult<Self> {
        let num_features = cims.len();
        if num_features == 0 {
            return Err(ConfigError::Invalid {
                message: "pIM requires at least one feature CiM".into(),
            }
            .into());
        }
        let num_levels = cims[0].num_levels();
        let dim = im.dim();
        let mode = im.mode();

        let mut vectors = Vec::with_capacity(num_levels * num_features);
        for level in 0..num_levels {
            for (f, cim) in cims.iter().enumerate() {
                let bound = ops.bind(im.get(f), cim.get(level))?;
                vectors.push(bound);
            }
        }

        Ok(Self {
            dim,
            mode,
            num_features,
            num_levels,
            vectors,
        })
    }

    pub fn from_rows(
        dim: Dimension,
        mode: Mode,
        num_features: usize,
        num_levels: usize,
        vectors: Vec<HyperVec>,
    ) -> Self {
        Self {
            dim,
            mode,
            num_features,
            num_levels,
            vectors,
        }
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    pub fn get(&self, level: usize, feature: usize) -> &HyperVec {
        &self.vectors[level * self.num_features + feature]
    }

    pub fn vectors(&self) -> &[HyperVec] {
        &self.vectors
    }
}
