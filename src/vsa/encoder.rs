//! Encoder: map a sample (and a window of samples) to a single hypervector
//! — spec §4.E.

use std::collections::VecDeque;

use crate::error::{ConfigError, HdcResult};

use super::memory::{ContinuousItemMemory, ItemMemory, PrecomputedItemMemory};
use super::ops::VsaOps;
use super::{Dimension, HyperVec, Mode};

/// Which item memories back a given encoder: an explicit (IM, per-feature
/// CiM) pair, or a fused precomputed memory. When `Precomputed` is used, IM
/// and CiM are never consulted (spec §3 invariant).
pub enum Memories {
    ImCim {
        im: ItemMemory,
        cims: Vec<ContinuousItemMemory>,
    },
    Precomputed(PrecomputedItemMemory),
}

/// Encoder context: a bundle of memories plus derived parameters (N, L, D,
/// n-gram size, quantization range). Immutable once constructed.
pub struct Encoder {
    memories: Memories,
    num_features: usize,
    num_levels: usize,
    min_level: f64,
    max_level: f64,
    n_gram_size: usize,
    dim: Dimension,
    mode: Mode,
}

impl Encoder {
    /// Build an encoder over an explicit IM + per-feature CiM ladders.
    pub fn with_im_cim(
        im: ItemMemory,
        cims: Vec<ContinuousItemMemory>,
        min_level: f64,
        max_level: f64,
        n_gram_size: usize,
    ) -> HdcResult<Self> {
        if cims.len() != im.len() {
            return Err(ConfigError::Invalid {
                message: format!(
                    "CiM count {} does not match IM feature count {}",
                    cims.len(),
                    im.len()
                ),
            }
            .into());
        }
        if n_gram_size == 0 {
            return Err(ConfigError::Invalid {
                message: "N_GRAM_SIZE must be >= 1".into(),
            }
            .into());
        }
        let num_levels = cims.first().map(|c| c.num_levels()).unwrap_or(0);
        for c in &cims {
            if c.num_levels() != num_levels {
                return Err(ConfigError::Invalid {
                    message: "all per-feature CiM ladders must share the same NUM_LEVELS".into(),
                }
                .into());
            }
        }
        Ok(Self {
            num_features: im.len(),
            num_levels,
            min_level,
            max_level,
            n_gram_size,
            dim: im.dim(),
            mode: im.mode(),
            memories: Memories::ImCim { im, cims },
        })
    }

    /// Build an encoder over a fused precomputed item memory.
    pub fn with_precomputed(
        pim: PrecomputedItemMemory,
        min_level: f64,
        max_level: f64,
        n_gram_size: usize,
    ) -> HdcResult<Self> {
        if n_gram_size == 0 {
            return Err(ConfigError::Invalid {
                message: "N_GRAM_SIZE must be >= 1".into(),
            }
            .into());
        }
        Ok(Self {
            num_features: pim.num_features(),
            num_levels: pim.num_levels(),
            min_level,
            max_level,
            n_gram_size,
            dim: pim.dim(),
            mode: pim.mode(),
            memories: Memories::Precomputed(pim),
        })
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

    pub fn n_gram_size(&self) -> usize {
        self.n_gram_size
    }

    /// `quantize(x, MIN_LEVEL, MAX_LEVEL, L) -> l in [0, L)`. Inclusive at
    /// both `MIN_LEVEL` and `MAX_LEVEL`; values beyond the range clamp to
    /// the nearest end rather than extrapolating out of bounds.
    pub fn quantize(&self, x: f64) -> usize {
        if x <= self.min_level {
            return 0;
        }
        if x >= self.max_level {
            return self.num_levels - 1;
        }
        let frac = (x - self.min_level) / (self.max_level - self.min_level);
        (frac * (self.num_levels - 1) as f64).floor() as usize
    }

    /// `encode_timestamp(sample[F]) -> HV`: quantize each feature, fetch its
    /// (possibly precomputed) bound vector, bundle all F together.
    pub fn encode_timestamp(&self, sample: &[f64], ops: &VsaOps) -> HdcResult<HyperVec> {
        if sample.len() != self.num_features {
            return Err(ConfigError::Invalid {
                message: format!(
                    "sample has {} features, encoder expects {}",
                    sample.len(),
                    self.num_features
                ),
            }
            .into());
        }
        let mut parts = Vec::with_capacity(self.num_features);
        for (f, &x) in sample.iter().enumerate() {
            let level = self.quantize(x);
            let hv = match &self.memories {
                Memories::Precomputed(pim) => pim.get(level, f).clone(),
                Memories::ImCim { im, cims } => ops.bind(im.get(f), cims[f].get(level))?,
            };
            parts.push(hv);
        }
        let refs: Vec<&HyperVec> = parts.iter().collect();
        Ok(ops.bundle_multi(&refs)?)
    }

    /// `encode_timeseries(window[n][F]) -> HV`: n-gram encoding.
    /// `r <- encode_timestamp(window[0])`; for `i in [1,n)`,
    /// `r <- bind(permute(r,1), encode_timestamp(window[i]))`.
    pub fn encode_timeseries(&self, window: &[Vec<f64>], ops: &VsaOps) -> HdcResult<HyperVec> {
        if window.len() != self.n_gram_size {
            return Err(ConfigError::Invalid {
                message: format!(
                    "window has {} timestamps, encoder N_GRAM_SIZE is {}",
                    window.len(),
                    self.n_gram_size
                ),
            }
            .into());
        }
        let mut r = self.encode_timestamp(&window[0], ops)?;
        for sample in &window[1..] {
            let rotated = ops.permute(&r, 1);
            let ts = self.encode_timestamp(sample, ops)?;
            r = ops.bind(&rotated, &ts)?;
        }
        Ok(r)
    }

    /// `is_window_stable(labels[n]) -> bool`: `labels[0] == labels[n-1]`.
    /// The encoder itself never consults labels — this is a pure predicate
    /// the Trainer uses to decide whether to record a window.
    pub fn is_window_stable(labels: &[i64]) -> bool {
        match (labels.first(), labels.last()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// A fresh rolling encoder over this context's n-gram size.
    pub fn rolling(&self) -> RollingEncoder {
        RollingEncoder::new(self.n_gram_size)
    }
}

/// Sliding-window encoder: maintains a ring of the last `n` raw per-timestamp
/// hypervectors and updates the combined n-gram HV incrementally — one XOR
/// in for the newly arriving rotated vector, one XOR out for the vector
/// leaving the window — instead of recomputing the full n-ary bind each
/// step. Produces one HV per input sample after an `n-1`-sample warm-up.
pub struct RollingEncoder {
    n: usize,
    samples: VecDeque<HyperVec>,
    r: Option<HyperVec>,
}

impl RollingEncoder {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            samples: VecDeque::with_capacity(n),
            r: None,
        }
    }

    /// Feed one freshly-encoded timestamp HV. Returns `None` during warm-up
    /// (fewer than `n` samples seen so far), `Some(window HV)` once warmed up.
    pub fn push(&mut self, ops: &VsaOps, spatial: HyperVec) -> HdcResult<Option<HyperVec>> {
        if self.samples.len() < self.n {
            self.samples.push_back(spatial);
            if self.samples.len() < self.n {
                return Ok(None);
            }
            let mut r = self.samples[0].clone();
            for sample in self.samples.iter().skip(1) {
                let rotated = ops.permute(&r, 1);
                r = ops.bind(&rotated, sample)?;
            }
            self.r = Some(r.clone());
            return Ok(Some(r));
        }

        let leaving = self.samples.pop_front().expect("window is full");
        self.samples.push_back(spatial.clone());
        let r_old = self.r.take().expect("warmed up implies Some(r)");
        let rotated = ops.permute(&r_old, 1);
        let leaving_rotated = ops.permute(&leaving, self.n as i64);
        let without_leaving = ops.bind(&rotated, &leaving_rotated)?;
        let r_new = ops.bind(&without_leaving, &spatial)?;
        self.r = Some(r_new.clone());
        Ok(Some(r_new))
    }
}
