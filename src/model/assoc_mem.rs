//! Associative memory: `K` class prototypes plus per-class counts — spec §4.F.

use tracing::warn;

use crate::error::VsaError;
use crate::vsa::ops::VsaOps;
use crate::vsa::{Dimension, HyperVec, Mode};

/// `proto[K]` / `count[K]`. Zero-initialized, populated by [`crate::model::Trainer`],
/// read-only during evaluation.
#[derive(Debug, Clone)]
pub struct AssocMem {
    dim: Dimension,
    mode: Mode,
    cut_angle_threshold: f32,
    proto: Vec<HyperVec>,
    count: Vec<u64>,
}

impl AssocMem {
    pub fn new(num_classes: usize, dim: Dimension, mode: Mode, cut_angle_threshold: f32) -> Self {
        Self {
            dim,
            mode,
            cut_angle_threshold,
            proto: (0..num_classes).map(|_| HyperVec::zero(dim, mode)).collect(),
            count: vec![0; num_classes],
        }
    }

    pub fn num_classes(&self) -> usize {
        self.proto.len()
    }

    pub fn dim(&self) -> Dimension {
        self.dim
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn count(&self, cls: usize) -> u64 {
        self.count[cls]
    }

    /// `add(hv, cls) -> accepted`.
    ///
    /// Bipolar: first sample of a class is adopted verbatim; subsequent
    /// samples are bundled in only if their similarity to the current
    /// prototype is below `CUT_ANGLE_THRESHOLD` (too-similar samples are
    /// skipped, not an error).
    ///
    /// Binary: majority-vote bundling cannot be done incrementally, so this
    /// path simply overwrites the "prototype" with the latest sample and
    /// resets count to 1 — bulk bundling across a whole class is the
    /// Trainer's job (`Trainer::train_bipolar`/`train_binary`).
    pub fn add(&mut self, ops: &VsaOps, hv: &HyperVec, cls: usize) -> Result<bool, VsaError> {
        match self.mode {
            Mode::Bipolar => {
                if self.count[cls] == 0 {
                    self.proto[cls] = hv.clone();
                    self.count[cls] = 1;
                    return Ok(true);
                }
                let sim = ops.similarity(&self.proto[cls], hv)?;
                if sim < self.cut_angle_threshold {
                    self.proto[cls] = ops.bundle(&self.proto[cls], hv)?;
                    self.count[cls] += 1;
                    Ok(true)
                } else {
                    warn!(class = cls, similarity = sim, "sample too similar to prototype, skipped");
                    Ok(false)
                }
            }
            Mode::Binary => {
                self.proto[cls] = hv.clone();
                self.count[cls] = 1;
                Ok(true)
            }
        }
    }

    /// Directly set a class prototype (used by bulk binary bundling in
    /// `Trainer`, where the whole class's windows are majority-voted at once
    /// rather than folded in one at a time).
    pub fn set_prototype(&mut self, cls: usize, hv: HyperVec, count: u64) {
        self.proto[cls] = hv;
        self.count[cls] = count;
    }

    pub fn get_class_vector(&self, cls: usize) -> &HyperVec {
        &self.proto[cls]
    }

    /// `classify(hv) -> argmax_c similarity(proto[c], hv)`, ties broken by
    /// lowest index.
    pub fn classify(&self, ops: &VsaOps, hv: &HyperVec) -> Result<usize, VsaError> {
        self.classify_with_confidence(ops, hv).map(|(cls, _)| cls)
    }

    /// `classify` plus the winning similarity, for evaluators that need a
    /// confidence score (the sliding-window evaluator's "highest
    /// similarity-confidence within the window" rule, spec §4.H).
    pub fn classify_with_confidence(&self, ops: &VsaOps, hv: &HyperVec) -> Result<(usize, f32), VsaError> {
        if self.proto.is_empty() || self.count.iter().all(|&c| c == 0) {
            return Err(VsaError::EmptyClassify);
        }
        let mut best_cls = 0usize;
        let mut best_sim = f32::NEG_INFINITY;
        for (cls, proto) in self.proto.iter().enumerate() {
            if self.count[cls] == 0 {
                continue;
            }
            let sim = ops.similarity(proto, hv)?;
            if sim > best_sim {
                best_sim = sim;
                best_cls = cls;
            }
        }
        Ok((best_cls, best_sim))
    }

    /// Bipolar only: divide each prototype element by its count, invoked
    /// once after training when `NORMALIZE` is set.
    pub fn normalize(&mut self) -> Result<(), VsaError> {
        if self.mode != Mode::Bipolar {
            return Ok(());
        }
        for (cls, proto) in self.proto.iter_mut().enumerate() {
            let n = self.count[cls];
            if n == 0 {
                continue;
            }
            if let HyperVec::Bipolar { vals, .. } = proto {
                for v in vals.iter_mut() {
                    *v = (*v as f64 / n as f64).round() as i32;
                }
            }
        }
        Ok(())
    }

    /// Average pairwise prototype similarity over nonempty classes — the
    /// `mean_inter_class_similarity` metric (spec §4.H) and one of the two
    /// GA objectives (spec §4.I).
    pub fn mean_inter_class_similarity(&self, ops: &VsaOps) -> Result<f32, VsaError> {
        let populated: Vec<usize> = (0..self.proto.len()).filter(|&c| self.count[c] > 0).collect();
        if populated.len() < 2 {
            return Ok(0.0);
        }
        let mut sum = 0.0f32;
        let mut pairs = 0usize;
        for i in 0..populated.len() {
            for j in (i + 1)..populated.len() {
                sum += ops.similarity(&self.proto[populated[i]], &self.proto[populated[j]])?;
                pairs += 1;
            }
        }
        Ok(sum / pairs as f32)
    }
}
