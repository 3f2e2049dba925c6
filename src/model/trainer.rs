//! Trainer: iterate training samples, populate an [`AssocMem`] — spec §4.G.

use tracing::{debug, info};

use crate::error::HdcResult;
use crate::vsa::encoder::Encoder;
use crate::vsa::ops::VsaOps;
use crate::vsa::{HyperVec, Mode};

use super::assoc_mem::AssocMem;

/// A single labeled training sample row: `F` feature values plus a class label.
pub struct Sample<'a> {
    pub features: &'a [f64],
    pub label: i64,
}

pub struct Trainer;

impl Trainer {
    /// Temporal training: for `j in [0, T-n)`, encode window `[j..j+n)`; if
    /// the window's labels are stable, record it. Bipolar folds each window
    /// in incrementally via `AssocMem::add`; Binary collects windows per
    /// class and majority-votes each class's group in bulk at the end
    /// (majority vote is non-incremental).
    pub fn train(
        encoder: &Encoder,
        ops: &VsaOps,
        data: &[Vec<f64>],
        labels: &[i64],
        num_classes: usize,
        normalize: bool,
        cut_angle_threshold: f32,
    ) -> HdcResult<AssocMem> {
        let n = encoder.n_gram_size();
        let mut mem = AssocMem::new(num_classes, encoder.dim(), encoder.mode(), cut_angle_threshold);
        match encoder.mode() {
            Mode::Bipolar => Self::train_bipolar(encoder, ops, data, labels, n, &mut mem)?,
            Mode::Binary => Self::train_binary(encoder, ops, data, labels, n, num_classes, &mut mem)?,
        }
        if normalize {
            mem.normalize()?;
        }
        Ok(mem)
    }

    fn train_bipolar(
        encoder: &Encoder,
        ops: &VsaOps,
        data: &[Vec<f64>],
        labels: &[i64],
        n: usize,
        mem: &mut AssocMem,
    ) -> HdcResult<()> {
        let t = data.len();
        if t < n {
            return Ok(());
        }
        let mut accepted = 0usize;
        for j in 0..=(t - n) {
            let window_labels = &labels[j..j + n];
            if !Encoder::is_window_stable(window_labels) {
                continue;
            }
            let hv = encoder.encode_timeseries(&data[j..j + n], ops)?;
            if mem.add(ops, &hv, window_labels[0] as usize)? {
                accepted += 1;
            }
        }
        info!(accepted, total_windows = t.saturating_sub(n) + 1, "bipolar training pass complete");
        Ok(())
    }

    fn train_binary(
        encoder: &Encoder,
        ops: &VsaOps,
        data: &[Vec<f64>],
        labels: &[i64],
        n: usize,
        num_classes: usize,
        mem: &mut AssocMem,
    ) -> HdcResult<()> {
        let t = data.len();
        let mut groups: Vec<Vec<HyperVec>> = vec![Vec::new(); num_classes];
        if t >= n {
            let mut j = 0usize;
            while j <= t - n {
                let window_labels = &labels[j..j + n];
                if Encoder::is_window_stable(window_labels) {
                    let hv = encoder.encode_timeseries(&data[j..j + n], ops)?;
                    groups[window_labels[0] as usize].push(hv);
                    j += 1;
                } else {
                    // Can't become stable again until the boundary clears.
                    j += n - 1;
                }
            }
        }
        for (cls, group) in groups.into_iter().enumerate() {
            if group.is_empty() {
                continue;
            }
            let refs: Vec<&HyperVec> = group.iter().collect();
            let proto = ops.bundle_multi(&refs)?;
            debug!(class = cls, windows = refs.len(), "bulk-bundled class prototype");
            mem.set_prototype(cls, proto, refs.len() as u64);
        }
        Ok(())
    }

    /// `train_general`: no temporal context, each row encoded directly via
    /// `encode_timestamp` and added/grouped per the mode's own rule.
    pub fn train_general(
        encoder: &Encoder,
        ops: &VsaOps,
        data: &[Vec<f64>],
        labels: &[i64],
        num_classes: usize,
        normalize: bool,
        cut_angle_threshold: f32,
    ) -> HdcResult<AssocMem> {
        let mut mem = AssocMem::new(num_classes, encoder.dim(), encoder.mode(), cut_angle_threshold);
        match encoder.mode() {
            Mode::Bipolar => {
                for (sample, &label) in data.iter().zip(labels) {
                    let hv = encoder.encode_timestamp(sample, ops)?;
                    mem.add(ops, &hv, label as usize)?;
                }
            }
            Mode::Binary => {
                let mut groups: Vec<Vec<HyperVec>> = vec![Vec::new(); num_classes];
                for (sample, &label) in data.iter().zip(labels) {
                    let hv = encoder.encode_timestamp(sample, ops)?;
                    groups[label as usize].push(hv);
                }
                for (cls, group) in groups.into_iter().enumerate() {
                    if group.is_empty() {
                        continue;
                    }
                    let refs: Vec<&HyperVec> = group.iter().collect();
                    let proto = ops.bundle_multi(&refs)?;
                    mem.set_prototype(cls, proto, refs.len() as u64);
                }
            }
        }
        if normalize {
            mem.normalize()?;
        }
        Ok(mem)
    }
}
