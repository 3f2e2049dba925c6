//! Evaluator: classify held-out samples, collect metrics — spec §4.H.

use tracing::info;

use crate::error::HdcResult;
use crate::vsa::encoder::Encoder;
use crate::vsa::ops::VsaOps;

use super::assoc_mem::AssocMem;

/// Metrics produced by any of the three evaluation modes.
///
/// `total` is each mode's own denominator for `overall_accuracy` (spec
/// property 10): the direct n-gram evaluator folds `transition_error` into
/// it (`total = correct + not_correct + transition_error`), while the
/// sliding-window and general evaluators never populate `transition_error`
/// (`total = correct + not_correct`) — a real, documented asymmetry in the
/// source spec, not an oversight.
#[derive(Debug, Clone)]
pub struct EvalResult {
    pub correct: u64,
    pub not_correct: u64,
    pub transition_error: u64,
    pub total: u64,
    pub overall_accuracy: f64,
    pub class_average_accuracy: f64,
    pub mean_inter_class_similarity: f32,
    /// `confusion[true_class][predicted_class]`.
    pub confusion: Vec<Vec<u64>>,
}

impl EvalResult {
    fn finish(
        correct: u64,
        not_correct: u64,
        transition_error: u64,
        total: u64,
        confusion: Vec<Vec<u64>>,
        mean_inter_class_similarity: f32,
    ) -> Self {
        let overall_accuracy = if total == 0 { 0.0 } else { correct as f64 / total as f64 };
        let mut class_accuracies = Vec::new();
        for (cls, row) in confusion.iter().enumerate() {
            let row_total: u64 = row.iter().sum();
            if row_total == 0 {
                continue;
            }
            class_accuracies.push(row[cls] as f64 / row_total as f64);
        }
        let class_average_accuracy = if class_accuracies.is_empty() {
            0.0
        } else {
            class_accuracies.iter().sum::<f64>() / class_accuracies.len() as f64
        };
        Self {
            correct,
            not_correct,
            transition_error,
            total,
            overall_accuracy,
            class_average_accuracy,
            mean_inter_class_similarity,
            confusion,
        }
    }
}

/// Plurality label of a label slice, ties broken by smallest label value.
fn plurality_label(labels: &[i64]) -> i64 {
    let mut counts: std::collections::BTreeMap<i64, usize> = std::collections::BTreeMap::new();
    for &l in labels {
        *counts.entry(l).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(label, _)| label)
        .expect("labels is nonempty")
}

pub struct Evaluator;

impl Evaluator {
    /// Direct n-gram mode: non-overlapping windows of `n`, plurality label
    /// per window, transition windows (`labels[j] != labels[j+n-1]`) that
    /// misclassify are counted as `transition_error` instead of `not_correct`.
    pub fn evaluate_direct(
        encoder: &Encoder,
        ops: &VsaOps,
        mem: &AssocMem,
        data: &[Vec<f64>],
        labels: &[i64],
        num_classes: usize,
    ) -> HdcResult<EvalResult> {
        let n = encoder.n_gram_size();
        let mut confusion = vec![vec![0u64; num_classes]; num_classes];
        let (mut correct, mut not_correct, mut transition_error) = (0u64, 0u64, 0u64);

        let t = data.len();
        let mut j = 0;
        while j + n <= t {
            let window_labels = &labels[j..j + n];
            let truth = plurality_label(window_labels) as usize;
            let hv = encoder.encode_timeseries(&data[j..j + n], ops)?;
            let predicted = mem.classify(ops, &hv)?;
            confusion[truth][predicted] += 1;
            let is_transition = window_labels[0] != window_labels[n - 1];
            if predicted == truth {
                correct += 1;
            } else if is_transition {
                transition_error += 1;
            } else {
                not_correct += 1;
            }
            j += n;
        }

        let total = correct + not_correct + transition_error;
        let mean_sim = mem.mean_inter_class_similarity(ops)?;
        let result = EvalResult::finish(correct, not_correct, transition_error, total, confusion, mean_sim);
        info!(
            correct = result.correct,
            not_correct = result.not_correct,
            transition_error = result.transition_error,
            accuracy = result.overall_accuracy,
            "direct n-gram evaluation complete"
        );
        Ok(result)
    }

    /// Sliding-window mode: over blocks of `window_size` samples, classify
    /// every n-gram inside the block (stride 1) and keep the class with the
    /// highest similarity-confidence; compare against the block's plurality
    /// label.
    pub fn evaluate_sliding(
        encoder: &Encoder,
        ops: &VsaOps,
        mem: &AssocMem,
        data: &[Vec<f64>],
        labels: &[i64],
        num_classes: usize,
        window_size: usize,
    ) -> HdcResult<EvalResult> {
        let n = encoder.n_gram_size();
        let mut confusion = vec![vec![0u64; num_classes]; num_classes];
        let (mut correct, mut not_correct) = (0u64, 0u64);

        let t = data.len();
        let mut block_start = 0;
        while block_start + window_size <= t {
            let block_labels = &labels[block_start..block_start + window_size];
            let truth = plurality_label(block_labels) as usize;

            let mut best_cls = 0usize;
            let mut best_conf = f32::NEG_INFINITY;
            let mut inner = block_start;
            while inner + n <= block_start + window_size {
                let hv = encoder.encode_timeseries(&data[inner..inner + n], ops)?;
                let (cls, conf) = mem.classify_with_confidence(ops, &hv)?;
                if conf > best_conf {
                    best_conf = conf;
                    best_cls = cls;
                }
                inner += 1;
            }

            confusion[truth][best_cls] += 1;
            if best_cls == truth {
                correct += 1;
            } else {
                not_correct += 1;
            }
            block_start += window_size;
        }

        let total = correct + not_correct;
        let mean_sim = mem.mean_inter_class_similarity(ops)?;
        let result = EvalResult::finish(correct, not_correct, 0, total, confusion, mean_sim);
        info!(
            correct = result.correct,
            not_correct = result.not_correct,
            accuracy = result.overall_accuracy,
            "sliding-window evaluation complete"
        );
        Ok(result)
    }

    /// General (non-temporal) mode: classify each row independently.
    pub fn evaluate_general(
        encoder: &Encoder,
        ops: &VsaOps,
        mem: &AssocMem,
        data: &[Vec<f64>],
        labels: &[i64],
        num_classes: usize,
    ) -> HdcResult<EvalResult> {
        let mut confusion = vec![vec![0u64; num_classes]; num_classes];
        let (mut correct, mut not_correct) = (0u64, 0u64);

        for (sample, &label) in data.iter().zip(labels) {
            let truth = label as usize;
            let hv = encoder.encode_timestamp(sample, ops)?;
            let predicted = mem.classify(ops, &hv)?;
            confusion[truth][predicted] += 1;
            if predicted == truth {
                correct += 1;
            } else {
                not_correct += 1;
            }
        }

        let total = correct + not_correct;
        let mean_sim = mem.mean_inter_class_similarity(ops)?;
        let result = EvalResult::finish(correct, not_correct, 0, total, confusion, mean_sim);
        info!(
            correct = result.correct,
            not_correct = result.not_correct,
            accuracy = result.overall_accuracy,
            "general evaluation complete"
        );
        Ok(result)
    }
}
