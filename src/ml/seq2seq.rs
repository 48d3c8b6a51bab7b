// ============================================================
// Layer 5 — Seq2Seq Model Interface
// ============================================================
// The contract the training loop and the validation runner
// depend on. Any burn module implementing it can be trained:
//
//   forward        teacher-forced logits for a target prefix
//   greedy_decode  bounded autoregressive decoding + loss
//
// Train mode vs eval mode is the burn backend: the module on an
// AutodiffBackend trains (dropout active), `module.valid()` on
// the inner backend evaluates (dropout off, no graph).

use burn::{nn::loss::CrossEntropyLoss, prelude::*};

/// Result of a greedy decode over one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Mean per-step cross-entropy against the target,
    /// 0.0 when decoding without a reference
    pub loss: f64,

    /// Decoded target-vocabulary ids per example,
    /// without <s>, </s> or padding
    pub tokens: Vec<Vec<usize>>,
}

pub trait Seq2SeqModel<B: Backend> {
    /// source:        [batch, src_len]
    /// target_prefix: [batch, tgt_len]
    /// returns logits [batch, tgt_len, target_vocab]
    ///
    /// `questions` are the raw question strings of the batch, for
    /// models that embed text directly.
    fn forward(
        &self,
        questions:     &[String],
        source:        Tensor<B, 2, Int>,
        target_prefix: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3>;

    /// Decode greedily from <s> until </s> or the step bound.
    ///
    /// With `validation = true` the step bound is
    /// `max(target_lengths) - 1` and the loss is accumulated
    /// against `target`; otherwise the model's own maximum
    /// length bounds decoding.
    fn greedy_decode(
        &self,
        questions:      &[String],
        source:         Tensor<B, 2, Int>,
        target:         Tensor<B, 2, Int>,
        target_lengths: &[usize],
        criterion:      &CrossEntropyLoss<B>,
        validation:     bool,
    ) -> DecodeOutput;
}

/// Split a target batch for teacher forcing.
///
/// For a target of length T, the model reads timesteps 0..T-1
/// (dropping the last) and is scored against timesteps 1..T
/// (dropping <s>).
pub fn teacher_forcing_split<B: Backend>(
    target: Tensor<B, 2, Int>,
) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
    let [batch, len] = target.dims();
    let input  = target.clone().slice([0..batch, 0..len - 1]);
    let labels = target.slice([0..batch, 1..len]);
    (input, labels)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_teacher_forcing_shift_is_by_one() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([1, 5, 6, 2, 1, 7, 2, 0].as_slice(), &device)
            .reshape([2, 4]);

        let (input, labels) = teacher_forcing_split(target);

        assert_eq!(input.dims(), [2, 3]);
        assert_eq!(labels.dims(), [2, 3]);
        let input: Vec<i64>  = input.into_data().iter::<i64>().collect();
        let labels: Vec<i64> = labels.into_data().iter::<i64>().collect();
        assert_eq!(input,  vec![1, 5, 6, 1, 7, 2]);
        assert_eq!(labels, vec![5, 6, 2, 7, 2, 0]);
    }
}
