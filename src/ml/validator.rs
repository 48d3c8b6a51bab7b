// ============================================================
// Layer 5 — Validation Runner
// ============================================================
// Runs an eval-mode model over a stream of batches, decodes
// greedily and scores every decoded equation:
//
//   for each batch
//     encode questions (source side) and equations (target side)
//     greedy_decode(validation = true) → loss + token ids
//     ids → words with the target vocabulary
//     cal_score against the batch numbers and answers
//
// Accuracy is total correct / total attempted over the whole
// stream, so it does not depend on how examples were batched.
//
// Two result shapes:
//   Train mode → (bleu, mean loss, accuracy) for the epoch report
//   Test mode  → (mean score, one ResultRecord per example)

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*};
use thiserror::Error;

use crate::data::batcher::ProblemBatch;
use crate::data::vocab::{process_batch, sents_to_idx, SequenceSide, Vocabularies};
use crate::domain::result_record::ResultRecord;
use crate::domain::score::{cal_score, score_one, ScoreSummary};
use crate::ml::seq2seq::Seq2SeqModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Train,
    Test,
}

#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub max_length:   usize,
    pub mode:         ValidationMode,
    /// Log prediction, reference and verdict for every example
    pub show_outputs: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Epoch {
        /// Interface slot, always 0.0
        bleu:     f64,
        loss:     f64,
        accuracy: f64,
    },
    Test {
        mean_score: f64,
        records:    Vec<ResultRecord>,
    },
}

impl ValidationOutcome {
    pub fn accuracy(&self) -> f64 {
        match self {
            Self::Epoch { accuracy, .. } => *accuracy,
            Self::Test { mean_score, .. } => *mean_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("validation data contained no scoreable examples")]
    NoScoreableExamples,
}

pub fn run_validation<B, M, I>(
    model:   &M,
    batches: I,
    vocabs:  &Vocabularies,
    device:  &B::Device,
    opts:    &ValidationOptions,
) -> Result<ValidationOutcome, ValidationError>
where
    B: Backend,
    M: Seq2SeqModel<B>,
    I: IntoIterator<Item = ProblemBatch>,
{
    let criterion = CrossEntropyLossConfig::new().init(device);

    let mut summary  = ScoreSummary::default();
    let mut loss_sum = 0.0f64;
    let mut batch_n  = 0usize;
    let mut records  = Vec::new();

    for batch in batches {
        if batch.is_empty() {
            continue;
        }

        let src = sents_to_idx(&vocabs.voc1, &batch.questions, opts.max_length, SequenceSide::Source);
        let tgt = sents_to_idx(&vocabs.voc2, &batch.equations, opts.max_length, SequenceSide::Target);
        let enc = process_batch::<B>(&src, &tgt, device);

        let out = model.greedy_decode(
            &batch.questions,
            enc.source,
            enc.target,
            &enc.target_lengths,
            &criterion,
            true,
        );
        loss_sum += out.loss;
        batch_n  += 1;

        let decoded: Vec<Vec<String>> = out
            .tokens
            .iter()
            .map(|ids| vocabs.voc2.ids_to_words(ids))
            .collect();

        let scored = cal_score(&decoded, &batch.numbers, &batch.answers);

        for (i, flag) in scored.flags.iter().enumerate() {
            let generated = decoded[i].join(" ");
            if opts.show_outputs {
                tracing::info!(
                    "[{}] pred: {} | true: {} | result: {}",
                    batch.names[i], generated, batch.equations[i], flag,
                );
            }
            if opts.mode == ValidationMode::Test {
                let solved = score_one(&decoded[i], &batch.numbers[i], batch.answers[i]);
                records.push(ResultRecord {
                    question:           batch.questions[i].clone(),
                    actual_equation:    batch.equations[i].clone(),
                    generated_equation: generated,
                    score:              u8::from(solved),
                });
            }
        }

        tracing::debug!("Validated batch {}: {}/{} correct", batch_n, scored.correct, scored.total);
        summary.merge(scored);
    }

    let accuracy = summary.accuracy().ok_or(ValidationError::NoScoreableExamples)?;

    Ok(match opts.mode {
        ValidationMode::Train => ValidationOutcome::Epoch {
            bleu: 0.0,
            loss: loss_sum / batch_n as f64,
            accuracy,
        },
        ValidationMode::Test => ValidationOutcome::Test { mean_score: accuracy, records },
    })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::loss::CrossEntropyLoss;

    use crate::data::vocab::{Vocabulary, EOS_ID};
    use crate::domain::problem::MathProblem;
    use crate::ml::seq2seq::DecodeOutput;

    type TestBackend = NdArray;

    /// Decodes exactly the reference equation.
    struct Oracle;

    impl Seq2SeqModel<TestBackend> for Oracle {
        fn forward(
            &self,
            _questions:    &[String],
            _source:       Tensor<TestBackend, 2, Int>,
            target_prefix: Tensor<TestBackend, 2, Int>,
        ) -> Tensor<TestBackend, 3> {
            let [b, t] = target_prefix.dims();
            Tensor::zeros([b, t, 4], &target_prefix.device())
        }

        fn greedy_decode(
            &self,
            _questions:      &[String],
            _source:         Tensor<TestBackend, 2, Int>,
            target:          Tensor<TestBackend, 2, Int>,
            _target_lengths: &[usize],
            _criterion:      &CrossEntropyLoss<TestBackend>,
            _validation:     bool,
        ) -> DecodeOutput {
            let [_, len] = target.dims();
            let ids: Vec<usize> = target.into_data().iter::<i64>().map(|i| i as usize).collect();
            let tokens = ids
                .chunks(len)
                .map(|row| row.iter().skip(1).take_while(|&&id| id != EOS_ID).copied().collect())
                .collect();
            DecodeOutput { loss: 0.5, tokens }
        }
    }

    fn problems() -> Vec<MathProblem> {
        vec![
            MathProblem::new("a has N0 and N1", "N0 + N1", vec![3.0, 4.0], 7.0, "p0"),
            MathProblem::new("b has N0 and N1", "N0 * N1", vec![3.0, 4.0], 12.0, "p1"),
            MathProblem::new("c has N0 and N1", "N0 - N1", vec![9.0, 4.0], 5.0, "p2"),
            // mislabelled: the reference equation does not give the answer
            MathProblem::new("d has N0 and N1", "N0 / N1", vec![8.0, 4.0], 3.0, "p3"),
        ]
    }

    fn vocabs(ps: &[MathProblem]) -> Vocabularies {
        Vocabularies::new(
            Vocabulary::build(ps.iter().map(|p| p.question.as_str())),
            Vocabulary::build(ps.iter().map(|p| p.equation.as_str())),
        )
    }

    fn opts(mode: ValidationMode) -> ValidationOptions {
        ValidationOptions { max_length: 10, mode, show_outputs: false }
    }

    fn batched(ps: &[MathProblem], size: usize) -> Vec<ProblemBatch> {
        ps.chunks(size).map(|c| c.iter().cloned().collect()).collect()
    }

    #[test]
    fn test_accuracy_is_invariant_to_batching() {
        let ps     = problems();
        let vocabs = vocabs(&ps);
        let device = Default::default();

        let mut reversed = ps.clone();
        reversed.reverse();

        for batches in [batched(&ps, 1), batched(&ps, 3), batched(&ps, 4), batched(&reversed, 2)] {
            let out = run_validation::<TestBackend, _, _>(&Oracle, batches, &vocabs, &device, &opts(ValidationMode::Train))
                .unwrap();
            assert_eq!(out.accuracy(), 0.75);
        }
    }

    #[test]
    fn test_epoch_outcome_reports_mean_loss_and_zero_bleu() {
        let ps  = problems();
        let out = run_validation::<TestBackend, _, _>(
            &Oracle, batched(&ps, 2), &vocabs(&ps), &Default::default(), &opts(ValidationMode::Train),
        )
        .unwrap();
        assert_eq!(out, ValidationOutcome::Epoch { bleu: 0.0, loss: 0.5, accuracy: 0.75 });
    }

    #[test]
    fn test_empty_data_is_a_distinct_error() {
        let ps  = problems();
        let err = run_validation::<TestBackend, _, _>(
            &Oracle, Vec::new(), &vocabs(&ps), &Default::default(), &opts(ValidationMode::Train),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NoScoreableExamples);
    }

    #[test]
    fn test_test_mode_builds_one_record_per_example() {
        let ps  = problems();
        let out = run_validation::<TestBackend, _, _>(
            &Oracle, batched(&ps, 3), &vocabs(&ps), &Default::default(), &opts(ValidationMode::Test),
        )
        .unwrap();

        let ValidationOutcome::Test { mean_score, records } = out else {
            panic!("expected a test outcome");
        };
        assert_eq!(mean_score, 0.75);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].generated_equation, "N0 + N1");
        assert_eq!(records[0].question, "a has N0 and N1");
        let scores: Vec<u8> = records.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![1, 1, 1, 0]);
    }

    #[test]
    fn test_record_scores_agree_with_single_example_scorer() {
        let ps  = problems();
        let out = run_validation::<TestBackend, _, _>(
            &Oracle, batched(&ps, 2), &vocabs(&ps), &Default::default(), &opts(ValidationMode::Test),
        )
        .unwrap();

        let ValidationOutcome::Test { records, .. } = out else {
            panic!("expected a test outcome");
        };
        for (record, p) in records.iter().zip(&ps) {
            let tokens: Vec<&str> = record.generated_equation.split_whitespace().collect();
            assert_eq!(record.is_correct(), score_one(&tokens, &p.numbers, p.answer));
        }
    }
}
