// ============================================================
// Layer 4 — Problem Batcher
// ============================================================
// Implements Burn's Batcher trait to group MathProblems into a
// ProblemBatch.
//
// Unlike an image or span-extraction batcher, this one does NOT
// build tensors: the raw strings are kept so the training loop
// can encode them with the model's vocabularies (sents_to_idx +
// process_batch) and the validation runner can score decoded
// equations against the raw numbers and answers.
//
// Layout: struct-of-arrays. Every Vec has batch_size entries.
//
// Reference: Burn Book §4 (Batcher)

use std::sync::Arc;

use burn::data::dataloader::{batcher::Batcher, DataLoader, DataLoaderBuilder};

use crate::data::dataset::ProblemDataset;
use crate::domain::problem::MathProblem;

// ─── ProblemBatch ─────────────────────────────────────────────────────────────
/// One batch of raw problems.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemBatch {
    /// Question strings, with number placeholders
    pub questions: Vec<String>,

    /// Ground-truth equation strings
    pub equations: Vec<String>,

    /// Numeric literals per example
    pub numbers: Vec<Vec<f64>>,

    /// Ground-truth answer per example
    pub answers: Vec<f64>,

    /// Display identifiers per example
    pub names: Vec<String>,
}

impl ProblemBatch {
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

impl FromIterator<MathProblem> for ProblemBatch {
    fn from_iter<I: IntoIterator<Item = MathProblem>>(iter: I) -> Self {
        let mut batch = ProblemBatch::default();
        for p in iter {
            batch.questions.push(p.question);
            batch.equations.push(p.equation);
            batch.numbers.push(p.numbers);
            batch.answers.push(p.answer);
            batch.names.push(p.name);
        }
        batch
    }
}

// ─── ProblemBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug, Default)]
pub struct ProblemBatcher;

impl Batcher<MathProblem, ProblemBatch> for ProblemBatcher {
    fn batch(&self, items: Vec<MathProblem>) -> ProblemBatch {
        items.into_iter().collect()
    }
}

/// Shared handle to a batch loader.
pub type ProblemLoader = Arc<dyn DataLoader<ProblemBatch>>;

/// Build a loader over `dataset`.
///
/// `shuffle_seed = None` keeps dataset order, which the validation
/// runner relies on for reproducible metrics.
pub fn build_loader(
    dataset:      ProblemDataset,
    batch_size:   usize,
    shuffle_seed: Option<u64>,
) -> ProblemLoader {
    let builder = DataLoaderBuilder::new(ProblemBatcher).batch_size(batch_size.max(1));
    match shuffle_seed {
        Some(seed) => builder.shuffle(seed).build(dataset),
        None       => builder.build(dataset),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn problem(i: usize) -> MathProblem {
        MathProblem::new(
            format!("q{i}"),
            "N0 + N1",
            vec![i as f64, 1.0],
            i as f64 + 1.0,
            format!("p{i}"),
        )
    }

    #[test]
    fn test_batch_keeps_fields_parallel() {
        let batch = ProblemBatcher.batch(vec![problem(1), problem(2)]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.questions, vec!["q1", "q2"]);
        assert_eq!(batch.numbers[1], vec![2.0, 1.0]);
        assert_eq!(batch.answers, vec![2.0, 3.0]);
        assert_eq!(batch.names, vec!["p1", "p2"]);
    }

    #[test]
    fn test_loader_final_batch_is_smaller() {
        let ds     = ProblemDataset::new((0..5).map(problem).collect());
        let loader = build_loader(ds, 2, None);
        let sizes: Vec<usize> = loader.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_unshuffled_loader_keeps_order() {
        let ds     = ProblemDataset::new((0..4).map(problem).collect());
        let loader = build_loader(ds, 3, None);
        let names: Vec<String> = loader.iter().flat_map(|b| b.names).collect();
        assert_eq!(names, vec!["p0", "p1", "p2", "p3"]);
    }
}
