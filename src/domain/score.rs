// ============================================================
// Layer 3 — Score Evaluator
// ============================================================
// Decides whether a decoded equation solves its problem:
//   1. substitute placeholders with the problem's numbers
//   2. evaluate with normal operator precedence
//   3. compare against the ground-truth answer within
//      ANSWER_TOLERANCE
//
// An equation that fails to parse or evaluate is scored as
// incorrect. The EvalError never leaves this module.

use crate::domain::equation::evaluate;

/// Absolute tolerance used when comparing a result to the answer.
pub const ANSWER_TOLERANCE: f64 = 1e-4;

/// Aggregate of a scoring call over one or more examples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSummary {
    /// Examples whose equation evaluated to the answer
    pub correct: usize,
    /// Examples attempted, scoreable or not
    pub total:   usize,
    /// One flag per example, in input order
    pub flags:   Vec<bool>,
}

impl ScoreSummary {
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }

    /// Fold another summary into this one, keeping flag order.
    pub fn merge(&mut self, other: ScoreSummary) {
        self.correct += other.correct;
        self.total   += other.total;
        self.flags.extend(other.flags);
    }
}

/// Score a single decoded equation.
pub fn score_one<S: AsRef<str>>(tokens: &[S], numbers: &[f64], answer: f64) -> bool {
    match evaluate(tokens, numbers) {
        Ok(value) => (value - answer).abs() <= ANSWER_TOLERANCE,
        Err(e) => {
            tracing::trace!("unscoreable equation: {e}");
            false
        }
    }
}

/// Score a batch of decoded equations against their numbers and answers.
///
/// The three slices are parallel; extra entries in the longer slices
/// are ignored.
pub fn cal_score<S: AsRef<str>>(
    outputs: &[Vec<S>],
    numbers: &[Vec<f64>],
    answers: &[f64],
) -> ScoreSummary {
    let flags: Vec<bool> = outputs
        .iter()
        .zip(numbers)
        .zip(answers)
        .map(|((tokens, nums), &ans)| score_one(tokens, nums, ans))
        .collect();

    ScoreSummary {
        correct: flags.iter().filter(|&&f| f).count(),
        total:   flags.len(),
        flags,
    }
}
