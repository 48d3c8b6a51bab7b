// ============================================================
// Layer 3 — MathProblem Domain Type
// ============================================================
// One labelled math word problem:
//   - the question text, with numbers already replaced by
//     placeholders (number0, number1, ...)
//   - the equation over those placeholders
//   - the numeric literals the placeholders stand for
//   - the ground-truth answer
//
// Example:
//   Question: "Dan has number0 apples and buys number1 more. How many now?"
//   Equation: "number0 + number1"
//   Numbers:  [3.0, 4.0]
//   Answer:   7.0

use serde::{Deserialize, Serialize};

/// A labelled math word problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathProblem {
    /// Question text with number placeholders
    pub question: String,

    /// Ground-truth equation, whitespace separated tokens
    pub equation: String,

    /// Literal values referenced by the placeholders, in order
    pub numbers: Vec<f64>,

    /// Numeric answer the equation evaluates to
    pub answer: f64,

    /// Auxiliary identifier, only used for display
    pub name: String,
}

impl MathProblem {
    pub fn new(
        question: impl Into<String>,
        equation: impl Into<String>,
        numbers:  Vec<f64>,
        answer:   f64,
        name:     impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            equation: equation.into(),
            numbers,
            answer,
            name: name.into(),
        }
    }
}
