use burn::data::dataset::Dataset;

use crate::domain::problem::MathProblem;

/// In-memory split of math problems, served to Burn's DataLoader.
pub struct ProblemDataset {
    problems: Vec<MathProblem>,
}

impl ProblemDataset {
    pub fn new(problems: Vec<MathProblem>) -> Self { Self { problems } }
}

impl Dataset<MathProblem> for ProblemDataset {
    fn get(&self, index: usize) -> Option<MathProblem> {
        self.problems.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.problems.len()
    }
}
