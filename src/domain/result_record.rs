// ============================================================
// Layer 3 — ResultRecord Domain Type
// ============================================================
// One row of the test-mode results table. Collected by the
// validation runner and exported by infra::results.

use serde::{Deserialize, Serialize};

/// Per-example evaluation result, produced in test mode only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub question:           String,
    pub actual_equation:    String,
    pub generated_equation: String,
    /// 1 when the generated equation solves the problem, else 0
    pub score:              u8,
}

impl ResultRecord {
    pub fn is_correct(&self) -> bool {
        self.score == 1
    }
}
