// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these traits rather
// than concrete loaders and exporters.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::problem::MathProblem;
use crate::domain::result_record::ResultRecord;

// ─── ProblemSource ────────────────────────────────────────────────────────────
/// Any component that can provide labelled math problems.
///
/// Implementations:
///   - JsonProblemLoader → reads `<data_dir>/<dataset>/<split>.json`
pub trait ProblemSource {
    /// Load every problem of the named split ("train", "dev", ...).
    fn load_split(&self, split: &str) -> Result<Vec<MathProblem>>;

    /// Whether the named split exists in this source.
    fn has_split(&self, split: &str) -> bool;
}

// ─── ResultSink ───────────────────────────────────────────────────────────────
/// Any component that can persist the test-mode results table.
///
/// Implementations:
///   - ResultsExporter → writes `<outputs_path>/<dataset>.csv`
pub trait ResultSink {
    fn export(&self, records: &[ResultRecord]) -> Result<()>;
}
