// ============================================================
// Layer 6 — Results Exporter
// ============================================================
// Writes the test-mode results table to
// {outputs_path}/{dataset}.csv with the columns
//
//   Question, Actual Equation, Generated Equation, Score
//
// Questions routinely contain commas and quotes; the csv writer
// quotes those fields.

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::domain::result_record::ResultRecord;
use crate::domain::traits::ResultSink;

const HEADER: [&str; 4] = ["Question", "Actual Equation", "Generated Equation", "Score"];

pub struct ResultsExporter {
    path: PathBuf,
}

impl ResultsExporter {
    pub fn new(outputs_path: impl AsRef<Path>, dataset: &str) -> Self {
        Self { path: outputs_path.as_ref().join(format!("{dataset}.csv")) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for ResultsExporter {
    fn export(&self, records: &[ResultRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create output directory '{}'", parent.display()))?;
        }

        let mut w = csv::Writer::from_path(&self.path)
            .with_context(|| format!("Cannot write results to '{}'", self.path.display()))?;
        w.write_record(HEADER)?;
        for r in records {
            w.write_record([
                r.question.as_str(),
                r.actual_equation.as_str(),
                r.generated_equation.as_str(),
                r.score.to_string().as_str(),
            ])?;
        }
        w.flush()?;

        tracing::info!("Saved {} results to '{}'", records.len(), self.path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_writes_header_and_quotes_commas() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = ResultsExporter::new(dir.path().join("out"), "asdiv");

        let records = vec![
            ResultRecord {
                question:           "Tom has N0 apples, Ann has N1.".into(),
                actual_equation:    "N0 + N1".into(),
                generated_equation: "N0 + N1".into(),
                score:              1,
            },
            ResultRecord {
                question:           "How \"many\" left".into(),
                actual_equation:    "N0 - N1".into(),
                generated_equation: "N0".into(),
                score:              0,
            },
        ];
        exporter.export(&records).unwrap();

        assert!(exporter.path().ends_with("out/asdiv.csv"));
        let text = fs::read_to_string(exporter.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Question,Actual Equation,Generated Equation,Score");
        assert_eq!(lines[1], "\"Tom has N0 apples, Ann has N1.\",N0 + N1,N0 + N1,1");
        assert_eq!(lines[2], "\"How \"\"many\"\" left\",N0 - N1,N0,0");
    }
}
