// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Loads labelled math problems from JSON files:
//
//   <data_dir>/<dataset>/train.json
//   <data_dir>/<dataset>/dev.json      (optional)
//
// Each file is a JSON array of records such as
//
//   {
//     "Question": "Dan has number0 apples and buys number1 more ...",
//     "Equation": "( number0 + number1 )",
//     "Numbers":  "3.0 4.0",
//     "Answer":   7.0,
//     "Name":     "svamp-12"
//   }
//
// `Numbers` may be a space-separated string or a JSON array.
// `Name` (or `id`) is optional; the record index is used when
// it is missing.
//
// Reference: serde_json crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::{Path, PathBuf}};

use crate::data::preprocessor::Preprocessor;
use crate::domain::problem::MathProblem;
use crate::domain::traits::ProblemSource;

#[derive(Debug, Deserialize)]
struct RawProblem {
    #[serde(rename = "Question")]
    question: String,
    #[serde(rename = "Equation")]
    equation: String,
    #[serde(rename = "Numbers", default)]
    numbers:  RawNumbers,
    #[serde(rename = "Answer")]
    answer:   f64,
    #[serde(rename = "Name", alias = "id", default)]
    name:     Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawNumbers {
    List(Vec<f64>),
    Text(String),
}

impl Default for RawNumbers {
    fn default() -> Self {
        RawNumbers::List(Vec::new())
    }
}

impl RawNumbers {
    fn into_values(self) -> Result<Vec<f64>> {
        match self {
            RawNumbers::List(v) => Ok(v),
            RawNumbers::Text(s) => s
                .split_whitespace()
                .map(|t| {
                    t.parse::<f64>()
                        .with_context(|| format!("invalid number '{t}' in Numbers"))
                })
                .collect(),
        }
    }
}

/// Reads dataset splits from `<data_dir>/<dataset>/<split>.json`.
pub struct JsonProblemLoader {
    dir:          PathBuf,
    preprocessor: Preprocessor,
}

impl JsonProblemLoader {
    pub fn new(data_dir: impl AsRef<Path>, dataset: &str) -> Self {
        Self {
            dir:          data_dir.as_ref().join(dataset),
            preprocessor: Preprocessor::new(),
        }
    }

    fn split_path(&self, split: &str) -> PathBuf {
        self.dir.join(format!("{split}.json"))
    }

    fn convert(&self, index: usize, raw: RawProblem) -> Result<MathProblem> {
        let name = match raw.name {
            Some(serde_json::Value::String(s)) => s,
            Some(other)                        => other.to_string(),
            None                               => index.to_string(),
        };
        Ok(MathProblem::new(
            self.preprocessor.question(&raw.question),
            self.preprocessor.equation(&raw.equation),
            raw.numbers.into_values()?,
            raw.answer,
            name,
        ))
    }
}

impl ProblemSource for JsonProblemLoader {
    fn load_split(&self, split: &str) -> Result<Vec<MathProblem>> {
        let path = self.split_path(split);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read dataset split '{}'", path.display()))?;
        let raw: Vec<RawProblem> = serde_json::from_str(&text)
            .with_context(|| format!("Invalid dataset JSON in '{}'", path.display()))?;

        let mut problems = Vec::with_capacity(raw.len());
        for (i, r) in raw.into_iter().enumerate() {
            // Bad records are skipped
            match self.convert(i, r) {
                Ok(p)  => problems.push(p),
                Err(e) => tracing::warn!("Skipping record {} of '{}': {:#}", i, path.display(), e),
            }
        }

        tracing::info!("Loaded {} problems from '{}'", problems.len(), path.display());
        Ok(problems)
    }

    fn has_split(&self, split: &str) -> bool {
        self.split_path(split).exists()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn write_split(dir: &Path, split: &str, body: &str) {
        let ds = dir.join("toy");
        fs::create_dir_all(&ds).unwrap();
        fs::write(ds.join(format!("{split}.json")), body).unwrap();
    }

    #[test]
    fn test_loads_string_and_list_numbers() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), "train", r#"[
            {"Question": "a number0 b number1", "Equation": "number0 + number1",
             "Numbers": "3.0 4.0", "Answer": 7.0, "Name": "x1"},
            {"Question": "c  number0", "Equation": "number0 * 2",
             "Numbers": [5], "Answer": 10, "id": 42}
        ]"#);

        let loader   = JsonProblemLoader::new(tmp.path(), "toy");
        let problems = loader.load_split("train").unwrap();

        assert_eq!(problems.len(), 2);
        assert_eq!(problems[0].numbers, vec![3.0, 4.0]);
        assert_eq!(problems[0].name, "x1");
        assert_eq!(problems[1].question, "c number0");
        assert_eq!(problems[1].numbers, vec![5.0]);
        assert_eq!(problems[1].name, "42");
        assert!(loader.has_split("train"));
        assert!(!loader.has_split("dev"));
    }

    #[test]
    fn test_bad_numbers_record_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        write_split(tmp.path(), "train", r#"[
            {"Question": "q", "Equation": "number0", "Numbers": "abc", "Answer": 1.0},
            {"Question": "q", "Equation": "number0", "Numbers": "1.0", "Answer": 1.0}
        ]"#);

        let problems = JsonProblemLoader::new(tmp.path(), "toy").load_split("train").unwrap();
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].name, "1");
    }

    #[test]
    fn test_missing_split_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(JsonProblemLoader::new(tmp.path(), "toy").load_split("train").is_err());
    }
}
