// ============================================================
// Layer 2 — TestUseCase
// ============================================================
// Scores a saved checkpoint on a dataset split:
//
//   Step 1: Load train_config.json + vocabularies   (Layer 6)
//   Step 2: Rebuild the model and load its weights  (Layer 5 / 6)
//   Step 3: Load the evaluation split               (Layer 4)
//   Step 4: Validation runner in test mode          (Layer 5)
//   Step 5: Optionally export the results table     (Layer 6)

use anyhow::{bail, Result};

use crate::data::{
    batcher::build_loader,
    dataset::ProblemDataset,
    loader::JsonProblemLoader,
    splitter::split_train_val,
};
use crate::domain::traits::{ProblemSource, ResultSink};
use crate::infra::{checkpoint::CheckpointManager, results::ResultsExporter};
use crate::ml::builder::build_model;
use crate::ml::model::TransformerSeq2Seq;
use crate::ml::validator::{run_validation, ValidationMode, ValidationOptions, ValidationOutcome};

type MyInnerBackend = burn::backend::Wgpu;

#[derive(Debug, Clone)]
pub struct TestConfig {
    pub models_dir:   String,
    /// Checkpoint epoch, defaults to the best one
    pub epoch:        Option<usize>,
    /// Defaults to the training run's data_dir / dataset
    pub data_dir:     Option<String>,
    pub dataset:      Option<String>,
    pub split:        String,
    pub batch_size:   usize,
    pub outputs_path: String,
    pub save_results: bool,
    pub show_outputs: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            models_dir:   "models".to_string(),
            epoch:        None,
            data_dir:     None,
            dataset:      None,
            split:        "dev".to_string(),
            batch_size:   16,
            outputs_path: "outputs".to_string(),
            save_results: false,
            show_outputs: false,
        }
    }
}

pub struct TestUseCase {
    config: TestConfig,
}

impl TestUseCase {
    pub fn new(config: TestConfig) -> Self {
        Self { config }
    }

    /// Returns the mean score (accuracy) of the checkpoint on the split.
    pub fn execute(&self) -> Result<f64> {
        let cfg    = &self.config;
        let device = burn::backend::wgpu::WgpuDevice::default();

        // ── Steps 1-2: Checkpoint ─────────────────────────────────────────────
        let checkpoints = CheckpointManager::new(&cfg.models_dir)?;
        let train_cfg   = checkpoints.load_config()?;
        let epoch = match cfg.epoch {
            Some(e) => e,
            None    => checkpoints.best_epoch()?,
        };
        let vocabs = checkpoints.load_vocabs(epoch)?;
        let model: TransformerSeq2Seq<MyInnerBackend> =
            build_model(&train_cfg, &vocabs.voc1, &vocabs.voc2, &device);
        let model = checkpoints.load_model(model, epoch, &device)?;

        // ── Step 3: Evaluation split ──────────────────────────────────────────
        let data_dir = cfg.data_dir.as_deref().unwrap_or(&train_cfg.data_dir);
        let dataset  = cfg.dataset.as_deref().unwrap_or(&train_cfg.dataset);
        let source   = JsonProblemLoader::new(data_dir, dataset);

        let problems = if source.has_split(&cfg.split) {
            source.load_split(&cfg.split)?
        } else if cfg.split == "dev" {
            // Same held-out set the training run validated on
            let train = source.load_split("train")?;
            split_train_val(train, 1.0 - train_cfg.val_fraction, train_cfg.seed).1
        } else {
            bail!("dataset '{}' has no '{}' split", dataset, cfg.split);
        };
        tracing::info!("Evaluating epoch {} checkpoint on {} problems", epoch, problems.len());

        // ── Step 4: Test-mode validation ──────────────────────────────────────
        let loader = build_loader(ProblemDataset::new(problems), cfg.batch_size, None);
        let opts   = ValidationOptions {
            max_length:   train_cfg.max_length,
            mode:         ValidationMode::Test,
            show_outputs: cfg.show_outputs,
        };
        let outcome = run_validation::<MyInnerBackend, _, _>(&model, loader.iter(), &vocabs, &device, &opts)?;
        let ValidationOutcome::Test { mean_score, records } = outcome else {
            bail!("test-mode validation returned an epoch outcome");
        };
        let correct = records.iter().filter(|r| r.is_correct()).count();
        tracing::info!("Accuracy: {:.2}% ({}/{} correct)", mean_score * 100.0, correct, records.len());

        // ── Step 5: Export ────────────────────────────────────────────────────
        if cfg.save_results {
            ResultsExporter::new(&cfg.outputs_path, dataset).export(&records)?;
        }

        Ok(mean_score)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untrained_models_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TestConfig {
            models_dir: dir.path().to_string_lossy().into_owned(),
            ..TestConfig::default()
        };
        let err = TestUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("train_config.json"));
    }
}
