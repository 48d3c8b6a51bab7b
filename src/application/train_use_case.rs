// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Load train / dev splits     (Layer 4 - data)
//   Step 2: Build or restore vocabs     (Layer 4 / 6)
//   Step 3: Build or restore the model  (Layer 5 - ml)
//   Step 4: Save config                 (Layer 6 - infra)
//   Step 5: Optimizer + scheduler       (Layer 5 - ml)
//   Step 6: Data loaders                (Layer 4 - data)
//   Step 7: Run training loop           (Layer 5 - ml)
//
// Reference: Burn Book §5 (Training)

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::data::{
    batcher::build_loader,
    dataset::ProblemDataset,
    loader::JsonProblemLoader,
    splitter::split_train_val,
    vocab::{Vocabularies, Vocabulary},
};
use crate::domain::traits::ProblemSource;
use crate::infra::{checkpoint::CheckpointManager, metrics::MetricsLogger};
use crate::ml::builder::{build_model, build_optimizer, build_scheduler, OptimizerKind};
use crate::ml::model::TransformerSeq2Seq;
use crate::ml::schedule::SchedulerKind;
use crate::ml::trainer::{train_model, TrainContext, TrainingSession};

type MyBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

// ─── Training Configuration ──────────────────────────────────────────────────
// All knobs of a training run. Saved to train_config.json so the
// `test` command can rebuild the same architecture.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub data_dir:       String,
    pub dataset:        String,
    pub models_dir:     String,
    pub outputs_path:   String,

    /// Words kept per question / equation before special tokens
    pub max_length:     usize,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub optimizer:      OptimizerKind,
    pub scheduler:      SchedulerKind,
    pub step_size:      usize,
    pub gamma:          f64,
    pub weight_decay:   f64,
    /// Global gradient-norm bound, 0 disables clipping
    pub max_grad_norm:  f64,
    /// Non-improving epochs tolerated before stopping
    pub early_stopping: usize,

    pub d_model:        usize,
    pub heads:          usize,
    pub encoder_layers: usize,
    pub decoder_layers: usize,
    pub d_ff:           usize,
    pub dropout:        f64,

    /// Held-out fraction when the dataset has no dev.json
    pub val_fraction:   f64,
    pub seed:           u64,
    pub val_outputs:    bool,
    pub save_results:   bool,
    pub resume:         bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            dataset:        "mawps".to_string(),
            models_dir:     "models".to_string(),
            outputs_path:   "outputs".to_string(),
            max_length:     80,
            batch_size:     16,
            epochs:         50,
            lr:             1e-4,
            optimizer:      OptimizerKind::Adam,
            scheduler:      SchedulerKind::None,
            step_size:      10,
            gamma:          0.5,
            weight_decay:   0.0,
            max_grad_norm:  1.0,
            early_stopping: 5,
            d_model:        256,
            heads:          8,
            encoder_layers: 3,
            decoder_layers: 3,
            d_ff:           1024,
            dropout:        0.1,
            val_fraction:   0.1,
            seed:           42,
            val_outputs:    false,
            save_results:   false,
            resume:         false,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline end to end. Returns the best validation accuracy.
    pub fn execute(&self) -> Result<f64> {
        let cfg    = &self.config;
        let device = burn::backend::wgpu::WgpuDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        // ── Step 1: Load splits ───────────────────────────────────────────────
        let source = JsonProblemLoader::new(&cfg.data_dir, &cfg.dataset);
        let train  = source.load_split("train")?;
        let (train, val) = if source.has_split("dev") {
            (train, source.load_split("dev")?)
        } else {
            tracing::info!("No dev split for '{}', holding out {:.0}% of train", cfg.dataset, cfg.val_fraction * 100.0);
            split_train_val(train, 1.0 - cfg.val_fraction, cfg.seed)
        };
        if train.is_empty() || val.is_empty() {
            bail!("dataset '{}' needs non-empty train and validation splits", cfg.dataset);
        }
        tracing::info!("Split: {} train, {} validation", train.len(), val.len());

        let checkpoints = CheckpointManager::new(&cfg.models_dir)?;
        let metrics     = MetricsLogger::new(&cfg.models_dir)?;

        // ── Steps 2-3: Vocabularies and model ─────────────────────────────────
        let (vocabs, model, session) = if cfg.resume && checkpoints.has_checkpoint() {
            let best   = checkpoints.best_epoch()?;
            let vocabs = checkpoints.load_vocabs(best)?;
            let model: TransformerSeq2Seq<MyBackend> = build_model(cfg, &vocabs.voc1, &vocabs.voc2, &device);
            let model  = checkpoints.load_model(model, best, &device)?;
            let previous = checkpoints.load_session().unwrap_or_else(|e| {
                tracing::warn!("No usable session.json ({e:#}), resuming trackers from epoch {best}");
                TrainingSession { best_epoch: best, ..TrainingSession::default() }
            });
            tracing::info!("Resuming from epoch {}", best);
            (vocabs, model, TrainingSession::resume(previous))
        } else {
            if cfg.resume {
                tracing::warn!("--resume given but no checkpoint in '{}', starting fresh", cfg.models_dir);
            }
            let vocabs = Vocabularies::new(
                Vocabulary::build(train.iter().map(|p| p.question.as_str())),
                Vocabulary::build(train.iter().map(|p| p.equation.as_str())),
            );
            let model: TransformerSeq2Seq<MyBackend> = build_model(cfg, &vocabs.voc1, &vocabs.voc2, &device);
            (vocabs, model, TrainingSession::default())
        };
        tracing::info!("Vocabularies: {} source words, {} target words", vocabs.voc1.len(), vocabs.voc2.len());

        // ── Step 4: Save config for `test` ────────────────────────────────────
        checkpoints.save_config(cfg)?;

        // ── Steps 5-6: Optimizer, scheduler, loaders ──────────────────────────
        let mut optimizer = build_optimizer::<MyBackend, TransformerSeq2Seq<MyBackend>>(cfg);
        let scheduler     = build_scheduler(cfg);

        let train_loader = build_loader(ProblemDataset::new(train), cfg.batch_size, Some(cfg.seed));
        let val_loader   = build_loader(ProblemDataset::new(val), cfg.batch_size, None);

        // ── Step 7: Training loop (Layer 5) ───────────────────────────────────
        let ctx = TrainContext { cfg, vocabs: &vocabs, checkpoints: &checkpoints, metrics: &metrics };
        let (_model, session) = train_model(
            model,
            optimizer.as_mut(),
            scheduler,
            &train_loader,
            &val_loader,
            session,
            &ctx,
            &device,
        )?;

        Ok(session.max_val_acc)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_json_fills_missing_fields_with_defaults() {
        let cfg: TrainConfig = serde_json::from_str(r#"{"epochs": 3, "optimizer": "sgd"}"#).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert_eq!(cfg.scheduler, SchedulerKind::None);
        assert_eq!(cfg.models_dir, "models");
    }

    #[test]
    fn test_missing_dataset_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            data_dir:   dir.path().to_string_lossy().into_owned(),
            models_dir: dir.path().join("models").to_string_lossy().into_owned(),
            ..TrainConfig::default()
        };
        assert!(TrainUseCase::new(cfg).execute().is_err());
    }
}
