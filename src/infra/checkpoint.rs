// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to rebuild a trained
// model, using Burn's CompactRecorder for the weights.
//
// Files under models_dir:
//   best_models_{epoch}epoch_first_model.mpk        weights
//   best_models_{epoch}epoch_first_model.vocab.json voc1 + voc2
//   best_epoch.json                                 newest best epoch
//   train_config.json                               architecture + run knobs
//   session.json                                    trackers for --resume
//
// A checkpoint is only written when validation accuracy strictly
// improves, so every weights file on disk was the best at the
// time it was written. Old checkpoints are never pruned.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};
use burn::{prelude::*, record::CompactRecorder};
use serde::{de::DeserializeOwned, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::vocab::Vocabularies;
use crate::ml::trainer::TrainingSession;

const BEST_EPOCH_FILE: &str = "best_epoch.json";
const CONFIG_FILE:     &str = "train_config.json";
const SESSION_FILE:    &str = "session.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create model directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Weights path without extension; the recorder appends `.mpk`.
    fn model_stem(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("best_models_{epoch}epoch_first_model"))
    }

    fn vocab_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("best_models_{epoch}epoch_first_model.vocab.json"))
    }

    /// Persist a Checkpoint Record for `epoch` and point best_epoch.json at it.
    pub fn save_best<B: Backend, M: Module<B>>(
        &self,
        model:  &M,
        vocabs: &Vocabularies,
        epoch:  usize,
    ) -> Result<()> {
        let stem = self.model_stem(epoch);
        model
            .clone()
            .save_file(stem.clone(), &CompactRecorder::new())
            .with_context(|| format!("Failed to save checkpoint to '{}'", stem.display()))?;

        self.write_json(&self.vocab_path(epoch), vocabs)?;
        self.write_json(&self.dir.join(BEST_EPOCH_FILE), &epoch)?;

        tracing::info!("Saved best model checkpoint for epoch {}", epoch);
        Ok(())
    }

    /// Epoch of the newest saved checkpoint.
    pub fn best_epoch(&self) -> Result<usize> {
        self.read_json(&self.dir.join(BEST_EPOCH_FILE))
            .context("No checkpoint found. Have you run 'train' first?")
    }

    pub fn has_checkpoint(&self) -> bool {
        self.dir.join(BEST_EPOCH_FILE).exists()
    }

    /// Load the weights of `epoch` into `model`. The architecture of
    /// `model` must match the one the checkpoint was written from.
    pub fn load_model<B: Backend, M: Module<B>>(
        &self,
        model:  M,
        epoch:  usize,
        device: &B::Device,
    ) -> Result<M> {
        let stem = self.model_stem(epoch);
        tracing::info!("Loading checkpoint from epoch {}", epoch);
        model
            .load_file(stem.clone(), &CompactRecorder::new(), device)
            .with_context(|| format!("Cannot load checkpoint '{}'", stem.display()))
    }

    pub fn load_vocabs(&self, epoch: usize) -> Result<Vocabularies> {
        self.read_json(&self.vocab_path(epoch))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(&self.dir.join(CONFIG_FILE), cfg)
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        self.read_json(&self.dir.join(CONFIG_FILE))
            .context("Make sure you have run 'train' before 'test'")
    }

    pub fn save_session(&self, session: &TrainingSession) -> Result<()> {
        self.write_json(&self.dir.join(SESSION_FILE), session)
    }

    pub fn load_session(&self) -> Result<TrainingSession> {
        self.read_json(&self.dir.join(SESSION_FILE))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json).with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    use crate::data::vocab::Vocabulary;
    use crate::ml::model::{TransformerSeq2Seq, TransformerSeq2SeqConfig};

    type TestBackend = NdArray;

    fn tiny() -> TransformerSeq2SeqConfig {
        TransformerSeq2SeqConfig::new(8, 8, 6, 8, 2, 1, 1, 16, 0.0)
    }

    fn weights(m: &TransformerSeq2Seq<TestBackend>) -> Vec<f32> {
        m.output.weight.val().into_data().iter::<f32>().collect()
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();

        let model: TransformerSeq2Seq<TestBackend> = tiny().init(&device);
        let vocabs = Vocabularies::new(Vocabulary::build(["a b"]), Vocabulary::build(["N0 + N1"]));

        assert!(!ckpt.has_checkpoint());
        ckpt.save_best(&model, &vocabs, 3).unwrap();
        assert!(dir.path().join("best_models_3epoch_first_model.mpk").exists());
        assert_eq!(ckpt.best_epoch().unwrap(), 3);
        assert_eq!(ckpt.load_vocabs(3).unwrap(), vocabs);

        let fresh: TransformerSeq2Seq<TestBackend> = tiny().init(&device);
        let loaded = ckpt.load_model(fresh, 3, &device).unwrap();

        // CompactRecorder stores half precision
        for (a, b) in weights(&model).iter().zip(weights(&loaded)) {
            assert!((a - b).abs() < 1e-2);
        }
    }

    #[test]
    fn test_best_epoch_tracks_latest_save() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path()).unwrap();
        let model: TransformerSeq2Seq<TestBackend> = tiny().init(&Default::default());
        let vocabs = Vocabularies::new(Vocabulary::new(), Vocabulary::new());

        ckpt.save_best(&model, &vocabs, 1).unwrap();
        ckpt.save_best(&model, &vocabs, 4).unwrap();
        assert_eq!(ckpt.best_epoch().unwrap(), 4);
        // Earlier checkpoints are kept
        assert!(dir.path().join("best_models_1epoch_first_model.vocab.json").exists());
    }

    #[test]
    fn test_config_and_session_roundtrip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();

        let cfg = TrainConfig { epochs: 7, dataset: "mawps".into(), ..TrainConfig::default() };
        ckpt.save_config(&cfg).unwrap();
        let back = ckpt.load_config().unwrap();
        assert_eq!(back.epochs, 7);
        assert_eq!(back.dataset, "mawps");

        let session = TrainingSession { best_epoch: 5, max_val_acc: 0.4, ..TrainingSession::default() };
        ckpt.save_session(&session).unwrap();
        assert_eq!(ckpt.load_session().unwrap(), session);
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.best_epoch().is_err());
        assert!(ckpt.load_config().is_err());
    }
}
