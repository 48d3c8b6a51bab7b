// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with per-batch teacher forcing, per-epoch greedy
// validation, checkpoint selection and early stopping.
//
// Per batch (autodiff backend):
//   encode → split target → forward → cross-entropy
//   → backward → clip global grad norm → optimizer step
//
// The scheduler starts fresh on every call, resumed runs included,
// so a cosine schedule spans exactly the epochs of this run.
//
// Per epoch:
//   scheduler step → validate on train (accuracy proxy) and dev
//   → update session trackers → checkpoint on strict val_acc
//   improvement → report, metrics.csv, session.json
//   → stop once early_stop_count > early_stopping
//
// Key Burn insight:
//   - Training uses B (Autodiff<..>) for gradients
//   - model.valid() returns the module on B::InnerBackend:
//     dropout disabled, no graph recorded
//   - GradientsParams are built fresh every step, so there is
//     nothing to zero between batches
//
// Reference: Burn Book §5

use anyhow::{bail, Result};
use burn::{
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::batcher::ProblemLoader;
use crate::data::vocab::{process_batch, sents_to_idx, SequenceSide, Vocabularies};
use crate::infra::{checkpoint::CheckpointManager, metrics::{EpochMetrics, MetricsLogger}};
use crate::ml::builder::ParamOptimizer;
use crate::ml::clip::clip_grad_norm;
use crate::ml::schedule::LrSchedule;
use crate::ml::seq2seq::{teacher_forcing_split, Seq2SeqModel};
use crate::ml::validator::{run_validation, ValidationMode, ValidationOptions, ValidationOutcome};

// ─── Training Session ────────────────────────────────────────────────────────
/// Best-so-far trackers of a run. Serialised to session.json after
/// every epoch so `--resume` can continue where a run stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Epochs completed by earlier runs
    pub epoch_offset:     usize,
    pub min_train_loss:   f64,
    pub min_val_loss:     f64,
    pub max_train_acc:    f64,
    pub max_val_acc:      f64,
    pub max_val_bleu:     f64,
    /// Global epoch of the newest checkpoint, 0 before the first
    pub best_epoch:       usize,
    /// Consecutive epochs without a val_acc improvement
    pub early_stop_count: usize,
}

impl Default for TrainingSession {
    fn default() -> Self {
        Self {
            epoch_offset:     0,
            // f64::MAX rather than INFINITY: JSON has no infinity
            min_train_loss:   f64::MAX,
            min_val_loss:     f64::MAX,
            max_train_acc:    0.0,
            max_val_acc:      0.0,
            max_val_bleu:     0.0,
            best_epoch:       0,
            early_stop_count: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochOutcome {
    /// Validation accuracy strictly beat the previous best
    pub improved: bool,
    /// The early-stopping budget is exhausted
    pub stop:     bool,
}

impl TrainingSession {
    /// Continue a previous run from its best checkpoint.
    pub fn resume(previous: TrainingSession) -> Self {
        Self {
            epoch_offset:     previous.best_epoch,
            early_stop_count: 0,
            ..previous
        }
    }

    /// Fold one epoch into the trackers.
    ///
    /// Each min/max tracker moves on its own; only val_acc drives
    /// checkpointing and early stopping.
    pub fn record_epoch(&mut self, m: &EpochMetrics, early_stopping: usize) -> EpochOutcome {
        self.min_train_loss = self.min_train_loss.min(m.train_loss);
        self.min_val_loss   = self.min_val_loss.min(m.val_loss);
        self.max_train_acc  = self.max_train_acc.max(m.train_acc);

        let improved = m.val_acc > self.max_val_acc;
        if improved {
            self.max_val_acc      = m.val_acc;
            self.best_epoch       = m.epoch;
            self.early_stop_count = 0;
        } else {
            self.early_stop_count += 1;
        }

        EpochOutcome { improved, stop: self.early_stop_count > early_stopping }
    }
}

// ─── Training Loop ───────────────────────────────────────────────────────────
/// Everything the loop reads or writes besides the model itself.
pub struct TrainContext<'a> {
    pub cfg:         &'a TrainConfig,
    pub vocabs:      &'a Vocabularies,
    pub checkpoints: &'a CheckpointManager,
    pub metrics:     &'a MetricsLogger,
}

/// Run up to `cfg.epochs` epochs. Returns the trained model and the
/// final session; `session.max_val_acc` is the best validation
/// accuracy reached.
pub fn train_model<B, M>(
    mut model:     M,
    optimizer:     &mut dyn ParamOptimizer<M, B>,
    mut scheduler: Option<LrSchedule>,
    train_loader:  &ProblemLoader,
    val_loader:    &ProblemLoader,
    mut session:   TrainingSession,
    ctx:           &TrainContext<'_>,
    device:        &B::Device,
) -> Result<(M, TrainingSession)>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + Seq2SeqModel<B> + 'static,
    M::InnerModule: Seq2SeqModel<B::InnerBackend>,
{
    let cfg       = ctx.cfg;
    let vocabs    = ctx.vocabs;
    let criterion = CrossEntropyLossConfig::new().init(device);

    for epoch in 1..=cfg.epochs {
        let global_epoch = epoch + session.epoch_offset;
        let lr = scheduler.as_ref().map_or(cfg.lr, LrSchedule::lr);

        // ── Training phase ───────────────────────────────────────────────────
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in train_loader.iter() {
            let src = sents_to_idx(&vocabs.voc1, &batch.questions, cfg.max_length, SequenceSide::Source);
            let tgt = sents_to_idx(&vocabs.voc2, &batch.equations, cfg.max_length, SequenceSide::Target);
            let enc = process_batch::<B>(&src, &tgt, device);

            let (input, labels) = teacher_forcing_split(enc.target);
            let logits = model.forward(&batch.questions, enc.source, input);

            // [batch, T-1, vocab] → [batch*(T-1), vocab]
            let [b, t, v] = logits.dims();
            let loss = criterion.forward(logits.reshape([b * t, v]), labels.reshape([b * t]));

            loss_sum += loss.clone().into_scalar().elem::<f64>();
            batches  += 1;

            let mut grads = GradientsParams::from_grads(loss.backward(), &model);
            if cfg.max_grad_norm > 0.0 {
                clip_grad_norm::<B, M>(&model, &mut grads, cfg.max_grad_norm);
            }
            model = optimizer.step(lr, model, grads);

            tracing::debug!("epoch {} batch {} lr={:.2e}", global_epoch, batches, lr);
        }

        if batches == 0 {
            bail!("training set produced no batches");
        }
        if let Some(s) = scheduler.as_mut() {
            s.step();
        }
        let train_loss = loss_sum / batches as f64;

        // ── Validation phase ─────────────────────────────────────────────────
        let model_valid = model.valid();

        let train_acc = run_validation::<B::InnerBackend, _, _>(
            &model_valid,
            train_loader.iter(),
            vocabs,
            device,
            &ValidationOptions { max_length: cfg.max_length, mode: ValidationMode::Train, show_outputs: false },
        )?
        .accuracy();

        let outcome = run_validation::<B::InnerBackend, _, _>(
            &model_valid,
            val_loader.iter(),
            vocabs,
            device,
            &ValidationOptions { max_length: cfg.max_length, mode: ValidationMode::Train, show_outputs: cfg.val_outputs },
        )?;
        let ValidationOutcome::Epoch { bleu, loss: val_loss, accuracy: val_acc } = outcome else {
            bail!("train-mode validation returned a test outcome");
        };

        // ── Bookkeeping ──────────────────────────────────────────────────────
        let metrics = EpochMetrics {
            epoch: global_epoch,
            train_loss,
            val_loss,
            train_acc,
            val_acc,
            val_bleu: bleu,
        };
        let step = session.record_epoch(&metrics, cfg.early_stopping);

        if step.improved {
            ctx.checkpoints.save_best(&model, vocabs, global_epoch)?;
        }

        tracing::info!(
            "Epoch {:>3} | best_epoch={} | train_loss={:.4} | val_loss={:.4} | train_acc={:.2}% | val_acc={:.2}%",
            global_epoch, session.best_epoch, train_loss, val_loss, train_acc * 100.0, val_acc * 100.0,
        );
        tracing::info!(
            "          min_train_loss={:.4} | min_val_loss={:.4} | max_train_acc={:.2}% | max_val_acc={:.2}%",
            session.min_train_loss, session.min_val_loss,
            session.max_train_acc * 100.0, session.max_val_acc * 100.0,
        );

        ctx.metrics.log(&metrics)?;
        ctx.checkpoints.save_session(&session)?;

        if step.stop {
            tracing::info!(
                "Early stopping at epoch {} after no improvement in {} epochs",
                global_epoch, session.early_stop_count,
            );
            break;
        }
    }

    tracing::info!("Training complete! max_val_acc={:.2}%", session.max_val_acc * 100.0);
    Ok((model, session))
}
