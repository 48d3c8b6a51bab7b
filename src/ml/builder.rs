// ============================================================
// Layer 5 — Model / Optimizer Builder
// ============================================================
// Turns a TrainConfig into the three objects the training loop
// needs:
//
//   build_model      transformer sized from the vocabularies
//   build_optimizer  adam | adamw | sgd | rmsprop
//   build_scheduler  none | step | exponential | cosine
//
// burn's optimizers are distinct types (OptimizerAdaptor<Adam, ..>,
// OptimizerAdaptor<Sgd, ..>, ...) and `Optimizer` carries an
// associated Record type, so it cannot be boxed directly.
// ParamOptimizer is the object-safe slice of it the loop uses.
//
// Reference: Burn Book §5 (Optimizers)

use std::{fmt, str::FromStr};

use burn::{
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, AdamConfig, AdamWConfig, GradientsParams, Optimizer,
        RmsPropConfig, SgdConfig,
    },
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::vocab::Vocabulary;
use crate::ml::model::{TransformerSeq2Seq, TransformerSeq2SeqConfig};
use crate::ml::schedule::{LrPolicy, LrSchedule, SchedulerKind};

/// Optimizer selection knob of the training configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    Adam,
    AdamW,
    Sgd,
    RmsProp,
}

impl FromStr for OptimizerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "adam"    => Ok(Self::Adam),
            "adamw"   => Ok(Self::AdamW),
            "sgd"     => Ok(Self::Sgd),
            "rmsprop" => Ok(Self::RmsProp),
            other => Err(format!("unknown optimizer '{other}' (adam|adamw|sgd|rmsprop)")),
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Adam    => "adam",
            Self::AdamW   => "adamw",
            Self::Sgd     => "sgd",
            Self::RmsProp => "rmsprop",
        };
        f.write_str(s)
    }
}

/// Object-safe view of a burn optimizer: one parameter update.
pub trait ParamOptimizer<M, B>: Send
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M;
}

impl<M, B, O> ParamOptimizer<M, B> for O
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
    O: Optimizer<M, B>,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M {
        Optimizer::step(self, lr, module, grads)
    }
}

/// Architecture config for the given vocabularies.
///
/// The positional table holds `max_length + 2` entries: the longest
/// target is `<s>` + max_length words + `</s>`.
pub fn model_config(cfg: &TrainConfig, voc1: &Vocabulary, voc2: &Vocabulary) -> TransformerSeq2SeqConfig {
    TransformerSeq2SeqConfig::new(
        voc1.len(),
        voc2.len(),
        cfg.max_length + 2,
        cfg.d_model,
        cfg.heads,
        cfg.encoder_layers,
        cfg.decoder_layers,
        cfg.d_ff,
        cfg.dropout,
    )
}

/// Allocate a freshly initialised model on `device`.
pub fn build_model<B: Backend>(
    cfg:    &TrainConfig,
    voc1:   &Vocabulary,
    voc2:   &Vocabulary,
    device: &B::Device,
) -> TransformerSeq2Seq<B> {
    let model = model_config(cfg, voc1, voc2).init(device);
    tracing::info!(
        "Model ready: {}+{} layers, d_model={}, heads={}, vocab {}→{}",
        cfg.encoder_layers, cfg.decoder_layers, cfg.d_model, cfg.heads,
        voc1.len(), voc2.len(),
    );
    model
}

pub fn build_optimizer<B, M>(cfg: &TrainConfig) -> Box<dyn ParamOptimizer<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B> + 'static,
{
    let decay = (cfg.weight_decay > 0.0).then(|| WeightDecayConfig::new(cfg.weight_decay as f32));

    tracing::info!("Optimizer: {} (lr={}, weight_decay={})", cfg.optimizer, cfg.lr, cfg.weight_decay);
    match cfg.optimizer {
        OptimizerKind::Adam => Box::new(
            AdamConfig::new().with_epsilon(1e-8).with_weight_decay(decay).init::<B, M>(),
        ),
        OptimizerKind::AdamW => Box::new(
            AdamWConfig::new().with_weight_decay(cfg.weight_decay as f32).init::<B, M>(),
        ),
        OptimizerKind::Sgd => Box::new(SgdConfig::new().with_weight_decay(decay).init::<B, M>()),
        OptimizerKind::RmsProp => Box::new(RmsPropConfig::new().with_weight_decay(decay).init::<B, M>()),
    }
}

/// None when the configuration asks for a constant learning rate.
pub fn build_scheduler(cfg: &TrainConfig) -> Option<LrSchedule> {
    let policy = match cfg.scheduler {
        SchedulerKind::None        => return None,
        SchedulerKind::Step        => LrPolicy::Step { step_size: cfg.step_size, gamma: cfg.gamma },
        SchedulerKind::Exponential => LrPolicy::Exponential { gamma: cfg.gamma },
        SchedulerKind::Cosine      => LrPolicy::Cosine { t_max: cfg.epochs, eta_min: 0.0 },
    };
    Some(LrSchedule::new(cfg.lr, policy))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = Autodiff<NdArray>;

    fn tiny_cfg() -> TrainConfig {
        TrainConfig {
            max_length:     6,
            d_model:        16,
            heads:          2,
            encoder_layers: 1,
            decoder_layers: 1,
            d_ff:           32,
            dropout:        0.0,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_model_is_sized_from_vocabularies() {
        let voc1 = Vocabulary::build(["how many apples"]);
        let voc2 = Vocabulary::build(["N0 + N1"]);
        let mc   = model_config(&tiny_cfg(), &voc1, &voc2);
        assert_eq!(mc.source_vocab, voc1.len());
        assert_eq!(mc.target_vocab, voc2.len());
        assert_eq!(mc.max_positions, 8);
    }

    #[test]
    fn test_every_optimizer_kind_builds() {
        let voc = Vocabulary::build(["a b"]);
        for kind in [OptimizerKind::Adam, OptimizerKind::AdamW, OptimizerKind::Sgd, OptimizerKind::RmsProp] {
            let cfg = TrainConfig { optimizer: kind, weight_decay: 0.01, ..tiny_cfg() };
            let _model: TransformerSeq2Seq<TestBackend> = build_model(&cfg, &voc, &voc, &Default::default());
            let _optim = build_optimizer::<TestBackend, TransformerSeq2Seq<TestBackend>>(&cfg);
        }
    }

    #[test]
    fn test_scheduler_none_means_constant_lr() {
        assert!(build_scheduler(&TrainConfig { scheduler: SchedulerKind::None, ..tiny_cfg() }).is_none());

        let cfg = TrainConfig { scheduler: SchedulerKind::Step, step_size: 1, gamma: 0.5, lr: 0.2, ..tiny_cfg() };
        let mut s = build_scheduler(&cfg).unwrap();
        assert_eq!(s.lr(), 0.2);
        s.step();
        assert_eq!(s.lr(), 0.1);
    }

    #[test]
    fn test_optimizer_kind_parses() {
        assert_eq!("AdamW".parse::<OptimizerKind>(), Ok(OptimizerKind::AdamW));
        assert!("lion".parse::<OptimizerKind>().is_err());
    }
}
