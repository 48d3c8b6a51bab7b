// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `test`, and all their
// configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, OptimizerKind, ...)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::{test_use_case::TestConfig, train_use_case::TrainConfig};
use crate::ml::{builder::OptimizerKind, schedule::SchedulerKind};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the seq2seq model on a math word problem dataset
    Train(TrainArgs),

    /// Score a saved checkpoint on a dataset split
    Test(TestArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Root directory holding one folder per dataset
    #[arg(long, default_value = "data")]
    pub data_dir: String,

    /// Dataset folder name; must contain train.json, dev.json is optional
    #[arg(long, default_value = "mawps")]
    pub dataset: String,

    /// Where checkpoints, metrics.csv and session.json go
    #[arg(long, default_value = "models")]
    pub models_dir: String,

    #[arg(long, default_value = "outputs")]
    pub outputs_path: String,

    /// Words kept per question / equation
    #[arg(long, default_value_t = 80)]
    pub max_length: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Upper bound on epochs; early stopping may end the run sooner
    #[arg(long, default_value_t = 50)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-4)]
    pub lr: f64,

    /// adam | adamw | sgd | rmsprop
    #[arg(long, default_value = "adam")]
    pub optimizer: OptimizerKind,

    /// none | step | exponential | cosine
    #[arg(long, default_value = "none")]
    pub scheduler: SchedulerKind,

    /// Epochs between decays of the step scheduler
    #[arg(long, default_value_t = 10)]
    pub step_size: usize,

    /// Decay factor of the step and exponential schedulers
    #[arg(long, default_value_t = 0.5)]
    pub gamma: f64,

    #[arg(long, default_value_t = 0.0)]
    pub weight_decay: f64,

    /// Global gradient-norm bound; 0 disables clipping
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Epochs without validation improvement tolerated before stopping
    #[arg(long, default_value_t = 5)]
    pub early_stopping: usize,

    /// Hidden dimension of the transformer
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by heads
    #[arg(long, default_value_t = 8)]
    pub heads: usize,

    #[arg(long, default_value_t = 3)]
    pub encoder_layers: usize,

    #[arg(long, default_value_t = 3)]
    pub decoder_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Held-out fraction when the dataset has no dev.json
    #[arg(long, default_value_t = 0.1)]
    pub val_fraction: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Log every validation prediction next to its reference
    #[arg(long)]
    pub val_outputs: bool,

    #[arg(long)]
    pub save_results: bool,

    /// Continue from the best checkpoint in --models-dir
    #[arg(long)]
    pub resume: bool,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_dir:       a.data_dir,
            dataset:        a.dataset,
            models_dir:     a.models_dir,
            outputs_path:   a.outputs_path,
            max_length:     a.max_length,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            optimizer:      a.optimizer,
            scheduler:      a.scheduler,
            step_size:      a.step_size,
            gamma:          a.gamma,
            weight_decay:   a.weight_decay,
            max_grad_norm:  a.max_grad_norm,
            early_stopping: a.early_stopping,
            d_model:        a.d_model,
            heads:          a.heads,
            encoder_layers: a.encoder_layers,
            decoder_layers: a.decoder_layers,
            d_ff:           a.d_ff,
            dropout:        a.dropout,
            val_fraction:   a.val_fraction,
            seed:           a.seed,
            val_outputs:    a.val_outputs,
            save_results:   a.save_results,
            resume:         a.resume,
        }
    }
}

/// All arguments for the `test` command
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Directory the training run saved its checkpoints to
    #[arg(long, default_value = "models")]
    pub models_dir: String,

    /// Checkpoint epoch to load; defaults to the best one
    #[arg(long)]
    pub epoch: Option<usize>,

    /// Overrides the training run's data directory
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Overrides the training run's dataset
    #[arg(long)]
    pub dataset: Option<String>,

    #[arg(long, default_value = "dev")]
    pub split: String,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    #[arg(long, default_value = "outputs")]
    pub outputs_path: String,

    /// Write <outputs-path>/<dataset>.csv
    #[arg(long)]
    pub save_results: bool,

    #[arg(long)]
    pub show_outputs: bool,
}

impl From<TestArgs> for TestConfig {
    fn from(a: TestArgs) -> Self {
        TestConfig {
            models_dir:   a.models_dir,
            epoch:        a.epoch,
            data_dir:     a.data_dir,
            dataset:      a.dataset,
            split:        a.split,
            batch_size:   a.batch_size,
            outputs_path: a.outputs_path,
            save_results: a.save_results,
            show_outputs: a.show_outputs,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_args_map_onto_config() {
        let cli = Cli::try_parse_from([
            "mwp-transformer", "train", "--optimizer", "sgd", "--scheduler", "cosine",
            "--epochs", "3", "--resume",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg = TrainConfig::from(args);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd);
        assert_eq!(cfg.scheduler, SchedulerKind::Cosine);
        assert_eq!(cfg.epochs, 3);
        assert!(cfg.resume);
        assert_eq!(cfg.max_grad_norm, 1.0);
    }

    #[test]
    fn test_unknown_optimizer_is_rejected() {
        assert!(Cli::try_parse_from(["mwp-transformer", "train", "--optimizer", "lion"]).is_err());
    }

    #[test]
    fn test_test_args_default_to_best_checkpoint() {
        let cli = Cli::try_parse_from(["mwp-transformer", "test", "--save-results"]).unwrap();
        let Commands::Test(args) = cli.command else { panic!("expected test") };

        let cfg = TestConfig::from(args);
        assert_eq!(cfg.epoch, None);
        assert_eq!(cfg.split, "dev");
        assert!(cfg.save_results);
    }
}
