// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// `clap` and delegates all work to Layer 2 (application).
//
// Two commands are supported:
//   1. `train` - trains a model on a dataset
//   2. `test`  - scores a saved checkpoint on a split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TestArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "mwp-transformer",
    version = "0.1.0",
    about = "Train a seq2seq transformer that turns math word problems into equations."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case. This layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Test(args)  => run_test(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on dataset '{}' in '{}'", args.dataset, args.data_dir);

    let best = TrainUseCase::new(args.into()).execute()?;

    println!("Training complete. Best validation accuracy: {:.2}%", best * 100.0);
    Ok(())
}

fn run_test(args: TestArgs) -> Result<()> {
    use crate::application::test_use_case::TestUseCase;

    let score = TestUseCase::new(args.into()).execute()?;

    println!("\nTest accuracy: {:.2}%", score * 100.0);
    Ok(())
}
