// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that several layers rely on:
//
//   checkpoint.rs - model weights (Burn CompactRecorder),
//                   vocabularies, best-epoch pointer,
//                   train_config.json and session.json
//
//   metrics.rs    - per-epoch metrics.csv
//
//   results.rs    - test-mode results table CSV
//
// Reference: Burn Book §5 (Checkpointing)

/// Checkpoint Record saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Test-mode results export
pub mod results;
