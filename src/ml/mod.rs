// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All model, optimisation and evaluation code:
//
//   seq2seq.rs   - the model contract (forward, greedy_decode)
//                  and the teacher-forcing split
//
//   model.rs     - transformer encoder-decoder implementing it
//
//   builder.rs   - model / optimizer / scheduler construction
//
//   schedule.rs  - epoch-level learning-rate schedules
//
//   clip.rs      - global gradient-norm clipping
//
//   validator.rs - greedy decoding + scoring over a split
//
//   trainer.rs   - the epoch loop, early stopping, checkpoint
//                  selection
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)
//            Vaswani et al. (2017) Attention Is All You Need

/// Seq2Seq model interface
pub mod seq2seq;

/// Transformer encoder-decoder
pub mod model;

/// Model and optimizer builder
pub mod builder;

/// Learning-rate schedules
pub mod schedule;

/// Global gradient-norm clipping
pub mod clip;

/// Validation runner
pub mod validator;

/// Training loop with early stopping and checkpointing
pub mod trainer;
