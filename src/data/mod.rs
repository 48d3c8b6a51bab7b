// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from dataset files to encoded tensor batches:
//
//   train.json / dev.json
//       │
//       ▼
//   JsonProblemLoader → MathProblem records (cleaned)
//       │
//       ▼
//   split_train_val   → dev split when dev.json is missing
//       │
//       ▼
//   ProblemDataset    → Burn Dataset
//       │
//       ▼
//   ProblemBatcher    → ProblemBatch (raw strings, numbers, answers)
//       │
//       ▼
//   sents_to_idx + process_batch → EncodedBatch tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Loads dataset splits from JSON
pub mod loader;

/// Normalises question and equation text
pub mod preprocessor;

/// Burn Dataset over MathProblems
pub mod dataset;

/// Burn Batcher producing raw ProblemBatches
pub mod batcher;

/// Vocabularies, sents_to_idx and process_batch
pub mod vocab;

/// Seeded train/dev split
pub mod splitter;
