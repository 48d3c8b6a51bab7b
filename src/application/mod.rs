// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers to accomplish one goal each:
// training a model, or scoring a saved checkpoint.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No file formats here (that's Layer 4 and 6)
//   - Only workflow coordination

// The training workflow
pub mod train_use_case;

// The checkpoint evaluation workflow
pub mod test_use_case;
