// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, traits and logic for the core concepts:
// problems, equations, scores and result rows.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and functions
//
// The Score Evaluator lives here because it is plain
// arithmetic; it is exercised by ml::validator.

// A labelled math word problem
pub mod problem;

// Placeholder substitution and expression evaluation
pub mod equation;

// Correctness scoring of decoded equations
pub mod score;

// One row of the test-mode results table
pub mod result_record;

// Core abstractions (traits) that other layers implement
pub mod traits;
