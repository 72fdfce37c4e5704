//! Cross-crate scenarios for the atto workspace.
//!
//! No library code; see `tests/` for the end-to-end scenarios covering boot,
//! propagation, gain conservation and dynamic topology together.
