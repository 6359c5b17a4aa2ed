// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Errors produced by the reconciliation pipeline.

/// Reconciliation errors
///
/// `InvalidOffset` and `InvalidPosition` indicate a caller bug (a coordinate
/// outside the buffer), not a data problem. `InvariantViolation` means a
/// synthesized edit batch failed the reconstruction check; it is fatal to the
/// reconciliation call and the batch must be discarded, never applied
/// partially.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Offset outside `[0, len]` for the buffer it was resolved against
    #[error("offset {offset} is out of range for a buffer of {len} characters")]
    InvalidOffset { offset: usize, len: usize },

    /// Position that does not exist in the buffer
    #[error("position {line}:{character} is outside the buffer")]
    InvalidPosition { line: u32, character: u32 },

    /// Simultaneous application of the batch did not reconstruct the
    /// candidate text
    #[error("edit batch failed verification: {reason}")]
    InvariantViolation { reason: String },
}
