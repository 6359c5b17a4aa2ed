// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Formatting Pipeline
//!
//! Bridges the formatting request handler and the reconciliation core.
//!
//! ## Flow
//!
//! ```text
//! (snapshot text, version) ──→ parse/format service ──→ formatted text
//!            │                                               │
//!            └────────────── reconcile ←─────────────────────┘
//!                                │
//!                       EditBatch { edits, version }
//! ```
//!
//! The service call happens in the backend before this module is invoked;
//! reconciliation itself is pure and synchronous. The version token on the
//! returned batch is what the handler compares against the live document
//! after its await points: the user may have kept typing while the service
//! round trip was in flight, and a batch computed against a superseded
//! snapshot must be dropped, not applied.

use tracing::{debug, error};
use trino_sql_lsp_reconcile::{EditBatch, ReconcileError, reconcile};

/// Compute the edit batch turning `snapshot_text` into `formatted`.
///
/// An `InvariantViolation` from the core is a logic defect; it propagates so
/// the handler can discard the attempt instead of applying a half-correct
/// batch.
pub fn formatting_edits(
    snapshot_text: &str,
    snapshot_version: i32,
    formatted: &str,
) -> Result<EditBatch, ReconcileError> {
    let batch = reconcile(snapshot_text, formatted, snapshot_version)?;
    debug!(
        "Reconciled formatter output: edits={}, version={}",
        batch.edits.len(),
        batch.version
    );
    Ok(batch)
}

/// True when `batch` was computed against a snapshot the live document has
/// moved past. `None` means the document was closed mid-flight; that is
/// stale too.
pub fn batch_is_stale(batch: &EditBatch, live_version: Option<i32>) -> bool {
    match live_version {
        Some(version) => version != batch.version,
        None => true,
    }
}

/// Map a reconciliation failure to "no edits available", logging it.
///
/// The client keeps its buffer untouched in that case; a wrong edit set is
/// never an acceptable substitute.
pub fn discard_on_failure(result: Result<EditBatch, ReconcileError>) -> Option<EditBatch> {
    match result {
        Ok(batch) => Some(batch),
        Err(e) => {
            error!("Discarding formatting result: {e}");
            None
        }
    }
}
