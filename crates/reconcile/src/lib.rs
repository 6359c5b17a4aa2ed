// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Diff-to-Edit Reconciliation
//!
//! This crate converts a "before/after whole-text" pair into the minimal set
//! of incremental edits between them, expressed in the coordinates of the
//! original document.
//!
//! ## Overview
//!
//! The external formatter returns a complete reformatted document. Replacing
//! the whole buffer with it would destroy cursor position, selection, scroll
//! offset, and undo granularity in the editor. Instead, the reconciliation
//! pipeline computes where exactly the two texts differ and emits a small,
//! position-accurate edit list the client can apply in place.
//!
//! ## Architecture
//!
//! ```text
//! (original, formatted)
//!        ↓
//!   Diff Engine ───→ Vec<DiffOp>        (diff)
//!        ↓
//!   Edit Synthesizer ←─ LineIndex      (edit, line_index)
//!        ↓
//!   EditBatch { edits, version }
//! ```
//!
//! All stages are pure synchronous functions over immutable snapshots; there
//! is no shared state and reconciliation for different documents can run in
//! parallel without coordination.
//!
//! ## Correctness contract
//!
//! Applying every edit of a returned [`EditBatch`] to the original buffer
//! simultaneously, using original-buffer coordinates for every edit, yields
//! the formatted buffer exactly. [`reconcile`] verifies this before
//! returning; a batch that fails verification is never handed out.
//!
//! ## Example
//!
//! ```rust
//! use trino_sql_lsp_reconcile::reconcile;
//!
//! let original = "SELECT a,b FROM t";
//! let formatted = "SELECT a, b\nFROM t";
//! let batch = reconcile(original, formatted, 7).unwrap();
//!
//! assert_eq!(batch.version, 7);
//! assert!(!batch.edits.is_empty());
//! ```

pub mod diff;
pub mod edit;
pub mod error;
pub mod line_index;

pub use diff::{DiffLimit, DiffOp, diff, diff_with_limit};
pub use edit::{EditBatch, apply_edits, reconcile, synthesize};
pub use error::ReconcileError;
pub use line_index::LineIndex;
