// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Edit Synthesizer
//!
//! Turns an alignment from the diff engine into an ordered list of
//! [`TextEdit`]s anchored in original-document coordinates, and verifies the
//! result before it leaves the crate.
//!
//! ## Coordinate rule
//!
//! The cursor only advances for `Equal` and `Delete` fragments. An `Insert`
//! consumes none of the original buffer, so it becomes a zero-width edit at
//! the current cursor and leaves the cursor in place. This is what lets every
//! edit in the batch be expressed against the same unmodified snapshot.

use lsp_types::{Range, TextEdit};

use crate::diff::{DiffOp, diff};
use crate::error::ReconcileError;
use crate::line_index::LineIndex;

/// An ordered, non-overlapping list of edits plus the version of the
/// original-buffer snapshot it was computed against.
///
/// The version token lets the session layer detect that the live document
/// has moved on and discard the batch instead of corrupting the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBatch {
    /// Edits sorted by start position, pairwise non-overlapping
    pub edits: Vec<TextEdit>,

    /// LSP version of the snapshot the edits target
    pub version: i32,
}

impl EditBatch {
    /// True when applying this batch would change nothing
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}

/// Synthesize edits from an alignment.
///
/// Single forward pass with a monotonically non-decreasing cursor; no
/// backtracking. A `Delete` immediately followed by an `Insert` at the same
/// cursor collapses into one replace-style edit.
pub fn synthesize(ops: &[DiffOp], index: &LineIndex) -> Result<Vec<TextEdit>, ReconcileError> {
    let mut edits: Vec<TextEdit> = Vec::new();
    let mut cursor = 0usize;
    // Cursor value right after the most recent delete, if the op before the
    // current one was a delete
    let mut pending_delete_at: Option<usize> = None;

    for op in ops {
        match op {
            DiffOp::Equal(text) => {
                cursor += text.chars().count();
                pending_delete_at = None;
            }
            DiffOp::Delete(text) => {
                let len = text.chars().count();
                let start = index.offset_to_position(cursor)?;
                let end = index.offset_to_position(cursor + len)?;
                edits.push(TextEdit {
                    range: Range { start, end },
                    new_text: String::new(),
                });
                cursor += len;
                pending_delete_at = Some(cursor);
            }
            DiffOp::Insert(text) => {
                if pending_delete_at == Some(cursor)
                    && let Some(last) = edits.last_mut()
                {
                    // Replace: reuse the delete's range
                    last.new_text.clone_from(text);
                } else {
                    let at = index.offset_to_position(cursor)?;
                    edits.push(TextEdit {
                        range: Range { start: at, end: at },
                        new_text: text.clone(),
                    });
                }
                pending_delete_at = None;
            }
        }
    }

    Ok(edits)
}

/// Apply `edits` to `original` simultaneously, resolving every range against
/// the original snapshot's coordinates.
///
/// Rejects unsorted or overlapping batches. Used for the verification pass
/// in [`reconcile`] and by tests; the editor client performs the equivalent
/// application on its side.
pub fn apply_edits(
    original: &str,
    edits: &[TextEdit],
    index: &LineIndex,
) -> Result<String, ReconcileError> {
    let chars: Vec<char> = original.chars().collect();
    let mut out = String::with_capacity(original.len());
    let mut last = 0usize;

    for edit in edits {
        let start = index.position_to_offset(edit.range.start)?;
        let end = index.position_to_offset(edit.range.end)?;

        if end < start {
            return Err(ReconcileError::InvariantViolation {
                reason: format!("edit range crosses itself: {start}..{end}"),
            });
        }
        if start < last {
            return Err(ReconcileError::InvariantViolation {
                reason: format!("edits overlap or are unsorted at offset {start}"),
            });
        }

        out.extend(&chars[last..start]);
        out.push_str(&edit.new_text);
        last = end;
    }
    out.extend(&chars[last..]);

    Ok(out)
}

/// Reconcile a formatted candidate against the original snapshot it was
/// produced from.
///
/// Runs the full pipeline (diff → synthesize) and re-applies the batch to
/// check that it reconstructs `candidate` exactly. A failed check is an
/// internal logic defect and surfaces as [`ReconcileError::InvariantViolation`]
/// rather than a partial or guessed batch.
pub fn reconcile(
    original: &str,
    candidate: &str,
    version: i32,
) -> Result<EditBatch, ReconcileError> {
    let ops = diff(original, candidate);
    let index = LineIndex::new(original);
    let edits = synthesize(&ops, &index)?;

    let rebuilt = apply_edits(original, &edits, &index)?;
    if rebuilt != candidate {
        return Err(ReconcileError::InvariantViolation {
            reason: "applied batch does not reconstruct the candidate".to_string(),
        });
    }

    Ok(EditBatch { edits, version })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::Position;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn test_identity_yields_no_edits() {
        let batch = reconcile("SELECT 1", "SELECT 1", 1).unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.version, 1);
    }

    #[test]
    fn test_empty_to_nonempty() {
        let batch = reconcile("", "x", 1).unwrap();

        assert_eq!(batch.edits.len(), 1);
        let edit = &batch.edits[0];
        assert_eq!(edit.range.start, pos(0, 0));
        assert_eq!(edit.range.end, pos(0, 0));
        assert_eq!(edit.new_text, "x");
    }

    #[test]
    fn test_nonempty_to_empty() {
        let batch = reconcile("x", "", 1).unwrap();

        assert_eq!(batch.edits.len(), 1);
        let edit = &batch.edits[0];
        assert_eq!(edit.range.start, pos(0, 0));
        assert_eq!(edit.range.end, pos(0, 1));
        assert_eq!(edit.new_text, "");
    }

    #[test]
    fn test_insert_is_zero_width() {
        let ops = vec![
            DiffOp::Equal("ab".to_string()),
            DiffOp::Insert("X".to_string()),
            DiffOp::Equal("cd".to_string()),
        ];
        let index = LineIndex::new("abcd");
        let edits = synthesize(&ops, &index).unwrap();

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range.start, pos(0, 2));
        assert_eq!(edits[0].range.end, pos(0, 2));
        assert_eq!(edits[0].new_text, "X");
    }

    #[test]
    fn test_delete_then_insert_merges_into_replace() {
        let ops = vec![
            DiffOp::Equal("a".to_string()),
            DiffOp::Delete("b".to_string()),
            DiffOp::Insert("XY".to_string()),
            DiffOp::Equal("c".to_string()),
        ];
        let index = LineIndex::new("abc");
        let edits = synthesize(&ops, &index).unwrap();

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].range.start, pos(0, 1));
        assert_eq!(edits[0].range.end, pos(0, 2));
        assert_eq!(edits[0].new_text, "XY");
    }

    #[test]
    fn test_insert_after_equal_does_not_merge() {
        let ops = vec![
            DiffOp::Delete("ab".to_string()),
            DiffOp::Equal("cd".to_string()),
            DiffOp::Insert("X".to_string()),
        ];
        let index = LineIndex::new("abcd");
        let edits = synthesize(&ops, &index).unwrap();

        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].new_text, "");
        assert_eq!(edits[1].range.start, pos(0, 4));
        assert_eq!(edits[1].new_text, "X");
    }

    #[test]
    fn test_localized_change() {
        let original = "SELECT a,b FROM t";
        let candidate = "SELECT a, b\nFROM t";
        let batch = reconcile(original, candidate, 3).unwrap();

        // A space inserted after the comma, and the space before FROM
        // replaced with a newline; never a whole-buffer replace
        assert_eq!(batch.edits.len(), 2);

        let insert = &batch.edits[0];
        assert_eq!(insert.range.start, pos(0, 9));
        assert_eq!(insert.range.end, pos(0, 9));
        assert_eq!(insert.new_text, " ");

        let replace = &batch.edits[1];
        assert_eq!(replace.range.start, pos(0, 10));
        assert_eq!(replace.range.end, pos(0, 11));
        assert_eq!(replace.new_text, "\n");
    }

    #[test]
    fn test_edits_sorted_and_non_overlapping() {
        let original = "select a, b, c from t where a = 1 and b = 2";
        let candidate = "SELECT a,\n  b,\n  c\nFROM t\nWHERE a = 1\n  AND b = 2";
        let batch = reconcile(original, candidate, 1).unwrap();

        let index = LineIndex::new(original);
        let mut last_end = 0usize;
        for edit in &batch.edits {
            let start = index.position_to_offset(edit.range.start).unwrap();
            let end = index.position_to_offset(edit.range.end).unwrap();
            assert!(start <= end);
            assert!(last_end <= start, "edits must not overlap");
            last_end = end;
        }
    }

    #[test]
    fn test_apply_edits_rejects_overlap() {
        let index = LineIndex::new("abcdef");
        let edits = vec![
            TextEdit {
                range: Range {
                    start: pos(0, 0),
                    end: pos(0, 3),
                },
                new_text: "x".to_string(),
            },
            TextEdit {
                range: Range {
                    start: pos(0, 2),
                    end: pos(0, 4),
                },
                new_text: "y".to_string(),
            },
        ];

        assert!(matches!(
            apply_edits("abcdef", &edits, &index),
            Err(ReconcileError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_multiline_round_trip() {
        let original = "select *\r\nfrom users\r\nwhere id=1";
        let candidate = "SELECT *\nFROM users\nWHERE id = 1";
        let batch = reconcile(original, candidate, 9).unwrap();

        let index = LineIndex::new(original);
        assert_eq!(apply_edits(original, &batch.edits, &index).unwrap(), candidate);
    }
}
