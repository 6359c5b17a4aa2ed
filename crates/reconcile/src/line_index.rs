// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Coordinate Mapper
//!
//! Converts linear character offsets within one buffer snapshot into
//! zero-based line/column positions and back.
//!
//! A [`LineIndex`] is built once per original-buffer snapshot with a single
//! scan and reused for every lookup within one reconciliation call. `\r\n`
//! counts as one line break, as does a lone `\r` or `\n`; this matches the
//! line counting the LSP client applies to the same text.

use lsp_types::Position;

use crate::error::ReconcileError;

/// Line-start table for one immutable text snapshot.
///
/// Offsets are character indices (not bytes); `len_chars` itself is a valid
/// end-of-document offset.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Character offset of the first character of each line, ascending.
    /// Always starts with 0.
    line_starts: Vec<usize>,

    /// Total character count of the indexed buffer
    len_chars: usize,
}

impl LineIndex {
    /// Scan `text` once and record the offset following each line break.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let mut offset = 0;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            offset += 1;
            match c {
                '\n' => line_starts.push(offset),
                '\r' => {
                    // \r\n is a single break
                    if chars.peek() == Some(&'\n') {
                        chars.next();
                        offset += 1;
                    }
                    line_starts.push(offset);
                }
                _ => {}
            }
        }

        Self {
            line_starts,
            len_chars: offset,
        }
    }

    /// Character length of the indexed buffer
    pub fn len_chars(&self) -> usize {
        self.len_chars
    }

    /// Number of lines in the indexed buffer
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Resolve a character offset to a line/column position.
    ///
    /// `offset == len_chars` is valid and yields the position immediately
    /// after the last character.
    pub fn offset_to_position(&self, offset: usize) -> Result<Position, ReconcileError> {
        if offset > self.len_chars {
            return Err(ReconcileError::InvalidOffset {
                offset,
                len: self.len_chars,
            });
        }

        // Greatest line start <= offset
        let line = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let character = offset - self.line_starts[line];

        Ok(Position {
            line: line as u32,
            character: character as u32,
        })
    }

    /// Resolve a line/column position back to a character offset.
    pub fn position_to_offset(&self, position: Position) -> Result<usize, ReconcileError> {
        let invalid = || ReconcileError::InvalidPosition {
            line: position.line,
            character: position.character,
        };

        let line = position.line as usize;
        let line_start = *self.line_starts.get(line).ok_or_else(invalid)?;
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.len_chars);

        let offset = line_start + position.character as usize;
        if offset > line_end {
            return Err(invalid());
        }

        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn test_offset_to_position_basic() {
        let index = LineIndex::new("a\nb");

        assert_eq!(index.offset_to_position(0).unwrap(), pos(0, 0));
        assert_eq!(index.offset_to_position(1).unwrap(), pos(0, 1));
        assert_eq!(index.offset_to_position(2).unwrap(), pos(1, 0));
        // End-of-document offset is valid
        assert_eq!(index.offset_to_position(3).unwrap(), pos(1, 1));
    }

    #[test]
    fn test_offset_out_of_range() {
        let index = LineIndex::new("a\nb");
        assert!(matches!(
            index.offset_to_position(4),
            Err(ReconcileError::InvalidOffset { offset: 4, len: 3 })
        ));
    }

    #[test]
    fn test_empty_buffer() {
        let index = LineIndex::new("");
        assert_eq!(index.len_chars(), 0);
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.offset_to_position(0).unwrap(), pos(0, 0));
        assert!(index.offset_to_position(1).is_err());
    }

    #[test]
    fn test_crlf_is_one_break() {
        let index = LineIndex::new("ab\r\ncd");

        assert_eq!(index.line_count(), 2);
        assert_eq!(index.offset_to_position(4).unwrap(), pos(1, 0));
        // Offset of the \n inside the pair still belongs to the first line
        assert_eq!(index.offset_to_position(3).unwrap(), pos(0, 3));
    }

    #[test]
    fn test_lone_cr_is_one_break() {
        let index = LineIndex::new("ab\rcd\ref");

        assert_eq!(index.line_count(), 3);
        assert_eq!(index.offset_to_position(3).unwrap(), pos(1, 0));
        assert_eq!(index.offset_to_position(6).unwrap(), pos(2, 0));
    }

    #[test]
    fn test_mixed_line_endings() {
        let index = LineIndex::new("a\nb\r\nc\rd");

        assert_eq!(index.line_count(), 4);
        assert_eq!(index.offset_to_position(2).unwrap(), pos(1, 0));
        assert_eq!(index.offset_to_position(5).unwrap(), pos(2, 0));
        assert_eq!(index.offset_to_position(7).unwrap(), pos(3, 0));
    }

    #[test]
    fn test_trailing_newline() {
        let index = LineIndex::new("a\n");

        assert_eq!(index.line_count(), 2);
        assert_eq!(index.offset_to_position(2).unwrap(), pos(1, 0));
    }

    #[test]
    fn test_position_to_offset_round_trip() {
        let text = "SELECT *\nFROM users\r\nWHERE id = 1";
        let index = LineIndex::new(text);

        for offset in 0..=index.len_chars() {
            let position = index.offset_to_position(offset).unwrap();
            assert_eq!(index.position_to_offset(position).unwrap(), offset);
        }
    }

    #[test]
    fn test_position_to_offset_invalid() {
        let index = LineIndex::new("ab\ncd");

        assert!(index.position_to_offset(Position { line: 2, character: 0 }).is_err());
        assert!(
            index
                .position_to_offset(Position { line: 1, character: 3 })
                .is_err()
        );
    }

    #[test]
    fn test_multibyte_characters_count_as_one() {
        let index = LineIndex::new("héllo\nwörld");

        assert_eq!(index.len_chars(), 11);
        assert_eq!(index.offset_to_position(6).unwrap(), pos(1, 0));
        assert_eq!(index.offset_to_position(11).unwrap(), pos(1, 5));
    }
}
