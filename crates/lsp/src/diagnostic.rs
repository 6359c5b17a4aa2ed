// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Diagnostics
//!
//! Converts parse failures reported by the external service into LSP
//! diagnostics.
//!
//! ## Overview
//!
//! The service reports at most one parse error per request, with a 1-based
//! row and 0-based column into the submitted text. It becomes a zero-width
//! error diagnostic at that position. A clean parse publishes an empty list
//! so stale squiggles are cleared.

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::service::{ParseResponse, ServiceParseError};

/// Diagnostic source tag shown next to the message in the editor
pub const DIAGNOSTIC_SOURCE: &str = "Query Engine";

/// Convert a service parse error to an LSP diagnostic.
///
/// The service's row is 1-based; LSP lines are 0-based.
pub fn parse_error_diagnostic(error: &ServiceParseError) -> Diagnostic {
    let position = Position {
        line: error.row.saturating_sub(1),
        character: error.column,
    };

    Diagnostic {
        range: Range {
            start: position,
            end: position,
        },
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: error.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Diagnostics to publish for a parse response, capped at `max_problems`.
pub fn collect_diagnostics(response: &ParseResponse, max_problems: usize) -> Vec<Diagnostic> {
    response
        .parse_error
        .iter()
        .map(parse_error_diagnostic)
        .take(max_problems)
        .collect()
}
