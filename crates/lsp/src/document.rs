// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Document Management
//!
//! This module provides document management for the LSP server.
//!
//! ## Overview
//!
//! The document store handles:
//! - Multiple open documents identified by URI
//! - Document synchronization (open, change, close)
//! - Text content management using Ropey for efficient edits
//! - Versioned snapshots for the formatting pipeline
//!
//! ## Snapshots
//!
//! The formatting handler works on an immutable `(text, version)` snapshot
//! taken before any await point; the version token travels with the computed
//! edit batch so a result for a superseded snapshot can be detected and
//! discarded rather than applied to a buffer it was not computed against.

use ropey::Rope;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url, VersionedTextDocumentIdentifier};

/// Document metadata
///
/// Contains information about an open document.
#[derive(Debug, Clone)]
pub struct DocumentMetadata {
    /// Document URI
    pub uri: Url,

    /// Language identifier (e.g., "sql")
    pub language_id: String,

    /// Document version, incremented by the client on each change
    pub version: i32,

    /// Line count
    pub line_count: usize,
}

/// A document managed by the LSP server
///
/// Contains the document's content and metadata.
/// Uses Ropey for efficient text manipulation.
#[derive(Debug, Clone)]
pub struct Document {
    /// Document metadata
    metadata: DocumentMetadata,

    /// Document content as a rope for efficient editing
    content: Rope,
}

impl Document {
    /// Create a new document
    pub fn new(uri: Url, content: String, version: i32, language_id: String) -> Self {
        let rope = Rope::from_str(&content);
        let line_count = rope.len_lines();

        Self {
            metadata: DocumentMetadata {
                uri,
                language_id,
                version,
                line_count,
            },
            content: rope,
        }
    }

    /// Get the document URI
    pub fn uri(&self) -> &Url {
        &self.metadata.uri
    }

    /// Get the document language ID
    pub fn language_id(&self) -> &str {
        &self.metadata.language_id
    }

    /// Get the document version
    pub fn version(&self) -> i32 {
        self.metadata.version
    }

    /// Get the line count
    pub fn line_count(&self) -> usize {
        self.metadata.line_count
    }

    /// Get the full document content as a string
    pub fn get_content(&self) -> String {
        self.content.to_string()
    }

    /// Take an immutable `(text, version)` snapshot of the document
    pub fn snapshot(&self) -> (String, i32) {
        (self.content.to_string(), self.metadata.version)
    }

    /// Apply content changes to the document
    ///
    /// # Arguments
    ///
    /// - `changes`: List of content changes
    /// - `new_version`: New document version
    pub fn apply_changes(
        &mut self,
        changes: &[TextDocumentContentChangeEvent],
        new_version: i32,
    ) -> Result<(), DocumentError> {
        for change in changes {
            match &change.range {
                Some(range) => {
                    // Incremental change
                    let start_line = range.start.line as usize;
                    let start_col = range.start.character as usize;
                    let end_line = range.end.line as usize;
                    let end_col = range.end.character as usize;

                    if start_line >= self.content.len_lines() || end_line >= self.content.len_lines()
                    {
                        return Err(DocumentError::InvalidRange {
                            start: (start_line, start_col),
                            end: (end_line, end_col),
                        });
                    }

                    let start_char = self.content.line_to_char(start_line) + start_col;
                    let end_char = self.content.line_to_char(end_line) + end_col;

                    if start_char > end_char || end_char > self.content.len_chars() {
                        return Err(DocumentError::InvalidRange {
                            start: (start_line, start_col),
                            end: (end_line, end_col),
                        });
                    }

                    self.content.remove(start_char..end_char);
                    self.content.insert(start_char, &change.text);
                }
                None => {
                    // Full document change
                    self.content = Rope::from_str(&change.text);
                }
            }
        }

        self.metadata.version = new_version;
        self.metadata.line_count = self.content.len_lines();

        Ok(())
    }

    /// Get document metadata
    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }
}

/// Document store for managing multiple documents
///
/// Thread-safe store for all open documents across all client connections.
#[derive(Debug, Default)]
pub struct DocumentStore {
    /// Map of document URI to document
    documents: Arc<RwLock<HashMap<Url, Document>>>,
}

impl DocumentStore {
    /// Create a new document store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a document
    pub async fn open_document(
        &self,
        uri: Url,
        content: String,
        version: i32,
        language_id: String,
    ) {
        let mut docs = self.documents.write().await;
        let document = Document::new(uri.clone(), content, version, language_id);
        docs.insert(uri, document);
    }

    /// Close a document
    ///
    /// # Returns
    ///
    /// true if the document was closed, false if it didn't exist
    pub async fn close_document(&self, uri: &Url) -> bool {
        let mut docs = self.documents.write().await;
        docs.remove(uri).is_some()
    }

    /// Update a document
    ///
    /// # Arguments
    ///
    /// - `identifier`: Document identifier with version
    /// - `changes`: Content changes
    pub async fn update_document(
        &self,
        identifier: &VersionedTextDocumentIdentifier,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Result<(), DocumentError> {
        let mut docs = self.documents.write().await;

        let document = docs
            .get_mut(&identifier.uri)
            .ok_or_else(|| DocumentError::DocumentNotFound(identifier.uri.clone()))?;

        document.apply_changes(changes, identifier.version)?;

        Ok(())
    }

    /// Get a document by URI
    pub async fn get_document(&self, uri: &Url) -> Option<Document> {
        let docs = self.documents.read().await;
        docs.get(uri).cloned()
    }

    /// Take a `(text, version)` snapshot of a document
    pub async fn snapshot(&self, uri: &Url) -> Option<(String, i32)> {
        let docs = self.documents.read().await;
        docs.get(uri).map(Document::snapshot)
    }

    /// Current version of a document, if open
    pub async fn version(&self, uri: &Url) -> Option<i32> {
        let docs = self.documents.read().await;
        docs.get(uri).map(Document::version)
    }

    /// Check if a document exists
    pub async fn has_document(&self, uri: &Url) -> bool {
        let docs = self.documents.read().await;
        docs.contains_key(uri)
    }

    /// Get all document URIs
    pub async fn list_uris(&self) -> Vec<Url> {
        let docs = self.documents.read().await;
        docs.keys().cloned().collect()
    }

    /// Get the number of open documents
    pub async fn document_count(&self) -> usize {
        let docs = self.documents.read().await;
        docs.len()
    }
}

/// Document-related errors
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(Url),

    /// Invalid range for text operation
    #[error("Invalid range: start={start:?}, end={end:?}")]
    InvalidRange {
        start: (usize, usize),
        end: (usize, usize),
    },
}
