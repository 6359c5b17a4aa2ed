// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # LSP Backend Implementation
//!
//! This module provides the main LSP server backend using tower-lsp.
//!
//! ## Overview
//!
//! The backend handles:
//! - LSP protocol communication via tower-lsp
//! - Document lifecycle (open, change, close)
//! - Validation through the external parse/format service
//! - Completion relaying and document formatting
//!
//! ## Architecture
//!
//! ```text
//! Client → LSP Backend → Document Store
//!                ↓
//!         Parse/Format Service (HTTP)
//!                ↓
//!      Diagnostics · Completion · Reconcile
//! ```
//!
//! ## Supported LSP features
//!
//! - textDocument/didOpen, didChange, didClose
//! - textDocument/completion (service suggestions)
//! - textDocument/formatting (reconciled incremental edits)
//! - workspace/didChangeConfiguration

use std::sync::Arc;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{error, info, warn};

use crate::config::ServerSettings;
use crate::diagnostic::collect_diagnostics;
use crate::document::DocumentStore;
use crate::formatting::{batch_is_stale, discard_on_failure, formatting_edits};
use crate::service::ParseService;

/// LSP backend implementation
///
/// Main entry point for all LSP protocol operations.
/// Uses tower-lsp framework for protocol handling.
pub struct LspBackend {
    /// LSP client for sending notifications and requests
    client: Client,

    /// Document store for managing open documents
    documents: Arc<DocumentStore>,

    /// Server settings, replaced when the client pushes configuration
    settings: Arc<RwLock<Option<ServerSettings>>>,

    /// Client for the external parse/format service
    service: ParseService,
}

impl LspBackend {
    /// Create a new LSP backend
    ///
    /// # Arguments
    ///
    /// - `client`: LSP client handle
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DocumentStore::new()),
            settings: Arc::new(RwLock::new(None)),
            service: ParseService::new(),
        }
    }

    /// Get the document store
    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    /// Current settings, or the runtime fallback before any arrived
    pub async fn settings_or_fallback(&self) -> ServerSettings {
        match self.settings.read().await.clone() {
            Some(settings) => settings,
            None => ServerSettings::default_runtime_fallback(),
        }
    }

    /// Replace the server settings
    pub async fn set_settings(&self, settings: ServerSettings) {
        info!("Settings updated: endpoint={}", settings.endpoint);
        *self.settings.write().await = Some(settings);
    }

    /// Log a message to the client
    async fn log_message(&self, message: &str, message_type: MessageType) {
        self.client.log_message(message_type, message).await;
    }

    /// Run a document through the parse service and publish the resulting
    /// diagnostics.
    ///
    /// A clean parse publishes an empty list so earlier squiggles clear. A
    /// service failure publishes nothing at all: without a fresh verdict the
    /// previous diagnostics are better than a false all-clear.
    async fn validate_document(&self, uri: Url) {
        let Some((text, _version)) = self.documents.snapshot(&uri).await else {
            warn!("Document not found for validation: {}", uri);
            return;
        };

        let settings = self.settings_or_fallback().await;
        match self.service.parse(&settings, &text).await {
            Ok(response) => {
                let diagnostics =
                    collect_diagnostics(&response, settings.max_number_of_problems);
                self.client
                    .publish_diagnostics(uri, diagnostics, None)
                    .await;
            }
            Err(e) => {
                warn!("Validation skipped, parse service unavailable: {}", e);
            }
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LspBackend {
    /// Initialize the LSP server
    ///
    /// Called when the client starts the server.
    /// Returns server capabilities and configuration.
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("Initializing LSP server");
        info!("Client info: {:?}", params.client_info);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Text synchronization
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),

                // Completion from service suggestions
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions {
                        work_done_progress: Some(false),
                    },
                    all_commit_characters: None,
                    completion_item: None,
                }),

                // Whole-document formatting through the external service
                document_formatting_provider: Some(OneOf::Left(true)),

                workspace: Some(WorkspaceServerCapabilities {
                    workspace_folders: Some(WorkspaceFoldersServerCapabilities {
                        supported: Some(false),
                        change_notifications: Some(OneOf::Left(false)),
                    }),
                    ..Default::default()
                }),

                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: crate::SERVER_NAME.to_string(),
                version: Some(crate::VERSION.to_string()),
            }),
        })
    }

    /// Initialized notification
    ///
    /// Called after `initialize` completes successfully.
    async fn initialized(&self, _params: InitializedParams) {
        info!("LSP server initialized successfully");

        self.log_message("Trino SQL LSP server ready", MessageType::INFO)
            .await;
    }

    /// Shutdown the LSP server
    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down LSP server");
        Ok(())
    }

    /// Document opened notification
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.clone();

        info!(
            "Document opened: uri={}, language={}, version={}",
            uri, doc.language_id, doc.version
        );

        self.documents
            .open_document(uri.clone(), doc.text, doc.version, doc.language_id)
            .await;

        self.validate_document(uri).await;
    }

    /// Document changed notification
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let identifier = params.text_document;
        let uri = identifier.uri.clone();
        let changes = params.content_changes;

        info!(
            "Document changed: uri={}, version={}, changes={}",
            uri,
            identifier.version,
            changes.len()
        );

        match self.documents.update_document(&identifier, &changes).await {
            Ok(()) => self.validate_document(uri).await,
            Err(e) => {
                error!("Failed to update document: {}", e);
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to update document: {e}"),
                    )
                    .await;
            }
        }
    }

    /// Document closed notification
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        info!("Document closed: uri={}", uri);

        if self.documents.close_document(&uri).await {
            // Clear diagnostics for the closed document
            self.client.publish_diagnostics(uri, Vec::new(), None).await;
        } else {
            warn!("Document not found for close: {}", uri);
        }
    }

    /// Completion request
    ///
    /// Relays the parse service's suggestions for the whole document; the
    /// service does not use the cursor position.
    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;

        info!("Completion requested: uri={}", uri);

        let Some((text, _version)) = self.documents.snapshot(&uri).await else {
            warn!("Document not found for completion: {}", uri);
            return Ok(None);
        };

        let settings = self.settings_or_fallback().await;
        match self.service.parse(&settings, &text).await {
            Ok(response) => {
                let items: Vec<CompletionItem> = response
                    .suggestions
                    .into_iter()
                    .map(|suggestion| CompletionItem {
                        label: suggestion,
                        kind: Some(CompletionItemKind::TEXT),
                        ..Default::default()
                    })
                    .collect();

                info!("Completion returned {} items", items.len());
                Ok(Some(CompletionResponse::Array(items)))
            }
            Err(e) => {
                warn!("Completion unavailable: {}", e);
                Ok(None)
            }
        }
    }

    /// Document formatting request
    ///
    /// Sends the current snapshot to the parse service and reconciles the
    /// reformatted text into incremental edits against that snapshot. A
    /// batch whose snapshot the live document has moved past is discarded;
    /// "latest snapshot wins".
    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        info!("Document formatting requested: uri={}", uri);

        let Some((text, version)) = self.documents.snapshot(&uri).await else {
            warn!("Document not found for formatting: {}", uri);
            return Ok(None);
        };

        let settings = self.settings_or_fallback().await;
        let response = match self.service.parse(&settings, &text).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Formatting unavailable: {}", e);
                return Ok(None);
            }
        };

        if let Some(parse_error) = &response.parse_error {
            // Malformed input cannot be formatted; diagnostics carry the news
            info!("Formatting refused, input does not parse: {}", parse_error.message);
            return Ok(None);
        }

        let Some(batch) =
            discard_on_failure(formatting_edits(&text, version, &response.formatted_sql))
        else {
            return Ok(None);
        };

        // The document may have changed while the service round trip was in
        // flight
        if batch_is_stale(&batch, self.documents.version(&uri).await) {
            info!("Discarding stale formatting result for {}", uri);
            return Ok(None);
        }

        if batch.is_empty() {
            return Ok(None);
        }

        Ok(Some(batch.edits))
    }

    /// Configuration change notification
    ///
    /// Called when the client's configuration changes. Open documents are
    /// revalidated against the (possibly new) service endpoint.
    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        info!("Configuration changed");

        match ServerSettings::from_lsp_settings(&params.settings) {
            Some(settings) => self.set_settings(settings).await,
            None => {
                warn!("Configuration payload had no trinoSqlLsp section");
            }
        }

        for uri in self.documents.list_uris().await {
            self.validate_document(uri).await;
        }
    }

    /// Watched files change notification
    async fn did_change_watched_files(&self, _params: DidChangeWatchedFilesParams) {
        info!("Watched file change event received");
    }
}
