// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Trino SQL LSP Server
//!
//! Language server for Trino SQL, backed by an external parse/format
//! service.
//!
//! ## Overview
//!
//! The server keeps the open documents in memory, validates them through
//! the service on every change, relays the service's completion
//! suggestions, and turns whole-document reformat results into minimal
//! incremental edits via the reconciliation core.
//!
//! ## Architecture
//!
//! ```text
//! Editor ⇄ tower-lsp ⇄ LspBackend
//!                        │
//!            ┌───────────┼──────────────┐
//!            ▼           ▼              ▼
//!     DocumentStore  ParseService  reconcile core
//!      (ropey)        (reqwest)   (diff → TextEdit)
//! ```
//!
//! ## Module Organization
//!
//! - [`backend`]: tower-lsp `LanguageServer` implementation
//! - [`config`]: server settings pushed by the client
//! - [`diagnostic`]: parse errors → LSP diagnostics
//! - [`document`]: open document store with versioned snapshots
//! - [`formatting`]: reconciliation glue and staleness checks
//! - [`service`]: HTTP client for the parse/format endpoint

pub mod backend;
pub mod config;
pub mod diagnostic;
pub mod document;
pub mod formatting;
pub mod service;

pub use backend::LspBackend;
pub use config::ServerSettings;
pub use document::{Document, DocumentStore};
pub use service::{ParseResponse, ParseService};

/// Server name reported to clients
pub const SERVER_NAME: &str = "trino-sql-lsp";

/// Server version reported to clients
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
