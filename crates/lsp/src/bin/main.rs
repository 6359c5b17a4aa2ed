// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Trino SQL LSP server binary
//!
//! Speaks LSP over stdio. Logs go to stderr so they never corrupt the
//! protocol stream; set `RUST_LOG` to adjust verbosity.

use tower_lsp::{LspService, Server};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trino_sql_lsp_lsp::LspBackend;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Starting {} v{}",
        trino_sql_lsp_lsp::SERVER_NAME,
        trino_sql_lsp_lsp::VERSION
    );

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(LspBackend::new);
    Server::new(stdin, stdout, socket).serve(service).await;

    info!("Server stopped");
}
