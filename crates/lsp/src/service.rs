// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Parse/Format Service Client
//!
//! HTTP client for the external Trino parse/format service.
//!
//! ## Wire format
//!
//! One POST endpoint taking `{ "sql": "..." }` and returning
//!
//! ```json
//! {
//!   "formatted_sql": "SELECT ...",
//!   "suggestions": ["..."],
//!   "parse_error": { "message": "...", "row": 1, "column": 0 }
//! }
//! ```
//!
//! `parse_error` is absent for well-formed input; `row` is 1-based. All
//! network waiting happens here, strictly before the reconciliation core is
//! invoked with the response.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::ServerSettings;

/// Request body for the parse endpoint
#[derive(Debug, Serialize)]
struct ParseRequest<'a> {
    sql: &'a str,
}

/// Parse error reported by the service
///
/// `row` is 1-based, `column` 0-based, both in the submitted text.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ServiceParseError {
    pub message: String,
    pub row: u32,
    pub column: u32,
}

/// Response from the parse endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct ParseResponse {
    /// The whole input, reformatted
    pub formatted_sql: String,

    /// Completion suggestions for the input
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Parse failure, if the input was not well-formed
    #[serde(default)]
    pub parse_error: Option<ServiceParseError>,
}

/// Parse/format service errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Transport failure, non-success status, or undecodable body
    #[error("parse service request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Client for the external parse/format service
///
/// One shared connection pool; the endpoint and timeout come from the
/// current [`ServerSettings`] on every call so configuration changes take
/// effect without rebuilding the client.
#[derive(Debug, Clone, Default)]
pub struct ParseService {
    http: reqwest::Client,
}

impl ParseService {
    /// Create a new service client
    pub fn new() -> Self {
        Self::default()
    }

    /// Submit `sql` to the parse endpoint and decode the response.
    pub async fn parse(
        &self,
        settings: &ServerSettings,
        sql: &str,
    ) -> Result<ParseResponse, ServiceError> {
        debug!(
            "Requesting parse: endpoint={}, sql_len={}",
            settings.endpoint,
            sql.len()
        );

        let response = self
            .http
            .post(settings.endpoint.as_str())
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .json(&ParseRequest { sql })
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }
}
