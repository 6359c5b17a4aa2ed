// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Server Settings
//!
//! Client-supplied configuration for the LSP server.
//!
//! ## Settings structure
//!
//! The settings cover:
//! - The parse/format service endpoint
//! - The per-request timeout against that service
//! - The diagnostic count cap
//!
//! Settings arrive through `workspace/didChangeConfiguration` under the
//! `"trinoSqlLsp"` section; until they arrive the runtime fallback is used.

use serde_json::Value;

/// Default parse/format service endpoint, matching the service's own
/// default listen address.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:4567/v1/parse";

/// Server settings
///
/// Held behind a shared lock on the backend and swapped wholesale when the
/// client pushes a configuration change.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    /// Parse/format service URL
    pub endpoint: String,

    /// Per-request timeout against the service, in seconds
    pub request_timeout_secs: u64,

    /// Maximum number of diagnostics published per document
    pub max_number_of_problems: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 10,
            max_number_of_problems: 1000,
        }
    }
}

impl ServerSettings {
    /// Parse settings from an LSP client settings payload.
    ///
    /// Expected shape:
    /// {
    ///   "trinoSqlLsp": {
    ///     "serviceUrl": "http://localhost:4567/v1/parse",
    ///     "requestTimeoutSecs": 10,
    ///     "maxNumberOfProblems": 1000
    ///   }
    /// }
    ///
    /// Missing fields keep their defaults; a payload without the
    /// `"trinoSqlLsp"` section yields `None`.
    pub fn from_lsp_settings(settings: &Value) -> Option<Self> {
        let section = settings.get("trinoSqlLsp")?;
        let defaults = Self::default();

        let endpoint = section
            .get("serviceUrl")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(defaults.endpoint);

        let request_timeout_secs = section
            .get("requestTimeoutSecs")
            .and_then(Value::as_u64)
            .unwrap_or(defaults.request_timeout_secs);

        let max_number_of_problems = section
            .get("maxNumberOfProblems")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(defaults.max_number_of_problems);

        Some(Self {
            endpoint,
            request_timeout_secs,
            max_number_of_problems,
        })
    }

    /// Default settings used when client settings have not arrived yet.
    pub fn default_runtime_fallback() -> Self {
        let endpoint = std::env::var("TRINO_SQL_LSP_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());

        Self {
            endpoint,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_settings() {
        let settings = ServerSettings::default();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.request_timeout_secs, 10);
        assert_eq!(settings.max_number_of_problems, 1000);
    }

    #[test]
    fn test_from_lsp_settings_full() {
        let payload = json!({
            "trinoSqlLsp": {
                "serviceUrl": "http://10.0.0.5:4567/v1/parse",
                "requestTimeoutSecs": 3,
                "maxNumberOfProblems": 25
            }
        });

        let settings = ServerSettings::from_lsp_settings(&payload).unwrap();
        assert_eq!(settings.endpoint, "http://10.0.0.5:4567/v1/parse");
        assert_eq!(settings.request_timeout_secs, 3);
        assert_eq!(settings.max_number_of_problems, 25);
    }

    #[test]
    fn test_from_lsp_settings_partial_keeps_defaults() {
        let payload = json!({
            "trinoSqlLsp": {
                "maxNumberOfProblems": 5
            }
        });

        let settings = ServerSettings::from_lsp_settings(&payload).unwrap();
        assert_eq!(settings.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.max_number_of_problems, 5);
    }

    #[test]
    fn test_from_lsp_settings_missing_section() {
        let payload = json!({ "otherServer": { "x": 1 } });
        assert!(ServerSettings::from_lsp_settings(&payload).is_none());
    }
}
