// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration, injected into the source normalizer and document
// controller at construction time.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options applied to every document request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base URL used to resolve relative URL sources. `None` passes relative
    /// strings through untouched (they are then treated as file paths).
    pub base_url: Option<String>,
    /// Headers sent with every HTTP(S) request, merged under per-source headers.
    pub http_headers: BTreeMap<String, String>,
    /// Send cookies/credentials with cross-origin requests.
    pub with_credentials: bool,
    /// Upper bound on decoded inline (data URI) payloads, in bytes.
    pub max_inline_bytes: usize,
    /// Upper bound on documents fetched over HTTP(S), in bytes.
    pub max_download_bytes: u64,
    /// Fail engine calls that take longer than this. `None` waits forever.
    pub open_timeout_ms: Option<u64>,
    /// User agent for HTTP(S) fetches made by the reference engine.
    pub user_agent: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            http_headers: BTreeMap::new(),
            with_credentials: false,
            max_inline_bytes: 64 * 1024 * 1024,
            max_download_bytes: 512 * 1024 * 1024,
            open_timeout_ms: None,
            user_agent: concat!("blattwerk/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&text)?)
    }

    /// The open timeout as a `Duration`, if one is configured.
    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_have_no_timeout() {
        let config = EngineConfig::default();
        assert!(config.open_timeout().is_none());
        assert!(config.user_agent.starts_with("blattwerk/"));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "open_timeout_ms": 2500, "with_credentials": true }"#)
                .unwrap();
        assert_eq!(config.open_timeout(), Some(Duration::from_millis(2500)));
        assert!(config.with_credentials);
        assert_eq!(config.max_inline_bytes, EngineConfig::default().max_inline_bytes);
        assert_eq!(config.max_download_bytes, EngineConfig::default().max_download_bytes);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{ "base_url": "https://example.org/docs/" }"#).unwrap();

        let config = EngineConfig::from_json_file(&path).unwrap();
        assert_eq!(config.base_url.as_deref(), Some("https://example.org/docs/"));
    }

    #[test]
    fn malformed_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = EngineConfig::from_json_file(&path).unwrap_err();
        assert!(matches!(err, crate::error::BlattwerkError::Serialization(_)));
    }
}
