// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical document request: the single form every source is normalised
// into before it reaches the engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::traits::RangeTransport;

/// Where the document bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget {
    /// Fetch from a URL or file path.
    Url(String),
    /// Bytes already in memory.
    Data(Bytes),
}

/// Per-request options carried alongside the target.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub http_headers: BTreeMap<String, String>,
    pub with_credentials: bool,
    pub password: Option<String>,
    pub range: Option<Arc<dyn RangeTransport>>,
}

impl PartialEq for RequestOptions {
    fn eq(&self, other: &Self) -> bool {
        let same_range = match (&self.range, &other.range) {
            (None, None) => true,
            (Some(a), Some(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        };
        same_range
            && self.http_headers == other.http_headers
            && self.with_credentials == other.with_credentials
            && self.password == other.password
    }
}

impl std::fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOptions")
            .field("http_headers", &self.http_headers.keys().collect::<Vec<_>>())
            .field("with_credentials", &self.with_credentials)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("range_length", &self.range.as_ref().map(|r| r.length()))
            .finish()
    }
}

/// A normalised request for the document engine.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRequest {
    pub target: RequestTarget,
    pub options: RequestOptions,
}

impl DocumentRequest {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            target: RequestTarget::Url(url.into()),
            options: RequestOptions::default(),
        }
    }

    pub fn data(bytes: impl Into<Bytes>) -> Self {
        Self {
            target: RequestTarget::Data(bytes.into()),
            options: RequestOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Short description for logs; never includes payload bytes.
    pub fn describe(&self) -> String {
        match &self.target {
            RequestTarget::Url(url) => format!("url {url}"),
            RequestTarget::Data(bytes) => format!("{} inline bytes", bytes.len()),
        }
    }
}
