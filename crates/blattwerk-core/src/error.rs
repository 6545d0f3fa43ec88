// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use std::sync::Arc;

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
///
/// The type is `Clone` so the same failure can be handed to an observer by
/// reference and kept in controller state afterwards.
#[derive(Debug, Clone, Error)]
pub enum BlattwerkError {
    // -- Source errors --
    #[error("source could not be read: {0}")]
    Source(String),

    #[error("unsupported source: {0}")]
    UnsupportedSource(String),

    // -- Engine errors --
    #[error("document engine failed: {0}")]
    Engine(String),

    #[error("page {number} out of range (document has {page_count} pages)")]
    PageOutOfRange { number: usize, page_count: usize },

    #[error("engine call timed out after {0} ms")]
    Timeout(u64),

    // -- Render surfaces --
    #[error("raster render failed: {0}")]
    Render(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),

    // -- Caller contract violations --
    #[error("attempted to load a page, but no document was specified")]
    NoDocument,

    #[error("page index {index} and page number {number} do not refer to the same page")]
    LocatorMismatch { index: usize, number: usize },

    // -- Platform / persistence --
    #[error("feature not available on this platform")]
    PlatformUnavailable,

    #[error("file I/O error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),
}

impl From<std::io::Error> for BlattwerkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for BlattwerkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(Arc::new(err))
    }
}

impl BlattwerkError {
    /// Whether this error signals a bug in the caller rather than a runtime
    /// or environment failure. Such errors are returned directly and never
    /// funnelled through an observer.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::NoDocument | Self::LocatorMismatch { .. })
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
