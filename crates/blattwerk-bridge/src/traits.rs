// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Collaborator seams for the coordination layer.
//
// The document engine parses documents and hands out pages; the raster and
// text surfaces draw them. None of these live in the coordination core,
// which only ever talks to them through the traits below.

use std::sync::Arc;

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{Geometry, LoadProgress, TextItem, Viewport};
use bytes::Bytes;

use crate::request::DocumentRequest;

/// Progress sink handed to the engine while a document opens.
pub type ProgressFn<'a> = dyn Fn(LoadProgress) + Send + Sync + 'a;

/// Opens documents from canonical requests.
#[async_trait]
pub trait DocumentEngine: Send + Sync {
    /// Short engine name for logging.
    fn name(&self) -> &str;

    /// Open the document described by `request`.
    ///
    /// The engine may call `progress` any number of times before resolving.
    /// Rejects with an engine-defined error on malformed or unreachable input.
    async fn open_document(
        &self,
        request: &DocumentRequest,
        progress: &ProgressFn<'_>,
    ) -> Result<Arc<dyn DocumentHandle>>;
}

/// An opened document.
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Engine-defined identity of the document contents.
    fn fingerprint(&self) -> &str;

    /// Load page `number` (one-based). Rejects if out of range.
    async fn get_page(&self, number: usize) -> Result<Arc<dyn PageHandle>>;
}

/// One loaded page.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// One-based page number.
    fn number(&self) -> usize;

    /// Rotation stored in the document, in degrees.
    fn intrinsic_rotation(&self) -> i32;

    /// Unrotated page size at scale 1.
    fn intrinsic_size(&self) -> (f64, f64);

    /// Page size at `scale`, rotated by `rotate` degrees.
    fn viewport(&self, scale: f64, rotate: i32) -> Viewport {
        let (width, height) = self.intrinsic_size();
        Viewport::of(width, height, scale, rotate)
    }

    /// Text runs on the page, in reading order.
    async fn text_content(&self) -> Result<Vec<TextItem>> {
        Err(BlattwerkError::PlatformUnavailable)
    }
}

/// A file-like object whose bytes must be read asynchronously.
#[async_trait]
pub trait BlobSource: Send + Sync {
    /// File name, if the blob has one.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Read the entire blob.
    async fn read_bytes(&self) -> Result<Bytes>;
}

/// Caller-provided transport serving byte ranges of a remote document.
pub trait RangeTransport: Send + Sync {
    /// Total document length in bytes.
    fn length(&self) -> u64;

    /// Bytes already available, starting at offset 0.
    fn initial_data(&self) -> Option<Bytes>;
}

/// Draws a page into a raster target.
#[async_trait]
pub trait RasterSurface: Send + Sync {
    async fn render(&self, page: Arc<dyn PageHandle>, geometry: Geometry) -> Result<()>;
}

/// Lays out a page's text for selection and search.
#[async_trait]
pub trait TextSurface: Send + Sync {
    async fn get_text(&self, page: Arc<dyn PageHandle>, geometry: Geometry)
    -> Result<Vec<TextItem>>;
}
