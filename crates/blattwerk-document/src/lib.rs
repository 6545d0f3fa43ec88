// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: load and render coordination for Blattwerk.
//
// Normalises document sources, drives the document and page load lifecycles
// with stale-result protection, resolves page geometry, and dispatches loaded
// pages to the raster and text surfaces.

pub mod callbacks;
pub mod dispatch;
pub mod document;
pub mod geometry;
pub mod page;
pub mod source;

#[cfg(test)]
mod testing;

// Re-export the primary types so callers can use `blattwerk_document::DocumentController` etc.
pub use callbacks::{DocumentCallbacks, PageCallbacks, RenderCallbacks};
pub use dispatch::{DispatchHandles, RenderDispatch};
pub use document::DocumentController;
pub use page::PageController;
pub use source::{Source, SourceParams, normalize};
