// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Blattwerk: document engine and rendering surface seams.
//!
//! The coordination core never parses or draws anything itself. It talks to
//! a [`traits::DocumentEngine`] and to raster/text surfaces through the
//! traits defined here. A `lopdf`-backed reference engine is included so the
//! core can be driven end to end without an external engine.

pub mod blob;
pub mod pdf;
pub mod request;
pub mod stub;
pub mod text;
pub mod traits;

use std::sync::Arc;

use blattwerk_core::EngineConfig;
use blattwerk_core::error::Result;

pub use blob::{FileBlob, MemoryBlob};
pub use pdf::LopdfEngine;
pub use request::{DocumentRequest, RequestOptions, RequestTarget};
pub use stub::StubRasterSurface;
pub use text::PageTextSurface;
pub use traits::*;

/// Build the default document engine for this build.
///
/// RETURNS: a shared trait object (`dyn DocumentEngine`) so callers stay
/// independent of the concrete engine.
pub fn default_engine(config: &EngineConfig) -> Result<Arc<dyn DocumentEngine>> {
    Ok(Arc::new(LopdfEngine::new(config.clone())?))
}
