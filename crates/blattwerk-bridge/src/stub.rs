// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub raster surface for headless/CI builds where no drawing target exists.
//
// Every render returns `PlatformUnavailable`; real surfaces are supplied by
// the embedding application.

use std::sync::Arc;

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::Geometry;

use crate::traits::{PageHandle, RasterSurface};

/// No-op raster surface used when nothing can be drawn.
pub struct StubRasterSurface;

#[async_trait]
impl RasterSurface for StubRasterSurface {
    async fn render(&self, page: Arc<dyn PageHandle>, geometry: Geometry) -> Result<()> {
        let viewport = page.viewport(geometry.scale, geometry.rotate);
        tracing::warn!(
            page = page.number(),
            width = viewport.width,
            height = viewport.height,
            "RasterSurface::render called on stub surface"
        );
        Err(BlattwerkError::PlatformUnavailable)
    }
}
