// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text surface that asks the page itself for its text content.

use std::sync::Arc;

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{Geometry, TextItem};
use tracing::debug;

use crate::traits::{PageHandle, TextSurface};

/// Collects a page's text runs through [`PageHandle::text_content`].
#[derive(Debug, Default)]
pub struct PageTextSurface;

#[async_trait]
impl TextSurface for PageTextSurface {
    async fn get_text(
        &self,
        page: Arc<dyn PageHandle>,
        geometry: Geometry,
    ) -> Result<Vec<TextItem>> {
        let items = page.text_content().await.map_err(|err| match err {
            BlattwerkError::TextExtraction(_) => err,
            other => BlattwerkError::TextExtraction(other.to_string()),
        })?;
        debug!(
            page = page.number(),
            items = items.len(),
            scale = geometry.scale,
            "text content collected"
        );
        Ok(items)
    }
}
