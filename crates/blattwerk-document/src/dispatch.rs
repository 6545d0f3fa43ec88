// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Render dispatch. Hands a loaded page and its geometry to the raster and
// text surfaces. The two surfaces run independently: a failure in one never
// cancels or suppresses the other.

use std::sync::{Arc, Mutex, PoisonError};

use blattwerk_bridge::traits::{PageHandle, RasterSurface, TextSurface};
use blattwerk_core::types::Geometry;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::callbacks::RenderCallbacks;

/// Join handles for one dispatch, one per surface.
#[derive(Debug)]
pub struct DispatchHandles {
    pub raster: JoinHandle<()>,
    pub text: JoinHandle<()>,
}

impl DispatchHandles {
    /// Wait for both surfaces to finish.
    pub async fn join(self) {
        let (raster, text) = tokio::join!(self.raster, self.text);
        for (surface, outcome) in [("raster", raster), ("text", text)] {
            if let Err(err) = outcome {
                warn!(surface, error = %err, "render task did not complete");
            }
        }
    }
}

type LastDispatch = Option<(Arc<dyn PageHandle>, Geometry)>;

/// Fans a page out to its render surfaces.
#[derive(Clone)]
pub struct RenderDispatch {
    raster: Arc<dyn RasterSurface>,
    text: Arc<dyn TextSurface>,
    callbacks: RenderCallbacks,
    last: Arc<Mutex<LastDispatch>>,
}

impl RenderDispatch {
    pub fn new(
        raster: Arc<dyn RasterSurface>,
        text: Arc<dyn TextSurface>,
        callbacks: RenderCallbacks,
    ) -> Self {
        Self {
            raster,
            text,
            callbacks,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Render `page` at `geometry` on both surfaces.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, page: Arc<dyn PageHandle>, geometry: Geometry) -> DispatchHandles {
        debug!(
            page = page.number(),
            scale = geometry.scale,
            rotate = geometry.rotate,
            "dispatching page to surfaces"
        );
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) =
            Some((Arc::clone(&page), geometry));

        DispatchHandles {
            raster: self.spawn_raster(Arc::clone(&page), geometry),
            text: self.spawn_text(page, geometry),
        }
    }

    /// Re-run only the raster surface with the last dispatched page.
    pub fn redraw_raster(&self) -> Option<JoinHandle<()>> {
        let (page, geometry) = self.last()?;
        Some(self.spawn_raster(page, geometry))
    }

    /// Re-run only the text surface with the last dispatched page.
    pub fn redraw_text(&self) -> Option<JoinHandle<()>> {
        let (page, geometry) = self.last()?;
        Some(self.spawn_text(page, geometry))
    }

    /// Geometry of the most recent dispatch.
    pub fn last_geometry(&self) -> Option<Geometry> {
        self.last().map(|(_, geometry)| geometry)
    }

    fn last(&self) -> LastDispatch {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn spawn_raster(&self, page: Arc<dyn PageHandle>, geometry: Geometry) -> JoinHandle<()> {
        let surface = Arc::clone(&self.raster);
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            let number = page.number();
            match surface.render(page, geometry).await {
                Ok(()) => {
                    debug!(page = number, "raster render complete");
                    callbacks.render_success();
                }
                Err(err) => {
                    warn!(page = number, error = %err, "raster render failed");
                    callbacks.render_error(&err);
                }
            }
        })
    }

    fn spawn_text(&self, page: Arc<dyn PageHandle>, geometry: Geometry) -> JoinHandle<()> {
        let surface = Arc::clone(&self.text);
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            let number = page.number();
            match surface.get_text(page, geometry).await {
                Ok(items) => {
                    debug!(page = number, items = items.len(), "text layer complete");
                    callbacks.text_success(&items);
                }
                Err(err) => {
                    warn!(page = number, error = %err, "text layer failed");
                    callbacks.text_error(&err);
                }
            }
        })
    }
}
