// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Observer callback bundles.
//
// Every callback is optional; an unset callback is a no-op. Bundles are
// cheap to clone (callbacks are `Arc`-wrapped) so controllers can hand them
// to spawned tasks.

use std::sync::Arc;

use blattwerk_bridge::traits::DocumentHandle;
use blattwerk_core::error::BlattwerkError;
use blattwerk_core::types::{DocumentInfo, LoadProgress, PageInfo, TextItem};

type Callback<A> = Option<Arc<dyn Fn(A) + Send + Sync>>;
type RefCallback<A> = Option<Arc<dyn Fn(&A) + Send + Sync>>;
type LoadedCallback = Option<Arc<dyn Fn(&Arc<dyn DocumentHandle>, &DocumentInfo) + Send + Sync>>;

/// Document-level observers.
#[derive(Clone, Default)]
pub struct DocumentCallbacks {
    source_success: Callback<()>,
    source_error: RefCallback<BlattwerkError>,
    load_success: LoadedCallback,
    load_error: RefCallback<BlattwerkError>,
    load_progress: Callback<LoadProgress>,
}

impl DocumentCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called once the source has been normalised into a request.
    pub fn on_source_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.source_success = Some(Arc::new(move |()| f()));
        self
    }

    /// Called when the source could not be normalised.
    pub fn on_source_error(mut self, f: impl Fn(&BlattwerkError) + Send + Sync + 'static) -> Self {
        self.source_error = Some(Arc::new(f));
        self
    }

    /// Called with the opened document and its derived info.
    pub fn on_load_success(
        mut self,
        f: impl Fn(&Arc<dyn DocumentHandle>, &DocumentInfo) + Send + Sync + 'static,
    ) -> Self {
        self.load_success = Some(Arc::new(f));
        self
    }

    pub fn on_load_error(mut self, f: impl Fn(&BlattwerkError) + Send + Sync + 'static) -> Self {
        self.load_error = Some(Arc::new(f));
        self
    }

    pub fn on_load_progress(mut self, f: impl Fn(LoadProgress) + Send + Sync + 'static) -> Self {
        self.load_progress = Some(Arc::new(f));
        self
    }

    pub(crate) fn source_success(&self) {
        if let Some(f) = &self.source_success {
            f(());
        }
    }

    pub(crate) fn source_error(&self, err: &BlattwerkError) {
        if let Some(f) = &self.source_error {
            f(err);
        }
    }

    pub(crate) fn load_success(&self, handle: &Arc<dyn DocumentHandle>, info: &DocumentInfo) {
        if let Some(f) = &self.load_success {
            f(handle, info);
        }
    }

    pub(crate) fn load_error(&self, err: &BlattwerkError) {
        if let Some(f) = &self.load_error {
            f(err);
        }
    }

    pub(crate) fn load_progress(&self, progress: LoadProgress) {
        if let Some(f) = &self.load_progress {
            f(progress);
        }
    }
}

/// Page-level observers.
#[derive(Clone, Default)]
pub struct PageCallbacks {
    load_success: RefCallback<PageInfo>,
    load_error: RefCallback<BlattwerkError>,
}

impl PageCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_load_success(mut self, f: impl Fn(&PageInfo) + Send + Sync + 'static) -> Self {
        self.load_success = Some(Arc::new(f));
        self
    }

    pub fn on_load_error(mut self, f: impl Fn(&BlattwerkError) + Send + Sync + 'static) -> Self {
        self.load_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn load_success(&self, info: &PageInfo) {
        if let Some(f) = &self.load_success {
            f(info);
        }
    }

    pub(crate) fn load_error(&self, err: &BlattwerkError) {
        if let Some(f) = &self.load_error {
            f(err);
        }
    }
}

/// Render surface observers, one pair per surface.
#[derive(Clone, Default)]
pub struct RenderCallbacks {
    render_success: Callback<()>,
    render_error: RefCallback<BlattwerkError>,
    text_success: Option<Arc<dyn Fn(&[TextItem]) + Send + Sync>>,
    text_error: RefCallback<BlattwerkError>,
}

impl RenderCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_render_success(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.render_success = Some(Arc::new(move |()| f()));
        self
    }

    pub fn on_render_error(mut self, f: impl Fn(&BlattwerkError) + Send + Sync + 'static) -> Self {
        self.render_error = Some(Arc::new(f));
        self
    }

    pub fn on_get_text_success(mut self, f: impl Fn(&[TextItem]) + Send + Sync + 'static) -> Self {
        self.text_success = Some(Arc::new(f));
        self
    }

    pub fn on_get_text_error(mut self, f: impl Fn(&BlattwerkError) + Send + Sync + 'static) -> Self {
        self.text_error = Some(Arc::new(f));
        self
    }

    pub(crate) fn render_success(&self) {
        if let Some(f) = &self.render_success {
            f(());
        }
    }

    pub(crate) fn render_error(&self, err: &BlattwerkError) {
        if let Some(f) = &self.render_error {
            f(err);
        }
    }

    pub(crate) fn text_success(&self, items: &[TextItem]) {
        if let Some(f) = &self.text_success {
            f(items);
        }
    }

    pub(crate) fn text_error(&self, err: &BlattwerkError) {
        if let Some(f) = &self.text_error {
            f(err);
        }
    }
}
