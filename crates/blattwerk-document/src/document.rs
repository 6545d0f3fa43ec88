// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document lifecycle controller.
//
// Every `set_source` call issues a new request token. The normalise/open
// pipeline runs on a spawned task and each of its results is applied only
// while its token is still current, so a superseded load can never overwrite
// state or reach an observer.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blattwerk_bridge::request::DocumentRequest;
use blattwerk_bridge::traits::{DocumentEngine, DocumentHandle};
use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{DocumentInfo, LoadProgress, LoadState, RequestToken};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::callbacks::DocumentCallbacks;
use crate::page::PageController;
use crate::source::{Source, normalize};

struct Slot {
    token: RequestToken,
    state: LoadState<Arc<dyn DocumentHandle>>,
    disposed: bool,
    pages: Vec<PageController>,
}

impl Slot {
    fn is_current(&self, token: RequestToken) -> bool {
        !self.disposed && self.token == token
    }
}

struct Shared {
    engine: Arc<dyn DocumentEngine>,
    config: EngineConfig,
    callbacks: DocumentCallbacks,
    state: Mutex<Slot>,
    /// Held while applying a result so notifications leave in token order.
    notify: Mutex<()>,
}

/// Owns the current document and drives its load lifecycle.
///
/// Dropping the controller disposes it.
pub struct DocumentController {
    inner: Arc<Shared>,
}

impl DocumentController {
    pub fn new(
        engine: Arc<dyn DocumentEngine>,
        config: EngineConfig,
        callbacks: DocumentCallbacks,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                engine,
                config,
                callbacks,
                state: Mutex::new(Slot {
                    token: RequestToken::INITIAL,
                    state: LoadState::Empty,
                    disposed: false,
                    pages: Vec::new(),
                }),
                notify: Mutex::new(()),
            }),
        }
    }

    /// Replace the source and start loading it.
    ///
    /// The previous document is released at once and attached pages drop
    /// their references to it. An absent source leaves the controller
    /// `Empty` without starting any work, and `None` is returned. Otherwise
    /// the returned task completes once the load has settled.
    ///
    /// Must be called from within a tokio runtime.
    pub fn set_source(&self, source: impl Into<Source>) -> Option<JoinHandle<()>> {
        let source = source.into();
        let token = {
            let mut slot = self.inner.lock_state();
            if slot.disposed {
                return None;
            }
            slot.token = slot.token.next();
            for page in &slot.pages {
                page.set_document(None);
            }
            if source.is_none() {
                debug!(token = %slot.token, "source cleared");
                slot.state = LoadState::Empty;
                return None;
            }
            slot.state = LoadState::Loading;
            slot.token
        };

        debug!(%token, ?source, "loading source");
        let shared = Arc::clone(&self.inner);
        Some(tokio::spawn(shared.run(token, source)))
    }

    /// Attach a page controller. It receives the current document now and
    /// every replacement from then on.
    pub fn attach(&self, page: &PageController) -> Option<JoinHandle<()>> {
        let mut slot = self.inner.lock_state();
        if slot.disposed {
            return None;
        }
        if !slot.pages.iter().any(|attached| attached.same_as(page)) {
            slot.pages.push(page.clone());
        }
        page.set_document(slot.state.loaded().cloned())
    }

    /// Detach a page controller; it drops its document reference.
    pub fn detach(&self, page: &PageController) {
        let mut slot = self.inner.lock_state();
        slot.pages.retain(|attached| !attached.same_as(page));
        page.set_document(None);
    }

    /// Stop observing. Pending results are ignored and attached pages are
    /// released.
    pub fn dispose(&self) {
        let mut slot = self.inner.lock_state();
        if slot.disposed {
            return;
        }
        slot.disposed = true;
        slot.token = slot.token.next();
        slot.state = LoadState::Empty;
        for page in slot.pages.drain(..) {
            page.set_document(None);
        }
        debug!("document controller disposed");
    }

    pub fn state(&self) -> LoadState<Arc<dyn DocumentHandle>> {
        self.inner.lock_state().state.clone()
    }

    /// The loaded document, if any.
    pub fn handle(&self) -> Option<Arc<dyn DocumentHandle>> {
        self.inner.lock_state().state.loaded().cloned()
    }

    pub fn current_token(&self) -> RequestToken {
        self.inner.lock_state().token
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

impl Drop for DocumentController {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, Slot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_notify(&self) -> MutexGuard<'_, ()> {
        self.notify.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.lock_state().is_current(token)
    }

    #[instrument(skip_all, fields(%token, engine = self.engine.name()))]
    async fn run(self: Arc<Self>, token: RequestToken, source: Source) {
        let normalized = normalize(source, &self.config).await;
        let Some(request) = self.accept_source(token, normalized) else {
            return;
        };
        // The source observer may have replaced the source.
        if !self.is_current(token) {
            return;
        }

        let progress = |progress: LoadProgress| self.progress(token, progress);
        let open = self.engine.open_document(&request, &progress);
        let opened = match self.config.open_timeout() {
            Some(limit) => tokio::time::timeout(limit, open).await.unwrap_or_else(|_| {
                Err(BlattwerkError::Timeout(
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                ))
            }),
            None => open.await,
        };
        self.finish(token, opened);
    }

    fn accept_source(
        &self,
        token: RequestToken,
        normalized: Result<Option<DocumentRequest>>,
    ) -> Option<DocumentRequest> {
        let _order = self.lock_notify();
        let mut slot = self.lock_state();
        if !slot.is_current(token) {
            debug!(%token, "dropping stale source result");
            return None;
        }

        match normalized {
            Ok(Some(request)) => {
                drop(slot);
                self.callbacks.source_success();
                Some(request)
            }
            Ok(None) => {
                debug!(%token, "source resolved to nothing");
                slot.state = LoadState::Empty;
                None
            }
            Err(err) => {
                slot.state = LoadState::Failed;
                drop(slot);
                warn!(error = %err, "source could not be normalised");
                self.callbacks.source_error(&err);
                None
            }
        }
    }

    fn progress(&self, token: RequestToken, progress: LoadProgress) {
        let _order = self.lock_notify();
        if self.is_current(token) {
            self.callbacks.load_progress(progress);
        }
    }

    fn finish(&self, token: RequestToken, opened: Result<Arc<dyn DocumentHandle>>) {
        let _order = self.lock_notify();
        let mut slot = self.lock_state();
        if !slot.is_current(token) {
            debug!(%token, current = %slot.token, "dropping stale document result");
            return;
        }

        match opened {
            Ok(handle) => {
                slot.state = LoadState::Loaded(Arc::clone(&handle));
                drop(slot);

                let info = DocumentInfo {
                    page_count: handle.page_count(),
                    fingerprint: handle.fingerprint().to_string(),
                };
                info!(
                    pages = info.page_count,
                    fingerprint = %info.fingerprint,
                    "document loaded"
                );
                self.callbacks.load_success(&handle, &info);

                let slot = self.lock_state();
                if !slot.is_current(token) {
                    return;
                }
                for page in &slot.pages {
                    page.set_document(Some(Arc::clone(&handle)));
                }
            }
            Err(err) => {
                slot.state = LoadState::Failed;
                drop(slot);
                warn!(error = %err, "document failed to load");
                self.callbacks.load_error(&err);
            }
        }
    }
}
