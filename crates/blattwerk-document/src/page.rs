// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page lifecycle controller.
//
// A page reloads whenever its document handle or its resolved page number
// changes. Each reload carries a fresh request token; results of superseded
// loads are dropped without touching state or observers.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blattwerk_bridge::traits::{DocumentHandle, PageHandle};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{
    Geometry, GeometryOverrides, LoadState, PageInfo, PageLocator, RequestToken,
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::callbacks::PageCallbacks;
use crate::dispatch::{DispatchHandles, RenderDispatch};
use crate::geometry;

struct Slot {
    token: RequestToken,
    document: Option<Arc<dyn DocumentHandle>>,
    locator: Option<PageLocator>,
    overrides: GeometryOverrides,
    state: LoadState<Arc<dyn PageHandle>>,
    disposed: bool,
}

struct Shared {
    callbacks: PageCallbacks,
    dispatch: Option<RenderDispatch>,
    state: Mutex<Slot>,
    /// Held while applying a result so notifications leave in token order.
    notify: Mutex<()>,
}

/// Drives loading of one page of the current document.
///
/// Cheap to clone; clones share state. Methods that start a load spawn onto
/// the current tokio runtime and must be called from within one.
#[derive(Clone)]
pub struct PageController {
    inner: Arc<Shared>,
}

impl PageController {
    /// A page controller with no document and no locator. When `dispatch` is
    /// set, every loaded page is handed to it.
    pub fn new(callbacks: PageCallbacks, dispatch: Option<RenderDispatch>) -> Self {
        Self {
            inner: Arc::new(Shared {
                callbacks,
                dispatch,
                state: Mutex::new(Slot {
                    token: RequestToken::INITIAL,
                    document: None,
                    locator: None,
                    overrides: GeometryOverrides::default(),
                    state: LoadState::Empty,
                    disposed: false,
                }),
                notify: Mutex::new(()),
            }),
        }
    }

    /// Replace the document this page is read from.
    ///
    /// Reloads only when the handle actually changed. `None` drops the
    /// reference and leaves the page empty.
    pub fn set_document(&self, document: Option<Arc<dyn DocumentHandle>>) -> Option<JoinHandle<()>> {
        let mut slot = self.inner.lock_state();
        if slot.disposed {
            return None;
        }
        let unchanged = match (&slot.document, &document) {
            (None, None) => true,
            (Some(current), Some(next)) => std::ptr::addr_eq(Arc::as_ptr(current), Arc::as_ptr(next)),
            _ => false,
        };
        if unchanged {
            return None;
        }
        slot.document = document;
        self.reload(&mut slot)
    }

    /// Point the controller at another page.
    ///
    /// Reloads only when the page number changes; `Index(1)` and `Number(2)`
    /// name the same page.
    pub fn set_locator(&self, locator: Option<PageLocator>) -> Option<JoinHandle<()>> {
        let mut slot = self.inner.lock_state();
        if slot.disposed {
            return None;
        }
        let previous = slot.locator.and_then(PageLocator::number);
        slot.locator = locator;
        if previous == locator.and_then(PageLocator::number) {
            return None;
        }
        self.reload(&mut slot)
    }

    /// Point the controller at a page given as index and/or number.
    ///
    /// Returns `LocatorMismatch` if both are given and disagree.
    pub fn set_page(&self, index: Option<usize>, number: Option<usize>) -> Result<Option<JoinHandle<()>>> {
        let locator = PageLocator::from_parts(index, number)?;
        Ok(self.set_locator(locator))
    }

    /// Replace the geometry overrides.
    ///
    /// Never reloads the page. If one is loaded its geometry is recomputed
    /// and it is dispatched again.
    pub fn set_overrides(&self, overrides: GeometryOverrides) -> Option<DispatchHandles> {
        let mut slot = self.inner.lock_state();
        slot.overrides = overrides;
        if slot.disposed {
            return None;
        }
        let page = slot.state.loaded().cloned()?;
        let geometry = geometry::resolve(page.as_ref(), &overrides);
        self.inner
            .dispatch
            .as_ref()
            .map(|dispatch| dispatch.dispatch(page, geometry))
    }

    /// Load the current page again.
    ///
    /// Loading with no document is a caller bug and fails with
    /// [`BlattwerkError::NoDocument`]; no observer is notified.
    pub fn load(&self) -> Result<Option<JoinHandle<()>>> {
        let mut slot = self.inner.lock_state();
        if slot.disposed {
            return Ok(None);
        }
        if slot.document.is_none() {
            return Err(BlattwerkError::NoDocument);
        }
        Ok(self.reload(&mut slot))
    }

    /// Stop observing. Results still in flight are dropped.
    pub fn dispose(&self) {
        let mut slot = self.inner.lock_state();
        slot.disposed = true;
        slot.token = slot.token.next();
        slot.document = None;
        slot.state = LoadState::Empty;
    }

    pub fn state(&self) -> LoadState<Arc<dyn PageHandle>> {
        self.inner.lock_state().state.clone()
    }

    pub fn locator(&self) -> Option<PageLocator> {
        self.inner.lock_state().locator
    }

    pub fn current_token(&self) -> RequestToken {
        self.inner.lock_state().token
    }

    /// Geometry of the loaded page under the current overrides, computed
    /// fresh on every call.
    pub fn geometry(&self) -> Option<Geometry> {
        let slot = self.inner.lock_state();
        let page = slot.state.loaded()?;
        Some(geometry::resolve(page.as_ref(), &slot.overrides))
    }

    /// Whether `other` shares state with this controller.
    pub fn same_as(&self, other: &PageController) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn reload(&self, slot: &mut Slot) -> Option<JoinHandle<()>> {
        slot.token = slot.token.next();
        let token = slot.token;

        let Some(document) = slot.document.clone() else {
            slot.state = LoadState::Empty;
            return None;
        };
        let page_count = document.page_count();
        let Some(number) = slot.locator.and_then(|locator| locator.resolve(page_count)) else {
            debug!(locator = ?slot.locator, page_count, "no page to load");
            slot.state = LoadState::Empty;
            return None;
        };

        debug!(page = number, %token, "loading page");
        slot.state = LoadState::Loading;
        let shared = Arc::clone(&self.inner);
        Some(tokio::spawn(async move {
            let result = document.get_page(number).await;
            shared.apply(token, result);
        }))
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, Slot> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, token: RequestToken, result: Result<Arc<dyn PageHandle>>) {
        let _order = self.notify.lock().unwrap_or_else(PoisonError::into_inner);

        let mut slot = self.lock_state();
        if slot.disposed || slot.token != token {
            debug!(%token, current = %slot.token, "dropping stale page result");
            return;
        }

        match result {
            Ok(page) => {
                let geometry = geometry::resolve(page.as_ref(), &slot.overrides);
                slot.state = LoadState::Loaded(Arc::clone(&page));
                drop(slot);

                let info = PageInfo::new(page.number(), page.intrinsic_size(), geometry);
                info!(page = info.number, scale = info.scale, rotate = info.rotate, "page loaded");
                self.callbacks.load_success(&info);

                // The observer may have moved the page on.
                let slot = self.lock_state();
                if slot.disposed || slot.token != token {
                    return;
                }
                if let Some(dispatch) = &self.dispatch {
                    let geometry = geometry::resolve(page.as_ref(), &slot.overrides);
                    dispatch.dispatch(page, geometry);
                }
            }
            Err(err) => {
                slot.state = LoadState::Failed;
                drop(slot);

                warn!(error = %err, "page failed to load");
                self.callbacks.load_error(&err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::RenderCallbacks;
    use crate::dispatch::tests::{EchoText, RecordingRaster};
    use crate::testing::{MockDocument, drain, next};
    use tokio::sync::mpsc;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Loaded(PageInfo),
        Failed(String),
    }

    fn recorder() -> (PageCallbacks, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let failures = tx.clone();
        let callbacks = PageCallbacks::new()
            .on_load_success(move |info| {
                let _ = tx.send(Event::Loaded(*info));
            })
            .on_load_error(move |err| {
                let _ = failures.send(Event::Failed(err.to_string()));
            });
        (callbacks, rx)
    }

    fn document(pages: usize) -> (Arc<MockDocument>, Arc<dyn DocumentHandle>) {
        let document = MockDocument::new(pages, "doc");
        let handle: Arc<dyn DocumentHandle> = document.clone();
        (document, handle)
    }

    fn loaded_number(page: &PageController) -> Option<usize> {
        page.state().loaded().map(|page| page.number())
    }

    #[tokio::test]
    async fn loads_the_located_page() {
        let (callbacks, mut rx) = recorder();
        let (_, handle) = document(3);
        let page = PageController::new(callbacks, None);

        assert!(page.set_locator(Some(PageLocator::Index(1))).is_none());
        page.set_document(Some(handle)).unwrap().await.unwrap();

        match drain(&mut rx).as_slice() {
            [Event::Loaded(info)] => {
                assert_eq!((info.index, info.number), (1, 2));
                assert_eq!((info.width, info.height), (600.0, 800.0));
                assert_eq!((info.original_width, info.original_height), (600.0, 800.0));
            }
            other => panic!("unexpected events {other:?}"),
        }
        assert_eq!(loaded_number(&page), Some(2));
    }

    #[tokio::test]
    async fn page_info_reflects_resolved_scale() {
        let (callbacks, mut rx) = recorder();
        let (_, handle) = document(1);
        let page = PageController::new(callbacks, None);
        page.set_overrides(GeometryOverrides::default().with_width(300.0));
        page.set_locator(Some(PageLocator::Number(1)));

        page.set_document(Some(handle)).unwrap().await.unwrap();

        let Event::Loaded(info) = next(&mut rx).await else {
            panic!("page did not load");
        };
        assert_eq!(info.scale, 0.5);
        assert_eq!(info.width, 300.0);
        assert_eq!(info.original_width, 600.0);
    }

    #[tokio::test]
    async fn out_of_range_page_is_silently_empty() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(3);
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Number(99)));

        assert!(page.set_document(Some(handle)).is_none());

        assert!(page.state().is_empty());
        assert!(mock.requested().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn missing_locator_is_silently_empty() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(3);
        let page = PageController::new(callbacks, None);

        assert!(page.set_document(Some(handle)).is_none());
        assert!(page.state().is_empty());
        assert!(mock.requested().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn only_the_latest_locator_is_stored_and_reported() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(3);
        let first_gate = mock.gate(1);
        let page = PageController::new(callbacks, None);

        page.set_locator(Some(PageLocator::Index(0)));
        let first = page.set_document(Some(handle)).unwrap();
        tokio::task::yield_now().await;

        let second = page.set_locator(Some(PageLocator::Index(1))).unwrap();
        second.await.unwrap();
        first_gate.send(()).unwrap();
        first.await.unwrap();

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1, "{events:?}");
        assert!(matches!(&events[0], Event::Loaded(info) if info.index == 1));
        assert_eq!(loaded_number(&page), Some(2));
    }

    #[tokio::test]
    async fn stale_failure_does_not_clobber_newer_page() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(3);
        mock.fail(1);
        let gate = mock.gate(1);
        let page = PageController::new(callbacks, None);

        page.set_locator(Some(PageLocator::Number(1)));
        let first = page.set_document(Some(handle)).unwrap();
        page.set_locator(Some(PageLocator::Number(3))).unwrap().await.unwrap();
        gate.send(()).unwrap();
        first.await.unwrap();

        let events = drain(&mut rx);
        assert!(matches!(events.as_slice(), [Event::Loaded(info)] if info.number == 3));
        assert!(page.state().is_loaded());
    }

    #[tokio::test]
    async fn load_failure_is_reported_and_distinct_from_empty() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(2);
        mock.fail(2);
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Number(2)));

        page.set_document(Some(handle)).unwrap().await.unwrap();

        assert!(matches!(next(&mut rx).await, Event::Failed(msg) if msg.contains("corrupt")));
        assert!(page.state().is_failed());
    }

    #[tokio::test]
    async fn equivalent_locator_does_not_reload() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(3);
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Index(1)));
        page.set_document(Some(Arc::clone(&handle))).unwrap().await.unwrap();

        assert!(page.set_locator(Some(PageLocator::Number(2))).is_none());
        assert!(page.set_document(Some(handle)).is_none());

        assert_eq!(mock.requested(), vec![2]);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn clearing_the_document_drops_the_page() {
        let (callbacks, _rx) = recorder();
        let (mock, handle) = document(1);
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Number(1)));
        page.set_document(Some(handle)).unwrap().await.unwrap();
        assert!(page.geometry().is_some());

        assert!(page.set_document(None).is_none());
        assert!(page.state().is_empty());
        assert!(page.geometry().is_none());
        assert_eq!(Arc::strong_count(&mock), 1);
    }

    #[tokio::test]
    async fn loading_without_a_document_is_a_precondition_error() {
        let (callbacks, mut rx) = recorder();
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Index(0)));

        let err = page.load().unwrap_err();
        assert!(matches!(err, BlattwerkError::NoDocument));
        assert!(err.is_precondition());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn inconsistent_index_and_number_are_rejected() {
        let (callbacks, _rx) = recorder();
        let page = PageController::new(callbacks, None);
        assert!(matches!(
            page.set_page(Some(0), Some(5)),
            Err(BlattwerkError::LocatorMismatch { index: 0, number: 5 })
        ));
        assert!(page.set_page(Some(4), Some(5)).is_ok());
        assert_eq!(page.locator(), Some(PageLocator::Index(4)));
    }

    #[tokio::test]
    async fn disposal_drops_in_flight_results() {
        let (callbacks, mut rx) = recorder();
        let (mock, handle) = document(1);
        let gate = mock.gate(1);
        let page = PageController::new(callbacks, None);
        page.set_locator(Some(PageLocator::Number(1)));
        let pending = page.set_document(Some(handle)).unwrap();

        page.dispose();
        gate.send(()).unwrap();
        pending.await.unwrap();

        assert!(drain(&mut rx).is_empty());
        assert!(page.state().is_empty());
        assert!(page.set_locator(Some(PageLocator::Number(2))).is_none());
    }

    #[tokio::test]
    async fn loaded_pages_are_dispatched_and_overrides_redispatch() {
        let (callbacks, mut rx) = recorder();
        let (raster_tx, mut raster_rx) = mpsc::unbounded_channel();
        let dispatch = RenderDispatch::new(
            Arc::new(RecordingRaster(raster_tx)),
            Arc::new(EchoText),
            RenderCallbacks::new(),
        );
        let (mock, handle) = document(2);
        let page = PageController::new(callbacks, Some(dispatch.clone()));
        page.set_locator(Some(PageLocator::Number(2)));

        page.set_document(Some(handle)).unwrap().await.unwrap();
        assert_eq!(next(&mut raster_rx).await, (2, Geometry { scale: 1.0, rotate: 0 }));

        page.set_overrides(GeometryOverrides::default().with_rotate(90).with_width(400.0))
            .unwrap()
            .join()
            .await;
        let expected = Geometry { scale: 0.5, rotate: 90 };
        assert_eq!(raster_rx.try_recv().unwrap(), (2, expected));
        assert_eq!(page.geometry(), Some(expected));
        assert_eq!(dispatch.last_geometry(), Some(expected));

        assert_eq!(mock.requested(), vec![2]);
        assert_eq!(drain(&mut rx).len(), 1);
    }
}
