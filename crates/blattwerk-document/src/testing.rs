// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted engine and document for controller tests. Loads can be held open
// with oneshot gates so tests decide the order in which results arrive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blattwerk_bridge::request::{DocumentRequest, RequestTarget};
use blattwerk_bridge::traits::{DocumentEngine, DocumentHandle, PageHandle, ProgressFn};
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::LoadProgress;
use tokio::sync::{mpsc, oneshot};

use crate::geometry::tests::FixedPage;

type Opened = Result<Arc<dyn DocumentHandle>>;

fn key(request: &DocumentRequest) -> String {
    match &request.target {
        RequestTarget::Url(url) => url.clone(),
        RequestTarget::Data(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Engine whose documents are registered per URL (or per UTF-8 payload).
#[derive(Default)]
pub(crate) struct MockEngine {
    ready: Mutex<HashMap<String, Arc<MockDocument>>>,
    gates: Mutex<HashMap<String, oneshot::Receiver<Opened>>>,
    calls: Mutex<Vec<String>>,
}

impl MockEngine {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Open `key` immediately with `document`.
    pub(crate) fn serve(&self, key: &str, document: Arc<MockDocument>) {
        self.ready.lock().unwrap().insert(key.to_string(), document);
    }

    /// Hold `key` open until the returned sender fires.
    pub(crate) fn gate(&self, key: &str) -> oneshot::Sender<Opened> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(key.to_string(), rx);
        tx
    }

    /// Keys passed to `open_document`, in call order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open_document(
        &self,
        request: &DocumentRequest,
        progress: &ProgressFn<'_>,
    ) -> Result<Arc<dyn DocumentHandle>> {
        let key = key(request);
        self.calls.lock().unwrap().push(key.clone());
        progress(LoadProgress {
            loaded: 0,
            total: Some(100),
        });

        let gate = self.gates.lock().unwrap().remove(&key);
        let opened = match gate {
            Some(gate) => gate
                .await
                .unwrap_or_else(|_| Err(BlattwerkError::Engine("gate dropped".into()))),
            None => {
                let ready = self.ready.lock().unwrap().get(&key).cloned();
                match ready {
                    Some(document) => Ok(document as Arc<dyn DocumentHandle>),
                    None => Err(BlattwerkError::Engine(format!("no document at {key}"))),
                }
            }
        };

        progress(LoadProgress {
            loaded: 100,
            total: Some(100),
        });
        opened
    }
}

/// Document of fixed 600x800 pages whose loads can be gated per page.
pub(crate) struct MockDocument {
    pages: usize,
    fingerprint: String,
    gates: Mutex<HashMap<usize, oneshot::Receiver<()>>>,
    failing: Mutex<Vec<usize>>,
    requested: Mutex<Vec<usize>>,
}

impl MockDocument {
    pub(crate) fn new(pages: usize, fingerprint: &str) -> Arc<Self> {
        Arc::new(Self {
            pages,
            fingerprint: fingerprint.to_string(),
            gates: Mutex::default(),
            failing: Mutex::default(),
            requested: Mutex::default(),
        })
    }

    pub(crate) fn gate(&self, number: usize) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().unwrap().insert(number, rx);
        tx
    }

    pub(crate) fn fail(&self, number: usize) {
        self.failing.lock().unwrap().push(number);
    }

    /// Page numbers passed to `get_page`, in call order.
    pub(crate) fn requested(&self) -> Vec<usize> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentHandle for MockDocument {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    async fn get_page(&self, number: usize) -> Result<Arc<dyn PageHandle>> {
        self.requested.lock().unwrap().push(number);
        if number == 0 || number > self.pages {
            return Err(BlattwerkError::PageOutOfRange {
                number,
                page_count: self.pages,
            });
        }

        let gate = self.gates.lock().unwrap().remove(&number);
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if self.failing.lock().unwrap().contains(&number) {
            return Err(BlattwerkError::Engine(format!("page {number} is corrupt")));
        }
        Ok(Arc::new(FixedPage {
            number,
            size: (600.0, 800.0),
            rotate: 0,
        }))
    }
}

/// Receive the next event, failing the test after a generous timeout.
pub(crate) async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Everything currently buffered in `rx`.
pub(crate) fn drain<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> Vec<T> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
