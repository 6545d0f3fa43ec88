// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reference document engine backed by the `lopdf` crate.
//
// Fetches the request target (inline bytes, local file, or HTTP(S)), parses
// it on a blocking thread, and exposes page metadata: page count, MediaBox
// size, and /Rotate, both resolved through the page tree.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::{LoadProgress, TextItem};
use bytes::Bytes;
use lopdf::{Document, Object, ObjectId};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use crate::request::{DocumentRequest, RequestTarget};
use crate::traits::{DocumentEngine, DocumentHandle, PageHandle, ProgressFn};

/// US Letter, used when a page tree carries no MediaBox at all.
const DEFAULT_MEDIA_BOX: (f64, f64) = (612.0, 792.0);

/// Guard against cyclic /Parent chains in malformed files.
const MAX_INHERITANCE_DEPTH: usize = 64;

/// Most we reserve up front from a server-declared Content-Length.
const MAX_PREALLOCATION: u64 = 8 * 1024 * 1024;

/// Opens PDF documents with `lopdf`.
pub struct LopdfEngine {
    client: reqwest::Client,
    config: EngineConfig,
}

impl LopdfEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|err| BlattwerkError::Engine(format!("HTTP client setup: {err}")))?;
        Ok(Self { client, config })
    }

    /// Fetch the raw document bytes for `request`.
    async fn fetch(&self, request: &DocumentRequest, progress: &ProgressFn<'_>) -> Result<Bytes> {
        if request.options.range.is_some() {
            debug!("range transport ignored; lopdf needs the whole file");
        }

        match &request.target {
            RequestTarget::Data(bytes) => {
                let len = bytes.len() as u64;
                progress(LoadProgress {
                    loaded: len,
                    total: Some(len),
                });
                Ok(bytes.clone())
            }
            RequestTarget::Url(url) if is_http(url) => self.fetch_http(url, request, progress).await,
            RequestTarget::Url(url) => {
                let path = url.strip_prefix("file://").unwrap_or(url);
                let bytes = tokio::fs::read(path).await.map_err(|err| {
                    BlattwerkError::Engine(format!("failed to read {path}: {err}"))
                })?;
                let len = bytes.len() as u64;
                progress(LoadProgress {
                    loaded: len,
                    total: Some(len),
                });
                Ok(Bytes::from(bytes))
            }
        }
    }

    async fn fetch_http(
        &self,
        url: &str,
        request: &DocumentRequest,
        progress: &ProgressFn<'_>,
    ) -> Result<Bytes> {
        let limit = self.config.max_download_bytes;
        let headers = merged_headers(&self.config.http_headers, &request.options.http_headers);
        let mut builder = self.client.get(url);
        for (name, value) in headers {
            builder = builder.header(name, value);
        }

        let mut response = builder
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|err| BlattwerkError::Engine(format!("GET {url}: {err}")))?;

        let total = response.content_length();
        if let Some(total) = total.filter(|total| *total > limit) {
            return Err(too_large(url, total, limit));
        }

        let capacity = total.unwrap_or(0).min(MAX_PREALLOCATION);
        let mut body = Vec::with_capacity(usize::try_from(capacity).unwrap_or(0));
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| BlattwerkError::Engine(format!("GET {url}: {err}")))?
        {
            let loaded = (body.len() + chunk.len()) as u64;
            if loaded > limit {
                return Err(too_large(url, loaded, limit));
            }
            body.extend_from_slice(&chunk);
            progress(LoadProgress { loaded, total });
        }

        debug!(url, bytes = body.len(), "document fetched");
        Ok(Bytes::from(body))
    }
}

/// Configured headers overlaid with per-request ones. Names compare
/// case-insensitively and the request wins.
fn merged_headers<'a>(
    configured: &'a BTreeMap<String, String>,
    requested: &'a BTreeMap<String, String>,
) -> BTreeMap<String, &'a str> {
    configured
        .iter()
        .chain(requested)
        .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
        .collect()
}

fn too_large(url: &str, size: u64, limit: u64) -> BlattwerkError {
    BlattwerkError::Engine(format!("GET {url}: {size} bytes exceeds the {limit} byte limit"))
}

#[async_trait]
impl DocumentEngine for LopdfEngine {
    fn name(&self) -> &str {
        "lopdf"
    }

    #[instrument(skip_all, fields(request = %request.describe()))]
    async fn open_document(
        &self,
        request: &DocumentRequest,
        progress: &ProgressFn<'_>,
    ) -> Result<Arc<dyn DocumentHandle>> {
        if request.options.password.is_some() {
            warn!("password supplied but encrypted documents are opened with the empty password");
        }

        let bytes = self.fetch(request, progress).await?;
        let document = tokio::task::spawn_blocking(move || LopdfDocument::parse(&bytes))
            .await
            .map_err(|err| BlattwerkError::Engine(format!("parser task: {err}")))??;

        info!(
            pages = document.page_count(),
            fingerprint = %document.fingerprint,
            "document opened"
        );
        Ok(Arc::new(document))
    }
}

/// A parsed PDF.
pub struct LopdfDocument {
    document: Arc<Document>,
    /// Page object ids keyed by one-based page number.
    pages: BTreeMap<u32, ObjectId>,
    fingerprint: String,
}

impl LopdfDocument {
    /// Parse `bytes` as a PDF. Blocking.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let document = Document::load_mem(bytes).map_err(|err| {
            BlattwerkError::Engine(format!("failed to load PDF from memory: {err}"))
        })?;
        let pages = document.get_pages();
        let fingerprint = trailer_id(&document).unwrap_or_else(|| content_hash(bytes));

        Ok(Self {
            document: Arc::new(document),
            pages,
            fingerprint,
        })
    }
}

#[async_trait]
impl DocumentHandle for LopdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    async fn get_page(&self, number: usize) -> Result<Arc<dyn PageHandle>> {
        let out_of_range = || BlattwerkError::PageOutOfRange {
            number,
            page_count: self.pages.len(),
        };
        let key = u32::try_from(number).map_err(|_| out_of_range())?;
        let page_id = *self.pages.get(&key).ok_or_else(out_of_range)?;

        let size = inherited(&self.document, page_id, b"MediaBox")
            .and_then(media_box_size)
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let rotation = inherited(&self.document, page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .map(|degrees| (degrees.rem_euclid(360)) as i32)
            .unwrap_or(0);

        debug!(number, width = size.0, height = size.1, rotation, "page loaded");

        Ok(Arc::new(LopdfPage {
            document: Arc::clone(&self.document),
            number: key,
            size,
            rotation,
        }))
    }
}

/// One page of a [`LopdfDocument`].
pub struct LopdfPage {
    document: Arc<Document>,
    number: u32,
    size: (f64, f64),
    rotation: i32,
}

#[async_trait]
impl PageHandle for LopdfPage {
    fn number(&self) -> usize {
        self.number as usize
    }

    fn intrinsic_rotation(&self) -> i32 {
        self.rotation
    }

    fn intrinsic_size(&self) -> (f64, f64) {
        self.size
    }

    async fn text_content(&self) -> Result<Vec<TextItem>> {
        let document = Arc::clone(&self.document);
        let number = self.number;
        let text = tokio::task::spawn_blocking(move || document.extract_text(&[number]))
            .await
            .map_err(|err| BlattwerkError::TextExtraction(format!("extractor task: {err}")))?
            .map_err(|err| BlattwerkError::TextExtraction(format!("page {number}: {err}")))?;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| TextItem {
                text: line.to_string(),
            })
            .collect())
    }
}

fn is_http(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Look up `key` on a page, walking up /Parent for inheritable attributes.
fn inherited<'a>(document: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = document.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(resolve(document, value));
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = document.get_dictionary(parent).ok()?;
    }
    warn!("page tree deeper than {MAX_INHERITANCE_DEPTH} levels");
    None
}

fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => document.get_object(*id).unwrap_or(object),
        other => other,
    }
}

fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn media_box_size(object: &Object) -> Option<(f64, f64)> {
    let values = object.as_array().ok()?;
    if values.len() != 4 {
        return None;
    }
    let corners: Vec<f64> = values.iter().filter_map(number).collect();
    if corners.len() != 4 {
        return None;
    }
    Some(((corners[2] - corners[0]).abs(), (corners[3] - corners[1]).abs()))
}

/// First element of the trailer /ID array, hex encoded.
fn trailer_id(document: &Document) -> Option<String> {
    let ids = document.trailer.get(b"ID").ok()?.as_array().ok()?;
    match ids.first()? {
        Object::String(bytes, _) if !bytes.is_empty() => Some(hex::encode(bytes)),
        _ => None,
    }
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
