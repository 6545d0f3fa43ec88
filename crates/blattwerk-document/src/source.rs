// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source normalizer. Maps every accepted source shape onto one canonical
// `DocumentRequest`, or onto "no source".

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use blattwerk_bridge::blob::FileBlob;
use blattwerk_bridge::request::{DocumentRequest, RequestOptions, RequestTarget};
use blattwerk_bridge::traits::{BlobSource, RangeTransport};
use blattwerk_core::config::EngineConfig;
use blattwerk_core::error::{BlattwerkError, Result};
use bytes::Bytes;
use tracing::{debug, instrument};

/// Data URIs in the wild are padded and unpadded alike.
const DATA_URI_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Anything a document can be loaded from.
#[derive(Clone, Default)]
pub enum Source {
    /// No source. A valid state, not an error.
    #[default]
    None,
    /// A URL, file path, or `data:` URI.
    Url(String),
    /// Bytes already in memory.
    Bytes(Bytes),
    /// A file-like object read asynchronously.
    Blob(Arc<dyn BlobSource>),
    /// A parameter object.
    Params(SourceParams),
}

/// Parameter-object form of a source.
///
/// `data` takes precedence over `url`; the remaining fields are carried into
/// the request options.
#[derive(Clone, Default)]
pub struct SourceParams {
    pub url: Option<String>,
    pub data: Option<Bytes>,
    pub range: Option<Arc<dyn RangeTransport>>,
    pub http_headers: BTreeMap<String, String>,
    /// Overrides [`EngineConfig::with_credentials`] when set.
    pub with_credentials: Option<bool>,
    pub password: Option<String>,
}

impl Source {
    /// A file on disk, read as a blob when the source is normalised.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::Blob(Arc::new(FileBlob::new(path)))
    }

    /// Whether this is the absent source.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Url(_) => "url",
            Self::Bytes(_) => "bytes",
            Self::Blob(_) => "blob",
            Self::Params(_) => "params",
        }
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("Source::None"),
            Self::Url(url) if is_data_uri(url) => write!(f, "Source::Url(<data URI, {} chars>)", url.len()),
            Self::Url(url) => write!(f, "Source::Url({url:?})"),
            Self::Bytes(bytes) => write!(f, "Source::Bytes({} bytes)", bytes.len()),
            Self::Blob(blob) => write!(f, "Source::Blob({:?})", blob.name()),
            Self::Params(params) => f
                .debug_struct("Source::Params")
                .field("url", &params.url.as_ref().map(|u| u.len()))
                .field("data", &params.data.as_ref().map(Bytes::len))
                .field("range", &params.range.as_ref().map(|r| r.length()))
                .finish_non_exhaustive(),
        }
    }
}

impl From<&str> for Source {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for Source {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

impl From<Vec<u8>> for Source {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<Bytes> for Source {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<SourceParams> for Source {
    fn from(params: SourceParams) -> Self {
        Self::Params(params)
    }
}

impl<T: Into<Source>> From<Option<T>> for Source {
    fn from(source: Option<T>) -> Self {
        source.map_or(Self::None, Into::into)
    }
}

/// Normalise `source` into a canonical request.
///
/// Returns `Ok(None)` for absent or empty sources. Blob sources are read
/// here, so this is a suspension point.
#[instrument(skip_all, fields(kind = source.kind()))]
pub async fn normalize(source: Source, config: &EngineConfig) -> Result<Option<DocumentRequest>> {
    let base_options = RequestOptions {
        with_credentials: config.with_credentials,
        ..Default::default()
    };

    let request = match source {
        Source::None => None,
        Source::Url(url) => from_string(&url, config)?.map(|target| DocumentRequest {
            target,
            options: base_options,
        }),
        Source::Bytes(bytes) => non_empty(bytes).map(|bytes| DocumentRequest {
            target: RequestTarget::Data(bytes),
            options: base_options,
        }),
        Source::Blob(blob) => {
            let bytes = blob.read_bytes().await.map_err(|err| match err {
                BlattwerkError::Source(_) => err,
                other => BlattwerkError::Source(other.to_string()),
            })?;
            non_empty(bytes).map(|bytes| DocumentRequest {
                target: RequestTarget::Data(bytes),
                options: base_options,
            })
        }
        Source::Params(params) => from_params(params, config)?,
    };

    match &request {
        Some(request) => debug!(request = %request.describe(), "source normalised"),
        None => debug!("no source"),
    }
    Ok(request)
}

fn from_params(params: SourceParams, config: &EngineConfig) -> Result<Option<DocumentRequest>> {
    let SourceParams {
        url,
        data,
        range,
        http_headers,
        with_credentials,
        password,
    } = params;

    let target = match data.and_then(non_empty) {
        Some(bytes) => Some(RequestTarget::Data(bytes)),
        None => match url {
            Some(url) => from_string(&url, config)?,
            None => None,
        },
    };

    let options = RequestOptions {
        http_headers,
        with_credentials: with_credentials.unwrap_or(config.with_credentials),
        password,
        range,
    };

    match target {
        Some(target) => Ok(Some(DocumentRequest { target, options })),
        None if options.range.is_some() => Err(BlattwerkError::UnsupportedSource(
            "range transport given without a url or data".into(),
        )),
        None => Ok(None),
    }
}

fn from_string(raw: &str, config: &EngineConfig) -> Result<Option<RequestTarget>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if is_data_uri(trimmed) {
        let bytes = decode_data_uri(trimmed, config.max_inline_bytes)?;
        return Ok(non_empty(bytes).map(RequestTarget::Data));
    }
    resolve_url(trimmed, config.base_url.as_deref()).map(|url| Some(RequestTarget::Url(url)))
}

fn non_empty(bytes: Bytes) -> Option<Bytes> {
    (!bytes.is_empty()).then_some(bytes)
}

fn is_data_uri(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Resolve a relative URL against `base`. Absolute URLs, absolute file
/// paths, and anything when no base is configured pass through unchanged.
fn resolve_url(raw: &str, base: Option<&str>) -> Result<String> {
    if Path::new(raw).is_absolute() {
        return Ok(raw.to_string());
    }
    match (url::Url::parse(raw), base) {
        (Err(url::ParseError::RelativeUrlWithoutBase), Some(base)) => url::Url::parse(base)
            .and_then(|base| base.join(raw))
            .map(String::from)
            .map_err(|err| {
                BlattwerkError::Source(format!("cannot resolve {raw} against {base}: {err}"))
            }),
        _ => Ok(raw.to_string()),
    }
}

/// Decode a `data:[<mediatype>][;base64],<payload>` URI.
pub fn decode_data_uri(uri: &str, max_bytes: usize) -> Result<Bytes> {
    let rest = uri
        .get(5..)
        .ok_or_else(|| BlattwerkError::Source("truncated data URI".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| BlattwerkError::Source("data URI has no ',' separator".into()))?;
    let is_base64 = meta
        .split(';')
        .any(|param| param.trim().eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let unescaped = urlencoding::decode(payload)
            .map_err(|err| BlattwerkError::Source(format!("data URI is not valid UTF-8: {err}")))?;
        let compact: String = unescaped.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        DATA_URI_BASE64
            .decode(compact.as_bytes())
            .map_err(|err| BlattwerkError::Source(format!("invalid base64 in data URI: {err}")))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };

    if bytes.len() > max_bytes {
        return Err(BlattwerkError::Source(format!(
            "data URI payload of {} bytes exceeds the {max_bytes} byte limit",
            bytes.len()
        )));
    }
    Ok(Bytes::from(bytes))
}
