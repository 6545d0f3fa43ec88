// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blob sources: file-like objects whose bytes are read asynchronously.

use std::path::PathBuf;

use async_trait::async_trait;
use blattwerk_core::error::{BlattwerkError, Result};
use bytes::Bytes;
use tracing::{debug, instrument};

use crate::traits::BlobSource;

/// A blob backed by a file on disk, read when the source is normalised.
pub struct FileBlob {
    path: PathBuf,
    name: Option<String>,
}

impl FileBlob {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());
        Self { path, name }
    }
}

#[async_trait]
impl BlobSource for FileBlob {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn read_bytes(&self) -> Result<Bytes> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            BlattwerkError::Source(format!("failed to read {}: {err}", self.path.display()))
        })?;
        debug!(bytes = bytes.len(), "blob read");
        Ok(Bytes::from(bytes))
    }
}

/// A blob whose bytes are already in memory.
pub struct MemoryBlob {
    name: Option<String>,
    bytes: Bytes,
}

impl MemoryBlob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            name: None,
            bytes: bytes.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl BlobSource for MemoryBlob {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn read_bytes(&self) -> Result<Bytes> {
        Ok(self.bytes.clone())
    }
}
