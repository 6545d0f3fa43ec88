// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk coordination layer.

use serde::{Deserialize, Serialize};

use crate::error::{BlattwerkError, Result};

/// Identifies one load request issued by a controller.
///
/// Tokens increase monotonically per controller; only the result carrying
/// the controller's current token is ever applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestToken(pub u64);

impl RequestToken {
    /// The token a controller starts with, before any request.
    pub const INITIAL: Self = Self(0);

    /// The token following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RequestToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of something loaded asynchronously.
///
/// `Failed` is distinct from `Empty` so observers can tell "failed" apart
/// from "not yet loaded".
#[derive(Debug, Clone, Default)]
pub enum LoadState<T> {
    /// Nothing to show: no source, no document, or no page.
    #[default]
    Empty,
    /// A request is in flight.
    Loading,
    /// The most recent request succeeded.
    Loaded(T),
    /// The most recent request failed.
    Failed,
}

impl<T> LoadState<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }

    /// The loaded value, if any.
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    /// Short name for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loading => "loading",
            Self::Loaded(_) => "loaded",
            Self::Failed => "failed",
        }
    }
}

/// Identifies a page by zero-based index or one-based number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageLocator {
    /// Zero-based page index.
    Index(usize),
    /// One-based page number.
    Number(usize),
}

impl PageLocator {
    /// Build a locator from optional index and number inputs.
    ///
    /// Either may be supplied; when both are, they must name the same page
    /// (`number == index + 1`). Supplying neither yields `Ok(None)`.
    pub fn from_parts(index: Option<usize>, number: Option<usize>) -> Result<Option<Self>> {
        match (index, number) {
            (None, None) => Ok(None),
            (Some(index), None) => Ok(Some(Self::Index(index))),
            (None, Some(number)) => Ok(Some(Self::Number(number))),
            (Some(index), Some(number)) => {
                if index.checked_add(1) == Some(number) {
                    Ok(Some(Self::Index(index)))
                } else {
                    Err(BlattwerkError::LocatorMismatch { index, number })
                }
            }
        }
    }

    /// Zero-based index. `None` for page number 0, which names no page.
    pub fn index(self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(index),
            Self::Number(number) => number.checked_sub(1),
        }
    }

    /// One-based page number.
    pub fn number(self) -> Option<usize> {
        match self {
            Self::Index(index) => index.checked_add(1),
            Self::Number(number) if number > 0 => Some(number),
            Self::Number(_) => None,
        }
    }

    /// One-based page number if the page exists in a document of
    /// `page_count` pages.
    pub fn resolve(self, page_count: usize) -> Option<usize> {
        self.number().filter(|number| *number <= page_count)
    }
}

/// Width and height of a page at some scale and rotation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Viewport of a page whose unrotated size is `width` × `height`.
    ///
    /// Quarter turns swap the axes; rotation is taken modulo 360.
    pub fn of(width: f64, height: f64, scale: f64, rotate: i32) -> Self {
        let (width, height) = if rotate.rem_euclid(180) == 90 {
            (height, width)
        } else {
            (width, height)
        };
        Self {
            width: width * scale,
            height: height * scale,
        }
    }
}

/// User-supplied geometry inputs for a page render.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryOverrides {
    /// Base scale factor. Defaults to 1.0.
    pub scale: Option<f64>,
    /// Rotation in degrees, replacing the page's own rotation.
    pub rotate: Option<i32>,
    /// Target rendered width; the scale is fitted so the page is this wide.
    pub width: Option<f64>,
}

impl GeometryOverrides {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_rotate(mut self, rotate: i32) -> Self {
        self.rotate = Some(rotate);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }
}

/// Resolved scale and rotation for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub scale: f64,
    pub rotate: i32,
}

/// Progress of a document load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadProgress {
    pub loaded: u64,
    /// Total size in bytes when the engine knows it.
    pub total: Option<u64>,
}

/// Reported to the document-level success observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub page_count: usize,
    /// Engine-defined document fingerprint.
    pub fingerprint: String,
}

/// Reported to the page-level success observer.
///
/// Computed once from the page and the geometry in effect when the page
/// finished loading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Zero-based page index.
    pub index: usize,
    /// One-based page number.
    pub number: usize,
    /// Rendered width (`original_width * scale`).
    pub width: f64,
    /// Rendered height (`original_height * scale`).
    pub height: f64,
    pub scale: f64,
    pub rotate: i32,
    /// Intrinsic width of the page at scale 1.
    pub original_width: f64,
    /// Intrinsic height of the page at scale 1.
    pub original_height: f64,
}

impl PageInfo {
    pub fn new(number: usize, original: (f64, f64), geometry: Geometry) -> Self {
        let (original_width, original_height) = original;
        Self {
            index: number.saturating_sub(1),
            number,
            width: original_width * geometry.scale,
            height: original_height * geometry.scale,
            scale: geometry.scale,
            rotate: geometry.rotate,
            original_width,
            original_height,
        }
    }
}

/// One run of text reported by a text surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    pub text: String,
}
