// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Geometry resolver. Turns user overrides and a page's intrinsic properties
// into the scale and rotation a render pass uses.

use blattwerk_bridge::traits::PageHandle;
use blattwerk_core::types::{Geometry, GeometryOverrides};
use tracing::warn;

/// Resolve the effective geometry for `page`.
///
/// * `rotate` is the override when present, else the page's own rotation.
/// * `scale` is the base scale (default 1.0) times a fit factor. With a
///   target width, the fit factor makes the rotated viewport exactly that
///   wide; without one it is 1.
///
/// Non-finite or non-positive scale and width inputs are ignored.
pub fn resolve(page: &dyn PageHandle, overrides: &GeometryOverrides) -> Geometry {
    let rotate = overrides.rotate.unwrap_or_else(|| page.intrinsic_rotation());

    let base = match overrides.scale {
        Some(scale) if scale.is_finite() && scale > 0.0 => scale,
        Some(scale) => {
            warn!(scale, page = page.number(), "ignoring invalid scale override");
            1.0
        }
        None => 1.0,
    };

    let fit = match overrides.width {
        Some(width) if width.is_finite() && width > 0.0 => {
            let natural = page.viewport(base, rotate).width;
            if natural > 0.0 { width / natural } else { 1.0 }
        }
        Some(width) => {
            warn!(width, page = page.number(), "ignoring invalid width override");
            1.0
        }
        None => 1.0,
    };

    Geometry {
        scale: base * fit,
        rotate,
    }
}
