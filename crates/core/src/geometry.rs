//! Margin-to-rectangle mapping.
//!
//! Two coordinate spaces are in play. Raster space (used by the preview)
//! has its origin at the top-left corner with Y growing downward. PDF user
//! space (used by redaction) has its origin at the bottom-left corner of the
//! page box with Y growing upward. The two mappings below produce the same
//! visual region in their respective spaces; [`BandRect::flip_vertical`]
//! converts one into the other.

use serde::{Deserialize, Serialize};

use crate::margins::{Band, Margins};
use crate::{CoreError, Result};

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Result<Self> {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(CoreError::Geometry(format!(
                "page size {width}x{height} is not a positive area"
            )));
        }
        Ok(Self { width, height })
    }

    /// Whether two sizes agree within `tolerance` points on both axes.
    pub fn approx_eq(&self, other: &PageSize, tolerance: f32) -> bool {
        (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// An axis-aligned band rectangle, page-relative.
///
/// `y0 <= y1` is not guaranteed for rectangles built from oversized
/// margins; use [`BandRect::clamp_to`] before drawing or redacting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandRect {
    pub band: Band,
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BandRect {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0.0 && self.height() > 0.0)
    }

    /// Restricts the rectangle to `[0, W] x [0, H]`.
    ///
    /// Returns `None` when nothing of positive area is left.
    pub fn clamp_to(&self, page: PageSize) -> Option<BandRect> {
        let clamped = BandRect {
            band: self.band,
            x0: self.x0.clamp(0.0, page.width),
            y0: self.y0.clamp(0.0, page.height),
            x1: self.x1.clamp(0.0, page.width),
            y1: self.y1.clamp(0.0, page.height),
        };
        if clamped.is_degenerate() {
            None
        } else {
            Some(clamped)
        }
    }

    /// Mirrors the rectangle across the horizontal centre line of the page,
    /// switching between raster space and PDF user space.
    pub fn flip_vertical(&self, page: PageSize) -> BandRect {
        BandRect {
            band: self.band,
            x0: self.x0,
            y0: page.height - self.y1,
            x1: self.x1,
            y1: page.height - self.y0,
        }
    }

    /// True when the two rectangles share an area greater than zero.
    pub fn overlaps(&self, other: &BandRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    pub fn scaled(&self, factor: f32) -> BandRect {
        BandRect {
            band: self.band,
            x0: self.x0 * factor,
            y0: self.y0 * factor,
            x1: self.x1 * factor,
            y1: self.y1 * factor,
        }
    }

    /// The rectangle as `[x0, y0, x1, y1]`.
    pub fn to_array(&self) -> [f32; 4] {
        [self.x0, self.y0, self.x1, self.y1]
    }
}

/// Bands for the preview overlay, in raster space.
///
/// The top band hangs from the visual top of the page and the bottom band
/// rises from the visual bottom. Zero margins produce no band.
pub fn preview_bands(page: PageSize, margins: Margins) -> Vec<BandRect> {
    let mut bands = Vec::with_capacity(2);
    if margins.top > 0.0 {
        bands.push(BandRect {
            band: Band::Top,
            x0: 0.0,
            y0: 0.0,
            x1: page.width,
            y1: margins.top,
        });
    }
    if margins.bottom > 0.0 {
        bands.push(BandRect {
            band: Band::Bottom,
            x0: 0.0,
            y0: page.height - margins.bottom,
            x1: page.width,
            y1: page.height,
        });
    }
    bands
}

/// Bands for redaction, in PDF user space relative to the page box origin.
///
/// The top band spans `H - top .. H` and the bottom band `0 .. bottom`.
/// Oversized margins yield rectangles that extend past the page; callers
/// clamp them.
pub fn redaction_bands(page: PageSize, margins: Margins) -> Vec<BandRect> {
    let mut bands = Vec::with_capacity(2);
    if margins.top > 0.0 {
        bands.push(BandRect {
            band: Band::Top,
            x0: 0.0,
            y0: page.height - margins.top,
            x1: page.width,
            y1: page.height,
        });
    }
    if margins.bottom > 0.0 {
        bands.push(BandRect {
            band: Band::Bottom,
            x0: 0.0,
            y0: 0.0,
            x1: page.width,
            y1: margins.bottom,
        });
    }
    bands
}
