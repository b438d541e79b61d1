//! Fit geometry for drawing a cropped source frame into a destination area.
//!
//! All rectangles here are in logical (CSS) pixels. Device pixel scaling is
//! applied later by the canvas transform.

use anyhow::{Result, ensure};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn from_size(width: f32, height: f32) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Fractions of the source height trimmed from the top and bottom edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSpec {
    top: f32,
    bottom: f32,
}

impl CropSpec {
    pub const NONE: Self = Self {
        top: 0.0,
        bottom: 0.0,
    };

    pub fn new(top: f32, bottom: f32) -> Result<Self> {
        ensure!(
            top.is_finite() && (0.0..1.0).contains(&top),
            "crop top must lie in [0, 1)"
        );
        ensure!(
            bottom.is_finite() && (0.0..1.0).contains(&bottom),
            "crop bottom must lie in [0, 1)"
        );
        ensure!(top + bottom < 1.0, "crop top + bottom must be less than 1");
        Ok(Self { top, bottom })
    }

    pub fn top(&self) -> f32 {
        self.top
    }

    pub fn bottom(&self) -> f32 {
        self.bottom
    }

    /// Source rectangle left after removing the letterbox bands, full width.
    pub fn source_rect(&self, src_w: u32, src_h: u32) -> Rect {
        let h = src_h as f32;
        let y = (h * self.top).floor();
        let height = (h * (1.0 - self.top - self.bottom)).floor();
        Rect::new(0.0, y, src_w as f32, height)
    }
}

/// Normalised anchor that decides which part of an over-scaled frame stays visible.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocalPoint {
    pub x: f32,
    pub y: f32,
}

impl FocalPoint {
    pub const CENTER: Self = Self { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x: x.clamp(0.0, 1.0),
            y: y.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitMode {
    Cover,
    Contain,
}

impl FitMode {
    /// Portrait destinations letterbox the frame, everything else crops it.
    pub fn for_viewport(width: f32, height: f32) -> Self {
        if height > width {
            Self::Contain
        } else {
            Self::Cover
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fit {
    pub src_rect: Rect,
    pub dest_rect: Rect,
    pub scale: f32,
}

/// Computes where the cropped source lands inside a `dst_w × dst_h` area.
///
/// Returns `None` when either side is degenerate.
pub fn compute_fit(
    src_w: u32,
    src_h: u32,
    dst_w: f32,
    dst_h: f32,
    crop: CropSpec,
    mode: FitMode,
    focus: FocalPoint,
) -> Option<Fit> {
    if src_w == 0 || src_h == 0 || !(dst_w > 0.0 && dst_h > 0.0) {
        return None;
    }
    let src_rect = crop.source_rect(src_w, src_h);
    if src_rect.is_empty() {
        return None;
    }

    let sx = dst_w / src_rect.width;
    let sy = dst_h / src_rect.height;
    let scale = match mode {
        FitMode::Cover => sx.max(sy),
        FitMode::Contain => sx.min(sy),
    };
    let draw_w = src_rect.width * scale;
    let draw_h = src_rect.height * scale;

    let (dx, dy) = match mode {
        FitMode::Cover => (
            anchor_offset(dst_w, draw_w, focus.x),
            anchor_offset(dst_h, draw_h, focus.y),
        ),
        FitMode::Contain => ((dst_w - draw_w) / 2.0, (dst_h - draw_h) / 2.0),
    };

    Some(Fit {
        src_rect,
        dest_rect: Rect::new(dx, dy, draw_w, draw_h),
        scale,
    })
}

// overflow is <= 0 under cover; the offset never uncovers an edge
fn anchor_offset(dst: f32, drawn: f32, fraction: f32) -> f32 {
    let overflow = (dst - drawn).min(0.0);
    (overflow * fraction).clamp(overflow, 0.0)
}
