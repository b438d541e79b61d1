//! Placement of overlay text in logical pixels. Rasterisation happens in the
//! viewer; everything here is plain geometry.

use image::Rgba;

use crate::overlay::beats::{BeatAlign, BeatState, TextBeat};
use crate::overlay::loading::{LABEL_FONT_PX, LoadingLayout, LoadingView, PERCENT_FONT_PX};
use crate::overlay::nudge::NudgeView;
use crate::processing::color::with_opacity;

const BEAT_GAP_PX: f32 = 12.0;
/// Caption blocks sit this fraction of the viewport height above the bottom edge.
const BEAT_BOTTOM_FRACTION: f32 = 0.15;
const NUDGE_BOTTOM_PX: f32 = 40.0;
const NUDGE_FONT_PX: f32 = 11.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionWeight {
    Light,
    Medium,
    Black,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub font_px: f32,
    pub line_height_px: f32,
    pub weight: CaptionWeight,
    /// Colour with the caption's opacity folded into alpha.
    pub color: Rgba<u8>,
    pub align: BeatAlign,
    /// Left edge, centre or right edge of the text depending on `align`.
    pub anchor_x: f32,
    pub top: f32,
    pub max_width: f32,
}

impl Caption {
    /// Left edge of a box of `width` placed according to the alignment.
    pub fn left_for_width(&self, width: f32) -> f32 {
        match self.align {
            BeatAlign::Left => self.anchor_x,
            BeatAlign::Center => self.anchor_x - width / 2.0,
            BeatAlign::Right => self.anchor_x - width,
        }
    }
}

pub fn headline_px(viewport_width: f32) -> f32 {
    (viewport_width * 0.055).clamp(28.8, 80.0)
}

pub fn subtext_px(viewport_width: f32) -> f32 {
    (viewport_width * 0.015).clamp(12.0, 17.6)
}

pub fn horizontal_inset(viewport_width: f32) -> f32 {
    if viewport_width < 768.0 {
        32.0
    } else if viewport_width < 1024.0 {
        64.0
    } else {
        112.0
    }
}

fn anchor_for(align: BeatAlign, width: f32) -> f32 {
    match align {
        BeatAlign::Left => horizontal_inset(width),
        BeatAlign::Center => width / 2.0,
        BeatAlign::Right => width - horizontal_inset(width),
    }
}

fn black(alpha: f32) -> Rgba<u8> {
    with_opacity(Rgba([0, 0, 0, 255]), alpha)
}

/// Headline and subtext of a beat, or nothing while it is transparent.
pub fn beat_captions(
    beat: &TextBeat,
    state: BeatState,
    (width, height): (f32, f32),
    alpha: f32,
) -> Vec<Caption> {
    let opacity = state.opacity * alpha;
    if opacity <= 0.0 {
        return Vec::new();
    }
    let head_px = headline_px(width);
    let sub_px = subtext_px(width);
    let sub_line = sub_px * 1.5;
    let has_sub = !beat.sub.trim().is_empty();
    let block = head_px + if has_sub { BEAT_GAP_PX + sub_line } else { 0.0 };
    let top = height * (1.0 - BEAT_BOTTOM_FRACTION) - block + state.offset_y;
    let anchor_x = anchor_for(beat.align, width);
    let max_width = (width - 2.0 * horizontal_inset(width)).max(1.0);

    let mut captions = vec![Caption {
        text: beat.text.clone(),
        font_px: head_px,
        line_height_px: head_px,
        weight: CaptionWeight::Black,
        color: black(0.85 * opacity),
        align: beat.align,
        anchor_x,
        top,
        max_width,
    }];
    if has_sub {
        captions.push(Caption {
            text: beat.sub.to_uppercase(),
            font_px: sub_px,
            line_height_px: sub_line,
            weight: CaptionWeight::Light,
            color: black(0.35 * opacity),
            align: beat.align,
            anchor_x,
            top: top + head_px + BEAT_GAP_PX,
            max_width,
        });
    }
    captions
}

pub fn nudge_caption(view: NudgeView, (width, height): (f32, f32), alpha: f32) -> Option<Caption> {
    if !view.visible || alpha <= 0.0 {
        return None;
    }
    let line = NUDGE_FONT_PX * 1.5;
    Some(Caption {
        text: format!("SCROLL {}", view.direction.chevron()),
        font_px: NUDGE_FONT_PX,
        line_height_px: line,
        weight: CaptionWeight::Medium,
        color: black(0.4 * alpha),
        align: BeatAlign::Center,
        anchor_x: width / 2.0,
        top: height - NUDGE_BOTTOM_PX - line,
        max_width: width.max(1.0),
    })
}

/// Label above the progress bar and the percentage below it.
pub fn loading_captions(
    view: LoadingView,
    label: &str,
    (width, height): (f32, f32),
) -> Vec<Caption> {
    if view.opacity <= 0.0 {
        return Vec::new();
    }
    let layout = LoadingLayout::centered(width, height);
    let caption = |text: String, font_px: f32, top: f32, alpha: f32| Caption {
        text,
        font_px,
        line_height_px: font_px * 1.5,
        weight: CaptionWeight::Medium,
        color: black(alpha * view.opacity),
        align: BeatAlign::Center,
        anchor_x: width / 2.0,
        top,
        max_width: width.max(1.0),
    };
    vec![
        caption(label.to_uppercase(), LABEL_FONT_PX, layout.label_top, 0.25),
        caption(format!("{}%", view.percent), PERCENT_FONT_PX, layout.percent_top, 0.2),
    ]
}
