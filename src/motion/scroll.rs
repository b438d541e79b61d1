//! Virtual scroll region and the progress values derived from it.

use std::time::Duration;

use crate::config::{ScrollConfig, SpringConfig};
use crate::motion::spring::Spring;

/// Scroll position inside a region `height-multiple` viewports tall.
///
/// `raw` follows the offset exactly; `smoothed` chases it through a spring.
#[derive(Debug, Clone)]
pub struct ScrollProgress {
    offset: f32,
    viewport_height: f32,
    height_multiple: f32,
    spring: Spring,
}

impl ScrollProgress {
    pub fn new(scroll: &ScrollConfig, spring: SpringConfig) -> Self {
        Self {
            offset: 0.0,
            viewport_height: 0.0,
            height_multiple: scroll.height_multiple,
            spring: Spring::new(0.0, spring),
        }
    }

    /// Scrollable distance in CSS pixels.
    pub fn range(&self) -> f32 {
        ((self.height_multiple - 1.0) * self.viewport_height).max(0.0)
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn raw(&self) -> f32 {
        let range = self.range();
        if range > 0.0 {
            (self.offset / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    pub fn smoothed(&self) -> f32 {
        (self.spring.value() as f32).clamp(0.0, 1.0)
    }

    pub fn is_animating(&self) -> bool {
        !self.spring.is_at_rest()
    }

    /// Moves the offset by `delta` CSS pixels. Returns whether `raw` changed.
    pub fn scroll_by(&mut self, delta: f32) -> bool {
        self.set_offset(self.offset + delta)
    }

    /// Moves to `fraction` of the scrollable range.
    pub fn scroll_to(&mut self, fraction: f32) -> bool {
        self.set_offset(fraction.clamp(0.0, 1.0) * self.range())
    }

    /// Adopts a new viewport height while keeping the scroll fraction.
    pub fn set_viewport_height(&mut self, height: f32) {
        let fraction = self.raw();
        self.viewport_height = height.max(0.0);
        self.offset = fraction * self.range();
    }

    pub fn advance(&mut self, dt: Duration) -> bool {
        self.spring.advance(dt)
    }

    /// Snaps `smoothed` onto `raw`.
    pub fn settle(&mut self) {
        self.spring.jump(f64::from(self.raw()));
    }

    fn set_offset(&mut self, offset: f32) -> bool {
        let before = self.raw();
        self.offset = offset.clamp(0.0, self.range());
        let raw = self.raw();
        self.spring.set_target(f64::from(raw));
        raw != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(viewport_height: f32) -> ScrollProgress {
        let mut p = ScrollProgress::new(&ScrollConfig::default(), SpringConfig::default());
        p.set_viewport_height(viewport_height);
        p
    }

    #[test]
    fn raw_is_offset_over_range() {
        let mut p = progress(900.0);
        assert_eq!(p.range(), 2700.0);
        p.scroll_by(1350.0);
        assert_eq!(p.raw(), 0.5);
    }

    #[test]
    fn offset_is_clamped() {
        let mut p = progress(900.0);
        assert!(!p.scroll_by(-50.0));
        assert_eq!(p.offset(), 0.0);
        p.scroll_by(1.0e6);
        assert_eq!(p.raw(), 1.0);
    }

    #[test]
    fn resize_preserves_fraction() {
        let mut p = progress(900.0);
        p.scroll_to(0.3);
        p.set_viewport_height(800.0);
        assert!((p.raw() - 0.3).abs() < 1e-6);
        assert!((p.offset() - 0.3 * 2400.0).abs() < 1e-3);
    }

    #[test]
    fn smoothed_lags_then_settles() {
        let mut p = progress(900.0);
        p.scroll_to(1.0);
        p.advance(Duration::from_millis(16));
        assert!(p.smoothed() < p.raw());
        p.settle();
        assert_eq!(p.smoothed(), 1.0);
        assert!(!p.is_animating());
    }
}
