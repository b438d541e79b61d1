//! CPU drawing surface with a backing RGBA buffer in physical pixels and a
//! uniform scale transform, so callers draw in logical pixels.

use std::f32::consts::TAU;

use anyhow::Result;
use image::{Rgba, RgbaImage};

use crate::processing::color::blend_over;
use crate::processing::layout::Rect;
use crate::processing::resample::Resampler;

/// Uniform scale from logical to physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f32,
}

impl Transform {
    pub const IDENTITY: Self = Self { scale: 1.0 };

    pub fn scale_factor(&self) -> f32 {
        self.scale
    }

    fn map(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.x * self.scale,
            rect.y * self.scale,
            rect.width * self.scale,
            rect.height * self.scale,
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

pub struct Canvas {
    pixels: RgbaImage,
    transform: Transform,
    resampler: Resampler,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            transform: Transform::IDENTITY,
            resampler: Resampler::default(),
        }
    }

    /// Wraps existing pixels with an identity transform.
    pub fn from_image(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            transform: Transform::IDENTITY,
            resampler: Resampler::default(),
        }
    }

    pub fn into_pixels(self) -> RgbaImage {
        self.pixels
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Reallocates the backing buffer. Like assigning a canvas element's
    /// size, this clears the contents and drops the transform.
    pub fn set_size(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
        self.transform = Transform::IDENTITY;
    }

    /// Overwrites every pixel, ignoring the transform.
    pub fn clear(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
    }

    /// Multiplies the current transform, it does not replace it.
    pub fn scale(&mut self, factor: f32) {
        self.transform.scale *= factor;
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        let Some((x0, y0, x1, y1)) = self.device_bounds(self.transform.map(rect)) else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                blend_over(self.pixels.get_pixel_mut(x, y), color, 1.0);
            }
        }
    }

    /// Strokes part of a circle with anti-aliased edges. Angles are in turns,
    /// clockwise from twelve o'clock; `sweep >= 1` strokes the full circle.
    pub fn stroke_arc(
        &mut self,
        center: (f32, f32),
        radius: f32,
        stroke: f32,
        start: f32,
        sweep: f32,
        color: Rgba<u8>,
    ) {
        let s = self.transform.scale;
        let (cx, cy) = (center.0 * s, center.1 * s);
        let (r, half) = (radius * s, stroke * s / 2.0);
        let reach = r + half + 1.0;
        let Some((x0, y0, x1, y1)) =
            self.device_bounds(Rect::new(cx - reach, cy - reach, 2.0 * reach, 2.0 * reach))
        else {
            return;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let distance = ((dx * dx + dy * dy).sqrt() - r).abs();
                let coverage = (half + 0.5 - distance).clamp(0.0, 1.0);
                if coverage <= 0.0 {
                    continue;
                }
                if sweep < 1.0 {
                    let turn = (dx.atan2(-dy) / TAU).rem_euclid(1.0);
                    if (turn - start).rem_euclid(1.0) >= sweep {
                        continue;
                    }
                }
                blend_over(self.pixels.get_pixel_mut(x, y), color, coverage);
            }
        }
    }

    /// Draws the `src` region of `image` (source pixels) into `dst` (logical
    /// pixels). Only the part of `dst` inside the buffer is resampled.
    pub fn draw_image(
        &mut self,
        image: &RgbaImage,
        src: Rect,
        dst: Rect,
        opacity: f32,
    ) -> Result<()> {
        if src.is_empty() || opacity <= 0.0 {
            return Ok(());
        }
        let device = self.transform.map(dst);
        let Some((x0, y0, x1, y1)) = self.device_bounds(device) else {
            return Ok(());
        };

        let sx = src.width / device.width;
        let sy = src.height / device.height;
        let visible_src = Rect::new(
            src.x + (x0 as f32 - device.x) * sx,
            src.y + (y0 as f32 - device.y) * sy,
            (x1 - x0) as f32 * sx,
            (y1 - y0) as f32 * sy,
        );
        let patch = self
            .resampler
            .resample(image, visible_src, x1 - x0, y1 - y0)?;

        for (px, py, pixel) in patch.enumerate_pixels() {
            blend_over(self.pixels.get_pixel_mut(x0 + px, y0 + py), *pixel, opacity);
        }
        Ok(())
    }

    // rounds to whole device pixels and clips to the buffer
    fn device_bounds(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        if rect.is_empty() {
            return None;
        }
        let w = self.pixels.width() as f32;
        let h = self.pixels.height() as f32;
        let x0 = rect.x.round().clamp(0.0, w) as u32;
        let y0 = rect.y.round().clamp(0.0, h) as u32;
        let x1 = rect.right().round().clamp(0.0, w) as u32;
        let y1 = rect.bottom().round().clamp(0.0, h) as u32;
        (x1 > x0 && y1 > y0).then_some((x0, y0, x1, y1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn scale_maps_logical_to_device_pixels() {
        let mut canvas = Canvas::new(4, 4);
        canvas.scale(2.0);
        canvas.fill_rect(Rect::new(0.0, 0.0, 1.0, 1.0), RED);
        let painted = canvas.pixels().pixels().filter(|p| **p == RED).count();
        assert_eq!(painted, 4);
        assert_eq!(*canvas.pixels().get_pixel(1, 1), RED);
        assert_eq!(canvas.pixels().get_pixel(2, 2)[3], 0);
    }

    #[test]
    fn scale_accumulates_until_reset() {
        let mut canvas = Canvas::new(2, 2);
        canvas.scale(2.0);
        canvas.scale(2.0);
        assert_eq!(canvas.transform().scale_factor(), 4.0);
        canvas.set_transform(Transform::IDENTITY);
        canvas.scale(2.0);
        assert_eq!(canvas.transform().scale_factor(), 2.0);
    }

    #[test]
    fn set_size_clears_contents_and_transform() {
        let mut canvas = Canvas::new(2, 2);
        canvas.scale(3.0);
        canvas.fill_rect(Rect::from_size(2.0, 2.0), RED);
        canvas.set_size(2, 2);
        assert!(canvas.pixels().pixels().all(|p| p[3] == 0));
        assert_eq!(canvas.transform(), Transform::IDENTITY);
    }

    #[test]
    fn clear_paints_whole_buffer() {
        let mut canvas = Canvas::new(3, 2);
        canvas.scale(4.0);
        canvas.clear(RED);
        assert!(canvas.pixels().pixels().all(|p| *p == RED));
    }

    #[test]
    fn arc_strokes_only_its_window() {
        let mut canvas = Canvas::new(20, 20);
        canvas.scale(2.0);
        // top quarter, centred on twelve o'clock
        canvas.stroke_arc((5.0, 5.0), 4.0, 1.0, -0.125, 0.25, RED);
        assert_eq!(*canvas.pixels().get_pixel(10, 2), RED);
        assert_eq!(canvas.pixels().get_pixel(10, 17)[3], 0);
        assert_eq!(canvas.pixels().get_pixel(17, 10)[3], 0);
        assert_eq!(canvas.pixels().get_pixel(10, 10)[3], 0);

        canvas.stroke_arc((5.0, 5.0), 4.0, 1.0, 0.0, 1.0, RED);
        assert_eq!(*canvas.pixels().get_pixel(10, 17), RED);
        assert_eq!(*canvas.pixels().get_pixel(2, 10), RED);
        assert_eq!(canvas.pixels().get_pixel(10, 10)[3], 0);
    }

    #[test]
    fn draw_clips_to_buffer() {
        let image = RgbaImage::from_pixel(8, 8, RED);
        let mut canvas = Canvas::new(4, 4);
        canvas
            .draw_image(
                &image,
                Rect::from_size(8.0, 8.0),
                Rect::new(-4.0, -4.0, 8.0, 8.0),
                1.0,
            )
            .unwrap();
        assert!(canvas.pixels().pixels().all(|p| *p == RED));
    }

    #[test]
    fn draw_outside_buffer_is_noop() {
        let image = RgbaImage::from_pixel(2, 2, RED);
        let mut canvas = Canvas::new(4, 4);
        canvas
            .draw_image(
                &image,
                Rect::from_size(2.0, 2.0),
                Rect::new(10.0, 10.0, 2.0, 2.0),
                1.0,
            )
            .unwrap();
        assert!(canvas.pixels().pixels().all(|p| p[3] == 0));
    }
}
