use image::{Rgba, RgbaImage};
use tracing::{debug, trace, warn};

use crate::frames::FrameStore;
use crate::processing::blur::apply_blur;
use crate::processing::layout::{CropSpec, FitMode, FocalPoint, Rect, compute_fit};
use crate::render::canvas::{Canvas, Transform};

/// Logical size of the drawing area and the display's pixel density.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub css_width: f32,
    pub css_height: f32,
    pub device_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(css_width: f32, css_height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            css_width: css_width.max(0.0),
            css_height: css_height.max(0.0),
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Viewport of a window whose inner size is `width × height` physical pixels.
    pub fn from_physical(width: u32, height: u32, scale_factor: f64) -> Self {
        let dpr = if scale_factor > 0.0 { scale_factor } else { 1.0 };
        Self::new(
            (f64::from(width) / dpr) as f32,
            (f64::from(height) / dpr) as f32,
            dpr as f32,
        )
    }

    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.css_width * self.device_pixel_ratio).round() as u32,
            (self.css_height * self.device_pixel_ratio).round() as u32,
        )
    }

    pub fn has_area(&self) -> bool {
        self.css_width > 0.0 && self.css_height > 0.0
    }

    pub fn logical_rect(&self) -> Rect {
        Rect::from_size(self.css_width, self.css_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn { mode: FitMode, background: bool },
    SkippedZeroArea,
    SkippedNotDecoded,
    SkippedFailed,
}

impl DrawOutcome {
    pub fn is_drawn(&self) -> bool {
        matches!(self, DrawOutcome::Drawn { .. })
    }
}

/// Fixed drawing parameters of the surface.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceStyle {
    pub fog: Rgba<u8>,
    pub crop: CropSpec,
    pub focus: FocalPoint,
    pub background_opacity: f32,
    pub background_sample_px: u32,
    pub background_sigma: f32,
}

struct PortraitBackground {
    logical_size: (f32, f32),
    image: RgbaImage,
}

pub struct RenderSurface {
    canvas: Canvas,
    viewport: Viewport,
    style: SurfaceStyle,
    background: Option<PortraitBackground>,
    generation: u64,
}

impl RenderSurface {
    pub fn new(style: SurfaceStyle) -> Self {
        Self {
            canvas: Canvas::new(0, 0),
            viewport: Viewport::new(0.0, 0.0, 1.0),
            style,
            background: None,
            generation: 0,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn pixels(&self) -> &RgbaImage {
        self.canvas.pixels()
    }

    /// Bumped whenever the backing buffer's contents change.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fit_mode(&self) -> FitMode {
        FitMode::for_viewport(self.viewport.css_width, self.viewport.css_height)
    }

    /// Matches the backing buffer to `viewport`. The transform is always
    /// rebuilt from identity, so repeated calls never compound the scale.
    pub fn resize(&mut self, viewport: Viewport) {
        let (width, height) = viewport.physical_size();
        if (width, height) != (self.canvas.width(), self.canvas.height()) {
            self.canvas.set_size(width, height);
            // a fresh buffer shows fog until a frame lands on it
            self.canvas.clear(self.style.fog);
            self.generation += 1;
            debug!(
                css_width = viewport.css_width,
                css_height = viewport.css_height,
                dpr = viewport.device_pixel_ratio,
                width,
                height,
                "render surface resized"
            );
        }
        self.canvas.set_transform(Transform::IDENTITY);
        self.canvas.scale(viewport.device_pixel_ratio);

        let logical = (viewport.css_width, viewport.css_height);
        if self
            .background
            .as_ref()
            .is_some_and(|bg| bg.logical_size != logical)
        {
            self.background = None;
        }
        self.viewport = viewport;
    }

    pub fn draw_frame(&mut self, index: usize, frames: &FrameStore) -> DrawOutcome {
        if !self.viewport.has_area() || self.canvas.width() == 0 || self.canvas.height() == 0 {
            trace!(index, "draw skipped: surface has no area");
            return DrawOutcome::SkippedZeroArea;
        }
        let Some(image) = frames.image(index).cloned() else {
            trace!(index, "draw skipped: frame not decoded");
            return DrawOutcome::SkippedNotDecoded;
        };

        let (w, h) = (self.viewport.css_width, self.viewport.css_height);
        let mode = FitMode::for_viewport(w, h);
        let Some(fit) = compute_fit(
            image.width(),
            image.height(),
            w,
            h,
            self.style.crop,
            mode,
            self.style.focus,
        ) else {
            return DrawOutcome::SkippedZeroArea;
        };

        self.canvas.fill_rect(self.viewport.logical_rect(), self.style.fog);
        self.generation += 1;

        let mut background = false;
        if mode == FitMode::Contain {
            self.ensure_background(frames);
            if let Some(bg) = self.background.as_ref() {
                let src = Rect::from_size(bg.image.width() as f32, bg.image.height() as f32);
                match self.canvas.draw_image(
                    &bg.image,
                    src,
                    self.viewport.logical_rect(),
                    self.style.background_opacity,
                ) {
                    Ok(()) => background = true,
                    Err(err) => warn!(error = %err, "portrait background draw failed"),
                }
            }
        }

        if let Err(err) = self
            .canvas
            .draw_image(&image, fit.src_rect, fit.dest_rect, 1.0)
        {
            warn!(index, error = %err, "frame draw failed");
            return DrawOutcome::SkippedFailed;
        }
        DrawOutcome::Drawn { mode, background }
    }

    // Built once per logical size from frame 0 only.
    fn ensure_background(&mut self, frames: &FrameStore) {
        let logical = (self.viewport.css_width, self.viewport.css_height);
        if self.background.is_some() {
            return;
        }
        let Some(first) = frames.image(0) else {
            return;
        };
        match build_background(first, logical, &self.style) {
            Some(image) => {
                debug!(
                    width = image.width(),
                    height = image.height(),
                    "portrait background rebuilt"
                );
                self.background = Some(PortraitBackground {
                    logical_size: logical,
                    image,
                });
            }
            None => debug!("portrait background unavailable"),
        }
    }
}

fn build_background(
    frame: &RgbaImage,
    (w, h): (f32, f32),
    style: &SurfaceStyle,
) -> Option<RgbaImage> {
    let long = style.background_sample_px.max(1) as f32;
    let (sw, sh) = if w >= h {
        (long, (long * h / w).round().max(1.0))
    } else {
        ((long * w / h).round().max(1.0), long)
    };
    let fit = compute_fit(
        frame.width(),
        frame.height(),
        sw,
        sh,
        style.crop,
        FitMode::Cover,
        FocalPoint::CENTER,
    )?;
    let mut small = Canvas::new(sw as u32, sh as u32);
    small.fill_rect(Rect::from_size(sw, sh), style.fog);
    if let Err(err) = small.draw_image(frame, fit.src_rect, fit.dest_rect, 1.0) {
        warn!(error = %err, "portrait background sample failed");
        return None;
    }
    Some(apply_blur(small.pixels(), style.background_sigma))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FrameLoaded;
    use crate::frames::FrameSource;
    use std::path::PathBuf;

    const FOG: Rgba<u8> = Rgba([0xE8, 0xE8, 0xE8, 255]);

    fn style() -> SurfaceStyle {
        SurfaceStyle {
            fog: FOG,
            crop: CropSpec::NONE,
            focus: FocalPoint::CENTER,
            background_opacity: 0.92,
            background_sample_px: 16,
            background_sigma: 1.0,
        }
    }

    fn store_with(images: Vec<Option<RgbaImage>>) -> FrameStore {
        let mut store = FrameStore::new(
            (0..images.len())
                .map(|index| FrameSource {
                    index,
                    path: PathBuf::from(format!("{index}.png")),
                })
                .collect(),
        );
        for (index, image) in images.into_iter().enumerate() {
            let event = match image {
                Some(image) => FrameLoaded::decoded(index, image),
                None => FrameLoaded::failed(index),
            };
            store.record(event);
        }
        store
    }

    #[test]
    fn zero_area_surface_skips() {
        let store = store_with(vec![Some(RgbaImage::new(4, 4))]);
        let mut surface = RenderSurface::new(style());
        assert_eq!(surface.draw_frame(0, &store), DrawOutcome::SkippedZeroArea);
    }

    #[test]
    fn undecoded_frame_leaves_buffer_untouched() {
        let red = RgbaImage::from_pixel(16, 9, Rgba([255, 0, 0, 255]));
        let store = store_with(vec![Some(red), None]);
        let mut surface = RenderSurface::new(style());
        surface.resize(Viewport::new(32.0, 18.0, 1.0));
        assert!(surface.draw_frame(0, &store).is_drawn());
        let before = surface.pixels().clone();
        let generation = surface.generation();
        assert_eq!(surface.draw_frame(1, &store), DrawOutcome::SkippedNotDecoded);
        assert_eq!(surface.pixels(), &before);
        assert_eq!(surface.generation(), generation);
    }

    #[test]
    fn reallocated_buffer_starts_as_fog() {
        let store = store_with(vec![None]);
        let mut surface = RenderSurface::new(style());
        surface.resize(Viewport::new(20.0, 10.0, 2.0));
        assert_eq!(surface.draw_frame(0, &store), DrawOutcome::SkippedNotDecoded);
        assert!(surface.pixels().pixels().all(|p| *p == FOG));
    }

    #[test]
    fn backing_buffer_uses_device_pixels() {
        let mut surface = RenderSurface::new(style());
        surface.resize(Viewport::new(100.0, 50.0, 2.0));
        assert_eq!(surface.pixels().dimensions(), (200, 100));
        surface.resize(Viewport::new(100.0, 50.0, 2.0));
        assert_eq!(surface.pixels().dimensions(), (200, 100));
    }

    #[test]
    fn portrait_draw_adds_background_pass() {
        let red = RgbaImage::from_pixel(16, 9, Rgba([255, 0, 0, 255]));
        let store = store_with(vec![Some(red)]);
        let mut surface = RenderSurface::new(style());
        surface.resize(Viewport::new(20.0, 40.0, 1.0));
        assert_eq!(
            surface.draw_frame(0, &store),
            DrawOutcome::Drawn {
                mode: FitMode::Contain,
                background: true
            }
        );
        // letterbox band shows the tinted background, not bare fog
        let corner = *surface.pixels().get_pixel(10, 1);
        assert_ne!(corner, FOG);
        assert!(corner[0] > corner[1]);
    }

    #[test]
    fn portrait_without_first_frame_falls_back_to_fog() {
        let red = RgbaImage::from_pixel(16, 9, Rgba([255, 0, 0, 255]));
        let store = store_with(vec![None, Some(red)]);
        let mut surface = RenderSurface::new(style());
        surface.resize(Viewport::new(20.0, 40.0, 1.0));
        assert_eq!(
            surface.draw_frame(1, &store),
            DrawOutcome::Drawn {
                mode: FitMode::Contain,
                background: false
            }
        );
        assert_eq!(*surface.pixels().get_pixel(10, 1), FOG);
    }
}
