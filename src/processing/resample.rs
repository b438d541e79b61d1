use anyhow::{Context, Result};
use fast_image_resize as fir;
use image::RgbaImage;

use crate::processing::layout::Rect;

/// Reusable RGBA8 resampler around `fast_image_resize`.
pub struct Resampler {
    resizer: fir::Resizer,
    filter: fir::FilterType,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(fir::FilterType::Bilinear)
    }
}

impl Resampler {
    pub fn new(filter: fir::FilterType) -> Self {
        Self {
            resizer: fir::Resizer::new(),
            filter,
        }
    }

    /// Resamples the `crop` region of `source` (in source pixels) to `width × height`.
    pub fn resample(
        &mut self,
        source: &RgbaImage,
        crop: Rect,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage> {
        anyhow::ensure!(
            width > 0 && height > 0,
            "resample dimensions must be positive"
        );
        let crop = clamp_crop(crop, source.width(), source.height());
        anyhow::ensure!(!crop.is_empty(), "resample crop lies outside the source");

        let src_view = fir::images::ImageRef::new(
            source.width(),
            source.height(),
            source.as_raw(),
            fir::PixelType::U8x4,
        )
        .context("failed to create source view for resample")?;
        let mut dst_image = fir::images::Image::new(width, height, fir::PixelType::U8x4);
        let options = fir::ResizeOptions::new()
            .resize_alg(fir::ResizeAlg::Convolution(self.filter))
            .crop(
                f64::from(crop.x),
                f64::from(crop.y),
                f64::from(crop.width),
                f64::from(crop.height),
            );
        self.resizer
            .resize(&src_view, &mut dst_image, Some(&options))
            .context("resample failed")?;
        RgbaImage::from_raw(width, height, dst_image.into_vec())
            .ok_or_else(|| anyhow::anyhow!("failed to construct resampled RGBA image"))
    }

    /// Resamples the whole image.
    pub fn resize(&mut self, source: &RgbaImage, width: u32, height: u32) -> Result<RgbaImage> {
        if source.width() == width && source.height() == height {
            return Ok(source.clone());
        }
        let full = Rect::from_size(source.width() as f32, source.height() as f32);
        self.resample(source, full, width, height)
    }
}

fn clamp_crop(crop: Rect, w: u32, h: u32) -> Rect {
    let (w, h) = (w as f32, h as f32);
    let x0 = crop.x.clamp(0.0, w);
    let y0 = crop.y.clamp(0.0, h);
    let x1 = crop.right().clamp(0.0, w);
    let y1 = crop.bottom().clamp(0.0, h);
    Rect::new(x0, y0, x1 - x0, y1 - y0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn crops_before_scaling() {
        let mut img = RgbaImage::from_pixel(4, 8, Rgba([0, 0, 0, 255]));
        for x in 0..4 {
            for y in 4..8 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let mut resampler = Resampler::default();
        let out = resampler
            .resample(&img, Rect::new(0.0, 4.0, 4.0, 4.0), 4, 4)
            .unwrap();
        assert!(out.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn rejects_crop_outside_source() {
        let img = RgbaImage::new(4, 4);
        let mut resampler = Resampler::default();
        assert!(
            resampler
                .resample(&img, Rect::new(10.0, 10.0, 2.0, 2.0), 2, 2)
                .is_err()
        );
    }
}
