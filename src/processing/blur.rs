use anyhow::Result;
use image::{RgbaImage, imageops};

use crate::processing::resample::Resampler;

/// Largest sigma the Gaussian pass runs at; wider blurs are taken on a
/// proportionally downsampled copy.
const MAX_DIRECT_SIGMA: f32 = 3.0;

pub fn apply_blur(image: &RgbaImage, sigma: f32) -> RgbaImage {
    if sigma <= 0.0 {
        return image.clone();
    }
    imageops::blur(image, sigma)
}

/// Gaussian blur whose cost stays bounded for large radii: the image is
/// shrunk, blurred at the reduced sigma, then stretched back.
pub fn downsample_blur(
    image: &RgbaImage,
    sigma: f32,
    resampler: &mut Resampler,
) -> Result<RgbaImage> {
    let (w, h) = image.dimensions();
    if sigma <= 0.0 || w == 0 || h == 0 {
        return Ok(image.clone());
    }
    let factor = (sigma / MAX_DIRECT_SIGMA).max(1.0);
    if factor <= 1.0 {
        return Ok(apply_blur(image, sigma));
    }
    let small_w = ((w as f32) / factor).round().max(1.0) as u32;
    let small_h = ((h as f32) / factor).round().max(1.0) as u32;
    let small = resampler.resize(image, small_w, small_h)?;
    let blurred = apply_blur(&small, sigma / factor);
    resampler.resize(&blurred, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn zero_sigma_is_identity() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([9, 8, 7, 255]));
        let mut resampler = Resampler::default();
        assert_eq!(downsample_blur(&img, 0.0, &mut resampler).unwrap(), img);
    }

    #[test]
    fn wide_blur_keeps_dimensions_and_spreads_edges() {
        let mut img = RgbaImage::from_pixel(64, 32, Rgba([0, 0, 0, 255]));
        for y in 0..32 {
            for x in 32..64 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let mut resampler = Resampler::default();
        let out = downsample_blur(&img, 12.0, &mut resampler).unwrap();
        assert_eq!(out.dimensions(), (64, 32));
        let left_of_edge = out.get_pixel(30, 16)[0];
        let right_of_edge = out.get_pixel(33, 16)[0];
        assert!(left_of_edge > 0);
        assert!(right_of_edge < 255);
    }
}
