use std::sync::Arc;

use image::RgbaImage;

/// One load completion from the loader. Exactly one is sent per frame;
/// `image` is `None` when the frame failed to decode.
#[derive(Debug, Clone)]
pub struct FrameLoaded {
    pub index: usize,
    pub image: Option<Arc<RgbaImage>>,
}

impl FrameLoaded {
    pub fn decoded(index: usize, image: RgbaImage) -> Self {
        Self {
            index,
            image: Some(Arc::new(image)),
        }
    }

    pub fn failed(index: usize) -> Self {
        Self { index, image: None }
    }

    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }
}
