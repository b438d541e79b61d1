//! Builds the presented image from the render surface: exit blur, exit
//! fade, then the loading screen (spinner ring and progress bar) on top.
//! The surface itself is not touched.

use image::{Rgba, RgbaImage};
use tracing::{trace, warn};

use crate::overlay::exit::ExitState;
use crate::overlay::loading::{LoadingLayout, LoadingView, RING_STROKE_PX};
use crate::processing::blur::downsample_blur;
use crate::processing::color::with_opacity;
use crate::processing::layout::Rect;
use crate::processing::resample::Resampler;
use crate::render::canvas::Canvas;
use crate::render::surface::RenderSurface;

/// Share of the ring covered by the darker spinning arc.
const SPINNER_ARC: f32 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComposeParams {
    pub exit: ExitState,
    pub loading: LoadingView,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ComposeKey {
    generation: u64,
    dimensions: (u32, u32),
    params: ComposeParams,
}

pub struct Composed<'a> {
    pub image: &'a RgbaImage,
    /// False when the previous output was reused.
    pub fresh: bool,
}

pub struct Compositor {
    fog: Rgba<u8>,
    page_background: Rgba<u8>,
    resampler: Resampler,
    cache: Option<(ComposeKey, RgbaImage)>,
}

impl Compositor {
    pub fn new(fog: Rgba<u8>, page_background: Rgba<u8>) -> Self {
        Self {
            fog,
            page_background,
            resampler: Resampler::default(),
            cache: None,
        }
    }

    pub fn compose(&mut self, surface: &RenderSurface, params: ComposeParams) -> Composed<'_> {
        let key = ComposeKey {
            generation: surface.generation(),
            dimensions: surface.pixels().dimensions(),
            params,
        };
        let fresh = !self.cache.as_ref().is_some_and(|(cached, _)| *cached == key);
        if fresh {
            let image = self.build(surface, params);
            self.cache = Some((key, image));
        } else {
            trace!("reusing composed frame");
        }
        let (_, image) = self
            .cache
            .get_or_insert_with(|| (key, surface.pixels().clone()));
        Composed { image, fresh }
    }

    fn build(&mut self, surface: &RenderSurface, params: ComposeParams) -> RgbaImage {
        let viewport = surface.viewport();
        let dpr = viewport.device_pixel_ratio;
        let mut pixels = surface.pixels().clone();

        if params.exit.blur_px > 0.0 {
            match downsample_blur(&pixels, params.exit.blur_px * dpr, &mut self.resampler) {
                Ok(blurred) => pixels = blurred,
                Err(err) => warn!(error = %err, "exit blur failed; presenting sharp frame"),
            }
        }

        let mut canvas = Canvas::from_image(pixels);
        canvas.scale(dpr);
        let full = viewport.logical_rect();

        if params.exit.fade > 0.0 {
            canvas.fill_rect(full, with_opacity(self.page_background, params.exit.fade));
        }

        let loading = params.loading;
        if loading.opacity > 0.0 {
            canvas.fill_rect(full, with_opacity(self.fog, loading.opacity));
            let layout = LoadingLayout::centered(viewport.css_width, viewport.css_height);
            let ink = Rgba([0, 0, 0, 255]);

            let arc_start = loading.spin - SPINNER_ARC / 2.0;
            canvas.stroke_arc(
                layout.ring_center,
                layout.ring_radius,
                RING_STROKE_PX,
                arc_start + SPINNER_ARC,
                1.0 - SPINNER_ARC,
                with_opacity(ink, 0.10 * loading.opacity),
            );
            canvas.stroke_arc(
                layout.ring_center,
                layout.ring_radius,
                RING_STROKE_PX,
                arc_start,
                SPINNER_ARC,
                with_opacity(ink, 0.40 * loading.opacity),
            );

            let track = layout.track;
            canvas.fill_rect(track, with_opacity(ink, 0.10 * loading.opacity));
            let filled = Rect {
                width: track.width * f32::from(loading.percent.min(100)) / 100.0,
                ..track
            };
            canvas.fill_rect(filled, with_opacity(ink, 0.25 * loading.opacity));
        }

        canvas.into_pixels()
    }
}
