use std::path::PathBuf;

use fontdb::{Database, Family, Query};
use glyphon::cosmic_text::{Align, Weight};
use glyphon::{
    Attrs, Buffer, Cache, Color, FamilyOwned, FontSystem, Metrics, Resolution, Shaping, SwashCache,
    TextArea, TextAtlas, TextBounds, TextRenderer, Viewport, Wrap,
};
use tracing::warn;
use winit::dpi::PhysicalSize;

use crate::overlay::beats::BeatAlign;
use crate::overlay::caption::{Caption, CaptionWeight};

const PREFERRED_FAMILY: &str = "DejaVu Sans";

struct ShapedCaption {
    buffer: Buffer,
    left: f32,
    top: f32,
    color: Color,
}

/// Rasterises overlay captions with `glyphon` on top of the presented frame.
pub struct CaptionRenderer {
    font_system: FontSystem,
    swash_cache: SwashCache,
    viewport: Viewport,
    atlas: TextAtlas,
    text_renderer: TextRenderer,
    font_family: FamilyOwned,
    size: PhysicalSize<u32>,
    scale_factor: f32,
    shaped: Vec<ShapedCaption>,
}

impl CaptionRenderer {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let mut font_system = FontSystem::new();
        initialize_font_database(font_system.db_mut());
        let font_family = resolve_font_family(&font_system);

        let cache = Cache::new(device);
        let viewport = Viewport::new(device, &cache);
        let mut atlas = TextAtlas::new(device, queue, &cache, format);
        let text_renderer =
            TextRenderer::new(&mut atlas, device, wgpu::MultisampleState::default(), None);

        Self {
            font_system,
            swash_cache: SwashCache::new(),
            viewport,
            atlas,
            text_renderer,
            font_family,
            size: PhysicalSize::new(0, 0),
            scale_factor: 1.0,
            shaped: Vec::new(),
        }
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        self.size = size;
        self.scale_factor = scale_factor as f32;
    }

    /// Shapes `captions` and uploads their glyphs. Returns false when there
    /// is nothing to draw.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        captions: &[Caption],
    ) -> bool {
        self.shaped.clear();
        if self.size.width == 0 || self.size.height == 0 || captions.is_empty() {
            return false;
        }
        self.viewport.update(
            queue,
            Resolution {
                width: self.size.width,
                height: self.size.height,
            },
        );

        for caption in captions {
            let shaped = self.shape(caption);
            self.shaped.push(shaped);
        }

        let bounds = TextBounds {
            left: 0,
            top: 0,
            right: self.size.width as i32,
            bottom: self.size.height as i32,
        };
        let areas = self.shaped.iter().map(|shaped| TextArea {
            buffer: &shaped.buffer,
            left: shaped.left,
            top: shaped.top,
            scale: 1.0,
            bounds,
            default_color: shaped.color,
            custom_glyphs: &[],
        });
        if let Err(err) = self.text_renderer.prepare(
            device,
            queue,
            &mut self.font_system,
            &mut self.atlas,
            &self.viewport,
            areas,
            &mut self.swash_cache,
        ) {
            warn!(error = %err, "caption prepare failed");
            return false;
        }
        true
    }

    pub fn render(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.shaped.is_empty() {
            return;
        }
        if let Err(err) = self
            .text_renderer
            .render(&self.atlas, &self.viewport, pass)
        {
            warn!(error = %err, "caption draw failed");
        }
    }

    pub fn trim(&mut self) {
        self.atlas.trim();
    }

    fn shape(&mut self, caption: &Caption) -> ShapedCaption {
        let scale = self.scale_factor;
        let metrics = Metrics::new(caption.font_px * scale, caption.line_height_px * scale);
        let mut buffer = Buffer::new(&mut self.font_system, metrics);
        buffer.set_wrap(&mut self.font_system, Wrap::WordOrGlyph);
        buffer.set_metrics_and_size(
            &mut self.font_system,
            metrics,
            Some(caption.max_width * scale),
            None,
        );
        let attrs = Attrs::new()
            .family(self.font_family.as_family())
            .weight(weight_for(caption.weight));
        buffer.set_text(
            &mut self.font_system,
            &caption.text,
            &attrs,
            Shaping::Advanced,
            None,
        );
        buffer.shape_until_scroll(&mut self.font_system, false);

        // shrink the box to the widest line so alignment happens inside it
        let width = buffer
            .layout_runs()
            .map(|run| run.line_w)
            .fold(0.0_f32, f32::max);
        buffer.set_size(&mut self.font_system, Some(width.max(1.0)), None);
        let align = match caption.align {
            BeatAlign::Left => Align::Left,
            BeatAlign::Center => Align::Center,
            BeatAlign::Right => Align::Right,
        };
        for line in &mut buffer.lines {
            line.set_align(Some(align));
        }
        buffer.shape_until_scroll(&mut self.font_system, false);

        let [r, g, b, a] = caption.color.0;
        ShapedCaption {
            buffer,
            left: caption.left_for_width(width / scale) * scale,
            top: caption.top * scale,
            color: Color::rgba(r, g, b, a),
        }
    }
}

fn weight_for(weight: CaptionWeight) -> Weight {
    match weight {
        CaptionWeight::Light => Weight::LIGHT,
        CaptionWeight::Medium => Weight::MEDIUM,
        CaptionWeight::Black => Weight::BLACK,
    }
}

fn initialize_font_database(db: &mut Database) {
    db.load_system_fonts();
    let bundled_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if bundled_path.exists() {
        db.load_fonts_dir(&bundled_path);
    }
}

fn resolve_font_family(font_system: &FontSystem) -> FamilyOwned {
    let query = Query {
        families: &[Family::Name(PREFERRED_FAMILY)],
        ..Default::default()
    };
    if font_system.db().query(&query).is_some() {
        FamilyOwned::Name(PREFERRED_FAMILY.into())
    } else {
        warn!(font = PREFERRED_FAMILY, "preferred caption font missing; using sans-serif");
        FamilyOwned::SansSerif
    }
}
