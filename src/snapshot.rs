//! Headless rendering of a single scroll position to an image file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use image::RgbaImage;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Configuration;
use crate::flipbook::Flipbook;
use crate::render::compose::Compositor;
use crate::render::surface::Viewport;
use crate::tasks::loader;

/// Logical output size parsed from `WIDTHxHEIGHT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for SnapshotSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .with_context(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
        let width: u32 = w.trim().parse().context("invalid width")?;
        let height: u32 = h.trim().parse().context("invalid height")?;
        if width == 0 || height == 0 {
            bail!("snapshot size must be non-zero, got {width}x{height}");
        }
        Ok(Self { width, height })
    }
}

#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    /// Scroll fraction in `[0, 1]`.
    pub progress: f32,
    pub size: SnapshotSize,
    pub scale_factor: f32,
}

/// Loads every frame, renders `request.progress` with the spring settled and
/// returns the composed image at physical resolution.
pub async fn capture(cfg: &Configuration, request: &SnapshotRequest) -> Result<RgbaImage> {
    if !(0.0..=1.0).contains(&request.progress) {
        bail!("snapshot progress must be within [0, 1], got {}", request.progress);
    }

    let mut flipbook = Flipbook::new(cfg, Instant::now()).context("failed to build flipbook")?;
    flipbook.resize(Viewport::new(
        request.size.width as f32,
        request.size.height as f32,
        request.scale_factor,
    ));

    let sources = cfg.frame_sources();
    let (tx, mut rx) = mpsc::channel(cfg.loader_max_concurrent_decodes.max(1));
    let cancel = CancellationToken::new();
    let loader = tokio::spawn(loader::run(
        sources,
        tx,
        cancel.clone(),
        cfg.loader_max_concurrent_decodes,
    ));

    while let Some(loaded) = rx.recv().await {
        flipbook.handle_frame_loaded(loaded, Instant::now());
    }
    loader
        .await
        .context("frame loader panicked")?
        .context("frame loader failed")?;

    let frames = flipbook.frames();
    if !frames.is_complete() {
        bail!(
            "only {} of {} frames were reported",
            frames.settled(),
            frames.len()
        );
    }

    let now = Instant::now();
    flipbook.scroll_to(request.progress, now);
    flipbook.settle();
    flipbook.finish_loading();
    let drawn = flipbook.render_pending();
    info!(
        progress = request.progress,
        frame = ?drawn.or(flipbook.displayed_frame()),
        outcome = ?flipbook.last_outcome(),
        "snapshot frame rendered"
    );

    let overlay = flipbook.overlay(now);
    let mut compositor = Compositor::new(cfg.fog_color.to_rgba(), cfg.page_background.to_rgba());
    let composed = compositor.compose(flipbook.surface(), overlay.compose_params());
    Ok(composed.image.clone())
}

pub fn write_png(image: &RgbaImage, path: &Path) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("failed to write snapshot to {}", path.display()))?;
    Ok(path.to_path_buf())
}
