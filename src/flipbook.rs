//! The single state object behind the hero animation.
//!
//! Every input (load completions, scroll, resize, animation ticks) is an
//! explicit method call that updates this state synchronously. Drawing into
//! the render surface is the only side effect, and it happens at most once
//! per tick through [`Flipbook::render_pending`].

use std::time::{Duration, Instant};

use anyhow::Result;
use tracing::{debug, info};

use crate::config::{Configuration, ExitConfig};
use crate::events::FrameLoaded;
use crate::frames::{FrameStore, LoadReport};
use crate::motion::scroll::ScrollProgress;
use crate::overlay::beats::{BeatState, TextBeat, beat_states};
use crate::overlay::caption::{Caption, beat_captions, loading_captions, nudge_caption};
use crate::overlay::exit::{ExitState, exit_state};
use crate::overlay::loading::{LoadingIndicator, LoadingView};
use crate::overlay::nudge::{NudgeView, ScrollNudge};
use crate::render::compose::ComposeParams;
use crate::render::surface::{DrawOutcome, RenderSurface, SurfaceStyle, Viewport};
use crate::scheduler::FrameScheduler;

/// What the host loop should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Something visible changed; present a new frame.
    pub redraw: bool,
    /// Keep ticking every animation frame.
    pub animating: bool,
    /// Wake up no later than this for timers.
    pub next_deadline: Option<Instant>,
    /// The loading screen was dismissed during this tick.
    pub ready: bool,
}

/// Stateless presentation snapshot for one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayFrame {
    pub beats: Vec<BeatState>,
    pub exit: ExitState,
    pub loading: LoadingView,
    pub nudge: NudgeView,
    /// Multiplier for caption opacity under the exit fade and loading screen.
    pub caption_alpha: f32,
}

impl OverlayFrame {
    pub fn compose_params(&self) -> ComposeParams {
        ComposeParams {
            exit: self.exit,
            loading: self.loading,
        }
    }
}

pub struct Flipbook {
    frames: FrameStore,
    progress: ScrollProgress,
    scheduler: FrameScheduler,
    surface: RenderSurface,
    loading: LoadingIndicator,
    nudge: ScrollNudge,
    beats: Vec<TextBeat>,
    exit: ExitConfig,
    displayed: Option<usize>,
    last_outcome: Option<DrawOutcome>,
}

impl Flipbook {
    pub fn new(cfg: &Configuration, now: Instant) -> Result<Self> {
        let sources = cfg.frame_sources();
        let frame_count = sources.len();
        let style = SurfaceStyle {
            fog: cfg.fog_color.to_rgba(),
            crop: cfg.crop_spec()?,
            focus: cfg.focal(),
            background_opacity: cfg.portrait_background.opacity,
            background_sample_px: cfg.portrait_background.sample_px,
            background_sigma: cfg.portrait_background.sigma,
        };
        Ok(Self {
            frames: FrameStore::new(sources),
            progress: ScrollProgress::new(&cfg.scroll, cfg.spring),
            scheduler: FrameScheduler::new(frame_count, cfg.frame_blend),
            surface: RenderSurface::new(style),
            loading: LoadingIndicator::new(&cfg.loading, now),
            nudge: ScrollNudge::new(&cfg.nudge, now),
            beats: cfg.beats.clone(),
            exit: cfg.exit,
            displayed: None,
            last_outcome: None,
        })
    }

    pub fn frames(&self) -> &FrameStore {
        &self.frames
    }

    pub fn surface(&self) -> &RenderSurface {
        &self.surface
    }

    pub fn progress(&self) -> &ScrollProgress {
        &self.progress
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn beats(&self) -> &[TextBeat] {
        &self.beats
    }

    /// Index of the frame currently visible on the surface.
    pub fn displayed_frame(&self) -> Option<usize> {
        self.displayed
    }

    pub fn last_outcome(&self) -> Option<DrawOutcome> {
        self.last_outcome
    }

    pub fn is_ready(&self) -> bool {
        self.loading.is_ready()
    }

    pub fn handle_frame_loaded(&mut self, event: FrameLoaded, now: Instant) -> Option<LoadReport> {
        let decoded = event.is_decoded();
        let report = self.frames.record(event)?;
        debug!(
            index = report.index,
            decoded,
            settled = report.settled,
            total = report.total,
            percent = report.percent,
            "frame settled"
        );
        self.loading.set_percent(report.percent);

        if report.first {
            // first paint; a no-op until that frame has decoded
            self.scheduler
                .update(self.progress.raw(), self.progress.smoothed());
            self.render_pending();
        } else if self.scheduler.last_frame() == Some(report.index)
            && self.displayed != Some(report.index)
        {
            self.scheduler.redraw_last();
        }

        if report.complete {
            info!(total = report.total, "all frames settled");
            self.loading.complete(now);
        }
        Some(report)
    }

    pub fn scroll_by(&mut self, css_px: f32, now: Instant) -> bool {
        let changed = self.progress.scroll_by(css_px);
        if changed {
            self.nudge.on_progress(self.progress.raw(), now);
        }
        changed
    }

    pub fn scroll_to(&mut self, fraction: f32, now: Instant) -> bool {
        let changed = self.progress.scroll_to(fraction);
        if changed {
            self.nudge.on_progress(self.progress.raw(), now);
        }
        changed
    }

    /// Resizes the surface and immediately redraws the last computed frame.
    pub fn resize(&mut self, viewport: Viewport) {
        self.surface.resize(viewport);
        self.progress.set_viewport_height(viewport.css_height);
        if self.scheduler.redraw_last().is_some() {
            self.render_pending();
        }
    }

    pub fn tick(&mut self, now: Instant, dt: Duration) -> TickOutcome {
        let moved = self.progress.advance(dt);
        if moved {
            self.scheduler
                .update(self.progress.raw(), self.progress.smoothed());
        }
        let nudge_changed = self.nudge.on_tick(now);
        let ready = self.loading.on_tick(now);
        if ready {
            // a draw attempted before the surface had area may have left it blank
            self.scheduler.redraw_last();
        }
        let loading_animating = self.loading.is_animating(now);

        let next_deadline = match (self.nudge.next_deadline(), self.loading.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        TickOutcome {
            redraw: moved
                || nudge_changed
                || ready
                || loading_animating
                || self.scheduler.has_pending(),
            animating: self.progress.is_animating() || loading_animating,
            next_deadline,
            ready,
        }
    }

    /// Executes the pending draw, if any. Returns the index drawn.
    pub fn render_pending(&mut self) -> Option<usize> {
        let index = self.scheduler.take_pending()?;
        let outcome = self.surface.draw_frame(index, &self.frames);
        self.last_outcome = Some(outcome);
        if outcome.is_drawn() {
            self.displayed = Some(index);
            Some(index)
        } else {
            debug!(index, ?outcome, "pending draw skipped");
            None
        }
    }

    pub fn overlay(&self, now: Instant) -> OverlayFrame {
        let smoothed = self.progress.smoothed();
        let exit = exit_state(&self.exit, smoothed);
        let loading = self.loading.view(now);
        OverlayFrame {
            beats: beat_states(&self.beats, smoothed),
            exit,
            loading,
            nudge: self.nudge.view(),
            caption_alpha: (1.0 - exit.fade) * (1.0 - loading.opacity),
        }
    }

    /// Text to draw over the composed frame, in logical pixels.
    pub fn captions(&self, overlay: &OverlayFrame) -> Vec<Caption> {
        let viewport = self.surface.viewport();
        let size = (viewport.css_width, viewport.css_height);
        let mut captions: Vec<Caption> = self
            .beats
            .iter()
            .zip(&overlay.beats)
            .flat_map(|(beat, state)| beat_captions(beat, *state, size, overlay.caption_alpha))
            .collect();
        captions.extend(nudge_caption(overlay.nudge, size, overlay.caption_alpha));
        captions.extend(loading_captions(overlay.loading, self.loading.label(), size));
        captions
    }

    /// Snaps the smoothed progress onto the raw value and schedules its frame.
    pub fn settle(&mut self) {
        self.progress.settle();
        self.scheduler
            .update(self.progress.raw(), self.progress.smoothed());
    }

    /// Dismisses the loading screen without waiting for the fade.
    pub fn finish_loading(&mut self) {
        if self.loading.finish() {
            self.scheduler.redraw_last();
        }
    }
}
