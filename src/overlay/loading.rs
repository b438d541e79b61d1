use std::time::{Duration, Instant};

use tracing::info;

use crate::config::LoadingConfig;
use crate::processing::layout::Rect;

pub const RING_DIAMETER_PX: f32 = 36.0;
pub const RING_STROKE_PX: f32 = 1.5;
pub const LABEL_FONT_PX: f32 = 10.0;
pub const PERCENT_FONT_PX: f32 = 9.0;
pub const PROGRESS_TRACK_WIDTH: f32 = 144.0;
pub const PROGRESS_TRACK_HEIGHT: f32 = 2.0;
const RING_GAP_PX: f32 = 20.0;
const TEXT_GAP_PX: f32 = 8.0;
const LINE_HEIGHT: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingPhase {
    Loading { percent: u8 },
    FadingOut { since: Instant },
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingView {
    pub opacity: f32,
    pub percent: u8,
    /// Spinner rotation in turns, `[0, 1)`. Zero once hidden.
    pub spin: f32,
}

/// Full-surface loading screen shown until every frame has settled.
#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    phase: LoadingPhase,
    fade_duration: Duration,
    ready_grace: Duration,
    spin_period: Duration,
    label: String,
    shown_at: Instant,
}

impl LoadingIndicator {
    pub fn new(cfg: &LoadingConfig, now: Instant) -> Self {
        Self {
            phase: LoadingPhase::Loading { percent: 0 },
            fade_duration: cfg.fade_duration,
            ready_grace: cfg.ready_grace,
            spin_period: cfg.spin_period,
            label: cfg.label.clone(),
            shown_at: now,
        }
    }

    pub fn phase(&self) -> LoadingPhase {
        self.phase
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.phase, LoadingPhase::Ready)
    }

    pub fn set_percent(&mut self, percent: u8) {
        if let LoadingPhase::Loading { .. } = self.phase {
            self.phase = LoadingPhase::Loading {
                percent: percent.min(100),
            };
        }
    }

    /// Every frame has settled; starts the fade-out.
    pub fn complete(&mut self, now: Instant) {
        if let LoadingPhase::Loading { .. } = self.phase {
            self.phase = LoadingPhase::FadingOut { since: now };
        }
    }

    /// Advances the fade. Returns `true` exactly once, on entering `Ready`.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        match self.phase {
            LoadingPhase::FadingOut { since } if now.duration_since(since) >= self.ready_grace => {
                info!("all frames settled; loading screen dismissed");
                self.phase = LoadingPhase::Ready;
                true
            }
            _ => false,
        }
    }

    /// Skips the fade and grace period.
    pub fn finish(&mut self) -> bool {
        if self.is_ready() {
            return false;
        }
        self.phase = LoadingPhase::Ready;
        true
    }

    pub fn view(&self, now: Instant) -> LoadingView {
        let spin = self.spin(now);
        match self.phase {
            LoadingPhase::Loading { percent } => LoadingView {
                opacity: 1.0,
                percent,
                spin,
            },
            LoadingPhase::FadingOut { since } => {
                let elapsed = now.saturating_duration_since(since).as_secs_f32();
                let total = self.fade_duration.as_secs_f32();
                let opacity = if total > 0.0 {
                    (1.0 - elapsed / total).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                LoadingView {
                    opacity,
                    percent: 100,
                    spin: if opacity > 0.0 { spin } else { 0.0 },
                }
            }
            LoadingPhase::Ready => LoadingView {
                opacity: 0.0,
                percent: 100,
                spin: 0.0,
            },
        }
    }

    fn spin(&self, now: Instant) -> f32 {
        let period = self.spin_period.as_secs_f32();
        if period <= 0.0 {
            return 0.0;
        }
        let elapsed = now.saturating_duration_since(self.shown_at).as_secs_f32();
        (elapsed / period).fract()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        match self.phase {
            LoadingPhase::FadingOut { since } => Some(since + self.ready_grace),
            _ => None,
        }
    }

    /// The spinner or the fade-out needs continuous redraws.
    pub fn is_animating(&self, now: Instant) -> bool {
        match self.phase {
            LoadingPhase::Loading { .. } => true,
            LoadingPhase::FadingOut { since } => {
                now.saturating_duration_since(since) < self.fade_duration
            }
            _ => false,
        }
    }
}

/// Positions of the loading screen parts in logical pixels: spinner ring,
/// label, progress track and percentage stacked in a centred column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadingLayout {
    pub ring_center: (f32, f32),
    /// Radius of the stroke centre line.
    pub ring_radius: f32,
    pub label_top: f32,
    pub track: Rect,
    pub percent_top: f32,
}

impl LoadingLayout {
    pub fn centered(width: f32, height: f32) -> Self {
        let label_line = LABEL_FONT_PX * LINE_HEIGHT;
        let percent_line = PERCENT_FONT_PX * LINE_HEIGHT;
        let column = RING_DIAMETER_PX
            + RING_GAP_PX
            + label_line
            + TEXT_GAP_PX
            + PROGRESS_TRACK_HEIGHT
            + TEXT_GAP_PX
            + percent_line;
        let top = (height - column) / 2.0;
        let label_top = top + RING_DIAMETER_PX + RING_GAP_PX;
        let track_top = (label_top + label_line + TEXT_GAP_PX).round();
        Self {
            ring_center: (width / 2.0, top + RING_DIAMETER_PX / 2.0),
            ring_radius: (RING_DIAMETER_PX - RING_STROKE_PX) / 2.0,
            label_top,
            track: Rect::new(
                ((width - PROGRESS_TRACK_WIDTH) / 2.0).round(),
                track_top,
                PROGRESS_TRACK_WIDTH,
                PROGRESS_TRACK_HEIGHT,
            ),
            percent_top: track_top + PROGRESS_TRACK_HEIGHT + TEXT_GAP_PX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fades_then_becomes_ready_once() {
        let t0 = Instant::now();
        let mut loading = LoadingIndicator::new(&LoadingConfig::default(), t0);
        loading.set_percent(50);
        assert_eq!(loading.view(t0).opacity, 1.0);
        assert_eq!(loading.view(t0).percent, 50);

        loading.complete(t0);
        let half = loading.view(t0 + Duration::from_millis(300));
        assert!((half.opacity - 0.5).abs() < 1e-3);
        assert_eq!(loading.view(t0 + Duration::from_millis(650)).opacity, 0.0);

        assert!(!loading.on_tick(t0 + Duration::from_millis(699)));
        assert!(loading.on_tick(t0 + Duration::from_millis(700)));
        assert!(!loading.on_tick(t0 + Duration::from_millis(800)));
        assert!(loading.is_ready());
    }

    #[test]
    fn percent_frozen_after_completion() {
        let t0 = Instant::now();
        let mut loading = LoadingIndicator::new(&LoadingConfig::default(), t0);
        loading.complete(t0);
        loading.set_percent(10);
        assert_eq!(loading.view(t0).percent, 100);
    }

    #[test]
    fn finish_skips_grace() {
        let t0 = Instant::now();
        let mut loading = LoadingIndicator::new(&LoadingConfig::default(), t0);
        assert!(loading.finish());
        assert!(!loading.finish());
        assert_eq!(loading.view(t0).opacity, 0.0);
    }

    #[test]
    fn spinner_turns_once_per_period() {
        let t0 = Instant::now();
        let mut loading = LoadingIndicator::new(&LoadingConfig::default(), t0);
        assert_eq!(loading.label(), "Loading Sahil's Portfolio…");
        assert_eq!(loading.view(t0).spin, 0.0);
        let quarter = loading.view(t0 + Duration::from_micros(187_500)).spin;
        assert!((quarter - 0.25).abs() < 1e-3);
        let wrapped = loading.view(t0 + Duration::from_millis(900)).spin;
        assert!((wrapped - 0.2).abs() < 1e-3);
        assert!(loading.is_animating(t0 + Duration::from_secs(30)));

        loading.complete(t0);
        assert!(loading.view(t0 + Duration::from_millis(300)).spin > 0.0);
        assert_eq!(loading.view(t0 + Duration::from_millis(650)).spin, 0.0);
        assert!(!loading.is_animating(t0 + Duration::from_millis(650)));
    }

    #[test]
    fn column_is_centred_ring_first() {
        let layout = LoadingLayout::centered(320.0, 180.0);
        assert_eq!(layout.ring_center.0, 160.0);
        assert_eq!(layout.track.x, 88.0);
        let ring_top = layout.ring_center.1 - RING_DIAMETER_PX / 2.0;
        let bottom = layout.percent_top + PERCENT_FONT_PX * LINE_HEIGHT;
        assert!((ring_top - (180.0 - bottom)).abs() <= 0.5);
        assert!(layout.ring_center.1 + RING_DIAMETER_PX / 2.0 < layout.label_top);
        assert!(layout.label_top + LABEL_FONT_PX * LINE_HEIGHT < layout.track.y);
        assert!(layout.track.bottom() < layout.percent_top);
    }
}
