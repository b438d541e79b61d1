use crate::config::ExitConfig;
use crate::motion::keyframes::interpolate;

/// Dissolve applied over the tail of the scroll region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ExitState {
    /// Blur radius in CSS pixels.
    pub blur_px: f32,
    /// Opacity of the page-background wash, 0..=1.
    pub fade: f32,
}

impl ExitState {
    pub fn is_idle(&self) -> bool {
        self.blur_px <= 0.0 && self.fade <= 0.0
    }
}

pub fn exit_state(cfg: &ExitConfig, smoothed: f32) -> ExitState {
    ExitState {
        blur_px: interpolate(
            smoothed,
            &[cfg.blur_from, cfg.blur_to],
            &[0.0, cfg.blur_max_px],
        ),
        fade: interpolate(smoothed, &[cfg.fade_from, cfg.fade_to], &[0.0, 1.0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_before_the_tail() {
        let cfg = ExitConfig::default();
        assert!(exit_state(&cfg, 0.5).is_idle());
        assert!(exit_state(&cfg, 0.8).is_idle());
    }

    #[test]
    fn blur_ramps_before_fade() {
        let cfg = ExitConfig::default();
        let s = exit_state(&cfg, 0.88);
        assert!((s.blur_px - 7.0).abs() < 1e-3);
        assert_eq!(s.fade, 0.0);
        let end = exit_state(&cfg, 1.0);
        assert_eq!(end.blur_px, 14.0);
        assert_eq!(end.fade, 1.0);
    }

    #[test]
    fn fade_is_linear() {
        let s = exit_state(&ExitConfig::default(), 0.95);
        assert!((s.fade - 0.5).abs() < 1e-3);
    }
}
