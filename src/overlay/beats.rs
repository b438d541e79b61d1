use anyhow::{Result, ensure};
use serde::Deserialize;

use crate::motion::keyframes::interpolate;

/// Vertical offset, in CSS pixels, a caption starts its fade-in from.
pub const BEAT_RISE_PX: f32 = 18.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BeatAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// A caption shown over a window of scroll progress.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TextBeat {
    pub from: f32,
    pub to: f32,
    pub text: String,
    #[serde(default)]
    pub sub: String,
    #[serde(default)]
    pub align: BeatAlign,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatState {
    pub opacity: f32,
    /// Downward offset in CSS pixels.
    pub offset_y: f32,
}

impl BeatState {
    pub const HIDDEN: Self = Self {
        opacity: 0.0,
        offset_y: BEAT_RISE_PX,
    };

    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0
    }
}

impl TextBeat {
    pub fn new(from: f32, to: f32, text: &str, sub: &str, align: BeatAlign) -> Self {
        Self {
            from,
            to,
            text: text.to_string(),
            sub: sub.to_string(),
            align,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.from.is_finite() && self.to.is_finite(),
            "beat bounds must be finite"
        );
        ensure!(
            0.0 <= self.from && self.from < self.to && self.to <= 1.0,
            "beat bounds must satisfy 0 <= from < to <= 1 (got {}..{})",
            self.from,
            self.to
        );
        ensure!(!self.text.trim().is_empty(), "beat text must not be empty");
        Ok(())
    }

    pub fn midpoint(&self) -> f32 {
        (self.from + self.to) / 2.0
    }

    /// End of the fade-in ramp: 40% of the way from `from` to the midpoint.
    pub fn fade_in_end(&self) -> f32 {
        self.from + (self.midpoint() - self.from) * 0.4
    }

    /// Start of the fade-out ramp: 60% of the way from the midpoint to `to`.
    pub fn fade_out_start(&self) -> f32 {
        let mid = self.midpoint();
        mid + (self.to - mid) * 0.6
    }

    pub fn state(&self, progress: f32) -> BeatState {
        let opacity = interpolate(
            progress,
            &[self.from, self.fade_in_end(), self.fade_out_start(), self.to],
            &[0.0, 1.0, 1.0, 0.0],
        );
        let offset_y = interpolate(
            progress,
            &[self.from, self.fade_in_end()],
            &[BEAT_RISE_PX, 0.0],
        );
        BeatState { opacity, offset_y }
    }
}

/// State of every beat at `progress`. Overlapping beats are reported as-is.
pub fn beat_states(beats: &[TextBeat], progress: f32) -> Vec<BeatState> {
    beats.iter().map(|beat| beat.state(progress)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat() -> TextBeat {
        TextBeat::new(0.22, 0.37, "Built for Precision.", "", BeatAlign::Left)
    }

    #[test]
    fn ramps_match_breakpoints() {
        let b = beat();
        assert!((b.fade_in_end() - 0.25).abs() < 1e-6);
        assert!((b.fade_out_start() - 0.34).abs() < 1e-6);
    }

    #[test]
    fn zero_outside_and_one_at_midpoint() {
        let b = beat();
        assert_eq!(b.state(0.1).opacity, 0.0);
        assert_eq!(b.state(0.22).opacity, 0.0);
        assert_eq!(b.state(0.37).opacity, 0.0);
        assert_eq!(b.state(0.9).opacity, 0.0);
        assert_eq!(b.state(b.midpoint()).opacity, 1.0);
    }

    #[test]
    fn rises_only_during_fade_in() {
        let b = beat();
        assert_eq!(b.state(0.0).offset_y, BEAT_RISE_PX);
        assert_eq!(b.state(b.fade_in_end()).offset_y, 0.0);
        assert_eq!(b.state(0.36).offset_y, 0.0);
        let halfway = b.state((b.from + b.fade_in_end()) / 2.0).offset_y;
        assert!((halfway - BEAT_RISE_PX / 2.0).abs() < 1e-3);
    }

    #[test]
    fn overlapping_beats_both_show() {
        let beats = [
            TextBeat::new(0.0, 0.5, "a", "", BeatAlign::Left),
            TextBeat::new(0.1, 0.4, "b", "", BeatAlign::Right),
        ];
        let states = beat_states(&beats, 0.25);
        assert!(states.iter().all(|s| s.opacity == 1.0));
    }

    #[test]
    fn rejects_inverted_bounds() {
        assert!(TextBeat::new(0.5, 0.4, "x", "", BeatAlign::Center).validate().is_err());
        assert!(TextBeat::new(0.5, 1.2, "x", "", BeatAlign::Center).validate().is_err());
        assert!(beat().validate().is_ok());
    }
}
