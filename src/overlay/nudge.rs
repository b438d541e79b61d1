use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::NudgeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NudgeDirection {
    Down,
    Up,
}

impl NudgeDirection {
    pub fn chevron(self) -> char {
        match self {
            NudgeDirection::Down => '↓',
            NudgeDirection::Up => '↑',
        }
    }

    fn flipped(self) -> Self {
        match self {
            NudgeDirection::Down => NudgeDirection::Up,
            NudgeDirection::Up => NudgeDirection::Down,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NudgeView {
    pub visible: bool,
    pub direction: NudgeDirection,
}

/// "Scroll" hint that hides while the user scrolls and comes back after a
/// period of inactivity. Goes inert for good once progress reaches 1.
#[derive(Debug, Clone)]
pub struct ScrollNudge {
    idle_delay: Duration,
    toggle_interval: Duration,
    visible: bool,
    direction: NudgeDirection,
    progress: f32,
    inert: bool,
    reappear_at: Option<Instant>,
    next_toggle: Option<Instant>,
}

impl ScrollNudge {
    pub fn new(cfg: &NudgeConfig, now: Instant) -> Self {
        Self {
            idle_delay: cfg.idle_delay,
            toggle_interval: cfg.toggle_interval,
            visible: true,
            direction: NudgeDirection::Down,
            progress: 0.0,
            inert: false,
            reappear_at: None,
            next_toggle: Some(now + cfg.toggle_interval),
        }
    }

    pub fn view(&self) -> NudgeView {
        NudgeView {
            visible: self.visible && !self.inert,
            direction: self.direction,
        }
    }

    pub fn is_inert(&self) -> bool {
        self.inert
    }

    /// Reacts to a scroll-progress change.
    pub fn on_progress(&mut self, progress: f32, now: Instant) {
        if self.inert {
            return;
        }
        self.progress = progress;
        self.visible = false;
        self.next_toggle = None;
        if progress >= 1.0 {
            trace!("scroll nudge retired");
            self.inert = true;
            self.reappear_at = None;
        } else {
            self.reappear_at = Some(now + self.idle_delay);
        }
    }

    /// Fires due timers. Returns whether the view changed.
    pub fn on_tick(&mut self, now: Instant) -> bool {
        if self.inert {
            return false;
        }
        let before = self.view();
        if self.reappear_at.is_some_and(|at| now >= at) {
            self.reappear_at = None;
            self.visible = true;
            self.direction = NudgeDirection::Down;
            self.next_toggle = Some(now + self.toggle_interval);
        }
        if let Some(at) = self.next_toggle.filter(|at| now >= *at) {
            if self.visible && self.progress > 0.0 {
                self.direction = self.direction.flipped();
            }
            // stay on the interval grid but skip ticks missed while stalled
            let mut next = at + self.toggle_interval;
            while next <= now {
                next += self.toggle_interval;
            }
            self.next_toggle = Some(next);
        }
        self.view() != before
    }

    /// Earliest instant at which `on_tick` has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.inert {
            return None;
        }
        let toggle = self.next_toggle.filter(|_| self.visible);
        match (self.reappear_at, toggle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}
