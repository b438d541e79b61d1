//! Damped spring used to smooth scroll progress.

use std::time::Duration;

use crate::config::SpringConfig;

/// Integration step; large frame deltas are split into steps of at most this.
const MAX_STEP_SECS: f64 = 1.0 / 240.0;
/// Frame deltas above this are treated as a stall and clamped.
const MAX_FRAME_DELTA: Duration = Duration::from_millis(40);

#[derive(Debug, Clone)]
pub struct Spring {
    value: f64,
    velocity: f64,
    target: f64,
    params: SpringConfig,
    at_rest: bool,
}

impl Spring {
    pub fn new(initial: f64, params: SpringConfig) -> Self {
        Self {
            value: initial,
            velocity: 0.0,
            target: initial,
            params,
            at_rest: true,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Retargets the spring, keeping its current value and velocity.
    pub fn set_target(&mut self, target: f64) {
        if target == self.target {
            return;
        }
        self.target = target;
        self.at_rest = false;
    }

    /// Jumps to `value` with no velocity.
    pub fn jump(&mut self, value: f64) {
        self.value = value;
        self.target = value;
        self.velocity = 0.0;
        self.at_rest = true;
    }

    /// Advances by `dt` using semi-implicit Euler. Returns whether the value moved.
    pub fn advance(&mut self, dt: Duration) -> bool {
        if self.at_rest {
            return false;
        }
        let before = self.value;
        let mut remaining = dt.min(MAX_FRAME_DELTA).as_secs_f64();
        let SpringConfig {
            stiffness,
            damping,
            mass,
            ..
        } = self.params;
        while remaining > 0.0 {
            let step = remaining.min(MAX_STEP_SECS);
            let force = stiffness * (self.target - self.value) - damping * self.velocity;
            self.velocity += force / mass * step;
            self.value += self.velocity * step;
            remaining -= step;
        }
        if (self.target - self.value).abs() < self.params.rest_delta
            && self.velocity.abs() < self.params.rest_speed
        {
            self.value = self.target;
            self.velocity = 0.0;
            self.at_rest = true;
        }
        self.value != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(spring: &mut Spring, frames: usize) -> Vec<f64> {
        (0..frames)
            .map(|_| {
                spring.advance(Duration::from_millis(16));
                spring.value()
            })
            .collect()
    }

    #[test]
    fn converges_and_snaps_to_target() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(0.5);
        run(&mut spring, 600);
        assert!(spring.is_at_rest());
        assert_eq!(spring.value(), 0.5);
    }

    #[test]
    fn default_tuning_does_not_overshoot() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(1.0);
        let values = run(&mut spring, 300);
        assert!(values.iter().all(|v| *v <= 1.0));
        assert!(values.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn lags_behind_target() {
        let mut spring = Spring::new(0.0, SpringConfig::default());
        spring.set_target(1.0);
        spring.advance(Duration::from_millis(16));
        assert!(spring.value() > 0.0 && spring.value() < 0.1);
    }

    #[test]
    fn stalls_are_clamped() {
        let mut a = Spring::new(0.0, SpringConfig::default());
        let mut b = a.clone();
        a.set_target(1.0);
        b.set_target(1.0);
        a.advance(Duration::from_secs(5));
        b.advance(MAX_FRAME_DELTA);
        assert_eq!(a.value(), b.value());
    }

    #[test]
    fn resting_spring_reports_no_motion() {
        let mut spring = Spring::new(0.3, SpringConfig::default());
        assert!(!spring.advance(Duration::from_millis(16)));
        spring.jump(0.7);
        assert!(!spring.advance(Duration::from_millis(16)));
        assert_eq!(spring.value(), 0.7);
    }
}
