//! Maps progress to a frame index and coalesces draw requests.

/// Frame index for the given progress pair.
///
/// `smoothed_weight` of the smoothed value is mixed with the remainder of the
/// raw value so the displayed frame never trails a fast flick by much.
pub fn frame_index_for(raw: f32, smoothed: f32, frame_count: usize, smoothed_weight: f32) -> usize {
    if frame_count == 0 {
        return 0;
    }
    let last = frame_count - 1;
    // lerp form keeps blended == raw exactly when the spring is settled
    let blended = raw + (smoothed - raw) * smoothed_weight;
    let index = (blended * last as f32).floor();
    if index.is_nan() || index <= 0.0 {
        0
    } else {
        (index as usize).min(last)
    }
}

/// Holds at most one pending draw. A newer request replaces an older one
/// that has not been executed yet.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    frame_count: usize,
    smoothed_weight: f32,
    last_frame: Option<usize>,
    pending: Option<usize>,
}

impl FrameScheduler {
    pub fn new(frame_count: usize, smoothed_weight: f32) -> Self {
        Self {
            frame_count,
            smoothed_weight,
            last_frame: None,
            pending: None,
        }
    }

    /// Last index a draw was requested for.
    pub fn last_frame(&self) -> Option<usize> {
        self.last_frame
    }

    pub fn pending(&self) -> Option<usize> {
        self.pending
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Recomputes the target index from progress and schedules it.
    pub fn update(&mut self, raw: f32, smoothed: f32) -> usize {
        let index = frame_index_for(raw, smoothed, self.frame_count, self.smoothed_weight);
        self.request(index);
        index
    }

    pub fn request(&mut self, index: usize) {
        self.last_frame = Some(index);
        self.pending = Some(index);
    }

    /// Re-schedules the last computed index, if any. Used after resizes and
    /// late loads, which must not fall back to frame 0.
    pub fn redraw_last(&mut self) -> Option<usize> {
        let index = self.last_frame?;
        self.pending = Some(index);
        Some(index)
    }

    /// Takes the pending draw; called once per animation tick.
    pub fn take_pending(&mut self) -> Option<usize> {
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_endpoints() {
        assert_eq!(frame_index_for(0.0, 0.0, 192, 0.7), 0);
        assert_eq!(frame_index_for(1.0, 1.0, 192, 0.7), 191);
        assert_eq!(frame_index_for(0.5, 0.5, 192, 0.7), 95);
    }

    #[test]
    fn index_stays_in_bounds() {
        for step in 0..=1000 {
            let p = step as f32 / 1000.0;
            let index = frame_index_for(p, 1.0 - p, 192, 0.7);
            assert!(index < 192);
        }
        assert_eq!(frame_index_for(1.5, 2.0, 10, 0.7), 9);
        assert_eq!(frame_index_for(-1.0, -1.0, 10, 0.7), 0);
        assert_eq!(frame_index_for(0.5, 0.5, 0, 0.7), 0);
    }

    #[test]
    fn raw_component_pulls_ahead_of_lagging_spring() {
        // spring still at 0, raw already at the end
        assert_eq!(frame_index_for(1.0, 0.0, 192, 0.7), 57);
    }

    #[test]
    fn newer_request_replaces_pending() {
        let mut scheduler = FrameScheduler::new(192, 0.7);
        scheduler.update(0.1, 0.1);
        scheduler.update(0.2, 0.2);
        scheduler.update(0.3, 0.3);
        assert_eq!(scheduler.take_pending(), Some(57));
        assert_eq!(scheduler.take_pending(), None);
    }

    #[test]
    fn redraw_uses_last_index() {
        let mut scheduler = FrameScheduler::new(192, 0.7);
        assert_eq!(scheduler.redraw_last(), None);
        scheduler.update(0.5, 0.5);
        scheduler.take_pending();
        assert_eq!(scheduler.redraw_last(), Some(95));
        assert_eq!(scheduler.take_pending(), Some(95));
    }
}
