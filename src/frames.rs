//! Ordered frame sequence and its load bookkeeping.

use std::path::PathBuf;
use std::sync::Arc;

use image::RgbaImage;
use tracing::debug;

use crate::events::FrameLoaded;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSource {
    pub index: usize,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub enum FrameState {
    #[default]
    Pending,
    Loaded(Arc<RgbaImage>),
    Errored,
}

impl FrameState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, FrameState::Pending)
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    pub source: FrameSource,
    pub state: FrameState,
}

/// Milestones produced by a recorded load completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub index: usize,
    pub settled: usize,
    pub total: usize,
    pub percent: u8,
    /// This was the first completion of the sequence.
    pub first: bool,
    /// Every frame has now settled, successfully or not.
    pub complete: bool,
}

pub struct FrameStore {
    frames: Vec<Frame>,
    settled: usize,
}

impl FrameStore {
    pub fn new(sources: Vec<FrameSource>) -> Self {
        let frames = sources
            .into_iter()
            .map(|source| Frame {
                source,
                state: FrameState::Pending,
            })
            .collect();
        Self { frames, settled: 0 }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn settled(&self) -> usize {
        self.settled
    }

    pub fn percent(&self) -> u8 {
        percent_of(self.settled, self.frames.len())
    }

    pub fn is_complete(&self) -> bool {
        !self.frames.is_empty() && self.settled == self.frames.len()
    }

    pub fn frame(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Decoded image at `index`, if it loaded.
    pub fn image(&self, index: usize) -> Option<&Arc<RgbaImage>> {
        match self.frames.get(index).map(|f| &f.state) {
            Some(FrameState::Loaded(image)) => Some(image),
            _ => None,
        }
    }

    /// Records a load completion. Failures count toward progress like
    /// successes. Returns `None` for unknown indices and repeat reports.
    pub fn record(&mut self, event: FrameLoaded) -> Option<LoadReport> {
        let total = self.frames.len();
        let frame = self.frames.get_mut(event.index)?;
        if frame.state.is_settled() {
            debug!(index = event.index, "ignoring repeated frame load report");
            return None;
        }
        frame.state = match event.image {
            Some(image) => FrameState::Loaded(image),
            None => FrameState::Errored,
        };
        self.settled += 1;
        Some(LoadReport {
            index: event.index,
            settled: self.settled,
            total,
            percent: percent_of(self.settled, total),
            first: self.settled == 1,
            complete: self.settled == total,
        })
    }
}

fn percent_of(settled: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((settled as f64 / total as f64) * 100.0).round() as u8
}
