use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::waveform::{Phase, SampleMetadata, SynthOutput};

/// Samples kept beyond the visible width before eviction.
pub const DEFAULT_MARGIN: usize = 16;

/// One plotted point of the strip.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollSample {
    /// Simulated time in seconds.
    pub time: f64,
    pub amplitude: f64,
    pub phase: Phase,
    pub metadata: SampleMetadata,
}

impl ScrollSample {
    pub fn new(time: f64, output: SynthOutput) -> Self {
        Self {
            time,
            amplitude: output.amplitude,
            phase: output.phase,
            metadata: output.metadata,
        }
    }
}

/// Rolling window of samples; new samples enter at the back, the oldest fall off the front.
#[derive(Clone, Debug)]
pub struct ScrollBuffer {
    samples: VecDeque<ScrollSample>,
    visible_width: usize,
    margin: usize,
}

impl ScrollBuffer {
    pub fn new(visible_width: usize) -> Self {
        Self::with_margin(visible_width, DEFAULT_MARGIN)
    }

    pub fn with_margin(visible_width: usize, margin: usize) -> Self {
        let visible_width = visible_width.max(1);
        Self {
            samples: VecDeque::with_capacity(visible_width + margin + 1),
            visible_width,
            margin,
        }
    }

    pub fn visible_width(&self) -> usize {
        self.visible_width
    }

    pub fn capacity(&self) -> usize {
        self.visible_width + self.margin
    }

    pub fn push(&mut self, sample: ScrollSample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity() {
            self.samples.pop_front();
        }
    }

    /// All retained samples, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = &ScrollSample> + '_ {
        self.samples.iter()
    }

    /// The newest `visible_width` samples, oldest first.
    pub fn visible(&self) -> impl Iterator<Item = &ScrollSample> + '_ {
        let skip = self.samples.len().saturating_sub(self.visible_width);
        self.samples.iter().skip(skip)
    }

    pub fn latest(&self) -> Option<&ScrollSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
