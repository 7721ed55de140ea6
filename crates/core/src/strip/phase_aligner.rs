use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::waveform::{Phase, SampleMetadata};

/// Phase and annotations of the sample crossing the mid-strip marker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseReading {
    pub phase: Phase,
    pub metadata: SampleMetadata,
}

/// Metadata queue parallel to the scroll buffer, read back `lag` samples behind the newest.
///
/// Samples are written at the trailing edge of the strip while the marker sits in the
/// middle, so the reading must trail by half the visible width to describe the sample
/// under the marker.
#[derive(Clone, Debug)]
pub struct PhaseAligner {
    queue: VecDeque<PhaseReading>,
    lag: usize,
    capacity: usize,
}

impl PhaseAligner {
    pub fn new(visible_width: usize, margin: usize) -> Self {
        let visible_width = visible_width.max(1);
        let capacity = visible_width + margin;
        Self {
            queue: VecDeque::with_capacity(capacity + 1),
            lag: visible_width / 2,
            capacity,
        }
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    pub fn push(&mut self, reading: PhaseReading) {
        self.queue.push_back(reading);
        while self.queue.len() > self.capacity {
            self.queue.pop_front();
        }
    }

    /// Reading `lag` entries behind the newest, or the empty reading until that exists.
    pub fn current(&self) -> PhaseReading {
        self.queue
            .len()
            .checked_sub(self.lag + 1)
            .and_then(|index| self.queue.get(index))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(beat_index: u64, phase: Phase) -> PhaseReading {
        PhaseReading {
            phase,
            metadata: SampleMetadata {
                beat_index,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_underflow_reads_rest() {
        let mut aligner = PhaseAligner::new(10, 2);
        assert_eq!(aligner.lag(), 5);
        for i in 0..5 {
            aligner.push(reading(i, Phase::Qrs));
            assert_eq!(aligner.current(), PhaseReading::default());
        }
        aligner.push(reading(5, Phase::TWave));
        assert_eq!(aligner.current(), reading(0, Phase::Qrs));
    }

    #[test]
    fn test_lagged_readback() {
        let mut aligner = PhaseAligner::new(10, 2);
        for i in 0..40 {
            aligner.push(reading(i, Phase::PWave));
        }
        assert_eq!(aligner.len(), 12);
        assert_eq!(aligner.current().metadata.beat_index, 39 - 5);

        aligner.clear();
        assert!(aligner.is_empty());
        assert_eq!(aligner.current().phase, Phase::Rest);
    }
}
