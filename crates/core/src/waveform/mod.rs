pub mod pulse;
pub mod synthesizer;

pub use pulse::{gaussian, superpose, Pulse};
pub use synthesizer::{
    beat_layout, phase_at, synthesize, BeatLayout, Phase, SampleMetadata, SynthOutput,
};
