pub use config::{ConfigError, ConfigFile, ConfigManager, ConfigOption, ConfigSchema};
pub use cycle::{
    pr_offset, AtrialTimer, CycleScheduler, CycleState, PrematureGroup, PrematurePattern,
    SchedulerTuning,
};
pub use messages::{MonitorCommand, MonitorEvent, PaperSpeed, ScrollSpeed, Settings};
pub use monitor::Monitor;
pub use random::{RandomSource, SeededRandom};
pub use strip::{PhaseAligner, PhaseReading, ScrollBuffer, ScrollSample};
pub use waveform::{
    beat_layout, phase_at, synthesize, BeatLayout, Phase, SampleMetadata, SynthOutput,
};

mod config;
pub mod cycle;
pub mod messages;
mod monitor;
pub mod random;
pub mod strip;
pub mod waveform;
