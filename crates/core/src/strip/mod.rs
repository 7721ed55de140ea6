pub mod phase_aligner;
pub mod scroll_buffer;

pub use phase_aligner::{PhaseAligner, PhaseReading};
pub use scroll_buffer::{ScrollBuffer, ScrollSample, DEFAULT_MARGIN};
