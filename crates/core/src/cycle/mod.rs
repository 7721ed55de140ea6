pub mod cycle_scheduler;
pub mod cycle_state;

pub use cycle_scheduler::{
    pr_offset, CycleScheduler, PrematureGroup, PrematurePattern, SchedulerTuning,
    PRE_EXCITATION_PR_OFFSET, WENCKEBACH_PR_STEP,
};
pub use cycle_state::{AtrialTimer, CycleState};
