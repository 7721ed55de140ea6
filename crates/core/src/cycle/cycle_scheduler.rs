use std::fmt;

use cardiolearn_rhythms::{BlockType, RhythmDefinition};
use serde::{Deserialize, Serialize};

use super::cycle_state::CycleState;
use crate::random::RandomSource;

/// PR lengthening per Wenckebach step, in cycle-progress units.
pub const WENCKEBACH_PR_STEP: f64 = 0.04;
/// PR shortening for pre-excited conduction, in cycle-progress units.
pub const PRE_EXCITATION_PR_OFFSET: f64 = -0.035;

/// Which beats are made premature on a premature-capable rhythm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrematurePattern {
    #[default]
    Random,
    Bigeminy,
    Trigeminy,
    Quadrigeminy,
}

impl PrematurePattern {
    pub const ALL: [PrematurePattern; 4] = [
        PrematurePattern::Random,
        PrematurePattern::Bigeminy,
        PrematurePattern::Trigeminy,
        PrematurePattern::Quadrigeminy,
    ];

    /// Lossy parse; anything unrecognized is `Random`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "random" => PrematurePattern::Random,
            "bigeminy" => PrematurePattern::Bigeminy,
            "trigeminy" => PrematurePattern::Trigeminy,
            "quadrigeminy" => PrematurePattern::Quadrigeminy,
            other => {
                log::warn!("Unknown premature pattern '{}', using random", other);
                PrematurePattern::Random
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrematurePattern::Random => "random",
            PrematurePattern::Bigeminy => "bigeminy",
            PrematurePattern::Trigeminy => "trigeminy",
            PrematurePattern::Quadrigeminy => "quadrigeminy",
        }
    }

    /// Whether `beat_index` should start an ectopic run.
    pub fn matches(&self, beat_index: u64, probability: f64, rng: &mut dyn RandomSource) -> bool {
        match self {
            PrematurePattern::Random => rng.chance(probability),
            PrematurePattern::Bigeminy => beat_index % 2 == 1,
            PrematurePattern::Trigeminy => beat_index % 3 == 2,
            PrematurePattern::Quadrigeminy => beat_index % 4 == 3,
        }
    }

    /// Whether runs of `group` cover every beat once the first run starts. A run that
    /// ends on a beat the pattern selects again is followed straight by the next run.
    pub fn saturates(&self, group: PrematureGroup) -> bool {
        let period = match self {
            PrematurePattern::Random => return false,
            PrematurePattern::Bigeminy => 2,
            PrematurePattern::Trigeminy => 3,
            PrematurePattern::Quadrigeminy => 4,
        };
        let run = group.run_length();
        run > 1 && run % period == 0
    }
}

impl From<String> for PrematurePattern {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PrematurePattern> for String {
    fn from(value: PrematurePattern) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PrematurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length of each run of consecutive ectopic beats.
///
/// A run starts on a beat the pattern selects and the pattern is not consulted again
/// until it ends. When the run length is a multiple of the pattern period
/// (see [`PrematurePattern::saturates`]) the runs chain into a sustained ectopic
/// rhythm: bigeminy with couplets or quadruplets, trigeminy with triplets,
/// quadrigeminy with quadruplets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PrematureGroup {
    #[default]
    Single,
    Couplet,
    Triplet,
    Quadruplet,
}

impl PrematureGroup {
    pub const ALL: [PrematureGroup; 4] = [
        PrematureGroup::Single,
        PrematureGroup::Couplet,
        PrematureGroup::Triplet,
        PrematureGroup::Quadruplet,
    ];

    /// Lossy parse; anything unrecognized is `Single`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "single" => PrematureGroup::Single,
            "couplet" => PrematureGroup::Couplet,
            "triplet" => PrematureGroup::Triplet,
            "quadruplet" => PrematureGroup::Quadruplet,
            other => {
                log::warn!("Unknown premature group '{}', using single", other);
                PrematureGroup::Single
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrematureGroup::Single => "single",
            PrematureGroup::Couplet => "couplet",
            PrematureGroup::Triplet => "triplet",
            PrematureGroup::Quadruplet => "quadruplet",
        }
    }

    pub fn run_length(&self) -> u32 {
        match self {
            PrematureGroup::Single => 1,
            PrematureGroup::Couplet => 2,
            PrematureGroup::Triplet => 3,
            PrematureGroup::Quadruplet => 4,
        }
    }
}

impl From<String> for PrematureGroup {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<PrematureGroup> for String {
    fn from(value: PrematureGroup) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PrematureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probabilities and intervals used at cycle boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerTuning {
    /// Rate equivalent of the ectopic coupling interval.
    pub premature_rate_bpm: f64,
    pub random_premature_probability: f64,
    pub mobitz_drop_probability: f64,
    pub sinus_pause_probability: f64,
    pub sinus_pause_secs: f64,
    /// Multiplier for the cycle after a ventricular ectopic run.
    pub ventricular_compensation: f64,
    /// Multiplier for the cycle after an atrial ectopic run.
    pub atrial_compensation: f64,
}

impl Default for SchedulerTuning {
    fn default() -> Self {
        Self {
            premature_rate_bpm: 140.0,
            random_premature_probability: 0.20,
            mobitz_drop_probability: 0.30,
            sinus_pause_probability: 0.12,
            sinus_pause_secs: 2.0,
            ventricular_compensation: 1.6,
            atrial_compensation: 1.3,
        }
    }
}

impl SchedulerTuning {
    pub fn coupling_interval_secs(&self) -> f64 {
        60.0 / self.premature_rate_bpm.max(1.0)
    }
}

/// PR delay of the current beat relative to the standard layout, in progress units.
///
/// Wenckebach lengthens it with each step, pre-excitation shortens it. Mobitz II
/// never changes it.
pub fn pr_offset(rhythm: &RhythmDefinition, state: &CycleState) -> f64 {
    let mut offset = rhythm.pr_extension;
    if rhythm.block_type == BlockType::Wenckebach {
        offset += f64::from(state.wenckebach_step) * WENCKEBACH_PR_STEP;
    }
    if rhythm.accessory_pathway {
        offset += PRE_EXCITATION_PR_OFFSET;
    }
    offset
}

/// Decides the shape of every heartbeat cycle at its boundary.
#[derive(Clone, Debug)]
pub struct CycleScheduler {
    pub tuning: SchedulerTuning,
    pub pattern: PrematurePattern,
    pub group: PrematureGroup,
    /// Apply the rhythm's jitter to cycle durations.
    pub heart_rate_variability: bool,
}

impl CycleScheduler {
    pub fn new(tuning: SchedulerTuning) -> Self {
        Self {
            tuning,
            pattern: PrematurePattern::default(),
            group: PrematureGroup::default(),
            heart_rate_variability: true,
        }
    }

    pub fn with_pattern(mut self, pattern: PrematurePattern, group: PrematureGroup) -> Self {
        self.pattern = pattern;
        self.group = group;
        self
    }

    pub fn base_duration(&self, rhythm: &RhythmDefinition) -> f64 {
        rhythm.base_interval_secs()
    }

    /// Fresh state for `rhythm` starting at `now`.
    pub fn initial_state(&self, rhythm: &RhythmDefinition, now: f64) -> CycleState {
        CycleState::new(now, self.base_duration(rhythm), rhythm.atrial_interval_secs())
    }

    /// Clears all counters and restarts the cycle and atrial clocks at `now`.
    pub fn reset(&self, state: &mut CycleState, rhythm: &RhythmDefinition, now: f64) {
        *state = self.initial_state(rhythm, now);
        log::debug!(
            "Cycle scheduler reset for {} at {:.3}s (duration {:.3}s)",
            rhythm.id,
            now,
            state.cycle_duration
        );
    }

    /// Starts a new cycle if the current one has completed. Returns true on a boundary.
    pub fn update(
        &self,
        state: &mut CycleState,
        rhythm: &RhythmDefinition,
        now: f64,
        rng: &mut dyn RandomSource,
    ) -> bool {
        if !state.has_completed(now) {
            return false;
        }

        state.cycle_start_time = now;
        state.beat_index += 1;
        state.mobitz_dropped = false;
        state.is_premature_beat = false;
        state.sinus_pause = false;

        if rhythm.premature_capable {
            self.schedule_premature(state, rng);
        }

        // The beat is drawn over `layout_duration`; compensation and sinus pauses only
        // add flat baseline ahead of it.
        if state.is_premature_beat {
            state.ectopic_morphology_seed = rng.next_unit().clamp(0.0, 1.0);
            state.layout_duration = self.tuning.coupling_interval_secs();
            state.cycle_duration = state.layout_duration;
        } else {
            state.layout_duration = self.jittered_duration(rhythm, rng);
            state.cycle_duration = state.layout_duration;
            if state.compensatory_pause_pending {
                state.compensatory_pause_pending = false;
                state.cycle_duration *= if rhythm.ectopic_focus.is_ventricular() {
                    self.tuning.ventricular_compensation
                } else {
                    self.tuning.atrial_compensation
                };
            }
        }

        match rhythm.block_type {
            BlockType::Wenckebach => {
                state.wenckebach_step = (state.wenckebach_step + 1) % 4;
                state.mobitz_dropped = state.wenckebach_step == 3;
            }
            BlockType::Mobitz2 => {
                state.mobitz_dropped = rng.chance(self.tuning.mobitz_drop_probability);
            }
            BlockType::SickSinus => {
                if !state.is_premature_beat && rng.chance(self.tuning.sinus_pause_probability) {
                    state.cycle_duration += self.tuning.sinus_pause_secs;
                    state.sinus_pause = true;
                }
            }
            // The atrial timer keeps its own period; only the escape rhythm is scheduled here.
            BlockType::Complete | BlockType::None => {}
        }

        state.layout_duration = state.layout_duration.max(f64::EPSILON);
        state.cycle_duration = state.cycle_duration.max(state.layout_duration);

        log::debug!(
            "Beat {} of {}: duration {:.3}s (beat {:.3}s) premature={} dropped={} step={} pause={}",
            state.beat_index,
            rhythm.id,
            state.cycle_duration,
            state.layout_duration,
            state.is_premature_beat,
            state.mobitz_dropped,
            state.wenckebach_step,
            state.sinus_pause
        );

        true
    }

    fn schedule_premature(&self, state: &mut CycleState, rng: &mut dyn RandomSource) {
        if state.pending_ectopic_run > 0 {
            state.pending_ectopic_run -= 1;
            state.is_premature_beat = true;
        } else if self.pattern.matches(
            state.beat_index,
            self.tuning.random_premature_probability,
            rng,
        ) {
            state.is_premature_beat = true;
            state.pending_ectopic_run = self.group.run_length() - 1;
        }

        if state.is_premature_beat && state.pending_ectopic_run == 0 {
            state.compensatory_pause_pending = true;
        }
    }

    fn jittered_duration(&self, rhythm: &RhythmDefinition, rng: &mut dyn RandomSource) -> f64 {
        let base = self.base_duration(rhythm);
        if self.heart_rate_variability && rhythm.jitter > 0.0 {
            base * (1.0 + rng.symmetric(rhythm.jitter))
        } else {
            base
        }
    }
}

impl Default for CycleScheduler {
    fn default() -> Self {
        Self::new(SchedulerTuning::default())
    }
}
