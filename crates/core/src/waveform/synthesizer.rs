use std::f64::consts::TAU;
use std::fmt;

use cardiolearn_rhythms::{
    AtrialSite, BlockType, ChaosType, EctopicFocus, PMorphology, QrsMorphology,
    RhythmDefinition, VentricularMorphology,
};
use serde::{Deserialize, Serialize};

use super::pulse::{superpose, Pulse};
use crate::cycle::{pr_offset, CycleState};
use crate::random::RandomSource;

// Beat geometry in cycle-progress units.
pub const P_CENTER: f64 = 0.18;
pub const ECTOPIC_P_CENTER: f64 = 0.12;
pub const P_HALF_WIDTH: f64 = 0.06;
pub const QRS_ONSET: f64 = 0.27;
pub const QRS_ONSET_WITHOUT_P: f64 = 0.12;
pub const QRS_SPAN: f64 = 0.16;
pub const ST_SPAN: f64 = 0.12;
pub const T_SPAN: f64 = 0.22;
const MIN_PR_SEGMENT: f64 = 0.01;
const LAYOUT_END: f64 = 0.98;
const VENTRICULAR_ECTOPIC_WIDTH: f64 = 2.0;

const R_PEAK: f64 = 35.0;
const FIBRILLATION_STEP: f64 = 0.004;
/// (angular step, amplitude) of the fibrillation sinusoids.
const FIBRILLATION_WAVES: [(f64, f64); 3] = [(0.1, 10.0), (0.25, 8.0), (0.5, 5.0)];
const FLUTTER_AMPLITUDE: f64 = 10.0;

/// Electrical phase of the heart at a sample, as shown on the schematic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Rest,
    PWave,
    PrSegment,
    Qrs,
    StSegment,
    TWave,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Rest => "rest",
            Phase::PWave => "p_wave",
            Phase::PrSegment => "pr_segment",
            Phase::Qrs => "qrs",
            Phase::StSegment => "st_segment",
            Phase::TWave => "t_wave",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Beat annotations carried alongside every sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleMetadata {
    pub premature: bool,
    pub dropped: bool,
    pub wenckebach_step: u8,
    /// Atrial cycle position for rhythms with an independent atrial clock.
    pub atrial_progress: Option<f64>,
    pub sinus_pause: bool,
    pub beat_index: u64,
}

impl SampleMetadata {
    pub fn from_state(state: &CycleState) -> Self {
        Self {
            premature: state.is_premature_beat,
            dropped: state.mobitz_dropped,
            wenckebach_step: state.wenckebach_step,
            atrial_progress: None,
            sinus_pause: state.sinus_pause,
            beat_index: state.beat_index,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthOutput {
    pub amplitude: f64,
    pub phase: Phase,
    pub metadata: SampleMetadata,
}

/// Phase boundaries of one beat. Boundaries are strictly increasing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatLayout {
    pub draws_p: bool,
    /// QRS, ST and T are drawn. False on dropped beats.
    pub conducted: bool,
    pub ventricular_ectopic: bool,
    pub p_center: f64,
    pub p_start: f64,
    pub p_end: f64,
    pub qrs_start: f64,
    pub qrs_end: f64,
    pub st_end: f64,
    pub t_end: f64,
    pub width_factor: f64,
}

impl BeatLayout {
    pub fn phase_at(&self, progress: f64) -> Phase {
        if self.draws_p {
            if progress < self.p_start {
                return Phase::Rest;
            }
            if progress < self.p_end {
                return Phase::PWave;
            }
            if !self.conducted {
                return Phase::Rest;
            }
            if progress < self.qrs_start {
                return Phase::PrSegment;
            }
        } else if !self.conducted || progress < self.qrs_start {
            return Phase::Rest;
        }

        if progress < self.qrs_end {
            Phase::Qrs
        } else if progress < self.st_end {
            Phase::StSegment
        } else if progress < self.t_end {
            Phase::TWave
        } else {
            Phase::Rest
        }
    }

    fn t_wave(&self) -> Pulse {
        let span = self.t_end - self.st_end;
        let widening = 1.0 + 0.25 * (self.width_factor - 1.0).max(0.0);
        Pulse::new(0.0, self.st_end + 0.4 * span, 0.16 * span * widening)
    }
}

fn is_ventricular_ectopic(rhythm: &RhythmDefinition, state: &CycleState) -> bool {
    state.is_premature_beat && rhythm.ectopic_focus.is_ventricular()
}

/// Phase boundaries for the beat `state` currently describes.
pub fn beat_layout(rhythm: &RhythmDefinition, state: &CycleState) -> BeatLayout {
    let ventricular_ectopic = is_ventricular_ectopic(rhythm, state);
    let atrial_ectopic = state.is_premature_beat && rhythm.ectopic_focus.is_atrial();
    // In complete block the P waves follow the atrial clock instead.
    let draws_p =
        rhythm.has_p_wave && !ventricular_ectopic && rhythm.block_type != BlockType::Complete;

    let width_factor = if ventricular_ectopic {
        rhythm.qrs_width_factor.max(VENTRICULAR_ECTOPIC_WIDTH)
    } else {
        rhythm.qrs_width_factor.max(0.25)
    };

    let p_center = if atrial_ectopic {
        ECTOPIC_P_CENTER
    } else {
        P_CENTER
    };
    let qrs_start = if draws_p {
        (QRS_ONSET + pr_offset(rhythm, state)).max(p_center + MIN_PR_SEGMENT)
    } else {
        QRS_ONSET_WITHOUT_P
    };
    let p_start = p_center - P_HALF_WIDTH;
    let p_end = (p_center + P_HALF_WIDTH).min(qrs_start - MIN_PR_SEGMENT);

    let qrs_end = (qrs_start + QRS_SPAN * width_factor).min(LAYOUT_END - 0.1);
    let room = LAYOUT_END - qrs_end;
    let shrink = (room / (ST_SPAN + T_SPAN)).min(1.0);
    let st_end = qrs_end + ST_SPAN * shrink;
    let t_end = st_end + T_SPAN * shrink;

    BeatLayout {
        draws_p,
        conducted: !state.mobitz_dropped,
        ventricular_ectopic,
        p_center,
        p_start,
        p_end,
        qrs_start,
        qrs_end,
        st_end,
        t_end,
        width_factor,
    }
}

/// Phase label at `progress` through the current cycle.
pub fn phase_at(progress: f64, rhythm: &RhythmDefinition, state: &CycleState) -> Phase {
    if rhythm.is_chaotic() {
        return Phase::Rest;
    }
    beat_layout(rhythm, state).phase_at(progress)
}

fn p_wave_pulses(morphology: PMorphology, center: f64) -> Vec<Pulse> {
    match morphology {
        PMorphology::Normal => vec![Pulse::new(3.0, center, 0.02)],
        PMorphology::Peaked => vec![Pulse::new(7.0, center, 0.015)],
        PMorphology::Bifid => vec![
            Pulse::new(2.6, center - 0.02, 0.014),
            Pulse::new(2.8, center + 0.02, 0.014),
        ],
        PMorphology::Biphasic => vec![
            Pulse::new(2.5, center - 0.015, 0.012),
            Pulse::new(-2.5, center + 0.015, 0.012),
        ],
        PMorphology::Inverted => vec![Pulse::new(-3.0, center, 0.02)],
    }
}

fn p_morphology_for(rhythm: &RhythmDefinition, state: &CycleState) -> PMorphology {
    match rhythm.ectopic_focus {
        EctopicFocus::Atrial(site) if state.is_premature_beat => match site {
            AtrialSite::High => rhythm.p_morphology,
            AtrialSite::Mid => PMorphology::Biphasic,
            AtrialSite::Low => PMorphology::Inverted,
        },
        _ => rhythm.p_morphology,
    }
}

/// Conducted QRS. Returns the sign of the dominant deflection.
fn push_qrs(pulses: &mut Vec<Pulse>, rhythm: &RhythmDefinition, layout: &BeatLayout) -> f64 {
    let s = layout.qrs_start;
    let w = layout.width_factor;
    let r_peak = if rhythm.is_wide_qrs() {
        R_PEAK * 1.15
    } else {
        R_PEAK
    };

    match rhythm.qrs_morphology {
        QrsMorphology::Standard => {
            pulses.push(Pulse::new(-4.0, s + 0.05 * w, 0.008 * w));
            pulses.push(Pulse::new(r_peak, s + 0.07 * w, 0.01 * w));
            pulses.push(Pulse::new(-8.0, s + 0.10 * w, 0.01 * w));
        }
        QrsMorphology::Notched => {
            let r_center = s + 0.07 * w;
            pulses.push(Pulse::new(-4.0, s + 0.04 * w, 0.008 * w));
            pulses.push(Pulse::new(r_peak, r_center, 0.006 * w));
            pulses.push(Pulse::new(r_peak * 0.8, r_center + 0.02, 0.006 * w));
        }
        QrsMorphology::Rsr => {
            pulses.push(Pulse::new(8.0, s + 0.04 * w, 0.008 * w));
            pulses.push(Pulse::new(-15.0, s + 0.065 * w, 0.008 * w));
            pulses.push(Pulse::new(33.0, s + 0.09 * w, 0.01 * w));
            pulses.push(Pulse::new(-8.0, s + 0.115 * w, 0.01 * w));
        }
    }
    1.0
}

/// Single large ectopic complex shaped by the morphology seed.
fn push_ectopic_qrs(
    pulses: &mut Vec<Pulse>,
    rhythm: &RhythmDefinition,
    state: &CycleState,
    layout: &BeatLayout,
) -> f64 {
    let seed = state.ectopic_morphology_seed.clamp(0.0, 1.0);
    let w = layout.width_factor;
    let center = layout.qrs_start + 0.07 * w;
    let main = |peak: f64| Pulse::new(peak, center, 0.02 * w);

    match rhythm.ectopic_focus {
        EctopicFocus::Ventricular(VentricularMorphology::Polymorphic) => {
            let peak = 40.0 + 10.0 * (seed * 3.0).fract();
            if seed < 1.0 / 3.0 {
                pulses.push(main(peak));
                1.0
            } else if seed < 2.0 / 3.0 {
                pulses.push(main(-peak));
                -1.0
            } else {
                pulses.push(main(peak));
                pulses.push(Pulse::new(peak * 0.6, center + 0.03 * w, 0.01 * w));
                1.0
            }
        }
        _ => {
            pulses.push(main(45.0));
            1.0
        }
    }
}

/// Every pulse of the current beat, positioned in progress units.
fn beat_pulses(rhythm: &RhythmDefinition, state: &CycleState, layout: &BeatLayout) -> Vec<Pulse> {
    let mut pulses = Vec::with_capacity(8);
    if layout.draws_p {
        pulses.extend(p_wave_pulses(p_morphology_for(rhythm, state), layout.p_center));
    }
    if !layout.conducted {
        return pulses;
    }

    if rhythm.accessory_pathway && layout.draws_p {
        pulses.push(Pulse::new(5.0, layout.qrs_start, 0.02));
    }

    let dominant = if layout.ventricular_ectopic {
        push_ectopic_qrs(&mut pulses, rhythm, state, layout)
    } else {
        push_qrs(&mut pulses, rhythm, layout)
    };

    let t_peak = if layout.ventricular_ectopic || rhythm.is_wide_qrs() {
        -7.0 * dominant
    } else {
        6.0 * dominant
    };
    pulses.push(Pulse {
        peak: t_peak,
        ..layout.t_wave()
    });
    pulses
}

fn fibrillation(t: f64) -> f64 {
    let n = t / FIBRILLATION_STEP;
    FIBRILLATION_WAVES
        .iter()
        .map(|(omega, amplitude)| (n * omega).sin() * amplitude)
        .sum()
}

/// Negative-going sawtooth approximated by its first three harmonics.
fn flutter_wave(atrial_progress: f64) -> f64 {
    let harmonics: f64 = (1..=3)
        .map(|k| {
            let k = f64::from(k);
            (TAU * k * atrial_progress).sin() / k
        })
        .sum();
    -FLUTTER_AMPLITUDE * 0.6 * harmonics
}

/// Beat shape at `t`; flat `Rest` during a pause ahead of the beat.
fn ventricular_beat(
    rhythm: &RhythmDefinition,
    state: &CycleState,
    layout: &BeatLayout,
    t: f64,
) -> (f64, Phase) {
    match state.beat_progress(t) {
        Some(progress) => (
            superpose(&beat_pulses(rhythm, state, layout), progress),
            layout.phase_at(progress),
        ),
        None => (0.0, Phase::Rest),
    }
}

/// Amplitude, phase and annotations at simulated time `t`.
///
/// `state` must already be advanced to `t` by the cycle scheduler. Only the
/// baseline noise (and nothing else) is drawn from `rng`.
pub fn synthesize(
    t: f64,
    rhythm: &RhythmDefinition,
    state: &CycleState,
    rng: &mut dyn RandomSource,
) -> SynthOutput {
    let mut metadata = SampleMetadata::from_state(state);

    if rhythm.chaos_type == ChaosType::Fibrillation {
        return SynthOutput {
            amplitude: fibrillation(t) + rng.symmetric(rhythm.baseline_noise),
            phase: Phase::Rest,
            metadata,
        };
    }

    let layout = beat_layout(rhythm, state);

    let (amplitude, phase) = if rhythm.flutter_baseline {
        // Ventricular timing follows every Nth flutter wave.
        let timer = state.atrial_timer;
        let atrial = timer.progress(t);
        metadata.atrial_progress = Some(atrial);

        let ratio = u64::from(rhythm.conduction_ratio.max(1));
        let cycles = timer.cycles(t);
        metadata.beat_index = cycles / ratio;
        let wave = (cycles % ratio) as f64;
        let progress = (wave + atrial) / ratio as f64;
        let beat = superpose(&beat_pulses(rhythm, state, &layout), progress);
        (flutter_wave(atrial) + beat, layout.phase_at(progress))
    } else if rhythm.block_type == BlockType::Complete {
        let atrial = state.atrial_timer.progress(t);
        metadata.atrial_progress = Some(atrial);

        let (mut amplitude, mut phase) = ventricular_beat(rhythm, state, &layout, t);
        if rhythm.has_p_wave {
            amplitude += superpose(&p_wave_pulses(rhythm.p_morphology, P_CENTER), atrial);
            let in_p = (P_CENTER - P_HALF_WIDTH..P_CENTER + P_HALF_WIDTH).contains(&atrial);
            if phase == Phase::Rest && in_p {
                phase = Phase::PWave;
            }
        }
        (amplitude, phase)
    } else {
        ventricular_beat(rhythm, state, &layout, t)
    };

    SynthOutput {
        amplitude: amplitude + rng.symmetric(rhythm.baseline_noise),
        phase,
        metadata,
    }
}
