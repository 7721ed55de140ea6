use serde::{Deserialize, Serialize};

/// Free-running atrial clock used when atria and ventricles are dissociated.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AtrialTimer {
    pub epoch: f64,
    pub period: f64,
}

impl AtrialTimer {
    pub fn new(epoch: f64, period: f64) -> Self {
        Self {
            epoch,
            period: period.max(f64::EPSILON),
        }
    }

    /// Position within the current atrial cycle, in `[0, 1)`.
    pub fn progress(&self, time: f64) -> f64 {
        ((time - self.epoch) / self.period).rem_euclid(1.0)
    }

    /// Number of atrial cycles completed since the epoch.
    pub fn cycles(&self, time: f64) -> u64 {
        ((time - self.epoch) / self.period).max(0.0).floor() as u64
    }
}

/// Mutable per-view heartbeat state, advanced only by the cycle scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    pub cycle_start_time: f64,
    /// Always positive.
    pub cycle_duration: f64,
    /// Span the beat shape is drawn over, at the end of the cycle. Any time before it
    /// (sinus or compensatory pause) is flat baseline. Never exceeds `cycle_duration`.
    pub layout_duration: f64,
    pub beat_index: u64,
    /// 0..=3, QRS dropped on 3.
    pub wenckebach_step: u8,
    /// QRS suppressed for this cycle. Cleared at every boundary.
    pub mobitz_dropped: bool,
    /// Beats still to be forced premature by a couplet/triplet/quadruplet run.
    pub pending_ectopic_run: u32,
    pub is_premature_beat: bool,
    /// Drawn once per premature beat, picks among polymorphic shapes.
    pub ectopic_morphology_seed: f64,
    pub atrial_timer: AtrialTimer,
    pub sinus_pause: bool,
    pub compensatory_pause_pending: bool,
}

impl CycleState {
    pub fn new(now: f64, cycle_duration: f64, atrial_period: f64) -> Self {
        let cycle_duration = cycle_duration.max(f64::EPSILON);
        Self {
            cycle_start_time: now,
            cycle_duration,
            layout_duration: cycle_duration,
            beat_index: 0,
            wenckebach_step: 0,
            mobitz_dropped: false,
            pending_ectopic_run: 0,
            is_premature_beat: false,
            ectopic_morphology_seed: 0.0,
            atrial_timer: AtrialTimer::new(now, atrial_period),
            sinus_pause: false,
            compensatory_pause_pending: false,
        }
    }

    /// Position within the drawn beat in `[0, 1)`, or `None` during a leading pause.
    pub fn beat_progress(&self, time: f64) -> Option<f64> {
        let layout = self.layout_duration.clamp(f64::EPSILON, self.cycle_duration);
        let elapsed = time - self.cycle_start_time - (self.cycle_duration - layout);
        if elapsed < 0.0 {
            return None;
        }
        Some((elapsed / layout).clamp(0.0, 1.0 - f64::EPSILON))
    }

    /// Seconds of flat baseline before the beat is drawn.
    pub fn pause_duration(&self) -> f64 {
        (self.cycle_duration - self.layout_duration).max(0.0)
    }

    pub fn has_completed(&self, time: f64) -> bool {
        time - self.cycle_start_time > self.cycle_duration
    }
}
