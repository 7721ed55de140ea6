use std::sync::Arc;

use cardiolearn_rhythms::{RhythmCatalog, RhythmDefinition};

use crate::cycle::{CycleScheduler, CycleState, PrematureGroup, PrematurePattern, SchedulerTuning};
use crate::messages::{MonitorCommand, MonitorEvent, PaperSpeed, ScrollSpeed, Settings};
use crate::random::{RandomSource, SeededRandom};
use crate::strip::{PhaseAligner, PhaseReading, ScrollBuffer, ScrollSample, DEFAULT_MARGIN};
use crate::waveform::synthesize;

/// Frame-driven tick loop for one rhythm strip.
///
/// Each processed tick advances simulated time, lets the cycle scheduler cross any
/// beat boundary, synthesizes one sample and appends it to the strip. Changing the
/// rhythm or the premature controls resets the scheduler state, the strip and the
/// phase queue together.
pub struct Monitor {
    // Rhythm
    catalog: RhythmCatalog,
    rhythm: Arc<RhythmDefinition>,

    // Scheduling
    scheduler: CycleScheduler,
    state: CycleState,
    rng: Box<dyn RandomSource>,

    // Strip
    buffer: ScrollBuffer,
    aligner: PhaseAligner,

    settings: Settings,
    time: f64,
    frame_counter: u32,
    paused: bool,
}

impl Monitor {
    pub fn new(catalog: RhythmCatalog, settings: Settings) -> Self {
        Self::with_tuning(catalog, settings, SchedulerTuning::default())
    }

    pub fn with_tuning(catalog: RhythmCatalog, settings: Settings, tuning: SchedulerTuning) -> Self {
        let rhythm = catalog.lookup(&settings.default_rhythm);
        let scheduler = Self::scheduler_for(&settings, tuning);
        let state = scheduler.initial_state(&rhythm, 0.0);

        log::info!("Monitor started with {}", rhythm);

        Self {
            catalog,
            rhythm,
            scheduler,
            state,
            rng: Box::new(SeededRandom::new(settings.seed)),
            buffer: ScrollBuffer::new(settings.visible_width),
            aligner: PhaseAligner::new(settings.visible_width, DEFAULT_MARGIN),
            settings,
            time: 0.0,
            frame_counter: 0,
            paused: false,
        }
    }

    /// Replace the random source, e.g. with a scripted one in tests.
    ///
    /// A configured seed still reseeds with [`SeededRandom`] on the next reset.
    pub fn set_random_source(&mut self, rng: Box<dyn RandomSource>) {
        self.rng = rng;
    }

    fn scheduler_for(settings: &Settings, tuning: SchedulerTuning) -> CycleScheduler {
        let mut scheduler = CycleScheduler::new(tuning)
            .with_pattern(settings.premature_pattern, settings.premature_group);
        scheduler.heart_rate_variability = settings.heart_rate_variability;
        Self::warn_if_sustained(&scheduler);
        scheduler
    }

    /// Logs when the premature controls chain runs into a sustained ectopic rhythm.
    fn warn_if_sustained(scheduler: &CycleScheduler) -> bool {
        let sustained = scheduler.pattern.saturates(scheduler.group);
        if sustained {
            log::warn!(
                "Premature {} with {} runs never returns to sinus rhythm",
                scheduler.pattern,
                scheduler.group
            );
        }
        sustained
    }

    /// Called once per display refresh. Processes a tick when the scroll-speed throttle allows.
    pub fn on_frame(&mut self) -> Option<ScrollSample> {
        if self.paused {
            return None;
        }

        self.frame_counter += 1;
        if self.frame_counter < self.settings.scroll_speed.frames_per_tick() {
            return None;
        }
        self.frame_counter = 0;
        self.tick()
    }

    /// Advance by the paper-speed increment and produce one sample.
    pub fn tick(&mut self) -> Option<ScrollSample> {
        self.advance(self.settings.paper_speed.time_increment())
    }

    /// Advance simulated time by `delta` seconds and produce one sample.
    pub fn advance(&mut self, delta: f64) -> Option<ScrollSample> {
        if self.paused {
            return None;
        }

        self.time += delta.max(0.0);
        self.scheduler
            .update(&mut self.state, &self.rhythm, self.time, self.rng.as_mut());

        let output = synthesize(self.time, &self.rhythm, &self.state, self.rng.as_mut());
        let sample = ScrollSample::new(self.time, output);

        self.buffer.push(sample);
        self.aligner.push(PhaseReading {
            phase: sample.phase,
            metadata: sample.metadata,
        });
        Some(sample)
    }

    pub fn pause(&mut self) {
        if !self.paused {
            log::trace!("Monitor paused at {:.3}s", self.time);
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn toggle_pause(&mut self) -> bool {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
        self.paused
    }

    /// Restart the strip: scheduler state, samples and phase queue are cleared together.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.frame_counter = 0;
        self.scheduler.reset(&mut self.state, &self.rhythm, self.time);
        self.buffer = ScrollBuffer::new(self.settings.visible_width);
        self.aligner = PhaseAligner::new(self.settings.visible_width, DEFAULT_MARGIN);
        if let Some(seed) = self.settings.seed {
            self.rng = Box::new(SeededRandom::from_seed(seed));
        }
        log::info!(
            "Strip reset: {} pattern={} group={}",
            self.rhythm.id,
            self.scheduler.pattern,
            self.scheduler.group
        );
    }

    /// Switch rhythm; unknown ids fall back to normal sinus rhythm.
    pub fn select_rhythm(&mut self, id: &str) {
        self.rhythm = self.catalog.lookup(id);
        log::info!("Selected {}", self.rhythm);
        self.reset();
    }

    pub fn set_premature_pattern(&mut self, pattern: PrematurePattern) {
        self.settings.premature_pattern = pattern;
        self.scheduler.pattern = pattern;
        Self::warn_if_sustained(&self.scheduler);
        self.reset();
    }

    pub fn set_premature_group(&mut self, group: PrematureGroup) {
        self.settings.premature_group = group;
        self.scheduler.group = group;
        Self::warn_if_sustained(&self.scheduler);
        self.reset();
    }

    /// Paper speed only changes future increments; the strip is kept.
    pub fn set_paper_speed(&mut self, speed: PaperSpeed) {
        self.settings.paper_speed = speed;
    }

    pub fn set_scroll_speed(&mut self, speed: ScrollSpeed) {
        self.settings.scroll_speed = speed;
        self.frame_counter = 0;
    }

    /// Apply a full settings set. The current rhythm is kept.
    pub fn apply_settings(&mut self, settings: Settings) {
        self.scheduler = Self::scheduler_for(&settings, self.scheduler.tuning.clone());
        self.settings = settings;
        if self.settings.seed.is_none() {
            self.rng = Box::new(SeededRandom::from_os_rng());
        }
        self.reset();
    }

    pub fn handle_command(&mut self, command: MonitorCommand) -> Option<MonitorEvent> {
        match command {
            MonitorCommand::Pause => {
                self.pause();
                Some(MonitorEvent::PauseChanged { paused: true })
            }
            MonitorCommand::Resume => {
                self.resume();
                Some(MonitorEvent::PauseChanged { paused: false })
            }
            MonitorCommand::TogglePause => Some(MonitorEvent::PauseChanged {
                paused: self.toggle_pause(),
            }),
            MonitorCommand::Reset => {
                self.reset();
                Some(self.reset_event())
            }
            MonitorCommand::SelectRhythm { id } => {
                self.select_rhythm(&id);
                Some(MonitorEvent::RhythmSelected {
                    id: self.rhythm.id.clone(),
                })
            }
            MonitorCommand::SetPrematurePattern { pattern } => {
                self.set_premature_pattern(pattern);
                Some(self.reset_event())
            }
            MonitorCommand::SetPrematureGroup { group } => {
                self.set_premature_group(group);
                Some(self.reset_event())
            }
            MonitorCommand::SetPaperSpeed { speed } => {
                self.set_paper_speed(speed);
                None
            }
            MonitorCommand::SetScrollSpeed { speed } => {
                self.set_scroll_speed(speed);
                None
            }
            MonitorCommand::UpdateSettings { settings } => {
                self.apply_settings(settings);
                Some(MonitorEvent::SettingsUpdated {
                    settings: self.settings.clone(),
                })
            }
            MonitorCommand::QueryPhase => Some(MonitorEvent::PhaseState {
                reading: self.current_phase(),
            }),
            MonitorCommand::QueryLatestSample => Some(MonitorEvent::LatestSample {
                sample: self.buffer.latest().copied(),
            }),
            MonitorCommand::QuerySettings => Some(MonitorEvent::SettingsUpdated {
                settings: self.settings.clone(),
            }),
        }
    }

    fn reset_event(&self) -> MonitorEvent {
        MonitorEvent::StripReset {
            rhythm_id: self.rhythm.id.clone(),
        }
    }

    /// Phase of the sample under the mid-strip marker.
    pub fn current_phase(&self) -> PhaseReading {
        self.aligner.current()
    }

    pub fn rhythm(&self) -> &RhythmDefinition {
        &self.rhythm
    }

    pub fn catalog(&self) -> &RhythmCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &CycleState {
        &self.state
    }

    pub fn buffer(&self) -> &ScrollBuffer {
        &self.buffer
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Simulated seconds since the last reset.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}
