use cardiolearn_core::{
    pr_offset, CycleScheduler, CycleState, Monitor, PaperSpeed, Phase, PhaseReading,
    PrematureGroup, PrematurePattern, RandomSource, ScrollSample, SeededRandom, Settings,
};
use cardiolearn_rhythms::{BlockType, RhythmCatalog, RhythmDefinition};

const TICK: f64 = 0.004;

/// Runs the scheduler alone and returns the state after each cycle boundary.
fn cycles(
    scheduler: &CycleScheduler,
    rhythm: &RhythmDefinition,
    count: usize,
    seed: u64,
) -> Vec<CycleState> {
    let mut rng = SeededRandom::from_seed(seed);
    let mut state = scheduler.initial_state(rhythm, 0.0);
    let mut out = Vec::with_capacity(count);
    let mut now = 0.0;
    while out.len() < count {
        now += TICK;
        if scheduler.update(&mut state, rhythm, now, &mut rng) {
            out.push(state.clone());
        }
    }
    out
}

fn monitor_for(catalog: RhythmCatalog, rhythm: &str, seed: u64) -> Monitor {
    let settings = Settings {
        default_rhythm: rhythm.to_string(),
        visible_width: 200,
        seed: Some(seed),
        ..Default::default()
    };
    Monitor::new(catalog, settings)
}

fn run(monitor: &mut Monitor, ticks: usize) -> Vec<ScrollSample> {
    (0..ticks).filter_map(|_| monitor.tick()).collect()
}

/// Groups samples by beat index, dropping the trailing (incomplete) beat.
fn complete_beats(samples: &[ScrollSample]) -> Vec<Vec<ScrollSample>> {
    let mut beats: Vec<Vec<ScrollSample>> = Vec::new();
    for sample in samples {
        let same_beat = beats
            .last()
            .is_some_and(|beat| beat[0].metadata.beat_index == sample.metadata.beat_index);
        if same_beat {
            if let Some(beat) = beats.last_mut() {
                beat.push(*sample);
            }
        } else {
            beats.push(vec![*sample]);
        }
    }
    beats.pop();
    beats
}

fn phase_sequence(beat: &[ScrollSample]) -> Vec<Phase> {
    let mut phases: Vec<Phase> = Vec::new();
    for sample in beat {
        if phases.last() != Some(&sample.phase) {
            phases.push(sample.phase);
        }
    }
    phases
}

#[test]
fn regular_rhythms_stay_within_jitter() {
    let catalog = RhythmCatalog::new();
    let scheduler = CycleScheduler::default();

    let plain = catalog.iter().filter(|r| {
        r.regular
            && !r.premature_capable
            && r.block_type == BlockType::None
            && !r.is_chaotic()
            && !r.flutter_baseline
    });

    let mut checked = 0;
    for rhythm in plain {
        let base = rhythm.base_interval_secs();
        for state in cycles(&scheduler, &rhythm, 100, 17) {
            assert!(
                state.cycle_duration >= base * (1.0 - rhythm.jitter) - 1e-9
                    && state.cycle_duration <= base * (1.0 + rhythm.jitter) + 1e-9,
                "{} duration {} outside jitter around {}",
                rhythm.id,
                state.cycle_duration,
                base
            );
        }
        checked += 1;
    }
    assert!(checked >= 5);
}

#[test]
fn wenckebach_cycles_through_steps() {
    let catalog = RhythmCatalog::new();
    let rhythm = catalog.lookup("AVB2T1");
    let states = cycles(&CycleScheduler::default(), &rhythm, 40, 3);

    for window in states.windows(4) {
        let mut steps: Vec<u8> = window.iter().map(|s| s.wenckebach_step).collect();
        let zero_idx = steps.iter().position(|&s| s == 0).unwrap();
        steps.rotate_left(zero_idx);
        assert_eq!(steps, vec![0, 1, 2, 3]);
    }
    for state in &states {
        assert_eq!(state.mobitz_dropped, state.wenckebach_step == 3);
    }

    let pr_by_step: Vec<f64> = (0..3)
        .map(|step| {
            let state = states.iter().find(|s| s.wenckebach_step == step).unwrap();
            pr_offset(&rhythm, state)
        })
        .collect();
    assert!(pr_by_step.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn wenckebach_suppresses_qrs_only_on_dropped_beats() {
    let mut monitor = monitor_for(RhythmCatalog::new(), "AVB2T1", 8);
    let samples = run(&mut monitor, 6000);
    let beats = complete_beats(&samples);
    assert!(beats.len() > 20);

    for beat in beats {
        let meta = beat[0].metadata;
        let has_qrs = beat.iter().any(|s| s.phase == Phase::Qrs);
        let has_p = beat.iter().any(|s| s.phase == Phase::PWave);
        assert!(has_p, "beat {} lost its P wave", meta.beat_index);
        assert_eq!(has_qrs, meta.wenckebach_step != 3);
        assert_eq!(meta.dropped, meta.wenckebach_step == 3);
    }
}

#[test]
fn mobitz_two_drop_rate_without_pr_change() {
    let catalog = RhythmCatalog::new();
    let rhythm = catalog.lookup("AVB2T2");
    let scheduler = CycleScheduler::default();
    let states = cycles(&scheduler, &rhythm, 2000, 21);

    let dropped = states.iter().filter(|s| s.mobitz_dropped).count();
    let fraction = dropped as f64 / states.len() as f64;
    let expected = scheduler.tuning.mobitz_drop_probability;
    assert!(
        (fraction - expected).abs() < 0.05,
        "drop fraction {} too far from {}",
        fraction,
        expected
    );

    let baseline = pr_offset(&rhythm, &states[0]);
    for state in &states {
        assert_eq!(pr_offset(&rhythm, state), baseline);
    }
}

#[test]
fn bigeminy_single_alternates() {
    let catalog = RhythmCatalog::new();
    let rhythm = catalog.lookup("PVC_MONO");
    let scheduler = CycleScheduler::default()
        .with_pattern(PrematurePattern::Bigeminy, PrematureGroup::Single);

    for state in cycles(&scheduler, &rhythm, 60, 5) {
        assert_eq!(state.is_premature_beat, state.beat_index % 2 == 1);
    }
}

#[test]
fn trigeminy_couplets() {
    let catalog = RhythmCatalog::new();
    let rhythm = catalog.lookup("PAC_MID");
    let scheduler = CycleScheduler::default()
        .with_pattern(PrematurePattern::Trigeminy, PrematureGroup::Couplet);
    let states = cycles(&scheduler, &rhythm, 60, 5);

    let mut triggers = 0;
    for window in states.windows(3) {
        if window[0].is_premature_beat && window[0].beat_index % 3 == 2 {
            triggers += 1;
            assert!(window[1].is_premature_beat);
            assert!(!window[2].is_premature_beat);
        }
    }
    assert!(triggers >= 15);
}

fn longest_qrs_run(beat: &[ScrollSample]) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for sample in beat {
        if sample.phase == Phase::Qrs {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[test]
fn sinus_pauses_keep_normal_qrs_width() {
    let mut monitor = monitor_for(RhythmCatalog::new(), "SSS", 5);
    let beats = complete_beats(&run(&mut monitor, 20_000));

    let (paused, normal): (Vec<_>, Vec<_>) =
        beats.iter().partition(|beat| beat[0].metadata.sinus_pause);
    assert!(!paused.is_empty());
    let normal_qrs = normal.iter().map(|beat| longest_qrs_run(beat)).max().unwrap_or(0);
    assert!(normal_qrs > 0);

    for beat in paused {
        let qrs = longest_qrs_run(beat);
        assert!(qrs > 0);
        assert!(
            (qrs as f64) < normal_qrs as f64 * 1.5,
            "paused beat {} has {} QRS samples, normal {}",
            beat[0].metadata.beat_index,
            qrs,
            normal_qrs
        );
        // The pause is flat baseline ahead of the beat.
        let pause_samples = (2.0 / TICK) as usize - 2;
        assert!(beat[..pause_samples].iter().all(|s| s.phase == Phase::Rest));
    }
}

#[test]
fn compensatory_pauses_keep_normal_qrs_width() {
    let settings = Settings {
        default_rhythm: "PVC_MONO".to_string(),
        visible_width: 200,
        seed: Some(9),
        premature_pattern: PrematurePattern::Bigeminy,
        premature_group: PrematureGroup::Single,
        ..Default::default()
    };
    let mut monitor = Monitor::new(RhythmCatalog::new(), settings);
    let beats = complete_beats(&run(&mut monitor, 10_000));

    // Beat 0 precedes any ectopic run and has no compensation.
    let uncompensated = longest_qrs_run(&beats[0]);
    assert!(uncompensated > 0);
    let compensated: Vec<_> = beats
        .iter()
        .skip(1)
        .filter(|beat| !beat[0].metadata.premature)
        .collect();
    assert!(compensated.len() >= 5);
    for beat in compensated {
        let qrs = longest_qrs_run(beat);
        assert!((qrs as f64) < uncompensated as f64 * 1.5);
        assert!(qrs as f64 > uncompensated as f64 * 0.67);
        assert_eq!(beat[0].phase, Phase::Rest);
    }
}

#[test]
fn flutter_beats_conduct_exactly_once() {
    let mut monitor = monitor_for(RhythmCatalog::new(), "AFLUT", 3);
    let beats = complete_beats(&run(&mut monitor, 5_000));
    assert!(beats.len() >= 5);
    for beat in &beats {
        let onsets = phase_sequence(beat)
            .iter()
            .filter(|&&phase| phase == Phase::Qrs)
            .count();
        assert_eq!(onsets, 1, "flutter beat {}", beat[0].metadata.beat_index);
    }
}

#[test]
fn conducted_beats_follow_phase_order() {
    let expected = vec![
        Phase::Rest,
        Phase::PWave,
        Phase::PrSegment,
        Phase::Qrs,
        Phase::StSegment,
        Phase::TWave,
        Phase::Rest,
    ];
    for id in ["NSR", "SB", "LBBB", "RBBB", "AVB1", "WPW", "LAH", "RAH"] {
        let mut monitor = monitor_for(RhythmCatalog::new(), id, 4);
        let samples = run(&mut monitor, 3000);
        let beats = complete_beats(&samples);
        assert!(beats.len() > 3, "{} produced too few beats", id);
        for beat in beats {
            assert_eq!(phase_sequence(&beat), expected, "{}", id);
        }
    }
}

#[test]
fn narrow_qrs_at_seventy_bpm() {
    let mut catalog = RhythmCatalog::new();
    catalog.insert(RhythmDefinition {
        id: "NARROW70".to_string(),
        rate_bpm: 70.0,
        jitter: 0.0,
        ..Default::default()
    });
    let settings = Settings {
        default_rhythm: "NARROW70".to_string(),
        paper_speed: PaperSpeed::Mm100,
        seed: Some(1),
        ..Default::default()
    };
    let mut monitor = Monitor::new(catalog, settings);
    assert!((monitor.state().cycle_duration - 60.0 / 70.0).abs() < 1e-9);

    let step = PaperSpeed::Mm100.time_increment() / (60.0 / 70.0);
    let mut previous = Phase::Rest;
    let mut entered = None;
    let mut exited = None;
    for _ in 0..200 {
        let Some(sample) = monitor.tick() else { break };
        let state = monitor.state();
        let progress = (sample.time - state.cycle_start_time) / state.cycle_duration;
        if sample.phase == Phase::Qrs && previous != Phase::Qrs && entered.is_none() {
            entered = Some(progress);
        }
        if previous == Phase::Qrs && sample.phase != Phase::Qrs && exited.is_none() {
            exited = Some(progress);
        }
        previous = sample.phase;
    }

    let entered = entered.expect("QRS never entered");
    let exited = exited.expect("QRS never exited");
    assert!(entered >= 0.27 && entered < 0.27 + step + 1e-9, "{}", entered);
    assert!(exited >= 0.43 && exited < 0.43 + step + 1e-9, "{}", exited);
}

#[test]
fn complete_block_atrial_clock_is_independent() {
    let mut catalog = RhythmCatalog::new();
    let mut avb3 = (*catalog.lookup("AVB3")).clone();
    avb3.id = "AVB3_VARIABLE".to_string();
    avb3.jitter = 0.1;
    let atrial_period = avb3.atrial_interval_secs();
    catalog.insert(avb3);

    let mut monitor = monitor_for(catalog, "AVB3_VARIABLE", 6);
    let mut durations = Vec::new();
    for _ in 0..5000 {
        let Some(sample) = monitor.tick() else { break };
        let state = monitor.state();
        assert_eq!(state.atrial_timer.period, atrial_period);

        let atrial = sample.metadata.atrial_progress.expect("atrial progress");
        let expected = state.atrial_timer.progress(sample.time);
        assert!((atrial - expected).abs() < 1e-12);

        if durations.last() != Some(&state.cycle_duration) {
            durations.push(state.cycle_duration);
        }
    }
    assert!(durations.len() > 3);
    assert!(durations.iter().all(|d| (d - atrial_period).abs() > 1e-6));
}

#[test]
fn reselecting_reproduces_the_strip() {
    for id in ["PVC_POLY", "AVB2T2", "SSS", "AFIB", "VFIB"] {
        let mut monitor = monitor_for(RhythmCatalog::new(), id, 99);
        monitor.set_premature_pattern(PrematurePattern::Random);
        monitor.set_premature_group(PrematureGroup::Triplet);
        let first = run(&mut monitor, 2500);

        monitor.select_rhythm(id);
        let second = run(&mut monitor, 2500);
        assert_eq!(first, second, "{} diverged after reset", id);
    }
}

#[test]
fn phase_reading_underflows_to_rest() {
    let mut monitor = monitor_for(RhythmCatalog::new(), "VT", 2);
    for _ in 0..100 {
        monitor.tick();
        assert_eq!(monitor.current_phase(), PhaseReading::default());
    }
    monitor.tick();
    assert_eq!(monitor.current_phase().metadata.beat_index, 0);
}

#[test]
fn switching_rhythm_leaves_no_old_samples() {
    let mut monitor = monitor_for(RhythmCatalog::new(), "VFIB", 3);
    run(&mut monitor, 500);
    monitor.select_rhythm("SB");
    let fresh = run(&mut monitor, 10);

    let retained: Vec<ScrollSample> = monitor.buffer().samples().copied().collect();
    assert_eq!(retained, fresh);
    assert!(retained.iter().all(|s| s.time <= 10.0 * 0.004 + 1e-9));
}

#[test]
fn injected_random_source_drives_noise() {
    struct Constant(f64);
    impl RandomSource for Constant {
        fn next_unit(&mut self) -> f64 {
            self.0
        }
    }

    let mut monitor = monitor_for(RhythmCatalog::new(), "VFIB", 1);
    monitor.set_random_source(Box::new(Constant(0.5)));
    let a = run(&mut monitor, 50);

    let mut other = monitor_for(RhythmCatalog::new(), "VFIB", 1);
    other.set_random_source(Box::new(Constant(0.5)));
    let b = run(&mut other, 50);
    assert_eq!(a, b);
    assert!(a.iter().all(|s| s.phase == Phase::Rest));
}
