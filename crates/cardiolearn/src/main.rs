use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use cardiolearn_core::{
    ConfigManager, Monitor, PaperSpeed, PrematureGroup, PrematurePattern, ScrollSpeed, Settings,
};
use cardiolearn_rhythms::RhythmCatalog;
use clap::Parser;
use tokio::time::MissedTickBehavior;

use crate::export::{ExportFormat, StripExport};

mod export;

/// Synthetic ECG rhythm strips for study and teaching.
#[derive(Parser, Debug)]
#[command(name = "cardiolearn")]
#[command(about = "Run the ECG strip monitor headless and export the visible strip")]
struct Args {
    /// Rhythm id from the catalog (see --list)
    #[arg(short, long)]
    rhythm: Option<String>,

    /// Paper speed in mm/s (25, 50 or 100)
    #[arg(long)]
    paper_speed: Option<u32>,

    /// Scroll speed (slow or fast)
    #[arg(long)]
    scroll_speed: Option<String>,

    /// Premature pattern (random, bigeminy, trigeminy, quadrigeminy)
    #[arg(long)]
    pattern: Option<String>,

    /// Premature grouping (single, couplet, triplet, quadruplet)
    #[arg(long)]
    group: Option<String>,

    /// Seed for a reproducible strip
    #[arg(long)]
    seed: Option<u64>,

    /// Display refresh rate driving the monitor
    #[arg(long)]
    fps: Option<u32>,

    /// Wall-clock seconds to run when pacing frames
    #[arg(short, long, default_value = "10")]
    duration: f64,

    /// Run this many frames as fast as possible instead of pacing
    #[arg(long)]
    frames: Option<u64>,

    /// Output format
    #[arg(long, value_enum, default_value = "json")]
    format: ExportFormat,

    /// Write the strip to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Settings file; created with defaults when missing
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the rhythm catalog and exit
    #[arg(long, default_value = "false")]
    list: bool,
}

fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let catalog = RhythmCatalog::new();

    if args.list {
        print_catalog(&catalog)?;
        return Ok(());
    }

    let settings = resolve_settings(&args)?;
    log::info!(
        "Paper {} / {} scroll at {} fps",
        settings.paper_speed,
        settings.scroll_speed.as_str(),
        settings.target_fps
    );

    let mut monitor = Monitor::new(catalog, settings);
    if let Some(rhythm) = &args.rhythm {
        monitor.select_rhythm(rhythm);
    }

    let frames = match args.frames {
        Some(frames) => run_headless(&mut monitor, frames),
        None => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to start frame timer")?;
            let fps = monitor.settings().target_fps.max(1);
            let duration = Duration::from_secs_f64(args.duration.max(0.0));
            runtime.block_on(run_paced(&mut monitor, fps, duration))
        }
    };

    log::info!(
        "Ran {} frames, {:.2}s simulated, {} samples on strip",
        frames,
        monitor.time(),
        monitor.buffer().len()
    );

    let strip = StripExport::capture(&monitor, frames);
    match &args.output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            strip.write(args.format, &mut BufWriter::new(file))?;
            log::info!("Strip written to {}", path.display());
        }
        None => strip.write(args.format, &mut io::stdout().lock())?,
    }

    Ok(())
}

/// Config file values first, then command-line overrides.
fn resolve_settings(args: &Args) -> anyhow::Result<Settings> {
    let mut settings = match &args.config {
        Some(path) => {
            let mut manager = ConfigManager::new(Some(path.clone()));
            manager
                .load()
                .with_context(|| format!("Failed to load settings from {}", path.display()))?
        }
        None => Settings::default(),
    };

    if let Some(speed) = args.paper_speed {
        settings.paper_speed = PaperSpeed::from(speed);
    }
    if let Some(speed) = &args.scroll_speed {
        settings.scroll_speed = ScrollSpeed::parse(speed);
    }
    if let Some(pattern) = &args.pattern {
        settings.premature_pattern = PrematurePattern::parse(pattern);
    }
    if let Some(group) = &args.group {
        settings.premature_group = PrematureGroup::parse(group);
    }
    if let Some(seed) = args.seed {
        settings.seed = Some(seed);
    }
    if let Some(fps) = args.fps {
        settings.target_fps = fps;
    }

    if let Err(errors) = ConfigManager::validate_settings(&settings) {
        for error in &errors {
            log::warn!("{}", error);
        }
        settings = ConfigManager::sanitize(settings);
    }

    Ok(settings)
}

fn run_headless(monitor: &mut Monitor, frames: u64) -> u64 {
    for _ in 0..frames {
        monitor.on_frame();
    }
    frames
}

/// Drives `on_frame` at `fps` until `duration` elapses or Ctrl-C.
async fn run_paced(monitor: &mut Monitor, fps: u32, duration: Duration) -> u64 {
    let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(fps)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    let mut frames = 0;
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, exporting strip");
                break;
            }
            _ = interval.tick() => {
                monitor.on_frame();
                frames += 1;
            }
        }
    }
    frames
}

fn print_catalog(catalog: &RhythmCatalog) -> io::Result<()> {
    let mut out = io::stdout().lock();
    for rhythm in catalog.iter() {
        writeln!(
            out,
            "{:<10} {:<40} {}",
            rhythm.id, rhythm.info.name, rhythm.info.rate_label
        )?;
    }
    Ok(())
}
