use std::io::Write;

use anyhow::Context;
use cardiolearn_core::{Monitor, PhaseReading, ScrollSample, Settings};
use serde::Serialize;

#[derive(clap::ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExportFormat {
    #[default]
    Json,
    Csv,
}

/// Snapshot of the visible strip at the end of a run
#[derive(Debug, Serialize)]
pub struct StripExport {
    pub rhythm_id: String,
    pub rhythm_name: String,
    pub settings: Settings,
    pub simulated_seconds: f64,
    pub frames: u64,
    pub current_phase: PhaseReading,
    pub samples: Vec<ScrollSample>,
}

impl StripExport {
    pub fn capture(monitor: &Monitor, frames: u64) -> Self {
        let rhythm = monitor.rhythm();
        Self {
            rhythm_id: rhythm.id.clone(),
            rhythm_name: rhythm.info.name.clone(),
            settings: monitor.settings().clone(),
            simulated_seconds: monitor.time(),
            frames,
            current_phase: monitor.current_phase(),
            samples: monitor.buffer().visible().copied().collect(),
        }
    }

    pub fn write(&self, format: ExportFormat, out: &mut dyn Write) -> anyhow::Result<()> {
        match format {
            ExportFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, self)
                    .context("Failed to serialize strip")?;
                writeln!(out)?;
            }
            ExportFormat::Csv => self.write_csv(out)?,
        }
        out.flush().context("Failed to flush strip output")
    }

    fn write_csv(&self, out: &mut dyn Write) -> anyhow::Result<()> {
        writeln!(
            out,
            "time,amplitude,phase,premature,dropped,wenckebach_step,atrial_progress,sinus_pause,beat_index"
        )?;
        for sample in &self.samples {
            let meta = &sample.metadata;
            let atrial = meta
                .atrial_progress
                .map(|p| format!("{:.4}", p))
                .unwrap_or_default();
            writeln!(
                out,
                "{:.4},{:.3},{},{},{},{},{},{},{}",
                sample.time,
                sample.amplitude,
                sample.phase,
                meta.premature,
                meta.dropped,
                meta.wenckebach_step,
                atrial,
                meta.sinus_pause,
                meta.beat_index
            )?;
        }
        Ok(())
    }
}
