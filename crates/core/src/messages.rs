use std::fmt;

use cardiolearn_rhythms::DEFAULT_RHYTHM_ID;
use serde::{Deserialize, Serialize};

use crate::cycle::{PrematureGroup, PrematurePattern};
use crate::strip::{PhaseReading, ScrollSample};

/// Commands sent from a driver to the monitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorCommand {
    // Playback
    Pause,
    Resume,
    TogglePause,
    Reset,

    // Rhythm and pattern controls (each resets the strip)
    SelectRhythm { id: String },
    SetPrematurePattern { pattern: PrematurePattern },
    SetPrematureGroup { group: PrematureGroup },

    // Display controls
    SetPaperSpeed { speed: PaperSpeed },
    SetScrollSpeed { speed: ScrollSpeed },
    UpdateSettings { settings: Settings },

    // Queries
    QueryPhase,
    QueryLatestSample,
    QuerySettings,
}

/// Events emitted by the monitor in response to commands
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    RhythmSelected { id: String },
    PauseChanged { paused: bool },
    StripReset { rhythm_id: String },
    SettingsUpdated { settings: Settings },
    PhaseState { reading: PhaseReading },
    LatestSample { sample: Option<ScrollSample> },
}

/// Simulated-time increment per processed tick, in mm/s of paper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum PaperSpeed {
    #[default]
    Mm25,
    Mm50,
    Mm100,
}

impl PaperSpeed {
    pub const ALL: [PaperSpeed; 3] = [PaperSpeed::Mm25, PaperSpeed::Mm50, PaperSpeed::Mm100];

    pub fn mm_per_sec(&self) -> u32 {
        match self {
            PaperSpeed::Mm25 => 25,
            PaperSpeed::Mm50 => 50,
            PaperSpeed::Mm100 => 100,
        }
    }

    /// Simulated seconds added per tick.
    pub fn time_increment(&self) -> f64 {
        match self {
            PaperSpeed::Mm25 => 0.004,
            PaperSpeed::Mm50 => 0.008,
            PaperSpeed::Mm100 => 0.016,
        }
    }
}

impl From<u32> for PaperSpeed {
    fn from(value: u32) -> Self {
        match value {
            25 => PaperSpeed::Mm25,
            50 => PaperSpeed::Mm50,
            100 => PaperSpeed::Mm100,
            other => {
                log::warn!("Unsupported paper speed {} mm/s, using 25", other);
                PaperSpeed::Mm25
            }
        }
    }
}

impl From<PaperSpeed> for u32 {
    fn from(value: PaperSpeed) -> Self {
        value.mm_per_sec()
    }
}

impl fmt::Display for PaperSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} mm/s", self.mm_per_sec())
    }
}

/// Display refreshes consumed per processed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScrollSpeed {
    #[default]
    Slow,
    Fast,
}

impl ScrollSpeed {
    pub fn frames_per_tick(&self) -> u32 {
        match self {
            ScrollSpeed::Slow => 2,
            ScrollSpeed::Fast => 1,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "slow" => ScrollSpeed::Slow,
            "fast" => ScrollSpeed::Fast,
            other => {
                log::warn!("Unknown scroll speed '{}', using slow", other);
                ScrollSpeed::Slow
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScrollSpeed::Slow => "slow",
            ScrollSpeed::Fast => "fast",
        }
    }
}

impl From<String> for ScrollSpeed {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<ScrollSpeed> for String {
    fn from(value: ScrollSpeed) -> Self {
        value.as_str().to_string()
    }
}

/// Settings configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    // Display settings
    pub paper_speed: PaperSpeed,
    pub scroll_speed: ScrollSpeed,
    pub target_fps: u32,
    /// Samples visible across the strip.
    pub visible_width: usize,

    // Scheduling settings
    pub premature_pattern: PrematurePattern,
    pub premature_group: PrematureGroup,
    pub heart_rate_variability: bool,
    /// Fixed seed for reproducible strips; entropy from the OS when unset.
    pub seed: Option<u64>,
    pub default_rhythm: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Display defaults
            paper_speed: PaperSpeed::Mm25,
            scroll_speed: ScrollSpeed::Slow,
            target_fps: 60,
            visible_width: 800,

            // Scheduling defaults
            premature_pattern: PrematurePattern::Random,
            premature_group: PrematureGroup::Single,
            heart_rate_variability: true,
            seed: None,
            default_rhythm: DEFAULT_RHYTHM_ID.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_speed_increments() {
        assert_eq!(PaperSpeed::Mm25.time_increment(), 0.004);
        assert_eq!(PaperSpeed::Mm50.time_increment(), 0.008);
        assert_eq!(PaperSpeed::Mm100.time_increment(), 0.016);
        assert_eq!(PaperSpeed::from(37), PaperSpeed::Mm25);
        assert_eq!(ScrollSpeed::Slow.frames_per_tick(), 2);
        assert_eq!(ScrollSpeed::Fast.frames_per_tick(), 1);
    }

    #[test]
    fn test_settings_lossy_deserialize() {
        let json = r#"{
            "paper_speed": 100,
            "scroll_speed": "warp",
            "premature_pattern": "bigeminy",
            "premature_group": "nonet",
            "seed": 12
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.paper_speed, PaperSpeed::Mm100);
        assert_eq!(settings.scroll_speed, ScrollSpeed::Slow);
        assert_eq!(settings.premature_pattern, PrematurePattern::Bigeminy);
        assert_eq!(settings.premature_group, PrematureGroup::Single);
        assert_eq!(settings.seed, Some(12));
        assert_eq!(settings.target_fps, 60);
        assert_eq!(settings.default_rhythm, "NSR");
    }

    #[test]
    fn test_settings_serialize_names() {
        let value = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(value["paper_speed"], 25);
        assert_eq!(value["scroll_speed"], "slow");
        assert_eq!(value["premature_pattern"], "random");
        assert_eq!(value["premature_group"], "single");
    }
}
