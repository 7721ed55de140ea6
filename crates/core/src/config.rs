use std::fs;
use std::path::{Path, PathBuf};

use cardiolearn_rhythms::{RhythmCatalog, DEFAULT_RHYTHM_ID};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cycle::{PrematureGroup, PrematurePattern};
use crate::messages::{PaperSpeed, ScrollSpeed, Settings};

/// Configuration manager for monitor settings
/// Separates the schema of available options from the persisted values. Settings are stored in
/// cardiolearn.json in the working directory by default
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
    created_at: Option<String>,
}

/// Available configuration options with validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub display: DisplayConfigSchema,
    pub scheduling: SchedulingConfigSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfigSchema {
    pub paper_speed: ConfigOption<u32>,
    pub scroll_speed: ConfigOption<String>,
    pub target_fps: ConfigOption<u32>,
    pub visible_width: ConfigOption<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingConfigSchema {
    pub premature_pattern: ConfigOption<String>,
    pub premature_group: ConfigOption<String>,
    pub heart_rate_variability: ConfigOption<bool>,
    pub default_rhythm: ConfigOption<String>,
}

/// Configuration option with validation and available choices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigOption<T> {
    pub default: T,
    pub valid_range: Option<(T, T)>,
    pub valid_choices: Option<Vec<T>>,
    pub description: String,
    pub requires_restart: bool,
}

impl<T: PartialOrd> ConfigOption<T> {
    fn in_range(&self, value: &T) -> bool {
        match &self.valid_range {
            Some((min, max)) => value >= min && value <= max,
            None => true,
        }
    }
}

/// Persisted configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    pub settings: Settings,
    pub created_at: String,
    pub modified_at: String,
}

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("Config validation errors: {}", .0.join(", "))]
    Validation(Vec<String>),
}

impl ConfigManager {
    /// Create a new configuration manager
    /// If no path is provided, defaults to 'cardiolearn.json' in the current working directory
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self {
            config_path: config_path.unwrap_or_else(|| PathBuf::from("cardiolearn.json")),
            settings: Settings::default(),
            created_at: None,
        }
    }

    /// Load settings from the configuration file, creating it with defaults when missing.
    /// Out-of-range values are logged and replaced so the monitor can always start.
    pub fn load(&mut self) -> Result<Settings, ConfigError> {
        if !self.config_path.exists() {
            log::info!(
                "No config at {}, writing defaults",
                self.config_path.display()
            );
            self.save()?;
            return Ok(self.settings.clone());
        }

        let content = fs::read_to_string(&self.config_path).map_err(|source| ConfigError::Read {
            path: self.config_path.clone(),
            source,
        })?;
        let config_file: ConfigFile = serde_json::from_str(&content).map_err(ConfigError::Parse)?;

        if config_file.version != env!("CARGO_PKG_VERSION") {
            log::warn!(
                "Config file version {} doesn't match application version {}. Using defaults for new settings.",
                config_file.version,
                env!("CARGO_PKG_VERSION")
            );
        }

        let mut settings = config_file.settings;
        if let Err(errors) = Self::validate_settings(&settings) {
            for error in &errors {
                log::warn!("Invalid setting in {}: {}", self.config_path.display(), error);
            }
            settings = Self::sanitize(settings);
        }

        self.created_at = Some(config_file.created_at);
        self.settings = settings;
        Ok(self.settings.clone())
    }

    /// Save current settings to configuration file
    pub fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if parent != Path::new("") && parent != Path::new(".") {
                fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let now = chrono::Utc::now().to_rfc3339();
        let config_file = ConfigFile {
            version: env!("CARGO_PKG_VERSION").to_string(),
            settings: self.settings.clone(),
            created_at: self.created_at.clone().unwrap_or_else(|| now.clone()),
            modified_at: now,
        };

        let content =
            serde_json::to_string_pretty(&config_file).map_err(ConfigError::Serialize)?;

        fs::write(&self.config_path, content).map_err(|source| ConfigError::Write {
            path: self.config_path.clone(),
            source,
        })
    }

    /// Validate, store and save settings
    pub fn update_settings(&mut self, settings: Settings) -> Result<(), ConfigError> {
        Self::validate_settings(&settings).map_err(ConfigError::Validation)?;
        self.settings = settings;
        self.save()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Get configuration schema with available options
    pub fn schema() -> ConfigSchema {
        let defaults = Settings::default();
        ConfigSchema {
            display: DisplayConfigSchema {
                paper_speed: ConfigOption {
                    default: defaults.paper_speed.mm_per_sec(),
                    valid_range: None,
                    valid_choices: Some(PaperSpeed::ALL.iter().map(|s| s.mm_per_sec()).collect()),
                    description: "Paper speed in mm/s; sets simulated time per sample".to_string(),
                    requires_restart: false,
                },
                scroll_speed: ConfigOption {
                    default: defaults.scroll_speed.as_str().to_string(),
                    valid_range: None,
                    valid_choices: Some(vec![
                        ScrollSpeed::Slow.as_str().to_string(),
                        ScrollSpeed::Fast.as_str().to_string(),
                    ]),
                    description: "Display refreshes consumed per strip sample".to_string(),
                    requires_restart: false,
                },
                target_fps: ConfigOption {
                    default: defaults.target_fps,
                    valid_range: Some((30, 120)),
                    valid_choices: None,
                    description: "Display refresh rate in frames per second".to_string(),
                    requires_restart: false,
                },
                visible_width: ConfigOption {
                    default: defaults.visible_width,
                    valid_range: Some((100, 4000)),
                    valid_choices: None,
                    description: "Samples visible across the strip".to_string(),
                    requires_restart: false,
                },
            },
            scheduling: SchedulingConfigSchema {
                premature_pattern: ConfigOption {
                    default: defaults.premature_pattern.as_str().to_string(),
                    valid_range: None,
                    valid_choices: Some(
                        PrematurePattern::ALL
                            .iter()
                            .map(|p| p.as_str().to_string())
                            .collect(),
                    ),
                    description: "Which beats are premature on ectopic rhythms".to_string(),
                    requires_restart: false,
                },
                premature_group: ConfigOption {
                    default: defaults.premature_group.as_str().to_string(),
                    valid_range: None,
                    valid_choices: Some(
                        PrematureGroup::ALL
                            .iter()
                            .map(|g| g.as_str().to_string())
                            .collect(),
                    ),
                    description: "Consecutive ectopic beats per premature run".to_string(),
                    requires_restart: false,
                },
                heart_rate_variability: ConfigOption {
                    default: defaults.heart_rate_variability,
                    valid_range: None,
                    valid_choices: None,
                    description: "Vary beat-to-beat intervals within each rhythm's jitter"
                        .to_string(),
                    requires_restart: false,
                },
                default_rhythm: ConfigOption {
                    default: defaults.default_rhythm.clone(),
                    valid_range: None,
                    valid_choices: Some(RhythmCatalog::new().ids().to_vec()),
                    description: "Rhythm shown at startup".to_string(),
                    requires_restart: false,
                },
            },
        }
    }

    /// Validate settings against schema
    pub fn validate_settings(settings: &Settings) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let schema = Self::schema();

        if !schema.display.target_fps.in_range(&settings.target_fps) {
            if let Some((min, max)) = schema.display.target_fps.valid_range {
                errors.push(format!("target_fps must be between {} and {}", min, max));
            }
        }

        if !schema.display.visible_width.in_range(&settings.visible_width) {
            if let Some((min, max)) = schema.display.visible_width.valid_range {
                errors.push(format!("visible_width must be between {} and {}", min, max));
            }
        }

        // Catalog lookups ignore case, so validation does too.
        if !RhythmCatalog::new().contains(&settings.default_rhythm) {
            errors.push(format!(
                "default_rhythm '{}' is not in the catalog",
                settings.default_rhythm
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Clamp numeric settings into range and replace an unknown default rhythm.
    pub fn sanitize(mut settings: Settings) -> Settings {
        let schema = Self::schema();
        if let Some((min, max)) = schema.display.target_fps.valid_range {
            settings.target_fps = settings.target_fps.clamp(min, max);
        }
        if let Some((min, max)) = schema.display.visible_width.valid_range {
            settings.visible_width = settings.visible_width.clamp(min, max);
        }
        if !RhythmCatalog::new().contains(&settings.default_rhythm) {
            settings.default_rhythm = DEFAULT_RHYTHM_ID.to_string();
        }
        settings
    }

    /// Reset settings to defaults
    pub fn reset_to_defaults(&mut self) -> Result<(), ConfigError> {
        self.settings = Settings::default();
        self.save()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_config_manager_new() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let manager = ConfigManager::new(Some(config_path.clone()));
        assert_eq!(manager.config_path(), config_path);
        assert_eq!(manager.settings(), &Settings::default());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        let settings = manager.load().unwrap();
        assert_eq!(settings, Settings::default());
        assert!(config_path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));

        let settings = Settings {
            paper_speed: PaperSpeed::Mm50,
            premature_pattern: PrematurePattern::Trigeminy,
            premature_group: PrematureGroup::Couplet,
            seed: Some(99),
            default_rhythm: "PVC_MONO".to_string(),
            ..Default::default()
        };
        manager.update_settings(settings.clone()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path));
        let loaded_settings = manager2.load().unwrap();
        assert_eq!(loaded_settings, settings);
    }

    #[test]
    fn test_created_at_survives_resave() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");

        let mut manager = ConfigManager::new(Some(config_path.clone()));
        manager.load().unwrap();
        let first: ConfigFile =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();

        let mut manager2 = ConfigManager::new(Some(config_path.clone()));
        manager2.load().unwrap();
        manager2.reset_to_defaults().unwrap();
        let second: ConfigFile =
            serde_json::from_str(&fs::read_to_string(&config_path).unwrap()).unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert!(chrono::DateTime::parse_from_rfc3339(&second.modified_at).is_ok());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.default_rhythm = "nsr".to_string();
        assert!(ConfigManager::validate_settings(&settings).is_ok());

        settings.target_fps = 200;
        assert!(ConfigManager::validate_settings(&settings).is_err());

        settings.target_fps = 60;
        settings.default_rhythm = "TORSADES".to_string();
        let errors = ConfigManager::validate_settings(&settings).unwrap_err();
        assert_eq!(errors.len(), 1);

        let mut manager = ConfigManager::new(None);
        assert!(matches!(
            manager.update_settings(settings),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_file_values_are_sanitized() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.json");
        let content = r#"{
            "version": "0.0.1",
            "settings": { "target_fps": 500, "visible_width": 10, "default_rhythm": "XYZ" },
            "created_at": "2024-01-01T00:00:00+00:00",
            "modified_at": "2024-01-01T00:00:00+00:00"
        }"#;
        fs::write(&config_path, content).unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        let settings = manager.load().unwrap();
        assert_eq!(settings.target_fps, 120);
        assert_eq!(settings.visible_width, 100);
        assert_eq!(settings.default_rhythm, "NSR");
    }

    #[test]
    fn test_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("broken.json");
        fs::write(&config_path, "{ not json").unwrap();

        let mut manager = ConfigManager::new(Some(config_path));
        assert!(matches!(manager.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_schema_completeness() {
        let schema = ConfigManager::schema();
        assert_eq!(schema.display.paper_speed.valid_choices, Some(vec![25, 50, 100]));
        assert!(schema.display.target_fps.valid_range.is_some());
        assert_eq!(
            schema.scheduling.default_rhythm.valid_choices.map(|c| c.len()),
            Some(22)
        );
        assert!(!schema.scheduling.premature_group.description.is_empty());
    }
}
