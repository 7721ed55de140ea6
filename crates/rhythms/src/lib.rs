use serde::{Deserialize, Serialize};

pub use rhythm_catalog::{RhythmCatalog, DEFAULT_RHYTHM_ID};

mod rhythm_catalog;

/// Builds a [`RhythmInfo`] from `field: "text"` pairs.
#[macro_export]
macro_rules! rhythm_info {
    ($($field:ident: $value:expr),* $(,)?) => {
        $crate::RhythmInfo {
            $($field: $value.to_string(),)*
        }
    };
}

/// Atrioventricular conduction disturbance driving the cycle scheduler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    None,
    /// Mobitz I: PR lengthens over three beats, the fourth QRS is dropped.
    Wenckebach,
    /// Mobitz II: QRS dropped at random without PR change.
    Mobitz2,
    /// Third degree: atria and ventricles run on independent clocks.
    Complete,
    /// Sinus node dysfunction with occasional long pauses.
    SickSinus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PMorphology {
    #[default]
    Normal,
    /// P mitrale, notched "M" shape.
    Bifid,
    /// P pulmonale, tall and narrow.
    Peaked,
    Biphasic,
    Inverted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChaosType {
    #[default]
    None,
    Fibrillation,
}

/// Shape of the conducted QRS complex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrsMorphology {
    #[default]
    Standard,
    /// Second R peak shortly after the first (left bundle branch block).
    Notched,
    /// rSR' split complex (right bundle branch block).
    Rsr,
}

/// Position of an atrial ectopic focus, which decides the premature P-wave shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtrialSite {
    High,
    Mid,
    Low,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VentricularMorphology {
    Monomorphic,
    Polymorphic,
}

/// Origin of premature beats for rhythms that can produce them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EctopicFocus {
    #[default]
    None,
    Atrial(AtrialSite),
    Ventricular(VentricularMorphology),
}

impl EctopicFocus {
    pub fn is_ventricular(&self) -> bool {
        matches!(self, EctopicFocus::Ventricular(_))
    }

    pub fn is_atrial(&self) -> bool {
        matches!(self, EctopicFocus::Atrial(_))
    }
}

/// Descriptive teaching text shown next to a strip.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RhythmInfo {
    pub name: String,
    pub rate_label: String,
    pub regularity: String,
    pub p_wave: String,
    pub qrs: String,
    pub description: String,
    pub tip: String,
    pub clinical: String,
}

/// Immutable description of a rhythm; the flag set drives shared synthesis logic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RhythmDefinition {
    pub id: String,
    /// Nominal ventricular rate in beats per minute.
    pub rate_bpm: f64,
    pub has_p_wave: bool,
    pub regular: bool,
    /// 1.0 is a narrow complex, anything above 1.5 is drawn wide.
    pub qrs_width_factor: f64,
    pub qrs_morphology: QrsMorphology,
    pub premature_capable: bool,
    pub ectopic_focus: EctopicFocus,
    pub block_type: BlockType,
    pub p_morphology: PMorphology,
    /// Pre-excitation: short PR and a delta wave before the QRS.
    pub accessory_pathway: bool,
    pub flutter_baseline: bool,
    pub chaos_type: ChaosType,
    /// Fractional beat-to-beat variability of the cycle duration.
    pub jitter: f64,
    /// Constant PR prolongation in cycle-progress units.
    pub pr_extension: f64,
    /// Half-width of the uniform noise added to every sample.
    pub baseline_noise: f64,
    /// Independent atrial rate for dissociated and flutter rhythms.
    pub atrial_rate_bpm: f64,
    /// Flutter waves per conducted QRS.
    pub conduction_ratio: u32,
    pub info: RhythmInfo,
}

impl RhythmDefinition {
    /// Nominal R-R interval in seconds.
    pub fn base_interval_secs(&self) -> f64 {
        60.0 / self.rate_bpm.max(1.0)
    }

    /// Atrial cycle length in seconds, used by complete block and flutter.
    pub fn atrial_interval_secs(&self) -> f64 {
        60.0 / self.atrial_rate_bpm.max(1.0)
    }

    pub fn is_wide_qrs(&self) -> bool {
        self.qrs_width_factor > 1.5
    }

    pub fn is_chaotic(&self) -> bool {
        self.chaos_type != ChaosType::None
    }
}

impl Default for RhythmDefinition {
    fn default() -> Self {
        Self {
            id: "NSR".to_string(),
            rate_bpm: 75.0,
            has_p_wave: true,
            regular: true,
            qrs_width_factor: 1.0,
            qrs_morphology: QrsMorphology::Standard,
            premature_capable: false,
            ectopic_focus: EctopicFocus::None,
            block_type: BlockType::None,
            p_morphology: PMorphology::Normal,
            accessory_pathway: false,
            flutter_baseline: false,
            chaos_type: ChaosType::None,
            jitter: 0.04,
            pr_extension: 0.0,
            baseline_noise: 0.15,
            atrial_rate_bpm: 75.0,
            conduction_ratio: 1,
            info: RhythmInfo::default(),
        }
    }
}

impl std::fmt::Display for RhythmDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.info.name.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} ({})", self.info.name, self.id)
        }
    }
}
