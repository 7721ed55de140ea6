use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    rhythm_info, AtrialSite, BlockType, ChaosType, EctopicFocus, PMorphology, QrsMorphology,
    RhythmDefinition, VentricularMorphology,
};

/// Id returned for unknown lookups.
pub const DEFAULT_RHYTHM_ID: &str = "NSR";

/// Read-only table of every rhythm the strip can show, keyed by id.
pub struct RhythmCatalog {
    rhythms: HashMap<String, Arc<RhythmDefinition>>,
    order: Vec<String>,
}

impl RhythmCatalog {
    pub fn new() -> Self {
        let mut catalog = RhythmCatalog {
            rhythms: HashMap::new(),
            order: Vec::new(),
        };

        // Define all rhythms. Display order follows the study list.
        catalog.insert(RhythmDefinition {
            id: "NSR".to_string(),
            rate_bpm: 75.0,
            info: rhythm_info! {
                name: "Normal Sinus Rhythm",
                rate_label: "60-100 bpm",
                regularity: "Regular",
                p_wave: "Present, upright",
                qrs: "Narrow",
                description: "The standard heart rhythm. Electrical impulse originates in the SA node and conducts normally.",
                tip: "Check: Is there a P before every QRS? Is the rate normal?",
                clinical: "No treatment required. Physiologic baseline.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "VFIB".to_string(),
            rate_bpm: 300.0,
            has_p_wave: false,
            regular: false,
            chaos_type: ChaosType::Fibrillation,
            jitter: 0.0,
            baseline_noise: 2.0,
            info: rhythm_info! {
                name: "Ventricular Fibrillation",
                rate_label: "300-500 bpm (Chaotic)",
                regularity: "Totally Irregular",
                p_wave: "Absent",
                qrs: "Absent",
                description: "Chaotic, irregular deflections of varying amplitude. The ventricles quiver instead of contracting.",
                tip: "Chaotic squiggles. No structure. Immediate Defibrillation!",
                clinical: "CRITICAL EMERGENCY. Cardiac arrest rhythm. Immediate CPR and Defibrillation required. Fatal if untreated.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AFLUT".to_string(),
            rate_bpm: 100.0,
            has_p_wave: false,
            flutter_baseline: true,
            jitter: 0.0,
            atrial_rate_bpm: 300.0,
            conduction_ratio: 3,
            info: rhythm_info! {
                name: "Atrial Flutter",
                rate_label: "Atrial ~300",
                regularity: "Regular (usually)",
                p_wave: "Saw-tooth 'F' waves",
                qrs: "Narrow",
                description: "Macro-reentry circuit in the right atrium. Characteristic 'saw-tooth' flutter waves.",
                tip: "Look for the 'Saw-Tooth' baseline between QRS complexes.",
                clinical: "Rate control (beta blockers/calcium channel blockers), Rhythm control (Cardioversion/Ablation). Stroke risk management (Anticoagulation).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "WPW".to_string(),
            rate_bpm: 75.0,
            qrs_width_factor: 1.6,
            accessory_pathway: true,
            info: rhythm_info! {
                name: "Wolff-Parkinson-White",
                rate_label: "Normal (Sinus)",
                regularity: "Regular",
                p_wave: "Normal",
                qrs: "Wide w/ Delta Wave",
                description: "Pre-excitation syndrome. Accessory pathway (Bundle of Kent) bypasses AV node. Features: Short PR, Delta Wave, Wide QRS.",
                tip: "Short PR + Delta Wave (slurred upstroke) = Wide QRS.",
                clinical: "Risk of SVT (AVRT) or fast Afib. Avoid AV nodal blockers (ABCD - Adenosine, Beta-blockers, CCB, Digoxin) if Afib present. Ablation is curative.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "PVC_MONO".to_string(),
            rate_bpm: 75.0,
            regular: false,
            premature_capable: true,
            ectopic_focus: EctopicFocus::Ventricular(VentricularMorphology::Monomorphic),
            jitter: 0.03,
            info: rhythm_info! {
                name: "PVC (Monomorphic)",
                rate_label: "Variable",
                regularity: "Irregular (Premature)",
                p_wave: "Absent",
                qrs: "Wide, Bizarre",
                description: "Ectopic beat arising from a single focus in the ventricles.",
                tip: "A wide, weird beat that comes early. All look the same.",
                clinical: "Benign in healthy hearts. Treat underlying cause (electrolytes, hypoxia). Frequent PVCs can cause cardiomyopathy.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "PVC_POLY".to_string(),
            rate_bpm: 75.0,
            regular: false,
            premature_capable: true,
            ectopic_focus: EctopicFocus::Ventricular(VentricularMorphology::Polymorphic),
            jitter: 0.03,
            info: rhythm_info! {
                name: "PVC (Polymorphic)",
                rate_label: "Variable",
                regularity: "Irregular (Premature)",
                p_wave: "Absent",
                qrs: "Wide, Variable",
                description: "PVCs arising from multiple different foci in the ventricles. Different shapes.",
                tip: "Multiple wide, weird beats that all look different. Unstable.",
                clinical: "Suggests greater electrical instability. Check electrolytes (K, Mg) and oxygenation. Risk of R-on-T phenomenon.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "PAC_HIGH".to_string(),
            rate_bpm: 75.0,
            regular: false,
            premature_capable: true,
            ectopic_focus: EctopicFocus::Atrial(AtrialSite::High),
            jitter: 0.03,
            info: rhythm_info! {
                name: "PAC (High Atrium)",
                rate_label: "Variable",
                regularity: "Irregular (Premature)",
                p_wave: "Premature & Upright",
                qrs: "Narrow",
                description: "Ectopic focus in high atrium. Upright P-wave, early beat.",
                tip: "Early beat with an Upright P-wave (normal looking).",
                clinical: "Benign. Triggered by stress, caffeine, alcohol, or tobacco.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "PAC_MID".to_string(),
            rate_bpm: 75.0,
            regular: false,
            premature_capable: true,
            ectopic_focus: EctopicFocus::Atrial(AtrialSite::Mid),
            jitter: 0.03,
            info: rhythm_info! {
                name: "PAC (Mid Atrium)",
                rate_label: "Variable",
                regularity: "Irregular (Premature)",
                p_wave: "Premature & Biphasic",
                qrs: "Narrow",
                description: "Ectopic focus in mid atrium. Biphasic P-wave.",
                tip: "Early beat with a Biphasic (up/down) P-wave.",
                clinical: "Benign. Differentiate from sinus arrhythmia. Reduce triggers.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "PAC_LOW".to_string(),
            rate_bpm: 75.0,
            regular: false,
            premature_capable: true,
            ectopic_focus: EctopicFocus::Atrial(AtrialSite::Low),
            jitter: 0.03,
            info: rhythm_info! {
                name: "PAC (Low Atrium)",
                rate_label: "Variable",
                regularity: "Irregular (Premature)",
                p_wave: "Premature & Inverted",
                qrs: "Narrow",
                description: "Ectopic focus in low atrium. Retrograde (inverted) P-wave.",
                tip: "Early beat with an Inverted (negative) P-wave.",
                clinical: "Benign. Differentiate from Junctional rhythms.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "LBBB".to_string(),
            rate_bpm: 72.0,
            qrs_width_factor: 1.8,
            qrs_morphology: QrsMorphology::Notched,
            info: rhythm_info! {
                name: "Left Bundle Branch Block",
                rate_label: "Normal (Sinus)",
                regularity: "Regular",
                p_wave: "Present",
                qrs: "Wide, Notched ('M')",
                description: "Block in left bundle. Wide, notched R wave in lateral leads. Discordant T waves.",
                tip: "WiLLiam: W in V1, M in V6. Wide, notched QRS.",
                clinical: "Associated with structural heart disease (HTN, CAD). New LBBB + Chest Pain is a STEMI equivalent (Sgarbossa Criteria).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "RBBB".to_string(),
            rate_bpm: 72.0,
            qrs_width_factor: 1.7,
            qrs_morphology: QrsMorphology::Rsr,
            info: rhythm_info! {
                name: "Right Bundle Branch Block",
                rate_label: "Normal (Sinus)",
                regularity: "Regular",
                p_wave: "Present",
                qrs: "Wide, RSR' ('M')",
                description: "Block in right bundle. RSR' pattern in V1.",
                tip: "MaRRoW: M in V1 (Rabbit Ears), W in V6. Wide QRS.",
                clinical: "Can be normal variant or due to RV strain (PE, Cor Pulmonale), ischemia, or congenital defects (ASD).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AVB1".to_string(),
            rate_bpm: 68.0,
            pr_extension: 0.07,
            jitter: 0.02,
            info: rhythm_info! {
                name: "1st Degree AV Block",
                rate_label: "Usually Normal",
                regularity: "Regular",
                p_wave: "Normal, PR > 0.20s",
                qrs: "Narrow",
                description: "Fixed prolongation of the PR interval (>0.20s).",
                tip: "PR Interval > 5 small boxes (0.20s). Constant.",
                clinical: "Usually benign and asymptomatic. No specific treatment required but monitor for progression.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AVB2T1".to_string(),
            rate_bpm: 80.0,
            regular: false,
            block_type: BlockType::Wenckebach,
            jitter: 0.02,
            info: rhythm_info! {
                name: "2nd Degree AV Block Type I",
                rate_label: "Variable",
                regularity: "Irregular (Grouped)",
                p_wave: "Normal, Progressive PR",
                qrs: "Narrow, Periodic Drop",
                description: "Wenckebach. Progressive PR lengthening until drop.",
                tip: "Longer, Longer, Longer, Drop! (Wenckebach).",
                clinical: "Usually due to reversible AV node block (drugs, ischemia, high vagal tone). Often benign.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AVB2T2".to_string(),
            rate_bpm: 80.0,
            regular: false,
            block_type: BlockType::Mobitz2,
            jitter: 0.01,
            info: rhythm_info! {
                name: "2nd Degree AV Block Type II",
                rate_label: "Variable",
                regularity: "Irregular Drops",
                p_wave: "Constant Rate",
                qrs: "Narrow/Broad",
                description: "Mobitz II. Random drops without PR prolongation.",
                tip: "If some Ps don't get through, then you have a Mobitz II.",
                clinical: "High risk of progression to complete heart block. Pacemaker is usually indicated. Atropine is often ineffective.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AVB3".to_string(),
            rate_bpm: 35.0,
            qrs_width_factor: 1.8,
            block_type: BlockType::Complete,
            jitter: 0.0,
            atrial_rate_bpm: 75.0,
            info: rhythm_info! {
                name: "3rd Degree AV Block",
                rate_label: "P: ~75, QRS: ~35",
                regularity: "Regular (Dissociated)",
                p_wave: "Normal, Dissociated",
                qrs: "Wide (Escape)",
                description: "Complete Heart Block. AV dissociation.",
                tip: "Ps and QRSs are divorced. Complete dissociation.",
                clinical: "Medical emergency. Risk of asystole. Pacemaker is required. Atropine is generally ineffective for wide-complex escape rhythms.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "SSS".to_string(),
            rate_bpm: 110.0,
            regular: false,
            block_type: BlockType::SickSinus,
            jitter: 0.08,
            info: rhythm_info! {
                name: "Sick Sinus Syndrome",
                rate_label: "Variable (Tachy-Brady)",
                regularity: "Irregular (Pauses)",
                p_wave: "Normal",
                qrs: "Narrow",
                description: "Dysfunction of SA node. Bursts of tachycardia followed by pauses.",
                tip: "Fast bursts followed by long pauses (Tachy-Brady).",
                clinical: "Pacemaker placement is often required to treat the bradycardia/pauses. Medications to control tachycardia.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "LAH".to_string(),
            rate_bpm: 75.0,
            p_morphology: PMorphology::Bifid,
            info: rhythm_info! {
                name: "Left Atrial Hypertrophy",
                rate_label: "Normal",
                regularity: "Regular",
                p_wave: "Bifid 'M' Shape",
                qrs: "Narrow",
                description: "P Mitrale. Wide, notched P-wave.",
                tip: "P-Mitrale: 'M' shaped P-wave in Lead II.",
                clinical: "Treat underlying cause (HTN, Valve disease). Monitor for development of Afib.",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "RAH".to_string(),
            rate_bpm: 75.0,
            p_morphology: PMorphology::Peaked,
            info: rhythm_info! {
                name: "Right Atrial Hypertrophy",
                rate_label: "Normal",
                regularity: "Regular",
                p_wave: "Tall Peaked",
                qrs: "Narrow",
                description: "P Pulmonale. Tall P-wave.",
                tip: "P-Pulmonale: Tall, peaked P-wave (>2.5mm).",
                clinical: "Treat underlying pulmonary or cardiac cause (COPD, Pulm HTN).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "SB".to_string(),
            rate_bpm: 48.0,
            info: rhythm_info! {
                name: "Sinus Bradycardia",
                rate_label: "<60 bpm",
                regularity: "Regular",
                p_wave: "Present",
                qrs: "Narrow",
                description: "Normal rhythm < 60 bpm.",
                tip: "Normal rhythm, just slow (<60 bpm).",
                clinical: "Usually benign (athletes/sleep). Treat only if symptomatic (atropine, pacing).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "ST".to_string(),
            rate_bpm: 120.0,
            jitter: 0.02,
            info: rhythm_info! {
                name: "Sinus Tachycardia",
                rate_label: ">100 bpm",
                regularity: "Regular",
                p_wave: "Present",
                qrs: "Narrow",
                description: "Normal rhythm > 100 bpm.",
                tip: "Normal rhythm, just fast (>100 bpm).",
                clinical: "Treat underlying cause (fluids, antipyretics, pain control, anxiety).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "AFIB".to_string(),
            rate_bpm: 110.0,
            has_p_wave: false,
            regular: false,
            jitter: 0.35,
            baseline_noise: 1.5,
            info: rhythm_info! {
                name: "Atrial Fibrillation",
                rate_label: "Variable",
                regularity: "Irregularly Irregular",
                p_wave: "Absent",
                qrs: "Narrow",
                description: "Chaotic atrial activity. Irregularly irregular.",
                tip: "Irregularly irregular. No P-waves. Messy baseline.",
                clinical: "Rate control, Rhythm control, Anticoagulation (Stroke prevention).",
            },
            ..Default::default()
        });

        catalog.insert(RhythmDefinition {
            id: "VT".to_string(),
            rate_bpm: 170.0,
            has_p_wave: false,
            qrs_width_factor: 2.0,
            jitter: 0.02,
            baseline_noise: 0.5,
            info: rhythm_info! {
                name: "Ventricular Tachycardia",
                rate_label: ">100 bpm",
                regularity: "Regular",
                p_wave: "Dissociated",
                qrs: "Wide",
                description: "Wide complex tachycardia.",
                tip: "Wide, fast, and regular. Looks like tombstones.",
                clinical: "Life-threatening. Pulse? Cardiovert/Meds. No pulse? Defibrillate.",
            },
            ..Default::default()
        });

        catalog
    }

    /// Adds a rhythm, replacing any existing one with the same id.
    pub fn insert(&mut self, rhythm: RhythmDefinition) {
        let key = rhythm.id.trim().to_ascii_uppercase();
        if !self.rhythms.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.rhythms.insert(key, Arc::new(rhythm));
    }

    /// Case-insensitive lookup that never fails: unknown ids resolve to normal sinus rhythm.
    pub fn lookup(&self, id: &str) -> Arc<RhythmDefinition> {
        match self.get(id) {
            Some(rhythm) => rhythm,
            None => {
                log::warn!("Unknown rhythm '{}', falling back to {}", id, DEFAULT_RHYTHM_ID);
                self.default_rhythm()
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<RhythmDefinition>> {
        self.rhythms
            .get(&id.trim().to_ascii_uppercase())
            .cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn default_rhythm(&self) -> Arc<RhythmDefinition> {
        self.rhythms
            .get(DEFAULT_RHYTHM_ID)
            .cloned()
            .unwrap_or_else(|| Arc::new(RhythmDefinition::default()))
    }

    /// Rhythm ids in study-list order.
    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = Arc<RhythmDefinition>> + '_ {
        self.order
            .iter()
            .filter_map(move |id| self.rhythms.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for RhythmCatalog {
    fn default() -> Self {
        Self::new()
    }
}
