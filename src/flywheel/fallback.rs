//! Fallback Rule Engine
//!
//! Deterministic, data-free defaults per enemy type. Used whenever history
//! is too thin to rank patterns, and to fill deployment zones that no
//! observed battle covers.

use std::collections::BTreeMap;

use crate::types::{DeploymentZone, RecommendedComposition, UnitCategory, UnitSuggestion};

/// One baseline unit of a fallback entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineUnit {
    pub name: &'static str,
    pub category: UnitCategory,
    pub count: u32,
    pub reason: &'static str,
}

/// Default deployment zone of one category
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineZone {
    pub category: UnitCategory,
    pub x: f64,
    pub y: f64,
    pub description: &'static str,
}

/// Data-free recommendation for one enemy type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackEntry {
    /// Enemy type this entry answers for (`"default"` for the generic entry)
    pub enemy: &'static str,
    pub units: &'static [BaselineUnit],
    /// Category split of a canonical squad: recon, attack, defense, equip
    pub split: [u32; 4],
    pub rationale: &'static str,
    pub notes: &'static [&'static str],
    pub priority_targets: &'static [&'static str],
}

const ZONES: [BaselineZone; 4] = [
    BaselineZone {
        category: UnitCategory::Recon,
        x: 50.0,
        y: 85.0,
        description: "Center rear for maximum coverage",
    },
    BaselineZone {
        category: UnitCategory::Attack,
        x: 30.0,
        y: 90.0,
        description: "Left flank approach",
    },
    BaselineZone {
        category: UnitCategory::Defense,
        x: 70.0,
        y: 90.0,
        description: "Right side protection",
    },
    BaselineZone {
        category: UnitCategory::Equip,
        x: 50.0,
        y: 92.0,
        description: "Behind the main line, close to the units it supports",
    },
];

const ARMY: FallbackEntry = FallbackEntry {
    enemy: "army",
    units: &[
        BaselineUnit {
            name: "Boeing ScanEagle",
            category: UnitCategory::Recon,
            count: 1,
            reason: "Long-range ISR",
        },
        BaselineUnit {
            name: "MQ-9 Reaper",
            category: UnitCategory::Attack,
            count: 1,
            reason: "Precision strike capability",
        },
        BaselineUnit {
            name: "Switchblade 600",
            category: UnitCategory::Attack,
            count: 3,
            reason: "Anti-armor loitering munition",
        },
        BaselineUnit {
            name: "Anduril Anvil",
            category: UnitCategory::Defense,
            count: 2,
            reason: "Counter-UAS protection",
        },
    ],
    split: [1, 3, 2, 0],
    rationale: "Baseline against a conventional army: long-range ISR, anti-armor strike and counter-UAS cover",
    notes: &[
        "Focus on counter-drone operations",
        "Expect organized resistance",
        "Use terrain for cover",
    ],
    priority_targets: &["Air defense systems", "Armored vehicles", "Command posts"],
};

const GUERRILLA: FallbackEntry = FallbackEntry {
    enemy: "guerrilla",
    units: &[
        BaselineUnit {
            name: "RQ-11 Raven",
            category: UnitCategory::Recon,
            count: 2,
            reason: "Recon for scattered infantry",
        },
        BaselineUnit {
            name: "Switchblade 300",
            category: UnitCategory::Attack,
            count: 4,
            reason: "Effective against infantry",
        },
        BaselineUnit {
            name: "Custom FPV Drone",
            category: UnitCategory::Attack,
            count: 3,
            reason: "Cheap area denial",
        },
    ],
    split: [2, 4, 0, 0],
    rationale: "Baseline against guerrillas: wide recon and cheap anti-infantry strike",
    notes: &[
        "Watch for ambush positions",
        "Infantry will use buildings",
        "Spread recon wide",
    ],
    priority_targets: &["Infantry in buildings", "Technical vehicles"],
};

const MERCENARY: FallbackEntry = FallbackEntry {
    enemy: "mercenary",
    units: &[
        BaselineUnit {
            name: "PD-100 Black Hornet",
            category: UnitCategory::Recon,
            count: 2,
            reason: "Stealthy recon vs elite forces",
        },
        BaselineUnit {
            name: "Switchblade 600",
            category: UnitCategory::Attack,
            count: 2,
            reason: "Anti-armor capability",
        },
        BaselineUnit {
            name: "Coyote Block 3",
            category: UnitCategory::Defense,
            count: 2,
            reason: "Counter-drone defense",
        },
    ],
    split: [2, 2, 2, 0],
    rationale: "Baseline against mercenaries: stealthy recon, anti-armor strike and counter-drone defense",
    notes: &[
        "Fast and aggressive enemies",
        "Prioritize eliminating scouts",
        "Defend flanks",
    ],
    priority_targets: &["Enemy scouts", "Fast attack vehicles"],
};

const GENERIC: FallbackEntry = FallbackEntry {
    enemy: "default",
    units: ARMY.units,
    split: ARMY.split,
    rationale: "Generic baseline for an unknown enemy: balanced ISR, strike and counter-UAS",
    notes: &["Assess threat before committing forces"],
    priority_targets: &["Highest-threat units first"],
};

/// Resolve the fallback entry of an enemy type (case-insensitive).
///
/// Unknown enemy types resolve to the generic entry.
pub fn for_enemy(enemy: &str) -> &'static FallbackEntry {
    match enemy.trim().to_lowercase().as_str() {
        "army" => &ARMY,
        "guerrilla" => &GUERRILLA,
        "mercenary" => &MERCENARY,
        _ => &GENERIC,
    }
}

/// Default deployment zone of a category.
pub fn zone(category: UnitCategory) -> DeploymentZone {
    let z = ZONES
        .iter()
        .find(|z| z.category == category)
        .unwrap_or(&ZONES[0]);
    DeploymentZone {
        x: z.x,
        y: z.y,
        sample_size: 0,
        description: Some(z.description.to_string()),
    }
}

impl FallbackEntry {
    pub fn composition(&self) -> RecommendedComposition {
        let [recon, attack, defense, equipment] = self.split;
        RecommendedComposition {
            recon,
            attack,
            defense,
            equipment,
            explanation: self.rationale.to_string(),
        }
    }

    pub fn specific_units(&self) -> Vec<UnitSuggestion> {
        self.units
            .iter()
            .map(|u| UnitSuggestion {
                name: u.name.to_string(),
                count: u.count,
                reason: u.reason.to_string(),
            })
            .collect()
    }

    /// Default zones for recon, attack and defense.
    pub fn zones(&self) -> BTreeMap<String, DeploymentZone> {
        [UnitCategory::Recon, UnitCategory::Attack, UnitCategory::Defense]
            .into_iter()
            .map(|c| (c.as_str().to_string(), zone(c)))
            .collect()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.iter().map(|n| n.to_string()).collect()
    }

    pub fn priority_targets(&self) -> Vec<String> {
        self.priority_targets.iter().map(|t| t.to_string()).collect()
    }
}
