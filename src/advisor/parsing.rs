//! Advisor Response Parsing
//!
//! The advisor answers in free text with one JSON object embedded somewhere
//! in it. The object is taken from the first `{` to the last `}`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::AdvisorError;
use crate::types::{DeploymentZone, UnitSuggestion};

// ============================================================================
// Response Structures
// ============================================================================

/// Recommendation enrichment returned by the advisor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorRecommendation {
    pub specific_units: Vec<UnitSuggestion>,
    pub deployment_zones: BTreeMap<String, AdvisorZone>,
    pub tactical_notes: Vec<String>,
    pub priority_targets: Vec<String>,
}

impl AdvisorRecommendation {
    pub fn is_empty(&self) -> bool {
        self.specific_units.is_empty()
            && self.deployment_zones.is_empty()
            && self.tactical_notes.is_empty()
            && self.priority_targets.is_empty()
    }
}

/// Zone suggested by the advisor (x, y in percent)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorZone {
    pub x: f64,
    pub y: f64,
    pub description: Option<String>,
}

impl AdvisorZone {
    /// Convert to a response zone, keeping the observed sample size.
    pub fn into_zone(self, sample_size: u32) -> DeploymentZone {
        DeploymentZone {
            x: self.x.clamp(0.0, 100.0),
            y: self.y.clamp(0.0, 100.0),
            sample_size,
            description: self.description,
        }
    }
}

/// Structured post-battle debrief
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleDebrief {
    pub overall_assessment: String,
    pub what_worked: Vec<String>,
    pub what_to_improve: Vec<String>,
    pub suggested_changes: Vec<String>,
}

// ============================================================================
// Parsing Functions
// ============================================================================

/// Parse a recommendation reply. An object carrying none of the expected
/// fields is rejected rather than treated as an empty enrichment.
pub fn parse_recommendation(text: &str) -> Result<AdvisorRecommendation, AdvisorError> {
    let rec: AdvisorRecommendation = parse_embedded(text)?;
    if rec.is_empty() {
        return Err(AdvisorError::Malformed("no recommendation fields".to_string()));
    }
    Ok(rec)
}

pub fn parse_debrief(text: &str) -> Result<BattleDebrief, AdvisorError> {
    let debrief: BattleDebrief = parse_embedded(text)?;
    if debrief.overall_assessment.trim().is_empty() {
        return Err(AdvisorError::Malformed("missing overall_assessment".to_string()));
    }
    Ok(debrief)
}

/// Slice of `text` from the first `{` to the last `}` inclusive.
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_embedded<T: DeserializeOwned>(text: &str) -> Result<T, AdvisorError> {
    let json = extract_json(text).ok_or(AdvisorError::NoJson)?;
    serde_json::from_str(json).map_err(|e| AdvisorError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_bounds() {
        assert_eq!(extract_json("a {\"x\": {\"y\": 1}} b"), Some("{\"x\": {\"y\": 1}}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_full_recommendation() {
        let text = r#"
            {
                "specific_units": [{"name": "Switchblade 600", "count": 3, "reason": "Anti-armor"}],
                "deployment_zones": {
                    "recon": {"x": 48, "y": 80, "description": "High ground"}
                },
                "tactical_notes": ["Strike at dawn"],
                "priority_targets": ["Tanks"]
            }
        "#;
        let rec = parse_recommendation(text).unwrap();
        assert_eq!(rec.specific_units[0].count, 3);
        assert_eq!(rec.deployment_zones["recon"].x, 48.0);
        assert_eq!(rec.tactical_notes, vec!["Strike at dawn"]);
    }

    #[test]
    fn test_malformed_json() {
        let err = parse_recommendation("{\"tactical_notes\": [unquoted]}").unwrap_err();
        assert!(matches!(err, AdvisorError::Malformed(_)));
    }

    #[test]
    fn test_reply_without_known_fields_is_rejected() {
        for reply in ["I'm not sure. {}", r#"{"foo": 1}"#, r#"{"tactical_notes": []}"#] {
            let err = parse_recommendation(reply).unwrap_err();
            assert!(matches!(err, AdvisorError::Malformed(_)), "{reply}");
            assert_eq!(err.code(), "malformed_json");
        }
    }

    #[test]
    fn test_no_json() {
        assert!(matches!(parse_recommendation("I cannot help"), Err(AdvisorError::NoJson)));
    }

    #[test]
    fn test_debrief_requires_assessment() {
        let ok = parse_debrief(r#"{"overall_assessment": "Solid win", "what_worked": ["Recon"]}"#).unwrap();
        assert_eq!(ok.what_worked, vec!["Recon"]);
        assert!(ok.suggested_changes.is_empty());

        assert!(parse_debrief(r#"{"what_worked": []}"#).is_err());
    }

    #[test]
    fn test_zone_is_clamped() {
        let zone = AdvisorZone {
            x: 140.0,
            y: -3.0,
            description: None,
        }
        .into_zone(2);
        assert_eq!((zone.x, zone.y, zone.sample_size), (100.0, 0.0, 2));
    }
}
