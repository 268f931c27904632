//! Advisor prompt construction
//!
//! Prompts are built deterministically from their inputs: the same context
//! always renders the same text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::ingest::{non_negative_u64, BattlePayload};
use crate::types::{PatternSummary, ScenarioKey, UnitCategory, UnitStat};

/// Persona sent ahead of every prompt
pub const SYSTEM_PROMPT: &str = "You are a tactical AI advisor for BattleBottle, a military drone warfare simulator.
Analyze battle data and provide concise, actionable tactical recommendations.
Focus on: unit composition, deployment positioning, and strategic priorities.
Keep responses brief and structured. Use military terminology appropriately.
Format recommendations as JSON when requested.";

/// One request to the advisor
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisorPrompt {
    pub text: String,
    pub max_tokens: u32,
}

/// Scenario statistics handed to the advisor for a recommendation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdvisorContext {
    pub scenario: ScenarioKey,
    pub budget: u64,
    /// Battles recorded for the scenario across all budget tiers
    pub total_battles: u64,
    /// Percent
    pub win_rate: f64,
    pub top_patterns: Vec<PatternSummary>,
    pub effective_units: Vec<UnitStat>,
    /// Unit names the advisor may pick from
    pub candidate_units: Vec<String>,
}

/// Which side of the engagement a debrief is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebriefMode {
    Attack,
    Defense,
}

impl DebriefMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attack => "attack",
            Self::Defense => "defense",
        }
    }
}

/// Per-category tally of one battle
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub count: u32,
    pub survived: u32,
    pub kills: u64,
}

/// Everything a debrief prompt reports about one battle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BattleSummary {
    pub map: String,
    pub enemy: String,
    pub result: String,
    pub budget: u64,
    pub spent: u64,
    pub duration_secs: u64,
    pub allies_deployed: usize,
    pub allies_survived: usize,
    pub total_kills: u64,
    pub by_category: BTreeMap<UnitCategory, CategoryBreakdown>,
}

impl BattleSummary {
    /// Summarise a raw payload. Missing fields read as "unknown" or 0.
    pub fn from_payload(payload: &BattlePayload) -> Self {
        let text = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown")
                .to_string()
        };

        let mut by_category: BTreeMap<UnitCategory, CategoryBreakdown> = BTreeMap::new();
        for ally in &payload.allies {
            let entry = by_category
                .entry(UnitCategory::parse_or_default(ally.category.as_deref()))
                .or_default();
            entry.count += 1;
            if ally.is_alive() {
                entry.survived += 1;
            }
            entry.kills += non_negative_u64(ally.kills);
        }

        Self {
            map: text(&payload.map),
            enemy: text(&payload.enemy),
            result: text(&payload.result),
            budget: non_negative_u64(payload.budget),
            spent: non_negative_u64(payload.spent),
            duration_secs: non_negative_u64(payload.timer),
            allies_deployed: payload.allies.len(),
            allies_survived: payload.allies.iter().filter(|a| a.is_alive()).count(),
            total_kills: by_category.values().map(|c| c.kills).sum(),
            by_category,
        }
    }
}

// ============================================================================
// Recommendation Prompts
// ============================================================================

const RECOMMENDATION_SCHEMA: &str = r#"{
    "specific_units": [
        {"name": "unit_name", "count": number, "reason": "brief reason"}
    ],
    "deployment_zones": {
        "recon": {"x": percent, "y": percent, "description": "positioning advice"},
        "attack": {"x": percent, "y": percent, "description": "positioning advice"},
        "defense": {"x": percent, "y": percent, "description": "positioning advice"}
    },
    "tactical_notes": ["key insight 1", "key insight 2"],
    "priority_targets": ["target type 1", "target type 2"]
}"#;

/// Recommendation prompt: the history variant when the scenario has been
/// played before, the new-scenario variant otherwise.
pub fn recommendation_prompt(context: &AdvisorContext, max_tokens: u32) -> AdvisorPrompt {
    let text = if context.total_battles > 0 {
        history_prompt(context)
    } else {
        new_scenario_prompt(context)
    };
    AdvisorPrompt { text, max_tokens }
}

fn history_prompt(ctx: &AdvisorContext) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Historical battle data for {} vs {}:",
        ctx.scenario.map, ctx.scenario.enemy
    );
    let _ = writeln!(out, "- Total battles: {}", ctx.total_battles);
    let _ = writeln!(out, "- Win rate: {:.1}%", ctx.win_rate);
    let _ = writeln!(out, "- Budget: ${}", thousands(ctx.budget));

    if !ctx.top_patterns.is_empty() {
        out.push_str("\nBest unit compositions:\n");
        for p in &ctx.top_patterns {
            let _ = writeln!(
                out,
                "- {}: {:.1}% win rate over {} battles",
                p.signature, p.win_rate, p.sample_count
            );
        }
    }

    if !ctx.effective_units.is_empty() {
        out.push_str("\nMost effective units in winning battles:\n");
        for u in &ctx.effective_units {
            let _ = writeln!(
                out,
                "- {} ({}): {} deployments, {:.1} avg kills, {:.0}% survival",
                u.name, u.category, u.usage_count, u.avg_kills, u.survival_rate
            );
        }
    }

    push_catalog(&mut out, &ctx.candidate_units);
    out.push_str("\nAnalyze this data and provide tactical recommendations in JSON format:\n");
    out.push_str(RECOMMENDATION_SCHEMA);
    out.push('\n');
    out
}

fn new_scenario_prompt(ctx: &AdvisorContext) -> String {
    let mut out = String::new();
    out.push_str("New scenario with no historical data:\n");
    let _ = writeln!(out, "- Map: {}", ctx.scenario.map);
    let _ = writeln!(out, "- Enemy: {}", ctx.scenario.enemy);
    let _ = writeln!(out, "- Budget: ${}", thousands(ctx.budget));

    push_catalog(&mut out, &ctx.candidate_units);
    out.push_str("\nProvide baseline tactical recommendations for a drone warfare engagement.\n");
    out.push_str("Consider typical enemy compositions and terrain factors.\n");
    out.push_str("Return JSON format:\n");
    out.push_str(RECOMMENDATION_SCHEMA);
    out.push('\n');
    out
}

fn push_catalog(out: &mut String, candidates: &[String]) {
    if candidates.is_empty() {
        return;
    }
    let _ = writeln!(out, "\nAvailable units: {}", candidates.join(", "));
}

// ============================================================================
// Debrief Prompt
// ============================================================================

const DEBRIEF_SCHEMA: &str = r#"{
    "overall_assessment": "one sentence summary",
    "what_worked": ["point 1", "point 2"],
    "what_to_improve": ["point 1", "point 2"],
    "suggested_changes": ["specific suggestion 1", "specific suggestion 2"]
}"#;

pub fn debrief_prompt(summary: &BattleSummary, mode: DebriefMode, max_tokens: u32) -> AdvisorPrompt {
    let mut out = String::new();
    match mode {
        DebriefMode::Attack => {
            let _ = writeln!(out, "Battle completed on {} vs {}:", summary.map, summary.enemy);
        }
        DebriefMode::Defense => {
            let _ = writeln!(
                out,
                "Defensive battle completed on {} against {} attackers:",
                summary.map, summary.enemy
            );
        }
    }
    let _ = writeln!(out, "- Result: {}", summary.result.to_uppercase());
    let _ = writeln!(
        out,
        "- Budget: ${} / Spent: ${}",
        thousands(summary.budget),
        thousands(summary.spent)
    );
    let _ = writeln!(out, "- Battle duration: {} seconds", summary.duration_secs);
    let _ = writeln!(
        out,
        "- Allies deployed: {}, Survived: {}",
        summary.allies_deployed, summary.allies_survived
    );
    let _ = writeln!(out, "- Total kills: {}", summary.total_kills);

    out.push_str("\nUnit breakdown:\n");
    for (category, stats) in &summary.by_category {
        let _ = writeln!(
            out,
            "- {}: {} deployed, {} survived, {} kills",
            category, stats.count, stats.survived, stats.kills
        );
    }

    let focus = match mode {
        DebriefMode::Attack => "Provide brief tactical feedback in JSON format:",
        DebriefMode::Defense => {
            "Provide brief feedback on the defensive setup (placement, coverage, counter-drone layers) in JSON format:"
        }
    };
    let _ = writeln!(out, "\n{focus}");
    out.push_str(DEBRIEF_SCHEMA);
    out.push('\n');

    AdvisorPrompt {
        text: out,
        max_tokens,
    }
}

/// `2000000` → `2,000,000`
fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context(total_battles: u64) -> AdvisorContext {
        AdvisorContext {
            scenario: ScenarioKey::new("gaza", "army"),
            budget: 2_000_000,
            total_battles,
            win_rate: 66.666,
            candidate_units: vec!["RQ-11 Raven".to_string(), "Switchblade 600".to_string()],
            ..AdvisorContext::default()
        }
    }

    #[test]
    fn test_prompt_variant_follows_history() {
        let with_history = recommendation_prompt(&context(3), 600);
        assert!(with_history.text.starts_with("Historical battle data for gaza vs army:"));
        assert!(with_history.text.contains("- Win rate: 66.7%"));
        assert!(with_history.text.contains("\"defense\""));

        let fresh = recommendation_prompt(&context(0), 600);
        assert!(fresh.text.starts_with("New scenario with no historical data:"));
        assert!(fresh.text.contains("Available units: RQ-11 Raven, Switchblade 600"));
        assert_eq!(fresh.max_tokens, 600);
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(recommendation_prompt(&context(5), 600), recommendation_prompt(&context(5), 600));
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(1_000), "1,000");
        assert_eq!(thousands(2_000_000), "2,000,000");
    }

    #[test]
    fn test_battle_summary_breakdown() {
        let payload: BattlePayload = serde_json::from_value(json!({
            "map": "gaza",
            "result": "victory",
            "budget": 1_500_000,
            "allies": [
                {"cat": "recon", "hp": 10, "kills": 0},
                {"cat": "attack", "hp": 0, "kills": 2},
                {"cat": "attack", "hp": 3, "kills": 1}
            ]
        }))
        .unwrap();

        let summary = BattleSummary::from_payload(&payload);
        assert_eq!(summary.enemy, "unknown");
        assert_eq!(summary.allies_deployed, 3);
        assert_eq!(summary.allies_survived, 2);
        assert_eq!(summary.total_kills, 3);
        assert_eq!(summary.by_category[&UnitCategory::Attack].survived, 1);

        let prompt = debrief_prompt(&summary, DebriefMode::Defense, 400);
        assert!(prompt.text.starts_with("Defensive battle completed on gaza"));
        assert!(prompt.text.contains("- Result: VICTORY"));
        assert!(prompt.text.contains("- Budget: $1,500,000 / Spent: $0"));
        assert!(prompt.text.contains("- attack: 2 deployed, 1 survived, 3 kills"));
    }
}
