//! Recommendation Synthesizer
//!
//! Reads the derived caches and the recent window of a scenario and blends
//! them with the fallback rules into one `Recommendation`:
//!
//! 1. top-K eligible patterns (win rate, then samples, then signature)
//! 2. per-unit stats over victorious battles in the window
//! 3. deployment centroids of surviving units in victories
//! 4. scenario win rate from the query's budget tier (0 when that tier is empty)
//! 5. confidence from the scenario's total battle count
//!
//! Storage failures surface as `Err`; the caller turns them into a
//! degraded response so the read path never fails outright.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::fallback::{self, FallbackEntry};
use crate::advisor::{AdvisorContext, AdvisorRecommendation};
use crate::config::FlywheelConfig;
use crate::storage::{BattleStore, StorageError};
use crate::types::{
    AggregateKey, BattleWithDeployments, BudgetTier, DeploymentZone, PatternSummary,
    RecommendQuery, Recommendation, RecommendedComposition, ScenarioKey, StrategyPattern,
    UnitCategory, UnitStat,
};

/// A synthesized recommendation plus the context an advisor would need to
/// enrich it.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub recommendation: Recommendation,
    pub advisor_context: AdvisorContext,
}

/// Build the data-driven recommendation for a query.
pub fn synthesize(
    store: &dyn BattleStore,
    config: &FlywheelConfig,
    query: &RecommendQuery,
) -> Result<Synthesis, StorageError> {
    let scenario = ScenarioKey::new(&query.map, &query.enemy);
    let rules = fallback::for_enemy(&scenario.enemy);

    let patterns = top_patterns(store.patterns_for(&scenario)?, config);
    let window = store.recent_battles(&scenario, config.recompute_window)?;
    let top_units = unit_stats(&window, config.top_units);
    let centroids = centroids(&window);
    let (total_battles, win_rate) = scenario_win_rate(store, &scenario, query.budget)?;

    let composition = if patterns.is_empty() {
        fallback_composition(rules)
    } else {
        pattern_composition(&patterns, config).unwrap_or_else(|| fallback_composition(rules))
    };

    let mut deployment_zones = centroids;
    for category in UnitCategory::ALL {
        let wanted = category != UnitCategory::Equip || composition.count(category) > 0;
        if wanted && !deployment_zones.contains_key(category.as_str()) {
            deployment_zones.insert(category.as_str().to_string(), fallback::zone(category));
        }
    }

    let pattern_summaries: Vec<PatternSummary> = patterns.iter().map(summarize).collect();

    let mut tactical_notes = data_notes(&pattern_summaries, &top_units);
    tactical_notes.extend(rules.notes());

    let overall_win_rate = round1(win_rate * 100.0);
    let advisor_context = AdvisorContext {
        scenario: scenario.clone(),
        budget: query.budget,
        total_battles,
        win_rate: overall_win_rate,
        top_patterns: pattern_summaries.clone(),
        effective_units: top_units.clone(),
        candidate_units: candidate_units(&top_units, rules),
    };

    let recommendation = Recommendation {
        data_points: total_battles,
        confidence: confidence(total_battles, config.confidence_step),
        overall_win_rate,
        recommended_composition: composition,
        top_units,
        deployment_zones,
        tactical_notes,
        specific_units: rules.specific_units(),
        priority_targets: rules.priority_targets(),
        top_patterns: pattern_summaries,
        enriched: false,
        advisor_status: None,
        error: None,
    };

    Ok(Synthesis {
        recommendation,
        advisor_context,
    })
}

/// Fallback-only response used when the store cannot be read.
pub fn degraded(query: &RecommendQuery, error: &str) -> Recommendation {
    let rules = fallback::for_enemy(&query.enemy);
    Recommendation {
        data_points: 0,
        confidence: 0,
        overall_win_rate: 0.0,
        recommended_composition: fallback_composition(rules),
        top_units: Vec::new(),
        deployment_zones: rules.zones(),
        tactical_notes: rules.notes(),
        specific_units: rules.specific_units(),
        priority_targets: rules.priority_targets(),
        top_patterns: Vec::new(),
        enriched: false,
        advisor_status: None,
        error: Some(error.to_string()),
    }
}

/// Overlay an advisor's answer. Counts, stats and confidence are kept;
/// empty advisor fields leave the statistical content in place.
pub fn apply_advice(recommendation: &mut Recommendation, advice: AdvisorRecommendation) {
    if !advice.specific_units.is_empty() {
        recommendation.specific_units = advice.specific_units;
    }
    if !advice.tactical_notes.is_empty() {
        recommendation.tactical_notes = advice.tactical_notes;
    }
    if !advice.priority_targets.is_empty() {
        recommendation.priority_targets = advice.priority_targets;
    }
    for (key, zone) in advice.deployment_zones {
        let Some(category) = UnitCategory::parse(&key) else {
            continue;
        };
        let name = category.as_str().to_string();
        let sample_size = recommendation
            .deployment_zones
            .get(&name)
            .map_or(0, |z| z.sample_size);
        recommendation
            .deployment_zones
            .insert(name, zone.into_zone(sample_size));
    }
    recommendation.enriched = true;
    recommendation.advisor_status = None;
}

/// `min(100, total * step)`
pub fn confidence(total_battles: u64, step: u32) -> u8 {
    total_battles
        .saturating_mul(u64::from(step))
        .min(100) as u8
}

// ============================================================================
// Patterns
// ============================================================================

fn top_patterns(mut patterns: Vec<StrategyPattern>, config: &FlywheelConfig) -> Vec<StrategyPattern> {
    patterns.retain(|p| p.sample_count >= config.min_samples);
    patterns.sort_by(|a, b| {
        b.win_rate
            .total_cmp(&a.win_rate)
            .then_with(|| b.sample_count.cmp(&a.sample_count))
            .then_with(|| a.key.signature.cmp(&b.key.signature))
    });
    patterns.truncate(config.top_patterns);
    patterns
}

fn summarize(pattern: &StrategyPattern) -> PatternSummary {
    PatternSummary {
        signature: pattern.key.signature.clone(),
        win_rate: round1(pattern.win_rate * 100.0),
        sample_count: pattern.sample_count,
        avg_cost_efficiency: pattern.avg_cost_efficiency.map(round1),
    }
}

fn pattern_composition(
    patterns: &[StrategyPattern],
    config: &FlywheelConfig,
) -> Option<RecommendedComposition> {
    let mut tally = [0u64; 4];
    for entry in patterns.iter().flat_map(|p| p.composition.iter()) {
        tally[category_index(entry.category)] += u64::from(entry.count);
    }

    let [recon, attack, defense, equipment] = apportion(tally, config)?;
    let best = &patterns[0];
    let samples: u32 = patterns.iter().map(|p| p.sample_count).sum();

    Some(RecommendedComposition {
        recon,
        attack,
        defense,
        equipment,
        explanation: format!(
            "Derived from the top {} composition(s) across {} battles; best: {:.1}% win rate over {} battles",
            patterns.len(),
            samples,
            best.win_rate * 100.0,
            best.sample_count
        ),
    })
}

/// Apportion category tallies to the configured squad size.
///
/// Largest-remainder rounding, then the recon/attack floors, then trim the
/// category with the most units above its floor until the squad fits.
/// Returns `None` when there is nothing to apportion.
pub fn apportion(tally: [u64; 4], config: &FlywheelConfig) -> Option<[u32; 4]> {
    let total: u64 = tally.iter().sum();
    if total == 0 {
        return None;
    }
    let squad = u64::from(config.squad_size);

    let mut counts = [0u64; 4];
    let mut remainders = [(0u64, 0usize); 4];
    for (i, t) in tally.iter().enumerate() {
        let scaled = t * squad;
        counts[i] = scaled / total;
        remainders[i] = (scaled % total, i);
    }

    let assigned: u64 = counts.iter().sum();
    // Largest remainder first; ties go to the canonical category order.
    remainders.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    for &(_, i) in remainders.iter().take((squad - assigned) as usize) {
        counts[i] += 1;
    }

    let floors = [u64::from(config.min_recon), u64::from(config.min_attack), 0, 0];
    for i in 0..4 {
        counts[i] = counts[i].max(floors[i]);
    }

    while counts.iter().sum::<u64>() > squad {
        let Some(i) = (0..4)
            .filter(|&i| counts[i] > floors[i])
            .max_by(|&a, &b| (counts[a] - floors[a]).cmp(&(counts[b] - floors[b])).then(a.cmp(&b)))
        else {
            break;
        };
        counts[i] -= 1;
    }

    Some(counts.map(|c| c as u32))
}

fn fallback_composition(rules: &FallbackEntry) -> RecommendedComposition {
    let mut composition = rules.composition();
    composition.explanation = format!(
        "{}. Not enough history yet: no composition has been played often enough to rank.",
        rules.rationale
    );
    composition
}

fn category_index(category: UnitCategory) -> usize {
    match category {
        UnitCategory::Recon => 0,
        UnitCategory::Attack => 1,
        UnitCategory::Defense => 2,
        UnitCategory::Equip => 3,
    }
}

// ============================================================================
// Unit Statistics & Centroids
// ============================================================================

#[derive(Default)]
struct UnitTally {
    category: Option<UnitCategory>,
    cost: u64,
    deployments: u32,
    wins: u32,
    survived_in_wins: u32,
    kills_in_wins: u64,
}

/// Rank units by usage in victories, then by average kills.
pub fn unit_stats(window: &[BattleWithDeployments], limit: usize) -> Vec<UnitStat> {
    let mut tallies: HashMap<&str, UnitTally> = HashMap::new();

    // Window is newest first, so the first sighting carries the current cost.
    for battle in window {
        let victory = battle.record.result.is_victory();
        for d in &battle.deployments {
            let t = tallies.entry(d.name.as_str()).or_default();
            if t.category.is_none() {
                t.category = Some(d.category);
                t.cost = d.cost;
            }
            t.deployments += 1;
            if victory {
                t.wins += 1;
                t.kills_in_wins += u64::from(d.kills);
                if d.survived {
                    t.survived_in_wins += 1;
                }
            }
        }
    }

    let mut stats: Vec<UnitStat> = tallies
        .into_iter()
        .filter(|(_, t)| t.wins > 0)
        .map(|(name, t)| UnitStat {
            name: name.to_string(),
            category: t.category.unwrap_or(UnitCategory::Attack),
            cost: t.cost,
            win_rate: round1(f64::from(t.wins) / f64::from(t.deployments) * 100.0),
            avg_kills: round2(t.kills_in_wins as f64 / f64::from(t.wins)),
            usage_count: t.wins,
            survival_rate: round1(f64::from(t.survived_in_wins) / f64::from(t.wins) * 100.0),
        })
        .collect();

    stats.sort_by(|a, b| {
        b.usage_count
            .cmp(&a.usage_count)
            .then_with(|| b.avg_kills.partial_cmp(&a.avg_kills).unwrap_or(Ordering::Equal))
            .then_with(|| a.name.cmp(&b.name))
    });
    stats.truncate(limit);
    stats
}

/// Mean start position of surviving units per category, victories only.
pub fn centroids(window: &[BattleWithDeployments]) -> BTreeMap<String, DeploymentZone> {
    let mut sums: BTreeMap<UnitCategory, (f64, f64, u32)> = BTreeMap::new();
    for d in window
        .iter()
        .filter(|b| b.record.result.is_victory())
        .flat_map(|b| b.deployments.iter())
        .filter(|d| d.survived)
    {
        let entry = sums.entry(d.category).or_insert((0.0, 0.0, 0));
        entry.0 += d.start.x;
        entry.1 += d.start.y;
        entry.2 += 1;
    }

    sums.into_iter()
        .map(|(category, (x, y, n))| {
            (
                category.as_str().to_string(),
                DeploymentZone {
                    x: round1(x / f64::from(n)),
                    y: round1(y / f64::from(n)),
                    sample_size: n,
                    description: None,
                },
            )
        })
        .collect()
}

// ============================================================================
// Scenario Totals
// ============================================================================

/// (battles across all tiers, win rate of the query's tier as a fraction)
///
/// A tier with no recorded battles reports 0 even when other tiers have data.
fn scenario_win_rate(
    store: &dyn BattleStore,
    scenario: &ScenarioKey,
    budget: u64,
) -> Result<(u64, f64), StorageError> {
    let query_tier = BudgetTier::from_budget(budget);
    let mut total = 0u64;
    let mut rate = 0.0;

    for tier in BudgetTier::ALL {
        let key = AggregateKey {
            scenario: scenario.clone(),
            tier,
        };
        if let Some(agg) = store.get_aggregate(&key)? {
            total += agg.total_battles;
            if tier == query_tier {
                rate = agg.win_rate();
            }
        }
    }

    Ok((total, rate))
}

// ============================================================================
// Helpers
// ============================================================================

fn data_notes(patterns: &[PatternSummary], units: &[UnitStat]) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(best) = patterns.first() {
        notes.push(format!(
            "Best observed composition won {:.1}% of {} battles",
            best.win_rate, best.sample_count
        ));
    }
    if let Some(unit) = units.first() {
        notes.push(format!(
            "{} appears most often in victories ({} deployments, {:.1} avg kills)",
            unit.name, unit.usage_count, unit.avg_kills
        ));
    }
    notes
}

fn candidate_units(units: &[UnitStat], rules: &FallbackEntry) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in units
        .iter()
        .map(|u| u.name.as_str())
        .chain(rules.units.iter().map(|u| u.name))
    {
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
