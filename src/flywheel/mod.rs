//! Data Flywheel
//!
//! Write path: validate → atomic insert → scenario aggregate → pattern recompute.
//! Read path: synthesize from the caches → optional advisor enrichment.
//!
//! The flywheel owns no state of its own; everything lives behind the
//! injected `BattleStore`, so one instance can be shared across handlers.

pub mod aggregator;
pub mod fallback;
pub mod signature;
pub mod synthesizer;

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::advisor::{self, AdvisorError, BattleDebrief, BattleSummary, DebriefMode, TacticalAdvisor};
use crate::config::{AdvisorConfig, AppConfig, FlywheelConfig};
use crate::ingest::{self, BattlePayload, IngestError};
use crate::storage::{BattleStore, StorageError};
use crate::types::{
    GlobalStats, IngestReceipt, RebuildReport, RecommendQuery, Recommendation, ScenarioKey,
    ScenarioStats,
};

/// Battle telemetry flywheel service
#[derive(Clone)]
pub struct Flywheel {
    store: Arc<dyn BattleStore>,
    advisor: Arc<dyn TacticalAdvisor>,
    config: FlywheelConfig,
    advisor_config: AdvisorConfig,
}

impl Flywheel {
    pub fn new(
        store: Arc<dyn BattleStore>,
        advisor: Arc<dyn TacticalAdvisor>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            advisor,
            config: config.flywheel.clone(),
            advisor_config: config.advisor.clone(),
        }
    }

    pub fn store(&self) -> &Arc<dyn BattleStore> {
        &self.store
    }

    /// Whether recommendations can currently be enriched
    pub fn advisor_enabled(&self) -> bool {
        self.advisor.is_available()
    }

    pub fn advisor_config(&self) -> &AdvisorConfig {
        &self.advisor_config
    }

    // ========================================================================
    // Write Path
    // ========================================================================

    /// Ingest one completed battle.
    ///
    /// Validation and storage failures are returned and leave the store
    /// untouched. Once the battle is committed, aggregation failures are
    /// only logged: the next recompute (or a rebuild) repairs the caches.
    pub fn ingest(&self, payload: &BattlePayload) -> Result<IngestReceipt, IngestError> {
        let now = Utc::now();
        let battle = ingest::validate(payload, now)?;
        let deployments = battle.deployments.len();
        let record = self.store.insert_battle(battle)?;

        debug!(
            battle_id = record.id,
            scenario = %record.scenario,
            result = %record.result,
            deployments,
            "Battle recorded"
        );

        if let Err(e) = aggregator::record_scenario_outcome(self.store.as_ref(), &record, now) {
            warn!(battle_id = record.id, error = %e, "Scenario aggregate update failed");
        }

        let patterns_refreshed = match self.recompute(&record.scenario) {
            Ok(n) => n,
            Err(e) => {
                warn!(scenario = %record.scenario, error = %e, "Pattern recompute failed");
                0
            }
        };

        Ok(IngestReceipt {
            battle_id: record.id,
            map: record.scenario.map.clone(),
            enemy: record.scenario.enemy.clone(),
            result: record.result,
            metrics: record.metrics,
            patterns_refreshed,
        })
    }

    /// Recompute the patterns of one scenario from its recent window.
    pub fn recompute(&self, scenario: &ScenarioKey) -> Result<usize, StorageError> {
        aggregator::recompute_patterns(self.store.as_ref(), scenario, &self.config, Utc::now())
    }

    /// Rebuild every derived cache from battle history.
    pub fn rebuild(&self) -> Result<RebuildReport, StorageError> {
        let now = Utc::now();
        let battles = self.store.list_battles()?;

        let aggregates = aggregator::rebuild_aggregates(&battles, now);
        self.store.replace_aggregates(&aggregates)?;

        let scenarios: BTreeSet<ScenarioKey> = battles.iter().map(|b| b.scenario.clone()).collect();
        let mut patterns = 0;
        for scenario in &scenarios {
            patterns += aggregator::recompute_patterns(self.store.as_ref(), scenario, &self.config, now)?;
        }

        let report = RebuildReport {
            battles: battles.len(),
            scenarios: scenarios.len(),
            aggregates: aggregates.len(),
            patterns,
        };
        info!(
            battles = report.battles,
            scenarios = report.scenarios,
            aggregates = report.aggregates,
            patterns = report.patterns,
            "Rebuilt derived caches from history"
        );
        Ok(report)
    }

    // ========================================================================
    // Read Path
    // ========================================================================

    /// Recommendation for a scenario. Never fails.
    ///
    /// When the store cannot be read the fallback content is returned with
    /// `error` set and the advisor is not consulted.
    pub async fn recommend(&self, query: &RecommendQuery) -> Recommendation {
        let synthesis = match synthesizer::synthesize(self.store.as_ref(), &self.config, query) {
            Ok(s) => s,
            Err(e) => {
                warn!(map = %query.map, enemy = %query.enemy, error = %e, "Recommendation degraded to fallback");
                return synthesizer::degraded(query, &e.to_string());
            }
        };

        let mut recommendation = synthesis.recommendation;
        match advisor::advise(
            self.advisor.as_ref(),
            &synthesis.advisor_context,
            self.advisor_config.max_tokens,
            self.advisor_config.timeout(),
        )
        .await
        {
            Ok(advice) => synthesizer::apply_advice(&mut recommendation, advice),
            Err(e) => {
                if !matches!(e, AdvisorError::NotConfigured) {
                    warn!(backend = self.advisor.backend_name(), error = %e, "Advisor enrichment failed");
                }
                recommendation.advisor_status = Some(e.code().to_string());
            }
        }

        recommendation
    }

    /// Advisor debrief of a single battle payload.
    pub async fn debrief(
        &self,
        payload: &BattlePayload,
        mode: DebriefMode,
    ) -> Result<BattleDebrief, AdvisorError> {
        let summary = BattleSummary::from_payload(payload);
        let result = advisor::debrief(
            self.advisor.as_ref(),
            &summary,
            mode,
            self.advisor_config.debrief_max_tokens,
            self.advisor_config.timeout(),
        )
        .await;

        if let Err(e) = &result {
            if !matches!(e, AdvisorError::NotConfigured) {
                warn!(mode = mode.as_str(), error = %e, "Debrief generation failed");
            }
        }
        result
    }

    /// Totals over the whole history plus a per-scenario breakdown.
    pub fn stats(&self) -> Result<GlobalStats, StorageError> {
        let battles = self.store.list_battles()?;

        let mut sessions = HashSet::new();
        let mut per_scenario: BTreeMap<&ScenarioKey, (u64, u64)> = BTreeMap::new();
        let mut victories = 0u64;

        for b in &battles {
            if !b.session_id.is_empty() {
                sessions.insert(b.session_id.as_str());
            }
            let entry = per_scenario.entry(&b.scenario).or_insert((0, 0));
            entry.0 += 1;
            if b.result.is_victory() {
                entry.1 += 1;
                victories += 1;
            }
        }

        let total = battles.len() as u64;
        let global_win_rate = if total == 0 {
            0
        } else {
            (victories as f64 / total as f64 * 100.0).round() as u64
        };

        let scenarios = per_scenario
            .into_iter()
            .map(|(scenario, (count, wins))| ScenarioStats {
                map: scenario.map.clone(),
                enemy: scenario.enemy.clone(),
                battles: count,
                victories: wins,
                win_rate: (wins as f64 / count as f64 * 1000.0).round() / 10.0,
            })
            .collect();

        Ok(GlobalStats {
            total_simulations: total,
            total_victories: victories,
            global_win_rate,
            unique_players: sessions.len() as u64,
            ai_enabled: self.advisor_enabled(),
            scenarios,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advisor::DisabledAdvisor;
    use crate::storage::InMemoryStore;
    use serde_json::json;

    fn flywheel() -> Flywheel {
        Flywheel::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(DisabledAdvisor),
            &AppConfig::default(),
        )
    }

    fn payload(session: &str, result: &str) -> BattlePayload {
        serde_json::from_value(json!({
            "session_id": session,
            "map": "gaza",
            "enemy": "army",
            "budget": 2_000_000,
            "spent": 400_000,
            "result": result,
            "timer": 80,
            "allies": [
                {"id": "r1", "name": "RQ-11 Raven", "category": "recon", "hp": 5, "x": 50, "y": 85},
                {"id": "a1", "name": "Switchblade 600", "category": "attack", "hp": 5, "kills": 1, "x": 30, "y": 90}
            ],
            "enemies": [{"hp": 0}]
        }))
        .unwrap()
    }

    #[test]
    fn test_ingest_updates_aggregate_and_patterns() {
        let fw = flywheel();
        for _ in 0..2 {
            assert_eq!(fw.ingest(&payload("p1", "victory")).unwrap().patterns_refreshed, 0);
        }
        let receipt = fw.ingest(&payload("p2", "defeat")).unwrap();
        assert_eq!(receipt.battle_id, 3);
        assert_eq!(receipt.patterns_refreshed, 1);

        let aggregates = fw.store().list_aggregates().unwrap();
        assert_eq!(aggregates.len(), 1);
        assert_eq!(aggregates[0].total_battles, 3);
    }

    #[test]
    fn test_invalid_payload_writes_nothing() {
        let fw = flywheel();
        let mut bad = payload("p1", "victory");
        bad.result = Some("draw".to_string());
        assert!(fw.ingest(&bad).is_err());
        assert!(fw.store().list_battles().unwrap().is_empty());
        assert!(fw.store().list_aggregates().unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let fw = flywheel();
        fw.ingest(&payload("p1", "victory")).unwrap();
        fw.ingest(&payload("p1", "defeat")).unwrap();
        fw.ingest(&payload("", "victory")).unwrap();

        let stats = fw.stats().unwrap();
        assert_eq!(stats.total_simulations, 3);
        assert_eq!(stats.total_victories, 2);
        assert_eq!(stats.global_win_rate, 67);
        assert_eq!(stats.unique_players, 1);
        assert!(!stats.ai_enabled);
        assert_eq!(stats.scenarios[0].win_rate, 66.7);
    }

    #[tokio::test]
    async fn test_recommend_reports_advisor_status() {
        let fw = flywheel();
        let rec = fw
            .recommend(&RecommendQuery {
                map: "gaza".to_string(),
                enemy: "army".to_string(),
                budget: 2_000_000,
            })
            .await;
        assert!(!rec.enriched);
        assert_eq!(rec.advisor_status.as_deref(), Some("not_configured"));
        assert_eq!(rec.error, None);
    }

    #[test]
    fn test_rebuild_restores_aggregates() {
        let fw = flywheel();
        for result in ["victory", "victory", "defeat"] {
            fw.ingest(&payload("p", result)).unwrap();
        }
        let before = fw.store().list_aggregates().unwrap();
        fw.store().replace_aggregates(&[]).unwrap();

        let report = fw.rebuild().unwrap();
        assert_eq!(report.battles, 3);
        assert_eq!(report.scenarios, 1);
        assert_eq!(report.patterns, 1);

        let after = fw.store().list_aggregates().unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].total_battles, before[0].total_battles);
        assert_eq!(after[0].victories, before[0].victories);
    }
}
