//! Sled Store Integration Tests
//!
//! Runs the flywheel against a real sled database in a temp directory.

use serde_json::json;
use std::sync::Arc;

use battlebottle::config::AppConfig;
use battlebottle::storage::{BattleStore, SledStore};
use battlebottle::types::{RecommendQuery, ScenarioKey};
use battlebottle::{BattlePayload, DisabledAdvisor, Flywheel};

fn payload(map: &str, result: &str, budget: u64) -> BattlePayload {
    serde_json::from_value(json!({
        "session_id": "s1",
        "map": map,
        "enemy": "guerrilla",
        "budget": budget,
        "spent": 300_000,
        "result": result,
        "timer": 60,
        "allies": [
            {"id": 1, "name": "RQ-11 Raven", "category": "recon", "hp": 4, "x": 40, "y": 80},
            {"id": 2, "name": "Switchblade 300", "category": "attack", "hp": 4, "kills": 1, "x": 20, "y": 90},
            {"id": 3, "name": "Switchblade 300", "category": "attack", "hp": 0, "x": 22, "y": 90}
        ],
        "enemies": [{"hp": 0}, {"hp": 5}]
    }))
    .unwrap()
}

fn open(dir: &std::path::Path) -> (SledStore, Flywheel) {
    let store = SledStore::open(dir.join("battles.db")).unwrap();
    let flywheel = Flywheel::new(
        Arc::new(store.clone()),
        Arc::new(DisabledAdvisor),
        &AppConfig::default(),
    );
    (store, flywheel)
}

#[tokio::test]
async fn test_history_and_caches_survive_restart() {
    let tmp = tempfile::tempdir().unwrap();

    {
        let (store, fw) = open(tmp.path());
        for result in ["victory", "victory", "defeat"] {
            fw.ingest(&payload("kyiv", result, 4_000_000)).unwrap();
        }
        fw.ingest(&payload("gaza", "victory", 500_000)).unwrap();
        store.flush().unwrap();
    }

    let (store, fw) = open(tmp.path());
    assert_eq!(store.list_battles().unwrap().len(), 4);

    let kyiv = ScenarioKey::new("kyiv", "guerrilla");
    let patterns = store.patterns_for(&kyiv).unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].sample_count, 3);
    assert!(store.patterns_for(&ScenarioKey::new("gaza", "guerrilla")).unwrap().is_empty());

    let rec = fw
        .recommend(&RecommendQuery {
            map: "kyiv".to_string(),
            enemy: "guerrilla".to_string(),
            budget: 4_000_000,
        })
        .await;
    assert_eq!(rec.data_points, 3);
    assert_eq!(rec.confidence, 15);
    assert_eq!(rec.overall_win_rate, 66.7);
    assert_eq!(rec.top_patterns.len(), 1);

    // New ids continue after the reopened history.
    let receipt = fw.ingest(&payload("kyiv", "victory", 4_000_000)).unwrap();
    assert!(receipt.battle_id > 4);
}

#[test]
fn test_rebuild_matches_incremental_aggregates() {
    let tmp = tempfile::tempdir().unwrap();
    let (store, fw) = open(tmp.path());

    for (map, result, budget) in [
        ("kyiv", "victory", 500_000),
        ("kyiv", "defeat", 2_500_000),
        ("gaza", "victory", 9_000_000),
        ("kyiv", "victory", 500_000),
    ] {
        fw.ingest(&payload(map, result, budget)).unwrap();
    }

    let incremental = store.list_aggregates().unwrap();
    let report = fw.rebuild().unwrap();
    let rebuilt = store.list_aggregates().unwrap();

    assert_eq!(report.battles, 4);
    assert_eq!(report.scenarios, 2);
    assert_eq!(report.aggregates, 3);
    assert_eq!(incremental.len(), rebuilt.len());
    for (a, b) in incremental.iter().zip(&rebuilt) {
        assert_eq!(a.key, b.key);
        assert_eq!(a.total_battles, b.total_battles);
        assert_eq!(a.victories, b.victories);
        assert!((a.avg_duration_secs - b.avg_duration_secs).abs() < 1e-9);
    }
}
