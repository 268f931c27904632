//! Deployment Recorder: one `UnitDeployment` per allied unit.

use std::collections::HashMap;

use super::payload::{AllyState, PositionOverride};
use crate::types::{Position, UnitCategory, UnitDeployment};

/// Extract deployments from the allied unit states.
///
/// The start position is the unit's `initialPositions` entry when present,
/// otherwise its own x/y. Deployments are not tied to a battle yet
/// (`battle_id = 0`); the store assigns the owner inside the write.
pub fn record_deployments(
    allies: &[AllyState],
    initial_positions: &HashMap<String, PositionOverride>,
) -> Vec<UnitDeployment> {
    allies
        .iter()
        .enumerate()
        .map(|(index, ally)| {
            let unit_id = ally.id_key().unwrap_or_else(|| format!("unit-{index}"));

            let start = initial_positions.get(&unit_id).map_or(
                Position {
                    x: ally.x.unwrap_or(0.0),
                    y: ally.y.unwrap_or(0.0),
                },
                |p| Position { x: p.x, y: p.y },
            );

            UnitDeployment {
                battle_id: 0,
                name: ally
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .unwrap_or("Unknown")
                    .to_string(),
                category: UnitCategory::parse_or_default(ally.category.as_deref()),
                cost: non_negative_u64(ally.cost),
                start,
                survived: ally.is_alive(),
                kills: u32::try_from(non_negative_u64(ally.kills)).unwrap_or(u32::MAX),
                damage_dealt: ally.damage_dealt.unwrap_or(0.0).max(0.0),
                unit_id,
            }
        })
        .collect()
}

/// Round a loosely-typed number to a non-negative integer (missing → 0)
pub(crate) fn non_negative_u64(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}
