//! Composition Signature
//!
//! Canonical, order-independent key of a unit composition. Deployments are
//! reduced to a sorted multiset of (category, name) pairs and rendered as
//! `category:name*count` entries joined by `;`.

use std::collections::BTreeMap;

use crate::types::{CompositionEntry, UnitCategory, UnitDeployment};

/// Reduce deployments to their canonical composition (sorted, counted).
pub fn composition(deployments: &[UnitDeployment]) -> Vec<CompositionEntry> {
    let mut counts: BTreeMap<(UnitCategory, &str), u32> = BTreeMap::new();
    for d in deployments {
        *counts.entry((d.category, d.name.as_str())).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((category, name), count)| CompositionEntry {
            category,
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Render a canonical composition as its signature string.
pub fn render(composition: &[CompositionEntry]) -> String {
    composition
        .iter()
        .map(|e| format!("{}:{}*{}", e.category, escape(&e.name), e.count))
        .collect::<Vec<_>>()
        .join(";")
}

/// Signature of a set of deployments.
pub fn signature(deployments: &[UnitDeployment]) -> String {
    render(&composition(deployments))
}

// Unit names are free text; escape the separators so distinct
// compositions never render to the same string.
fn escape(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if matches!(c, '\\' | ';' | ':' | '*') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn unit(category: UnitCategory, name: &str) -> UnitDeployment {
        UnitDeployment {
            battle_id: 0,
            unit_id: String::new(),
            name: name.to_string(),
            category,
            cost: 0,
            start: Position::default(),
            survived: true,
            kills: 0,
            damage_dealt: 0.0,
        }
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = vec![
            unit(UnitCategory::Attack, "Switchblade 600"),
            unit(UnitCategory::Recon, "RQ-11 Raven"),
            unit(UnitCategory::Attack, "Switchblade 600"),
        ];
        let b = vec![
            unit(UnitCategory::Attack, "Switchblade 600"),
            unit(UnitCategory::Attack, "Switchblade 600"),
            unit(UnitCategory::Recon, "RQ-11 Raven"),
        ];
        assert_eq!(signature(&a), signature(&b));
        assert_eq!(signature(&a), "recon:RQ-11 Raven*1;attack:Switchblade 600*2");
    }

    #[test]
    fn test_multiplicity_matters() {
        let one = vec![unit(UnitCategory::Attack, "Switchblade 300")];
        let two = vec![
            unit(UnitCategory::Attack, "Switchblade 300"),
            unit(UnitCategory::Attack, "Switchblade 300"),
        ];
        assert_ne!(signature(&one), signature(&two));
    }

    #[test]
    fn test_same_name_different_category_differs() {
        let a = vec![unit(UnitCategory::Recon, "Coyote")];
        let b = vec![unit(UnitCategory::Defense, "Coyote")];
        assert_ne!(signature(&a), signature(&b));
    }

    #[test]
    fn test_separators_in_names_are_escaped() {
        let tricky = vec![unit(UnitCategory::Attack, "A*1;attack:B")];
        let plain = vec![
            unit(UnitCategory::Attack, "A"),
            unit(UnitCategory::Attack, "B"),
        ];
        assert_ne!(signature(&tricky), signature(&plain));
        assert_eq!(signature(&tricky), r"attack:A\*1\;attack\:B*1");
    }

    #[test]
    fn test_composition_counts() {
        let comp = composition(&[
            unit(UnitCategory::Recon, "Raven"),
            unit(UnitCategory::Recon, "Raven"),
            unit(UnitCategory::Equip, "Jammer"),
        ]);
        assert_eq!(comp.len(), 2);
        assert_eq!(comp[0].count, 2);
        assert_eq!(comp[1].category, UnitCategory::Equip);
    }
}
