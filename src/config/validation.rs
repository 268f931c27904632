//! Config validation: unknown-key detection with Levenshtein suggestions.
//!
//! The raw TOML is first parsed into `toml::Value` and its key tree compared
//! against the known field names. Unknown keys become warnings with a
//! "did you mean?" suggestion; they never break loading.

use std::collections::HashSet;

/// A non-fatal config warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

/// Valid dotted key paths for `AppConfig`.
///
/// Must be kept in sync with the structs in `app_config.rs`.
pub fn known_config_keys() -> HashSet<&'static str> {
    [
        "server",
        "server.addr",
        "server.cors_origins",
        "storage",
        "storage.backend",
        "storage.data_dir",
        "flywheel",
        "flywheel.recompute_window",
        "flywheel.min_samples",
        "flywheel.top_patterns",
        "flywheel.top_units",
        "flywheel.squad_size",
        "flywheel.min_recon",
        "flywheel.min_attack",
        "flywheel.confidence_step",
        "advisor",
        "advisor.enabled",
        "advisor.api_url",
        "advisor.model",
        "advisor.api_key_env",
        "advisor.max_tokens",
        "advisor.debrief_max_tokens",
        "advisor.temperature",
        "advisor.timeout_secs",
        "advisor.debrief_on_submit",
    ]
    .into_iter()
    .collect()
}

/// Recursively collect dotted key paths from a TOML value.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Closest known key within edit distance 3, ties broken alphabetically.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|k| (levenshtein(unknown, k), *k))
        .filter(|(dist, _)| *dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

/// Warnings for every key in `raw_toml` that `AppConfig` does not know.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        // parse errors are reported by serde later
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("window", "window"), 0);
        assert_eq!(levenshtein("min_sampels", "min_samples"), 2);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [flywheel]
            min_samples = 3
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"flywheel".to_string()));
        assert!(keys.contains(&"flywheel.min_samples".to_string()));
    }

    #[test]
    fn test_typo_gets_suggestion() {
        let warnings = validate_unknown_keys(
            r#"
            [flywheel]
            min_sampels = 4
        "#,
        );
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "flywheel.min_sampels");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("flywheel.min_samples"));
    }

    #[test]
    fn test_known_keys_produce_no_warnings() {
        let text = crate::config::AppConfig::default().to_toml().unwrap();
        assert!(validate_unknown_keys(&text).is_empty());
    }
}
