// Legacy prefix rules
//
// Rules from the old hand-written table (resources/legacy_prefix_rules.json)
// or from a previously published rule set. Their entity ids are not trusted:
// the label is re-resolved against the catalog and the id is only a fallback.
// The old table wrote ids as bare integers, so both forms are accepted here.

use serde::Deserialize;
use std::path::Path;

use crate::error::Result;
use crate::reference::dxcc::LooseEntityId;
use crate::reference::prefixes::PrefixRule;

/// Historical table shipped with the crate
pub const BUNDLED_LEGACY_RULES: &str = include_str!("../../resources/legacy_prefix_rules.json");

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRule {
    pub prefix: String,
    pub entity_id: LooseEntityId,
    #[serde(default)]
    pub exact: bool,
    #[serde(default)]
    pub priority: i32,
    /// Free-text entity label used to re-resolve the id
    #[serde(default)]
    pub comment: String,
}

impl From<&PrefixRule> for LegacyRule {
    fn from(rule: &PrefixRule) -> Self {
        Self {
            prefix: rule.prefix.clone(),
            entity_id: LooseEntityId::Text(rule.entity_id().to_string()),
            exact: rule.exact,
            priority: rule.priority,
            comment: rule.comment.clone(),
        }
    }
}

pub fn legacy_rules_from_json_str(json: &str) -> Result<Vec<LegacyRule>> {
    Ok(serde_json::from_str(json)?)
}

pub fn load_legacy_rules(path: impl AsRef<Path>) -> Result<Vec<LegacyRule>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let rules = legacy_rules_from_json_str(&json)?;
    log::info!("Loaded {} legacy rules from {}", rules.len(), path.display());
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::dxcc::EntityId;

    #[test]
    fn test_both_id_forms() {
        let rules = legacy_rules_from_json_str(
            r#"[
                {"prefix": "KH6", "entity_id": 110, "exact": false, "priority": 30, "comment": "Hawaii"},
                {"prefix": "VE", "entity_id": "001", "priority": 10}
            ]"#,
        )
        .unwrap();
        assert_eq!(rules[0].entity_id.resolve().unwrap(), EntityId::new(110));
        assert_eq!(rules[1].entity_id.resolve().unwrap(), EntityId::new(1));
        assert_eq!(rules[1].comment, "");
        assert!(!rules[1].exact);
    }

    #[test]
    fn test_from_published_rule() {
        let rule = PrefixRule::new("VP8F", EntityId::new(141), 60).with_comment("Falkland Is.");
        let legacy = LegacyRule::from(&rule);
        assert_eq!(legacy.entity_id.resolve().unwrap(), EntityId::new(141));
        assert_eq!(legacy.comment, "Falkland Is.");
        assert_eq!(legacy.priority, 60);
    }

    #[test]
    fn test_bundled_legacy_rules_parse() {
        let rules = legacy_rules_from_json_str(BUNDLED_LEGACY_RULES).unwrap();
        assert!(rules.len() > 100);
        assert!(rules.iter().all(|r| r.entity_id.resolve().is_ok()));
    }
}
