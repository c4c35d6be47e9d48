// Prefix to DXCC Entity mapping
// Source: ITU Radio Regulations and ARRL prefix assignments
//
// A RuleSet is the published prefix table: built offline by the builder,
// written once as JSON and loaded read-only by the resolver and validator.
// Entity ids in the file are always the 3-digit string form ("001").

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use super::catalog::EntityCatalog;
use super::dxcc::EntityId;
use super::ranges::is_range_pattern;
use crate::error::{PrefixError, Result};

/// Which entity a rule resolves to
///
/// Some prefixes are legitimately shared by several entities. The rule then
/// names a default and keeps the others as hints for disambiguation tools;
/// the resolver only ever returns the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleTarget {
    Unambiguous(EntityId),
    Ambiguous {
        default: EntityId,
        alternatives: Vec<EntityId>,
    },
}

impl RuleTarget {
    pub fn entity_id(&self) -> EntityId {
        match self {
            RuleTarget::Unambiguous(id) => *id,
            RuleTarget::Ambiguous { default, .. } => *default,
        }
    }

    pub fn alternatives(&self) -> &[EntityId] {
        match self {
            RuleTarget::Unambiguous(_) => &[],
            RuleTarget::Ambiguous { alternatives, .. } => alternatives,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, RuleTarget::Ambiguous { .. })
    }
}

/// A prefix rule for matching callsigns to DXCC entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RuleRecord", into = "RuleRecord")]
pub struct PrefixRule {
    /// The prefix (e.g., "W", "VE", "VP8F"), never a range pattern
    pub prefix: String,
    pub target: RuleTarget,
    /// Breaks ties between rules of equal prefix length (higher wins)
    pub priority: i32,
    /// Match only a callsign equal to `prefix`
    pub exact: bool,
    /// Informational label, never used for matching
    pub comment: String,
}

impl PrefixRule {
    pub fn new(prefix: impl Into<String>, entity_id: EntityId, priority: i32) -> Self {
        Self {
            prefix: prefix.into(),
            target: RuleTarget::Unambiguous(entity_id),
            priority,
            exact: false,
            comment: String::new(),
        }
    }

    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn entity_id(&self) -> EntityId {
        self.target.entity_id()
    }

    /// Whether the rule applies to an (already upper-cased) callsign
    pub fn matches(&self, call: &str) -> bool {
        if self.exact {
            call == self.prefix
        } else {
            call.starts_with(self.prefix.as_str())
        }
    }
}

/// Flat JSON shape of a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RuleRecord {
    prefix: String,
    entity_id: EntityId,
    priority: i32,
    #[serde(default)]
    exact: bool,
    #[serde(default)]
    comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ambiguous: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    alternatives: Vec<EntityId>,
}

impl TryFrom<RuleRecord> for PrefixRule {
    type Error = PrefixError;

    fn try_from(record: RuleRecord) -> Result<Self> {
        // Stored upper-case so it compares against the normalized callsign
        let prefix = record.prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() {
            return Err(PrefixError::InvalidRule {
                prefix: record.prefix,
                reason: "empty prefix".to_string(),
            });
        }
        let target = if record.ambiguous == Some(true) || !record.alternatives.is_empty() {
            RuleTarget::Ambiguous {
                default: record.entity_id,
                alternatives: record.alternatives,
            }
        } else {
            RuleTarget::Unambiguous(record.entity_id)
        };
        Ok(PrefixRule {
            prefix,
            target,
            priority: record.priority,
            exact: record.exact,
            comment: record.comment,
        })
    }
}

impl From<PrefixRule> for RuleRecord {
    fn from(rule: PrefixRule) -> Self {
        let (entity_id, ambiguous, alternatives) = match rule.target {
            RuleTarget::Unambiguous(id) => (id, None, Vec::new()),
            RuleTarget::Ambiguous { default, alternatives } => (default, Some(true), alternatives),
        };
        RuleRecord {
            prefix: rule.prefix,
            entity_id,
            priority: rule.priority,
            exact: rule.exact,
            comment: rule.comment,
            ambiguous,
            alternatives,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleStats {
    pub total_rules: usize,
    pub entities_covered: usize,
    pub active_entities: usize,
    pub coverage_percent: f64,
}

impl RuleStats {
    /// Count rules and active-entity coverage against a catalog
    pub fn compute(rules: &[PrefixRule], catalog: &EntityCatalog) -> Self {
        let active = catalog.active_ids();
        let covered: BTreeSet<EntityId> = rules
            .iter()
            .map(PrefixRule::entity_id)
            .filter(|id| active.contains(id))
            .collect();
        Self {
            total_rules: rules.len(),
            entities_covered: covered.len(),
            active_entities: active.len(),
            coverage_percent: coverage_percent(covered.len(), active.len()),
        }
    }
}

/// Percentage rounded to one decimal; 100.0 when there is nothing to cover
pub fn coverage_percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (1000.0 * covered as f64 / total as f64).round() / 10.0
}

/// Published prefix table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub version: String,
    /// RFC 3339 build timestamp
    pub generated: String,
    pub source: String,
    pub authority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub stats: RuleStats,
    pub rules: Vec<PrefixRule>,
}

impl RuleSet {
    /// A rule set with no rules; every lookup against it is a miss
    pub fn empty() -> Self {
        Self {
            version: String::new(),
            generated: String::new(),
            source: String::new(),
            authority: String::new(),
            note: None,
            stats: RuleStats {
                total_rules: 0,
                entities_covered: 0,
                active_entities: 0,
                coverage_percent: 100.0,
            },
            rules: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let rule_set: RuleSet = serde_json::from_str(json)?;
        if let Some(bad) = rule_set.rules.iter().find(|r| is_range_pattern(&r.prefix)) {
            log::warn!("Rule set {} contains unexpanded range '{}'", rule_set.version, bad.prefix);
        }
        Ok(rule_set)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let rule_set = Self::from_json_str(&json)?;
        log::info!(
            "Loaded {} prefix rules (version {}) from {}",
            rule_set.rules.len(),
            rule_set.version,
            path.display()
        );
        Ok(rule_set)
    }

    /// Write to a sibling temp file and rename it over `path`
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        let mut json = self.to_json_pretty()?;
        json.push('\n');
        std::fs::write(&tmp, json)?;
        if let Err(e) = std::fs::rename(&tmp, path) {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                log::warn!("Could not remove {}: {}", tmp.display(), cleanup);
            }
            return Err(e.into());
        }
        log::info!("Wrote {} prefix rules to {}", self.rules.len(), path.display());
        Ok(())
    }

    /// Get all prefixes for a given entity
    pub fn prefixes_for_entity(&self, entity_id: EntityId) -> Vec<&str> {
        self.rules
            .iter()
            .filter(|rule| rule.entity_id() == entity_id)
            .map(|rule| rule.prefix.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "2.0.0",
        "generated": "2025-01-01T00:00:00Z",
        "source": "test",
        "authority": "test",
        "stats": {"total_rules": 3, "entities_covered": 2, "active_entities": 2, "coverage_percent": 100.0},
        "rules": [
            {"prefix": "VP8", "entity_id": "013", "priority": 40, "exact": false, "comment": "Antarctica",
             "ambiguous": true, "alternatives": ["141", "235"]},
            {"prefix": "VP8F", "entity_id": "141", "priority": 60, "exact": false, "comment": "Falkland Is."},
            {"prefix": "4U1UN", "entity_id": "289", "priority": 70, "exact": true, "comment": "United Nations HQ"}
        ]
    }"#;

    #[test]
    fn test_parse_rule_set() {
        let rs = RuleSet::from_json_str(SAMPLE).unwrap();
        assert_eq!(rs.rules.len(), 3);
        assert_eq!(
            rs.rules[0].target,
            RuleTarget::Ambiguous {
                default: EntityId::new(13),
                alternatives: vec![EntityId::new(141), EntityId::new(235)],
            }
        );
        assert_eq!(rs.rules[1].target, RuleTarget::Unambiguous(EntityId::new(141)));
        assert!(rs.rules[2].exact);
        assert_eq!(rs.prefixes_for_entity(EntityId::new(141)), vec!["VP8F"]);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = PrefixRule::new("VP8F", EntityId::new(141), 60).with_comment("Falkland Is.");
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(value["entity_id"], "141");
        assert_eq!(value["exact"], false);
        assert!(value.get("ambiguous").is_none());
        assert!(value.get("alternatives").is_none());

        let ambiguous = PrefixRule {
            target: RuleTarget::Ambiguous {
                default: EntityId::new(13),
                alternatives: vec![EntityId::new(141)],
            },
            ..PrefixRule::new("VP8", EntityId::new(13), 40)
        };
        let value = serde_json::to_value(&ambiguous).unwrap();
        assert_eq!(value["ambiguous"], true);
        assert_eq!(value["alternatives"][0], "141");
    }

    #[test]
    fn test_bare_integer_entity_id_rejected() {
        let json = r#"{"prefix": "VE", "entity_id": 1, "priority": 30}"#;
        assert!(serde_json::from_str::<PrefixRule>(json).is_err());
        let json = r#"{"prefix": "", "entity_id": "001", "priority": 30}"#;
        assert!(serde_json::from_str::<PrefixRule>(json).is_err());
    }

    #[test]
    fn test_prefix_normalized_on_load() {
        let json = r#"{"prefix": " w ", "entity_id": "291", "priority": 20}"#;
        let rule: PrefixRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.prefix, "W");
        assert!(rule.matches("W1AW"));
    }

    #[test]
    fn test_rule_matching() {
        let exact = PrefixRule::new("4U1UN", EntityId::new(289), 70).exact();
        assert!(exact.matches("4U1UN"));
        assert!(!exact.matches("4U1UNA"));
        let prefix = PrefixRule::new("VE", EntityId::new(1), 30);
        assert!(prefix.matches("VE3ABC"));
        assert!(!prefix.matches("V"));
    }

    #[test]
    fn test_coverage_percent_rounding() {
        assert_eq!(coverage_percent(339, 340), 99.7);
        assert_eq!(coverage_percent(1, 3), 33.3);
        assert_eq!(coverage_percent(0, 0), 100.0);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefix_rules.json");
        let rs = RuleSet::from_json_str(SAMPLE).unwrap();
        rs.save(&path).unwrap();
        let loaded = RuleSet::load(&path).unwrap();
        assert_eq!(loaded, rs);
        assert!(!dir.path().join("prefix_rules.json.tmp").exists());
    }

    #[test]
    fn test_failed_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // Renaming a file over a non-empty directory fails
        let target = dir.path().join("prefix_rules.json");
        std::fs::create_dir(&target).unwrap();
        std::fs::write(target.join("keep"), "x").unwrap();

        let rs = RuleSet::from_json_str(SAMPLE).unwrap();
        assert!(matches!(rs.save(&target), Err(PrefixError::Io(_))));
        assert!(!dir.path().join("prefix_rules.json.tmp").exists());
    }
}
