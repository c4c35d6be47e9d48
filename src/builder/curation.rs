// Curated prefix tables
//
// Two hand-maintained lists that the ARRL catalog does not carry:
// - disambiguation: longer prefixes that split a shared short prefix between
//   entities by operator convention (VP8F Falklands, VP8G South Georgia, ...)
// - allocation_blocks: ITU block prefixes that are valid for an entity but not
//   listed as one of its canonical prefixes (AA-AK for the US, ...)
//
// They live in resources/curation.json, versioned separately from the code.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;
use crate::reference::dxcc::EntityId;

/// Curation file shipped with the crate
pub const BUNDLED_CURATION: &str = include_str!("../../resources/curation.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationEntry {
    /// Prefix or range pattern
    pub prefix: String,
    pub entity_id: EntityId,
    #[serde(default)]
    pub comment: String,
}

#[cfg(test)]
impl CurationEntry {
    pub(crate) fn new(prefix: &str, entity_id: u16, comment: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            entity_id: EntityId::new(entity_id),
            comment: comment.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurationTables {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub disambiguation: Vec<CurationEntry>,
    #[serde(default)]
    pub allocation_blocks: Vec<CurationEntry>,
}

impl CurationTables {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let mut tables: CurationTables = serde_json::from_str(json)?;
        for entry in tables
            .disambiguation
            .iter_mut()
            .chain(tables.allocation_blocks.iter_mut())
        {
            entry.prefix = entry.prefix.trim().to_uppercase();
        }
        Ok(tables)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let tables = Self::from_json_str(&json)?;
        log::info!(
            "Loaded curation tables {} from {} ({} disambiguation, {} allocation blocks)",
            tables.version,
            path.display(),
            tables.disambiguation.len(),
            tables.allocation_blocks.len()
        );
        Ok(tables)
    }

    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_CURATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_tables_parse() {
        let tables = CurationTables::bundled().unwrap();
        assert!(!tables.version.is_empty());
        assert!(!tables.disambiguation.is_empty());
        assert!(!tables.allocation_blocks.is_empty());
        assert!(tables
            .disambiguation
            .iter()
            .any(|e| e.prefix == "VP8F" && e.entity_id == EntityId::new(141)));
        assert!(tables
            .allocation_blocks
            .iter()
            .all(|e| !e.prefix.is_empty()));
    }

    #[test]
    fn test_prefixes_normalized() {
        let tables = CurationTables::from_json_str(
            r#"{"version": "t", "disambiguation": [{"prefix": " vp8f ", "entity_id": "141"}]}"#,
        )
        .unwrap();
        assert_eq!(tables.disambiguation[0].prefix, "VP8F");
        assert!(tables.allocation_blocks.is_empty());
        assert_eq!(tables.disambiguation[0].comment, "");
    }

    #[test]
    fn test_integer_entity_id_rejected() {
        let json = r#"{"disambiguation": [{"prefix": "VP8F", "entity_id": 141}]}"#;
        assert!(CurationTables::from_json_str(json).is_err());
    }
}
