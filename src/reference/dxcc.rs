// DXCC entity records
// Source: ARRL DXCC List (https://www.arrl.org/country-lists-prefixes)
//
// The catalog file is the ARRL JSON export. Field names there are PascalCase
// and a few fields come in more than one shape (EntityId as number or string,
// Prefixes as a single string or a list), so the raw records are decoded
// through small untagged helpers and then normalized into `Entity`.
//
// Fields:
// - id: ARRL DXCC entity number, rendered as a 3-digit string ("001" = Canada)
// - name: Official ARRL entity name (unique among active entities only)
// - continent: Two-letter continent code (NA, SA, EU, AF, AS, OC, AN)
// - cq_zones / itu_zones: zone numbers, opaque to the resolver
// - deleted: retired entity (kept for historical references)
// - canonical_prefixes: prefixes and range patterns as declared by ARRL

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::PrefixError;

/// ARRL DXCC entity number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u16);

impl EntityId {
    /// Largest id that fits the 3-digit canonical form
    pub const MAX: u16 = 999;

    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    /// Parse a 1-3 digit id ("1", "01" or "001")
    ///
    /// Used for the catalog and legacy inputs, which predate the fixed-width
    /// contract. The rule-set file goes through the strict `FromStr`.
    pub fn parse_lenient(s: &str) -> Result<Self, PrefixError> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 3 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrefixError::InvalidEntityId(s.to_string()));
        }
        trimmed
            .parse::<u16>()
            .map(Self)
            .map_err(|_| PrefixError::InvalidEntityId(s.to_string()))
    }

    pub fn from_number(n: u64) -> Result<Self, PrefixError> {
        if n > Self::MAX as u64 {
            return Err(PrefixError::InvalidEntityId(n.to_string()));
        }
        Ok(Self(n as u16))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Strict parse: exactly three ASCII digits
impl FromStr for EntityId {
    type Err = PrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 3 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(PrefixError::InvalidEntityId(s.to_string()));
        }
        s.parse::<u16>()
            .map(Self)
            .map_err(|_| PrefixError::InvalidEntityId(s.to_string()))
    }
}

impl Serialize for EntityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Entity id as found in older files: a bare number or a numeric string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LooseEntityId {
    Number(u64),
    Text(String),
}

impl LooseEntityId {
    pub fn resolve(&self) -> Result<EntityId, PrefixError> {
        match self {
            LooseEntityId::Number(n) => EntityId::from_number(*n),
            LooseEntityId::Text(s) => EntityId::parse_lenient(s),
        }
    }
}

/// A DXCC entity from the authoritative catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub continent: Option<String>,
    pub cq_zones: Vec<u8>,
    pub itu_zones: Vec<u8>,
    pub deleted: bool,
    /// None when ARRL has no prefix on file for the entity
    pub canonical_prefixes: Option<Vec<String>>,
}

impl Entity {
    pub fn is_active(&self) -> bool {
        !self.deleted
    }

    /// Canonical prefixes, empty when none are on file
    pub fn prefixes(&self) -> &[String] {
        self.canonical_prefixes.as_deref().unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ZoneField {
    Number(u8),
    Numbers(Vec<u8>),
    Text(String),
}

impl ZoneField {
    fn into_zones(self) -> Vec<u8> {
        match self {
            ZoneField::Number(z) => vec![z],
            ZoneField::Numbers(zs) => zs,
            ZoneField::Text(s) => s
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
        }
    }
}

/// One record of the ARRL catalog export
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct CatalogRecord {
    entity_id: LooseEntityId,
    name: String,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    continent: Option<String>,
    #[serde(default)]
    cq_zones: Option<ZoneField>,
    #[serde(default)]
    itu_zones: Option<ZoneField>,
    #[serde(default)]
    prefixes: Option<OneOrMany>,
}

impl CatalogRecord {
    pub(crate) fn into_entity(self) -> Result<Entity, PrefixError> {
        let id = self.entity_id.resolve()?;
        let canonical_prefixes = self.prefixes.map(|p| match p {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        });
        let canonical_prefixes = canonical_prefixes.map(|list| {
            list.into_iter()
                .map(|p| p.trim().to_uppercase())
                .filter(|p| !p.is_empty())
                .collect::<Vec<_>>()
        });

        Ok(Entity {
            id,
            name: self.name.trim().to_string(),
            continent: self.continent.filter(|c| !c.trim().is_empty()),
            cq_zones: self.cq_zones.map(ZoneField::into_zones).unwrap_or_default(),
            itu_zones: self.itu_zones.map(ZoneField::into_zones).unwrap_or_default(),
            deleted: self.deleted,
            canonical_prefixes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_canonical_form() {
        assert_eq!(EntityId::new(1).to_string(), "001");
        assert_eq!(EntityId::new(291).to_string(), "291");
        assert_eq!("001".parse::<EntityId>().unwrap(), EntityId::new(1));
        assert!("1".parse::<EntityId>().is_err());
        assert!("0012".parse::<EntityId>().is_err());
        assert!("A01".parse::<EntityId>().is_err());
    }

    #[test]
    fn test_entity_id_lenient() {
        assert_eq!(EntityId::parse_lenient("1").unwrap(), EntityId::new(1));
        assert_eq!(EntityId::parse_lenient(" 047 ").unwrap(), EntityId::new(47));
        assert!(EntityId::parse_lenient("").is_err());
        assert!(EntityId::from_number(1000).is_err());
    }

    #[test]
    fn test_entity_id_serde() {
        let json = serde_json::to_string(&EntityId::new(13)).unwrap();
        assert_eq!(json, "\"013\"");
        let id: EntityId = serde_json::from_str("\"339\"").unwrap();
        assert_eq!(id.get(), 339);
        assert!(serde_json::from_str::<EntityId>("339").is_err());
    }

    #[test]
    fn test_catalog_record_shapes() {
        let json = r#"[
            {"EntityId": "001", "Name": "Canada", "Continent": "NA", "CqZones": [1, 2, 3], "ItuZones": "2,3,4", "Prefixes": ["VE", "VA-VG"]},
            {"EntityId": 13, "Name": "Antarctica", "Prefixes": "CE9"},
            {"EntityId": "7", "Name": "Aldabra", "Deleted": true}
        ]"#;
        let records: Vec<CatalogRecord> = serde_json::from_str(json).unwrap();
        let entities: Vec<Entity> = records.into_iter().map(|r| r.into_entity().unwrap()).collect();

        assert_eq!(entities[0].cq_zones, vec![1, 2, 3]);
        assert_eq!(entities[0].itu_zones, vec![2, 3, 4]);
        assert_eq!(entities[0].prefixes(), &["VE".to_string(), "VA-VG".to_string()]);
        assert_eq!(entities[1].id, EntityId::new(13));
        assert_eq!(entities[1].prefixes(), &["CE9".to_string()]);
        assert!(entities[1].continent.is_none());
        assert!(entities[2].deleted);
        assert!(entities[2].canonical_prefixes.is_none());
        assert!(entities[2].prefixes().is_empty());
    }
}
