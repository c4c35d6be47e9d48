// Entity catalog - read-only view over one ARRL catalog snapshot
//
// Loaded once per build or validate run and dropped afterwards. Lookup by id
// is authoritative; lookup by name is a best-effort reconciliation aid for
// old hand-written tables whose labels drifted from the ARRL names.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::dxcc::{CatalogRecord, Entity, EntityId};
use crate::error::{PrefixError, Result};

/// Abbreviations seen in hand-written labels, expanded token by token
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("i.", "island"),
    ("i", "island"),
    ("is.", "islands"),
    ("is", "islands"),
    ("isl.", "island"),
    ("rep.", "republic"),
    ("rep", "republic"),
    ("fed.", "federal"),
    ("fed", "federal"),
    ("dem.", "democratic"),
    ("dem", "democratic"),
    ("st.", "saint"),
    ("st", "saint"),
    ("n.", "northern"),
    ("s.", "southern"),
    ("mt.", "mount"),
    ("mt", "mount"),
];

/// How a name query was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMethod {
    /// Lowercased name (or one of its indexed variants) matched directly
    Exact,
    /// Matched after removing punctuation from the query
    Punctuation,
    /// Matched after expanding abbreviations in the query
    Abbreviation,
    /// Query and an indexed name contain one another; may be wrong
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameMatch {
    pub entity_id: EntityId,
    pub method: MatchMethod,
    /// The indexed name variant that matched
    pub matched: String,
}

#[derive(Debug, Clone, Default)]
pub struct EntityCatalog {
    entities: Vec<Entity>,
    by_id: HashMap<EntityId, usize>,
    /// Name variants in catalog order, for the substring scan
    names: Vec<(String, EntityId)>,
    /// Variant -> position in `names`
    name_index: HashMap<String, usize>,
}

impl EntityCatalog {
    /// Build a catalog, rejecting duplicate ids
    pub fn from_entities(entities: Vec<Entity>) -> Result<Self> {
        let mut catalog = Self::default();
        for entity in entities {
            if catalog.by_id.contains_key(&entity.id) {
                return Err(PrefixError::InvalidCatalog(format!(
                    "duplicate entity id {} ({})",
                    entity.id, entity.name
                )));
            }
            let slot = catalog.entities.len();
            catalog.by_id.insert(entity.id, slot);
            catalog.entities.push(entity);
            catalog.index_name(slot);
        }
        Ok(catalog)
    }

    /// Parse the ARRL JSON export (an array of entity records)
    pub fn from_json_str(json: &str) -> Result<Self> {
        let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
        let entities = records
            .into_iter()
            .map(CatalogRecord::into_entity)
            .collect::<Result<Vec<_>>>()?;
        let catalog = Self::from_entities(entities)?;
        log::info!(
            "Loaded {} DXCC entities ({} active)",
            catalog.len(),
            catalog.active_count()
        );
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Loading DXCC catalog from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All entities in catalog order, deleted ones included
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn lookup_by_id(&self, id: EntityId) -> Option<&Entity> {
        self.by_id.get(&id).map(|&i| &self.entities[i])
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn is_active(&self, id: EntityId) -> bool {
        self.lookup_by_id(id).map(Entity::is_active).unwrap_or(false)
    }

    pub fn active_entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(|e| e.is_active())
    }

    /// Active entity ids in ascending order
    pub fn active_ids(&self) -> BTreeSet<EntityId> {
        self.active_entities().map(|e| e.id).collect()
    }

    pub fn active_count(&self) -> usize {
        self.active_entities().count()
    }

    /// Find an entity id by (possibly abbreviated or drifted) name
    pub fn find_by_name(&self, query: &str) -> Option<EntityId> {
        self.find_by_name_detailed(query).map(|m| m.entity_id)
    }

    /// Name lookup that also reports which stage matched
    ///
    /// Stages, first hit wins:
    /// 1. lowercase + trim, looked up among the indexed name variants
    /// 2. punctuation stripped
    /// 3. abbreviations expanded ("I." -> "island", "Rep." -> "republic")
    /// 4. either string contains the other, first variant in catalog order
    ///
    /// Stage 4 can pick the wrong entity for short or generic labels.
    pub fn find_by_name_detailed(&self, query: &str) -> Option<NameMatch> {
        let normalized = normalize_name(query);
        if normalized.is_empty() {
            return None;
        }

        if let Some(m) = self.exact(&normalized, MatchMethod::Exact) {
            return Some(m);
        }

        let cleaned = strip_punctuation(&normalized);
        if let Some(m) = self.exact(&cleaned, MatchMethod::Punctuation) {
            log::debug!("Name '{}' matched after stripping punctuation", query);
            return Some(m);
        }

        for candidate in [expand_abbreviations(&normalized), expand_abbreviations(&cleaned)] {
            if let Some(m) = self.exact(&candidate, MatchMethod::Abbreviation) {
                log::debug!("Name '{}' matched as '{}' after abbreviation expansion", query, candidate);
                return Some(m);
            }
        }

        let hit = self
            .names
            .iter()
            .find(|(name, _)| name.contains(normalized.as_str()) || normalized.contains(name.as_str()));
        match hit {
            Some((name, id)) => {
                log::warn!("Name '{}' matched '{}' ({}) by substring only", query, name, id);
                Some(NameMatch {
                    entity_id: *id,
                    method: MatchMethod::Substring,
                    matched: name.clone(),
                })
            }
            None => {
                log::debug!("Name '{}' matched no catalog entity", query);
                None
            }
        }
    }

    fn exact(&self, key: &str, method: MatchMethod) -> Option<NameMatch> {
        self.name_index.get(key).map(|&i| NameMatch {
            entity_id: self.names[i].1,
            method,
            matched: self.names[i].0.clone(),
        })
    }

    fn index_name(&mut self, slot: usize) {
        let (id, active, variants) = {
            let entity = &self.entities[slot];
            (entity.id, entity.is_active(), name_variants(&entity.name))
        };
        for variant in variants {
            if variant.is_empty() {
                continue;
            }
            match self.name_index.get(&variant) {
                None => {
                    self.name_index.insert(variant.clone(), self.names.len());
                    self.names.push((variant, id));
                }
                Some(&existing) => {
                    // Names are unique among active entities only; an active
                    // entity takes the key over from a retired one.
                    let holder = self.names[existing].1;
                    let holder_deleted = self
                        .lookup_by_id(holder)
                        .map(|e| e.deleted)
                        .unwrap_or(false);
                    if holder_deleted && active {
                        self.names[existing].1 = id;
                    }
                }
            }
        }
    }
}

pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Drop everything that is not a word character or whitespace
fn strip_punctuation(s: &str) -> String {
    let kept: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn expand_abbreviations(s: &str) -> String {
    s.split_whitespace()
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(abbrev, _)| *abbrev == token)
                .map(|(_, full)| *full)
                .unwrap_or(token)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every key a catalog name is indexed under
fn name_variants(name: &str) -> Vec<String> {
    let n = normalize_name(name);
    let candidates = [
        n.replace('.', ""),
        n.replace(' ', ""),
        n.replace('&', "and"),
        n.replace(" and ", " & "),
        expand_abbreviations(&n),
    ];
    let mut variants = vec![n];
    for candidate in candidates {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u16, name: &str, deleted: bool) -> Entity {
        Entity {
            id: EntityId::new(id),
            name: name.to_string(),
            continent: Some("OC".to_string()),
            cq_zones: vec![],
            itu_zones: vec![],
            deleted,
            canonical_prefixes: None,
        }
    }

    fn catalog() -> EntityCatalog {
        EntityCatalog::from_entities(vec![
            entity(35, "Christmas I.", false),
            entity(191, "North Cook Is.", false),
            entity(249, "Trinidad & Tobago", false),
            entity(250, "St. Helena", false),
            entity(7, "Aldabra", true),
            entity(291, "United States of America", false),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup_by_id_and_active() {
        let c = catalog();
        assert_eq!(c.len(), 6);
        assert_eq!(c.active_count(), 5);
        assert_eq!(c.lookup_by_id(EntityId::new(250)).unwrap().name, "St. Helena");
        assert!(c.lookup_by_id(EntityId::new(999)).is_none());
        assert!(c.contains(EntityId::new(7)));
        assert!(!c.is_active(EntityId::new(7)));
        assert!(!c.active_ids().contains(&EntityId::new(7)));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = EntityCatalog::from_entities(vec![entity(1, "Canada", false), entity(1, "Other", false)]);
        assert!(matches!(result, Err(PrefixError::InvalidCatalog(_))));
    }

    #[test]
    fn test_find_exact_and_case() {
        let c = catalog();
        let m = c.find_by_name_detailed("  CHRISTMAS I. ").unwrap();
        assert_eq!(m.entity_id, EntityId::new(35));
        assert_eq!(m.method, MatchMethod::Exact);
        assert_eq!(c.find_by_name("trinidad and tobago"), Some(EntityId::new(249)));
    }

    #[test]
    fn test_find_after_punctuation_strip() {
        let c = catalog();
        let m = c.find_by_name_detailed("St Helena!").unwrap();
        assert_eq!(m.entity_id, EntityId::new(250));
        assert_eq!(m.method, MatchMethod::Punctuation);
    }

    #[test]
    fn test_find_after_abbreviation_expansion() {
        let c = catalog();
        let m = c.find_by_name_detailed("Christmas Isl.").unwrap();
        assert_eq!(m.entity_id, EntityId::new(35));
        assert_eq!(m.method, MatchMethod::Abbreviation);
        assert_eq!(c.find_by_name("Saint Helena"), Some(EntityId::new(250)));
    }

    #[test]
    fn test_find_substring_fallback() {
        let c = catalog();
        let m = c.find_by_name_detailed("United States").unwrap();
        assert_eq!(m.entity_id, EntityId::new(291));
        assert_eq!(m.method, MatchMethod::Substring);
    }

    #[test]
    fn test_find_no_match() {
        let c = catalog();
        assert_eq!(c.find_by_name("Atlantis"), None);
        assert_eq!(c.find_by_name("   "), None);
    }

    #[test]
    fn test_active_entity_takes_name_from_deleted() {
        let c = EntityCatalog::from_entities(vec![
            entity(100, "Sikkim", true),
            entity(200, "Sikkim", false),
        ])
        .unwrap();
        assert_eq!(c.find_by_name("Sikkim"), Some(EntityId::new(200)));
    }

    #[test]
    fn test_from_json_str() {
        let c = EntityCatalog::from_json_str(
            r#"[{"EntityId": "001", "Name": "Canada", "Prefixes": "VE"}]"#,
        )
        .unwrap();
        assert_eq!(c.lookup_by_id(EntityId::new(1)).unwrap().prefixes(), &["VE".to_string()]);
        assert!(EntityCatalog::from_json_str("{}").is_err());
    }
}
