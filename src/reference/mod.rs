// Reference data module - authoritative DXCC and prefix data
// Source: ARRL DXCC List and ITU Radio Regulations
// NOT dependent on CTY.DAT
//
// Data Population Strategy (per ADIF 3.1.4):
// - Callsign prefix lookup provides: DXCC, COUNTRY, CQZ, ITUZ, CONT
// - STATE is NOT derived from prefix (portable operators may be elsewhere)

pub mod catalog;
pub mod dxcc;
pub mod prefixes;
pub mod ranges;
pub mod resolver;

pub use catalog::{EntityCatalog, MatchMethod, NameMatch};
pub use dxcc::{Entity, EntityId};
pub use prefixes::{PrefixRule, RuleSet, RuleStats, RuleTarget};
pub use ranges::{expand_range, RangeError};
pub use resolver::{Resolution, Resolver};

/// Complete callsign lookup result
/// Per ADIF 3.1.4: These fields can be derived from callsign prefix
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallsignLookup {
    pub dxcc: Option<EntityId>,
    pub country: Option<String>,
    pub continent: Option<String>,
    pub cqz: Option<u8>,
    pub ituz: Option<u8>,
    /// Other entities sharing the matched prefix, if it is ambiguous
    pub alternatives: Vec<EntityId>,
}

/// Look up a callsign and return full entity information
///
/// Zones are the entity's first listed CQ/ITU zone; entities spanning
/// several zones need the operator's location to be exact.
pub fn lookup_call_full(resolver: &Resolver, catalog: &EntityCatalog, call: &str) -> CallsignLookup {
    let rule = match resolver.resolve(call) {
        Resolution::Matched(rule) => rule,
        Resolution::NoMatch => return CallsignLookup::default(),
    };

    let alternatives = rule.target.alternatives().to_vec();
    match catalog.lookup_by_id(rule.entity_id()) {
        Some(entity) => CallsignLookup {
            dxcc: Some(entity.id),
            country: Some(entity.name.clone()),
            continent: entity.continent.clone(),
            cqz: entity.cq_zones.first().copied(),
            ituz: entity.itu_zones.first().copied(),
            alternatives,
        },
        // Rule points outside this catalog snapshot
        None => {
            log::warn!("Prefix {} maps to {} which is not in the catalog", rule.prefix, rule.entity_id());
            CallsignLookup {
                dxcc: Some(rule.entity_id()),
                alternatives,
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> (Resolver, EntityCatalog) {
        let catalog = EntityCatalog::from_json_str(
            r#"[
                {"EntityId": "291", "Name": "United States of America", "Continent": "NA", "CqZones": [3, 4, 5], "ItuZones": [6, 7, 8], "Prefixes": ["K", "W", "N"]},
                {"EntityId": "110", "Name": "Hawaii", "Continent": "OC", "CqZones": 31, "ItuZones": 61, "Prefixes": "KH6"}
            ]"#,
        )
        .unwrap();
        let mut rule_set = RuleSet::empty();
        rule_set.rules = vec![
            PrefixRule::new("K", EntityId::new(291), 20),
            PrefixRule::new("KH6", EntityId::new(110), 40),
            PrefixRule::new("KH9", EntityId::new(297), 40),
        ];
        (Resolver::new(rule_set), catalog)
    }

    #[test]
    fn test_lookup_call_full() {
        let (resolver, catalog) = fixture();
        let hawaii = lookup_call_full(&resolver, &catalog, "kh6abc");
        assert_eq!(hawaii.dxcc, Some(EntityId::new(110)));
        assert_eq!(hawaii.country.as_deref(), Some("Hawaii"));
        assert_eq!(hawaii.continent.as_deref(), Some("OC"));
        assert_eq!(hawaii.cqz, Some(31));
        assert_eq!(hawaii.ituz, Some(61));

        let us = lookup_call_full(&resolver, &catalog, "K5ABC");
        assert_eq!(us.cqz, Some(3));
        assert!(us.alternatives.is_empty());
    }

    #[test]
    fn test_lookup_call_full_unknown_entity_and_miss() {
        let (resolver, catalog) = fixture();
        let wake = lookup_call_full(&resolver, &catalog, "KH9AA");
        assert_eq!(wake.dxcc, Some(EntityId::new(297)));
        assert!(wake.country.is_none());

        assert_eq!(lookup_call_full(&resolver, &catalog, "JA1ABC"), CallsignLookup::default());
    }
}
