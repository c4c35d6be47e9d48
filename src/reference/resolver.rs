// Callsign resolver
//
// Longest match wins. Exactness, then priority, then table order only break
// ties between rules of the same prefix length; a shorter rule never beats a
// longer one no matter its priority.
//
// The rule set is immutable after load, so a Resolver can be shared across
// threads (Arc<Resolver>) and queried without locking.

use std::cmp::Ordering;

use super::dxcc::EntityId;
use super::prefixes::{PrefixRule, RuleSet};

/// Outcome of a lookup. `NoMatch` is an ordinary answer, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Matched(&'a PrefixRule),
    NoMatch,
}

impl<'a> Resolution<'a> {
    pub fn entity_id(&self) -> Option<EntityId> {
        self.rule().map(PrefixRule::entity_id)
    }

    pub fn rule(&self) -> Option<&'a PrefixRule> {
        match *self {
            Resolution::Matched(rule) => Some(rule),
            Resolution::NoMatch => None,
        }
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Resolution::Matched(_))
    }
}

#[derive(Debug, Clone)]
pub struct Resolver {
    rule_set: RuleSet,
}

impl Resolver {
    pub fn new(rule_set: RuleSet) -> Self {
        log::debug!("Resolver ready with {} rules", rule_set.rules.len());
        Self { rule_set }
    }

    pub fn rule_set(&self) -> &RuleSet {
        &self.rule_set
    }

    pub fn len(&self) -> usize {
        self.rule_set.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_set.rules.is_empty()
    }

    /// Resolve a callsign to its DXCC entity
    ///
    /// The query is trimmed and upper-cased. Portable suffixes ("/P", "/MM")
    /// are not interpreted here.
    pub fn resolve(&self, callsign: &str) -> Resolution<'_> {
        let call = callsign.trim().to_ascii_uppercase();
        if call.is_empty() {
            return Resolution::NoMatch;
        }

        let mut best: Option<&PrefixRule> = None;
        for rule in &self.rule_set.rules {
            if !rule.matches(&call) {
                continue;
            }
            // Strictly better only, so the earliest rule wins a full tie
            let better = match best {
                None => true,
                Some(current) => rank(rule, current) == Ordering::Greater,
            };
            if better {
                best = Some(rule);
            }
        }

        match best {
            Some(rule) => Resolution::Matched(rule),
            None => Resolution::NoMatch,
        }
    }

    /// Shorthand for `resolve(..).entity_id()`
    pub fn resolve_entity(&self, callsign: &str) -> Option<EntityId> {
        self.resolve(callsign).entity_id()
    }
}

/// Order two candidate rules: match length, then exact, then priority
fn rank(a: &PrefixRule, b: &PrefixRule) -> Ordering {
    a.prefix
        .len()
        .cmp(&b.prefix.len())
        .then(a.exact.cmp(&b.exact))
        .then(a.priority.cmp(&b.priority))
}
