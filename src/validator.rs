// Rule set validation against the authoritative catalog
//
// Hard failures: a rule pointing at an id the catalog does not know, or the
// same (prefix, entity) pair twice (a builder defect). Everything else is a
// warning: deleted entities, labels that drifted from the ARRL name, coverage
// gaps, unexpanded ranges.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::reference::catalog::EntityCatalog;
use crate::reference::dxcc::EntityId;
use crate::reference::prefixes::{coverage_percent, RuleSet};
use crate::reference::ranges::is_range_pattern;

/// A prefix that maps to more than one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SharedPrefix {
    pub prefix: String,
    pub entity_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentCoverage {
    pub continent: String,
    pub covered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub total_rules: usize,
    pub unique_prefixes: usize,
    pub entities_covered: usize,
    pub active_entities: usize,
    pub coverage_percent: f64,
    /// Active entities no rule references
    pub missing_entities: Vec<EntityId>,
    /// Informational; shared prefixes are expected for ambiguous regions
    pub shared_prefixes: Vec<SharedPrefix>,
    pub by_continent: Vec<ContinentCoverage>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }
}

pub struct RuleValidator<'a> {
    catalog: &'a EntityCatalog,
}

impl<'a> RuleValidator<'a> {
    pub fn new(catalog: &'a EntityCatalog) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, rule_set: &RuleSet) -> ValidationReport {
        let mut diagnostics = Vec::new();
        let active = self.catalog.active_ids();
        let mut covered = BTreeSet::new();

        for rule in &rule_set.rules {
            let id = rule.entity_id();

            if is_range_pattern(&rule.prefix) {
                diagnostics.push(
                    Diagnostic::warning(DiagnosticKind::RangeExpansionFailure, "prefix is an unexpanded range")
                        .with_prefix(rule.prefix.as_str())
                        .with_entity(id),
                );
            }

            let entity = match self.catalog.lookup_by_id(id) {
                Some(entity) => entity,
                None => {
                    diagnostics.push(
                        Diagnostic::error(DiagnosticKind::MissingEntity, "entity id does not exist")
                            .with_prefix(rule.prefix.as_str())
                            .with_entity(id),
                    );
                    continue;
                }
            };

            if entity.deleted {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::DeletedEntity,
                        format!("{} is a deleted entity", entity.name),
                    )
                    .with_prefix(rule.prefix.as_str())
                    .with_entity(id),
                );
            } else {
                covered.insert(id);
            }

            if !rule.comment.is_empty() && !names_agree(&rule.comment, &entity.name) {
                diagnostics.push(
                    Diagnostic::warning(
                        DiagnosticKind::NameMismatch,
                        format!("comment '{}' doesn't match entity '{}'", rule.comment, entity.name),
                    )
                    .with_prefix(rule.prefix.as_str())
                    .with_entity(id),
                );
            }

            for alt in rule.target.alternatives() {
                if !self.catalog.contains(*alt) {
                    diagnostics.push(
                        Diagnostic::warning(
                            DiagnosticKind::MissingEntity,
                            format!("alternative {} does not exist", alt),
                        )
                        .with_prefix(rule.prefix.as_str())
                        .with_entity(id),
                    );
                }
            }
        }

        // Exact pair duplicates mean the builder's dedup failed
        let mut seen = HashSet::new();
        for rule in &rule_set.rules {
            if !seen.insert((rule.prefix.as_str(), rule.entity_id())) {
                diagnostics.push(
                    Diagnostic::error(DiagnosticKind::DuplicateRule, "duplicate (prefix, entity) pair")
                        .with_prefix(rule.prefix.as_str())
                        .with_entity(rule.entity_id()),
                );
            }
        }

        let mut by_prefix: BTreeMap<&str, BTreeSet<EntityId>> = BTreeMap::new();
        for rule in &rule_set.rules {
            by_prefix.entry(rule.prefix.as_str()).or_default().insert(rule.entity_id());
        }
        let unique_prefixes = by_prefix.len();
        let shared_prefixes: Vec<SharedPrefix> = by_prefix
            .into_iter()
            .filter(|(_, ids)| ids.len() > 1)
            .map(|(prefix, ids)| SharedPrefix {
                prefix: prefix.to_string(),
                entity_ids: ids.into_iter().collect(),
            })
            .collect();

        let missing_entities: Vec<EntityId> = active.difference(&covered).copied().collect();
        for id in &missing_entities {
            let name = self
                .catalog
                .lookup_by_id(*id)
                .map(|e| e.name.as_str())
                .unwrap_or_default();
            diagnostics.push(
                Diagnostic::warning(DiagnosticKind::CoverageGap, format!("no rule for {}", name))
                    .with_entity(*id),
            );
        }

        let by_continent = self.continent_coverage(&covered);
        let passed = !diagnostics.iter().any(Diagnostic::is_error);

        let report = ValidationReport {
            passed,
            total_rules: rule_set.rules.len(),
            unique_prefixes,
            entities_covered: covered.len(),
            active_entities: active.len(),
            coverage_percent: coverage_percent(covered.len(), active.len()),
            missing_entities,
            shared_prefixes,
            by_continent,
            diagnostics,
        };

        log::info!(
            "Validation {}: {} rules, coverage {}/{} ({}%), {} errors, {} warnings",
            if report.passed { "passed" } else { "FAILED" },
            report.total_rules,
            report.entities_covered,
            report.active_entities,
            report.coverage_percent,
            report.error_count(),
            report.warnings().count()
        );
        report
    }

    fn continent_coverage(&self, covered: &BTreeSet<EntityId>) -> Vec<ContinentCoverage> {
        let mut totals: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for entity in self.catalog.active_entities() {
            let continent = entity.continent.clone().unwrap_or_else(|| "Unknown".to_string());
            let slot = totals.entry(continent).or_default();
            slot.1 += 1;
            if covered.contains(&entity.id) {
                slot.0 += 1;
            }
        }
        totals
            .into_iter()
            .map(|(continent, (covered, total))| ContinentCoverage {
                continent,
                covered,
                total,
            })
            .collect()
    }
}

/// Case-insensitive containment either way
fn names_agree(comment: &str, name: &str) -> bool {
    let comment = comment.to_lowercase();
    let name = name.to_lowercase();
    comment.contains(&name) || name.contains(&comment)
}
