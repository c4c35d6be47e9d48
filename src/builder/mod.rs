// Prefix rule builder
//
// Offline pass that merges four sources into one published RuleSet:
// 1. legacy rules, re-resolved against the catalog by label
// 2. catalog prefixes for every active entity the legacy rules missed
// 3. curated disambiguation rules (with a priority bonus)
// 4. curated allocation-block fallbacks, only for prefixes still unclaimed
// then deduplicates on (prefix, entity) and sorts by prefix.
//
// Nothing here aborts: every problem becomes a Diagnostic in the output.

pub mod curation;
pub mod legacy;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::Result;
use crate::reference::catalog::{EntityCatalog, MatchMethod};
use crate::reference::dxcc::{Entity, EntityId};
use crate::reference::prefixes::{PrefixRule, RuleSet, RuleStats, RuleTarget};
use crate::reference::ranges::expand_entry;

pub use curation::{CurationEntry, CurationTables};
pub use legacy::{load_legacy_rules, LegacyRule};

/// Builder settings; every field has a default
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub version: String,
    pub source: String,
    pub authority: String,
    pub note: Option<String>,
    /// Default priority is `base_priority + len(prefix) * priority_per_char`
    pub base_priority: i32,
    pub priority_per_char: i32,
    /// Added to the default priority of curated disambiguation rules
    pub disambiguation_bonus: i32,
    /// Keep reconciled legacy rules that point at a deleted entity
    pub keep_deleted_legacy: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            version: "2.0.0".to_string(),
            source: "ARRL DXCC list + ITU Radio Regulations + operator conventions".to_string(),
            authority: "https://www.arrl.org/files/file/DXCC/Current_Deleted.txt".to_string(),
            note: Some(
                "entity_id uses ARRL 3-digit zero-padded string format (e.g., \"001\" for Canada)"
                    .to_string(),
            ),
            base_priority: 10,
            priority_per_char: 10,
            disambiguation_bonus: 10,
            keep_deleted_legacy: false,
        }
    }
}

impl BuildConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Longer prefixes get higher priority
    pub fn default_priority(&self, prefix: &str) -> i32 {
        let len = i32::try_from(prefix.chars().count()).unwrap_or(i32::MAX);
        self.base_priority
            .saturating_add(len.saturating_mul(self.priority_per_char))
    }
}

/// Result of a build
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub rule_set: RuleSet,
    /// Distinct entity ids referenced by the rules
    pub covered: BTreeSet<EntityId>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct RuleBuilder<'a> {
    catalog: &'a EntityCatalog,
    config: BuildConfig,
    legacy: Vec<LegacyRule>,
    curation: CurationTables,
}

/// Working state threaded through the build phases
#[derive(Default)]
struct Pass {
    rules: Vec<PrefixRule>,
    pairs: HashSet<(String, EntityId)>,
    covered: BTreeSet<EntityId>,
    diagnostics: Vec<Diagnostic>,
}

impl Pass {
    fn push(&mut self, rule: PrefixRule) {
        self.pairs.insert((rule.prefix.clone(), rule.entity_id()));
        self.covered.insert(rule.entity_id());
        self.rules.push(rule);
    }

    fn has_pair(&self, prefix: &str, entity_id: EntityId) -> bool {
        self.pairs.contains(&(prefix.to_string(), entity_id))
    }

    fn warn(&mut self, diagnostic: Diagnostic) {
        log::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }

    /// Expand a prefix entry, flagging ranges that do not expand
    fn expand(&mut self, entry: &str, entity_id: EntityId) -> Vec<String> {
        let (prefixes, failure) = expand_entry(entry);
        if let Some(err) = failure {
            self.warn(
                Diagnostic::warning(DiagnosticKind::RangeExpansionFailure, err.to_string())
                    .with_prefix(entry)
                    .with_entity(entity_id),
            );
        }
        prefixes
    }
}

impl<'a> RuleBuilder<'a> {
    pub fn new(catalog: &'a EntityCatalog) -> Self {
        Self {
            catalog,
            config: BuildConfig::default(),
            legacy: Vec::new(),
            curation: CurationTables::default(),
        }
    }

    pub fn with_config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_legacy_rules(mut self, legacy: Vec<LegacyRule>) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn with_curation(mut self, curation: CurationTables) -> Self {
        self.curation = curation;
        self
    }

    pub fn build(&self) -> BuildOutput {
        self.build_at(Utc::now())
    }

    /// Build with a fixed timestamp; identical inputs give identical output
    pub fn build_at(&self, generated: DateTime<Utc>) -> BuildOutput {
        let mut pass = Pass::default();

        self.reconcile_legacy(&mut pass);
        log::info!(
            "Reconciled {} of {} legacy rules covering {} entities",
            pass.rules.len(),
            self.legacy.len(),
            pass.covered.len()
        );

        let before = pass.rules.len();
        self.fill_coverage_gaps(&mut pass);
        log::info!("Added {} catalog-derived rules", pass.rules.len() - before);

        let before = pass.rules.len();
        self.add_disambiguation(&mut pass);
        log::info!("Added {} disambiguation rules", pass.rules.len() - before);

        let before = pass.rules.len();
        self.add_allocation_blocks(&mut pass);
        log::info!("Added {} allocation-block rules", pass.rules.len() - before);

        let mut rules = dedup_rules(std::mem::take(&mut pass.rules));
        rules.sort_by(|a, b| a.prefix.cmp(&b.prefix).then(b.priority.cmp(&a.priority)));
        annotate_ambiguity(&mut rules);

        let stats = RuleStats::compute(&rules, self.catalog);
        let covered: BTreeSet<EntityId> = rules.iter().map(PrefixRule::entity_id).collect();
        self.report_coverage_gaps(&covered, &mut pass);
        log::info!(
            "Built {} rules, {}/{} active entities covered ({}%)",
            stats.total_rules,
            stats.entities_covered,
            stats.active_entities,
            stats.coverage_percent
        );

        let rule_set = RuleSet {
            version: self.config.version.clone(),
            generated: generated.to_rfc3339_opts(SecondsFormat::Secs, true),
            source: self.config.source.clone(),
            authority: self.config.authority.clone(),
            note: self.config.note.clone(),
            stats,
            rules,
        };

        BuildOutput {
            rule_set,
            covered,
            diagnostics: pass.diagnostics,
        }
    }

    /// Step 1: trust the label first, the old id second
    fn reconcile_legacy(&self, pass: &mut Pass) {
        for legacy in &self.legacy {
            let prefix = legacy.prefix.trim().to_uppercase();
            let original = legacy.entity_id.resolve().ok();

            if prefix.is_empty() {
                pass.warn(Diagnostic::warning(
                    DiagnosticKind::UnresolvedLegacyRule,
                    format!("legacy rule '{}' has an empty prefix", legacy.comment),
                ));
                continue;
            }

            let entity_id = match self.catalog.find_by_name_detailed(&legacy.comment) {
                Some(found) => {
                    if found.method == MatchMethod::Substring {
                        pass.warn(
                            Diagnostic::warning(
                                DiagnosticKind::FuzzyNameMatch,
                                format!(
                                    "label '{}' matched '{}' by substring only",
                                    legacy.comment, found.matched
                                ),
                            )
                            .with_prefix(prefix.as_str())
                            .with_entity(found.entity_id),
                        );
                    }
                    if let Some(old) = original.filter(|old| *old != found.entity_id) {
                        log::info!(
                            "Legacy {} relabeled {} -> {} ('{}')",
                            prefix,
                            old,
                            found.entity_id,
                            legacy.comment
                        );
                    }
                    found.entity_id
                }
                None => match original {
                    Some(id) if self.catalog.is_active(id) => {
                        log::info!(
                            "Using original id for {}: {} (couldn't match '{}')",
                            prefix,
                            id,
                            legacy.comment
                        );
                        id
                    }
                    _ => {
                        let mut d = Diagnostic::warning(
                            DiagnosticKind::UnresolvedLegacyRule,
                            format!("cannot resolve label '{}'", legacy.comment),
                        )
                        .with_prefix(prefix.as_str());
                        if let Some(id) = original {
                            d = d.with_entity(id);
                        }
                        pass.warn(d);
                        continue;
                    }
                },
            };

            let entity = match self.catalog.lookup_by_id(entity_id) {
                Some(entity) => entity,
                None => {
                    pass.warn(
                        Diagnostic::warning(DiagnosticKind::MissingEntity, "entity not in catalog")
                            .with_prefix(prefix.as_str())
                            .with_entity(entity_id),
                    );
                    continue;
                }
            };

            if entity.deleted {
                let kept = self.config.keep_deleted_legacy;
                pass.warn(
                    Diagnostic::warning(
                        DiagnosticKind::DeletedEntity,
                        if kept {
                            format!("kept legacy rule for deleted entity {}", entity.name)
                        } else {
                            format!("dropped legacy rule for deleted entity {}", entity.name)
                        },
                    )
                    .with_prefix(prefix.as_str())
                    .with_entity(entity_id),
                );
                if !kept {
                    continue;
                }
            }

            for p in pass.expand(&prefix, entity_id) {
                pass.push(PrefixRule {
                    prefix: p,
                    target: RuleTarget::Unambiguous(entity_id),
                    priority: legacy.priority,
                    exact: legacy.exact,
                    comment: entity.name.clone(),
                });
            }
        }
    }

    /// Step 2: catalog prefixes for active entities with no rule yet
    fn fill_coverage_gaps(&self, pass: &mut Pass) {
        let missing: Vec<&Entity> = self
            .catalog
            .active_ids()
            .into_iter()
            .filter(|id| !pass.covered.contains(id))
            .filter_map(|id| self.catalog.lookup_by_id(id))
            .collect();

        for entity in missing {
            if entity.prefixes().is_empty() {
                // Curated rules may still cover it; gaps are reported after the last step
                log::debug!("No canonical prefix on file for {} ({})", entity.name, entity.id);
                continue;
            }

            for entry in entity.prefixes() {
                for p in pass.expand(entry, entity.id) {
                    let priority = self.config.default_priority(&p);
                    log::debug!("Added: {} -> {} ({})", p, entity.id, entity.name);
                    pass.push(
                        PrefixRule::new(p, entity.id, priority).with_comment(entity.name.as_str()),
                    );
                }
            }
        }
    }

    /// Step 3: curated disambiguation, outranking same-length generic rules
    fn add_disambiguation(&self, pass: &mut Pass) {
        for entry in &self.curation.disambiguation {
            if !self.usable_target(entry, pass) {
                continue;
            }
            for p in pass.expand(&entry.prefix, entry.entity_id) {
                if pass.has_pair(&p, entry.entity_id) {
                    continue;
                }
                let priority = self
                    .config
                    .default_priority(&p)
                    .saturating_add(self.config.disambiguation_bonus);
                pass.push(
                    PrefixRule::new(p, entry.entity_id, priority).with_comment(entry.comment.as_str()),
                );
            }
        }
    }

    /// Step 4: allocation blocks, never shadowing a prefix already claimed
    fn add_allocation_blocks(&self, pass: &mut Pass) {
        let claimed: HashSet<String> = pass.rules.iter().map(|r| r.prefix.clone()).collect();
        for entry in &self.curation.allocation_blocks {
            if !self.usable_target(entry, pass) {
                continue;
            }
            for p in pass.expand(&entry.prefix, entry.entity_id) {
                if claimed.contains(&p) {
                    continue;
                }
                let priority = self.config.default_priority(&p);
                pass.push(
                    PrefixRule::new(p, entry.entity_id, priority).with_comment(entry.comment.as_str()),
                );
            }
        }
    }

    /// Active entities that no rule in the finished table references
    fn report_coverage_gaps(&self, covered: &BTreeSet<EntityId>, pass: &mut Pass) {
        for entity in self.catalog.active_entities() {
            if covered.contains(&entity.id) {
                continue;
            }
            let message = if entity.prefixes().is_empty() {
                format!("no rule for {} (no canonical prefix on file)", entity.name)
            } else {
                format!("no rule for {}", entity.name)
            };
            pass.warn(Diagnostic::warning(DiagnosticKind::CoverageGap, message).with_entity(entity.id));
        }
    }

    /// Curated rules may only target entities that exist and are active
    fn usable_target(&self, entry: &CurationEntry, pass: &mut Pass) -> bool {
        match self.catalog.lookup_by_id(entry.entity_id) {
            None => {
                pass.warn(
                    Diagnostic::warning(
                        DiagnosticKind::MissingEntity,
                        format!("curated entity for '{}' not found, skipped", entry.comment),
                    )
                    .with_prefix(entry.prefix.as_str())
                    .with_entity(entry.entity_id),
                );
                false
            }
            Some(entity) if entity.deleted => {
                pass.warn(
                    Diagnostic::warning(
                        DiagnosticKind::DeletedEntity,
                        format!("curated rule targets deleted entity {}, skipped", entity.name),
                    )
                    .with_prefix(entry.prefix.as_str())
                    .with_entity(entry.entity_id),
                );
                false
            }
            Some(_) => true,
        }
    }
}

/// Keep the first rule for each (prefix, entity) pair
fn dedup_rules(rules: Vec<PrefixRule>) -> Vec<PrefixRule> {
    let mut seen = HashSet::new();
    rules
        .into_iter()
        .filter(|r| seen.insert((r.prefix.clone(), r.entity_id())))
        .collect()
}

/// Mark rules whose prefix is shared with rules for other entities
fn annotate_ambiguity(rules: &mut [PrefixRule]) {
    let mut groups: BTreeMap<(String, bool), BTreeSet<EntityId>> = BTreeMap::new();
    for rule in rules.iter() {
        groups
            .entry((rule.prefix.clone(), rule.exact))
            .or_default()
            .insert(rule.entity_id());
    }

    for rule in rules.iter_mut() {
        let ids = &groups[&(rule.prefix.clone(), rule.exact)];
        if ids.len() < 2 {
            continue;
        }
        let default = rule.entity_id();
        let alternatives = ids.iter().copied().filter(|id| *id != default).collect();
        rule.target = RuleTarget::Ambiguous { default, alternatives };
    }
}
