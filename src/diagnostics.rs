// Build and validation diagnostics
//
// Every advisory or fatal finding from the builder and the validator ends up
// here. Tooling decides how to print them; the library only collects.

use serde::Serialize;
use std::fmt;

use crate::reference::dxcc::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Rule references an entity id absent from the catalog
    MissingEntity,
    /// Rule references a retired entity
    DeletedEntity,
    /// Legacy rule label matched nothing and its original id is not active
    UnresolvedLegacyRule,
    /// Range pattern failed the single-varying-position check
    RangeExpansionFailure,
    /// Same (prefix, entity) pair appears twice
    DuplicateRule,
    /// Active entity with no rule referencing it
    CoverageGap,
    /// Rule comment does not resemble the entity's current name
    NameMismatch,
    /// Legacy label was matched only by substring containment
    FuzzyNameMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            prefix: None,
            entity_id: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            prefix: None,
            entity_id: None,
            message: message.into(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_entity(mut self, entity_id: EntityId) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "[{}] {:?}", tag, self.kind)?;
        if let Some(prefix) = &self.prefix {
            write!(f, " {}", prefix)?;
        }
        if let Some(id) = self.entity_id {
            write!(f, " -> {}", id)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Count diagnostics of a given kind
pub fn count_kind(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let d = Diagnostic::warning(DiagnosticKind::DeletedEntity, "entity is retired")
            .with_prefix("VP8")
            .with_entity(EntityId::new(13));
        assert_eq!(d.to_string(), "[warning] DeletedEntity VP8 -> 013: entity is retired");
        assert!(!d.is_error());
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let d = Diagnostic::error(DiagnosticKind::DuplicateRule, "twice");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "error");
        assert_eq!(json["kind"], "DuplicateRule");
        assert!(json.get("prefix").is_none());
    }
}
