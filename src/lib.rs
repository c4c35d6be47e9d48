// DXCC prefix library
// Builds, validates and resolves callsign prefix rules against the ARRL entity list

pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod reference;
pub mod validator;

pub use builder::{BuildConfig, BuildOutput, RuleBuilder};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use error::{PrefixError, Result};
pub use reference::{lookup_call_full, CallsignLookup, EntityCatalog, EntityId, PrefixRule, Resolver, RuleSet};
pub use validator::{RuleValidator, ValidationReport};
