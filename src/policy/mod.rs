pub mod catalog;
pub mod checker;
pub mod constraint;
pub mod errors;
pub mod loader;
pub mod reconciler;
pub mod repository;
pub mod translator;
pub mod types;

pub use checker::{EditTarget, PolicyEngine};
pub use constraint::{Constraint, FieldPath, Pattern, ALL_CTS, ALL_FIELDS, ALL_LOCALES};
pub use errors::PolicyError;
pub use reconciler::remove_outdated_rules;
pub use translator::{is_ui_compatible, to_external, to_internal};
pub use types::{
    Action, Effect, EntityKind, Grant, InternalRole, Membership, RoleDocument, Rule, RuleSet,
    Scope,
};
