use std::collections::HashSet;

use crate::policy::catalog::{ContentTypeCatalog, LocaleCatalog};
use crate::policy::errors::PolicyError;
use crate::policy::types::{ContentTypeSummary, InternalRole, LocaleSummary, Rule};

/// Drop rules that point at content types or locales missing from the
/// catalog. Field ids are not checked. Returns whether anything was removed.
///
/// Only the rule collections are touched; `ui_compatible` and
/// `policy_string` stay as they are.
pub fn remove_outdated_rules(
    role: &mut InternalRole,
    content_types: &[ContentTypeSummary],
    locales: &[LocaleSummary],
) -> bool {
    let content_type_ids: HashSet<&str> = content_types.iter().map(|ct| ct.id.as_str()).collect();
    let locale_codes: HashSet<&str> = locales.iter().map(|l| l.code.as_str()).collect();

    let is_current = |rule: &Rule| {
        let content_type_ok = rule
            .content_type
            .as_exact()
            .map_or(true, |id| content_type_ids.contains(id));
        let locale_ok = rule
            .locale()
            .and_then(|locale| locale.as_exact())
            .map_or(true, |code| locale_codes.contains(code));
        content_type_ok && locale_ok
    };

    let removed = role.entries.retain(is_current) + role.assets.retain(is_current);
    removed > 0
}

/// Fetch the current catalogs and reconcile `role` against them.
pub fn reconcile_with_catalogs(
    role: &mut InternalRole,
    content_types: &dyn ContentTypeCatalog,
    locales: &dyn LocaleCatalog,
) -> Result<bool, PolicyError> {
    let content_types = content_types.get_all_bare()?;
    let locales = locales.get_private_locales()?;

    let before = role.rule_count();
    let changed = remove_outdated_rules(role, &content_types, &locales);
    if changed {
        tracing::info!(
            role = %role.name,
            removed = before - role.rule_count(),
            "auto-fixed role: removed rules referencing deleted content types or locales"
        );
    }
    Ok(changed)
}
