//! Access checks over the aggregated rules of a membership.
//!
//! Every `set_membership` builds a fresh snapshot (rules, indexes and an
//! empty decision cache) and swaps it in whole. Readers clone the `Arc` and
//! never see a half-built state. Snapshots carry the ticket of the call that
//! produced them; a snapshot is only installed if no later call has already
//! installed one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::policy::constraint::{Pattern, ALL_CTS};
use crate::policy::errors::PolicyError;
use crate::policy::translator::to_internal;
use crate::policy::types::{Membership, Rule, RuleSet, Scope};

/// What a field/locale edit check is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget<'a> {
    Entry { content_type: &'a str },
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CacheSubject {
    ContentType(String),
    Asset,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    subject: CacheSubject,
    field: String,
    locale: String,
}

/// Rules grouped for lookup, one per effect.
#[derive(Debug, Default)]
struct EntryIndex {
    by_content_type: HashMap<Pattern, Vec<Rule>>,
    by_id: Vec<Rule>,
}

impl EntryIndex {
    fn build(rules: &[Rule]) -> Self {
        let mut index = Self::default();
        for rule in rules {
            index
                .by_content_type
                .entry(rule.content_type.clone())
                .or_default()
                .push(rule.clone());
            if rule.entity_id.is_some() {
                index.by_id.push(rule.clone());
            }
        }
        index
    }

    fn bucket(&self, pattern: &Pattern) -> &[Rule] {
        self.by_content_type
            .get(pattern)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Rules for `content_type` plus the rules applying to every content
    /// type.
    fn for_content_type<'a>(&'a self, content_type: &str) -> impl Iterator<Item = &'a Rule> {
        self.bucket(&Pattern::exact(content_type))
            .iter()
            .chain(self.bucket(&ALL_CTS))
    }
}

/// Immutable state for one membership, plus its decision cache.
#[derive(Debug)]
struct Snapshot {
    ticket: u64,
    is_admin: bool,
    entries: RuleSet,
    assets: RuleSet,
    allowed_entries: EntryIndex,
    denied_entries: EntryIndex,
    cache: Mutex<HashMap<CacheKey, bool>>,
    evaluations: AtomicUsize,
}

impl Snapshot {
    fn build(ticket: u64, membership: &Membership) -> Self {
        let mut entries = RuleSet::default();
        let mut assets = RuleSet::default();
        let mut skipped = 0usize;

        for document in &membership.roles {
            let role = to_internal(document);
            if !role.ui_compatible {
                skipped += 1;
                continue;
            }
            entries.extend(role.entries);
            assets.extend(role.assets);
        }

        tracing::debug!(
            ticket,
            roles = membership.roles.len(),
            skipped,
            entry_rules = entries.len(),
            asset_rules = assets.len(),
            "built policy snapshot"
        );

        Self {
            ticket,
            is_admin: membership.admin,
            allowed_entries: EntryIndex::build(&entries.allowed),
            denied_entries: EntryIndex::build(&entries.denied),
            entries,
            assets,
            cache: Mutex::new(HashMap::new()),
            evaluations: AtomicUsize::new(0),
        }
    }

    fn decide_field_locale(&self, target: EditTarget<'_>, field: &str, locale: &str) -> bool {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        if self.is_admin {
            return true;
        }

        let covers = |rule: &Rule| rule.covers_field_locale(field, locale);
        match target {
            EditTarget::Entry { content_type } => {
                let allowed = self
                    .allowed_entries
                    .for_content_type(content_type)
                    .chain(self.allowed_entries.by_id.iter())
                    .any(|r| covers(r));
                let denied = self
                    .denied_entries
                    .for_content_type(content_type)
                    .chain(self.denied_entries.by_id.iter())
                    .any(|r| covers(r));
                allowed && !denied
            }
            EditTarget::Asset => {
                let allowed = self.assets.allowed.iter().any(|r| covers(r));
                let denied = self.assets.denied.iter().any(|r| covers(r));
                allowed && !denied
            }
        }
    }
}

/// Whole-entity update check. Path-scoped deny rules are field-level
/// exceptions and do not block the entity as a whole.
fn perform_check<'a>(
    mut allowed: impl Iterator<Item = &'a Rule>,
    mut denied: impl Iterator<Item = &'a Rule>,
    scope: Scope,
) -> bool {
    let applies = |rule: &Rule| rule.action.grants_update() && rule.scope == scope;
    allowed.any(|r| applies(r)) && !denied.any(|r| applies(r) && !r.is_path_scoped())
}

fn grants_access(allowed: &[Rule]) -> bool {
    allowed.iter().any(|rule| rule.action.is_known())
}

/// A membership snapshot prepared but not yet installed.
#[derive(Debug)]
pub struct PendingMembership {
    snapshot: Arc<Snapshot>,
}

impl PendingMembership {
    pub fn ticket(&self) -> u64 {
        self.snapshot.ticket
    }
}

/// Answers "may the current user do X?" for one membership at a time.
#[derive(Debug, Default)]
pub struct PolicyEngine {
    current: RwLock<Option<Arc<Snapshot>>>,
    tickets: AtomicU64,
}

impl PolicyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild all state from `membership` and install it.
    pub fn set_membership(&self, membership: &Membership) -> bool {
        let pending = self.prepare_membership(membership);
        self.install(pending)
    }

    /// Build a snapshot, taking the call-order ticket now.
    pub fn prepare_membership(&self, membership: &Membership) -> PendingMembership {
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst) + 1;
        PendingMembership {
            snapshot: Arc::new(Snapshot::build(ticket, membership)),
        }
    }

    /// Swap in a prepared snapshot unless a later one is already installed.
    /// Returns whether the snapshot was installed.
    pub fn install(&self, pending: PendingMembership) -> bool {
        let mut current = self.current.write();
        if let Some(installed) = current.as_ref() {
            if installed.ticket > pending.snapshot.ticket {
                tracing::debug!(
                    stale = pending.snapshot.ticket,
                    installed = installed.ticket,
                    "discarding stale membership snapshot"
                );
                return false;
            }
        }
        tracing::info!(
            ticket = pending.snapshot.ticket,
            admin = pending.snapshot.is_admin,
            "membership applied"
        );
        *current = Some(pending.snapshot);
        true
    }

    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    fn snapshot(&self) -> Result<Arc<Snapshot>, PolicyError> {
        self.current.read().clone().ok_or(PolicyError::NotReady)
    }

    pub fn is_admin(&self) -> Result<bool, PolicyError> {
        Ok(self.snapshot()?.is_admin)
    }

    /// Whether any allow rule with an action this client knows targets entries.
    pub fn can_access_entries(&self) -> Result<bool, PolicyError> {
        Ok(grants_access(&self.snapshot()?.entries.allowed))
    }

    pub fn can_access_assets(&self) -> Result<bool, PolicyError> {
        Ok(grants_access(&self.snapshot()?.assets.allowed))
    }

    pub fn can_update_entries_of_type(&self, content_type: &str) -> Result<bool, PolicyError> {
        let s = self.snapshot()?;
        Ok(perform_check(
            s.allowed_entries.for_content_type(content_type),
            s.denied_entries.for_content_type(content_type),
            Scope::Any,
        ))
    }

    pub fn can_update_assets(&self) -> Result<bool, PolicyError> {
        let s = self.snapshot()?;
        Ok(perform_check(
            s.assets.allowed.iter(),
            s.assets.denied.iter(),
            Scope::Any,
        ))
    }

    /// Update rights on entries the user created, of any content type.
    pub fn can_update_own_entries(&self) -> Result<bool, PolicyError> {
        let s = self.snapshot()?;
        Ok(perform_check(
            s.entries.allowed.iter(),
            s.entries.denied.iter(),
            Scope::User,
        ))
    }

    pub fn can_update_own_assets(&self) -> Result<bool, PolicyError> {
        let s = self.snapshot()?;
        Ok(perform_check(
            s.assets.allowed.iter(),
            s.assets.denied.iter(),
            Scope::User,
        ))
    }

    /// Whether `field` may be edited in `locale`. Admins always may; otherwise
    /// some update rule must cover the pair and no deny rule may. Memoized
    /// per membership.
    pub fn can_edit_field_locale(
        &self,
        target: EditTarget<'_>,
        field: &str,
        locale: &str,
    ) -> Result<bool, PolicyError> {
        let s = self.snapshot()?;
        let key = CacheKey {
            subject: match target {
                EditTarget::Entry { content_type } => {
                    CacheSubject::ContentType(content_type.to_string())
                }
                EditTarget::Asset => CacheSubject::Asset,
            },
            field: field.to_string(),
            locale: locale.to_string(),
        };

        if let Some(hit) = s.cache.lock().get(&key) {
            return Ok(*hit);
        }

        let decision = s.decide_field_locale(target, field, locale);
        s.cache.lock().insert(key, decision);
        Ok(decision)
    }

    /// Number of field/locale decisions computed from rules (cache misses)
    /// for the installed membership.
    pub fn rule_evaluations(&self) -> usize {
        self.current
            .read()
            .as_ref()
            .map_or(0, |s| s.evaluations.load(Ordering::Relaxed))
    }
}
