//! Persistence boundary for role documents.

use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::policy::errors::PolicyError;
use crate::policy::translator::to_external;
use crate::policy::types::{InternalRole, RoleDocument};

pub trait RoleRepository {
    /// Persist a new role; the repository assigns `sys.id` and `sys.version`.
    fn create(&self, doc: RoleDocument) -> Result<RoleDocument, PolicyError>;

    /// Overwrite an existing role. Fails with `VersionConflict` when
    /// `sys.version` is not the stored version.
    fn save(&self, doc: RoleDocument) -> Result<RoleDocument, PolicyError>;

    fn remove(&self, id: &str) -> Result<(), PolicyError>;
}

/// Translate an edited role back to the wire format and persist it.
pub fn save_role(
    repo: &dyn RoleRepository,
    role: &InternalRole,
) -> Result<RoleDocument, PolicyError> {
    let doc = to_external(role);
    doc.ensure_savable()?;
    let saved = match doc.sys.id {
        None => repo.create(doc)?,
        Some(_) => repo.save(doc)?,
    };
    tracing::debug!(
        id = saved.sys.id.as_deref().unwrap_or_default(),
        version = saved.sys.version.unwrap_or_default(),
        "saved role"
    );
    Ok(saved)
}

/// Repository keeping roles in memory with optimistic versioning.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    roles: BTreeMap<String, RoleDocument>,
    next_id: u64,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<RoleDocument> {
        self.inner.lock().roles.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoleRepository for InMemoryRoleRepository {
    fn create(&self, mut doc: RoleDocument) -> Result<RoleDocument, PolicyError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = format!("role-{}", inner.next_id);
        doc.sys.id = Some(id.clone());
        doc.sys.version = Some(1);
        inner.roles.insert(id, doc.clone());
        Ok(doc)
    }

    fn save(&self, mut doc: RoleDocument) -> Result<RoleDocument, PolicyError> {
        let id = doc
            .sys
            .id
            .clone()
            .ok_or_else(|| PolicyError::InvalidRole("cannot save a role without `sys.id`".into()))?;

        let mut inner = self.inner.lock();
        let stored = inner
            .roles
            .get(&id)
            .ok_or_else(|| PolicyError::RoleNotFound(id.clone()))?;
        let current = stored.sys.version.unwrap_or_default();
        if doc.sys.version != Some(current) {
            return Err(PolicyError::VersionConflict {
                id,
                expected: current,
                actual: doc.sys.version,
            });
        }

        doc.sys.version = Some(current + 1);
        inner.roles.insert(id, doc.clone());
        Ok(doc)
    }

    fn remove(&self, id: &str) -> Result<(), PolicyError> {
        self.inner
            .lock()
            .roles
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| PolicyError::RoleNotFound(id.to_string()))
    }
}
