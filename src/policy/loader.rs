use std::path::Path;

use serde::de::DeserializeOwned;

use crate::policy::catalog::StaticCatalog;
use crate::policy::errors::PolicyError;
use crate::policy::types::{Membership, RoleDocument};

/// Read and deserialize one JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PolicyError> {
    let contents = std::fs::read_to_string(path).map_err(|source| PolicyError::LoadError {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| PolicyError::ParseError {
        path: path.display().to_string(),
        source,
    })
}

/// Load every `.json` role document in `dir`, ordered by file name.
pub fn load_roles(dir: &Path) -> Result<Vec<RoleDocument>, PolicyError> {
    if !dir.is_dir() {
        return Err(PolicyError::LoadError {
            path: dir.display().to_string(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "roles directory does not exist or is not a directory",
            ),
        });
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "json")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    let mut roles = Vec::with_capacity(entries.len());
    for entry in entries {
        roles.push(read_json::<RoleDocument>(&entry.path())?);
    }

    tracing::info!(dir = %dir.display(), roles = roles.len(), "Loaded role documents");
    Ok(roles)
}

/// Load a `{ "admin": bool, "roles": [...] }` membership file.
pub fn load_membership(path: &Path) -> Result<Membership, PolicyError> {
    let membership: Membership = read_json(path)?;
    tracing::info!(
        path = %path.display(),
        admin = membership.admin,
        roles = membership.roles.len(),
        "Loaded membership"
    );
    Ok(membership)
}

/// Load a `{ "contentTypes": [...], "locales": [...] }` catalog file.
pub fn load_catalog(path: &Path) -> Result<StaticCatalog, PolicyError> {
    read_json(path)
}
