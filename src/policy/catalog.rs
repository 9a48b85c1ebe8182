//! Content-model collaborators consulted by the stale rule reconciler.

use serde::{Deserialize, Serialize};

use crate::policy::errors::PolicyError;
use crate::policy::types::{ContentTypeSummary, LocaleSummary};

pub trait ContentTypeCatalog {
    /// Every content type in the space, with field ids only.
    fn get_all_bare(&self) -> Result<Vec<ContentTypeSummary>, PolicyError>;
}

pub trait LocaleCatalog {
    fn get_private_locales(&self) -> Result<Vec<LocaleSummary>, PolicyError>;
}

/// Catalog backed by a fixed snapshot, e.g. read from a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticCatalog {
    #[serde(default)]
    pub content_types: Vec<ContentTypeSummary>,
    #[serde(default)]
    pub locales: Vec<LocaleSummary>,
}

impl StaticCatalog {
    pub fn new(content_types: Vec<ContentTypeSummary>, locales: Vec<LocaleSummary>) -> Self {
        Self {
            content_types,
            locales,
        }
    }
}

impl ContentTypeCatalog for StaticCatalog {
    fn get_all_bare(&self) -> Result<Vec<ContentTypeSummary>, PolicyError> {
        Ok(self.content_types.clone())
    }
}

impl LocaleCatalog for StaticCatalog {
    fn get_private_locales(&self) -> Result<Vec<LocaleSummary>, PolicyError> {
        Ok(self.locales.clone())
    }
}
