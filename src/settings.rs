use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub sources: Sources,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` takes precedence.
    pub filter: String,
}

/// Default input files for the CLI; command-line flags override these.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Sources {
    /// Membership JSON: `{ "admin": bool, "roles": [...] }`
    pub membership_path: Option<PathBuf>,
    /// Directory of role documents (`*.json`), used when no membership file is given
    pub roles_dir: Option<PathBuf>,
    /// Catalog JSON: `{ "contentTypes": [...], "locales": [...] }`
    pub catalog_path: Option<PathBuf>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Settings {
    pub fn load(path: &str) -> Result<Self, AppError> {
        let mut builder =
            config::Config::builder().set_default("logging.filter", Logging::default().filter)?;

        // Optional file
        if Path::new(path).exists() {
            builder = builder.add_source(config::File::with_name(path));
        }

        // Environment overrides: ROLE_POLICY__LOGGING__FILTER=debug, etc.
        builder =
            builder.add_source(config::Environment::with_prefix("ROLE_POLICY").separator("__"));

        let cfg = builder.build()?;
        let mut s: Settings = cfg.try_deserialize()?;

        // Normalize source paths to be relative to current dir
        let cwd = std::env::current_dir()?;
        for p in [
            &mut s.sources.membership_path,
            &mut s.sources.roles_dir,
            &mut s.sources.catalog_path,
        ]
        .into_iter()
        .flatten()
        {
            if p.is_relative() {
                *p = cwd.join(&*p);
            }
        }

        Ok(s)
    }
}
