use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use role_policy::errors::AppError;
use role_policy::policy::loader::{load_catalog, load_membership, load_roles, read_json};
use role_policy::policy::reconciler::reconcile_with_catalogs;
use role_policy::policy::types::{InternalRole, Membership, RoleDocument};
use role_policy::policy::{to_external, to_internal, EditTarget, PolicyEngine};
use role_policy::settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "role-policy",
    version,
    about = "Translate role policies and evaluate access for a membership"
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "role-policy.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the normalized rule model of a wire role document
    ToInternal { role: PathBuf },
    /// Print the wire document of a normalized role
    ToExternal { role: PathBuf },
    /// Drop rules of a normalized role that reference deleted content types or locales
    Reconcile {
        role: PathBuf,
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Answer an access question for a membership
    Check {
        #[arg(long)]
        membership: Option<PathBuf>,
        /// Build the membership from every role document in this directory
        #[arg(long, conflicts_with = "membership")]
        roles_dir: Option<PathBuf>,
        /// Treat the user as a space admin (only with --roles-dir)
        #[arg(long, requires = "roles_dir")]
        admin: bool,
        #[command(subcommand)]
        query: Query,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum Query {
    Entries,
    Assets,
    UpdateEntries { content_type: String },
    UpdateAssets,
    UpdateOwnEntries,
    UpdateOwnAssets,
    EditField {
        /// Content type of the entry; omit for assets
        #[arg(long)]
        content_type: Option<String>,
        field: String,
        locale: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // load settings
    let settings = Settings::load(&cli.config)?;

    // logging
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.filter));
    fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();
    tracing::debug!(?settings, "Loaded configuration");

    run(cli.command, &settings)?;
    Ok(())
}

fn run(command: Command, settings: &Settings) -> Result<(), AppError> {
    match command {
        Command::ToInternal { role } => {
            let doc: RoleDocument = read_json(&role)?;
            print_json(&to_internal(&doc))
        }
        Command::ToExternal { role } => {
            let internal: InternalRole = read_json(&role)?;
            let doc = to_external(&internal);
            doc.ensure_savable()?;
            print_json(&doc)
        }
        Command::Reconcile { role, catalog } => {
            let catalog_path = catalog
                .or_else(|| settings.sources.catalog_path.clone())
                .ok_or_else(|| AppError::Usage("no catalog file given".into()))?;
            let catalog = load_catalog(&catalog_path)?;
            let mut internal: InternalRole = read_json(&role)?;
            reconcile_with_catalogs(&mut internal, &catalog, &catalog)?;
            print_json(&internal)
        }
        Command::Check {
            membership,
            roles_dir,
            admin,
            query,
        } => {
            let membership = resolve_membership(membership, roles_dir, admin, settings)?;
            let engine = PolicyEngine::new();
            engine.set_membership(&membership);
            let allowed = answer(&engine, &query)?;
            println!("{allowed}");
            Ok(())
        }
    }
}

fn resolve_membership(
    membership: Option<PathBuf>,
    roles_dir: Option<PathBuf>,
    admin: bool,
    settings: &Settings,
) -> Result<Membership, AppError> {
    if let Some(dir) = roles_dir {
        return membership_from_dir(&dir, admin);
    }
    if let Some(path) = membership.or_else(|| settings.sources.membership_path.clone()) {
        return Ok(load_membership(&path)?);
    }
    if let Some(dir) = &settings.sources.roles_dir {
        return membership_from_dir(dir, admin);
    }
    Err(AppError::Usage("no membership source given".into()))
}

fn membership_from_dir(dir: &Path, admin: bool) -> Result<Membership, AppError> {
    Ok(Membership {
        admin,
        roles: load_roles(dir)?,
    })
}

fn answer(engine: &PolicyEngine, query: &Query) -> Result<bool, AppError> {
    let allowed = match query {
        Query::Entries => engine.can_access_entries()?,
        Query::Assets => engine.can_access_assets()?,
        Query::UpdateEntries { content_type } => engine.can_update_entries_of_type(content_type)?,
        Query::UpdateAssets => engine.can_update_assets()?,
        Query::UpdateOwnEntries => engine.can_update_own_entries()?,
        Query::UpdateOwnAssets => engine.can_update_own_assets()?,
        Query::EditField {
            content_type,
            field,
            locale,
        } => {
            let target = match content_type {
                Some(content_type) => EditTarget::Entry {
                    content_type: content_type.as_str(),
                },
                None => EditTarget::Asset,
            };
            engine.can_edit_field_locale(target, field, locale)?
        }
    };
    Ok(allowed)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
