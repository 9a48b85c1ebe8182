use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PolicyError {
    #[error("Policy engine queried before a membership was set")]
    #[diagnostic(
        code(role_policy::not_ready),
        help("Call `PolicyEngine::set_membership` before running access queries")
    )]
    NotReady,

    #[error("Role `{name}` cannot be saved: its stored policies are not valid JSON")]
    #[diagnostic(
        code(role_policy::unsavable_policies),
        help("Fix the raw policy JSON in the role editor before saving")
    )]
    UnsavablePolicies { name: String },

    #[error("Version conflict on role `{id}`: stored version is {expected}, document has {actual:?}")]
    #[diagnostic(
        code(role_policy::version_conflict),
        help("Reload the role and re-apply your changes")
    )]
    VersionConflict {
        id: String,
        expected: u64,
        actual: Option<u64>,
    },

    #[error("Role `{0}` not found")]
    #[diagnostic(code(role_policy::role_not_found))]
    RoleNotFound(String),

    #[error("Invalid role document: {0}")]
    #[diagnostic(
        code(role_policy::invalid_role),
        help("Role documents need `sys.id` and `sys.version` to be saved over an existing role")
    )]
    InvalidRole(String),

    #[error("Failed to read `{path}`")]
    #[diagnostic(
        code(role_policy::load),
        help("Check that the file exists and is readable")
    )]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse `{path}`")]
    #[diagnostic(
        code(role_policy::parse),
        help("The file must contain a JSON document in the wire role format")
    )]
    ParseError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    #[diagnostic(code(role_policy::io))]
    Io(#[from] std::io::Error),
}
