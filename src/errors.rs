use miette::Diagnostic;
use thiserror::Error;

use crate::policy::errors::PolicyError;

#[derive(Debug, Error, Diagnostic)]
pub enum AppError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(role_policy::app::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(role_policy::app::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(role_policy::app::serde))]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Policy(#[from] PolicyError),

    #[error("{0}")]
    #[diagnostic(
        code(role_policy::app::usage),
        help("Pass the input on the command line or set it under `[sources]` in the config file")
    )]
    Usage(String),
}
