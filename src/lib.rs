//! ocf - push applications to OpenShift the way `cf push` does.
//!
//! This library provides the core functionality for the `ocf` CLI tool:
//! driving the `oc` binary through idempotent reconcile steps, and
//! binding services to applications through environment variables.

pub mod app;
pub mod binding;
pub mod cli;
pub mod commands;
pub mod config;
pub mod exec;
pub mod manifest;
pub mod platform;

#[cfg(test)]
pub(crate) mod test_utils;

/// Library-level error type for ocf operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] serde_yaml::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// The platform binary ran but reported failure.
    #[error("Command `{command}` failed{}", format_output(.output))]
    Execution { command: String, output: String },

    #[error("Error getting {kind} {name}: {output}")]
    Query {
        kind: String,
        name: String,
        output: String,
    },

    #[error("{kind} {name} not found")]
    NotFound { kind: String, name: String },

    #[error("Application {0} not found")]
    AppNotFound(String),

    #[error("Bound service {0} not found")]
    ServiceNotFound(String),

    #[error("Service {service} already bound to application {app}")]
    AlreadyBound { service: String, app: String },

    #[error("Service {service} not bound to application {app}")]
    NotBound { service: String, app: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

fn format_output(output: &str) -> String {
    let trimmed = output.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(":\n{}", trimmed)
    }
}

/// Result type alias for ocf operations.
pub type Result<T> = std::result::Result<T, Error>;
