//! Command implementations for the ocf CLI.
//!
//! Each handler takes already-built collaborators and returns a result
//! that implements [`CommandResult`]; `main` decides how to print it.

use crate::Result;
use crate::app::{BindReport, BindingChange, Orchestrator, PushReport};
use crate::config::{ResolvedConfig, ValueSource};
use crate::manifest::{self, PushFlags};
use crate::platform::PlatformClient;
use serde::Serialize;
use std::path::Path;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Outcome of `ocf push` across every selected application.
#[derive(Debug, Clone, Serialize)]
pub struct PushSummary {
    pub applications: Vec<PushReport>,
}

impl CommandResult for PushSummary {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for report in &self.applications {
            lines.push(format!(
                "{}: build {}, deployment {}, service {}, route {}",
                report.app, report.build, report.deployment, report.service, report.route
            ));
            lines.push(format!("  {}", report.host));
        }
        lines.join("\n")
    }
}

impl CommandResult for BindReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let action = match self.change {
            BindingChange::Bound => "Bound service",
            BindingChange::Unbound => "Unbound service",
        };
        let bound = if self.bound_services.is_empty() {
            "(none)"
        } else {
            self.bound_services.as_str()
        };
        format!(
            "{} {} ({}) {} {}\nBound services: {}",
            action,
            self.service,
            self.prefix,
            match self.change {
                BindingChange::Bound => "to",
                BindingChange::Unbound => "from",
            },
            self.app,
            bound
        )
    }
}

/// One resolved configuration value.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigEntry {
    pub key: &'static str,
    pub value: String,
    pub source: String,
}

/// Output of `ocf config show`.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReport {
    pub path: Option<String>,
    pub entries: Vec<ConfigEntry>,
}

impl CommandResult for ConfigReport {
    fn to_json(&self) -> String {
        json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Config file: {}",
            self.path.as_deref().unwrap_or("(none)")
        )];
        for entry in &self.entries {
            lines.push(format!(
                "  {} = {} ({})",
                entry.key, entry.value, entry.source
            ));
        }
        lines.join("\n")
    }
}

/// Push every application selected by the manifest and flags.
///
/// Stops at the first application that fails.
pub fn push<P: PlatformClient>(
    orchestrator: &Orchestrator<P>,
    flags: &PushFlags,
    image: &str,
    cwd: &Path,
) -> Result<PushSummary> {
    let apps = manifest::applications_for(flags, cwd)?;
    tracing::debug!(count = apps.len(), "applications to push");

    let mut applications = Vec::with_capacity(apps.len());
    for app in &apps {
        applications.push(orchestrator.push(app, image)?);
    }
    Ok(PushSummary { applications })
}

pub fn bind_service<P: PlatformClient>(
    orchestrator: &Orchestrator<P>,
    app: &str,
    service: &str,
) -> Result<BindReport> {
    orchestrator.bind_service(app, service)
}

pub fn unbind_service<P: PlatformClient>(
    orchestrator: &Orchestrator<P>,
    app: &str,
    service: &str,
) -> Result<BindReport> {
    orchestrator.unbind_service(app, service)
}

/// Report resolved configuration values and their sources.
pub fn config_show(config: &ResolvedConfig) -> ConfigReport {
    fn entry(key: &'static str, value: &str, source: &ValueSource) -> ConfigEntry {
        ConfigEntry {
            key,
            value: value.to_string(),
            source: source.to_string(),
        }
    }

    ConfigReport {
        path: config.path.as_ref().map(|p| p.display().to_string()),
        entries: vec![
            entry("oc-binary", config.oc_binary(), &config.oc_binary.source),
            entry("image", config.image(), &config.image.source),
            entry(
                "output-format",
                config.output_format().as_str(),
                &config.output_format.source,
            ),
        ],
    }
}
