//! Application model and the push / bind / unbind workflows.
//!
//! Nothing here is cached: every step re-reads the platform, so an
//! interrupted push converges when it is run again.

use crate::binding::{
    BOUND_SERVICES, BUILDPACK_URL, CF_COMMAND, MEMORY_LIMIT, binding_delta,
    binding_prefix, derive_binding_env, unbinding_delta,
};
use crate::platform::{
    BuildSource, DEFAULT_PORT, DELETION_MARKER, DeploymentSpec, EnvMap, ObjectKind,
    PlatformClient,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One application to push.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub name: String,
    pub buildpack: Option<String>,
    pub command: Option<String>,
    pub memory: Option<String>,
    pub path: Option<PathBuf>,
    pub services: Vec<String>,
}

impl Application {
    /// Create an application with only a name set.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Buildpack, treating an empty string as unset.
    pub fn buildpack(&self) -> Option<&str> {
        self.buildpack.as_deref().filter(|b| !b.is_empty())
    }

    /// Location of the source tree or artifact to upload.
    pub fn source_path(&self) -> &Path {
        self.path.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Deployment arguments: binding entries, then the memory limit, then
    /// the start command.
    pub fn deployment_spec(&self, image: &str, mut env: Vec<String>) -> DeploymentSpec {
        let memory = self.memory.clone().filter(|m| !m.is_empty());
        if let Some(memory) = &memory {
            env.push(format!("{}={}", MEMORY_LIMIT, memory));
        }
        if let Some(command) = self.command.as_deref().filter(|c| !c.is_empty()) {
            env.push(format!("{}={}", CF_COMMAND, command));
        }
        DeploymentSpec {
            name: self.name.clone(),
            image: image.to_string(),
            memory,
            env,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("no name found for app".to_string()));
        }
        Ok(())
    }
}

/// Outcome of one reconcile step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reconciled {
    Created,
    Updated,
    Unchanged,
    Redeployed,
    Skipped,
}

impl Reconciled {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Redeployed => "redeployed",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for Reconciled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What a completed push did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushReport {
    pub app: String,
    pub project: String,
    pub build: Reconciled,
    pub deployment: Reconciled,
    pub service: Reconciled,
    pub route: Reconciled,
    pub host: String,
}

/// Direction of a binding change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingChange {
    Bound,
    Unbound,
}

/// Result of a bind or unbind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindReport {
    pub app: String,
    pub service: String,
    pub prefix: String,
    pub change: BindingChange,
    /// `CF_BOUND_SERVICES` after the write.
    pub bound_services: String,
}

/// Drives platform workflows through a [`PlatformClient`].
pub struct Orchestrator<P> {
    client: P,
}

impl<P: PlatformClient> Orchestrator<P> {
    pub fn new(client: P) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &P {
        &self.client
    }

    /// Build and deploy an application, creating whatever is missing.
    ///
    /// Steps run in order and the first error aborts the rest.
    pub fn push(&self, app: &Application, image: &str) -> Result<PushReport> {
        app.validate()?;
        tracing::debug!(app = %app.name, image, "push");

        self.ensure_logged_in()?;
        let project = self.display_project()?;
        let build = self.ensure_build_exists(app, image)?;
        self.start_build(app)?;
        let deployment = self.ensure_deployment_exists(app)?;
        let service = self.ensure_service_exists(app)?;
        let route = self.ensure_route_exists(app)?;
        let host = self.display_route(app)?;

        Ok(PushReport {
            app: app.name.clone(),
            project,
            build,
            deployment,
            service,
            route,
            host,
        })
    }

    /// Copy a service's credentials into an application's environment.
    pub fn bind_service(&self, app_name: &str, service: &str) -> Result<BindReport> {
        self.ensure_logged_in()?;
        self.display_project()?;
        self.require_deployment(app_name)?;

        let prefix = binding_prefix(service);
        let service_env = self.service_env(service)?;
        let app_env = self.client.read_env(ObjectKind::DeploymentConfig, app_name)?;

        let delta =
            binding_delta(&app_env, &service_env, &prefix).ok_or_else(|| Error::AlreadyBound {
                service: service.to_string(),
                app: app_name.to_string(),
            })?;
        self.client
            .write_env(ObjectKind::DeploymentConfig, app_name, &delta)?;

        Ok(BindReport {
            app: app_name.to_string(),
            service: service.to_string(),
            bound_services: delta.get(BOUND_SERVICES).cloned().unwrap_or_default(),
            prefix,
            change: BindingChange::Bound,
        })
    }

    /// Remove a service's credentials from an application's environment.
    pub fn unbind_service(&self, app_name: &str, service: &str) -> Result<BindReport> {
        self.ensure_logged_in()?;
        self.display_project()?;
        self.require_deployment(app_name)?;

        let prefix = binding_prefix(service);
        let app_env = self.client.read_env(ObjectKind::DeploymentConfig, app_name)?;

        let delta = unbinding_delta(&app_env, &prefix).ok_or_else(|| Error::NotBound {
            service: service.to_string(),
            app: app_name.to_string(),
        })?;
        self.client
            .write_env(ObjectKind::DeploymentConfig, app_name, &delta)?;

        Ok(BindReport {
            app: app_name.to_string(),
            service: service.to_string(),
            bound_services: delta.get(BOUND_SERVICES).cloned().unwrap_or_default(),
            prefix,
            change: BindingChange::Unbound,
        })
    }

    /// Log in interactively unless a session already exists.
    ///
    /// Returns whether a login was performed.
    pub fn ensure_logged_in(&self) -> Result<bool> {
        if self.client.logged_in() {
            return Ok(false);
        }
        self.client.login()?;
        Ok(true)
    }

    pub fn display_project(&self) -> Result<String> {
        let project = self.client.current_project()?;
        println!("Using project {}", project);
        Ok(project)
    }

    /// Create the build config, or bring its buildpack up to date.
    pub fn ensure_build_exists(&self, app: &Application, image: &str) -> Result<Reconciled> {
        if !self.client.exists(ObjectKind::BuildConfig, &app.name)? {
            let mut env = EnvMap::new();
            if let Some(buildpack) = app.buildpack() {
                env.insert(BUILDPACK_URL.to_string(), buildpack.to_string());
            }
            self.client.create_build(image, &app.name, &env)?;
            return Ok(Reconciled::Created);
        }

        println!(
            "==> Build configuration already exists for {}, updating",
            app.name
        );
        let current = self.client.read_env(ObjectKind::BuildConfig, &app.name)?;
        let stored = current
            .get(BUILDPACK_URL)
            .map(String::as_str)
            .unwrap_or("");
        let desired = app.buildpack().unwrap_or("");
        if stored == desired {
            return Ok(Reconciled::Unchanged);
        }

        let value = if desired.is_empty() {
            DELETION_MARKER
        } else {
            desired
        };
        let delta: EnvMap = [(BUILDPACK_URL.to_string(), value.to_string())]
            .into_iter()
            .collect();
        self.client
            .write_env(ObjectKind::BuildConfig, &app.name, &delta)?;
        Ok(Reconciled::Updated)
    }

    pub fn start_build(&self, app: &Application) -> Result<()> {
        let source = BuildSource::for_path(app.source_path());
        self.client.start_build(&app.name, &source)
    }

    /// Create the deployment config, or redeploy the one that exists.
    pub fn ensure_deployment_exists(&self, app: &Application) -> Result<Reconciled> {
        if self.client.exists(ObjectKind::DeploymentConfig, &app.name)? {
            println!(
                "==> Deployment config already exists for {}, redeploying",
                app.name
            );
            self.client.redeploy(&app.name)?;
            return Ok(Reconciled::Redeployed);
        }

        let image = self.client.image_repository(&app.name)?;
        let bindings = self.env_for_service_bindings(app)?;
        let spec = app.deployment_spec(&image, bindings);
        self.client.create_deployment(&spec)?;
        Ok(Reconciled::Created)
    }

    /// `KEY=VALUE` entries binding every service the application lists.
    ///
    /// `CF_BOUND_SERVICES` comes last and only when services are listed.
    pub fn env_for_service_bindings(&self, app: &Application) -> Result<Vec<String>> {
        let mut entries = Vec::new();
        let mut prefixes = Vec::new();
        for service in &app.services {
            let prefix = binding_prefix(service);
            let service_env = self.service_env(service)?;
            // Values pass through literally: a "-" credential is not a deletion here.
            entries.extend(
                derive_binding_env(&service_env, &prefix)
                    .into_iter()
                    .map(|(key, value)| format!("{}={}", key, value)),
            );
            prefixes.push(prefix);
        }
        if !prefixes.is_empty() {
            entries.push(format!("{}={}", BOUND_SERVICES, prefixes.join(" ")));
        }
        Ok(entries)
    }

    pub fn ensure_service_exists(&self, app: &Application) -> Result<Reconciled> {
        if self.client.exists(ObjectKind::Service, &app.name)? {
            println!(
                "==> Service already exists for {}, skipping creating one",
                app.name
            );
            return Ok(Reconciled::Skipped);
        }
        self.client.expose_deployment(&app.name, DEFAULT_PORT)?;
        Ok(Reconciled::Created)
    }

    pub fn ensure_route_exists(&self, app: &Application) -> Result<Reconciled> {
        if self.client.exists(ObjectKind::Route, &app.name)? {
            println!(
                "==> Route already exists for {}, skipping creating one",
                app.name
            );
            return Ok(Reconciled::Skipped);
        }
        self.client.expose_service(&app.name)?;
        Ok(Reconciled::Created)
    }

    pub fn display_route(&self, app: &Application) -> Result<String> {
        let host = self.client.route_host(&app.name)?;
        println!("==> Your application is available at {}", host);
        Ok(host)
    }

    fn require_deployment(&self, app_name: &str) -> Result<()> {
        if !self.client.exists(ObjectKind::DeploymentConfig, app_name)? {
            return Err(Error::AppNotFound(app_name.to_string()));
        }
        Ok(())
    }

    fn service_env(&self, service: &str) -> Result<EnvMap> {
        match self.client.read_env(ObjectKind::DeploymentConfig, service) {
            Err(Error::NotFound { .. }) => Err(Error::ServiceNotFound(service.to_string())),
            other => other,
        }
    }
}
