//! Fakes shared by unit tests.
//!
//! `FakeRunner` scripts responses at the process layer; `FakePlatform`
//! keeps an in-memory cluster at the typed-client layer.

use crate::exec::{CommandOutput, CommandRunner, OcCommand, PLATFORM_BINARY};
use crate::platform::{
    BuildSource, DELETION_MARKER, DeploymentSpec, EnvMap, ObjectKind, PlatformClient,
};
use crate::{Error, Result};
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Runner that answers from a script and records every call.
///
/// Commands without a scripted response succeed with empty output.
#[derive(Default)]
pub struct FakeRunner {
    program: Option<String>,
    responses: HashMap<Vec<String>, CommandOutput>,
    calls: RefCell<Vec<Vec<String>>>,
    interactive_calls: RefCell<Vec<Vec<String>>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `program` as the binary commands run under.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = Some(program.to_string());
        self
    }

    /// Script the response for an exact argument vector.
    pub fn on(mut self, args: &[&str], output: CommandOutput) -> Self {
        self.responses
            .insert(args.iter().map(|s| s.to_string()).collect(), output);
        self
    }

    /// Non-interactive calls, in order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Interactive calls, in order.
    pub fn interactive_calls(&self) -> Vec<Vec<String>> {
        self.interactive_calls.borrow().clone()
    }

    fn respond(&self, cmd: &OcCommand) -> CommandOutput {
        let args = cmd.arg_list().to_vec();
        let response = self
            .responses
            .get(&args)
            .cloned()
            .unwrap_or_else(|| CommandOutput::ok(""));
        if cmd.is_interactive() {
            self.interactive_calls.borrow_mut().push(args);
        } else {
            self.calls.borrow_mut().push(args);
        }
        response
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, cmd: &OcCommand) -> Result<()> {
        self.respond(cmd).into_result(&self.render(cmd)).map(|_| ())
    }

    fn combined_output(&self, cmd: &OcCommand) -> Result<CommandOutput> {
        Ok(self.respond(cmd))
    }

    fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(PLATFORM_BINARY)
    }
}

/// In-memory platform that applies writes the way `oc` would.
pub struct FakePlatform {
    logged_in: Cell<bool>,
    project: String,
    objects: RefCell<BTreeSet<(ObjectKind, String)>>,
    envs: RefCell<BTreeMap<(ObjectKind, String), EnvMap>>,
    failing: BTreeSet<&'static str>,
    calls: RefCell<Vec<String>>,
    env_writes: RefCell<Vec<(ObjectKind, String, EnvMap)>>,
    builds: RefCell<Vec<(String, String, EnvMap)>>,
    deployments: RefCell<Vec<DeploymentSpec>>,
    started_builds: RefCell<Vec<(String, BuildSource)>>,
}

impl Default for FakePlatform {
    fn default() -> Self {
        Self {
            logged_in: Cell::new(true),
            project: "demo".to_string(),
            objects: RefCell::default(),
            envs: RefCell::default(),
            failing: BTreeSet::new(),
            calls: RefCell::default(),
            env_writes: RefCell::default(),
            builds: RefCell::default(),
            deployments: RefCell::default(),
            started_builds: RefCell::default(),
        }
    }
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_out(self) -> Self {
        self.logged_in.set(false);
        self
    }

    /// Make the named operation fail.
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    pub fn with_object(self, kind: ObjectKind, name: &str) -> Self {
        self.objects.borrow_mut().insert((kind, name.to_string()));
        self
    }

    /// Add an object with an environment.
    pub fn with_env(self, kind: ObjectKind, name: &str, pairs: &[(&str, &str)]) -> Self {
        let env = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.envs.borrow_mut().insert((kind, name.to_string()), env);
        self.with_object(kind, name)
    }

    /// Operation names, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn env_writes(&self) -> Vec<(ObjectKind, String, EnvMap)> {
        self.env_writes.borrow().clone()
    }

    pub fn builds(&self) -> Vec<(String, String, EnvMap)> {
        self.builds.borrow().clone()
    }

    pub fn deployments(&self) -> Vec<DeploymentSpec> {
        self.deployments.borrow().clone()
    }

    pub fn started_builds(&self) -> Vec<(String, BuildSource)> {
        self.started_builds.borrow().clone()
    }

    /// Current stored environment of an object.
    pub fn env_of(&self, kind: ObjectKind, name: &str) -> EnvMap {
        self.envs
            .borrow()
            .get(&(kind, name.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_object(&self, kind: ObjectKind, name: &str) -> bool {
        self.objects.borrow().contains(&(kind, name.to_string()))
    }

    fn record(&self, operation: &'static str) -> Result<()> {
        self.calls.borrow_mut().push(operation.to_string());
        if self.failing.contains(operation) {
            return Err(Error::Execution {
                command: format!("oc {}", operation),
                output: format!("{} failed", operation),
            });
        }
        Ok(())
    }

    fn insert(&self, kind: ObjectKind, name: &str) {
        self.objects.borrow_mut().insert((kind, name.to_string()));
    }

    fn apply_env(&self, kind: ObjectKind, name: &str, delta: &EnvMap) {
        let mut envs = self.envs.borrow_mut();
        let env = envs.entry((kind, name.to_string())).or_default();
        for (key, value) in delta {
            if value == DELETION_MARKER {
                env.remove(key);
            } else {
                env.insert(key.clone(), value.clone());
            }
        }
    }
}

impl PlatformClient for FakePlatform {
    fn logged_in(&self) -> bool {
        self.calls.borrow_mut().push("logged_in".to_string());
        self.logged_in.get()
    }

    fn login(&self) -> Result<()> {
        self.record("login")?;
        self.logged_in.set(true);
        Ok(())
    }

    fn current_project(&self) -> Result<String> {
        self.record("current_project")?;
        Ok(self.project.clone())
    }

    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool> {
        self.record("exists")?;
        Ok(self.has_object(kind, name))
    }

    fn create_build(&self, image: &str, name: &str, env: &EnvMap) -> Result<()> {
        self.calls.borrow_mut().push("create_build".to_string());
        self.builds
            .borrow_mut()
            .push((image.to_string(), name.to_string(), env.clone()));
        self.insert(ObjectKind::BuildConfig, name);
        self.insert(ObjectKind::ImageStream, name);
        self.apply_env(ObjectKind::BuildConfig, name, env);
        Ok(())
    }

    fn read_env(&self, kind: ObjectKind, name: &str) -> Result<EnvMap> {
        self.record("read_env")?;
        if !self.has_object(kind, name) {
            return Err(Error::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
        Ok(self.env_of(kind, name))
    }

    fn write_env(&self, kind: ObjectKind, name: &str, env: &EnvMap) -> Result<()> {
        self.record("write_env")?;
        self.env_writes
            .borrow_mut()
            .push((kind, name.to_string(), env.clone()));
        self.apply_env(kind, name, env);
        Ok(())
    }

    fn start_build(&self, name: &str, source: &BuildSource) -> Result<()> {
        self.record("start_build")?;
        self.started_builds
            .borrow_mut()
            .push((name.to_string(), source.clone()));
        Ok(())
    }

    fn image_repository(&self, name: &str) -> Result<String> {
        self.record("image_repository")?;
        Ok(format!("172.30.1.1:5000/{}/{}", self.project, name))
    }

    fn create_deployment(&self, spec: &DeploymentSpec) -> Result<()> {
        self.record("create_deployment")?;
        self.deployments.borrow_mut().push(spec.clone());
        self.insert(ObjectKind::DeploymentConfig, &spec.name);
        // `--env` entries are literal assignments.
        let env: EnvMap = spec
            .env
            .iter()
            .filter_map(|entry| entry.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.envs
            .borrow_mut()
            .insert((ObjectKind::DeploymentConfig, spec.name.clone()), env);
        Ok(())
    }

    fn redeploy(&self, _name: &str) -> Result<()> {
        self.record("redeploy")
    }

    fn expose_deployment(&self, name: &str, _port: u16) -> Result<()> {
        self.record("expose_deployment")?;
        self.insert(ObjectKind::Service, name);
        Ok(())
    }

    fn expose_service(&self, name: &str) -> Result<()> {
        self.record("expose_service")?;
        self.insert(ObjectKind::Route, name);
        Ok(())
    }

    fn route_host(&self, name: &str) -> Result<String> {
        self.record("route_host")?;
        Ok(format!("{}-{}.apps.example.com", name, self.project))
    }
}
