//! Typed operations against the OpenShift CLI.
//!
//! [`PlatformClient`] is the seam the orchestrator works against.
//! [`OcClient`] implements it on top of a [`CommandRunner`] and owns all
//! knowledge of `oc` argument syntax and output conventions.

use crate::exec::{CommandRunner, OcCommand};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Environment variables stored on one platform object.
pub type EnvMap = BTreeMap<String, String>;

/// Value that removes a key when written, instead of setting it.
pub const DELETION_MARKER: &str = "-";

/// Output text `oc` uses to report a missing object.
pub const NOT_FOUND_MARKER: &str = "not found";

/// Port exposed by the service created for an application.
pub const DEFAULT_PORT: u16 = 8080;

/// Platform object types ocf manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectKind {
    BuildConfig,
    DeploymentConfig,
    Service,
    Route,
    ImageStream,
}

impl ObjectKind {
    /// Short name as accepted by `oc`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuildConfig => "bc",
            Self::DeploymentConfig => "dc",
            Self::Service => "svc",
            Self::Route => "route",
            Self::ImageStream => "is",
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where `oc start-build` reads the application from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildSource {
    /// Upload a source tree (`--from-dir`).
    Dir(PathBuf),
    /// Upload a single artifact such as a jar (`--from-file`).
    File(PathBuf),
}

impl BuildSource {
    /// Classify a path: anything that is not a readable regular file is
    /// treated as a directory.
    pub fn for_path(path: &Path) -> Self {
        match std::fs::metadata(path) {
            Ok(meta) if !meta.is_dir() => Self::File(path.to_path_buf()),
            _ => Self::Dir(path.to_path_buf()),
        }
    }

    fn to_arg(&self) -> String {
        match self {
            Self::Dir(path) => format!("--from-dir={}", path.display()),
            Self::File(path) => format!("--from-file={}", path.display()),
        }
    }
}

/// Arguments for creating a deployment config with `oc run`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentSpec {
    pub name: String,
    pub image: String,
    pub memory: Option<String>,
    /// `KEY=VALUE` entries, in order.
    pub env: Vec<String>,
}

impl DeploymentSpec {
    /// Build the `oc run` argument vector.
    ///
    /// # Example
    /// ```
    /// use ocf::platform::DeploymentSpec;
    /// let spec = DeploymentSpec {
    ///     name: "foo".to_string(),
    ///     image: "172.30.1.1:5000/demo/foo".to_string(),
    ///     memory: Some("2G".to_string()),
    ///     env: vec!["MEMORY_LIMIT=2G".to_string()],
    /// };
    /// assert_eq!(
    ///     spec.to_args(),
    ///     vec![
    ///         "run",
    ///         "foo",
    ///         "--image=172.30.1.1:5000/demo/foo",
    ///         "--limits=memory=2G",
    ///         "--env=MEMORY_LIMIT=2G",
    ///     ]
    /// );
    /// ```
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            self.name.clone(),
            format!("--image={}", self.image),
        ];
        if let Some(memory) = &self.memory {
            args.push(format!("--limits=memory={}", memory));
        }
        if !self.env.is_empty() {
            args.push(format!("--env={}", self.env.join(",")));
        }
        args
    }
}

/// Encode an environment map as `oc` arguments.
///
/// Values equal to [`DELETION_MARKER`] become `KEY-`, which removes the key.
pub fn encode_env_entries(env: &EnvMap) -> Vec<String> {
    env.iter()
        .map(|(key, value)| {
            if value == DELETION_MARKER {
                format!("{}-", key)
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect()
}

/// Parse `oc env --list` output.
///
/// Lines that do not split into exactly one key and one value on `=`
/// (blank lines, `#` comments, values containing `=`) are skipped.
pub fn parse_env_list(output: &str) -> EnvMap {
    let mut env = EnvMap::new();
    for line in output.lines() {
        let mut parts = line.split('=');
        if let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) {
            env.insert(key.to_string(), value.to_string());
        }
    }
    env
}

/// Trait for typed platform operations.
pub trait PlatformClient {
    /// Whether the CLI has a logged-in session. Failures map to `false`.
    fn logged_in(&self) -> bool;

    /// Run `oc login` attached to the terminal.
    fn login(&self) -> Result<()>;

    /// Name of the current project.
    fn current_project(&self) -> Result<String>;

    /// Check whether an object exists.
    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool>;

    /// Create a binary build config. Always succeeds; see [`OcClient`].
    fn create_build(&self, image: &str, name: &str, env: &EnvMap) -> Result<()>;

    /// Read the environment variables of an object.
    fn read_env(&self, kind: ObjectKind, name: &str) -> Result<EnvMap>;

    /// Apply an environment delta to an object.
    fn write_env(&self, kind: ObjectKind, name: &str, env: &EnvMap) -> Result<()>;

    /// Start a build and stream its log.
    fn start_build(&self, name: &str, source: &BuildSource) -> Result<()>;

    /// Docker repository of the image stream produced by the build.
    fn image_repository(&self, name: &str) -> Result<String>;

    /// Create a deployment config.
    fn create_deployment(&self, spec: &DeploymentSpec) -> Result<()>;

    /// Roll out the latest image of an existing deployment config.
    fn redeploy(&self, name: &str) -> Result<()>;

    /// Create a service in front of a deployment config.
    fn expose_deployment(&self, name: &str, port: u16) -> Result<()>;

    /// Create a route in front of a service.
    fn expose_service(&self, name: &str) -> Result<()>;

    /// Public host name of a route.
    fn route_host(&self, name: &str) -> Result<String>;
}

/// [`PlatformClient`] backed by the `oc` binary.
#[derive(Debug, Clone)]
pub struct OcClient<R> {
    runner: R,
}

impl<R: CommandRunner> OcClient<R> {
    /// Create a client that executes commands through `runner`.
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Run a mutating command: print a progress line, echo the output.
    fn mutate(&self, description: &str, cmd: OcCommand) -> Result<()> {
        let rendered = self.runner.render(&cmd);
        println!("==> {} with command: {}", description, rendered);
        let result = self.runner.combined_output(&cmd)?;
        println!("{}", result.output);
        result.into_result(&rendered).map(|_| ())
    }

    /// Run a query whose output is the answer.
    fn query(&self, cmd: OcCommand) -> Result<String> {
        let result = self.runner.combined_output(&cmd)?;
        result.into_result(&self.runner.render(&cmd))
    }
}

impl<R: CommandRunner> PlatformClient for OcClient<R> {
    fn logged_in(&self) -> bool {
        self.runner.run(&OcCommand::new("whoami")).is_ok()
    }

    fn login(&self) -> Result<()> {
        self.runner.run(&OcCommand::new("login").interactive())
    }

    fn current_project(&self) -> Result<String> {
        let output = self.query(OcCommand::new("project").arg("-q"))?;
        Ok(output.trim().to_string())
    }

    fn exists(&self, kind: ObjectKind, name: &str) -> Result<bool> {
        let cmd = OcCommand::new("get").arg(kind.as_str()).arg(name);
        let result = self.runner.combined_output(&cmd)?;

        // Absence is read from the text before the exit status is consulted.
        if result.output.contains(NOT_FOUND_MARKER) {
            Ok(false)
        } else if !result.success {
            Err(Error::Query {
                kind: kind.to_string(),
                name: name.to_string(),
                output: result.output,
            })
        } else {
            Ok(true)
        }
    }

    fn create_build(&self, image: &str, name: &str, env: &EnvMap) -> Result<()> {
        let cmd = OcCommand::new("new-build")
            .arg(image)
            .arg("--binary=true")
            .arg(format!("--name={}", name))
            .args(encode_env_entries(env));
        let rendered = self.runner.render(&cmd);
        println!("==> Creating build with command: {}", rendered);

        // oc new-build exits non-zero for ignorable conditions, so the
        // outcome is logged and never reported as a failure.
        match self.runner.combined_output(&cmd) {
            Ok(result) => {
                println!("{}", result.output);
                if !result.success {
                    tracing::warn!(
                        command = %rendered,
                        code = ?result.code,
                        "new-build exited unsuccessfully; continuing"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(command = %rendered, error = %e, "new-build did not run");
            }
        }
        Ok(())
    }

    fn read_env(&self, kind: ObjectKind, name: &str) -> Result<EnvMap> {
        let cmd = OcCommand::new("env").arg(kind.as_str()).arg(name).arg("--list");
        let result = self.runner.combined_output(&cmd)?;
        if !result.success {
            tracing::debug!(output = %result.output, "env --list failed");
            return Err(Error::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
            });
        }
        Ok(parse_env_list(&result.output))
    }

    fn write_env(&self, kind: ObjectKind, name: &str, env: &EnvMap) -> Result<()> {
        let cmd = OcCommand::new("env")
            .arg(kind.as_str())
            .arg(name)
            .args(encode_env_entries(env));
        let rendered = self.runner.render(&cmd);
        println!("==> Updating environment variables with command: {}", rendered);
        self.runner.combined_output(&cmd)?.into_result(&rendered).map(|_| ())
    }

    fn start_build(&self, name: &str, source: &BuildSource) -> Result<()> {
        let cmd = OcCommand::new("start-build")
            .arg(name)
            .arg(source.to_arg())
            .arg("--follow")
            .interactive();
        println!("==> Starting build with command: {}", self.runner.render(&cmd));
        self.runner.run(&cmd)
    }

    fn image_repository(&self, name: &str) -> Result<String> {
        let output = self.query(
            OcCommand::new("get")
                .arg(ObjectKind::ImageStream.as_str())
                .arg(name)
                .args(["-o", "template"])
                .arg("--template={{.status.dockerImageRepository}}"),
        )?;
        Ok(output.trim().to_string())
    }

    fn create_deployment(&self, spec: &DeploymentSpec) -> Result<()> {
        self.mutate(
            "Creating deployment config",
            OcCommand::from_args(spec.to_args()),
        )
    }

    fn redeploy(&self, name: &str) -> Result<()> {
        self.query(OcCommand::new("deploy").arg(name).arg("--latest"))
            .map(|_| ())
    }

    fn expose_deployment(&self, name: &str, port: u16) -> Result<()> {
        self.mutate(
            "Creating service",
            OcCommand::new("expose")
                .arg(ObjectKind::DeploymentConfig.as_str())
                .arg(name)
                .arg(format!("--port={}", port)),
        )
    }

    fn expose_service(&self, name: &str) -> Result<()> {
        self.mutate(
            "Creating route",
            OcCommand::new("expose")
                .arg(ObjectKind::Service.as_str())
                .arg(name),
        )
    }

    fn route_host(&self, name: &str) -> Result<String> {
        let output = self.query(
            OcCommand::new("get")
                .arg(ObjectKind::Route.as_str())
                .arg(name)
                .args(["-o", "template"])
                .arg("--template={{.spec.host}}"),
        )?;
        Ok(output.trim().to_string())
    }
}
