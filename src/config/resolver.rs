//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`OCF_OC_BINARY`, `OCF_IMAGE`)
//! 3. config.kdl
//! 4. Built-in defaults

use crate::config::{OcfConfig, OutputFormat};
use crate::{Error, Result};
use kdl::KdlDocument;
use std::path::{Path, PathBuf};

/// Environment variable naming the platform binary.
pub const OC_BINARY_ENV: &str = "OCF_OC_BINARY";
/// Environment variable naming the builder image.
pub const IMAGE_ENV: &str = "OCF_IMAGE";
/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "OCF_CONFIG";

pub const DEFAULT_OC_BINARY: &str = "oc";
pub const DEFAULT_IMAGE: &str = "bbrowning/openshift-cloudfoundry-docker19";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from config.kdl
    File,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::File => write!(f, "config"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Config file consulted, if one could be located
    pub path: Option<PathBuf>,
    pub oc_binary: Resolved<String>,
    pub image: Resolved<String>,
    pub output_format: Resolved<OutputFormat>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            path: None,
            oc_binary: Resolved::new(DEFAULT_OC_BINARY.to_string(), ValueSource::Default),
            image: Resolved::new(DEFAULT_IMAGE.to_string(), ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Human, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn oc_binary(&self) -> &str {
        &self.oc_binary.value
    }

    pub fn image(&self) -> &str {
        &self.image.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }
}

/// Values that outrank the config file.
///
/// The CLI fills `*_env` from the process environment so resolution itself
/// stays free of global state.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub oc_binary: Option<String>,
    pub image: Option<String>,
    pub output_format: Option<OutputFormat>,
    pub oc_binary_env: Option<String>,
    pub image_env: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oc_binary(mut self, binary: impl Into<String>) -> Self {
        self.oc_binary = Some(binary.into());
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    /// Pick up `OCF_OC_BINARY` and `OCF_IMAGE` from the process environment.
    pub fn with_process_env(mut self) -> Self {
        self.oc_binary_env = non_empty_var(OC_BINARY_ENV);
        self.image_env = non_empty_var(IMAGE_ENV);
        self
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Default location of config.kdl (`~/.config/ocf/config.kdl`).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ocf").join("config.kdl"))
}

/// Read config.kdl. A missing file is an empty config.
pub fn read_config(path: &Path) -> Result<OcfConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(OcfConfig::new()),
        Err(e) => return Err(e.into()),
    };
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
    Ok(OcfConfig::from_kdl(&doc))
}

/// Resolve configuration with full precedence chain.
///
/// `path` overrides the default config location.
pub fn resolve_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let path = path.map(Path::to_path_buf).or_else(default_config_path);
    let file = match &path {
        Some(path) => read_config(path)?,
        None => OcfConfig::new(),
    };
    tracing::debug!(path = ?path, config = ?file, "loaded config");
    Ok(resolve_with(path, &file, overrides))
}

/// Apply precedence to an already-loaded config file.
pub fn resolve_with(
    path: Option<PathBuf>,
    file: &OcfConfig,
    overrides: &ConfigOverrides,
) -> ResolvedConfig {
    let mut result = ResolvedConfig {
        path,
        ..ResolvedConfig::default()
    };

    if let Some(ref binary) = overrides.oc_binary {
        result.oc_binary = Resolved::new(binary.clone(), ValueSource::CliFlag);
    } else if let Some(ref binary) = overrides.oc_binary_env {
        result.oc_binary = Resolved::new(
            binary.clone(),
            ValueSource::EnvVar(OC_BINARY_ENV.to_string()),
        );
    } else if let Some(ref binary) = file.oc_binary {
        result.oc_binary = Resolved::new(binary.clone(), ValueSource::File);
    }

    if let Some(ref image) = overrides.image {
        result.image = Resolved::new(image.clone(), ValueSource::CliFlag);
    } else if let Some(ref image) = overrides.image_env {
        result.image = Resolved::new(image.clone(), ValueSource::EnvVar(IMAGE_ENV.to_string()));
    } else if let Some(ref image) = file.image {
        result.image = Resolved::new(image.clone(), ValueSource::File);
    }

    if let Some(format) = overrides.output_format {
        result.output_format = Resolved::new(format, ValueSource::CliFlag);
    } else if let Some(format) = file.output_format {
        result.output_format = Resolved::new(format, ValueSource::File);
    }

    result
}
