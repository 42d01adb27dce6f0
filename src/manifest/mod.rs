//! `manifest.yml` loading and merging with push flags.

use crate::app::Application;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up when the manifest path is a directory.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub applications: Vec<Application>,
}

/// Values given on the `push` command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushFlags {
    pub name: Option<String>,
    pub buildpack: Option<String>,
    pub command: Option<String>,
    pub manifest_path: Option<PathBuf>,
    pub memory: Option<String>,
    pub path: Option<PathBuf>,
}

impl PushFlags {
    /// Application described by the flags alone.
    pub fn to_application(&self) -> Result<Application> {
        Ok(Application {
            name: self.name.clone().unwrap_or_default(),
            buildpack: self.buildpack.as_deref().and_then(explicit_value),
            command: self.command.as_deref().and_then(explicit_value),
            memory: self.memory.as_deref().map(normalize_memory).transpose()?,
            path: self.path.clone().filter(|p| !p.as_os_str().is_empty()),
            services: Vec::new(),
        })
    }
}

/// `null` and `default` reset a value to the platform default.
fn explicit_value(value: &str) -> Option<String> {
    match value {
        "" | "null" | "default" => None,
        other => Some(other.to_string()),
    }
}

/// Normalize a memory quantity such as `256mb` to `256M`.
///
/// # Example
/// ```
/// use ocf::manifest::normalize_memory;
/// assert_eq!(normalize_memory("1gb").unwrap(), "1G");
/// assert!(normalize_memory("lots").is_err());
/// ```
pub fn normalize_memory(memory: &str) -> Result<String> {
    let upper = memory.trim().to_uppercase();
    let normalized = upper.strip_suffix('B').unwrap_or(&upper).to_string();
    let pattern = Regex::new(r"^\d+[EPTGMK]?$")
        .map_err(|e| Error::Other(format!("Invalid memory pattern: {}", e)))?;
    if !pattern.is_match(&normalized) {
        return Err(Error::InvalidInput(
            "Memory string must be in the format of 8690K, 256M, 256MB, 1G, 1GB, etc".to_string(),
        ));
    }
    Ok(normalized)
}

/// Resolve the manifest file: a directory means `<dir>/manifest.yml`.
pub fn manifest_file(manifest_path: Option<&Path>, cwd: &Path) -> PathBuf {
    let path = manifest_path.unwrap_or(cwd);
    if path.is_dir() {
        path.join(MANIFEST_FILE)
    } else {
        path.to_path_buf()
    }
}

/// Read manifest applications. A missing file yields none.
pub fn load_manifest(path: &Path) -> Result<Vec<Application>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no manifest");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let manifest: Manifest = serde_yaml::from_str(&content)?;
    tracing::debug!(path = %path.display(), apps = manifest.applications.len(), "loaded manifest");
    Ok(manifest.applications)
}

/// Combine manifest applications with the flags application.
///
/// - no manifest entries: the flags describe the only application
/// - one entry: flag values overwrite manifest fields
/// - several entries: a flag name selects one, otherwise all are pushed
///
/// Every result has a name and a path (defaulting to `cwd`).
pub fn merge_applications(
    manifest_apps: Vec<Application>,
    flags_app: Application,
    cwd: &Path,
) -> Result<Vec<Application>> {
    let selected = match manifest_apps.len() {
        0 => {
            if flags_app.name.is_empty() {
                return Err(Error::InvalidInput(
                    "Manifest file is not found in the current directory, please provide either an app name or manifest"
                        .to_string(),
                ));
            }
            vec![flags_app]
        }
        1 => {
            let mut apps = manifest_apps;
            let mut app = apps.remove(0);
            overwrite(&mut app, flags_app);
            vec![app]
        }
        _ if !flags_app.name.is_empty() => {
            let found: Vec<Application> = manifest_apps
                .into_iter()
                .filter(|app| app.name == flags_app.name)
                .collect();
            if found.is_empty() {
                return Err(Error::InvalidInput(format!(
                    "Could not find app named {} in manifest",
                    flags_app.name
                )));
            }
            found
        }
        _ => manifest_apps,
    };

    selected
        .into_iter()
        .map(|app| finish(app, cwd))
        .collect()
}

fn overwrite(app: &mut Application, flags: Application) {
    if !flags.name.is_empty() {
        app.name = flags.name;
    }
    if flags.buildpack.is_some() {
        app.buildpack = flags.buildpack;
    }
    if flags.command.is_some() {
        app.command = flags.command;
    }
    if flags.memory.is_some() {
        app.memory = flags.memory;
    }
    if flags.path.is_some() {
        app.path = flags.path;
    }
    if !flags.services.is_empty() {
        app.services = flags.services;
    }
}

fn finish(mut app: Application, cwd: &Path) -> Result<Application> {
    if app.name.is_empty() {
        return Err(Error::InvalidInput("App name is a required field".to_string()));
    }
    if app.path.is_none() {
        app.path = Some(cwd.to_path_buf());
    }
    Ok(app)
}

/// Applications to push for the given flags.
pub fn applications_for(flags: &PushFlags, cwd: &Path) -> Result<Vec<Application>> {
    let file = manifest_file(flags.manifest_path.as_deref(), cwd);
    let manifest_apps = load_manifest(&file)?;
    merge_applications(manifest_apps, flags.to_application()?, cwd)
}
