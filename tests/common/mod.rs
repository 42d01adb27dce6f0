//! Common test utilities for ocf integration tests.
//!
//! Provides `TestEnv`, an isolated working directory plus a scripted fake
//! `oc` that keeps cluster state in plain files.

#![allow(dead_code)]

use assert_cmd::Command;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
pub use tempfile::TempDir;

/// Fake `oc`. Objects are `obj_<kind>_<name>` marker files, environments
/// are `env_<kind>_<name>` files of `KEY=VALUE` lines, and every
/// invocation is appended to `calls.log`.
const FAKE_OC: &str = r##"#!/bin/sh
state="$OCF_FAKE_STATE"
echo "$*" >> "$state/calls.log"
cmd="$1"
shift

not_found() {
    echo "Error from server (NotFound): $1 \"$2\" not found"
    exit 1
}

remove_key() {
    grep -v "^$2=" "$1" > "$1.tmp"
    mv "$1.tmp" "$1"
}

case "$cmd" in
whoami)
    [ -f "$state/logged_in" ] || exit 1
    echo developer
    ;;
login)
    touch "$state/logged_in"
    ;;
project)
    echo demo
    ;;
get)
    kind="$1"
    name="$2"
    [ -f "$state/obj_${kind}_${name}" ] || not_found "$kind" "$name"
    if [ "$3" = "-o" ]; then
        case "$kind" in
        is) printf '172.30.1.1:5000/demo/%s' "$name" ;;
        route) printf '%s-demo.apps.example.com' "$name" ;;
        esac
    else
        echo "NAME"
        echo "$name"
    fi
    ;;
env)
    kind="$1"
    name="$2"
    shift 2
    [ -f "$state/obj_${kind}_${name}" ] || not_found "$kind" "$name"
    envfile="$state/env_${kind}_${name}"
    touch "$envfile"
    if [ "$1" = "--list" ]; then
        echo "# $kind $name, container $name"
        cat "$envfile"
        exit 0
    fi
    for entry in "$@"; do
        case "$entry" in
        *=*)
            remove_key "$envfile" "${entry%%=*}"
            echo "$entry" >> "$envfile"
            ;;
        *-)
            remove_key "$envfile" "${entry%-}"
            ;;
        esac
    done
    echo "$kind/$name updated"
    ;;
new-build)
    for arg in "$@"; do
        case "$arg" in
        --name=*) name="${arg#--name=}" ;;
        esac
    done
    touch "$state/obj_bc_${name}" "$state/obj_is_${name}"
    for arg in "$@"; do
        case "$arg" in
        *=*) case "$arg" in --*) ;; *) echo "$arg" >> "$state/env_bc_${name}" ;; esac ;;
        esac
    done
    echo "--> Creating resources with label build=${name} ..."
    exit 1
    ;;
start-build)
    [ -f "$state/obj_bc_$1" ] || not_found bc "$1"
    echo "Uploading directory for build $1"
    ;;
run)
    name="$1"
    touch "$state/obj_dc_${name}"
    : > "$state/env_dc_${name}"
    for arg in "$@"; do
        case "$arg" in
        --env=*) printf '%s\n' "${arg#--env=}" | tr ',' '\n' >> "$state/env_dc_${name}" ;;
        esac
    done
    echo "deploymentconfig \"${name}\" created"
    ;;
deploy)
    echo "Started deployment #2"
    ;;
expose)
    case "$1" in
    dc) touch "$state/obj_svc_$2" ;;
    svc) touch "$state/obj_route_$2" ;;
    esac
    echo "$1 \"$2\" exposed"
    ;;
*)
    echo "unknown command: $cmd"
    exit 1
    ;;
esac
exit 0
"##;

/// Write the fake `oc` once per test binary.
///
/// Every `TestEnv` waits here first, so no test spawns a process while
/// the script is still open for writing.
fn fake_oc() -> &'static Path {
    static SCRIPT: OnceLock<(TempDir, PathBuf)> = OnceLock::new();
    let (_, path) = SCRIPT.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("oc");
        std::fs::write(&path, FAKE_OC).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        (dir, path)
    });
    path
}

/// A test environment with an isolated working directory and cluster.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub state_dir: TempDir,
}

impl TestEnv {
    /// Create a logged-in environment with an empty cluster.
    pub fn new() -> Self {
        fake_oc();
        let env = Self {
            work_dir: TempDir::new().unwrap(),
            state_dir: TempDir::new().unwrap(),
        };
        std::fs::write(env.state_dir.path().join("logged_in"), "").unwrap();
        env
    }

    /// Get a Command for the ocf binary wired to the fake `oc`.
    pub fn ocf(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ocf"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("OCF_OC_BINARY", fake_oc());
        cmd.env("OCF_FAKE_STATE", self.state_dir.path());
        cmd.env("OCF_CONFIG", self.state_dir.path().join("config.kdl"));
        cmd.env_remove("OCF_IMAGE");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Path of the fake `oc` every command is wired to.
    pub fn oc_path(&self) -> &'static Path {
        fake_oc()
    }

    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Write config.kdl for this environment.
    pub fn write_config(&self, content: &str) {
        std::fs::write(self.state_dir.path().join("config.kdl"), content).unwrap();
    }

    /// Add an object to the fake cluster.
    pub fn add_object(&self, kind: &str, name: &str) {
        std::fs::write(self.object_file(kind, name), "").unwrap();
    }

    /// Add an object with environment variables.
    pub fn add_env(&self, kind: &str, name: &str, pairs: &[(&str, &str)]) {
        self.add_object(kind, name);
        let content: String = pairs
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v))
            .collect();
        std::fs::write(self.env_file(kind, name), content).unwrap();
    }

    pub fn has_object(&self, kind: &str, name: &str) -> bool {
        self.object_file(kind, name).exists()
    }

    /// Stored environment of an object, sorted.
    pub fn env_of(&self, kind: &str, name: &str) -> Vec<String> {
        let mut lines: Vec<String> = std::fs::read_to_string(self.env_file(kind, name))
            .unwrap_or_default()
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    /// Every `oc` invocation so far, one argument string per call.
    pub fn calls(&self) -> Vec<String> {
        std::fs::read_to_string(self.state_dir.path().join("calls.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn logout(&self) {
        let _ = std::fs::remove_file(self.state_dir.path().join("logged_in"));
    }

    fn object_file(&self, kind: &str, name: &str) -> PathBuf {
        self.state_dir.path().join(format!("obj_{}_{}", kind, name))
    }

    fn env_file(&self, kind: &str, name: &str) -> PathBuf {
        self.state_dir.path().join(format!("env_{}_{}", kind, name))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
