//! CLI argument definitions for ocf.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("OCF_GIT_COMMIT"),
    " ",
    env!("OCF_BUILD_TIMESTAMP"),
    ")"
);

/// ocf - Push applications to OpenShift the way `cf push` does.
#[derive(Parser, Debug)]
#[command(name = "ocf")]
#[command(author, version = VERSION, about = "Push applications to OpenShift and bind services to them", long_about = None)]
pub struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to config.kdl (default: ~/.config/ocf/config.kdl)
    #[arg(long, global = true, env = "OCF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Platform binary to run instead of `oc`
    #[arg(long = "oc", global = true, value_name = "PATH")]
    pub oc_binary: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new application or update an existing one
    ///
    /// Not all Cloud Foundry options are supported; those that are
    /// are listed below.
    #[command(after_help = "Examples:\n  \
        ocf push target/foo.jar      # from a local Java artifact\n  \
        ocf push my-new-app          # from the code in the current directory\n  \
        ocf push                     # from manifest.yml")]
    Push {
        /// Application name
        name: Option<String>,

        /// Custom buildpack by Git URL, or 'default'/'null' for built-in buildpacks
        #[arg(short = 'b', long)]
        buildpack: Option<String>,

        /// Startup command, 'null' to reset to the default start command
        #[arg(short = 'c', long)]
        command: Option<String>,

        /// Path to manifest
        #[arg(short = 'f', long = "manifest-path")]
        manifest_path: Option<PathBuf>,

        /// Memory limit (e.g. 256M, 1024M, 1G)
        #[arg(short = 'm', long)]
        memory: Option<String>,

        /// Path to app directory or to an artifact of the app
        #[arg(short = 'p', long)]
        path: Option<PathBuf>,

        /// Base Docker image to use when building and deploying applications
        #[arg(long)]
        image: Option<String>,
    },

    /// Bind a service to an application
    BindService {
        /// Application name
        app: String,
        /// Service name
        service: String,
    },

    /// Unbind a service from an application
    UnbindService {
        /// Application name
        app: String,
        /// Service name
        service: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,
}
