//! Configuration for ocf.
//!
//! ## config.kdl - User preferences
//!
//! Located at `~/.config/ocf/config.kdl`, or wherever `--config` /
//! `OCF_CONFIG` points.
//!
//! Contains:
//! - `oc-binary` - Platform binary to run
//! - `image` - Builder image used for new build configs
//! - `output-format` - "human" or "json"
//!
//! ## Precedence
//!
//! CLI flag > environment variable > config.kdl > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_PATH_ENV, ConfigOverrides, DEFAULT_IMAGE, DEFAULT_OC_BINARY, IMAGE_ENV, OC_BINARY_ENV,
    Resolved, ResolvedConfig, ValueSource, default_config_path, read_config, resolve_config,
};
pub use schema::{OcfConfig, OutputFormat};
