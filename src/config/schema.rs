//! KDL schema for config.kdl.

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON output
    Json,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User preferences stored in config.kdl.
///
/// # KDL Schema
///
/// ```kdl
/// oc-binary "/usr/local/bin/oc"
/// image "bbrowning/openshift-cloudfoundry-docker19"
/// output-format "human"  // or "json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcfConfig {
    /// Platform binary to run (name on PATH or a path)
    pub oc_binary: Option<String>,

    /// Builder image for new build configs
    pub image: Option<String>,

    /// Default output format for CLI commands
    pub output_format: Option<OutputFormat>,
}

impl OcfConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes and values of the wrong type are ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Self {
        let mut config = Self::new();

        config.oc_binary = string_node(doc, "oc-binary").filter(|s| !s.is_empty());
        config.image = string_node(doc, "image").filter(|s| !s.is_empty());
        config.output_format = string_node(doc, "output-format")
            .as_deref()
            .and_then(OutputFormat::parse);

        config
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref binary) = self.oc_binary {
            doc.nodes_mut().push(string_entry("oc-binary", binary));
        }
        if let Some(ref image) = self.image {
            doc.nodes_mut().push(string_entry("image", image));
        }
        if let Some(format) = self.output_format {
            doc.nodes_mut()
                .push(string_entry("output-format", format.as_str()));
        }

        doc
    }
}

fn string_node(doc: &KdlDocument, name: &str) -> Option<String> {
    doc.get(name)?
        .entries()
        .first()?
        .value()
        .as_string()
        .map(str::to_string)
}

fn string_entry(name: &str, value: &str) -> KdlNode {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(KdlValue::String(value.to_string())));
    node
}
