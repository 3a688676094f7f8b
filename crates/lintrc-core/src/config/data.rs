//! Configuration data types
//!
//! `ConfigData` is the deserialized form of one config source (a file, the
//! caller's base config, or CLI options) before normalization. Free-form
//! sub-maps stay as `serde_json` maps so resolution can merge them
//! generically; `serde_json` is built with `preserve_order`, which keeps
//! every map deterministic.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::ReferenceError;

/// A field that accepts one string or a list of strings
/// (`extends`, `files`, `excludedFiles`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// View the field as a slice of patterns
    pub fn as_slice(&self) -> &[String] {
        match self {
            StringOrList::One(s) => std::slice::from_ref(s),
            StringOrList::Many(v) => v.as_slice(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

impl From<&str> for StringOrList {
    fn from(value: &str) -> Self {
        StringOrList::One(value.to_string())
    }
}

impl From<Vec<String>> for StringOrList {
    fn from(value: Vec<String>) -> Self {
        StringOrList::Many(value)
    }
}

/// The `plugins` field: a list of plugin names, or a mapping of
/// prefix id to module name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PluginsField {
    List(Vec<String>),
    Map(IndexMap<String, String>),
}

/// One config source as written, before normalization.
///
/// `files` and `excludedFiles` are only legal when this data sits in an
/// override or array-fragment position; the validator enforces the
/// position rules (see the two-mode schema).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigData {
    /// Stop the ancestor walk at the directory holding this config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<bool>,

    /// Configs to include before this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<StringOrList>,

    /// Glob patterns gating this fragment (override position only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<StringOrList>,

    /// Glob patterns excluding files from this fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_files: Option<StringOrList>,

    /// File-scoped config fragments, applied after the body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Vec<ConfigData>>,

    /// Parser specifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,

    /// Free mapping handed to the parser
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parser_options: Option<Map<String, Value>>,

    /// Plugin names (list) or prefix-to-module mapping
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plugins: Option<PluginsField>,

    /// Environment switches (name to bool)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<Map<String, Value>>,

    /// Global visibility declarations (name to bool or visibility string)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globals: Option<Map<String, Value>>,

    /// Rule id to severity or `[severity, options...]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Map<String, Value>>,

    /// Free mapping shared with all rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Map<String, Value>>,

    /// Processor id of the form `<plugin>/<processor>`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,

    /// Deprecated; accepted with a warning and carried through verbatim
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecma_features: Option<Map<String, Value>>,
}

impl ConfigData {
    /// The `extends` field normalized to a slice
    pub fn extends_list(&self) -> &[String] {
        self.extends.as_ref().map(StringOrList::as_slice).unwrap_or(&[])
    }
}

/// A processor contributed by a plugin.
///
/// The callable surface (preprocess/postprocess) belongs to the lint
/// engine; the resolver only routes the definition by identity.
#[derive(Debug, Default)]
pub struct ProcessorDefinition {
    /// Whether fixes may pass through this processor
    pub supports_autofix: bool,
}

/// A parser definition, opaque to the resolver
#[derive(Debug, Default, Clone)]
pub struct ParserDefinition {
    /// Human-readable parser name, used in diagnostics
    pub name: String,
}

/// An in-memory plugin definition
#[derive(Debug, Default, Clone)]
pub struct PluginDefinition {
    /// Shareable configs reachable through `plugin:<pkg>/<name>`
    pub configs: IndexMap<String, ConfigData>,

    /// Processors by id; ids starting with `.` register extension
    /// processors for matching file types
    pub processors: IndexMap<String, Arc<ProcessorDefinition>>,
}

/// A resolved parser or plugin handle.
///
/// Resolution failures for plugins and parsers are not raised where they
/// occur; they are stored on the reference and surface only when the
/// definition is actually needed during extraction.
#[derive(Debug, Clone)]
pub enum Reference<T> {
    Loaded {
        definition: Arc<T>,
        file_path: Option<PathBuf>,
        id: String,
        importer: PathBuf,
    },
    Failed {
        error: ReferenceError,
        id: String,
        importer: PathBuf,
    },
}

impl<T> Reference<T> {
    /// The shorthand id this reference is registered under
    pub fn id(&self) -> &str {
        match self {
            Reference::Loaded { id, .. } | Reference::Failed { id, .. } => id,
        }
    }

    /// The config file that requested this reference
    pub fn importer(&self) -> &Path {
        match self {
            Reference::Loaded { importer, .. } | Reference::Failed { importer, .. } => importer,
        }
    }

    /// The file the definition was loaded from, if any
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Reference::Loaded { file_path, .. } => file_path.as_deref(),
            Reference::Failed { .. } => None,
        }
    }

    /// The definition, raising the stored error if loading failed
    pub fn definition(&self) -> crate::Result<&Arc<T>> {
        match self {
            Reference::Loaded { definition, .. } => Ok(definition),
            Reference::Failed { error, .. } => Err(error.clone().into()),
        }
    }

    /// The definition if it loaded, without raising
    pub fn loaded(&self) -> Option<&Arc<T>> {
        match self {
            Reference::Loaded { definition, .. } => Some(definition),
            Reference::Failed { .. } => None,
        }
    }

    /// The stored failure, if any
    pub fn error(&self) -> Option<&ReferenceError> {
        match self {
            Reference::Failed { error, .. } => Some(error),
            Reference::Loaded { .. } => None,
        }
    }
}
