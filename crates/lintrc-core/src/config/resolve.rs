//! Reference resolution for `extends`, `plugins`, and `parser`
//!
//! Specifiers are classified by prefix: `eslint:` names hit the built-in
//! table, `plugin:<pkg>/<name>` loads a plugin and reads one of its
//! shareable configs, package-shaped names normalize to
//! `eslint-config-<name>` / `eslint-plugin-<name>` (scoped forms
//! included), and everything else is a path relative to the importer.
//!
//! Module resolution and definition loading sit behind the [`PluginHost`]
//! trait so embedders can plug in a real module-resolution algorithm; the
//! default host only resolves path-shaped requests. A caller-provided
//! plugin pool is consulted before any filesystem resolution, which is
//! how in-memory plugins are injected.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::builtin::default_builtin_configs;
use super::data::{ConfigData, ParserDefinition, PluginDefinition, Reference};
use crate::error::{LintrcError, ReferenceError};
use crate::Result;

const CONFIG_PREFIX: &str = "eslint-config";
const PLUGIN_PREFIX: &str = "eslint-plugin";

/// Normalize a shareable package name: `foo` becomes `<prefix>-foo`,
/// `@scope` becomes `@scope/<prefix>`, `@scope/foo` becomes
/// `@scope/<prefix>-foo`. Already-prefixed names pass through.
pub fn normalize_package_name(name: &str, prefix: &str) -> String {
    let name = name.replace('\\', "/");

    if let Some(rest) = name.strip_prefix('@') {
        match rest.split_once('/') {
            // "@scope", "@scope/", "@scope/<prefix>"
            None => format!("@{rest}/{prefix}"),
            Some((scope, pkg)) if pkg.is_empty() || pkg == prefix => {
                format!("@{scope}/{prefix}")
            }
            Some((_, pkg)) if pkg.starts_with(&format!("{prefix}-")) => name.clone(),
            Some((scope, pkg)) => format!("@{scope}/{prefix}-{pkg}"),
        }
    } else if name.starts_with(&format!("{prefix}-")) {
        name
    } else {
        format!("{prefix}-{name}")
    }
}

/// The inverse of [`normalize_package_name`]: the shorthand id a
/// normalized package is registered under.
pub fn get_shorthand_name(full_name: &str, prefix: &str) -> String {
    if let Some(rest) = full_name.strip_prefix('@') {
        if let Some((scope, pkg)) = rest.split_once('/') {
            if pkg == prefix {
                return format!("@{scope}");
            }
            if let Some(short) = pkg.strip_prefix(&format!("{prefix}-")) {
                return format!("@{scope}/{short}");
            }
        }
        full_name.to_string()
    } else if let Some(short) = full_name.strip_prefix(&format!("{prefix}-")) {
        short.to_string()
    } else {
        full_name.to_string()
    }
}

/// Package-shaped specifier: first char is a word char or `@`, and the
/// specifier is not an `<anything>:` protocol-style name.
fn is_package_request(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '@' || c == '_' || c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.next() != Some(':')
}

/// Module resolution and definition loading, pluggable per embedder.
///
/// `resolve` maps a module request to a file path relative to the
/// importing file. The load methods turn resolved paths into in-memory
/// definitions.
pub trait PluginHost {
    fn resolve(&self, request: &str, importer: &Path) -> std::io::Result<PathBuf>;

    fn load_plugin(&self, path: &Path) -> Result<Arc<PluginDefinition>>;

    fn load_parser(&self, path: &Path) -> Result<Arc<ParserDefinition>>;
}

/// Default host: resolves absolute and relative requests against the
/// importer's directory; bare package names are unresolvable without a
/// real module-resolution algorithm.
#[derive(Debug, Default)]
pub struct PathOnlyHost;

impl PluginHost for PathOnlyHost {
    fn resolve(&self, request: &str, importer: &Path) -> std::io::Result<PathBuf> {
        let request_path = Path::new(request);
        let candidate = if request_path.is_absolute() {
            request_path.to_path_buf()
        } else if request.starts_with('.') {
            importer
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(request_path)
        } else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("cannot resolve bare specifier '{request}' without a module host"),
            ));
        };

        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("'{}' does not exist", candidate.display()),
            ))
        }
    }

    fn load_plugin(&self, path: &Path) -> Result<Arc<PluginDefinition>> {
        Err(LintrcError::cannot_read(
            path,
            "plugin definitions must be provided through the plugin pool or a custom host",
        ))
    }

    fn load_parser(&self, path: &Path) -> Result<Arc<ParserDefinition>> {
        Err(LintrcError::cannot_read(
            path,
            "parser definitions must be provided through a custom host",
        ))
    }
}

/// The target an `extends` specifier resolved to
#[derive(Debug)]
pub enum ExtendsTarget {
    /// An entry of the built-in table
    Builtin { data: ConfigData },
    /// A config exported by a plugin's `configs` table
    Plugin {
        data: ConfigData,
        file_path: Option<PathBuf>,
    },
    /// A config file on disk
    File { path: PathBuf },
}

/// Resolves `extends` / `plugins` / `parser` specifiers
pub struct ReferenceResolver {
    builtins: IndexMap<String, ConfigData>,
    plugin_pool: IndexMap<String, Arc<PluginDefinition>>,
    host: Arc<dyn PluginHost>,
    resolve_plugins_relative_to: Option<PathBuf>,
}

impl std::fmt::Debug for ReferenceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceResolver")
            .field("builtins", &self.builtins.keys().collect::<Vec<_>>())
            .field("plugin_pool", &self.plugin_pool.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self {
            builtins: default_builtin_configs(),
            plugin_pool: IndexMap::new(),
            host: Arc::new(PathOnlyHost),
            resolve_plugins_relative_to: None,
        }
    }

    /// Replace or extend the built-in config table
    pub fn with_builtin_configs(mut self, configs: IndexMap<String, ConfigData>) -> Self {
        self.builtins.extend(configs);
        self
    }

    /// Register preloaded plugins. Each definition is reachable under
    /// both its long name and its shorthand id.
    pub fn with_plugin_pool(
        mut self,
        plugins: impl IntoIterator<Item = (String, Arc<PluginDefinition>)>,
    ) -> Self {
        for (name, definition) in plugins {
            let long_name = normalize_package_name(&name, PLUGIN_PREFIX);
            let short = get_shorthand_name(&long_name, PLUGIN_PREFIX);
            self.plugin_pool.insert(long_name, Arc::clone(&definition));
            self.plugin_pool.insert(short, definition);
        }
        self
    }

    pub fn with_host(mut self, host: Arc<dyn PluginHost>) -> Self {
        self.host = host;
        self
    }

    /// Pin plugin resolution to a fixed directory instead of each
    /// importing config file
    pub fn with_plugins_relative_to(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resolve_plugins_relative_to = Some(dir.into());
        self
    }

    /// Classify and resolve one `extends` specifier.
    ///
    /// Structural failures (unknown `eslint:` name, missing plugin
    /// config, unresolvable package) are eager.
    pub fn resolve_extends(&self, name: &str, importer: &Path) -> Result<ExtendsTarget> {
        if let Some(rest) = name.strip_prefix("eslint:") {
            return match self.builtins.get(name) {
                Some(data) => Ok(ExtendsTarget::Builtin { data: data.clone() }),
                None => Err(LintrcError::extend_missing(
                    name,
                    importer.display().to_string(),
                    format!("'eslint:{rest}' is not a built-in config"),
                )),
            };
        }

        if let Some(rest) = name.strip_prefix("plugin:") {
            return self.resolve_plugin_config(name, rest, importer);
        }

        if is_package_request(name) {
            let package = normalize_package_name(name, CONFIG_PREFIX);
            tracing::debug!("Resolving shareable config package: {package}");
            return match self.host.resolve(&package, importer) {
                Ok(path) => Ok(ExtendsTarget::File { path }),
                Err(e) => Err(LintrcError::extend_missing(
                    name,
                    importer.display().to_string(),
                    e.to_string(),
                )),
            };
        }

        let path = Path::new(name);
        if path.is_absolute() {
            return Ok(ExtendsTarget::File {
                path: path.to_path_buf(),
            });
        }

        Ok(ExtendsTarget::File {
            path: importer
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(path),
        })
    }

    fn resolve_plugin_config(
        &self,
        full_name: &str,
        rest: &str,
        importer: &Path,
    ) -> Result<ExtendsTarget> {
        let Some(slash) = rest.rfind('/') else {
            return Err(LintrcError::extend_missing(
                full_name,
                importer.display().to_string(),
                "plugin reference does not name a config ('plugin:<package>/<config>')",
            ));
        };
        let (plugin_name, config_name) = (&rest[..slash], &rest[slash + 1..]);

        let reference = self.resolve_plugin(plugin_name, importer)?;
        let definition = reference.definition().map_err(|e| {
            LintrcError::extend_missing(
                full_name,
                importer.display().to_string(),
                e.to_string(),
            )
        })?;

        match definition.configs.get(config_name) {
            Some(data) => Ok(ExtendsTarget::Plugin {
                data: data.clone(),
                file_path: reference.file_path().map(Path::to_path_buf),
            }),
            None => Err(LintrcError::extend_missing(
                full_name,
                importer.display().to_string(),
                format!("plugin '{plugin_name}' does not export a config named '{config_name}'"),
            )),
        }
    }

    /// Resolve a plugin, registering it under its shorthand id.
    ///
    /// Only whitespace in the name fails eagerly; resolution failures are
    /// stored on the reference and raised at use time.
    pub fn resolve_plugin(
        &self,
        name: &str,
        importer: &Path,
    ) -> Result<Reference<PluginDefinition>> {
        let long_name = normalize_package_name(name, PLUGIN_PREFIX);
        let id = get_shorthand_name(&long_name, PLUGIN_PREFIX);
        self.resolve_plugin_as(name, &long_name, id, importer)
    }

    /// Resolve a plugin under a caller-chosen id (the mapping form of
    /// the `plugins` field).
    pub fn resolve_plugin_with_id(
        &self,
        name: &str,
        id: &str,
        importer: &Path,
    ) -> Result<Reference<PluginDefinition>> {
        let long_name = normalize_package_name(name, PLUGIN_PREFIX);
        self.resolve_plugin_as(name, &long_name, id.to_string(), importer)
    }

    fn resolve_plugin_as(
        &self,
        request: &str,
        long_name: &str,
        id: String,
        importer: &Path,
    ) -> Result<Reference<PluginDefinition>> {
        if request.contains(char::is_whitespace) {
            return Err(LintrcError::WhitespaceInPluginName {
                name: request.to_string(),
            });
        }

        if let Some(definition) = self
            .plugin_pool
            .get(long_name)
            .or_else(|| self.plugin_pool.get(request))
        {
            tracing::debug!("Plugin '{long_name}' found in the additional plugin pool");
            return Ok(Reference::Loaded {
                definition: Arc::clone(definition),
                file_path: None,
                id,
                importer: importer.to_path_buf(),
            });
        }

        let resolve_base = self
            .resolve_plugins_relative_to
            .as_ref()
            .map(|dir| dir.join("__plugin_base__"))
            .unwrap_or_else(|| importer.to_path_buf());

        let loaded = self
            .host
            .resolve(long_name, &resolve_base)
            .map_err(|e| e.to_string())
            .and_then(|path| {
                self.host
                    .load_plugin(&path)
                    .map(|definition| (definition, path))
                    .map_err(|e| e.to_string())
            });

        match loaded {
            Ok((definition, path)) => Ok(Reference::Loaded {
                definition,
                file_path: Some(path),
                id,
                importer: importer.to_path_buf(),
            }),
            Err(detail) => {
                tracing::debug!("Plugin '{long_name}' failed to load: {detail}");
                Ok(Reference::Failed {
                    error: ReferenceError::PluginMissing {
                        long_name: long_name.to_string(),
                        importer: importer.display().to_string(),
                        detail,
                    },
                    id,
                    importer: importer.to_path_buf(),
                })
            }
        }
    }

    /// Resolve a parser specifier (a module name or a path). Failures
    /// are stored lazily, like plugins.
    pub fn resolve_parser(&self, name: &str, importer: &Path) -> Reference<ParserDefinition> {
        let loaded = self
            .host
            .resolve(name, importer)
            .map_err(|e| e.to_string())
            .and_then(|path| {
                self.host
                    .load_parser(&path)
                    .map(|definition| (definition, path))
                    .map_err(|e| e.to_string())
            });

        match loaded {
            Ok((definition, path)) => Reference::Loaded {
                definition,
                file_path: Some(path),
                id: name.to_string(),
                importer: importer.to_path_buf(),
            },
            Err(detail) => {
                tracing::debug!("Parser '{name}' failed to load: {detail}");
                Reference::Failed {
                    error: ReferenceError::ParserMissing {
                        name: name.to_string(),
                        importer: importer.display().to_string(),
                        detail,
                    },
                    id: name.to_string(),
                    importer: importer.to_path_buf(),
                }
            }
        }
    }
}
