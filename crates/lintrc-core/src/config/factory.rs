//! Public entry points for building config arrays
//!
//! `ConfigArrayFactory` turns config sources into `ConfigArray`s: from
//! in-memory data (`create`), from a file (`load_file`), from a
//! directory's config file if present (`load_on_directory`), or from the
//! whole ancestor chain of a directory (`load_in_ancestors`).

use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::data::ConfigData;
use super::element::{ConfigArray, ConfigElement};
use super::loader::ConfigFileLoader;
use super::normalize::{ElementStream, NormalizeCtx};
use super::resolve::ReferenceResolver;
use super::validate::{parse_config_value, validate_config_data, RawConfig};
use crate::Result;

/// Per-directory config file candidates, in priority order; the first
/// that exists and yields non-null config wins.
pub const CONFIG_FILENAMES: [&str; 6] = [
    ".eslintrc.js",
    ".eslintrc.yaml",
    ".eslintrc.yml",
    ".eslintrc.json",
    ".eslintrc",
    "package.json",
];

/// Options for `create` / `load_file` / `load_on_directory`
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateOptions<'a> {
    /// Logical origin path for in-memory data
    pub file_path: Option<&'a Path>,
    /// Logical name; defaults to the origin path
    pub name: Option<&'a str>,
    /// Parent array prepended unless the new array is root
    pub parent: Option<&'a Arc<ConfigArray>>,
}

/// Options for `load_in_ancestors`
#[derive(Debug, Default, Clone, Copy)]
pub struct AncestorsOptions<'a> {
    /// Array placed above everything the walk collects
    pub parent: Option<&'a Arc<ConfigArray>>,
    /// Fall back to the home-directory config when the walk finds nothing
    pub use_personal_config: bool,
}

pub(crate) fn absolutize(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Builds config arrays from data, files, and directories
#[derive(Debug)]
pub struct ConfigArrayFactory {
    loader: ConfigFileLoader,
    resolver: ReferenceResolver,
    cwd: PathBuf,
}

impl ConfigArrayFactory {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            loader: ConfigFileLoader::new(),
            resolver: ReferenceResolver::new(),
            cwd: cwd.into(),
        }
    }

    pub fn with_loader(mut self, loader: ConfigFileLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_resolver(mut self, resolver: ReferenceResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub(crate) fn resolver(&self) -> &ReferenceResolver {
        &self.resolver
    }

    /// Load and validate a raw config file for normalization
    pub(crate) fn load_raw_config(&self, path: &Path) -> Result<RawConfig> {
        let value = self.loader.load_raw(path)?.ok_or_else(|| {
            crate::error::LintrcError::cannot_read(path, "file contributes no config")
        })?;
        parse_config_value(value, path)
    }

    /// Build an array from in-memory config data
    pub fn create(&self, data: ConfigData, options: CreateOptions<'_>) -> Result<Arc<ConfigArray>> {
        let file_path = options
            .file_path
            .map(|p| absolutize(&self.cwd, p))
            .unwrap_or_default();
        validate_config_data(&data, &file_path)?;

        let ctx = self.ctx_for(&file_path, options.name);
        let elements = ElementStream::for_data(self, data, ctx).collect::<Result<Vec<_>>>()?;
        Ok(self.assemble(elements, options.parent))
    }

    /// Build an array from a raw JSON value; the top level may be an
    /// object or an array of pre-flattened fragments
    pub fn create_raw(&self, value: Value, options: CreateOptions<'_>) -> Result<Arc<ConfigArray>> {
        let file_path = options
            .file_path
            .map(|p| absolutize(&self.cwd, p))
            .unwrap_or_default();
        let raw = parse_config_value(value, &file_path)?;

        let ctx = self.ctx_for(&file_path, options.name);
        let elements = ElementStream::for_raw(self, raw, ctx).collect::<Result<Vec<_>>>()?;
        Ok(self.assemble(elements, options.parent))
    }

    /// Load one config file; missing files are an error here
    pub fn load_file(&self, path: &Path, options: CreateOptions<'_>) -> Result<Arc<ConfigArray>> {
        let absolute = absolutize(&self.cwd, path);
        tracing::debug!("Loading config file: {}", absolute.display());
        let raw = self.load_raw_config(&absolute)?;

        let ctx = self.ctx_for(&absolute, options.name);
        let elements = ElementStream::for_raw(self, raw, ctx).collect::<Result<Vec<_>>>()?;
        Ok(self.assemble(elements, options.parent))
    }

    /// Load the per-directory config, trying each candidate file name;
    /// `None` when the directory has no config
    pub fn load_on_directory(
        &self,
        dir: &Path,
        options: CreateOptions<'_>,
    ) -> Result<Option<Arc<ConfigArray>>> {
        let dir = absolutize(&self.cwd, dir);
        for filename in CONFIG_FILENAMES {
            let path = dir.join(filename);
            match self.loader.load_raw(&path) {
                Ok(Some(value)) => {
                    tracing::debug!("Config file found: {}", path.display());
                    let raw = parse_config_value(value, &path)?;
                    let ctx = self.ctx_for(&path, options.name);
                    let elements =
                        ElementStream::for_raw(self, raw, ctx).collect::<Result<Vec<_>>>()?;
                    return Ok(Some(self.assemble(elements, options.parent)));
                }
                // package.json without an `eslintConfig` member
                Ok(None) => continue,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Full ancestor cascade for a leaf directory, without the leaf's
    /// own per-directory config.
    ///
    /// Walks upward from the leaf's parent; each found config prepends,
    /// a `root` config stops the walk, and permission failures stop it
    /// silently as if the filesystem root had been reached.
    pub fn load_in_ancestors(
        &self,
        leaf_dir: &Path,
        options: AncestorsOptions<'_>,
    ) -> Result<Arc<ConfigArray>> {
        let leaf = absolutize(&self.cwd, leaf_dir);
        let mut chain: Vec<Arc<ConfigArray>> = Vec::new();

        let mut current = leaf.parent().map(Path::to_path_buf);
        while let Some(dir) = current {
            match self.load_on_directory(&dir, CreateOptions::default()) {
                Ok(Some(array)) => {
                    let is_root = array.is_root();
                    chain.push(array);
                    if is_root {
                        tracing::debug!("Ancestor walk stopped by 'root' at {}", dir.display());
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) if e.is_permission_denied() => {
                    tracing::debug!(
                        "Ancestor walk stopped at {}: permission denied",
                        dir.display()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
            current = match dir.parent() {
                Some(parent) if parent != dir => Some(parent.to_path_buf()),
                _ => None,
            };
        }

        if chain.is_empty() && options.use_personal_config {
            if let Some(home) = dirs::home_dir() {
                tracing::debug!("Falling back to personal config in {}", home.display());
                if let Some(array) = self.load_on_directory(&home, CreateOptions::default())? {
                    chain.push(array);
                }
            }
        }

        let mut elements = Vec::new();
        for array in chain.iter().rev() {
            elements.extend(array.iter().cloned());
        }
        Ok(match options.parent {
            Some(parent) => Arc::new(ConfigArray::concat(elements, parent)),
            None => Arc::new(ConfigArray::new(elements)),
        })
    }

    fn ctx_for(&self, file_path: &Path, name: Option<&str>) -> NormalizeCtx {
        let match_base_path = if file_path.as_os_str().is_empty() {
            self.cwd.clone()
        } else {
            file_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| self.cwd.clone())
        };
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| self.default_name(file_path));
        NormalizeCtx::new(file_path.to_path_buf(), match_base_path, name)
    }

    fn default_name(&self, path: &Path) -> String {
        if path.as_os_str().is_empty() {
            return "UserConfig".to_string();
        }
        path.strip_prefix(&self.cwd)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    fn assemble(
        &self,
        elements: Vec<ConfigElement>,
        parent: Option<&Arc<ConfigArray>>,
    ) -> Arc<ConfigArray> {
        let array = ConfigArray::new(elements);
        match parent {
            // A root array discards its parent
            Some(parent) if !array.is_root() => {
                Arc::new(ConfigArray::concat(array.into_elements(), parent))
            }
            _ => Arc::new(array),
        }
    }
}
