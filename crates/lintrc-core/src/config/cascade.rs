//! Cascading configuration with per-directory memoization
//!
//! `CascadingConfigFactory` layers everything a file's configuration is
//! made of: the caller's base config, the ancestor chain of config
//! files (truncated by `root`), the directory's own config, then the
//! `--config` file and inline CLI options. Each directory is loaded and
//! normalized at most once; finalized arrays are memoized by the
//! identity of the per-directory array they were built from.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::data::ConfigData;
use super::element::{identity, ConfigArray, ConfigElement};
use super::factory::{absolutize, ConfigArrayFactory, CreateOptions};
use crate::Result;

/// Options controlling the cascade
#[derive(Debug, Default)]
pub struct CascadeOptions {
    /// Caller-supplied configuration placed above everything else
    pub base_config: Option<ConfigData>,

    /// Inline CLI options, appended last
    pub cli_config: Option<ConfigData>,

    /// `--config` file, appended between the cascade and CLI options
    pub specific_config_path: Option<PathBuf>,

    /// When false, per-directory config files are not consulted at all
    pub use_eslintrc: bool,

    /// Fall back to the home-directory config when no config file was
    /// found anywhere in the cascade
    pub use_personal_config: bool,
}

impl CascadeOptions {
    pub fn new() -> Self {
        Self {
            use_eslintrc: true,
            ..Self::default()
        }
    }
}

/// Cascading, memoizing wrapper around [`ConfigArrayFactory`]
#[derive(Debug)]
pub struct CascadingConfigFactory {
    factory: ConfigArrayFactory,
    base: Arc<ConfigArray>,
    cli: Vec<ConfigElement>,
    use_eslintrc: bool,
    use_personal_config: bool,
    directory_cache: RefCell<HashMap<PathBuf, Arc<ConfigArray>>>,
    finalize_cache: RefCell<HashMap<usize, Arc<ConfigArray>>>,
}

impl CascadingConfigFactory {
    pub fn new(factory: ConfigArrayFactory, options: CascadeOptions) -> Result<Self> {
        let base = match options.base_config {
            Some(data) => factory.create(
                data,
                CreateOptions {
                    name: Some("BaseConfig"),
                    ..CreateOptions::default()
                },
            )?,
            None => Arc::new(ConfigArray::default()),
        };

        let mut cli = Vec::new();
        if let Some(path) = &options.specific_config_path {
            let array = factory.load_file(
                path,
                CreateOptions {
                    name: Some("--config"),
                    ..CreateOptions::default()
                },
            )?;
            cli.extend(array.iter().cloned());
        }
        if let Some(data) = options.cli_config {
            let array = factory.create(
                data,
                CreateOptions {
                    name: Some("CLIOptions"),
                    ..CreateOptions::default()
                },
            )?;
            cli.extend(array.iter().cloned());
        }

        Ok(Self {
            factory,
            base,
            cli,
            use_eslintrc: options.use_eslintrc,
            use_personal_config: options.use_personal_config,
            directory_cache: RefCell::new(HashMap::new()),
            finalize_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn factory(&self) -> &ConfigArrayFactory {
        &self.factory
    }

    pub fn cwd(&self) -> &Path {
        self.factory.cwd()
    }

    /// Finalized configuration in effect for files directly in `dir`
    pub fn config_for_directory(&self, dir: &Path) -> Result<Arc<ConfigArray>> {
        let array = self.config_on_directory(dir)?;
        self.finalize(array)
    }

    /// Finalized configuration in effect for one file
    pub fn config_for_file(&self, file: &Path) -> Result<Arc<ConfigArray>> {
        let file = absolutize(self.cwd(), file);
        let dir = file.parent().unwrap_or_else(|| self.cwd());
        self.config_for_directory(dir)
    }

    /// Unfinalized array for `dir`: base, ancestors, and the directory's
    /// own config file; memoized per directory.
    fn config_on_directory(&self, dir: &Path) -> Result<Arc<ConfigArray>> {
        if !self.use_eslintrc {
            return Ok(Arc::clone(&self.base));
        }
        let dir = absolutize(self.cwd(), dir);
        if let Some(hit) = self.directory_cache.borrow().get(&dir) {
            return Ok(Arc::clone(hit));
        }

        let array = self.load_directory_uncached(&dir)?;
        self.directory_cache
            .borrow_mut()
            .insert(dir, Arc::clone(&array));
        Ok(array)
    }

    fn load_directory_uncached(&self, dir: &Path) -> Result<Arc<ConfigArray>> {
        // The directory's own config decides whether ancestors are read
        // at all: a `root` config must stop the walk before any config
        // above it is touched.
        match self.factory.load_on_directory(dir, CreateOptions::default()) {
            Ok(Some(own)) if own.is_root() => {
                tracing::debug!("Cascade stopped by 'root' at {}", dir.display());
                Ok(Arc::new(ConfigArray::concat(
                    own.iter().cloned().collect(),
                    &self.base,
                )))
            }
            Ok(Some(own)) => {
                let parent = self.parent_config(dir)?;
                Ok(Arc::new(ConfigArray::concat(
                    own.iter().cloned().collect(),
                    &parent,
                )))
            }
            // No config here: share the parent's array by identity
            Ok(None) => self.parent_config(dir),
            Err(e) if e.is_permission_denied() => {
                tracing::debug!("Cascade stopped at {}: permission denied", dir.display());
                Ok(Arc::clone(&self.base))
            }
            Err(e) => Err(e),
        }
    }

    fn parent_config(&self, dir: &Path) -> Result<Arc<ConfigArray>> {
        match dir.parent() {
            Some(parent) if parent != dir => self.config_on_directory(parent),
            _ => Ok(Arc::clone(&self.base)),
        }
    }

    /// Append the personal config (when nothing file-backed was found),
    /// then the `--config` file and CLI options. Memoized by the
    /// identity of the input array.
    fn finalize(&self, array: Arc<ConfigArray>) -> Result<Arc<ConfigArray>> {
        let key = identity(&array);
        if let Some(hit) = self.finalize_cache.borrow().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let mut result = Arc::clone(&array);

        if self.use_eslintrc
            && self.use_personal_config
            && result.iter().all(|e| e.file_path.as_os_str().is_empty())
        {
            if let Some(home) = dirs::home_dir() {
                tracing::debug!("Loading personal config from {}", home.display());
                if let Some(with_personal) = self.factory.load_on_directory(
                    &home,
                    CreateOptions {
                        parent: Some(&result),
                        ..CreateOptions::default()
                    },
                )? {
                    result = with_personal;
                }
            }
        }

        if !self.cli.is_empty() {
            result = Arc::new(ConfigArray::concat(self.cli.clone(), &result));
        }

        self.finalize_cache
            .borrow_mut()
            .insert(key, Arc::clone(&result));
        Ok(result)
    }
}
