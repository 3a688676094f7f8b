//! Hierarchical configuration resolution
//!
//! This module turns tree-shaped config sources into flat, ordered
//! element arrays and reduces them into per-file resolved
//! configurations:
//!
//! - [`ConfigFileLoader`] reads one config file, dispatching on its name
//!   (`.eslintrc.js`/`.yaml`/`.yml`/`.json`, `.eslintrc`,
//!   `package.json#eslintConfig`)
//! - the validator checks raw data against the two-mode schema
//!   (top-level vs override)
//! - [`ReferenceResolver`] classifies `extends`/`plugins`/`parser`
//!   specifiers (built-ins, plugin configs, shareable packages, paths)
//! - the normalizer flattens `extends` and `overrides` into an ordered
//!   lazy element sequence
//! - [`ConfigArray`] holds the ordered elements and extracts one
//!   [`ResolvedConfig`] per target file
//! - [`CascadingConfigFactory`] walks ancestor directories, honors the
//!   `root` sentinel, and memoizes per directory
//!
//! ## Example
//!
//! ```no_run
//! use lintrc_core::config::{CascadeOptions, CascadingConfigFactory, ConfigArrayFactory};
//! use std::path::Path;
//!
//! let factory = ConfigArrayFactory::new("/my/project");
//! let cascading = CascadingConfigFactory::new(factory, CascadeOptions::new())?;
//!
//! let config = cascading.config_for_file(Path::new("/my/project/src/app.js"))?;
//! let resolved = config.extract_config(Path::new("/my/project/src/app.js"))?;
//! println!("{} rules in effect", resolved.rules.len());
//! # Ok::<(), lintrc_core::LintrcError>(())
//! ```

mod builtin;
mod cascade;
mod data;
mod element;
mod extract;
mod factory;
mod loader;
mod matcher;
mod normalize;
mod resolve;
mod validate;

pub use builtin::{default_builtin_configs, ALL, RECOMMENDED};
pub use cascade::{CascadeOptions, CascadingConfigFactory};
pub use data::{
    ConfigData, ParserDefinition, PluginDefinition, PluginsField, ProcessorDefinition, Reference,
    StringOrList,
};
pub use element::{ConfigArray, ConfigElement};
pub use extract::{ResolvedConfig, ResolvedProcessor};
pub use factory::{
    AncestorsOptions, ConfigArrayFactory, CreateOptions, CONFIG_FILENAMES,
};
pub use loader::{ConfigFileLoader, NoScriptLoader, ScriptConfigLoader};
pub use matcher::{CompiledPattern, FileMatcher};
pub use resolve::{
    get_shorthand_name, normalize_package_name, ExtendsTarget, PathOnlyHost, PluginHost,
    ReferenceResolver,
};

pub(crate) use factory::absolutize;
