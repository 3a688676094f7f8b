//! lintrc core
//!
//! Hierarchical configuration resolver for ESLint-style cascading config
//! files. Given a set of file-path patterns, the enumerator produces for
//! every target file a single fully-resolved configuration derived from
//! inline options, a caller-supplied base config, cascading
//! per-directory config files, transitively included `extends`
//! configurations, and glob-gated `overrides` sections.

pub mod config;
pub mod discovery;
pub mod error;
pub mod result;

// Re-export commonly used types
pub use config::{
    CascadeOptions, CascadingConfigFactory, ConfigArray, ConfigArrayFactory, ConfigData,
    ConfigElement, ConfigFileLoader, CreateOptions, FileMatcher, PluginDefinition, PluginHost,
    Reference, ReferenceResolver, ResolvedConfig,
};
pub use discovery::{EntryFlag, FileEntry, FileEnumerator, IgnorePredicate, NoIgnoredPaths};
pub use error::{ErrorKind, LintrcError, ReferenceError};
pub use result::Result;

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lintrc_core=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
