//! Compiled file-path predicates for `files` / `excludedFiles`
//!
//! Glob semantics: dot-files are matched, patterns without a separator
//! match against the base name at any depth, and matching is
//! case-sensitive. Patterns are matched against paths relative to the
//! directory of the config that declared them.

use glob::{MatchOptions, Pattern};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::error::LintrcError;
use crate::Result;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One compiled glob pattern
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    raw: String,
    pattern: Pattern,
    /// Separator-free patterns match the base name at any depth
    base_name_only: bool,
}

impl CompiledPattern {
    pub fn new(raw: &str) -> Result<Self> {
        let pattern = Pattern::new(raw).map_err(|e| LintrcError::InvalidConfig {
            path: PathBuf::new(),
            detail: format!("invalid glob pattern '{raw}': {e}"),
        })?;
        Ok(Self {
            raw: raw.to_string(),
            pattern,
            base_name_only: !raw.contains('/'),
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Test a path relative to the matcher's base directory
    pub fn matches(&self, relative: &Path) -> bool {
        if self.base_name_only {
            match relative.file_name() {
                Some(name) => self.pattern.matches_path_with(Path::new(name), MATCH_OPTIONS),
                None => false,
            }
        } else {
            self.pattern.matches_path_with(relative, MATCH_OPTIONS)
        }
    }
}

/// A compiled include/exclude predicate over file paths.
///
/// - include-only: any include matches
/// - exclude-only: no exclude matches
/// - both: an include matches and no exclude matches
///
/// Conjunctions arise when overrides nest: the parent's predicate is
/// AND-ed onto every element the child yields.
#[derive(Debug, Clone)]
pub enum FileMatcher {
    Patterns {
        base_path: PathBuf,
        includes: Vec<CompiledPattern>,
        excludes: Vec<CompiledPattern>,
    },
    And(Box<FileMatcher>, Box<FileMatcher>),
}

impl FileMatcher {
    /// Compile `files` / `excludedFiles` pattern sets.
    ///
    /// Returns `None` when neither set is given: the element applies to
    /// every file seen at its cascade level.
    pub fn create(
        includes: &[String],
        excludes: &[String],
        base_path: &Path,
    ) -> Result<Option<FileMatcher>> {
        if includes.is_empty() && excludes.is_empty() {
            return Ok(None);
        }
        Ok(Some(FileMatcher::Patterns {
            base_path: base_path.to_path_buf(),
            includes: includes
                .iter()
                .map(|p| CompiledPattern::new(p))
                .collect::<Result<_>>()?,
            excludes: excludes
                .iter()
                .map(|p| CompiledPattern::new(p))
                .collect::<Result<_>>()?,
        }))
    }

    /// The logical AND of two predicates, preserving traceability
    pub fn and(left: FileMatcher, right: FileMatcher) -> FileMatcher {
        FileMatcher::And(Box::new(left), Box::new(right))
    }

    /// AND two optional predicates; absent means "always true"
    pub fn and_optional(
        left: Option<FileMatcher>,
        right: Option<FileMatcher>,
    ) -> Option<FileMatcher> {
        match (left, right) {
            (Some(l), Some(r)) => Some(FileMatcher::and(l, r)),
            (Some(m), None) | (None, Some(m)) => Some(m),
            (None, None) => None,
        }
    }

    /// Test an absolute file path
    pub fn test(&self, path: &Path) -> bool {
        match self {
            FileMatcher::Patterns {
                base_path,
                includes,
                excludes,
            } => {
                let relative = match path.strip_prefix(base_path) {
                    Ok(relative) => relative,
                    // Outside the base directory: never matched
                    Err(_) => return false,
                };
                let included =
                    includes.is_empty() || includes.iter().any(|p| p.matches(relative));
                let excluded = excludes.iter().any(|p| p.matches(relative));
                included && !excluded
            }
            FileMatcher::And(left, right) => left.test(path) && right.test(path),
        }
    }

    /// Stable JSON descriptor of this predicate's origin, used for
    /// debug output and equality
    pub fn descriptor(&self) -> Value {
        match self {
            FileMatcher::Patterns {
                base_path,
                includes,
                excludes,
            } => json!({
                "basePath": base_path.to_string_lossy(),
                "includes": includes.iter().map(CompiledPattern::raw).collect::<Vec<_>>(),
                "excludes": excludes.iter().map(CompiledPattern::raw).collect::<Vec<_>>(),
            }),
            FileMatcher::And(left, right) => json!({
                "and": [left.descriptor(), right.descriptor()],
            }),
        }
    }
}

impl PartialEq for FileMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor() == other.descriptor()
    }
}

impl std::fmt::Display for FileMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.descriptor())
    }
}
