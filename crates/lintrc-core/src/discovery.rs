//! File enumeration coupled to configuration
//!
//! Expands input patterns (literal files, directories, globs) into a
//! stream of `(path, config, flag)` entries. The walk loads each
//! directory's configuration as it descends, and a directory's config
//! can opt in files whose extension is not in the default list (via
//! `files` patterns in overrides). Ignore handling is an opaque
//! predicate supplied by the caller.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{absolutize, CascadingConfigFactory, ConfigArray, FileMatcher};
use crate::error::LintrcError;
use crate::Result;

/// Opaque ignore predicate (e.g. an `.eslintignore` implementation)
pub trait IgnorePredicate {
    fn is_ignored(&self, path: &Path) -> bool;
}

impl<F: Fn(&Path) -> bool> IgnorePredicate for F {
    fn is_ignored(&self, path: &Path) -> bool {
        self(path)
    }
}

/// Ignores nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIgnoredPaths;

impl IgnorePredicate for NoIgnoredPaths {
    fn is_ignored(&self, _path: &Path) -> bool {
        false
    }
}

/// Status of one enumerated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryFlag {
    /// Lint this file
    None,
    /// Matched during a walk but ignored; consumers usually skip silently
    Ignored,
    /// Directly specified on the command line yet ignored; consumers
    /// usually warn
    Warning,
}

/// One enumerated file with its finalized configuration
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub config: Arc<ConfigArray>,
    pub flag: EntryFlag,
}

/// Expands patterns into files, pairing each with its configuration
pub struct FileEnumerator {
    cascading: CascadingConfigFactory,
    extensions: Vec<String>,
    ignored: Box<dyn IgnorePredicate>,
}

impl std::fmt::Debug for FileEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileEnumerator")
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl FileEnumerator {
    pub fn new(cascading: CascadingConfigFactory) -> Self {
        Self {
            cascading,
            extensions: vec![".js".to_string()],
            ignored: Box::new(NoIgnoredPaths),
        }
    }

    /// Replace the default extension list (entries carry their dot)
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_ignored(mut self, ignored: Box<dyn IgnorePredicate>) -> Self {
        self.ignored = ignored;
        self
    }

    pub fn cascading(&self) -> &CascadingConfigFactory {
        &self.cascading
    }

    /// Enumerate files for the given patterns, in pattern order.
    ///
    /// The iterator is demand-driven: directory reads and config loads
    /// happen as it is pulled, and stopping early stops the I/O.
    pub fn iterate_files<S: AsRef<str>>(&self, patterns: &[S]) -> FileIterator<'_> {
        FileIterator {
            enumerator: self,
            patterns: patterns
                .iter()
                .map(|s| s.as_ref().to_string())
                .collect::<Vec<_>>()
                .into_iter(),
            walk: None,
            seen: HashSet::new(),
            fused: false,
        }
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

struct Frame {
    config: Arc<ConfigArray>,
    entries: std::vec::IntoIter<DirEntryInfo>,
}

struct DirEntryInfo {
    path: PathBuf,
    is_dir: bool,
}

struct Walk {
    frames: Vec<Frame>,
    selector: Option<FileMatcher>,
    recursive: bool,
}

/// Demand-driven iterator over `(path, config, flag)` entries
pub struct FileIterator<'a> {
    enumerator: &'a FileEnumerator,
    patterns: std::vec::IntoIter<String>,
    walk: Option<Walk>,
    seen: HashSet<PathBuf>,
    fused: bool,
}

enum Started {
    Entry(FileEntry),
    Walk,
    Nothing,
}

impl FileIterator<'_> {
    fn start_pattern(&mut self, pattern: &str) -> Result<Started> {
        let enumerator = self.enumerator;
        let cwd = enumerator.cascading.cwd();
        let absolute = absolutize(cwd, Path::new(pattern));

        match std::fs::metadata(&absolute) {
            Ok(meta) if meta.is_file() => {
                tracing::debug!("File: {}", absolute.display());
                let config = enumerator.cascading.config_for_file(&absolute)?;
                if !self.seen.insert(absolute.clone()) {
                    return Ok(Started::Nothing);
                }
                // Directly-specified ignored files always surface
                let flag = if enumerator.ignored.is_ignored(&absolute) {
                    EntryFlag::Warning
                } else {
                    EntryFlag::None
                };
                Ok(Started::Entry(FileEntry {
                    path: absolute,
                    config,
                    flag,
                }))
            }
            Ok(meta) if meta.is_dir() => {
                tracing::debug!("Directory: {}", absolute.display());
                self.begin_walk(absolute, None, true)?;
                Ok(Started::Walk)
            }
            _ => {
                let (parent, remainder) = glob_parent(pattern);
                let dir = absolutize(cwd, Path::new(&parent));
                if !dir.is_dir() {
                    tracing::debug!("Glob parent does not exist: {}", dir.display());
                    return Ok(Started::Nothing);
                }
                // Recurse only when the glob part can span directories
                let recursive = remainder.contains("**") || remainder.contains('/');
                let selector = FileMatcher::create(&[pattern.to_string()], &[], cwd)?;
                tracing::debug!(
                    "Glob: {pattern} (walk from {}, recursive: {recursive})",
                    dir.display()
                );
                self.begin_walk(dir, selector, recursive)?;
                Ok(Started::Walk)
            }
        }
    }

    fn begin_walk(
        &mut self,
        dir: PathBuf,
        selector: Option<FileMatcher>,
        recursive: bool,
    ) -> Result<()> {
        let config = self.enumerator.cascading.config_for_directory(&dir)?;
        let entries = read_dir_sorted(&dir)?;
        self.walk = Some(Walk {
            frames: vec![Frame { config, entries }],
            selector,
            recursive,
        });
        Ok(())
    }

    fn advance_walk(&mut self) -> Result<Option<FileEntry>> {
        let enumerator = self.enumerator;
        let Some(walk) = self.walk.as_mut() else {
            return Ok(None);
        };

        loop {
            let Some(frame) = walk.frames.last_mut() else {
                return Ok(None);
            };
            let Some(entry) = frame.entries.next() else {
                walk.frames.pop();
                continue;
            };
            let config = Arc::clone(&frame.config);

            if entry.is_dir {
                if walk.recursive && !enumerator.ignored.is_ignored(&entry.path) {
                    let config = enumerator.cascading.config_for_directory(&entry.path)?;
                    let entries = read_dir_sorted(&entry.path)?;
                    walk.frames.push(Frame { config, entries });
                }
                continue;
            }

            let matched = match &walk.selector {
                Some(selector) => selector.test(&entry.path),
                None => {
                    enumerator.matches_extension(&entry.path)
                        || config.matches_file(&entry.path)
                }
            };
            if !matched {
                continue;
            }
            if !self.seen.insert(entry.path.clone()) {
                continue;
            }

            let flag = if enumerator.ignored.is_ignored(&entry.path) {
                EntryFlag::Ignored
            } else {
                EntryFlag::None
            };
            return Ok(Some(FileEntry {
                path: entry.path,
                config,
                flag,
            }));
        }
    }
}

impl Iterator for FileIterator<'_> {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        loop {
            if self.walk.is_some() {
                match self.advance_walk() {
                    Ok(Some(entry)) => return Some(Ok(entry)),
                    Ok(None) => {
                        self.walk = None;
                        continue;
                    }
                    Err(e) => {
                        self.fused = true;
                        return Some(Err(e));
                    }
                }
            }

            let pattern = self.patterns.next()?;
            match self.start_pattern(&pattern) {
                Ok(Started::Entry(entry)) => return Some(Ok(entry)),
                Ok(Started::Walk) | Ok(Started::Nothing) => continue,
                Err(e) => {
                    self.fused = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Directory entries with metadata, sorted by name for a reproducible
/// order. Symlinks are not followed.
fn read_dir_sorted(dir: &Path) -> Result<std::vec::IntoIter<DirEntryInfo>> {
    let mut entries = Vec::new();
    let reader = std::fs::read_dir(dir).map_err(|e| LintrcError::io_error(dir, e))?;
    for entry in reader {
        let entry = entry.map_err(|e| LintrcError::io_error(dir, e))?;
        let file_type = entry.file_type().map_err(|e| LintrcError::io_error(dir, e))?;
        entries.push(DirEntryInfo {
            path: entry.path(),
            is_dir: file_type.is_dir(),
        });
    }
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries.into_iter())
}

/// Split a glob into its literal directory prefix and the glob part.
/// Without any magic segment the last segment is still the glob part
/// (it names the file to select).
fn glob_parent(pattern: &str) -> (String, String) {
    let segments: Vec<&str> = pattern.split('/').collect();
    let magic_index = segments
        .iter()
        .position(|segment| segment.contains(['*', '?', '[', ']', '{', '}']));
    let split_at = magic_index.unwrap_or_else(|| segments.len().saturating_sub(1));
    let parent = segments[..split_at].join("/");
    let remainder = segments[split_at..].join("/");
    let parent = if parent.is_empty() {
        ".".to_string()
    } else {
        parent
    };
    (parent, remainder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CascadeOptions, CascadingConfigFactory, ConfigArrayFactory};
    use std::fs;
    use tempfile::TempDir;

    fn enumerator(cwd: &Path) -> FileEnumerator {
        let factory = ConfigArrayFactory::new(cwd);
        let cascading = CascadingConfigFactory::new(factory, CascadeOptions::new()).unwrap();
        FileEnumerator::new(cascading)
    }

    fn paths(entries: &[FileEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|e| e.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_glob_parent_detection() {
        assert_eq!(
            glob_parent("src/**/*.ts"),
            ("src".to_string(), "**/*.ts".to_string())
        );
        assert_eq!(glob_parent("*.ts"), (".".to_string(), "*.ts".to_string()));
        assert_eq!(
            glob_parent("src/*.ts"),
            ("src".to_string(), "*.ts".to_string())
        );
        assert_eq!(
            glob_parent("src/missing.ts"),
            ("src".to_string(), "missing.ts".to_string())
        );
        assert_eq!(
            glob_parent("a/b/?.js"),
            ("a/b".to_string(), "?.js".to_string())
        );
    }

    #[test]
    fn test_recursion_flag() {
        // parent `.` with a separator-free remainder is non-recursive
        let cases = [
            ("*.ts", false),
            ("**/*.ts", true),
            ("src/*.ts", false),
            ("src/**/*.ts", true),
        ];
        for (pattern, expected) in cases {
            let (_, remainder) = glob_parent(pattern);
            let recursive = remainder.contains("**") || remainder.contains('/');
            assert_eq!(recursive, expected, "pattern {pattern}");
        }
    }

    #[test]
    fn test_directory_walk_with_extensions() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();
        fs::write(temp.path().join("b.txt"), "").unwrap();
        fs::write(temp.path().join("sub/c.js"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["."])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(paths(&entries), ["a.js", "c.js"]);
    }

    #[test]
    fn test_glob_walk() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/deep")).unwrap();
        fs::create_dir_all(temp.path().join("lib")).unwrap();
        fs::write(temp.path().join("src/a.ts"), "").unwrap();
        fs::write(temp.path().join("src/deep/b.ts"), "").unwrap();
        fs::write(temp.path().join("lib/c.ts"), "").unwrap();
        fs::write(temp.path().join("src/d.js"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["src/**/*.ts"])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(paths(&entries), ["a.ts", "b.ts"]);
    }

    #[test]
    fn test_non_recursive_glob() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("src/deep")).unwrap();
        fs::write(temp.path().join("src/a.ts"), "").unwrap();
        fs::write(temp.path().join("src/deep/b.ts"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["src/*.ts"])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(paths(&entries), ["a.ts"]);
    }

    #[test]
    fn test_direct_file_and_dedup() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["a.js", "a.js", "."])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        // deduplicated across patterns by absolute path
        assert_eq!(paths(&entries), ["a.js"]);
    }

    #[test]
    fn test_config_opts_in_extra_extensions() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(".eslintrc.json"),
            r#"{ "overrides": [{ "files": ["*.md"], "rules": {} }] }"#,
        )
        .unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();
        fs::write(temp.path().join("readme.md"), "").unwrap();
        fs::write(temp.path().join("notes.txt"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["."])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        // .md opted in by the override's files pattern; .txt not
        assert_eq!(paths(&entries), ["a.js", "readme.md"]);
    }

    #[test]
    fn test_ignored_flags() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();
        fs::write(temp.path().join("skip.js"), "").unwrap();

        let enumerator = enumerator(temp.path()).with_ignored(Box::new(|path: &Path| {
            path.file_name().is_some_and(|n| n == "skip.js")
        }));

        let entries: Vec<_> = enumerator
            .iterate_files(&["."])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        let skip = entries
            .iter()
            .find(|e| e.path.file_name().unwrap() == "skip.js")
            .unwrap();
        assert_eq!(skip.flag, EntryFlag::Ignored);

        // a directly-specified ignored file surfaces as a warning
        let entries: Vec<_> = enumerator
            .iterate_files(&["skip.js"])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].flag, EntryFlag::Warning);
    }

    #[test]
    fn test_ignored_directory_skipped_entirely() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("node_modules/dep")).unwrap();
        fs::write(temp.path().join("node_modules/dep/x.js"), "").unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();

        let enumerator = enumerator(temp.path()).with_ignored(Box::new(|path: &Path| {
            path.file_name().is_some_and(|n| n == "node_modules")
        }));

        let entries: Vec<_> = enumerator
            .iterate_files(&["."])
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(paths(&entries), ["a.js"]);
    }

    #[test]
    fn test_entries_carry_directory_config() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("sub")).unwrap();
        fs::write(
            temp.path().join(".eslintrc.json"),
            r#"{ "rules": { "outer": "error" } }"#,
        )
        .unwrap();
        fs::write(
            temp.path().join("sub/.eslintrc.json"),
            r#"{ "rules": { "inner": "warn" } }"#,
        )
        .unwrap();
        fs::write(temp.path().join("top.js"), "").unwrap();
        fs::write(temp.path().join("sub/deep.js"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let entries: Vec<_> = enumerator
            .iterate_files(&["."])
            .collect::<Result<Vec<_>>>()
            .unwrap();

        let top = entries
            .iter()
            .find(|e| e.path.file_name().unwrap() == "top.js")
            .unwrap();
        let deep = entries
            .iter()
            .find(|e| e.path.file_name().unwrap() == "deep.js")
            .unwrap();

        let top_resolved = top.config.extract_config(&top.path).unwrap();
        assert!(top_resolved.rules.contains_key("outer"));
        assert!(!top_resolved.rules.contains_key("inner"));

        let deep_resolved = deep.config.extract_config(&deep.path).unwrap();
        assert!(deep_resolved.rules.contains_key("outer"));
        assert!(deep_resolved.rules.contains_key("inner"));
    }

    #[test]
    fn test_iteration_is_lazy() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.js"), "").unwrap();
        fs::write(temp.path().join("b.js"), "").unwrap();

        let enumerator = enumerator(temp.path());
        let mut iterator = enumerator.iterate_files(&["."]);
        let first = iterator.next().unwrap().unwrap();
        assert_eq!(first.path.file_name().unwrap(), "a.js");
        // stopping here leaves b.js unvisited; dropping the iterator is fine
    }
}
