//! Config file reading and format dispatch
//!
//! One strategy per file name: `package.json` contributes its
//! `eslintConfig` member, `.eslintrc` (no extension) parses as YAML for
//! legacy compatibility, `.json` is comment-tolerant JSON, `.yaml`/`.yml`
//! are YAML, and `.js` (or any unknown extension) goes through the
//! pluggable script loader.

use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::error::LintrcError;
use crate::Result;

/// Hook for evaluating script-form config files (`.eslintrc.js`).
///
/// Script configs are host-evaluated; the core never caches the result,
/// so every load sees a fresh evaluation.
pub trait ScriptConfigLoader {
    fn load(&self, path: &Path) -> Result<Value>;
}

/// Default script loader: refuses with a diagnostic
#[derive(Debug, Default)]
pub struct NoScriptLoader;

impl ScriptConfigLoader for NoScriptLoader {
    fn load(&self, path: &Path) -> Result<Value> {
        Err(LintrcError::cannot_read(
            path,
            "script-form configs require a registered script loader",
        ))
    }
}

/// Reads one config file and returns its raw config value
pub struct ConfigFileLoader {
    script: Arc<dyn ScriptConfigLoader>,
}

impl std::fmt::Debug for ConfigFileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigFileLoader").finish_non_exhaustive()
    }
}

impl Default for ConfigFileLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigFileLoader {
    pub fn new() -> Self {
        Self {
            script: Arc::new(NoScriptLoader),
        }
    }

    pub fn with_script_loader(script: Arc<dyn ScriptConfigLoader>) -> Self {
        Self { script }
    }

    /// Load the raw config value from `path`.
    ///
    /// Returns `Ok(None)` when the file exists but contributes no config
    /// (a `package.json` without an `eslintConfig` member). A missing file
    /// is the recoverable `NotFound` condition the cascade skips over.
    pub fn load_raw(&self, path: &Path) -> Result<Option<Value>> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        if file_name == "package.json" {
            return self.load_package_json(path);
        }
        if file_name == ".eslintrc" {
            return self.load_yaml(path).map(Some);
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => self.load_jsonc(path).map(Some),
            Some("yaml") | Some("yml") => self.load_yaml(path).map(Some),
            // `.js` and anything unknown have script semantics
            _ => {
                if !path.is_file() {
                    return Err(LintrcError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                tracing::debug!("Loading script config: {}", path.display());
                self.script.load(path).map(Some)
            }
        }
    }

    fn read(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LintrcError::NotFound {
                path: path.to_path_buf(),
            },
            _ => LintrcError::io_error(path, e),
        })
    }

    /// JSON with comments and trailing commas tolerated
    fn load_jsonc(&self, path: &Path) -> Result<Value> {
        let content = self.read(path)?;
        let value: Value = json5::from_str(&content)
            .map_err(|e| LintrcError::cannot_read(path, e.to_string()))?;
        tracing::debug!("Loaded JSON config: {}", path.display());
        Ok(value)
    }

    /// YAML; a null document is an empty config
    fn load_yaml(&self, path: &Path) -> Result<Value> {
        let content = self.read(path)?;
        let value: Value = serde_yaml::from_str(&content)
            .map_err(|e| LintrcError::cannot_read(path, e.to_string()))?;
        tracing::debug!("Loaded YAML config: {}", path.display());
        match value {
            Value::Null => Ok(Value::Object(serde_json::Map::new())),
            other => Ok(other),
        }
    }

    /// `package.json`: the `eslintConfig` member, or "no config here"
    fn load_package_json(&self, path: &Path) -> Result<Option<Value>> {
        let content = self.read(path)?;
        let mut manifest: Value = serde_json::from_str(&content)
            .map_err(|e| LintrcError::cannot_read(path, e.to_string()))?;

        match manifest
            .as_object_mut()
            .and_then(|m| m.remove("eslintConfig"))
        {
            Some(config) => {
                tracing::debug!("Loaded package.json config: {}", path.display());
                Ok(Some(config))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_json_with_comments() {
        let temp = TempDir::new().unwrap();
        let path = write(
            temp.path(),
            ".eslintrc.json",
            r#"{
                // comments are fine
                "rules": { "no-debugger": "error" }, /* trailing comma OK */
            }"#,
        );

        let value = ConfigFileLoader::new().load_raw(&path).unwrap().unwrap();
        assert!(value["rules"]["no-debugger"].is_string());
    }

    #[test]
    fn test_load_yaml() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc.yaml", "rules:\n  no-debugger: warn\n");

        let value = ConfigFileLoader::new().load_raw(&path).unwrap().unwrap();
        assert_eq!(value["rules"]["no-debugger"], "warn");
    }

    #[test]
    fn test_extensionless_eslintrc_is_yaml() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc", "env:\n  node: true\n");

        let value = ConfigFileLoader::new().load_raw(&path).unwrap().unwrap();
        assert_eq!(value["env"]["node"], true);
    }

    #[test]
    fn test_empty_yaml_is_empty_config() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc.yml", "");

        let value = ConfigFileLoader::new().load_raw(&path).unwrap().unwrap();
        assert_eq!(value, Value::Object(serde_json::Map::new()));
    }

    #[test]
    fn test_package_json_with_and_without_config() {
        let temp = TempDir::new().unwrap();
        let with = write(
            temp.path(),
            "package.json",
            r#"{ "name": "x", "eslintConfig": { "rules": {} } }"#,
        );
        let value = ConfigFileLoader::new().load_raw(&with).unwrap();
        assert!(value.is_some());

        let without = write(temp.path(), "package.json", r#"{ "name": "x" }"#);
        let value = ConfigFileLoader::new().load_raw(&without).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = ConfigFileLoader::new()
            .load_raw(&temp.path().join(".eslintrc.json"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_parse_failure_is_cannot_read() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc.json", "{ not valid");

        let err = ConfigFileLoader::new().load_raw(&path).unwrap_err();
        assert!(matches!(err, LintrcError::CannotReadConfig { .. }));
    }

    #[test]
    fn test_script_config_without_loader_fails() {
        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc.js", "module.exports = {};");

        let err = ConfigFileLoader::new().load_raw(&path).unwrap_err();
        assert!(matches!(err, LintrcError::CannotReadConfig { .. }));
    }

    #[test]
    fn test_script_loader_hook() {
        struct Fixed;
        impl ScriptConfigLoader for Fixed {
            fn load(&self, _path: &Path) -> Result<Value> {
                Ok(serde_json::json!({ "rules": { "no-var": "error" } }))
            }
        }

        let temp = TempDir::new().unwrap();
        let path = write(temp.path(), ".eslintrc.js", "module.exports = {};");

        let loader = ConfigFileLoader::with_script_loader(Arc::new(Fixed));
        let value = loader.load_raw(&path).unwrap().unwrap();
        assert_eq!(value["rules"]["no-var"], "error");
    }
}
