//! Two-mode schema validation for raw config values
//!
//! Top-level configs allow `root` and the deprecated `ecmaFeatures`;
//! override fragments require `files`, allow `excludedFiles`, and forbid
//! `root`. The top level additionally accepts an array of pre-flattened
//! fragments (objects, or strings that go through the reference
//! resolver). Violations carry the origin path so the user can trace the
//! failing file.

use serde_json::Value;
use std::path::Path;

use super::data::ConfigData;
use crate::error::LintrcError;
use crate::Result;

/// A validated raw config, ready for normalization
#[derive(Debug)]
pub(crate) enum RawConfig {
    Object(Box<ConfigData>),
    Fragments(Vec<RawFragment>),
}

/// One entry of the array-of-fragments input form
#[derive(Debug)]
pub(crate) enum RawFragment {
    /// A string entry resolves like an `extends` reference
    Extends(String),
    Data(Box<ConfigData>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    TopLevel,
    /// Override fragments and array fragments: `files` is legal here
    Override,
    Fragment,
}

const COMMON_KEYS: &[&str] = &[
    "env",
    "extends",
    "globals",
    "overrides",
    "parser",
    "parserOptions",
    "plugins",
    "processor",
    "rules",
    "settings",
    "ecmaFeatures",
];

/// Validate a raw top-level config value and convert it to typed data
pub(crate) fn parse_config_value(value: Value, path: &Path) -> Result<RawConfig> {
    match value {
        Value::Object(_) => {
            validate_object(&value, path, Mode::TopLevel, "")?;
            Ok(RawConfig::Object(Box::new(to_data(value, path)?)))
        }
        Value::Array(items) => {
            let mut fragments = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let origin = format!("[{index}]");
                match item {
                    Value::String(name) => fragments.push(RawFragment::Extends(name)),
                    Value::Object(_) => {
                        validate_object(&item, path, Mode::Fragment, &origin)?;
                        fragments.push(RawFragment::Data(Box::new(to_data(item, path)?)));
                    }
                    other => {
                        return Err(invalid(
                            path,
                            format!(
                                "config fragment {origin} must be an object or a string, got {}",
                                type_name(&other)
                            ),
                        ));
                    }
                }
            }
            Ok(RawConfig::Fragments(fragments))
        }
        other => Err(invalid(
            path,
            format!(
                "config must be an object or an array of fragments, got {}",
                type_name(&other)
            ),
        )),
    }
}

/// Validate programmatic config data (base config, CLI options)
pub(crate) fn validate_config_data(data: &ConfigData, path: &Path) -> Result<()> {
    let value = serde_json::to_value(data)
        .map_err(|e| invalid(path, format!("config is not representable as JSON: {e}")))?;
    validate_object(&value, path, Mode::TopLevel, "")
}

fn validate_object(value: &Value, path: &Path, mode: Mode, origin: &str) -> Result<()> {
    let map = match value.as_object() {
        Some(map) => map,
        None => {
            return Err(invalid(
                path,
                format!("config{origin} must be an object, got {}", type_name(value)),
            ));
        }
    };

    for key in map.keys() {
        let known = COMMON_KEYS.contains(&key.as_str())
            || match mode {
                Mode::TopLevel => key == "root",
                Mode::Override => key == "files" || key == "excludedFiles",
                Mode::Fragment => key == "root" || key == "files" || key == "excludedFiles",
            };
        if !known {
            let hint = match (mode, key.as_str()) {
                (Mode::Override, "root") => " (`root` is not allowed in overrides)",
                _ => "",
            };
            return Err(invalid(
                path,
                format!("unexpected property \"{key}\"{hint} at config{origin}"),
            ));
        }
    }

    if let Some(root) = map.get("root") {
        if !root.is_boolean() {
            return Err(invalid(path, format!("\"root\" must be a boolean at config{origin}")));
        }
    }

    if let Some(extends) = map.get("extends") {
        validate_string_or_list(extends, path, "extends", origin, false)?;
    }

    if mode == Mode::Override {
        match map.get("files") {
            Some(files) => validate_string_or_list(files, path, "files", origin, true)?,
            None => {
                return Err(invalid(
                    path,
                    format!("\"files\" is required at config{origin}"),
                ));
            }
        }
    } else if let Some(files) = map.get("files") {
        validate_string_or_list(files, path, "files", origin, true)?;
    }
    if let Some(excluded) = map.get("excludedFiles") {
        validate_string_or_list(excluded, path, "excludedFiles", origin, false)?;
    }

    match map.get("parser") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(other) => {
            return Err(invalid(
                path,
                format!(
                    "\"parser\" must be a string or null at config{origin}, got {}",
                    type_name(other)
                ),
            ));
        }
    }

    if let Some(processor) = map.get("processor") {
        if !processor.is_string() {
            return Err(invalid(
                path,
                format!("\"processor\" must be a string at config{origin}"),
            ));
        }
    }

    for key in ["parserOptions", "settings"] {
        if let Some(v) = map.get(key) {
            if !v.is_object() {
                return Err(invalid(
                    path,
                    format!("\"{key}\" must be an object at config{origin}"),
                ));
            }
        }
    }

    if let Some(env) = map.get("env") {
        let env = env.as_object().ok_or_else(|| {
            invalid(path, format!("\"env\" must be an object at config{origin}"))
        })?;
        for (name, enabled) in env {
            if !enabled.is_boolean() {
                return Err(invalid(
                    path,
                    format!("env \"{name}\" must be a boolean at config{origin}"),
                ));
            }
        }
    }

    if let Some(globals) = map.get("globals") {
        let globals = globals.as_object().ok_or_else(|| {
            invalid(path, format!("\"globals\" must be an object at config{origin}"))
        })?;
        for (name, visibility) in globals {
            if !visibility.is_boolean() && !visibility.is_string() {
                return Err(invalid(
                    path,
                    format!(
                        "global \"{name}\" must be a boolean or a visibility string at config{origin}"
                    ),
                ));
            }
        }
    }

    if let Some(plugins) = map.get("plugins") {
        validate_plugins(plugins, path, origin)?;
    }

    if let Some(rules) = map.get("rules") {
        validate_rules(rules, path, origin)?;
    }

    if map.contains_key("ecmaFeatures") {
        tracing::warn!(
            "\"ecmaFeatures\" in '{}' is deprecated; use \"parserOptions.ecmaFeatures\" instead",
            path.display()
        );
    }

    if let Some(overrides) = map.get("overrides") {
        let items = overrides.as_array().ok_or_else(|| {
            invalid(
                path,
                format!("\"overrides\" must be an array at config{origin}"),
            )
        })?;
        for (index, item) in items.iter().enumerate() {
            validate_object(
                item,
                path,
                Mode::Override,
                &format!("{origin}.overrides[{index}]"),
            )?;
        }
    }

    Ok(())
}

fn validate_plugins(value: &Value, path: &Path, origin: &str) -> Result<()> {
    match value {
        Value::Array(items) => {
            for item in items {
                if !item.is_string() {
                    return Err(invalid(
                        path,
                        format!("\"plugins\" entries must be strings at config{origin}"),
                    ));
                }
            }
            Ok(())
        }
        Value::Object(map) => {
            for (prefix, module) in map {
                if !module.is_string() {
                    return Err(invalid(
                        path,
                        format!(
                            "plugin mapping \"{prefix}\" must name a module string at config{origin}"
                        ),
                    ));
                }
            }
            Ok(())
        }
        other => Err(invalid(
            path,
            format!(
                "\"plugins\" must be an array of strings or a prefix mapping at config{origin}, got {}",
                type_name(other)
            ),
        )),
    }
}

fn validate_rules(value: &Value, path: &Path, origin: &str) -> Result<()> {
    let map = value
        .as_object()
        .ok_or_else(|| invalid(path, format!("\"rules\" must be an object at config{origin}")))?;

    for (rule_id, entry) in map {
        let severity = match entry {
            Value::Array(parts) => match parts.first() {
                Some(head) => head,
                None => {
                    return Err(invalid(
                        path,
                        format!("rule \"{rule_id}\" must not be an empty array at config{origin}"),
                    ));
                }
            },
            scalar => scalar,
        };
        if !is_severity(severity) {
            return Err(invalid(
                path,
                format!(
                    "rule \"{rule_id}\" has invalid severity {severity} at config{origin} \
                     (expected 0, 1, 2, \"off\", \"warn\", or \"error\")"
                ),
            ));
        }
    }
    Ok(())
}

fn is_severity(value: &Value) -> bool {
    match value {
        Value::Number(n) => matches!(n.as_u64(), Some(0..=2)),
        Value::String(s) => matches!(s.as_str(), "off" | "warn" | "error"),
        _ => false,
    }
}

fn validate_string_or_list(
    value: &Value,
    path: &Path,
    key: &str,
    origin: &str,
    require_non_empty: bool,
) -> Result<()> {
    match value {
        Value::String(_) => Ok(()),
        Value::Array(items) => {
            if require_non_empty && items.is_empty() {
                return Err(invalid(
                    path,
                    format!("\"{key}\" must have at least one entry at config{origin}"),
                ));
            }
            for item in items {
                if !item.is_string() {
                    return Err(invalid(
                        path,
                        format!("\"{key}\" entries must be strings at config{origin}"),
                    ));
                }
            }
            Ok(())
        }
        other => Err(invalid(
            path,
            format!(
                "\"{key}\" must be a string or an array of strings at config{origin}, got {}",
                type_name(other)
            ),
        )),
    }
}

fn to_data(value: Value, path: &Path) -> Result<ConfigData> {
    serde_json::from_value(value).map_err(|e| invalid(path, e.to_string()))
}

fn invalid(path: &Path, detail: String) -> LintrcError {
    LintrcError::invalid_config(path, detail)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
