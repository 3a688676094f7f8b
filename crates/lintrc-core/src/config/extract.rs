//! Extraction: reduce an element array against a target file
//!
//! The walk runs from the end of the array to the start. Final array
//! order places the more specific elements (CLI, leaf directory,
//! overrides) last; reversing makes those the first writers, so
//! first-writer-wins policies give them precedence while keeping the
//! merge O(n) and stable.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

use super::data::{ParserDefinition, PluginDefinition, ProcessorDefinition, Reference};
use super::element::ConfigArray;
use crate::error::LintrcError;
use crate::Result;

/// The processor chosen for a file, resolved to its definition
#[derive(Debug, Clone)]
pub struct ResolvedProcessor {
    pub definition: Arc<ProcessorDefinition>,
    /// Full id of the form `<plugin>/<processor>`
    pub id: String,
}

/// A fully-resolved configuration for one file
#[derive(Debug, Clone, Default)]
pub struct ResolvedConfig {
    pub env: Map<String, Value>,
    pub globals: Map<String, Value>,
    pub parser: Option<Reference<ParserDefinition>>,
    pub parser_options: Map<String, Value>,
    pub plugins: IndexMap<String, Reference<PluginDefinition>>,
    pub processor: Option<ResolvedProcessor>,
    /// Rule id to `[severity, options...]`; bare severities are promoted
    /// to single-element arrays
    pub rules: IndexMap<String, Vec<Value>>,
    pub settings: Map<String, Value>,
}

pub(crate) fn extract_config(array: &ConfigArray, path: &Path) -> Result<ResolvedConfig> {
    let mut config = ResolvedConfig::default();
    let mut processor_name: Option<&str> = None;

    for element in array.iter().rev() {
        if !element.applies_to(path) {
            continue;
        }

        if config.parser.is_none() {
            if let Some(parser) = &element.parser {
                // The chosen reference raises its stored error here
                parser.definition()?;
                config.parser = Some(parser.clone());
            }
        }

        if processor_name.is_none() {
            processor_name = element.processor.as_deref();
        }

        if let Some(env) = &element.env {
            merge_without_overwrite(&mut config.env, env);
        }
        if let Some(globals) = &element.globals {
            merge_without_overwrite(&mut config.globals, globals);
        }
        if let Some(parser_options) = &element.parser_options {
            merge_without_overwrite(&mut config.parser_options, parser_options);
        }
        if let Some(settings) = &element.settings {
            merge_without_overwrite(&mut config.settings, settings);
        }
        if let Some(plugins) = &element.plugins {
            merge_plugins(&mut config.plugins, plugins)?;
        }
        if let Some(rules) = &element.rules {
            merge_rules(&mut config.rules, rules);
        }
    }

    if let Some(raw) = processor_name {
        config.processor = Some(resolve_processor(raw, &config.plugins)?);
    }

    Ok(config)
}

/// Deep assign-without-overwrite: each source key lands in the target
/// only if the target does not already have it; nested containers are
/// created empty and merged.
///
/// Runs on an explicit work stack so adversarial nesting depth cannot
/// overflow the call stack. Sources are never mutated.
pub(crate) fn merge_without_overwrite(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    #[derive(Clone)]
    enum Seg {
        Key(String),
        Idx(usize),
    }

    enum SourceRef<'a> {
        Map(&'a Map<String, Value>),
        Arr(&'a Vec<Value>),
    }

    enum ContainerMut<'a> {
        Map(&'a mut Map<String, Value>),
        Arr(&'a mut Vec<Value>),
    }

    fn as_container(value: &mut Value) -> Option<ContainerMut<'_>> {
        match value {
            Value::Object(map) => Some(ContainerMut::Map(map)),
            Value::Array(arr) => Some(ContainerMut::Arr(arr)),
            _ => None,
        }
    }

    fn source_ref(value: &Value) -> Option<SourceRef<'_>> {
        match value {
            Value::Object(map) => Some(SourceRef::Map(map)),
            Value::Array(arr) => Some(SourceRef::Arr(arr)),
            _ => None,
        }
    }

    fn container_at<'a>(
        root: &'a mut Map<String, Value>,
        path: &[Seg],
    ) -> Option<ContainerMut<'a>> {
        let mut current = ContainerMut::Map(root);
        for seg in path {
            let next = match (current, seg) {
                (ContainerMut::Map(map), Seg::Key(key)) => map.get_mut(key),
                (ContainerMut::Arr(arr), Seg::Idx(idx)) => arr.get_mut(*idx),
                _ => None,
            };
            current = as_container(next?)?;
        }
        Some(current)
    }

    let mut stack: Vec<(Vec<Seg>, SourceRef<'_>)> = vec![(Vec::new(), SourceRef::Map(source))];

    while let Some((path, node)) = stack.pop() {
        let entries: Vec<(Seg, &Value)> = match node {
            SourceRef::Map(map) => map
                .iter()
                .map(|(k, v)| (Seg::Key(k.clone()), v))
                .collect(),
            SourceRef::Arr(arr) => arr
                .iter()
                .enumerate()
                .map(|(i, v)| (Seg::Idx(i), v))
                .collect(),
        };

        for (seg, source_value) in entries {
            let Some(container) = container_at(target, &path) else {
                continue;
            };

            let existing_state = match (&container, &seg) {
                (ContainerMut::Map(map), Seg::Key(key)) => {
                    map.get(key).map(|v| v.is_object() || v.is_array())
                }
                (ContainerMut::Arr(arr), Seg::Idx(idx)) => {
                    arr.get(*idx).map(|v| v.is_object() || v.is_array())
                }
                _ => continue,
            };

            match existing_state {
                // Target already has a container here: merge into it when
                // the source side is a container of any shape
                Some(true) => {
                    if let Some(child) = source_ref(source_value) {
                        let mut child_path = path.clone();
                        child_path.push(seg);
                        stack.push((child_path, child));
                    }
                }
                // Target has a scalar: first writer wins
                Some(false) => {}
                // Target slot is empty: assign scalars, or create an
                // empty container of the same shape and merge
                None => match source_ref(source_value) {
                    Some(child) => {
                        let empty = match child {
                            SourceRef::Map(_) => Value::Object(Map::new()),
                            SourceRef::Arr(_) => Value::Array(Vec::new()),
                        };
                        match (container, &seg) {
                            (ContainerMut::Map(map), Seg::Key(key)) => {
                                map.insert(key.clone(), empty);
                            }
                            (ContainerMut::Arr(arr), Seg::Idx(idx)) if *idx == arr.len() => {
                                arr.push(empty);
                            }
                            _ => continue,
                        }
                        let mut child_path = path.clone();
                        child_path.push(seg);
                        stack.push((child_path, child));
                    }
                    None => match (container, &seg) {
                        (ContainerMut::Map(map), Seg::Key(key)) => {
                            map.insert(key.clone(), source_value.clone());
                        }
                        (ContainerMut::Arr(arr), Seg::Idx(idx)) if *idx == arr.len() => {
                            arr.push(source_value.clone());
                        }
                        _ => {}
                    },
                },
            }
        }
    }
}

/// Attach plugins by id. An id already present with a different
/// definition is a conflict; a deferred load failure surfaces the moment
/// the reference would be attached.
fn merge_plugins(
    target: &mut IndexMap<String, Reference<PluginDefinition>>,
    source: &IndexMap<String, Reference<PluginDefinition>>,
) -> Result<()> {
    for (id, reference) in source {
        match target.get(id) {
            None => {
                if let Some(error) = reference.error() {
                    return Err(error.clone().into());
                }
                target.insert(id.clone(), reference.clone());
            }
            Some(existing) => {
                let same = match (existing.loaded(), reference.loaded()) {
                    (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                    _ => false,
                };
                if !same {
                    if let Some(error) = reference.error() {
                        return Err(error.clone().into());
                    }
                    return Err(LintrcError::PluginConflict {
                        id: id.clone(),
                        first: describe(existing),
                        second: describe(reference),
                    });
                }
            }
        }
    }
    Ok(())
}

fn describe(reference: &Reference<PluginDefinition>) -> String {
    match reference.file_path() {
        Some(path) => path.display().to_string(),
        None => format!("in-memory via {}", reference.importer().display()),
    }
}

/// Copy rules the target lacks, promoting bare severities to
/// `[severity]`. A target entry holding only a severity absorbs the
/// options tail of a later source entry; anything else keeps the first
/// writer's value.
fn merge_rules(target: &mut IndexMap<String, Vec<Value>>, source: &Map<String, Value>) {
    for (rule_id, entry) in source {
        match target.get_mut(rule_id) {
            None => {
                let normalized = match entry {
                    Value::Array(parts) => parts.clone(),
                    severity => vec![severity.clone()],
                };
                target.insert(rule_id.clone(), normalized);
            }
            Some(existing) if existing.len() == 1 => {
                if let Value::Array(parts) = entry {
                    if parts.len() >= 2 {
                        existing.extend(parts[1..].iter().cloned());
                    }
                }
            }
            Some(_) => {}
        }
    }
}

fn resolve_processor(
    raw: &str,
    plugins: &IndexMap<String, Reference<PluginDefinition>>,
) -> Result<ResolvedProcessor> {
    let Some(sep) = raw.rfind('/') else {
        return Err(LintrcError::InvalidProcessorName {
            raw: raw.to_string(),
        });
    };
    let (plugin_id, processor_name) = (&raw[..sep], &raw[sep + 1..]);
    if plugin_id.is_empty() || processor_name.is_empty() {
        return Err(LintrcError::InvalidProcessorName {
            raw: raw.to_string(),
        });
    }

    let plugin = plugins
        .get(plugin_id)
        .ok_or_else(|| LintrcError::ProcessorNotFound {
            name: raw.to_string(),
        })?;
    let definition = plugin.definition()?;
    let processor = definition
        .processors
        .get(processor_name)
        .ok_or_else(|| LintrcError::ProcessorNotFound {
            name: raw.to_string(),
        })?;

    Ok(ResolvedProcessor {
        definition: Arc::clone(processor),
        id: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::element::ConfigElement;
    use crate::config::matcher::FileMatcher;
    use crate::error::ReferenceError;
    use serde_json::json;
    use std::path::PathBuf;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn rules_element(name: &str, rules: Value) -> ConfigElement {
        ConfigElement {
            name: name.to_string(),
            rules: Some(map(rules)),
            ..ConfigElement::default()
        }
    }

    fn loaded_plugin(id: &str, definition: &Arc<PluginDefinition>) -> Reference<PluginDefinition> {
        Reference::Loaded {
            definition: Arc::clone(definition),
            file_path: None,
            id: id.to_string(),
            importer: PathBuf::from("/proj/.eslintrc.json"),
        }
    }

    fn failed_plugin(id: &str) -> Reference<PluginDefinition> {
        Reference::Failed {
            error: ReferenceError::PluginMissing {
                long_name: format!("eslint-plugin-{id}"),
                importer: "/proj/.eslintrc.json".to_string(),
                detail: "module not found".to_string(),
            },
            id: id.to_string(),
            importer: PathBuf::from("/proj/.eslintrc.json"),
        }
    }

    #[test]
    fn test_later_element_wins_for_rules() {
        let array = ConfigArray::new(vec![
            rules_element("first", json!({ "r": ["error", "a"] })),
            rules_element("second", json!({ "r": ["warn", "b"] })),
        ]);
        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(config.rules["r"], vec![json!("warn"), json!("b")]);
    }

    #[test]
    fn test_rule_option_concatenation() {
        // a bare severity picks up the options tail of an earlier entry
        let array = ConfigArray::new(vec![
            rules_element("first", json!({ "r": ["error", "opt"] })),
            rules_element("second", json!({ "r": "error" })),
        ]);
        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(config.rules["r"], vec![json!("error"), json!("opt")]);
    }

    #[test]
    fn test_bare_severity_promoted() {
        let array = ConfigArray::new(vec![rules_element("only", json!({ "r": 2 }))]);
        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(config.rules["r"], vec![json!(2)]);
    }

    #[test]
    fn test_deep_merge_without_overwrite() {
        let mut target = map(json!({ "a": { "x": 1 }, "s": "keep" }));
        let source = map(json!({ "a": { "x": 99, "y": 2 }, "s": "lose", "b": [1, [2, 3]] }));
        merge_without_overwrite(&mut target, &source);

        assert_eq!(
            Value::Object(target),
            json!({ "a": { "x": 1, "y": 2 }, "s": "keep", "b": [1, [2, 3]] })
        );
    }

    #[test]
    fn test_deep_merge_does_not_mutate_source() {
        let mut target = map(json!({}));
        let source = map(json!({ "nested": { "deep": [1, 2, 3] } }));
        let snapshot = source.clone();
        merge_without_overwrite(&mut target, &source);
        assert_eq!(source, snapshot);

        // the copied container is independent of the source
        let mut target2 = map(json!({}));
        merge_without_overwrite(&mut target2, &source);
        assert_eq!(target, target2);
    }

    #[test]
    fn test_deep_merge_handles_adversarial_depth() {
        let mut nested = json!(1);
        for _ in 0..5_000 {
            nested = json!({ "n": nested });
        }
        let source = map(json!({ "deep": nested }));
        let mut target = map(json!({}));
        merge_without_overwrite(&mut target, &source);
        assert!(target.contains_key("deep"));
    }

    #[test]
    fn test_env_merge_first_writer_wins() {
        let array = ConfigArray::new(vec![
            ConfigElement {
                name: "base".to_string(),
                env: Some(map(json!({ "node": true, "browser": true }))),
                ..ConfigElement::default()
            },
            ConfigElement {
                name: "leaf".to_string(),
                env: Some(map(json!({ "node": false }))),
                ..ConfigElement::default()
            },
        ]);
        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        // the later element wrote first in the reverse walk
        assert_eq!(config.env["node"], json!(false));
        assert_eq!(config.env["browser"], json!(true));
    }

    #[test]
    fn test_predicate_filters_elements() {
        let mut gated = rules_element("ts-only", json!({ "r": ["error", "b"] }));
        gated.criteria =
            FileMatcher::create(&["*.ts".to_string()], &[], Path::new("/proj")).unwrap();

        let array = ConfigArray::new(vec![
            rules_element("base", json!({ "r": ["error", "a"] })),
            gated,
        ]);

        let ts = extract_config(&array, Path::new("/proj/x.ts")).unwrap();
        assert_eq!(ts.rules["r"], vec![json!("error"), json!("b")]);

        let js = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(js.rules["r"], vec![json!("error"), json!("a")]);
    }

    #[test]
    fn test_plugin_conflict_detected() {
        let def_a = Arc::new(PluginDefinition::default());
        let def_b = Arc::new(PluginDefinition::default());

        let array = ConfigArray::new(vec![
            ConfigElement {
                name: "a".to_string(),
                plugins: Some(IndexMap::from([(
                    "p".to_string(),
                    loaded_plugin("p", &def_a),
                )])),
                ..ConfigElement::default()
            },
            ConfigElement {
                name: "b".to_string(),
                plugins: Some(IndexMap::from([(
                    "p".to_string(),
                    loaded_plugin("p", &def_b),
                )])),
                ..ConfigElement::default()
            },
        ]);

        let err = extract_config(&array, Path::new("/proj/x.js")).unwrap_err();
        assert!(matches!(err, LintrcError::PluginConflict { .. }));
    }

    #[test]
    fn test_same_definition_is_not_a_conflict() {
        let def = Arc::new(PluginDefinition::default());
        let array = ConfigArray::new(vec![
            ConfigElement {
                name: "a".to_string(),
                plugins: Some(IndexMap::from([(
                    "p".to_string(),
                    loaded_plugin("p", &def),
                )])),
                ..ConfigElement::default()
            },
            ConfigElement {
                name: "b".to_string(),
                plugins: Some(IndexMap::from([(
                    "p".to_string(),
                    loaded_plugin("p", &def),
                )])),
                ..ConfigElement::default()
            },
        ]);

        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(config.plugins.len(), 1);
    }

    #[test]
    fn test_failed_plugin_raises_when_used() {
        let array = ConfigArray::new(vec![ConfigElement {
            name: "a".to_string(),
            plugins: Some(IndexMap::from([("q".to_string(), failed_plugin("q"))])),
            ..ConfigElement::default()
        }]);

        let err = extract_config(&array, Path::new("/proj/x.js")).unwrap_err();
        assert!(matches!(
            err,
            LintrcError::Reference(ReferenceError::PluginMissing { .. })
        ));
    }

    #[test]
    fn test_failed_plugin_ignored_when_element_does_not_apply() {
        let mut gated = ConfigElement {
            name: "gated".to_string(),
            plugins: Some(IndexMap::from([("q".to_string(), failed_plugin("q"))])),
            ..ConfigElement::default()
        };
        gated.criteria =
            FileMatcher::create(&["*.md".to_string()], &[], Path::new("/proj")).unwrap();

        let array = ConfigArray::new(vec![
            rules_element("base", json!({ "r": "error" })),
            gated,
        ]);

        // the failed plugin never applies to .js files, so extraction succeeds
        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        assert_eq!(config.rules["r"], vec![json!("error")]);

        // and fails as soon as the element applies
        let err = extract_config(&array, Path::new("/proj/x.md")).unwrap_err();
        assert!(matches!(err, LintrcError::Reference(_)));
    }

    #[test]
    fn test_later_parser_wins() {
        let parser = |name: &str| Reference::Loaded {
            definition: Arc::new(ParserDefinition {
                name: name.to_string(),
            }),
            file_path: None,
            id: name.to_string(),
            importer: PathBuf::from("/proj/.eslintrc.json"),
        };

        let array = ConfigArray::new(vec![
            ConfigElement {
                name: "a".to_string(),
                parser: Some(parser("first")),
                ..ConfigElement::default()
            },
            ConfigElement {
                name: "b".to_string(),
                parser: Some(parser("second")),
                ..ConfigElement::default()
            },
        ]);

        let config = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        let chosen = config.parser.unwrap();
        assert_eq!(chosen.loaded().unwrap().name, "second");
    }

    #[test]
    fn test_chosen_failed_parser_raises() {
        let array = ConfigArray::new(vec![ConfigElement {
            name: "a".to_string(),
            parser: Some(Reference::Failed {
                error: ReferenceError::ParserMissing {
                    name: "ghost-parser".to_string(),
                    importer: "/proj/.eslintrc.json".to_string(),
                    detail: "module not found".to_string(),
                },
                id: "ghost-parser".to_string(),
                importer: PathBuf::from("/proj/.eslintrc.json"),
            }),
            ..ConfigElement::default()
        }]);

        let err = extract_config(&array, Path::new("/proj/x.js")).unwrap_err();
        assert!(matches!(
            err,
            LintrcError::Reference(ReferenceError::ParserMissing { .. })
        ));
    }

    #[test]
    fn test_processor_resolution() {
        let mut processors = IndexMap::new();
        processors.insert(
            "markdown".to_string(),
            Arc::new(ProcessorDefinition::default()),
        );
        let definition = Arc::new(PluginDefinition {
            configs: IndexMap::new(),
            processors,
        });

        let array = ConfigArray::new(vec![ConfigElement {
            name: "a".to_string(),
            plugins: Some(IndexMap::from([(
                "markdown".to_string(),
                loaded_plugin("markdown", &definition),
            )])),
            processor: Some("markdown/markdown".to_string()),
            ..ConfigElement::default()
        }]);

        let config = extract_config(&array, Path::new("/proj/x.md")).unwrap();
        let processor = config.processor.unwrap();
        assert_eq!(processor.id, "markdown/markdown");
    }

    #[test]
    fn test_processor_errors() {
        let array = ConfigArray::new(vec![ConfigElement {
            name: "a".to_string(),
            processor: Some("no-separator".to_string()),
            ..ConfigElement::default()
        }]);
        let err = extract_config(&array, Path::new("/proj/x.md")).unwrap_err();
        assert!(matches!(err, LintrcError::InvalidProcessorName { .. }));

        let array = ConfigArray::new(vec![ConfigElement {
            name: "a".to_string(),
            processor: Some("ghost/markdown".to_string()),
            ..ConfigElement::default()
        }]);
        let err = extract_config(&array, Path::new("/proj/x.md")).unwrap_err();
        assert!(matches!(err, LintrcError::ProcessorNotFound { .. }));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let array = ConfigArray::new(vec![
            ConfigElement {
                name: "a".to_string(),
                env: Some(map(json!({ "node": true }))),
                settings: Some(map(json!({ "z": 1, "a": 2 }))),
                rules: Some(map(json!({ "r2": "warn", "r1": "error" }))),
                ..ConfigElement::default()
            },
            rules_element("b", json!({ "r3": "off" })),
        ]);

        let first = extract_config(&array, Path::new("/proj/x.js")).unwrap();
        let second = extract_config(&array, Path::new("/proj/x.js")).unwrap();

        assert_eq!(
            first.rules.keys().collect::<Vec<_>>(),
            second.rules.keys().collect::<Vec<_>>()
        );
        assert_eq!(
            serde_json::to_string(&Value::Object(first.settings.clone())).unwrap(),
            serde_json::to_string(&Value::Object(second.settings.clone())).unwrap()
        );
    }

    #[test]
    fn test_extract_idempotence() {
        // re-extracting a single-element rendition of the result is stable
        let array = ConfigArray::new(vec![
            rules_element("a", json!({ "r": ["error", "opt"] })),
            ConfigElement {
                name: "b".to_string(),
                env: Some(map(json!({ "node": true }))),
                ..ConfigElement::default()
            },
        ]);
        let once = extract_config(&array, Path::new("/proj/x.js")).unwrap();

        let rendition = ConfigArray::new(vec![ConfigElement {
            name: "resolved".to_string(),
            env: Some(once.env.clone()),
            rules: Some(
                once.rules
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::Array(v.clone())))
                    .collect(),
            ),
            ..ConfigElement::default()
        }]);
        let twice = extract_config(&rendition, Path::new("/proj/x.js")).unwrap();

        assert_eq!(once.env, twice.env);
        assert_eq!(once.rules, twice.rules);
    }
}
