//! Built-in config table (`eslint:recommended`, `eslint:all`)
//!
//! Ships a bundled seed of the two built-in names; callers can extend or
//! replace the table through the factory options.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::data::ConfigData;

/// Name of the recommended built-in config
pub const RECOMMENDED: &str = "eslint:recommended";

/// Name of the everything-on built-in config
pub const ALL: &str = "eslint:all";

const RECOMMENDED_RULES: &[&str] = &[
    "for-direction",
    "no-async-promise-executor",
    "no-compare-neg-zero",
    "no-cond-assign",
    "no-constant-condition",
    "no-debugger",
    "no-dupe-args",
    "no-dupe-keys",
    "no-duplicate-case",
    "no-empty",
    "no-extra-semi",
    "no-func-assign",
    "no-self-assign",
    "no-sparse-arrays",
    "no-unreachable",
    "no-unsafe-negation",
    "no-unused-vars",
    "use-isnan",
    "valid-typeof",
];

const EXTRA_ALL_RULES: &[&str] = &[
    "curly",
    "eqeqeq",
    "no-alert",
    "no-console",
    "no-eval",
    "no-implicit-globals",
    "no-shadow",
    "no-var",
    "prefer-const",
    "yoda",
];

fn rules_config(rule_ids: impl Iterator<Item = &'static str>) -> ConfigData {
    let mut rules = Map::new();
    for id in rule_ids {
        rules.insert(id.to_string(), Value::String("error".to_string()));
    }
    ConfigData {
        rules: Some(rules),
        ..ConfigData::default()
    }
}

/// The bundled built-in config table
pub fn default_builtin_configs() -> IndexMap<String, ConfigData> {
    let mut table = IndexMap::new();
    table.insert(
        RECOMMENDED.to_string(),
        rules_config(RECOMMENDED_RULES.iter().copied()),
    );
    table.insert(
        ALL.to_string(),
        rules_config(RECOMMENDED_RULES.iter().chain(EXTRA_ALL_RULES).copied()),
    );
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_contents() {
        let table = default_builtin_configs();
        assert!(table.contains_key(RECOMMENDED));
        assert!(table.contains_key(ALL));

        let recommended = &table[RECOMMENDED];
        let all = &table[ALL];
        let recommended_len = recommended.rules.as_ref().unwrap().len();
        let all_len = all.rules.as_ref().unwrap().len();
        assert!(all_len > recommended_len);
    }
}
