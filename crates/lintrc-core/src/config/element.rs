//! Config elements and the ordered element array
//!
//! A `ConfigElement` is one atom of configuration after flattening; a
//! `ConfigArray` is the ordered sequence of elements in effect for some
//! cascade level. Order is semantically significant: later elements take
//! precedence in the final outcome.

use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::data::{ParserDefinition, PluginDefinition, Reference};
use super::extract::{self, ResolvedConfig};
use super::matcher::FileMatcher;
use crate::Result;

/// One atom of configuration after flattening
#[derive(Debug, Clone, Default)]
pub struct ConfigElement {
    /// Logical name chain (e.g. `.eslintrc.json » eslint:recommended`)
    pub name: String,

    /// Origin file; empty for in-memory configs
    pub file_path: PathBuf,

    /// File predicate; absent means the element applies to all files
    /// seen at its cascade level
    pub criteria: Option<FileMatcher>,

    pub env: Option<Map<String, Value>>,
    pub globals: Option<Map<String, Value>>,
    pub parser: Option<Reference<ParserDefinition>>,
    pub parser_options: Option<Map<String, Value>>,
    pub plugins: Option<IndexMap<String, Reference<PluginDefinition>>>,
    pub processor: Option<String>,

    /// Only unconditional, non-extended elements may declare root-ness;
    /// the normalizer suppresses it everywhere else
    pub root: Option<bool>,

    pub rules: Option<Map<String, Value>>,
    pub settings: Option<Map<String, Value>>,

    /// Deprecated input carried through verbatim
    pub ecma_features: Option<Map<String, Value>>,
}

impl ConfigElement {
    /// Whether this element applies to `path`
    pub fn applies_to(&self, path: &Path) -> bool {
        match &self.criteria {
            Some(criteria) => criteria.test(path),
            None => true,
        }
    }
}

/// The ordered collection of normalized elements.
///
/// Shared as `Arc<ConfigArray>`; caches key off the `Arc` pointer
/// identity, never value equality.
#[derive(Debug, Default)]
pub struct ConfigArray {
    elements: Vec<ConfigElement>,
}

impl ConfigArray {
    pub fn new(elements: Vec<ConfigElement>) -> Self {
        Self { elements }
    }

    /// Concatenate `elements` after a parent array's elements
    pub fn concat(elements: Vec<ConfigElement>, parent: &ConfigArray) -> Self {
        let mut combined = Vec::with_capacity(parent.elements.len() + elements.len());
        combined.extend(parent.elements.iter().cloned());
        combined.extend(elements);
        Self { elements: combined }
    }

    pub fn elements(&self) -> &[ConfigElement] {
        &self.elements
    }

    pub(crate) fn into_elements(self) -> Vec<ConfigElement> {
        self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ConfigElement> {
        self.elements.iter()
    }

    /// Whether this array truncates the ancestor cascade: the last
    /// element that declares root-ness wins. Predicated elements never
    /// carry `root` (it is suppressed during normalization).
    pub fn is_root(&self) -> bool {
        self.elements
            .iter()
            .rev()
            .find_map(|e| e.root)
            .unwrap_or(false)
    }

    /// Whether any predicated element matches `path`. The enumerator
    /// uses this to opt in files whose extension is not in the default
    /// list but which some element's `files` pattern selects.
    pub fn matches_file(&self, path: &Path) -> bool {
        self.elements
            .iter()
            .any(|e| e.criteria.as_ref().is_some_and(|c| c.test(path)))
    }

    /// Reduce this array against a target file into one resolved config
    pub fn extract_config(&self, path: &Path) -> Result<ResolvedConfig> {
        extract::extract_config(self, path)
    }

    /// The logical names of all elements, for diagnostics
    pub fn pretty_names(&self) -> Vec<&str> {
        self.elements.iter().map(|e| e.name.as_str()).collect()
    }
}

impl<'a> IntoIterator for &'a ConfigArray {
    type Item = &'a ConfigElement;
    type IntoIter = std::slice::Iter<'a, ConfigElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

/// Stable cache key for an array shared by identity
pub(crate) fn identity(array: &Arc<ConfigArray>) -> usize {
    Arc::as_ptr(array) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(name: &str, root: Option<bool>) -> ConfigElement {
        ConfigElement {
            name: name.to_string(),
            root,
            ..ConfigElement::default()
        }
    }

    #[test]
    fn test_is_root_last_boolean_wins() {
        let array = ConfigArray::new(vec![
            element("a", Some(true)),
            element("b", None),
            element("c", Some(false)),
        ]);
        assert!(!array.is_root());

        let array = ConfigArray::new(vec![element("a", Some(false)), element("b", Some(true))]);
        assert!(array.is_root());

        let array = ConfigArray::new(vec![element("a", None)]);
        assert!(!array.is_root());
    }

    #[test]
    fn test_matches_file_requires_a_predicate() {
        let unconditional = ConfigArray::new(vec![element("a", None)]);
        assert!(!unconditional.matches_file(Path::new("/proj/x.ts")));

        let mut predicated = element("b", None);
        predicated.criteria = FileMatcher::create(
            &["*.ts".to_string()],
            &[],
            Path::new("/proj"),
        )
        .unwrap();
        let array = ConfigArray::new(vec![element("a", None), predicated]);
        assert!(array.matches_file(Path::new("/proj/x.ts")));
        assert!(!array.matches_file(Path::new("/proj/x.js")));
    }

    #[test]
    fn test_concat_order() {
        let parent = ConfigArray::new(vec![element("parent", None)]);
        let combined = ConfigArray::concat(vec![element("child", None)], &parent);
        assert_eq!(combined.pretty_names(), ["parent", "child"]);
    }

    #[test]
    fn test_identity_key() {
        let a = Arc::new(ConfigArray::default());
        let b = Arc::new(ConfigArray::default());
        assert_eq!(identity(&a), identity(&Arc::clone(&a)));
        assert_ne!(identity(&a), identity(&b));
    }
}
