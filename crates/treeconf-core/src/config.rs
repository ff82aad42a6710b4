//! Configuration container
//!
//! [`Config`] is an immutable value around a map-rooted [`Node`] tree, the
//! [`ParserRegistry`] used by typed reads and the [`SecretRedactor`] applied to
//! every external view. Edits go through a [`ConfigBuilder`] and produce a new
//! `Config` sharing untouched subtrees with the old one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::audit::AuditableConfig;
use crate::coercion::{coerce, ConfigType, ParserRegistry, ValueParser};
use crate::error::{Error, Result};
use crate::node::{Node, RemoveOptions};
use crate::path::Path;
use crate::resolver::{resolve_tree, UnresolvedPolicy};
use crate::secret::SecretRedactor;
use crate::value::{Scalar, Value};

/// The main configuration container
#[derive(Clone)]
pub struct Config {
    /// Always a map
    root: Arc<Node>,
    parsers: Arc<ParserRegistry>,
    redactor: Arc<SecretRedactor>,
}

impl Default for Config {
    fn default() -> Self {
        Self::empty()
    }
}

/// Root node for a value handed over by a collaborator. Null is the empty map.
fn root_node(value: &Value) -> Result<Node> {
    match value {
        Value::Null => Ok(Node::empty_map()),
        Value::Mapping(_) | Value::Config(_) => Node::from_value(value),
        other => Err(Error::value_conversion("(root)", "mapping", other.type_name())
            .with_help("A configuration document must be a mapping at the top level")),
    }
}

impl Config {
    /// Config without values, using the built-in parsers and secret names
    pub fn empty() -> Self {
        Self {
            root: Arc::new(Node::empty_map()),
            parsers: Arc::new(ParserRegistry::with_builtins()),
            redactor: Arc::new(SecretRedactor::default()),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Builder starting from this config's tree, parsers and secret names
    pub fn to_builder(&self) -> ConfigBuilder {
        ConfigBuilder {
            root: self.root.as_ref().clone(),
            parsers: self.parsers.as_ref().clone(),
            redactor: self.redactor.as_ref().clone(),
        }
    }

    /// Config from `(path, value)` pairs, written in order
    pub fn of<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        pairs
            .into_iter()
            .try_fold(Self::builder(), |builder, (path, value)| {
                builder.put(path.as_ref(), value)
            })
            .map(ConfigBuilder::build)
    }

    /// Config from a nested value. Mapping keys are parsed as paths.
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(Self::empty().with_root(root_node(value)?))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json).map_err(|e| Error::parse(e.to_string()))?;
        Self::from_value(&value)
    }

    fn with_root(&self, root: Node) -> Self {
        Self {
            root: Arc::new(root),
            parsers: Arc::clone(&self.parsers),
            redactor: Arc::clone(&self.redactor),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    pub fn redactor(&self) -> &SecretRedactor {
        &self.redactor
    }

    /// Wrapper recording which paths get read, to report unused values
    pub fn auditable(&self) -> AuditableConfig {
        AuditableConfig::new(self.clone())
    }

    /// Check if a value exists at `path`. Unparsable paths are never contained.
    pub fn contains(&self, path: &str) -> bool {
        Path::parse(path)
            .map(|path| self.root.get(&path).is_some())
            .unwrap_or(false)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// All leaves with their paths, sorted by path text
    pub fn entries(&self) -> Vec<(Path, Scalar)> {
        let mut entries = self.root.entries(&Path::root());
        entries.sort_by_cached_key(|(path, _)| path.to_string());
        entries
    }

    /// Flattened view: path text to leaf value
    pub fn to_flat_map(&self) -> BTreeMap<String, Value> {
        self.root
            .entries(&Path::root())
            .into_iter()
            .map(|(path, value)| (path.to_string(), value.to_value()))
            .collect()
    }

    /// Unwrap into nested values. Secrets are not redacted.
    pub fn to_value(&self) -> Value {
        self.root.to_value()
    }

    /// The top-level mapping. Secrets are not redacted.
    pub fn to_map(&self) -> indexmap::IndexMap<String, Value> {
        match self.root.to_value() {
            Value::Mapping(map) => map,
            _ => indexmap::IndexMap::new(),
        }
    }

    /// Copy with every secret leaf replaced by the redaction marker
    pub fn with_hidden_secrets(&self) -> Result<Self> {
        Ok(self.with_root(self.redactor.redact(&self.root)?))
    }

    /// Export the redacted configuration as YAML
    pub fn to_yaml(&self) -> Result<String> {
        self.with_hidden_secrets()?.to_yaml_with_secrets()
    }

    /// Export the configuration as YAML, secrets included
    pub fn to_yaml_with_secrets(&self) -> Result<String> {
        serde_yaml::to_string(&self.to_value()).map_err(|e| Error::parse(e.to_string()))
    }

    /// Export the redacted configuration as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        self.with_hidden_secrets()?.to_json_with_secrets()
    }

    /// Export the configuration as pretty-printed JSON, secrets included
    pub fn to_json_with_secrets(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_value()).map_err(|e| Error::parse(e.to_string()))
    }

    /// Copy with `value` written at `path`
    pub fn with_value(&self, path: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.to_builder().put(path, value)?.build())
    }

    /// Copy with `value` written at `path` unless something is already there
    pub fn with_default(&self, path: &str, value: impl Into<Value>) -> Result<Self> {
        Ok(self.to_builder().put_if_missing(path, value)?.build())
    }

    /// Copy where values of `defaults` fill the keys missing here
    pub fn with_defaults(&self, defaults: &Config) -> Self {
        self.with_root(self.root.with_defaults(&defaults.root))
    }

    /// Copy where values of `overrides` mask the ones here
    pub fn with_values(&self, overrides: &Config) -> Self {
        self.with_root(overrides.root.with_defaults(&self.root))
    }

    /// Copy without the value at `path`. Parents left empty are removed too.
    pub fn remove(&self, path: &str) -> Result<Self> {
        Ok(self
            .to_builder()
            .remove(path, RemoveOptions::prune_empty_parents())?
            .build())
    }

    fn node(&self, path: &str) -> Result<Option<(Path, &Node)>> {
        let path = Path::parse(path)?;
        Ok(self.root.get(&path).map(|node| (path, node)))
    }

    /// Typed value at `path`
    pub fn get<T: ConfigType>(&self, path: &str) -> Result<T> {
        self.get_optional(path)?
            .ok_or_else(|| Error::missing_value(path))
    }

    /// Typed value at `path`, `None` when absent
    pub fn get_optional<T: ConfigType>(&self, path: &str) -> Result<Option<T>> {
        match self.node(path)? {
            Some((path, node)) => coerce(&self.parsers, &path, node).map(Some),
            None => Ok(None),
        }
    }

    /// Typed value at `path`, `default` when absent
    pub fn get_or<T: ConfigType>(&self, path: &str, default: T) -> Result<T> {
        Ok(self.get_optional(path)?.unwrap_or(default))
    }

    /// List of typed values at `path`
    pub fn get_list<T: ConfigType>(&self, path: &str) -> Result<Vec<T>> {
        self.get_list_optional(path)?
            .ok_or_else(|| Error::missing_value(path))
    }

    /// List of typed values at `path`, `None` when absent
    pub fn get_list_optional<T: ConfigType>(&self, path: &str) -> Result<Option<Vec<T>>> {
        let Some((path, node)) = self.node(path)? else {
            return Ok(None);
        };
        match node {
            Node::List(items) => items
                .iter()
                .enumerate()
                .map(|(index, item)| coerce(&self.parsers, &path.index(index), item))
                .collect::<Result<Vec<T>>>()
                .map(Some),
            other => Err(Error::value_conversion(
                path.to_string(),
                format!("list of {}", T::NAME),
                other.type_name(),
            )),
        }
    }

    /// List of typed values at `path`, `default` when absent
    pub fn get_list_or<T: ConfigType>(&self, path: &str, default: Vec<T>) -> Result<Vec<T>> {
        Ok(self.get_list_optional(path)?.unwrap_or(default))
    }

    /// Text of the scalar at `path`
    pub fn get_string(&self, path: &str) -> Result<String> {
        self.get(path)
    }

    /// Raw nested value at `path`
    pub fn get_value(&self, path: &str) -> Result<Value> {
        self.get(path)
    }

    /// Sub-config rooted at the map at `path`
    pub fn get_config(&self, path: &str) -> Result<Self> {
        self.get_config_optional(path)?
            .ok_or_else(|| Error::missing_value(path))
    }

    /// Sub-config rooted at the map at `path`, `None` when there is no map there
    pub fn get_config_optional(&self, path: &str) -> Result<Option<Self>> {
        match self.node(path)? {
            Some((_, node @ Node::Map(_))) => Ok(Some(self.with_root(node.clone()))),
            _ => Ok(None),
        }
    }

    /// Sub-config rooted at the map at `path`, empty when absent
    pub fn get_config_or_empty(&self, path: &str) -> Result<Self> {
        Ok(self
            .get_config_optional(path)?
            .unwrap_or_else(|| self.with_root(Node::empty_map())))
    }
}

impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = self.with_hidden_secrets().map_err(|_| fmt::Error)?;
        write!(f, "{}", redacted.to_value())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("root", &format_args!("{}", self))
            .field("parsers", &self.parsers)
            .finish()
    }
}

/// Accumulates edits and freezes them into a [`Config`]
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    root: Node,
    parsers: ParserRegistry,
    redactor: SecretRedactor,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            root: Node::empty_map(),
            parsers: ParserRegistry::with_builtins(),
            redactor: SecretRedactor::default(),
        }
    }

    /// Write `value` at `path`, replacing what is there. Null values are skipped.
    pub fn put(mut self, path: &str, value: impl Into<Value>) -> Result<Self> {
        let path = Path::parse_absolute(path)?;
        let value = value.into();
        if value.is_null() {
            log::warn!("Skipping null value for '{}'", path);
            return Ok(self);
        }
        self.root = self.root.add_or_replace(&Path::root(), &path, &value)?;
        Ok(self)
    }

    /// Write `value` at `path` unless a value exists. List elements are never
    /// created this way. Null values are skipped.
    pub fn put_if_missing(mut self, path: &str, value: impl Into<Value>) -> Result<Self> {
        let path = Path::parse_absolute(path)?;
        let value = value.into();
        if value.is_null() {
            log::warn!("Skipping null default for '{}'", path);
            return Ok(self);
        }
        self.root = self.root.add_if_missing(&Path::root(), &path, &value)?;
        Ok(self)
    }

    /// Merge a mapping whose values mask the current ones
    pub fn put_all(mut self, values: impl Into<Value>) -> Result<Self> {
        let other = root_node(&values.into())?;
        self.root = other.with_defaults(&self.root);
        Ok(self)
    }

    /// Merge a mapping that only fills keys missing so far
    pub fn put_all_if_missing(mut self, values: impl Into<Value>) -> Result<Self> {
        let other = root_node(&values.into())?;
        self.root = self.root.with_defaults(&other);
        Ok(self)
    }

    /// Remove the value at `path`
    pub fn remove(mut self, path: &str, options: RemoveOptions) -> Result<Self> {
        let path = Path::parse_absolute(path)?;
        self.root = self
            .root
            .remove(&path, options)
            .unwrap_or_else(Node::empty_map);
        Ok(self)
    }

    /// Replace every leaf with `mapper(path, leaf)`
    pub fn map_values<F>(mut self, mut mapper: F) -> Result<Self>
    where
        F: FnMut(&Path, &Scalar) -> Result<Scalar>,
    {
        self.root = self.root.map_leaves(&Path::root(), &mut mapper)?;
        Ok(self)
    }

    /// Keep only the leaves for which `predicate(path, leaf)` holds
    pub fn filter_values<F>(mut self, mut predicate: F, options: RemoveOptions) -> Self
    where
        F: FnMut(&Path, &Scalar) -> bool,
    {
        self.root = self
            .root
            .filter_leaves(&Path::root(), &mut predicate, options)
            .unwrap_or_else(Node::empty_map);
        self
    }

    /// Drop empty maps and lists
    pub fn remove_empty_properties(self) -> Self {
        self.filter_values(|_, _| true, RemoveOptions::prune_empty_parents())
    }

    /// Resolve every `${...}` expression, failing on the first one left unresolved.
    /// Values of `variables` are visible to lookups and mask the ones here.
    pub fn resolve_expressions(self, variables: &Config) -> Result<Self> {
        self.resolve_expressions_with(variables, UnresolvedPolicy::Fail)
    }

    /// Resolve every `${...}` expression, keeping the template text of the ones
    /// left unresolved
    pub fn resolve_expressions_or_skip(self, variables: &Config) -> Result<Self> {
        self.resolve_expressions_with(variables, UnresolvedPolicy::Unwrap)
    }

    pub fn resolve_expressions_with(
        mut self,
        variables: &Config,
        policy: UnresolvedPolicy,
    ) -> Result<Self> {
        self.root = resolve_tree(&self.root, &variables.root, policy)?;
        Ok(self)
    }

    /// Append a parser, tried after the ones registered before
    pub fn add_value_parser(mut self, parser: Arc<dyn ValueParser>) -> Self {
        self.parsers.register(parser);
        self
    }

    /// Append a function as a parser for its return type
    pub fn add_value_parser_fn<T, F>(mut self, func: F) -> Self
    where
        T: 'static,
        F: Fn(&str) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        self.parsers.register_fn(func);
        self
    }

    /// Replace all parsers, built-in ones included
    pub fn set_value_parsers(mut self, parsers: ParserRegistry) -> Self {
        self.parsers = parsers;
        self
    }

    pub fn set_secret_redactor(mut self, redactor: SecretRedactor) -> Self {
        self.redactor = redactor;
        self
    }

    pub fn build(self) -> Config {
        Config {
            root: Arc::new(self.root),
            parsers: Arc::new(self.parsers),
            redactor: Arc::new(self.redactor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coercion::Locale;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_load_yaml() {
        let config = Config::from_yaml("database:\n  host: localhost\n  port: 5432").unwrap();
        assert_eq!(config.get::<String>("database.host").unwrap(), "localhost");
        assert_eq!(config.get::<i64>("database.port").unwrap(), 5432);
    }

    #[test]
    fn test_empty_document() {
        let config = Config::from_yaml("").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_non_mapping_document_fails() {
        let err = Config::from_yaml("- a\n- b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(r#"{"server.port": 8080, "server.host": "x"}"#).unwrap();
        assert_eq!(config.get::<u16>("server.port").unwrap(), 8080);
        assert_eq!(
            Value::Mapping(config.to_map()),
            yaml("server:\n  port: 8080\n  host: x")
        );
    }

    #[test]
    fn test_from_json_invalid() {
        let err = Config::from_json("{not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_of_pairs() {
        let config = Config::of([("a.b[0]", "v"), ("a.b[1]", "w")]).unwrap();
        assert_eq!(config.get_list::<String>("a.b").unwrap(), vec!["v", "w"]);
        assert_eq!(config.get_value("a.b").unwrap(), yaml("[v, w]"));
    }

    #[test]
    fn test_path_not_found() {
        let config = Config::of([("a", 1)]).unwrap();
        let err = config.get::<i64>("b.c").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue);
        assert_eq!(err.path.as_deref(), Some("b.c"));

        // traversal through a leaf is a missing value, not a conversion error
        let err = config.get::<i64>("a.b").unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingValue);
    }

    #[test]
    fn test_invalid_path() {
        let config = Config::empty();
        assert_eq!(config.get::<i64>("a..b").unwrap_err().kind, ErrorKind::InvalidPath);
        assert!(!config.contains("a..b"));
    }

    #[test]
    fn test_optional_and_defaulted() {
        let config = Config::of([("port", 80)]).unwrap();
        assert_eq!(config.get_optional::<i64>("port").unwrap(), Some(80));
        assert_eq!(config.get_optional::<i64>("missing").unwrap(), None);
        assert_eq!(config.get_or("missing", 8080i64).unwrap(), 8080);
        assert_eq!(config.get_list_or("missing", vec![1i64]).unwrap(), vec![1]);

        // present but not convertible is still an error
        let config = Config::of([("port", "eighty")]).unwrap();
        assert!(config.get_or("port", 1i64).is_err());
    }

    #[test]
    fn test_string_coercion() {
        let config = Config::from_yaml("port: '8080'\nenabled: 'TRUE'\ntimeout: 30s\nlang: en_GB")
            .unwrap();
        assert_eq!(config.get::<i32>("port").unwrap(), 8080);
        assert!(config.get::<bool>("enabled").unwrap());
        assert_eq!(config.get::<Duration>("timeout").unwrap(), Duration::from_secs(30));
        assert_eq!(config.get::<Locale>("lang").unwrap().to_string(), "en-GB");
        assert_eq!(config.get_string("port").unwrap(), "8080");
    }

    #[test]
    fn test_list_of_wrong_kind() {
        let config = Config::of([("a", 1)]).unwrap();
        let err = config.get_list::<i64>("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValueConversion);
    }

    #[test]
    fn test_list_element_error_path() {
        let config = Config::from_yaml("ports: [80, x]").unwrap();
        let err = config.get_list::<i64>("ports").unwrap_err();
        assert_eq!(err.path.as_deref(), Some("ports[1]"));
    }

    #[test]
    fn test_sub_config() {
        let config = Config::from_yaml("db:\n  host: x\n  port: 1\nname: app").unwrap();
        let db = config.get_config("db").unwrap();
        assert_eq!(db.get::<String>("host").unwrap(), "x");
        assert!(!db.contains("name"));

        assert!(config.get_config_optional("cache").unwrap().is_none());
        assert!(config.get_config_or_empty("cache").unwrap().is_empty());
    }

    #[test]
    fn test_sub_config_of_leaf_or_list_is_absent() {
        let config = Config::from_yaml("name: app
ports: [1, 2]").unwrap();
        for path in ["name", "ports", "ports[0]"] {
            assert!(config.get_config_optional(path).unwrap().is_none(), "path: {}", path);
            let err = config.get_config(path).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MissingValue, "path: {}", path);
            assert_eq!(err.path.as_deref(), Some(path));
        }
        assert!(config.get_config_or_empty("name").unwrap().is_empty());
    }

    #[test]
    fn test_sub_config_keeps_parsers() {
        let config = Config::builder()
            .put("a.flag", "on")
            .unwrap()
            .set_value_parsers(ParserRegistry::new())
            .add_value_parser_fn(|s: &str| Ok::<bool, String>(s == "on"))
            .build();
        assert!(config.get_config("a").unwrap().get::<bool>("flag").unwrap());
    }

    #[test]
    fn test_entries_sorted() {
        let config = Config::from_yaml("b: 2\na:\n  y: 1\n  x: [t]").unwrap();
        let paths: Vec<String> = config
            .entries()
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect();
        assert_eq!(paths, vec!["a.x[0]", "a.y", "b"]);
    }

    #[test]
    fn test_flat_map() {
        let config = Config::from_yaml("a:\n  b: 1\n  c: [x, true]").unwrap();
        let flat = config.to_flat_map();
        assert_eq!(flat.get("a.b"), Some(&Value::Integer(1)));
        assert_eq!(flat.get("a.c[1]"), Some(&Value::Bool(true)));
        assert_eq!(flat.len(), 3);
    }

    #[test]
    fn test_secrets_hidden_in_exports() {
        let config = Config::from_yaml("db:\n  user: admin\n  password: hunter2").unwrap();
        let exported = config.to_yaml().unwrap();
        assert!(exported.contains("admin"));
        assert!(!exported.contains("hunter2"));
        assert!(config.to_json().unwrap().contains("***"));
        assert!(!config.to_string().contains("hunter2"));
        assert!(!format!("{:?}", config).contains("hunter2"));

        assert!(config.to_yaml_with_secrets().unwrap().contains("hunter2"));
        assert_eq!(config.get::<String>("db.password").unwrap(), "hunter2");
    }

    #[test]
    fn test_custom_redactor() {
        let config = Config::builder()
            .put("aws.credential", "abc")
            .unwrap()
            .set_secret_redactor(SecretRedactor::new(["credential"], "[REDACTED]"))
            .build();
        let hidden = config.with_hidden_secrets().unwrap();
        assert_eq!(hidden.get::<String>("aws.credential").unwrap(), "[REDACTED]");
    }

    #[test]
    fn test_put_skips_null() {
        let config = Config::builder()
            .put("a", 1)
            .unwrap()
            .put("a", Value::Null)
            .unwrap()
            .build();
        assert_eq!(config.get::<i64>("a").unwrap(), 1);
    }

    #[test]
    fn test_put_rejects_root_and_index_paths() {
        assert_eq!(
            Config::builder().put("", 1).unwrap_err().kind,
            ErrorKind::InvalidPath
        );
        assert_eq!(
            Config::builder().put("[0]", 1).unwrap_err().kind,
            ErrorKind::InvalidPath
        );
    }

    #[test]
    fn test_put_if_missing() {
        let config = Config::of([("a", 1)])
            .unwrap()
            .with_default("a", 2)
            .unwrap()
            .with_default("b", 3)
            .unwrap();
        assert_eq!(config.get::<i64>("a").unwrap(), 1);
        assert_eq!(config.get::<i64>("b").unwrap(), 3);

        let unchanged = config.with_default("list[0]", 1).unwrap();
        assert!(!unchanged.contains("list"));
    }

    #[test]
    fn test_put_all_masks_current() {
        let config = Config::builder()
            .put_all(yaml("a: 1\nb: 1"))
            .unwrap()
            .put_all(yaml("b: 2"))
            .unwrap()
            .put_all_if_missing(yaml("b: 3\nc: 3"))
            .unwrap()
            .build();
        assert_eq!(config.to_value(), yaml("a: 1\nb: 2\nc: 3"));
    }

    #[test]
    fn test_with_values_and_defaults() {
        let base = Config::from_yaml("a:\n  x: 1\nl: [1, 2]").unwrap();
        let other = Config::from_yaml("a:\n  x: 2\n  y: 3\nl: [3, 4, 5]").unwrap();

        assert_eq!(
            base.with_defaults(&other).to_value(),
            yaml("a:\n  x: 1\n  y: 3\nl: [1, 2]")
        );
        assert_eq!(
            base.with_values(&other).to_value(),
            yaml("a:\n  x: 2\n  y: 3\nl: [3, 4, 5]")
        );
    }

    #[test]
    fn test_splice_config_value() {
        let inner = Config::of([("host", "x")]).unwrap();
        let config = Config::empty().with_value("db", inner).unwrap();
        assert_eq!(config.get::<String>("db.host").unwrap(), "x");
    }

    #[test]
    fn test_remove_prunes_parents() {
        let config = Config::from_yaml("a:\n  b:\n    c: 1\nd: 2").unwrap();
        let removed = config.remove("a.b.c").unwrap();
        assert_eq!(removed.to_value(), yaml("d: 2"));

        let kept = config
            .to_builder()
            .remove("a.b.c", RemoveOptions::leave_empty_parents())
            .unwrap()
            .build();
        assert_eq!(kept.to_value(), yaml("a:\n  b: {}\nd: 2"));
    }

    #[test]
    fn test_map_and_filter_values() {
        let config = Config::from_yaml("a: x\nb:\n  c: y\n  d: 1")
            .unwrap()
            .to_builder()
            .map_values(|_, value| {
                Ok(match value {
                    Scalar::String(s) => Scalar::String(s.to_uppercase()),
                    other => other.clone(),
                })
            })
            .unwrap()
            .filter_values(
                |path, _| path.to_string() != "b.c",
                RemoveOptions::prune_empty_parents(),
            )
            .build();
        assert_eq!(config.to_value(), yaml("a: X\nb:\n  d: 1"));
    }

    #[test]
    fn test_remove_empty_properties() {
        let config = Config::from_yaml("a: {}\nb: []\nc:\n  d: {}\ne: 1")
            .unwrap()
            .to_builder()
            .remove_empty_properties()
            .build();
        assert_eq!(config.to_value(), yaml("e: 1"));
    }

    #[test]
    fn test_resolve_expressions() {
        let config = Config::from_yaml("host: db\nurl: jdbc://${host}:${port?5432}")
            .unwrap()
            .to_builder()
            .resolve_expressions(&Config::empty())
            .unwrap()
            .build();
        assert_eq!(config.get::<String>("url").unwrap(), "jdbc://db:5432");
    }

    #[test]
    fn test_resolve_with_variables() {
        let variables = Config::of([("env", "prod")]).unwrap();
        let config = Config::from_yaml("name: app-${env}")
            .unwrap()
            .to_builder()
            .resolve_expressions(&variables)
            .unwrap()
            .build();
        assert_eq!(config.get::<String>("name").unwrap(), "app-prod");
        assert!(!config.contains("env"));
    }

    #[test]
    fn test_resolve_failure_and_skip() {
        let config = Config::from_yaml("a: ${missing}").unwrap();
        let err = config
            .to_builder()
            .resolve_expressions(&Config::empty())
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnresolvedExpression);
        assert_eq!(err.path.as_deref(), Some("a"));

        let skipped = config
            .to_builder()
            .resolve_expressions_or_skip(&Config::empty())
            .unwrap()
            .build();
        assert_eq!(skipped.get::<String>("a").unwrap(), "${missing}");
    }

    #[test]
    fn test_equality_ignores_parsers() {
        let a = Config::of([("a", 1)]).unwrap();
        let b = a.to_builder().set_value_parsers(ParserRegistry::new()).build();
        assert_eq!(a, b);
    }
}
