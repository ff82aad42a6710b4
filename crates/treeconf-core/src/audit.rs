//! Read tracking for configs
//!
//! [`AuditableConfig`] forwards reads to a [`Config`] and remembers every path
//! that was asked for. Whatever was never read can then be listed or reported
//! as an error, which catches typos and stale keys in configuration files.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::coercion::ConfigType;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::node::{Node, RemoveOptions};
use crate::path::Path;
use crate::value::Value;

/// A [`Config`] that records which paths were read
///
/// Reading a path marks the whole subtree below it, so taking a sub-config
/// counts as using every value in it. Clones share the record of reads.
#[derive(Debug, Clone)]
pub struct AuditableConfig {
    config: Config,
    read: Arc<RwLock<HashSet<Path>>>,
}

impl AuditableConfig {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            read: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// The audited config. Reads through it are not recorded.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_inner(self) -> Config {
        self.config
    }

    /// Record `path` as used. Unparsable or absent paths are ignored.
    pub fn mark_as_read(&self, path: &str) -> &Self {
        if let Ok(path) = Path::parse(path) {
            if self.config.root().get(&path).is_some() {
                log::trace!("Marking '{}' as read", path);
                self.read
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(path);
            }
        }
        self
    }

    fn is_read(&self, leaf: &Path) -> bool {
        self.read
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|prefix| leaf.starts_with(prefix))
    }

    /// The values never read, with parents left empty removed
    pub fn unused_values(&self) -> Config {
        self.config
            .to_builder()
            .filter_values(
                |path, _| !self.is_read(path),
                RemoveOptions::prune_empty_parents(),
            )
            .build()
    }

    /// Fail when any value was never read, listing the first unused paths
    pub fn ensure_all_used(&self) -> Result<()> {
        let unused: Vec<String> = self
            .unused_values()
            .entries()
            .into_iter()
            .map(|(path, _)| path.to_string())
            .collect();
        if unused.is_empty() {
            return Ok(());
        }
        log::debug!("Found {} unused config values", unused.len());
        Err(Error::unused_values(&unused))
    }

    pub fn get<T: ConfigType>(&self, path: &str) -> Result<T> {
        self.mark_as_read(path).config.get(path)
    }

    pub fn get_optional<T: ConfigType>(&self, path: &str) -> Result<Option<T>> {
        self.mark_as_read(path).config.get_optional(path)
    }

    pub fn get_or<T: ConfigType>(&self, path: &str, default: T) -> Result<T> {
        self.mark_as_read(path).config.get_or(path, default)
    }

    pub fn get_list<T: ConfigType>(&self, path: &str) -> Result<Vec<T>> {
        self.mark_as_read(path).config.get_list(path)
    }

    pub fn get_list_optional<T: ConfigType>(&self, path: &str) -> Result<Option<Vec<T>>> {
        self.mark_as_read(path).config.get_list_optional(path)
    }

    pub fn get_list_or<T: ConfigType>(&self, path: &str, default: Vec<T>) -> Result<Vec<T>> {
        self.mark_as_read(path).config.get_list_or(path, default)
    }

    pub fn get_string(&self, path: &str) -> Result<String> {
        self.get(path)
    }

    pub fn get_value(&self, path: &str) -> Result<Value> {
        self.get(path)
    }

    pub fn get_config(&self, path: &str) -> Result<Config> {
        self.mark_as_read(path).config.get_config(path)
    }

    pub fn get_config_optional(&self, path: &str) -> Result<Option<Config>> {
        self.mark_as_read(path).config.get_config_optional(path)
    }

    pub fn get_config_or_empty(&self, path: &str) -> Result<Config> {
        self.mark_as_read(path).config.get_config_or_empty(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.config.contains(path)
    }

    pub fn root(&self) -> &Node {
        self.config.root()
    }
}

impl From<Config> for AuditableConfig {
    fn from(config: Config) -> Self {
        Self::new(config)
    }
}
