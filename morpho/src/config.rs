//! Configuration-related functionality for Morpho.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use eyre::{Result, WrapErr};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// The file extension used for view templates when none is configured.
pub const DEFAULT_EXTENSION: &str = "hbs";

/// Controls what happens when a view name resolves to a path outside of the
/// view root (`dir` + `context`), e.g. `"../secrets"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathPolicy {
    /// Reject views whose canonical path is not located under the canonical
    /// view root.
    Contained,
    /// Use the concatenated path as-is.
    Open,
}

impl Default for PathPolicy {
    fn default() -> Self {
        Self::Contained
    }
}

/// Configuration for a view collection.
///
/// Paths are built by plain string concatenation:
/// `dir + context + view_name + "." + extension`. Include trailing separators
/// in `dir` and `context` where needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base directory for views.
    pub dir: String,
    /// Additional path segment inserted between `dir` and the view name.
    pub context: String,
    /// Template file extension, without the leading dot.
    pub extension: String,
    /// What to do with view names that lead outside of the view root.
    pub path_policy: PathPolicy,
    /// Whether templates fail on missing fields instead of rendering them
    /// as empty strings.
    pub strict: bool,
    /// Values exposed to every view under the `config` key.
    pub globals: Globals,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dir: String::new(),
            context: String::new(),
            extension: DEFAULT_EXTENSION.to_string(),
            path_policy: PathPolicy::default(),
            strict: false,
            globals: Globals::default(),
        }
    }
}

impl Config {
    /// Constructor.
    pub fn new<D, C>(dir: D, context: C) -> Self
    where
        D: AsRef<str>,
        C: AsRef<str>,
    {
        Self {
            dir: dir.as_ref().to_string(),
            context: context.as_ref().to_string(),
            ..Self::default()
        }
    }

    /// Load configuration from a JSON or YAML file. Fields missing from the
    /// file take their default values.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let config = read_config(path)
            .wrap_err_with(|| Error::FailedToLoadConfig(path.to_path_buf()))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Sets the template file extension. A leading dot is dropped.
    pub fn with_extension<E: AsRef<str>>(mut self, extension: E) -> Self {
        self.extension = extension.as_ref().trim_start_matches('.').to_string();
        self
    }

    /// Sets the policy for view names that lead outside of the view root.
    pub fn with_path_policy(mut self, path_policy: PathPolicy) -> Self {
        self.path_policy = path_policy;
        self
    }

    /// Enables or disables strict mode.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Convenience method for adding a global value.
    pub fn with_global<K, V>(mut self, key: K, value: V) -> Result<Self>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let _ = self.globals.set(key, value)?;
        Ok(self)
    }

    /// The directory under which all views of this configuration live.
    pub fn root(&self) -> String {
        format!("{}{}", self.dir, self.context)
    }
}

fn read_config(path: &Path) -> Result<Config> {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| Error::CannotDetermineDataFileType(path.to_path_buf()))?;
    let content =
        fs::read_to_string(path).map_err(|e| Error::Io(path.display().to_string(), e))?;
    match ext {
        "json" => Ok(serde_json::from_str(&content)?),
        "yml" | "yaml" => Ok(serde_yaml::from_str(&content)?),
        _ => Err(Error::CannotDetermineDataFileType(path.to_path_buf()).into()),
    }
}

/// Named values made available to all views.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Globals(HashMap<String, Value>);

impl Globals {
    /// Set the value associated with the given key.
    pub fn set<K, V>(&mut self, key: K, value: V) -> Result<Option<Value>>
    where
        K: AsRef<str>,
        V: Serialize,
    {
        let value = serde_json::to_value(value).map_err(Error::from)?;
        let key = key.as_ref().to_string();
        let maybe_prev = self.0.insert(key, value);
        Ok(maybe_prev)
    }
}

impl From<Globals> for Map<String, Value> {
    fn from(globals: Globals) -> Self {
        globals.0.into_iter().collect()
    }
}
