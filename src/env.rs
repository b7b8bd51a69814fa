//! The environment variable layer.
//!
//! A setting named `DATABASE.URL` under prefix `MYAPP_` is overridden by
//! the variable `MYAPP_DATABASE__URL`: the prefix is prepended verbatim
//! and dots become double underscores. The reserved variable
//! `{prefix}CONFIG_FILES` holds a JSON array of extra config file paths
//! to attach.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SettingsError;
use crate::schema::canon;

/// A snapshot of environment variables taken at construction time.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    prefix: String,
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Snapshot the current process environment. Only variables starting
    /// with `prefix` are kept.
    pub fn from_process(prefix: &str) -> Self {
        Self::from_pairs(prefix, std::env::vars())
    }

    /// Build from explicit pairs, bypassing the process environment.
    pub fn from_pairs(
        prefix: &str,
        pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let vars = pairs
            .into_iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .collect();
        Self {
            prefix: prefix.to_string(),
            vars,
        }
    }

    /// The variable name a dotted setting key maps to.
    pub fn var_name(&self, key: &str) -> String {
        format!("{}{}", self.prefix, canon(key).replace('.', "__"))
    }

    /// Raw override text for a setting, if its variable is set.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(&self.var_name(key)).map(String::as_str)
    }

    /// Paths listed in the reserved `{prefix}CONFIG_FILES` variable, which
    /// must be a JSON array of strings.
    pub fn config_files(&self) -> Result<Vec<PathBuf>, SettingsError> {
        let name = format!("{}CONFIG_FILES", self.prefix);
        let Some(raw) = self.vars.get(&name) else {
            return Ok(Vec::new());
        };
        let paths: Vec<String> =
            serde_json::from_str(raw).map_err(|e| SettingsError::InvalidValue {
                key: name,
                reason: format!("expected a JSON array of paths: {e}"),
            })?;
        Ok(paths.into_iter().map(PathBuf::from).collect())
    }
}
