//! The settings facade: owns the schema, the resolver registry, and all
//! attached sources, and exposes the lookup/mutation surface applications
//! hold on to.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Serialize;

use crate::env::EnvSource;
use crate::error::SettingsError;
use crate::options::OptionsSource;
use crate::resolve::Chain;
use crate::resolver::{Registry, Resolve, ResolverArgs};
use crate::schema::{canon, Schema};
use crate::store::ConfigDoc;
use crate::value::Value;

/// A configured application's settings: one schema, one resolver registry,
/// and the layered sources lookups walk through.
///
/// Single-threaded by design. Attached state is mutable shared data with no
/// internal locking, and the lazy `CONFIG_FILES` attachment uses interior
/// mutability, so a facade shared across threads must be externally
/// serialized.
pub struct Settings {
    schema: Schema,
    registry: Registry,
    env: Option<EnvSource>,
    options: Option<OptionsSource>,
    nosave: HashMap<String, Value>,
    userfile: Option<ConfigDoc>,
    cfgfiles: RefCell<Vec<ConfigDoc>>,
    env_attached: Cell<bool>,
}

impl Settings {
    /// Build a facade over the process environment. Every path in
    /// `initial_config_files` is loaded immediately, in order.
    pub fn new(
        schema: Schema,
        prefix: &str,
        initial_config_files: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, SettingsError> {
        Self::build(
            schema,
            Some(EnvSource::from_process(prefix)),
            initial_config_files,
        )
    }

    /// Build a facade over an explicit environment snapshot instead of the
    /// process environment. Intended for tests and embedding hosts that
    /// manage the environment themselves.
    pub fn with_env_snapshot(
        schema: Schema,
        prefix: &str,
        initial_config_files: impl IntoIterator<Item = PathBuf>,
        env_pairs: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self, SettingsError> {
        Self::build(
            schema,
            Some(EnvSource::from_pairs(prefix, env_pairs)),
            initial_config_files,
        )
    }

    fn build(
        schema: Schema,
        env: Option<EnvSource>,
        initial_config_files: impl IntoIterator<Item = PathBuf>,
    ) -> Result<Self, SettingsError> {
        let mut cfgfiles = Vec::new();
        for path in initial_config_files {
            cfgfiles.push(ConfigDoc::load(&path)?);
        }
        Ok(Self {
            schema,
            registry: Registry::with_builtins(),
            env,
            options: None,
            nosave: HashMap::new(),
            userfile: None,
            cfgfiles: RefCell::new(cfgfiles),
            env_attached: Cell::new(false),
        })
    }

    /// Resolve a setting through the full precedence chain: command-line
    /// options, user file, runtime overrides, environment, attached config
    /// files in attach order, schema default. Never memoized.
    pub fn get(&self, key: &str) -> Result<Value, SettingsError> {
        self.attach_env_files()?;
        let files = self.cfgfiles.borrow();
        Chain {
            schema: &self.schema,
            registry: &self.registry,
            options: self.options.as_ref(),
            userfile: self.userfile.as_ref(),
            nosave: &self.nosave,
            env: self.env.as_ref(),
            files: &files,
        }
        .resolve(key)
    }

    /// Write a typed value. Persistable settings go into the in-memory user
    /// file entry when one is attached; everything else lands in the
    /// runtime override store and is lost at process exit.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), SettingsError> {
        let key = canon(key);
        let decl = self
            .schema
            .find(&key)
            .ok_or_else(|| SettingsError::UnknownSetting(key.clone()))?;
        let value = value.into();
        let handle = self.registry.resolve(&decl.resolver)?;
        handle.validate(&key, &value)?;
        if decl.persist && let Some(doc) = &mut self.userfile {
            doc.set(&key, handle.render(&value)?);
        } else {
            self.nosave.insert(key, value);
        }
        Ok(())
    }

    /// Drop any runtime override and user-file entry for a key, so lower
    /// layers show through again.
    pub fn unset(&mut self, key: &str) -> Result<(), SettingsError> {
        let key = canon(key);
        if self.schema.find(&key).is_none() {
            return Err(SettingsError::UnknownSetting(key));
        }
        self.nosave.remove(&key);
        if let Some(doc) = &mut self.userfile {
            doc.remove(&key);
        }
        Ok(())
    }

    /// Write the user file entry back to disk. Declared keys marked
    /// non-persistable are dropped; keys the schema does not know keep
    /// their entries verbatim. Entries without a help comment inherit the
    /// schema's declared help.
    pub fn save(&self) -> Result<(), SettingsError> {
        let doc = self.userfile.as_ref().ok_or(SettingsError::NoUserFile)?;
        let path = doc
            .path()
            .map(Path::to_path_buf)
            .ok_or(SettingsError::NoUserFile)?;
        let mut out = doc.clone();
        for key in self.schema.keys() {
            let Some(decl) = self.schema.find(&key) else {
                continue;
            };
            if !decl.persist {
                out.remove(&key);
            } else if out.contains(&key)
                && out.help(&key).is_none()
                && let Some(help) = &decl.help
            {
                out.set_help(&key, help);
            }
        }
        out.dump(&path)
    }

    /// Attach a config file below the environment layer. Loads immediately;
    /// attaching the same path twice is a no-op.
    pub fn add_cfgfile(&mut self, path: &Path) -> Result<(), SettingsError> {
        if self
            .cfgfiles
            .borrow()
            .iter()
            .any(|doc| doc.path() == Some(path))
        {
            return Ok(());
        }
        let doc = ConfigDoc::load(path)?;
        self.cfgfiles.borrow_mut().push(doc);
        Ok(())
    }

    /// Attach the writable user file, creating an empty in-memory entry if
    /// the file does not exist yet.
    pub fn set_userfile(&mut self, path: &Path) -> Result<(), SettingsError> {
        self.userfile = Some(ConfigDoc::load_or_default(path)?);
        Ok(())
    }

    /// Store the parsed command-line options struct as the top layer.
    /// `None` fields do not override anything.
    pub fn set_options<S: Serialize>(&mut self, args: &S) -> Result<(), SettingsError> {
        self.options = Some(OptionsSource::from_args(args)?);
        Ok(())
    }

    /// Remove the command-line layer entirely.
    pub fn clear_options(&mut self) {
        self.options = None;
    }

    /// Help text for a key: a comment in the user file wins, then attached
    /// config files newest-first, then the schema's declared help.
    pub fn help(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let key = canon(key);
        let decl = self
            .schema
            .find(&key)
            .ok_or_else(|| SettingsError::UnknownSetting(key.clone()))?;
        if let Some(lines) = self.userfile.as_ref().and_then(|doc| doc.help(&key)) {
            return Ok(Some(lines.join("\n")));
        }
        for doc in self.cfgfiles.borrow().iter().rev() {
            if let Some(lines) = doc.help(&key) {
                return Ok(Some(lines.join("\n")));
            }
        }
        Ok(decl.help.clone())
    }

    /// All declared dotted key paths, in declaration order.
    pub fn keys(&self) -> Vec<String> {
        self.schema.keys()
    }

    /// Whether a key is declared in the schema.
    pub fn has(&self, key: &str) -> bool {
        self.schema.find(key).is_some()
    }

    /// Register a custom resolver factory under `tag`. Declarations may
    /// reference it via [`Decl::resolver`](crate::Decl::resolver).
    pub fn register_resolver<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(&Registry, &ResolverArgs) -> Result<Box<dyn Resolve>, SettingsError> + 'static,
    {
        self.registry.register(tag, factory);
    }

    /// Write a commented starter config file from the schema's defaults and
    /// help texts. With `disabled`, every entry is written commented out so
    /// the file documents the defaults without overriding them.
    pub fn write_template(&self, path: &Path, disabled: bool) -> Result<(), SettingsError> {
        let mut out = String::new();
        for key in self.schema.keys() {
            let Some(decl) = self.schema.find(&key) else {
                continue;
            };
            if !out.is_empty() {
                out.push('\n');
            }
            if let Some(help) = &decl.help {
                for line in help.lines() {
                    out.push_str("# ");
                    out.push_str(line);
                    out.push('\n');
                }
            }
            let raw = self.registry.resolve(&decl.resolver)?.render(&decl.default)?;
            if disabled {
                out.push_str("# ");
            }
            out.push_str(&key);
            out.push_str(" = ");
            out.push_str(&raw);
            out.push('\n');
        }
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Storage {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, out).map_err(|e| SettingsError::Storage {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Attach the files named by the reserved `{prefix}CONFIG_FILES`
    /// variable. Runs once, on the first lookup after construction; a load
    /// failure surfaces from that lookup and is retried on the next one.
    fn attach_env_files(&self) -> Result<(), SettingsError> {
        if self.env_attached.get() {
            return Ok(());
        }
        if let Some(env) = &self.env {
            for path in env.config_files()? {
                let attached = self
                    .cfgfiles
                    .borrow()
                    .iter()
                    .any(|doc| doc.path() == Some(path.as_path()));
                if attached {
                    continue;
                }
                let doc = ConfigDoc::load(&path)?;
                self.cfgfiles.borrow_mut().push(doc);
            }
        }
        self.env_attached.set(true);
        Ok(())
    }
}

/// The conventional per-user location for an application's user file:
/// `{platform config dir}/{app_name}.conf`.
pub fn default_userfile_path(app_name: &str) -> Option<PathBuf> {
    ProjectDirs::from("", "", app_name)
        .map(|dirs| dirs.config_dir().join(format!("{app_name}.conf")))
}
