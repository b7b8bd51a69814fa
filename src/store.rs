//! The on-disk config file format: ordered `KEY = value` pairs with
//! attached help comments.
//!
//! A [`ConfigDoc`] is one parsed file. A contiguous block of `#` comment
//! lines immediately above a key is that key's help text; blank lines and
//! free-standing comment blocks are kept as decoration and written back
//! verbatim. Keys are matched case-insensitively, insertion order is
//! preserved, and keys unknown to any schema pass through load→dump
//! unchanged.

use std::path::{Path, PathBuf};

use crate::error::SettingsError;
use crate::schema::canon;

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Pair {
        /// Key as written in the source; matched via its canonical form.
        key: String,
        raw: String,
        help: Vec<String>,
    },
    /// A verbatim blank or comment line with no key attached.
    Decoration(String),
}

/// One parsed config file: an ordered sequence of key/value/help entries
/// plus preserved decoration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDoc {
    path: Option<PathBuf>,
    items: Vec<Item>,
}

impl ConfigDoc {
    pub fn new() -> Self {
        Self::default()
    }

    /// The file this document was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Parse the textual format. `path` is carried for error reporting and
    /// later `dump`.
    pub fn parse(text: &str, path: &Path) -> Result<Self, SettingsError> {
        let mut doc = Self {
            path: Some(path.to_path_buf()),
            items: Vec::new(),
        };
        // Comment lines waiting to attach to the next key. Kept both
        // stripped (for help) and verbatim (for decoration flushes).
        let mut pending: Vec<String> = Vec::new();
        let mut pending_verbatim: Vec<String> = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            let lineno = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                // A blank line breaks the comment block: it was decoration,
                // not help for whatever key comes later.
                for verbatim in pending_verbatim.drain(..) {
                    doc.items.push(Item::Decoration(verbatim));
                }
                pending.clear();
                doc.items.push(Item::Decoration(line.to_string()));
            } else if let Some(comment) = trimmed.strip_prefix('#') {
                pending.push(comment.trim().to_string());
                pending_verbatim.push(line.to_string());
            } else if let Some((key, value)) = trimmed.split_once('=') {
                let key = key.trim();
                if key.is_empty() || doc.contains(key) {
                    return Err(SettingsError::Parse {
                        path: path.to_path_buf(),
                        line: lineno,
                    });
                }
                pending_verbatim.clear();
                doc.items.push(Item::Pair {
                    key: key.to_string(),
                    raw: value.trim().to_string(),
                    help: std::mem::take(&mut pending),
                });
            } else {
                return Err(SettingsError::Parse {
                    path: path.to_path_buf(),
                    line: lineno,
                });
            }
        }
        for verbatim in pending_verbatim {
            doc.items.push(Item::Decoration(verbatim));
        }
        Ok(doc)
    }

    /// Read and parse a file. Missing files are a [`SettingsError::Storage`]
    /// error here; use [`load_or_default`](Self::load_or_default) where
    /// absence means "start empty".
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path).map_err(|e| SettingsError::Storage {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&text, path)
    }

    /// Read and parse a file, or return an empty document bound to `path`
    /// if the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self {
                path: Some(path.to_path_buf()),
                items: Vec::new(),
            }),
            Err(e) => Err(SettingsError::Storage {
                path: path.to_path_buf(),
                source: e,
            }),
        }
    }

    /// Serialize back to the textual format, reproducing entry order and
    /// reattaching each key's help comment.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for item in &self.items {
            match item {
                Item::Decoration(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Item::Pair { key, raw, help } => {
                    for line in help {
                        out.push_str("# ");
                        out.push_str(line);
                        out.push('\n');
                    }
                    out.push_str(key);
                    out.push_str(" = ");
                    out.push_str(raw);
                    out.push('\n');
                }
            }
        }
        out
    }

    /// Write the rendered document to `path`, creating parent directories
    /// as needed.
    pub fn dump(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| SettingsError::Storage {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, self.render()).map_err(|e| SettingsError::Storage {
            path: path.to_path_buf(),
            source: e,
        })
    }

    fn position(&self, key: &str) -> Option<usize> {
        let wanted = canon(key);
        self.items.iter().position(|item| match item {
            Item::Pair { key, .. } => canon(key) == wanted,
            Item::Decoration(_) => false,
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Raw value text for a key, matched case-insensitively.
    pub fn get(&self, key: &str) -> Option<&str> {
        match &self.items[self.position(key)?] {
            Item::Pair { raw, .. } => Some(raw),
            Item::Decoration(_) => None,
        }
    }

    /// Set a key's raw value, updating in place (preserving the original
    /// spelling and help comment) or appending a new entry.
    pub fn set(&mut self, key: &str, raw: String) {
        match self.position(key) {
            Some(idx) => {
                if let Item::Pair { raw: slot, .. } = &mut self.items[idx] {
                    *slot = raw;
                }
            }
            None => self.items.push(Item::Pair {
                key: canon(key),
                raw,
                help: Vec::new(),
            }),
        }
    }

    /// Remove a key's entry. Returns whether it was present.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Some(idx) => {
                self.items.remove(idx);
                true
            }
            None => false,
        }
    }

    /// The help comment attached to a key, if it has one.
    pub fn help(&self, key: &str) -> Option<&[String]> {
        match &self.items[self.position(key)?] {
            Item::Pair { help, .. } if !help.is_empty() => Some(help),
            _ => None,
        }
    }

    /// Attach (or replace) a key's help comment. No-op for absent keys.
    pub fn set_help(&mut self, key: &str, text: &str) {
        if let Some(idx) = self.position(key)
            && let Item::Pair { help, .. } = &mut self.items[idx]
        {
            *help = text.lines().map(str::to_string).collect();
        }
    }

    /// Keys in insertion order, as written in the source.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            Item::Pair { key, .. } => Some(key.as_str()),
            Item::Decoration(_) => None,
        })
    }
}
