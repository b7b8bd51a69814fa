//! Declared, layered settings for applications.
//!
//! An application declares its settings once, in a [`Schema`]: each key has
//! a typed default, optional help text, and a resolver that converts the
//! value between text and its typed form. A [`Settings`] facade then
//! resolves every lookup through a fixed precedence chain:
//!
//! 1. Command-line options ([`Settings::set_options`])
//! 2. The user file ([`Settings::set_userfile`]) — the one file `save()`
//!    writes back
//! 3. Runtime overrides ([`Settings::set`] without a user file, or for
//!    non-persistable keys)
//! 4. Environment variables (`{prefix}{KEY}`, dots as `__`; the reserved
//!    `{prefix}CONFIG_FILES` variable attaches extra files)
//! 5. Attached config files, in attach order ([`Settings::add_cfgfile`])
//! 6. The schema default
//!
//! Lookups are never cached: every [`Settings::get`] re-walks the chain, so
//! attaching a file or setting an override is visible immediately. String
//! values may reference other settings with `{OTHER_KEY}` placeholders;
//! references resolve recursively, across layers, with cycle detection.
//!
//! Values found as text (files, environment) are interpolated and then
//! parsed by the key's resolver; already-typed values (options, runtime
//! overrides, defaults) skip parsing. The file format is line-oriented
//! `KEY = value` with `#` comment blocks doubling as per-key help; keys a
//! schema does not declare pass through load and save untouched.
//!
//! ```
//! use declfig::{Decl, Schema, Settings};
//!
//! fn main() -> Result<(), declfig::SettingsError> {
//!     let mut schema = Schema::new();
//!     schema.declare(Decl::new("HOST", "localhost"))?;
//!     schema.declare(Decl::new("PORT", 8080).help("Listen port"))?;
//!     schema.declare(Decl::new("URL", "http://{HOST}:{PORT}/"))?;
//!
//!     let settings = Settings::new(schema, "MYAPP_", Vec::new())?;
//!     assert_eq!(settings.get("URL")?.to_text(), "http://localhost:8080/");
//!     Ok(())
//! }
//! ```
//!
//! The engine is single-threaded by design: all I/O is blocking and the
//! attached sources are plain mutable state. Share a facade across threads
//! only behind external synchronization.

mod env;
mod error;
mod interpolate;
mod options;
mod resolve;
mod resolver;
mod schema;
mod settings;
mod store;
mod value;

#[cfg(test)]
mod fixtures;

pub use error::SettingsError;
pub use resolver::{Registry, Resolve, ResolverArgs, ResolverSpec};
pub use schema::{Decl, OptionDecl, Schema, Section};
pub use settings::{default_userfile_path, Settings};
pub use store::ConfigDoc;
pub use value::Value;
