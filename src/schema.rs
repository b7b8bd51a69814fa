//! The declared schema: which settings exist, their defaults, resolvers,
//! help texts, and persistence flags.
//!
//! A [`Schema`] is built once at startup through successive [`declare`]
//! (`Schema::declare`) and [`section`](Schema::section) calls, then handed to
//! [`Settings`](crate::Settings) and never mutated again. Keys are
//! case-insensitive and canonicalized to upper form; sections are addressed
//! by dotted paths (`DATABASE.POOL_SIZE`).

use crate::error::SettingsError;
use crate::resolver::{ResolverArgs, ResolverSpec};
use crate::value::Value;

/// Canonical form of a key or dotted path: trimmed, upper-cased.
pub(crate) fn canon(key: &str) -> String {
    key.trim().to_ascii_uppercase()
}

/// A pending declaration, built with consuming setters and passed to
/// [`Schema::declare`].
///
/// ```
/// use declfig::{Decl, Schema};
///
/// let mut schema = Schema::new();
/// schema.declare(Decl::new("PORT", 1257).help("Listen port")).unwrap();
/// schema.declare(Decl::new("MODE", "fast").choices(&["fast", "slow"])).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct Decl {
    key: String,
    default: Value,
    resolver: Option<ResolverSpec>,
    help: Option<String>,
    persist: bool,
}

impl Decl {
    /// Start a declaration. When no resolver is set explicitly, one is
    /// inferred from the default's variant at declaration time.
    pub fn new(key: &str, default: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            default: default.into(),
            resolver: None,
            help: None,
            persist: true,
        }
    }

    /// Use the resolver registered under `tag`, with no construction args.
    pub fn resolver(mut self, tag: &str) -> Self {
        self.resolver = Some(ResolverSpec::new(tag));
        self
    }

    /// Use the resolver registered under `tag` with explicit construction args.
    pub fn resolver_with(mut self, tag: &str, args: ResolverArgs) -> Self {
        self.resolver = Some(ResolverSpec::with_args(tag, args));
        self
    }

    /// Constrain the setting to an enumerated choice list.
    pub fn choices(mut self, choices: &[&str]) -> Self {
        let args = ResolverArgs {
            choices: Some(choices.iter().map(|c| c.to_string()).collect()),
            ..ResolverArgs::default()
        };
        self.resolver = Some(ResolverSpec::with_args("choice", args));
        self
    }

    /// Attach help text, written back as a comment above the key on save.
    pub fn help(mut self, text: &str) -> Self {
        self.help = Some(text.to_string());
        self
    }

    /// Exclude this key from `save()`; runtime writes stay in memory only.
    pub fn no_persist(mut self) -> Self {
        self.persist = false;
        self
    }
}

/// A declared leaf setting.
#[derive(Debug, Clone)]
pub struct OptionDecl {
    pub key: String,
    pub default: Value,
    pub resolver: ResolverSpec,
    pub help: Option<String>,
    pub persist: bool,
}

#[derive(Debug, Clone)]
enum Node {
    Option(OptionDecl),
    Section(Section),
}

impl Node {
    fn key(&self) -> &str {
        match self {
            Node::Option(opt) => &opt.key,
            Node::Section(sec) => &sec.name,
        }
    }
}

/// An internal node of the schema tree: an ordered set of options and
/// nested sections.
#[derive(Debug, Clone)]
pub struct Section {
    name: String,
    children: Vec<Node>,
}

impl Section {
    fn new(name: String) -> Self {
        Self {
            name,
            children: Vec::new(),
        }
    }

    /// Register an option in this section.
    pub fn declare(&mut self, decl: Decl) -> Result<(), SettingsError> {
        let key = canon(&decl.key);
        validate_name(&key)?;
        if self.children.iter().any(|c| c.key() == key) {
            return Err(SettingsError::DuplicateKey {
                key,
                section: self.name.clone(),
            });
        }
        let resolver = match decl.resolver {
            Some(spec) => spec,
            None => infer_spec(&decl.default),
        };
        self.children.push(Node::Option(OptionDecl {
            key,
            default: decl.default,
            resolver,
            help: decl.help,
            persist: decl.persist,
        }));
        Ok(())
    }

    /// Register a nested section and return a handle for declaring into it.
    /// Calling it again with the same name returns the existing section.
    pub fn section(&mut self, name: &str) -> Result<&mut Section, SettingsError> {
        let name = canon(name);
        validate_name(&name)?;
        if let Some(idx) = self.children.iter().position(|c| c.key() == name) {
            return match &mut self.children[idx] {
                Node::Section(sec) => Ok(sec),
                Node::Option(_) => Err(SettingsError::DuplicateKey {
                    key: name,
                    section: self.name.clone(),
                }),
            };
        }
        self.children.push(Node::Section(Section::new(name)));
        match self.children.last_mut() {
            Some(Node::Section(sec)) => Ok(sec),
            _ => unreachable!(),
        }
    }

    fn find(&self, path: &str) -> Option<&OptionDecl> {
        let (head, rest) = match path.split_once('.') {
            Some((h, r)) => (h, Some(r)),
            None => (path, None),
        };
        for child in &self.children {
            if child.key() != head {
                continue;
            }
            return match (child, rest) {
                (Node::Option(opt), None) => Some(opt),
                (Node::Section(sec), Some(rest)) => sec.find(rest),
                _ => None,
            };
        }
        None
    }

    fn collect_keys(&self, prefix: &str, out: &mut Vec<String>) {
        for child in &self.children {
            let dotted = if prefix.is_empty() {
                child.key().to_string()
            } else {
                format!("{prefix}.{}", child.key())
            };
            match child {
                Node::Option(_) => out.push(dotted),
                Node::Section(sec) => sec.collect_keys(&dotted, out),
            }
        }
    }
}

/// The declarative settings tree. Owned by exactly one
/// [`Settings`](crate::Settings) instance and immutable after construction.
#[derive(Debug, Clone)]
pub struct Schema {
    root: Section,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            root: Section::new(String::new()),
        }
    }

    /// Register a top-level option. See [`Decl`].
    pub fn declare(&mut self, decl: Decl) -> Result<(), SettingsError> {
        self.root.declare(decl)
    }

    /// Register (or re-open) a top-level section.
    pub fn section(&mut self, name: &str) -> Result<&mut Section, SettingsError> {
        self.root.section(name)
    }

    /// Look up an option by bare key or dotted path, case-insensitively.
    pub fn find(&self, key: &str) -> Option<&OptionDecl> {
        self.root.find(&canon(key))
    }

    /// All declared dotted key paths, in declaration order, depth-first.
    pub fn keys(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_keys("", &mut out);
        out
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys and section names are identifiers: non-empty, alphanumeric or
/// underscore. Dots are reserved for path addressing.
fn validate_name(name: &str) -> Result<(), SettingsError> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(SettingsError::InvalidValue {
            key: name.to_string(),
            reason: "key must be a non-empty identifier (A-Z, 0-9, _)".into(),
        });
    }
    Ok(())
}

/// Infer a resolver spec from a default value's variant. Total over the
/// `Value` enum; list element and tuple position types come from the
/// default's contents (an empty list falls back to string elements).
fn infer_spec(default: &Value) -> ResolverSpec {
    match default {
        Value::List(items) => {
            let element = items.first().map(|v| v.type_tag()).unwrap_or("str");
            ResolverSpec::with_args(
                "list",
                ResolverArgs {
                    element: Some(element.to_string()),
                    ..ResolverArgs::default()
                },
            )
        }
        Value::Tuple(items) => ResolverSpec::with_args(
            "tuple",
            ResolverArgs {
                signature: Some(items.iter().map(|v| v.type_tag().to_string()).collect()),
                ..ResolverArgs::default()
            },
        ),
        other => ResolverSpec::new(other.type_tag()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_and_find() {
        let mut schema = Schema::new();
        schema.declare(Decl::new("PORT", 1257)).unwrap();
        let opt = schema.find("port").unwrap();
        assert_eq!(opt.key, "PORT");
        assert_eq!(opt.default, Value::Int(1257));
        assert_eq!(opt.resolver.tag, "int");
        assert!(opt.persist);
    }

    #[test]
    fn duplicate_key_rejected() {
        let mut schema = Schema::new();
        schema.declare(Decl::new("HOST", "a")).unwrap();
        let err = schema.declare(Decl::new("host", "b")).unwrap_err();
        assert!(matches!(err, SettingsError::DuplicateKey { .. }));
    }

    #[test]
    fn same_key_in_different_sections_allowed() {
        let mut schema = Schema::new();
        schema.declare(Decl::new("URL", "top")).unwrap();
        schema
            .section("DATABASE")
            .unwrap()
            .declare(Decl::new("URL", "nested"))
            .unwrap();
        assert_eq!(schema.find("URL").unwrap().default, Value::from("top"));
        assert_eq!(
            schema.find("database.url").unwrap().default,
            Value::from("nested")
        );
    }

    #[test]
    fn section_reopen_returns_existing() {
        let mut schema = Schema::new();
        schema
            .section("DB")
            .unwrap()
            .declare(Decl::new("A", 1))
            .unwrap();
        schema
            .section("db")
            .unwrap()
            .declare(Decl::new("B", 2))
            .unwrap();
        assert!(schema.find("DB.A").is_some());
        assert!(schema.find("DB.B").is_some());
    }

    #[test]
    fn section_name_clashing_with_option_rejected() {
        let mut schema = Schema::new();
        schema.declare(Decl::new("DB", 1)).unwrap();
        assert!(matches!(
            schema.section("DB"),
            Err(SettingsError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn dotted_key_in_declare_rejected() {
        let mut schema = Schema::new();
        let err = schema.declare(Decl::new("A.B", 1)).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn list_default_infers_element_type() {
        let mut schema = Schema::new();
        schema
            .declare(Decl::new("PORTS", vec![80i64, 443]))
            .unwrap();
        let opt = schema.find("PORTS").unwrap();
        assert_eq!(opt.resolver.tag, "list");
        assert_eq!(opt.resolver.args.element.as_deref(), Some("int"));
    }

    #[test]
    fn empty_list_default_falls_back_to_str_elements() {
        let mut schema = Schema::new();
        schema
            .declare(Decl::new("TAGS", Value::List(vec![])))
            .unwrap();
        let opt = schema.find("TAGS").unwrap();
        assert_eq!(opt.resolver.args.element.as_deref(), Some("str"));
    }

    #[test]
    fn tuple_default_infers_signature() {
        let mut schema = Schema::new();
        let default = Value::Tuple(vec![Value::from("localhost"), Value::from(5432i64)]);
        schema.declare(Decl::new("ENDPOINT", default)).unwrap();
        let opt = schema.find("ENDPOINT").unwrap();
        assert_eq!(opt.resolver.tag, "tuple");
        assert_eq!(
            opt.resolver.args.signature.as_deref(),
            Some(&["str".to_string(), "int".to_string()][..])
        );
    }

    #[test]
    fn keys_are_dotted_and_ordered() {
        let mut schema = Schema::new();
        schema.declare(Decl::new("HOST", "x")).unwrap();
        let db = schema.section("DATABASE").unwrap();
        db.declare(Decl::new("URL", "u")).unwrap();
        db.declare(Decl::new("POOL_SIZE", 5)).unwrap();
        schema.declare(Decl::new("DEBUG", false)).unwrap();
        assert_eq!(
            schema.keys(),
            vec!["HOST", "DATABASE.URL", "DATABASE.POOL_SIZE", "DEBUG"]
        );
    }

    #[test]
    fn explicit_resolver_overrides_inference() {
        let mut schema = Schema::new();
        schema
            .declare(Decl::new("LEVEL", "info").choices(&["debug", "info", "warn"]))
            .unwrap();
        assert_eq!(schema.find("LEVEL").unwrap().resolver.tag, "choice");
    }
}
