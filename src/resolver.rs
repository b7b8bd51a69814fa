//! Type resolvers: the parse/render pairs that convert settings between
//! their textual form (files, environment) and typed [`Value`]s.
//!
//! Resolvers are looked up in a [`Registry`] by string tag. Built-ins cover
//! `str`, `int`, `float`, `bool`, `path` (tilde-expanding string), `list`
//! (homogeneous, element type in the construction args), `tuple` (fixed
//! arity, per-position signature), and `choice` (token validated against an
//! enumerated list). Applications register custom resolvers under their own
//! tags with [`Registry::register`].
//!
//! Every resolver obeys the round-trip law `parse(render(v)) == v` for all
//! values it can produce.

use std::collections::HashMap;

use directories::BaseDirs;

use crate::error::SettingsError;
use crate::value::Value;

/// Construction arguments for a resolver, the `{kwargs}` half of a
/// `("tag", {kwargs})` reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolverArgs {
    /// Allowed tokens for choice-constrained resolvers.
    pub choices: Option<Vec<String>>,
    /// Element type tag for list resolvers.
    pub element: Option<String>,
    /// Per-position type tags for tuple resolvers.
    pub signature: Option<Vec<String>>,
}

/// A reference to a registry entry: tag plus construction args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSpec {
    pub tag: String,
    pub args: ResolverArgs,
}

impl ResolverSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            args: ResolverArgs::default(),
        }
    }

    pub fn with_args(tag: &str, args: ResolverArgs) -> Self {
        Self {
            tag: tag.to_string(),
            args,
        }
    }
}

/// A constructed coercion pair. Stateless: resolvers hold only their
/// construction args, never settings state.
pub trait Resolve {
    fn tag(&self) -> &str;

    /// Parse the textual form into a typed value.
    fn parse(&self, text: &str) -> Result<Value, SettingsError>;

    /// Render a typed value back to its textual form. Total over every
    /// value `parse` or the option's default can produce.
    fn render(&self, value: &Value) -> Result<String, SettingsError>;

    /// Validate an already-typed value (called before `set` stores it).
    fn validate(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        // Default: the variant must match this resolver's tag.
        if value.type_tag() == self.tag() {
            Ok(())
        } else {
            Err(type_mismatch(key, self.tag(), value))
        }
    }
}

fn type_mismatch(key: &str, expected: &str, got: &Value) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: format!("expected {expected}, got {}", got.type_tag()),
    }
}

fn coercion(tag: &str, text: &str) -> SettingsError {
    SettingsError::Coercion {
        tag: tag.to_string(),
        text: text.to_string(),
    }
}

type Factory = Box<dyn Fn(&Registry, &ResolverArgs) -> Result<Box<dyn Resolve>, SettingsError>>;

/// Maps type tags to resolver factories. One registry per
/// [`Settings`](crate::Settings) instance; handles are constructed fresh on
/// every resolution, so registering a tag takes effect immediately.
pub struct Registry {
    factories: HashMap<String, Factory>,
}

impl Registry {
    /// A registry with all built-in resolvers installed.
    pub fn with_builtins() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("str", |_, args| {
            Ok(match &args.choices {
                // The original str resolver doubles as a choice check when
                // choices are supplied.
                Some(choices) => Box::new(ChoiceResolver {
                    choices: choices.clone(),
                }),
                None => Box::new(StrResolver),
            })
        });
        registry.register("int", |_, _| Ok(Box::new(IntResolver)));
        registry.register("path", |_, _| Ok(Box::new(PathResolver)));
        registry.register("float", |_, _| Ok(Box::new(FloatResolver)));
        registry.register("bool", |_, _| Ok(Box::new(BoolResolver)));
        registry.register("choice", |_, args| {
            let choices = args.choices.clone().ok_or(SettingsError::InvalidValue {
                key: "choice".into(),
                reason: "a choices list is required".into(),
            })?;
            Ok(Box::new(ChoiceResolver { choices }))
        });
        registry.register("list", |registry, args| {
            let element_tag = args.element.as_deref().unwrap_or("str");
            let element = registry.resolve(&ResolverSpec::new(element_tag))?;
            Ok(Box::new(ListResolver { element }))
        });
        registry.register("tuple", |registry, args| {
            let signature = args.signature.clone().ok_or(SettingsError::InvalidValue {
                key: "tuple".into(),
                reason: "a per-position type signature is required".into(),
            })?;
            // An empty tuple has no textual form the delimited format can
            // represent.
            if signature.is_empty() {
                return Err(SettingsError::InvalidValue {
                    key: "tuple".into(),
                    reason: "the signature must name at least one element".into(),
                });
            }
            let elements = signature
                .iter()
                .map(|tag| registry.resolve(&ResolverSpec::new(tag)))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Box::new(TupleResolver { elements }))
        });
        registry
    }

    /// Register a custom resolver factory under `tag`, replacing any
    /// previous entry. The factory receives the registry (for element
    /// lookups) and the spec's construction args.
    pub fn register<F>(&mut self, tag: &str, factory: F)
    where
        F: Fn(&Registry, &ResolverArgs) -> Result<Box<dyn Resolve>, SettingsError> + 'static,
    {
        self.factories.insert(tag.to_string(), Box::new(factory));
    }

    /// Construct the resolver a spec refers to.
    pub fn resolve(&self, spec: &ResolverSpec) -> Result<Box<dyn Resolve>, SettingsError> {
        let factory = self
            .factories
            .get(&spec.tag)
            .ok_or_else(|| SettingsError::NoResolver {
                tag: spec.tag.clone(),
            })?;
        factory(self, &spec.args)
    }
}

// --- Built-ins --------------------------------------------------------------

struct StrResolver;

impl Resolve for StrResolver {
    fn tag(&self) -> &str {
        "str"
    }

    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        Ok(Value::Str(text.to_string()))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch("str", "str", value))
    }
}

struct IntResolver;

impl Resolve for IntResolver {
    fn tag(&self) -> &str {
        "int"
    }

    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        text.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| coercion("int", text))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_int()
            .map(|i| i.to_string())
            .ok_or_else(|| type_mismatch("int", "int", value))
    }
}

struct FloatResolver;

impl Resolve for FloatResolver {
    fn tag(&self) -> &str {
        "float"
    }

    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        text.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| coercion("float", text))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_float()
            .map(|f| f.to_string())
            .ok_or_else(|| type_mismatch("float", "float", value))
    }
}

struct BoolResolver;

/// Accepted spellings, matched case-insensitively.
const TRUE_TOKENS: [&str; 4] = ["true", "1", "yes", "y"];
const FALSE_TOKENS: [&str; 4] = ["false", "0", "no", "n"];

impl Resolve for BoolResolver {
    fn tag(&self) -> &str {
        "bool"
    }

    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        let token = text.trim();
        if TRUE_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t)) {
            Ok(Value::Bool(true))
        } else if FALSE_TOKENS.iter().any(|t| token.eq_ignore_ascii_case(t)) {
            Ok(Value::Bool(false))
        } else {
            Err(coercion("bool", text))
        }
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_bool()
            .map(|b| b.to_string())
            .ok_or_else(|| type_mismatch("bool", "bool", value))
    }
}

struct PathResolver;

impl Resolve for PathResolver {
    fn tag(&self) -> &str {
        "str"
    }

    /// A leading `~` expands to the user's home directory; everything else
    /// is taken verbatim. `~user` forms are not expanded.
    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        let token = text.trim();
        if let Some(rest) = token.strip_prefix('~')
            && (rest.is_empty() || rest.starts_with('/'))
            && let Some(dirs) = BaseDirs::new()
        {
            let mut expanded = dirs.home_dir().to_string_lossy().into_owned();
            expanded.push_str(rest);
            return Ok(Value::Str(expanded));
        }
        Ok(Value::Str(token.to_string()))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch("path", "str", value))
    }
}

struct ChoiceResolver {
    choices: Vec<String>,
}

impl ChoiceResolver {
    fn check(&self, token: &str) -> Result<(), SettingsError> {
        if self.choices.iter().any(|c| c == token) {
            Ok(())
        } else {
            Err(SettingsError::Choice {
                value: token.to_string(),
                choices: self.choices.clone(),
            })
        }
    }
}

impl Resolve for ChoiceResolver {
    fn tag(&self) -> &str {
        "str"
    }

    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        let token = text.trim();
        self.check(token)?;
        Ok(Value::Str(token.to_string()))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| type_mismatch("choice", "str", value))
    }

    fn validate(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        match value.as_str() {
            Some(s) => self.check(s),
            None => Err(type_mismatch(key, "str", value)),
        }
    }
}

struct ListResolver {
    element: Box<dyn Resolve>,
}

impl Resolve for ListResolver {
    fn tag(&self) -> &str {
        "list"
    }

    /// The textual form is a JSON array of the elements' textual forms.
    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        let raw: Vec<String> =
            serde_json::from_str(text.trim()).map_err(|_| coercion("list", text))?;
        let items = raw
            .iter()
            .map(|item| self.element.parse(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::List(items))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        let items = value
            .as_list()
            .ok_or_else(|| type_mismatch("list", "list", value))?;
        let raw = items
            .iter()
            .map(|item| self.element.render(item))
            .collect::<Result<Vec<_>, _>>()?;
        serde_json::to_string(&raw).map_err(|e| SettingsError::InvalidValue {
            key: "list".into(),
            reason: e.to_string(),
        })
    }

    fn validate(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        let items = value
            .as_list()
            .ok_or_else(|| type_mismatch(key, "list", value))?;
        for item in items {
            self.element.validate(key, item)?;
        }
        Ok(())
    }
}

struct TupleResolver {
    elements: Vec<Box<dyn Resolve>>,
}

impl Resolve for TupleResolver {
    fn tag(&self) -> &str {
        "tuple"
    }

    /// Comma-delimited positional form: `host, 5432, true`. The comma is
    /// the delimiter, so string elements cannot themselves contain one.
    fn parse(&self, text: &str) -> Result<Value, SettingsError> {
        let parts: Vec<&str> = text.split(',').map(str::trim).collect();
        if parts.len() != self.elements.len() {
            return Err(coercion("tuple", text));
        }
        let items = parts
            .iter()
            .zip(&self.elements)
            .map(|(part, resolver)| resolver.parse(part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::Tuple(items))
    }

    fn render(&self, value: &Value) -> Result<String, SettingsError> {
        let items = value
            .as_tuple()
            .ok_or_else(|| type_mismatch("tuple", "tuple", value))?;
        if items.len() != self.elements.len() {
            return Err(SettingsError::InvalidValue {
                key: "tuple".into(),
                reason: format!("expected {} elements, got {}", self.elements.len(), items.len()),
            });
        }
        let parts = items
            .iter()
            .zip(&self.elements)
            .map(|(item, resolver)| resolver.render(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(parts.join(", "))
    }

    fn validate(&self, key: &str, value: &Value) -> Result<(), SettingsError> {
        let items = value
            .as_tuple()
            .ok_or_else(|| type_mismatch(key, "tuple", value))?;
        if items.len() != self.elements.len() {
            return Err(SettingsError::InvalidValue {
                key: key.to_string(),
                reason: format!("expected {} elements, got {}", self.elements.len(), items.len()),
            });
        }
        for (item, resolver) in items.iter().zip(&self.elements) {
            resolver.validate(key, item)?;
        }
        Ok(())
    }
}
