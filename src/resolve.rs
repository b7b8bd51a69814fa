//! Layered value resolution.
//!
//! Every lookup walks the precedence chain from scratch: command-line
//! options, then the user file, then runtime overrides, then environment
//! variables, then attached config files in attach order, then the schema
//! default. Textual hits are interpolated and parsed; typed hits are taken
//! as-is (string values still get interpolated). Nothing is memoized, so a
//! layer change is visible on the next lookup.

use std::collections::HashMap;

use crate::env::EnvSource;
use crate::error::SettingsError;
use crate::interpolate;
use crate::options::OptionsSource;
use crate::resolver::Registry;
use crate::schema::{canon, OptionDecl, Schema};
use crate::store::ConfigDoc;
use crate::value::Value;

/// Borrowed view of all layers, assembled per lookup by the facade.
pub(crate) struct Chain<'a> {
    pub schema: &'a Schema,
    pub registry: &'a Registry,
    pub options: Option<&'a OptionsSource>,
    pub userfile: Option<&'a ConfigDoc>,
    pub nosave: &'a HashMap<String, Value>,
    pub env: Option<&'a EnvSource>,
    pub files: &'a [ConfigDoc],
}

enum Hit<'a> {
    Typed(&'a Value),
    Raw(&'a str),
}

impl Chain<'_> {
    pub fn resolve(&self, key: &str) -> Result<Value, SettingsError> {
        self.resolve_inner(key, &mut Vec::new())
    }

    fn resolve_inner(&self, key: &str, visited: &mut Vec<String>) -> Result<Value, SettingsError> {
        let key = canon(key);
        let decl = self
            .schema
            .find(&key)
            .ok_or_else(|| SettingsError::UnknownSetting(key.clone()))?;
        if visited.contains(&key) {
            let mut path = visited.join(" -> ");
            path.push_str(" -> ");
            path.push_str(&key);
            return Err(SettingsError::InterpolationCycle { path });
        }
        visited.push(key.clone());
        let result = match self.hit(&key, decl) {
            Hit::Raw(text) => {
                let expanded = self.expand(text, visited)?;
                self.registry.resolve(&decl.resolver)?.parse(&expanded)
            }
            Hit::Typed(value) => {
                let interpolated = match value {
                    Value::Str(s) if interpolate::has_placeholder(s) => {
                        self.expand(s, visited).map(Value::Str)
                    }
                    other => Ok(other.clone()),
                };
                interpolated.and_then(|v| self.coerce_typed(&key, decl, v))
            }
        };
        visited.pop();
        result
    }

    /// Typed hits still honor the declaration: the value must pass the
    /// resolver's validation, and a textual value for a non-string
    /// declaration is coerced through `parse` like any file hit. Options
    /// and defaults are never validated at write time, so this is where
    /// a mismatched options field or an out-of-choices default surfaces.
    fn coerce_typed(
        &self,
        key: &str,
        decl: &OptionDecl,
        value: Value,
    ) -> Result<Value, SettingsError> {
        let handle = self.registry.resolve(&decl.resolver)?;
        match handle.validate(key, &value) {
            Ok(()) => Ok(value),
            Err(err) => match &value {
                Value::Str(text) if handle.tag() != "str" => handle.parse(text),
                _ => Err(err),
            },
        }
    }

    /// First layer that answers for `key`, highest precedence first.
    fn hit<'a>(&'a self, key: &str, decl: &'a OptionDecl) -> Hit<'a> {
        if let Some(v) = self.options.and_then(|o| o.get(key)) {
            return Hit::Typed(v);
        }
        if let Some(raw) = self.userfile.and_then(|doc| doc.get(key)) {
            return Hit::Raw(raw);
        }
        if let Some(v) = self.nosave.get(key) {
            return Hit::Typed(v);
        }
        if let Some(raw) = self.env.and_then(|e| e.get(key)) {
            return Hit::Raw(raw);
        }
        for doc in self.files {
            if let Some(raw) = doc.get(key) {
                return Hit::Raw(raw);
            }
        }
        Hit::Typed(&decl.default)
    }

    fn expand(&self, text: &str, visited: &mut Vec<String>) -> Result<String, SettingsError> {
        interpolate::expand(text, |other| {
            Ok(self.resolve_inner(other, visited)?.to_text())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Decl;
    use std::path::Path;

    struct Layers {
        schema: Schema,
        registry: Registry,
        options: Option<OptionsSource>,
        userfile: Option<ConfigDoc>,
        nosave: HashMap<String, Value>,
        env: Option<EnvSource>,
        files: Vec<ConfigDoc>,
    }

    impl Layers {
        fn new(schema: Schema) -> Self {
            Self {
                schema,
                registry: Registry::with_builtins(),
                options: None,
                userfile: None,
                nosave: HashMap::new(),
                env: None,
                files: Vec::new(),
            }
        }

        fn chain(&self) -> Chain<'_> {
            Chain {
                schema: &self.schema,
                registry: &self.registry,
                options: self.options.as_ref(),
                userfile: self.userfile.as_ref(),
                nosave: &self.nosave,
                env: self.env.as_ref(),
                files: &self.files,
            }
        }
    }

    fn schema() -> Schema {
        let mut s = Schema::new();
        s.declare(Decl::new("HOST", "localhost")).unwrap();
        s.declare(Decl::new("PORT", 1257)).unwrap();
        s.declare(Decl::new("GREETING", "hello {HOST}")).unwrap();
        s
    }

    fn doc(text: &str) -> ConfigDoc {
        ConfigDoc::parse(text, Path::new("layer.conf")).unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> EnvSource {
        EnvSource::from_pairs(
            "APP_",
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }

    #[test]
    fn default_when_no_layer_answers() {
        let layers = Layers::new(schema());
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(1257));
    }

    #[test]
    fn each_layer_beats_the_ones_below() {
        let mut layers = Layers::new(schema());

        layers.files.push(doc("PORT = 7000\n"));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(7000));

        layers.env = Some(env(&[("APP_PORT", "9000")]));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(9000));

        layers.nosave.insert("PORT".into(), Value::Int(8500));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(8500));

        layers.userfile = Some(doc("PORT = 8080\n"));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(8080));

        #[derive(serde::Serialize)]
        struct Opts {
            port: u16,
        }
        layers.options = Some(OptionsSource::from_args(&Opts { port: 6000 }).unwrap());
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(6000));
    }

    #[test]
    fn attached_files_resolve_in_attach_order() {
        let mut layers = Layers::new(schema());
        layers.files.push(doc("HOST = first\n"));
        layers.files.push(doc("HOST = second\nPORT = 7000\n"));
        assert_eq!(layers.chain().resolve("HOST").unwrap(), Value::from("first"));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(7000));
    }

    #[test]
    fn raw_hits_are_interpolated_before_parsing() {
        let mut layers = Layers::new(schema());
        layers.env = Some(env(&[("APP_PORT", "{HOST}"), ("APP_HOST", "80")]));
        // PORT's env text expands to "80", then the int resolver parses it.
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(80));
    }

    #[test]
    fn typed_string_defaults_are_interpolated() {
        let mut layers = Layers::new(schema());
        layers.userfile = Some(doc("HOST = example.com\n"));
        assert_eq!(
            layers.chain().resolve("GREETING").unwrap(),
            Value::from("hello example.com")
        );
    }

    #[test]
    fn typed_non_string_hits_skip_interpolation() {
        let mut layers = Layers::new(schema());
        layers.nosave.insert("PORT".into(), Value::Int(99));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(99));
    }

    #[test]
    fn interpolation_spans_layers() {
        let mut layers = Layers::new(schema());
        layers.files.push(doc("GREETING = hi {HOST}:{PORT}\n"));
        layers.env = Some(env(&[("APP_HOST", "web")]));
        assert_eq!(
            layers.chain().resolve("GREETING").unwrap(),
            Value::from("hi web:1257")
        );
    }

    #[test]
    fn textual_options_value_is_coerced_to_declared_type() {
        #[derive(serde::Serialize)]
        struct Opts {
            port: String,
        }
        let mut layers = Layers::new(schema());
        layers.options = Some(
            OptionsSource::from_args(&Opts {
                port: "7000".into(),
            })
            .unwrap(),
        );
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(7000));
    }

    #[test]
    fn options_value_failing_choice_validation_errors() {
        #[derive(serde::Serialize)]
        struct Opts {
            mode: String,
        }
        let mut s = schema();
        s.declare(Decl::new("MODE", "fast").choices(&["fast", "slow"]))
            .unwrap();
        let mut layers = Layers::new(s);
        layers.options = Some(
            OptionsSource::from_args(&Opts {
                mode: "sideways".into(),
            })
            .unwrap(),
        );
        assert!(matches!(
            layers.chain().resolve("MODE"),
            Err(SettingsError::Choice { .. })
        ));
    }

    #[test]
    fn mismatched_typed_hit_without_textual_form_errors() {
        let mut layers = Layers::new(schema());
        layers.nosave.insert("PORT".into(), Value::Bool(true));
        assert!(matches!(
            layers.chain().resolve("PORT"),
            Err(SettingsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn out_of_choices_default_errors_at_resolution() {
        let mut s = Schema::new();
        s.declare(Decl::new("MODE", "sideways").choices(&["fast", "slow"]))
            .unwrap();
        let layers = Layers::new(s);
        assert!(matches!(
            layers.chain().resolve("MODE"),
            Err(SettingsError::Choice { .. })
        ));
    }

    #[test]
    fn cycle_is_detected_and_reported() {
        let mut s = Schema::new();
        s.declare(Decl::new("A", "{B}")).unwrap();
        s.declare(Decl::new("B", "{A}")).unwrap();
        let layers = Layers::new(s);
        let err = layers.chain().resolve("A").unwrap_err();
        match err {
            SettingsError::InterpolationCycle { path } => {
                assert_eq!(path, "A -> B -> A");
            }
            other => panic!("expected InterpolationCycle, got {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let mut s = Schema::new();
        s.declare(Decl::new("A", "{A}")).unwrap();
        let layers = Layers::new(s);
        assert!(matches!(
            layers.chain().resolve("A"),
            Err(SettingsError::InterpolationCycle { .. })
        ));
    }

    #[test]
    fn repeated_placeholder_is_not_a_cycle() {
        let mut s = Schema::new();
        s.declare(Decl::new("HOST", "h")).unwrap();
        s.declare(Decl::new("PAIR", "{HOST}:{HOST}")).unwrap();
        let layers = Layers::new(s);
        assert_eq!(layers.chain().resolve("PAIR").unwrap(), Value::from("h:h"));
    }

    #[test]
    fn undeclared_key_is_unknown_even_when_a_file_defines_it() {
        let mut layers = Layers::new(schema());
        layers.files.push(doc("EXTRA = 1\n"));
        assert!(matches!(
            layers.chain().resolve("EXTRA"),
            Err(SettingsError::UnknownSetting(k)) if k == "EXTRA"
        ));
    }

    #[test]
    fn interpolating_an_undeclared_key_errors() {
        let mut s = Schema::new();
        s.declare(Decl::new("A", "{NOPE}")).unwrap();
        let layers = Layers::new(s);
        assert!(matches!(
            layers.chain().resolve("A"),
            Err(SettingsError::UnknownSetting(_))
        ));
    }

    #[test]
    fn no_memoization_between_lookups() {
        let mut layers = Layers::new(schema());
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(1257));
        layers.nosave.insert("PORT".into(), Value::Int(2));
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(2));
        layers.nosave.remove("PORT");
        assert_eq!(layers.chain().resolve("PORT").unwrap(), Value::Int(1257));
    }
}
