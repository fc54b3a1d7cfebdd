//! Main Config type for lazyconf
//!
//! The Config type is the primary interface for loading, mutating, and
//! resolving configuration stores. Values stay raw (interpolations
//! unresolved, lazy calls deferred) until read through `get` or handed to
//! `instantiate`, so a store can be freely edited after loading and every
//! read reflects the current state.

use std::path::Path;

use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::interpolation::{self, Interpolation};
use crate::lazy::{LazyCall, Target, TARGET_KEY};
use crate::registry::FactoryRegistry;
use crate::serialize;
use crate::value::Value;

/// A configuration store with deferred interpolation and lazy calls
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    root: Value,
}

impl Config {
    /// Create a new Config from a Value
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(Self::new(serialize::from_yaml_str(yaml)?))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serialize::from_json_str(json)?))
    }

    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(serialize::load(path)?))
    }

    /// Load and merge multiple YAML files
    ///
    /// Files are merged in order, with later files overriding earlier ones:
    /// mappings deep-merge, scalars and sequences use last-writer-wins,
    /// null values remove keys.
    pub fn load_merged<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut merged: Option<Value> = None;

        for path in paths {
            let value = serialize::load(path)?;
            match &mut merged {
                Some(base) => base.merge(value),
                None => merged = Some(value),
            }
        }

        Ok(Self::new(
            merged.unwrap_or_else(|| Value::Mapping(indexmap::IndexMap::new())),
        ))
    }

    /// Write the store to a YAML file.
    ///
    /// Interpolations and lazy calls are written in their deferred form, so
    /// loading the file back gives an equivalent store.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        serialize::save(&self.root, path)
    }

    /// The raw root value
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Consume the Config, returning the raw root value
    pub fn into_value(self) -> Value {
        self.root
    }

    /// Get the raw (unresolved) value at a path
    pub fn get_raw(&self, path: &str) -> Result<&Value> {
        self.root.get_path(path)
    }

    /// Get a resolved value at a path.
    ///
    /// Interpolation expressions are resolved against the current store on
    /// every call, so mutations made after loading are always visible. Lazy
    /// calls stay deferred; only their arguments resolve.
    pub fn get(&self, path: &str) -> Result<Value> {
        let raw = self.root.get_path(path)?;
        let mut resolution_stack = Vec::new();
        self.resolve_value(raw, path, &mut resolution_stack)
    }

    /// Get a resolved string value, with type coercion if needed
    pub fn get_string(&self, path: &str) -> Result<String> {
        let value = self.get(path)?;
        match value {
            Value::String(s) => Ok(s),
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Null => Ok("null".to_string()),
            _ => Err(Error::type_coercion(path, "string", value.type_name())),
        }
    }

    /// Get a resolved integer value, with type coercion if needed
    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.get(path)?;
        match value {
            Value::Integer(i) => Ok(i),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "integer", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "integer", value.type_name())),
        }
    }

    /// Get a resolved float value, with type coercion if needed
    pub fn get_f64(&self, path: &str) -> Result<f64> {
        let value = self.get(path)?;
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            Value::String(s) => s
                .parse()
                .map_err(|_| Error::type_coercion(path, "float", format!("string (\"{}\")", s))),
            _ => Err(Error::type_coercion(path, "float", value.type_name())),
        }
    }

    /// Get a resolved boolean value, with strict coercion: only the strings
    /// "true" and "false" coerce
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.get(path)?;
        match value {
            Value::Bool(b) => Ok(b),
            Value::String(s) => match s.to_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::type_coercion(
                    path,
                    "boolean",
                    format!("string (\"{}\") - only \"true\" or \"false\" allowed", s),
                )),
            },
            _ => Err(Error::type_coercion(path, "boolean", value.type_name())),
        }
    }

    /// Set a value at a path.
    ///
    /// Non-final segments must already exist; only the final segment is
    /// created. Setting `_target_` on a lazy call re-targets it.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> Result<()> {
        self.root.set_path(path, value.into())
    }

    /// Remove and return a top-level key
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        self.root.pop(key)
    }

    /// Merge another config into this one
    pub fn merge(&mut self, other: Config) {
        self.root.merge(other.root);
    }

    /// Apply a batch of `path=literal` override strings in listed order
    pub fn apply_overrides<S: AsRef<str>>(&mut self, overrides: &[S]) -> Result<()> {
        crate::overrides::apply_overrides(&mut self.root, overrides)
    }

    /// Resolve the whole store to a new value tree.
    ///
    /// Every interpolation is substituted; lazy calls remain deferred with
    /// resolved arguments.
    pub fn resolve(&self) -> Result<Value> {
        let mut resolution_stack = Vec::new();
        self.resolve_value(&self.root, "", &mut resolution_stack)
    }

    /// Export the store as YAML, optionally resolving interpolations first
    pub fn to_yaml(&self, resolve: bool) -> Result<String> {
        if resolve {
            serialize::to_yaml(&self.resolve()?)
        } else {
            serialize::to_yaml(&self.root)
        }
    }

    /// Export the store as JSON, optionally resolving interpolations first
    pub fn to_json(&self, resolve: bool) -> Result<String> {
        if resolve {
            serialize::to_json(&self.resolve()?)
        } else {
            serialize::to_json(&self.root)
        }
    }

    /// Render the raw store as assignment-statement source text
    pub fn to_source(&self) -> Result<String> {
        serialize::to_source(&self.root)
    }

    /// Resolve the value at a path and instantiate it against the global
    /// factory registry
    pub fn instantiate(&self, path: &str) -> Result<Instance> {
        let resolved = self.get(path)?;
        crate::instantiate::instantiate_global(&resolved)
    }

    /// Resolve the value at a path and instantiate it against an explicit
    /// factory registry
    pub fn instantiate_with(&self, path: &str, registry: &FactoryRegistry) -> Result<Instance> {
        let resolved = self.get(path)?;
        crate::instantiate::instantiate(&resolved, registry)
    }

    /// Resolve a single value, recursing into containers and call arguments
    fn resolve_value(
        &self,
        value: &Value,
        path: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<Value> {
        match value {
            Value::String(s) => {
                if interpolation::needs_processing(s) {
                    let parsed = interpolation::parse(s)?;
                    self.resolve_interpolation(&parsed, path, resolution_stack)
                } else {
                    Ok(value.clone())
                }
            }
            Value::Sequence(seq) => {
                let mut resolved = Vec::with_capacity(seq.len());
                for (i, item) in seq.iter().enumerate() {
                    let item_path = format!("{}[{}]", path, i);
                    resolved.push(self.resolve_value(item, &item_path, resolution_stack)?);
                }
                Ok(Value::Sequence(resolved))
            }
            Value::Mapping(map) => {
                let mut resolved = indexmap::IndexMap::with_capacity(map.len());
                for (key, val) in map {
                    let key_path = join_path(path, key);
                    resolved.insert(
                        key.clone(),
                        self.resolve_value(val, &key_path, resolution_stack)?,
                    );
                }
                Ok(Value::Mapping(resolved))
            }
            Value::Call(call) => Ok(Value::Call(self.resolve_call(
                call,
                path,
                resolution_stack,
            )?)),
            _ => Ok(value.clone()),
        }
    }

    /// Resolve a lazy call's arguments (and nested lazy targets) without
    /// invoking it
    fn resolve_call(
        &self,
        call: &LazyCall,
        path: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<LazyCall> {
        let mut resolved = call.clone();

        if let Target::Call(inner) = call.target() {
            let target_path = join_path(path, TARGET_KEY);
            let inner = self.resolve_call(inner, &target_path, resolution_stack)?;
            resolved.set_target(Target::Call(Box::new(inner)));
        }

        for (name, arg) in call.args() {
            let arg_path = join_path(path, name);
            let value = self.resolve_value(arg, &arg_path, resolution_stack)?;
            resolved.set_arg(name, value)?;
        }

        Ok(resolved)
    }

    /// Resolve an interpolation expression
    fn resolve_interpolation(
        &self,
        interp: &Interpolation,
        path: &str,
        resolution_stack: &mut Vec<String>,
    ) -> Result<Value> {
        match interp {
            Interpolation::Literal(s) => Ok(Value::String(s.clone())),

            Interpolation::Reference {
                path: ref_path,
                relative,
            } => {
                let full_path = if *relative {
                    resolve_relative_path(path, ref_path)
                } else {
                    ref_path.clone()
                };

                // Check for circular reference using the resolution stack
                if resolution_stack.contains(&full_path) {
                    let mut chain = resolution_stack.clone();
                    chain.push(full_path.clone());
                    return Err(Error::circular_reference(path, chain));
                }

                let ref_value = self
                    .root
                    .get_path(&full_path)
                    .map_err(|e| e.with_help(format!("Referenced from '{}'", path)))?;

                resolution_stack.push(full_path.clone());
                let result = self.resolve_value(ref_value, &full_path, resolution_stack);
                resolution_stack.pop();

                result
            }

            Interpolation::Concat(parts) => {
                let mut result = String::new();

                for part in parts {
                    let resolved = self.resolve_interpolation(part, path, resolution_stack)?;
                    match resolved {
                        Value::String(s) => result.push_str(&s),
                        other => result.push_str(&other.to_string()),
                    }
                }

                Ok(Value::String(result))
            }
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Value::Mapping(indexmap::IndexMap::new()))
    }
}

/// Resolve a relative (leading-dot) reference against the current path.
///
/// One dot references a sibling, each additional dot goes one level up.
fn resolve_relative_path(current_path: &str, ref_path: &str) -> String {
    let mut ref_chars = ref_path.chars().peekable();
    let mut levels_up = 0;

    while ref_chars.peek() == Some(&'.') {
        ref_chars.next();
        levels_up += 1;
    }

    let remaining: String = ref_chars.collect();

    if levels_up == 0 {
        return ref_path.to_string();
    }

    let mut segments: Vec<&str> = current_path.split('.').collect();
    for _ in 0..levels_up {
        segments.pop();
    }

    if remaining.is_empty() {
        segments.join(".")
    } else if segments.is_empty() {
        remaining
    } else {
        format!("{}.{}", segments.join("."), remaining)
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::instance::{Args, Instance};

    const BASE_YAML: &str = r#"
dir1a_dict:
  a: base
  b: 2
dir1b_dict:
  a: 1
  b: 2
lazyobj:
  _target_: iter.counter
  x: base_a_${dir1b_dict.a}
  y: ${.x}_from_b
"#;

    #[test]
    fn test_load_yaml() {
        let yaml = r#"
database:
  host: localhost
  port: 5432
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(
            config.get("database.host").unwrap().as_str(),
            Some("localhost")
        );
        assert_eq!(config.get("database.port").unwrap().as_i64(), Some(5432));
    }

    #[test]
    fn test_reference_resolves_through_call_args() {
        let config = Config::from_yaml(BASE_YAML).unwrap();

        assert_eq!(
            config.get("lazyobj.x").unwrap().as_str(),
            Some("base_a_1")
        );
        // Relative sibling reference within the same call's arguments
        assert_eq!(
            config.get("lazyobj.y").unwrap().as_str(),
            Some("base_a_1_from_b")
        );
    }

    #[test]
    fn test_whole_string_reference_keeps_type() {
        let yaml = r#"
database:
  port: 5432
port_alias: ${database.port}
port_text: "port-${database.port}"
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.get("port_alias").unwrap().as_i64(), Some(5432));
        assert_eq!(config.get("port_text").unwrap().as_str(), Some("port-5432"));
    }

    #[test]
    fn test_mutation_propagates_to_later_reads() {
        let mut config = Config::from_yaml(BASE_YAML).unwrap();

        config.set("dir1b_dict.a", 9).unwrap();
        assert_eq!(
            config.get("lazyobj.x").unwrap().as_str(),
            Some("base_a_9")
        );
        assert_eq!(
            config.get("lazyobj.y").unwrap().as_str(),
            Some("base_a_9_from_b")
        );
    }

    #[test]
    fn test_get_raw_keeps_expression() {
        let config = Config::from_yaml(BASE_YAML).unwrap();

        assert_eq!(
            config.get_raw("lazyobj.x").unwrap().as_str(),
            Some("base_a_${dir1b_dict.a}")
        );
    }

    #[test]
    fn test_escaped_interpolation_is_literal() {
        let config = Config::from_yaml(r"text: '\${not.a.ref}'").unwrap();
        assert_eq!(config.get("text").unwrap().as_str(), Some("${not.a.ref}"));
    }

    #[test]
    fn test_circular_reference_detected() {
        let yaml = r#"
a: ${b}
b: ${a}
"#;
        let config = Config::from_yaml(yaml).unwrap();

        let err = config.get("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CircularReference);
    }

    #[test]
    fn test_self_reference_detected() {
        let config = Config::from_yaml("a: ${a}\n").unwrap();
        let err = config.get("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::CircularReference);
    }

    #[test]
    fn test_missing_reference_names_referrer() {
        let config = Config::from_yaml("a: ${no.such.path}\n").unwrap();

        let err = config.get("a").unwrap_err();
        assert_eq!(err.kind, ErrorKind::PathNotFound);
        assert!(err.help.unwrap().contains("'a'"));
    }

    #[test]
    fn test_resolve_keeps_calls_deferred() {
        let config = Config::from_yaml(BASE_YAML).unwrap();

        let resolved = config.resolve().unwrap();
        let call = resolved.get_path("lazyobj").unwrap().as_call().unwrap();
        assert_eq!(call.target().name(), Some("iter.counter"));
        assert_eq!(call.arg("x").unwrap().as_str(), Some("base_a_1"));
    }

    #[test]
    fn test_type_coercions() {
        let yaml = r#"
count: "42"
ratio: 3
flag: "true"
name: 7
"#;
        let config = Config::from_yaml(yaml).unwrap();

        assert_eq!(config.get_i64("count").unwrap(), 42);
        assert_eq!(config.get_f64("ratio").unwrap(), 3.0);
        assert!(config.get_bool("flag").unwrap());
        assert_eq!(config.get_string("name").unwrap(), "7");

        let err = config.get_bool("count").unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeCoercion);
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::from_yaml(BASE_YAML).unwrap();
        config
            .apply_overrides(&["lazyobj.x=123", "dir1a_dict.a=\"123\""])
            .unwrap();

        assert_eq!(config.get("lazyobj.x").unwrap().as_i64(), Some(123));
        assert_eq!(config.get("dir1a_dict.a").unwrap().as_str(), Some("123"));
    }

    #[test]
    fn test_merge_configs() {
        let mut base = Config::from_yaml(BASE_YAML).unwrap();
        let overlay = Config::from_yaml("dir1b_dict:\n  a: 5\n").unwrap();

        base.merge(overlay);
        assert_eq!(config_x(&base), "base_a_5");
        assert_eq!(base.get("dir1b_dict.b").unwrap().as_i64(), Some(2));
    }

    fn config_x(config: &Config) -> String {
        config.get_string("lazyobj.x").unwrap()
    }

    #[test]
    fn test_pop_removes_key() {
        let mut config = Config::from_yaml(BASE_YAML).unwrap();

        assert!(config.pop("dir1a_dict").is_some());
        assert!(config.get("dir1a_dict").is_err());
        assert!(config.pop("dir1a_dict").is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let original = Config::from_yaml(BASE_YAML).unwrap();
        original.save(&path).unwrap();
        let reloaded = Config::load(&path).unwrap();

        assert_eq!(original, reloaded);
        // Expressions survive the round trip unresolved
        assert_eq!(
            reloaded.get_raw("lazyobj.x").unwrap().as_str(),
            Some("base_a_${dir1b_dict.a}")
        );
        assert_eq!(reloaded.get("lazyobj.x").unwrap().as_str(), Some("base_a_1"));
    }

    #[test]
    fn test_loaded_copy_is_independent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let original = Config::from_yaml(BASE_YAML).unwrap();
        original.save(&path).unwrap();

        let mut reloaded = Config::load(&path).unwrap();
        reloaded.set("dir1b_dict.a", 99).unwrap();

        assert_eq!(original.get("lazyobj.x").unwrap().as_str(), Some("base_a_1"));
        assert_eq!(
            reloaded.get("lazyobj.x").unwrap().as_str(),
            Some("base_a_99")
        );
    }

    #[test]
    fn test_load_merged_files() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.yaml");
        let overlay_path = dir.path().join("overlay.yaml");

        std::fs::write(&base_path, BASE_YAML).unwrap();
        std::fs::write(&overlay_path, "dir1b_dict:\n  a: 7\n").unwrap();

        let config = Config::load_merged(&[&base_path, &overlay_path]).unwrap();
        assert_eq!(config.get("lazyobj.x").unwrap().as_str(), Some("base_a_7"));
    }

    #[test]
    fn test_instantiate_with_resolved_arguments() {
        fn counter_factory(args: Args) -> crate::error::Result<Instance> {
            let x = args
                .get("x")
                .and_then(Instance::as_str)
                .ok_or_else(|| Error::instantiation("counter requires x", None))?;
            Ok(Instance::Value(Value::String(format!("counted:{}", x))))
        }

        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", counter_factory).unwrap();

        let config = Config::from_yaml(BASE_YAML).unwrap();
        let instance = config.instantiate_with("lazyobj", &registry).unwrap();
        assert_eq!(instance.as_str(), Some("counted:base_a_1"));
    }

    #[test]
    fn test_retarget_then_instantiate() {
        fn one(_: Args) -> crate::error::Result<Instance> {
            Ok(Instance::Value(Value::Integer(1)))
        }
        fn two(_: Args) -> crate::error::Result<Instance> {
            Ok(Instance::Value(Value::Integer(2)))
        }

        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", one).unwrap();
        registry.register("iter.other", two).unwrap();

        let mut config = Config::from_yaml(BASE_YAML).unwrap();
        assert_eq!(
            config
                .instantiate_with("lazyobj", &registry)
                .unwrap()
                .as_i64(),
            Some(1)
        );

        config.set("lazyobj._target_", "iter.other").unwrap();
        assert_eq!(
            config
                .instantiate_with("lazyobj", &registry)
                .unwrap()
                .as_i64(),
            Some(2)
        );
    }

    #[test]
    fn test_to_source_renders_resolved_paths() {
        let config = Config::from_yaml("a:\n  b: 1\n").unwrap();
        assert_eq!(config.to_source().unwrap(), "cfg.a.b = 1\n");
    }
}
