//! Lazy-call descriptors
//!
//! A `LazyCall` represents "invoke this target with these keyword
//! arguments" without invoking anything. Descriptors are plain data: they
//! nest, serialize, and stay mutable until instantiation.

use indexmap::IndexMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::instance::Factory;
use crate::value::Value;

/// Reserved mapping key marking a lazy call in textual form
pub const TARGET_KEY: &str = "_target_";

/// The target of a lazy call: a deferred dotted name, an already-resolved
/// callable, or another lazy call whose result will be invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    /// A stable dotted identity, resolved against the registry at
    /// instantiate time
    Name(String),
    /// An already-resolved callable
    Callable(Factory),
    /// A nested call; its instantiation result becomes the callable
    Call(Box<LazyCall>),
}

impl Target {
    /// The stable identity of this target, if it has one
    pub fn name(&self) -> Option<&str> {
        match self {
            Target::Name(n) => Some(n),
            Target::Callable(f) => f.name(),
            Target::Call(_) => None,
        }
    }
}

/// Validate a dotted target name: one or more `.`-separated identifier
/// segments. Leading-dot (relative) names are rejected with a dedicated
/// error so loaders surface them distinctly.
pub(crate) fn validate_target_name(name: &str) -> Result<()> {
    if name.starts_with('.') {
        return Err(Error::relative_target(name));
    }
    if name.is_empty() {
        return Err(Error::construction("target name is empty"));
    }
    for segment in name.split('.') {
        let mut chars = segment.chars();
        let valid = match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !valid {
            return Err(Error::construction(format!(
                "invalid segment '{}' in target name '{}'",
                segment, name
            )));
        }
    }
    Ok(())
}

impl TryFrom<&str> for Target {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        validate_target_name(name)?;
        Ok(Target::Name(name.to_string()))
    }
}

impl TryFrom<String> for Target {
    type Error = Error;

    fn try_from(name: String) -> Result<Self> {
        validate_target_name(&name)?;
        Ok(Target::Name(name))
    }
}

impl TryFrom<Factory> for Target {
    type Error = Error;

    fn try_from(factory: Factory) -> Result<Self> {
        Ok(Target::Callable(factory))
    }
}

impl TryFrom<LazyCall> for Target {
    type Error = Error;

    fn try_from(call: LazyCall) -> Result<Self> {
        Ok(Target::Call(Box::new(call)))
    }
}

impl TryFrom<Value> for Target {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Target::try_from(s),
            Value::Call(c) => Ok(Target::Call(Box::new(c))),
            other => Err(Error::construction(format!(
                "target must be a callable, a dotted name, or a lazy call; got {}",
                other.type_name()
            ))),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Name(n) => write!(f, "{}", n),
            Target::Callable(factory) => match factory.name() {
                Some(n) => write!(f, "{}", n),
                None => write!(f, "<callable>"),
            },
            Target::Call(call) => write!(f, "{}", call),
        }
    }
}

/// A deferred, serializable call: target plus keyword arguments.
///
/// Argument values may themselves be lazy calls, containers, or scalars,
/// with unbounded nesting. The target is never a container.
#[derive(Debug, Clone, PartialEq)]
pub struct LazyCall {
    target: Target,
    args: IndexMap<String, Value>,
}

impl LazyCall {
    pub(crate) fn new(target: Target, args: IndexMap<String, Value>) -> Self {
        Self { target, args }
    }

    /// Build a descriptor from a `_target_`-tagged mapping.
    ///
    /// All keys except `_target_` become arguments; nested tagged mappings
    /// become nested descriptors.
    pub fn from_mapping(map: &IndexMap<String, Value>) -> Result<Self> {
        let target_value = map
            .get(TARGET_KEY)
            .ok_or_else(|| Error::construction("mapping has no _target_ key"))?;

        let target = match target_value {
            Value::Mapping(inner) if inner.contains_key(TARGET_KEY) => {
                Target::Call(Box::new(LazyCall::from_mapping(inner)?))
            }
            other => Target::try_from(other.clone())?,
        };

        let mut args = IndexMap::new();
        for (key, value) in map {
            if key == TARGET_KEY {
                continue;
            }
            args.insert(key.clone(), value.clone());
        }

        Ok(Self { target, args })
    }

    /// The call's target
    pub fn target(&self) -> &Target {
        &self.target
    }

    pub(crate) fn target_mut(&mut self) -> &mut Target {
        &mut self.target
    }

    /// Replace the target (including with another lazy call)
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    /// Get an argument value by name
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.args.get(name)
    }

    /// Get a mutable argument value by name
    pub fn arg_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.args.get_mut(name)
    }

    /// Set an argument value, rejecting the reserved target key
    pub fn set_arg(&mut self, name: &str, value: Value) -> Result<()> {
        if name == TARGET_KEY {
            return Err(Error::construction(format!(
                "'{}' is reserved and cannot be used as an argument name",
                TARGET_KEY
            )));
        }
        self.args.insert(name.to_string(), value);
        Ok(())
    }

    /// Remove and return an argument
    pub fn remove_arg(&mut self, name: &str) -> Option<Value> {
        self.args.shift_remove(name)
    }

    /// The call's arguments, in insertion order
    pub fn args(&self) -> &IndexMap<String, Value> {
        &self.args
    }
}

impl fmt::Display for LazyCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.target)?;
        for (i, (k, v)) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", k, v)?;
        }
        write!(f, ")")
    }
}

/// A callable-wrapping builder: validates its target eagerly, then mints
/// fresh descriptors on each `call`.
///
/// Validation is fail-fast: an invalid target errors here, at authoring
/// time, never later at instantiate time.
#[derive(Debug, Clone)]
pub struct LazyBuilder {
    target: Target,
}

impl LazyBuilder {
    /// Wrap a target, failing immediately if it is not callable-like
    pub fn new<T>(target: T) -> Result<Self>
    where
        T: TryInto<Target, Error = Error>,
    {
        Ok(Self {
            target: target.try_into()?,
        })
    }

    /// The wrapped target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Produce a new descriptor with the wrapped target and the given
    /// keyword arguments. Argument values are stored as-is, unresolved.
    pub fn call<K, I>(&self, args: I) -> LazyCall
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut collected = IndexMap::new();
        for (k, v) in args {
            let k = k.into();
            if k == TARGET_KEY {
                log::warn!("ignoring reserved argument name '{}'", TARGET_KEY);
                continue;
            }
            collected.insert(k, v);
        }
        LazyCall {
            target: self.target.clone(),
            args: collected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RegistryErrorKind};
    use crate::instance::{Factory, Instance};

    #[test]
    fn test_builder_with_name() {
        let builder = LazyBuilder::new("iter.counter").unwrap();
        let call = builder.call([("x", Value::Integer(3))]);

        assert_eq!(call.target().name(), Some("iter.counter"));
        assert_eq!(call.arg("x").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_builder_with_factory() {
        let factory = Factory::named("test.widget", |_| Ok(Instance::Value(Value::Null)));
        let builder = LazyBuilder::new(factory).unwrap();
        let call = builder.call([("size", Value::Integer(1))]);

        assert!(matches!(call.target(), Target::Callable(_)));
    }

    #[test]
    fn test_builder_rejects_non_callable_value() {
        // The bad-target scenario: an integer literal fails at build time
        let err = LazyBuilder::new(Value::Integer(3)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Construction);

        assert!(LazyBuilder::new(Value::Bool(true)).is_err());
        assert!(LazyBuilder::new(Value::Sequence(vec![])).is_err());
    }

    #[test]
    fn test_builder_rejects_malformed_names() {
        assert!(LazyBuilder::new("").is_err());
        assert!(LazyBuilder::new("has space").is_err());
        assert!(LazyBuilder::new("double..dot").is_err());
        assert!(LazyBuilder::new("9starts.with.digit").is_err());
        assert!(LazyBuilder::new("trailing.").is_err());
    }

    #[test]
    fn test_relative_name_rejected_distinctly() {
        let err = LazyBuilder::new(".dir1.counter").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Registry(RegistryErrorKind::RelativeTarget { .. })
        ));
    }

    #[test]
    fn test_nested_call_as_target() {
        let inner = LazyBuilder::new("test.widget")
            .unwrap()
            .call([("int_arg", Value::Integer(3))]);
        let outer = LazyBuilder::new(inner)
            .unwrap()
            .call([("call_arg", Value::Integer(4))]);

        assert!(matches!(outer.target(), Target::Call(_)));
        assert_eq!(outer.target().name(), None);
    }

    #[test]
    fn test_set_arg_rejects_reserved_key() {
        let mut call = LazyBuilder::new("iter.counter").unwrap().call::<&str, _>([]);
        let err = call.set_arg(TARGET_KEY, Value::Integer(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Construction);
    }

    #[test]
    fn test_mutation_until_instantiation() {
        let mut call = LazyBuilder::new("iter.counter")
            .unwrap()
            .call([("x", Value::Integer(1))]);

        call.set_arg("x", Value::String("replaced".into())).unwrap();
        assert_eq!(call.arg("x").unwrap().as_str(), Some("replaced"));

        let retarget = LazyBuilder::new("iter.other").unwrap().call::<&str, _>([]);
        call.set_target(Target::Call(Box::new(retarget)));
        assert!(matches!(call.target(), Target::Call(_)));
    }

    #[test]
    fn test_from_mapping() {
        let mut inner = IndexMap::new();
        inner.insert(TARGET_KEY.into(), Value::String("test.widget".into()));
        inner.insert("int_arg".into(), Value::Integer(3));

        let mut outer = IndexMap::new();
        outer.insert(TARGET_KEY.into(), Value::Mapping(inner));
        outer.insert("call_arg".into(), Value::Integer(4));

        let call = LazyCall::from_mapping(&outer).unwrap();
        match call.target() {
            Target::Call(nested) => {
                assert_eq!(nested.target().name(), Some("test.widget"));
                assert_eq!(nested.arg("int_arg").unwrap().as_i64(), Some(3));
            }
            other => panic!("expected nested call target, got {:?}", other),
        }
        assert_eq!(call.arg("call_arg").unwrap().as_i64(), Some(4));
    }

    #[test]
    fn test_from_mapping_bad_target() {
        let mut map = IndexMap::new();
        map.insert(TARGET_KEY.into(), Value::Integer(3));

        let err = LazyCall::from_mapping(&map).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Construction);
    }

    #[test]
    fn test_display() {
        let call = LazyBuilder::new("iter.counter")
            .unwrap()
            .call([("x", Value::Integer(3)), ("y", Value::String("s".into()))]);
        assert_eq!(format!("{}", call), "iter.counter(x=3, y=s)");
    }
}
