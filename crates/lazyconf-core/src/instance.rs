//! Resolved values produced by instantiation
//!
//! `instantiate` turns configuration values into `Instance`s: plain data
//! passes through untouched, lazy calls become constructed objects or
//! further callables. Factories are the callable side of the registry.

use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::value::Value;

/// Keyword arguments passed to a factory, fully instantiated
pub type Args = IndexMap<String, Instance>;

/// A callable that constructs objects from keyword arguments.
///
/// A factory may carry a stable dotted identity (its registry name); only
/// named factories can be serialized back to text.
#[derive(Clone)]
pub struct Factory {
    name: Option<String>,
    func: Arc<dyn Fn(Args) -> Result<Instance> + Send + Sync>,
}

impl Factory {
    /// Create an anonymous factory
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: None,
            func: Arc::new(func),
        }
    }

    /// Create a factory with a stable dotted identity
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: Some(name.into()),
            func: Arc::new(func),
        }
    }

    /// Stamp an identity onto this factory (used at registration time)
    pub(crate) fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The stable identity, if this factory is registered/named
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Invoke the factory with instantiated keyword arguments
    pub fn invoke(&self, args: Args) -> Result<Instance> {
        (self.func)(args)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(n) => write!(f, "Factory({})", n),
            None => write!(f, "Factory(<anonymous>)"),
        }
    }
}

impl PartialEq for Factory {
    fn eq(&self, other: &Self) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => a == b,
            _ => Arc::ptr_eq(&self.func, &other.func),
        }
    }
}

/// A fully-resolved value: the output space of `instantiate`
#[derive(Debug, Clone)]
pub enum Instance {
    /// Plain configuration data, returned unchanged
    Value(Value),
    /// A sequence with each element instantiated
    Sequence(Vec<Instance>),
    /// A mapping with each value instantiated
    Mapping(IndexMap<String, Instance>),
    /// An opaque constructed object
    Object(Arc<dyn Any + Send + Sync>),
    /// A resolved callable (e.g. a target produced by another call)
    Callable(Factory),
}

impl Instance {
    /// Wrap an arbitrary constructed object
    pub fn object<T: Any + Send + Sync>(obj: T) -> Self {
        Instance::Object(Arc::new(obj))
    }

    /// Get the plain value if this instance is passthrough data
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Instance::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Get as i64 if this is an integer value
    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    /// Get as f64 if this is a numeric value
    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    /// Get as bool if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }

    /// Get as str if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    /// Get the instantiated elements if this is a sequence
    pub fn as_sequence(&self) -> Option<&[Instance]> {
        match self {
            Instance::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get the instantiated entries if this is a mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Instance>> {
        match self {
            Instance::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get the factory if this is a resolved callable
    pub fn as_callable(&self) -> Option<&Factory> {
        match self {
            Instance::Callable(f) => Some(f),
            _ => None,
        }
    }

    /// Downcast a constructed object to a concrete type
    pub fn downcast_ref<T: Any + Send + Sync>(&self) -> Option<&T> {
        match self {
            Instance::Object(obj) => obj.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Downcast a constructed object, keeping shared ownership
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Instance::Object(obj) => Arc::clone(obj).downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Returns the kind name of this instance
    pub fn kind_name(&self) -> &'static str {
        match self {
            Instance::Value(_) => "value",
            Instance::Sequence(_) => "sequence",
            Instance::Mapping(_) => "mapping",
            Instance::Object(_) => "object",
            Instance::Callable(_) => "callable",
        }
    }
}

impl From<Value> for Instance {
    fn from(v: Value) -> Self {
        Instance::Value(v)
    }
}

impl From<Factory> for Instance {
    fn from(f: Factory) -> Self {
        Instance::Callable(f)
    }
}
