//! Factory registry: the target identity codec
//!
//! Dotted target names are resolved against an explicit registry of
//! factories rather than by reflective module traversal: every target a
//! configuration can name must be registered up front, which makes the set
//! of constructible types an auditable allow-list.

use std::collections::HashMap;
use std::sync::{OnceLock, RwLock};

use crate::error::{Error, Result};
use crate::instance::{Args, Factory, Instance};
use crate::lazy::validate_target_name;

// Global factory registry for application startup wiring
static GLOBAL_REGISTRY: OnceLock<RwLock<FactoryRegistry>> = OnceLock::new();

/// Get the global factory registry.
///
/// Applications typically register their constructible types here at
/// startup; `Config::instantiate` resolves against it by default.
pub fn global_registry() -> &'static RwLock<FactoryRegistry> {
    GLOBAL_REGISTRY.get_or_init(|| RwLock::new(FactoryRegistry::new()))
}

/// Register a factory in the global registry.
///
/// # Arguments
/// * `name` - Stable dotted identity (e.g. "models.resnet")
/// * `func` - The factory function
/// * `force` - If true, overwrite any existing factory with the same name.
///   If false, return an error if the name is already registered.
pub fn register_global<F>(name: impl Into<String>, func: F, force: bool) -> Result<()>
where
    F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
{
    let mut registry = global_registry()
        .write()
        .expect("Global registry lock poisoned");
    registry.register_with_force(name, func, force)
}

/// Encode a factory as its stable string identity.
///
/// Anonymous factories have no identity and cannot be written to a textual
/// configuration; encoding one is a hard serialization error.
pub fn encode(factory: &Factory) -> Result<String> {
    factory.name().map(str::to_string).ok_or_else(|| {
        Error::serialization(
            "",
            "anonymous factory has no stable identity; register it under a dotted name",
        )
    })
}

/// Maps stable dotted names to factories
pub struct FactoryRegistry {
    factories: HashMap<String, Factory>,
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FactoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory function, erroring on duplicate names
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> Result<()>
    where
        F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
    {
        self.register_with_force(name, func, false)
    }

    /// Register a factory function, optionally replacing an existing one
    pub fn register_with_force<F>(
        &mut self,
        name: impl Into<String>,
        func: F,
        force: bool,
    ) -> Result<()>
    where
        F: Fn(Args) -> Result<Instance> + Send + Sync + 'static,
    {
        self.register_factory(name, Factory::new(func), force)
    }

    /// Register a pre-built factory under a dotted name
    pub fn register_factory(
        &mut self,
        name: impl Into<String>,
        factory: Factory,
        force: bool,
    ) -> Result<()> {
        let name = name.into();
        validate_target_name(&name)?;
        if !force && self.factories.contains_key(&name) {
            return Err(Error::already_registered(name));
        }
        self.factories.insert(name.clone(), factory.with_name(name));
        Ok(())
    }

    /// Look up a factory by name
    pub fn get(&self, name: &str) -> Option<&Factory> {
        self.factories.get(name)
    }

    /// Check if a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Decode a stable string identity into its factory.
    ///
    /// Relative (leading-dot) names are rejected outright. A missing name
    /// errors with the first unresolved segment, so `models.resnet.deep`
    /// against a registry holding `models.resnet` points at `deep`.
    pub fn decode(&self, name: &str) -> Result<Factory> {
        validate_target_name(name)?;

        if let Some(factory) = self.factories.get(name) {
            return Ok(factory.clone());
        }

        let segment = self.first_unresolved_segment(name);
        Err(
            Error::target_not_found(name, None).with_help(if segment == name {
                format!("Register a factory under '{}' before instantiating", name)
            } else {
                format!(
                    "'{}' is not registered: segment '{}' does not resolve",
                    name, segment
                )
            }),
        )
    }

    /// Find the first dotted segment of `name` that no registered name
    /// reaches. The result borrows from `name`, not from the registry.
    fn first_unresolved_segment<'a>(&self, name: &'a str) -> &'a str {
        let segments: Vec<&str> = name.split('.').collect();
        let mut prefix = String::new();

        for (i, segment) in segments.iter().enumerate() {
            if i > 0 {
                prefix.push('.');
            }
            prefix.push_str(segment);

            let reachable = self
                .factories
                .keys()
                .any(|k| k == &prefix || k.starts_with(&format!("{}.", prefix)));
            if !reachable {
                return segment;
            }
        }

        name
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorKind, RegistryErrorKind};
    use crate::value::Value;

    fn null_factory(_: Args) -> Result<Instance> {
        Ok(Instance::Value(Value::Null))
    }

    #[test]
    fn test_register_and_decode() {
        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", null_factory).unwrap();

        let factory = registry.decode("iter.counter").unwrap();
        assert_eq!(factory.name(), Some("iter.counter"));
        assert!(registry.contains("iter.counter"));
    }

    #[test]
    fn test_duplicate_registration_errors() {
        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", null_factory).unwrap();

        let err = registry.register("iter.counter", null_factory).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Registry(RegistryErrorKind::AlreadyRegistered { .. })
        ));

        // Force replaces
        registry
            .register_with_force("iter.counter", null_factory, true)
            .unwrap();
    }

    #[test]
    fn test_decode_unknown_name() {
        let registry = FactoryRegistry::new();
        let err = registry.decode("iter.counter").unwrap_err();

        assert!(matches!(
            err.kind,
            ErrorKind::Registry(RegistryErrorKind::TargetNotFound { .. })
        ));
    }

    #[test]
    fn test_decode_names_unresolved_segment() {
        let mut registry = FactoryRegistry::new();
        registry.register("models.resnet", null_factory).unwrap();

        let err = registry.decode("models.resnet.deep").unwrap_err();
        let help = err.help.unwrap();
        assert!(help.contains("'deep'"), "help was: {}", help);
    }

    #[test]
    fn test_decode_relative_name_rejected() {
        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", null_factory).unwrap();

        let err = registry.decode(".iter.counter").unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::Registry(RegistryErrorKind::RelativeTarget { .. })
        ));
    }

    #[test]
    fn test_register_invalid_name() {
        let mut registry = FactoryRegistry::new();
        assert!(registry.register("has space", null_factory).is_err());
        assert!(registry.register("", null_factory).is_err());
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = FactoryRegistry::new();
        registry.register("b.two", null_factory).unwrap();
        registry.register("a.one", null_factory).unwrap();

        assert_eq!(registry.names(), vec!["a.one", "b.two"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_encode_registered_factory() {
        let mut registry = FactoryRegistry::new();
        registry.register("iter.counter", null_factory).unwrap();

        let factory = registry.get("iter.counter").unwrap();
        assert_eq!(encode(factory).unwrap(), "iter.counter");
    }

    #[test]
    fn test_encode_anonymous_factory_fails() {
        let factory = Factory::new(null_factory);
        let err = encode(&factory).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Serialization);
    }

    #[test]
    fn test_global_registry() {
        register_global("registry_test.global_widget", null_factory, true).unwrap();

        let registry = global_registry().read().unwrap();
        assert!(registry.contains("registry_test.global_widget"));
        registry.decode("registry_test.global_widget").unwrap();
    }
}
