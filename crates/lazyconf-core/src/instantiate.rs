//! The resolver: turns configuration values into live objects
//!
//! Recursively walks a value, invoking lazy calls bottom-up: a call's
//! target is resolved first (names through the registry, nested calls by
//! instantiating them), then every argument, then the factory runs. Plain
//! data is the identity base case, which bounds the recursion by the
//! nesting depth of the configuration.
//!
//! A cyclic target chain (a call whose nested target eventually names the
//! call itself) is a configuration error and is not detected here.

use crate::error::{Error, Result};
use crate::instance::{Args, Factory, Instance};
use crate::lazy::{LazyCall, Target, TARGET_KEY};
use crate::registry::{global_registry, FactoryRegistry};
use crate::value::Value;

/// Instantiate a configuration value against a factory registry.
///
/// - Sequences instantiate element-wise, order preserved.
/// - Lazy calls (and `_target_`-tagged mappings) are invoked after their
///   target and arguments are fully resolved.
/// - Plain mappings without the reserved key, strings, and scalars are
///   returned unchanged. Each invocation constructs fresh objects.
pub fn instantiate(value: &Value, registry: &FactoryRegistry) -> Result<Instance> {
    match value {
        Value::Sequence(seq) => {
            let elements = seq
                .iter()
                .map(|v| instantiate(v, registry))
                .collect::<Result<Vec<_>>>()?;
            Ok(Instance::Sequence(elements))
        }
        Value::Call(call) => invoke(call, registry),
        Value::Mapping(map) if map.contains_key(TARGET_KEY) => {
            let call = LazyCall::from_mapping(map)?;
            invoke(&call, registry)
        }
        other => Ok(Instance::Value(other.clone())),
    }
}

/// Instantiate against the global factory registry
pub fn instantiate_global(value: &Value) -> Result<Instance> {
    let registry = global_registry()
        .read()
        .expect("Global registry lock poisoned");
    instantiate(value, &registry)
}

fn invoke(call: &LazyCall, registry: &FactoryRegistry) -> Result<Instance> {
    let factory = resolve_target(call.target(), registry)?;
    log::debug!("instantiating {}", call.target());

    let mut args = Args::new();
    for (name, value) in call.args() {
        args.insert(name.clone(), instantiate(value, registry)?);
    }

    // Invocation failures are the factory's construction logic, not the
    // engine's: propagate unmodified.
    factory.invoke(args)
}

fn resolve_target(target: &Target, registry: &FactoryRegistry) -> Result<Factory> {
    match target {
        Target::Callable(factory) => Ok(factory.clone()),
        Target::Name(name) => registry.decode(name),
        Target::Call(inner) => match invoke(inner, registry)? {
            Instance::Callable(factory) => Ok(factory),
            other => Err(Error::instantiation(
                format!(
                    "nested target resolved to {} instead of a callable",
                    other.kind_name()
                ),
                None,
            )),
        },
    }
}
