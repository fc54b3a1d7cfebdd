//! lazyconf-core: Deferred-call configuration library
//!
//! This crate provides loading, mutation, and resolution of configuration
//! stores whose values may be interpolation expressions (`${path.to.value}`)
//! or lazy call descriptors (`_target_`-tagged mappings). Nothing is
//! constructed at load time: calls stay deferred until `instantiate`
//! resolves their targets through a factory registry and invokes them.
//!
//! # Example
//!
//! ```rust
//! use lazyconf_core::Config;
//!
//! let yaml = r#"
//! defaults:
//!   host: localhost
//! database:
//!   host: ${defaults.host}
//! worker:
//!   _target_: pool.fixed
//!   size: 4
//! "#;
//!
//! let config = Config::from_yaml(yaml).unwrap();
//! assert_eq!(config.get("database.host").unwrap().as_str(), Some("localhost"));
//! assert_eq!(config.get("worker.size").unwrap().as_i64(), Some(4));
//! ```

pub mod error;
pub mod instance;
pub mod instantiate;
pub mod interpolation;
pub mod lazy;
pub mod overrides;
pub mod registry;
pub mod serialize;
pub mod value;

mod config;

pub use config::Config;
pub use error::{Error, Result};
pub use instance::{Args, Factory, Instance};
pub use instantiate::{instantiate, instantiate_global};
pub use lazy::{LazyBuilder, LazyCall, Target, TARGET_KEY};
pub use registry::{global_registry, register_global, FactoryRegistry};
pub use value::Value;
