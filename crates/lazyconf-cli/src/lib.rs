//! lazyconf CLI library
//!
//! This module exposes the CLI main function so the binary stays a thin
//! wrapper.

mod cli;

pub use cli::run;
