//! Path-based configuration overrides
//!
//! Applies `"dotted.path=literal"` batches to a loaded configuration.
//! Literals are parsed best-effort into typed values (booleans, numbers,
//! quoted strings, structured literals), falling back to the raw string.
//! Paths never auto-vivify: every non-final segment must already exist and
//! be a container, and a failure names the exact offending prefix.

use crate::error::{Error, Result};
use crate::serialize::value_from_yaml;
use crate::value::Value;

/// Apply a batch of override strings in listed order.
///
/// Later overrides on the same path win. A failing override aborts the
/// batch but never corrupts the store: earlier entries stay applied, the
/// failing one changes nothing.
pub fn apply_overrides<S: AsRef<str>>(root: &mut Value, overrides: &[S]) -> Result<()> {
    for spec in overrides {
        apply_override(root, spec.as_ref())?;
    }
    Ok(())
}

/// Apply a single `path=literal` override
pub fn apply_override(root: &mut Value, spec: &str) -> Result<()> {
    let (path, raw) = spec.split_once('=').ok_or_else(|| {
        Error::parse(format!("Override '{}' must have the form path=value", spec))
    })?;
    root.set_path(path.trim(), parse_literal(raw))
}

/// Parse an override literal into a typed value.
///
/// Uses YAML scalar rules, so `123` is an integer, `"123"` a string,
/// `true` a boolean, `[1, 2]` a sequence. Anything that fails to parse is
/// kept as the raw string.
pub fn parse_literal(raw: &str) -> Value {
    match serde_yaml::from_str::<serde_yaml::Value>(raw) {
        Ok(parsed) => value_from_yaml(parsed).unwrap_or_else(|_| Value::String(raw.to_string())),
        Err(_) => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::lazy::LazyBuilder;
    use indexmap::IndexMap;

    fn store() -> Value {
        let mut dict = IndexMap::new();
        dict.insert("a".into(), Value::Integer(1));
        dict.insert("b".into(), Value::Integer(2));

        let call = LazyBuilder::new("iter.counter").unwrap().call([
            ("x", Value::String("base".into())),
            ("y", Value::Integer(0)),
        ]);

        let mut root = IndexMap::new();
        root.insert("dir1b_dict".into(), Value::Mapping(dict));
        root.insert("lazyobj".into(), Value::Call(call));
        Value::Mapping(root)
    }

    #[test]
    fn test_parse_literal_types() {
        assert_eq!(parse_literal("123"), Value::Integer(123));
        assert_eq!(parse_literal("2.5"), Value::Float(2.5));
        assert_eq!(parse_literal("true"), Value::Bool(true));
        assert_eq!(parse_literal("\"123\""), Value::String("123".into()));
        assert_eq!(parse_literal("plain"), Value::String("plain".into()));
        assert_eq!(
            parse_literal("[1, 2]"),
            Value::Sequence(vec![Value::Integer(1), Value::Integer(2)])
        );
        // Unparseable structured literal falls back to the raw string
        assert_eq!(
            parse_literal("[1, unclosed"),
            Value::String("[1, unclosed".into())
        );
    }

    #[test]
    fn test_apply_overrides_typed_batch() {
        let mut root = store();
        apply_overrides(&mut root, &["lazyobj.x=123", "dir1b_dict.a=\"123\""]).unwrap();

        assert_eq!(root.get_path("lazyobj.x").unwrap().as_i64(), Some(123));
        assert_eq!(
            root.get_path("dir1b_dict.a").unwrap().as_str(),
            Some("123")
        );
    }

    #[test]
    fn test_apply_overrides_last_write_wins_and_idempotent() {
        let batch = ["dir1b_dict.a=10", "dir1b_dict.a=20"];

        let mut once = store();
        apply_overrides(&mut once, &batch).unwrap();
        assert_eq!(once.get_path("dir1b_dict.a").unwrap().as_i64(), Some(20));

        let mut twice = store();
        apply_overrides(&mut twice, &batch).unwrap();
        apply_overrides(&mut twice, &batch).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_override_creates_final_segment() {
        let mut root = store();
        apply_override(&mut root, "dir1b_dict.c=3").unwrap();
        assert_eq!(root.get_path("dir1b_dict.c").unwrap().as_i64(), Some(3));
    }

    #[test]
    fn test_apply_override_through_scalar_fails() {
        // lazyobj.x is a scalar; pathing through it names the prefix
        let mut root = store();
        let err = apply_overrides(&mut root, &["lazyobj.x.xxx=123"]).unwrap_err();

        assert_eq!(err.kind, ErrorKind::PathNotFound);
        assert_eq!(err.path, Some("lazyobj.x".into()));
        // Store otherwise unmodified
        assert_eq!(root, store());
    }

    #[test]
    fn test_apply_override_missing_intermediate_fails() {
        let mut root = store();
        let err = apply_overrides(&mut root, &["nosuch.key=1"]).unwrap_err();

        assert_eq!(err.kind, ErrorKind::PathNotFound);
        assert_eq!(err.path, Some("nosuch".into()));
    }

    #[test]
    fn test_failure_does_not_abort_independent_operations() {
        let mut root = store();
        apply_overrides(&mut root, &["dir1b_dict.a=5"]).unwrap();
        assert!(apply_overrides(&mut root, &["lazyobj.x.xxx=1"]).is_err());

        // The earlier successful override is still in place
        assert_eq!(root.get_path("dir1b_dict.a").unwrap().as_i64(), Some(5));
    }

    #[test]
    fn test_missing_equals_is_a_parse_error() {
        let mut root = store();
        let err = apply_overrides(&mut root, &["no-equals-here"]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }

    #[test]
    fn test_retarget_via_override() {
        let mut root = store();
        apply_override(&mut root, "lazyobj._target_=iter.other").unwrap();

        let call = root.get_path("lazyobj").unwrap().as_call().unwrap();
        assert_eq!(call.target().name(), Some("iter.other"));
    }
}
