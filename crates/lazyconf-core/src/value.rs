//! Configuration value types
//!
//! Represents configuration values before instantiation. Values form a
//! closed sum type: scalars (string, int, float, bool, null), sequences,
//! mappings, and lazy-call descriptors. Strings may contain unresolved
//! interpolations like `${path.to.value}`.

use indexmap::IndexMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::lazy::{LazyCall, Target, TARGET_KEY};

/// A configuration value that may contain unresolved interpolations
/// and unresolved lazy calls
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Null value
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Integer(i64),
    /// Floating point value
    Float(f64),
    /// String value (may contain interpolations like ${a.b})
    String(String),
    /// Sequence of values
    Sequence(Vec<Value>),
    /// Mapping of string keys to values
    Mapping(IndexMap<String, Value>),
    /// A deferred call descriptor
    Call(LazyCall),
}

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Check if this value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Check if this value is a sequence
    pub fn is_sequence(&self) -> bool {
        matches!(self, Value::Sequence(_))
    }

    /// Check if this value is a mapping
    pub fn is_mapping(&self) -> bool {
        matches!(self, Value::Mapping(_))
    }

    /// Check if this value is a lazy-call descriptor
    pub fn is_call(&self) -> bool {
        matches!(self, Value::Call(_))
    }

    /// Get as boolean if this is a Bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i64 if this is an Integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Float or Integer
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as str if this is a String
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as slice if this is a Sequence
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Get as mapping if this is a Mapping
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Mapping(m) => Some(m),
            _ => None,
        }
    }

    /// Get as lazy call if this is a Call
    pub fn as_call(&self) -> Option<&LazyCall> {
        match self {
            Value::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Get as mutable lazy call if this is a Call
    pub fn as_call_mut(&mut self) -> Option<&mut LazyCall> {
        match self {
            Value::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Get a value by path (e.g., "model.backbone" or "servers[0].name")
    ///
    /// Paths traverse mappings by key, sequences by index, and lazy calls
    /// by argument name. The reserved `_target_` segment is write-only.
    pub fn get_path(&self, path: &str) -> Result<&Value> {
        if path.is_empty() {
            return Ok(self);
        }

        let segments = parse_path(path)?;
        let mut current = self;

        for (i, segment) in segments.iter().enumerate() {
            current = match (current, segment) {
                (Value::Mapping(map), PathSegment::Key(key)) => map
                    .get(key.as_str())
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                (Value::Call(call), PathSegment::Key(key)) => call
                    .arg(key)
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                (Value::Sequence(seq), PathSegment::Index(idx)) => seq
                    .get(*idx)
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                _ => return Err(Error::path_not_found(prefix_of(&segments, i))),
            };
        }

        Ok(current)
    }

    /// Get a mutable value by path
    pub fn get_path_mut(&mut self, path: &str) -> Result<&mut Value> {
        if path.is_empty() {
            return Ok(self);
        }

        let segments = parse_path(path)?;
        let mut current = self;

        for (i, segment) in segments.iter().enumerate() {
            current = match (current, segment) {
                (Value::Mapping(map), PathSegment::Key(key)) => map
                    .get_mut(key.as_str())
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                (Value::Call(call), PathSegment::Key(key)) => call
                    .arg_mut(key)
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                (Value::Sequence(seq), PathSegment::Index(idx)) => seq
                    .get_mut(*idx)
                    .ok_or_else(|| Error::path_not_found(prefix_of(&segments, i)))?,
                _ => return Err(Error::path_not_found(prefix_of(&segments, i))),
            };
        }

        Ok(current)
    }

    /// Set a value at a path.
    ///
    /// Every non-final segment must already exist and be a container
    /// (mapping, in-bounds sequence index, or call-argument block); there is
    /// no auto-vivification. The final segment is created if absent. On a
    /// lazy call, the final segment `_target_` re-targets the call; a
    /// non-final `_target_` descends into a nested lazy target.
    ///
    /// A failed set leaves the value unmodified.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        if path.is_empty() {
            *self = value;
            return Ok(());
        }

        let segments = parse_path(path)?;
        let last = segments.len() - 1;
        let mut current = Cursor::Value(self);

        for (i, segment) in segments.iter().enumerate() {
            if i == last {
                // A set blocked by a non-container names the prefix of the
                // blocking value, not the full requested path.
                let parent = if i == 0 {
                    prefix_of(&segments, i)
                } else {
                    prefix_of(&segments, i - 1)
                };
                return current.set(segment, value, &parent, &prefix_of(&segments, i));
            }
            current = current.descend(segment, &prefix_of(&segments, i))?;
        }

        Ok(())
    }

    /// Remove and return a top-level key if this is a Mapping
    pub fn pop(&mut self, key: &str) -> Option<Value> {
        match self {
            Value::Mapping(map) => map.shift_remove(key),
            Value::Call(call) => call.remove_arg(key),
            _ => None,
        }
    }

    /// Returns the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
            Value::Call(_) => "call",
        }
    }

    /// Merge another value into this one (deep merge)
    ///
    /// Merge semantics:
    /// - Mappings: deep merge recursively
    /// - Scalars, sequences, calls: `other` wins (last-writer-wins)
    /// - Null in other: removes the key
    /// - Type mismatch: `other` wins
    pub fn merge(&mut self, other: Value) {
        match (self, other) {
            (Value::Mapping(base), Value::Mapping(overlay)) => {
                for (key, overlay_value) in overlay {
                    if overlay_value.is_null() {
                        base.shift_remove(&key);
                    } else if let Some(base_value) = base.get_mut(&key) {
                        base_value.merge(overlay_value);
                    } else {
                        base.insert(key, overlay_value);
                    }
                }
            }
            (this, other) => {
                *this = other;
            }
        }
    }

    /// Create a merged value from two values (non-mutating)
    pub fn merged(mut self, other: Value) -> Value {
        self.merge(other);
        self
    }
}

/// Mutable walk position: either a plain value or a call descriptor whose
/// target/arguments are being addressed.
enum Cursor<'a> {
    Value(&'a mut Value),
    Call(&'a mut LazyCall),
}

impl<'a> Cursor<'a> {
    fn descend(self, segment: &PathSegment, prefix: &str) -> Result<Cursor<'a>> {
        match self {
            Cursor::Value(Value::Mapping(map)) => match segment {
                PathSegment::Key(key) => map
                    .get_mut(key)
                    .map(Cursor::Value)
                    .ok_or_else(|| Error::path_not_found(prefix)),
                PathSegment::Index(_) => Err(Error::path_not_found(prefix)),
            },
            Cursor::Value(Value::Sequence(seq)) => match segment {
                PathSegment::Index(idx) => seq
                    .get_mut(*idx)
                    .map(Cursor::Value)
                    .ok_or_else(|| Error::path_not_found(prefix)),
                PathSegment::Key(_) => Err(Error::path_not_found(prefix)),
            },
            Cursor::Value(Value::Call(call)) => Cursor::Call(call).descend(segment, prefix),
            Cursor::Call(call) => match segment {
                PathSegment::Key(key) if key == TARGET_KEY => match call.target_mut() {
                    Target::Call(inner) => Ok(Cursor::Call(inner)),
                    _ => Err(Error::path_not_found(prefix)),
                },
                PathSegment::Key(key) => call
                    .arg_mut(key)
                    .map(Cursor::Value)
                    .ok_or_else(|| Error::path_not_found(prefix)),
                PathSegment::Index(_) => Err(Error::path_not_found(prefix)),
            },
            Cursor::Value(_) => Err(Error::path_not_found(prefix)),
        }
    }

    /// `parent` is the prefix of the cursor itself; `path` is the full
    /// requested path including the final segment.
    fn set(self, segment: &PathSegment, value: Value, parent: &str, path: &str) -> Result<()> {
        match self {
            Cursor::Value(Value::Mapping(map)) => match segment {
                PathSegment::Key(key) => {
                    map.insert(key.clone(), value);
                    Ok(())
                }
                PathSegment::Index(_) => Err(Error::path_not_found(parent)),
            },
            Cursor::Value(Value::Sequence(seq)) => match segment {
                PathSegment::Index(idx) if *idx < seq.len() => {
                    seq[*idx] = value;
                    Ok(())
                }
                // In-bounds index failed its guard, so this names the
                // out-of-bounds element itself.
                PathSegment::Index(_) => Err(Error::path_not_found(path)),
                PathSegment::Key(_) => Err(Error::path_not_found(parent)),
            },
            Cursor::Value(Value::Call(call)) => {
                Cursor::Call(call).set(segment, value, parent, path)
            }
            Cursor::Call(call) => match segment {
                PathSegment::Key(key) if key == TARGET_KEY => {
                    call.set_target(Target::try_from(value)?);
                    Ok(())
                }
                PathSegment::Key(key) => call.set_arg(key, value),
                PathSegment::Index(_) => Err(Error::path_not_found(parent)),
            },
            Cursor::Value(_) => Err(Error::path_not_found(parent)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Sequence(seq) => {
                write!(f, "[")?;
                for (i, v) in seq.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Mapping(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Call(call) => write!(f, "{}", call),
        }
    }
}

// Convenient From implementations
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Sequence(v.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(m: IndexMap<String, Value>) -> Self {
        Value::Mapping(m)
    }
}

impl From<LazyCall> for Value {
    fn from(c: LazyCall) -> Self {
        Value::Call(c)
    }
}

/// A segment in a path expression
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PathSegment {
    /// A key in a mapping (e.g., "model" in "model.depth")
    Key(String),
    /// An index in a sequence (e.g., 0 in "servers[0]")
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

/// Render the path prefix up to and including segment `i`, so errors name
/// the exact failing segment.
pub(crate) fn prefix_of(segments: &[PathSegment], i: usize) -> String {
    let mut out = String::new();
    for segment in &segments[..=i] {
        match segment {
            PathSegment::Key(k) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(k);
            }
            PathSegment::Index(idx) => {
                out.push('[');
                out.push_str(&idx.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Parse a path string into segments
/// Supports: "key", "key.subkey", "key[0]", "key[0].subkey"
pub(crate) fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(current_key.clone()));
                    current_key.clear();
                }
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(current_key.clone()));
                    current_key.clear();
                }
                // Parse index
                let mut index_str = String::new();
                while let Some(&c) = chars.peek() {
                    if c == ']' {
                        chars.next();
                        break;
                    }
                    index_str.push(chars.next().unwrap());
                }
                let idx: usize = index_str.parse().map_err(|_| {
                    Error::parse(format!("Invalid array index in path: {}", index_str))
                })?;
                segments.push(PathSegment::Index(idx));
            }
            ']' => {
                return Err(Error::parse("Unexpected ']' in path"));
            }
            _ => {
                current_key.push(c);
            }
        }
    }

    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    }

    if segments.is_empty() {
        return Err(Error::parse(format!("Empty path: '{}'", path)));
    }

    Ok(segments)
}
