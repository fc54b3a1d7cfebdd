//! Serialization: durable text form and source rendering
//!
//! A store saves to YAML with every lazy call written as a mapping whose
//! first key is the reserved `_target_` tag holding the encoded target
//! identity. Loading leaves targets as deferred names (never eagerly
//! decoded), so a loaded store is itself a valid configuration and
//! `save` directly after `load` reproduces the same document.
//!
//! `to_source` renders a store as ordered assignment statements for human
//! consumption; it is not re-parsed as configuration input.

use indexmap::IndexMap;
use std::path::Path;

use crate::error::{Error, Result};
use crate::lazy::{LazyCall, Target, TARGET_KEY};
use crate::registry;
use crate::value::Value;

/// Column threshold beyond which `to_source` switches to block layout
const SOURCE_WIDTH: usize = 80;

/// Serialize a store to YAML text.
///
/// Deterministic: mapping keys keep their insertion order, with no
/// hash-ordering artifacts. Anonymous callables are not representable and
/// fail with a serialization error.
pub fn to_yaml(root: &Value) -> Result<String> {
    let yaml = value_to_yaml(root, "")?;
    serde_yaml::to_string(&yaml).map_err(|e| Error::parse(e.to_string()))
}

/// Serialize a store to pretty-printed JSON text
pub fn to_json(root: &Value) -> Result<String> {
    let yaml = value_to_yaml(root, "")?;
    serde_json::to_string_pretty(&yaml).map_err(|e| Error::parse(e.to_string()))
}

/// Parse a store from YAML text
pub fn from_yaml_str(text: &str) -> Result<Value> {
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
    value_from_yaml(yaml)
}

/// Parse a store from JSON text
pub fn from_json_str(text: &str) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::parse(e.to_string()))?;
    let yaml = serde_yaml::to_value(&json).map_err(|e| Error::parse(e.to_string()))?;
    value_from_yaml(yaml)
}

/// Write a store to a YAML file.
///
/// Not atomic: a failure mid-write may leave a partial file; callers that
/// need atomicity should write to a temporary path and rename.
pub fn save(root: &Value, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = to_yaml(root)?;
    std::fs::write(path, text)
        .map_err(|e| Error::io(format!("Failed to write '{}': {}", path.display(), e)))
}

/// Read a store back from a YAML file.
///
/// Always produces an independent copy; `_target_` tags stay deferred
/// string names until instantiation.
pub fn load(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| Error::io(format!("Failed to read '{}': {}", path.display(), e)))?;
    from_yaml_str(&text)
}

/// Convert a store value into a plain YAML value, encoding lazy calls as
/// `_target_`-tagged mappings
pub(crate) fn value_to_yaml(value: &Value, path: &str) -> Result<serde_yaml::Value> {
    Ok(match value {
        Value::Null => serde_yaml::Value::Null,
        Value::Bool(b) => serde_yaml::Value::Bool(*b),
        Value::Integer(i) => serde_yaml::Value::Number((*i).into()),
        Value::Float(f) => serde_yaml::Value::Number((*f).into()),
        Value::String(s) => serde_yaml::Value::String(s.clone()),
        Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for (i, item) in seq.iter().enumerate() {
                out.push(value_to_yaml(item, &format!("{}[{}]", path, i))?);
            }
            serde_yaml::Value::Sequence(out)
        }
        Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::with_capacity(map.len());
            for (key, val) in map {
                let key_path = join_path(path, key);
                out.insert(
                    serde_yaml::Value::String(key.clone()),
                    value_to_yaml(val, &key_path)?,
                );
            }
            serde_yaml::Value::Mapping(out)
        }
        Value::Call(call) => call_to_yaml(call, path)?,
    })
}

fn call_to_yaml(call: &LazyCall, path: &str) -> Result<serde_yaml::Value> {
    let mut out = serde_yaml::Mapping::with_capacity(call.args().len() + 1);
    out.insert(
        serde_yaml::Value::String(TARGET_KEY.to_string()),
        encode_target(call.target(), path)?,
    );
    for (key, val) in call.args() {
        let key_path = join_path(path, key);
        out.insert(
            serde_yaml::Value::String(key.clone()),
            value_to_yaml(val, &key_path)?,
        );
    }
    Ok(serde_yaml::Value::Mapping(out))
}

fn encode_target(target: &Target, path: &str) -> Result<serde_yaml::Value> {
    match target {
        Target::Name(name) => Ok(serde_yaml::Value::String(name.clone())),
        Target::Callable(factory) => match registry::encode(factory) {
            Ok(name) => Ok(serde_yaml::Value::String(name)),
            Err(e) => {
                log::warn!(
                    "cannot serialize anonymous callable target at '{}'",
                    if path.is_empty() { "<root>" } else { path }
                );
                if path.is_empty() {
                    Err(e)
                } else {
                    Err(e.with_path(path))
                }
            }
        },
        Target::Call(inner) => call_to_yaml(inner, &join_path(path, TARGET_KEY)),
    }
}

/// Convert a parsed YAML value into a store value, turning every
/// `_target_`-tagged mapping into a lazy call with a deferred name
pub(crate) fn value_from_yaml(value: serde_yaml::Value) -> Result<Value> {
    Ok(match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                return Err(Error::parse(format!("Unrepresentable number: {}", n)));
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => Value::Sequence(
            seq.into_iter()
                .map(value_from_yaml)
                .collect::<Result<Vec<_>>>()?,
        ),
        serde_yaml::Value::Mapping(map) => {
            let mut out = IndexMap::with_capacity(map.len());
            for (key, val) in map {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    other => {
                        return Err(Error::parse(format!(
                            "Mapping keys must be strings, got: {:?}",
                            other
                        )))
                    }
                };
                out.insert(key, value_from_yaml(val)?);
            }
            if out.contains_key(TARGET_KEY) {
                Value::Call(LazyCall::from_mapping(&out)?)
            } else {
                Value::Mapping(out)
            }
        }
        serde_yaml::Value::Tagged(tagged) => {
            return Err(Error::parse(format!(
                "Unsupported YAML tag: {}",
                tagged.tag
            )))
        }
    })
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Render a store as an ordered sequence of assignment statements.
///
/// Plain-mapping chains flatten into dotted paths; lazy calls render as
/// `encoded.name(arg=...)` expressions; keys sort lexicographically; a
/// line that would exceed 80 columns switches to a block layout with one
/// element per line and trailing commas.
pub fn to_source(root: &Value) -> Result<String> {
    let map = root.as_mapping().ok_or_else(|| {
        Error::serialization(
            "",
            format!(
                "only a mapping root can be rendered as source, got {}",
                root.type_name()
            ),
        )
    })?;

    let mut out = String::new();
    emit_assignments("cfg", map, &mut out)?;
    Ok(out)
}

fn emit_assignments(prefix: &str, map: &IndexMap<String, Value>, out: &mut String) -> Result<()> {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    for key in keys {
        let value = &map[key.as_str()];
        let path = format!("{}.{}", prefix, key);
        match value {
            Value::Mapping(m) if !m.is_empty() => emit_assignments(&path, m, out)?,
            _ => {
                let lhs = format!("{} = ", path);
                let expr = render(value, lhs.chars().count(), 0, &path)?;
                out.push_str(&lhs);
                out.push_str(&expr);
                out.push('\n');
            }
        }
    }
    Ok(())
}

/// Render an expression starting at column `col`, indented at `indent`.
/// Columns count characters, not bytes, so non-ASCII strings do not
/// trip the width threshold early.
fn render(value: &Value, col: usize, indent: usize, path: &str) -> Result<String> {
    let inline = render_inline(value, path)?;
    if col + inline.chars().count() <= SOURCE_WIDTH {
        return Ok(inline);
    }
    render_block(value, indent, path, inline)
}

fn render_inline(value: &Value, path: &str) -> Result<String> {
    Ok(match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => render_float(*f),
        Value::String(s) => quote(s),
        Value::Sequence(seq) => {
            let parts = seq
                .iter()
                .map(|v| render_inline(v, path))
                .collect::<Result<Vec<_>>>()?;
            format!("[{}]", parts.join(", "))
        }
        Value::Mapping(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts = keys
                .iter()
                .map(|k| Ok(format!("{}: {}", quote(k), render_inline(&map[k.as_str()], path)?)))
                .collect::<Result<Vec<_>>>()?;
            format!("{{{}}}", parts.join(", "))
        }
        Value::Call(call) => {
            let target = render_target(call.target(), path)?;
            let mut entries: Vec<(&String, &Value)> = call.args().iter().collect();
            entries.sort_by_key(|(name, _)| *name);
            let parts = entries
                .iter()
                .map(|(name, v)| Ok(format!("{}={}", name, render_inline(v, path)?)))
                .collect::<Result<Vec<_>>>()?;
            format!("{}({})", target, parts.join(", "))
        }
    })
}

fn render_block(value: &Value, indent: usize, path: &str, inline: String) -> Result<String> {
    let inner = indent + 4;
    let pad = " ".repeat(inner);
    let close = " ".repeat(indent);

    Ok(match value {
        Value::Call(call) => {
            let target = render_target(call.target(), path)?;
            let mut entries: Vec<(&String, &Value)> = call.args().iter().collect();
            entries.sort_by_key(|(name, _)| *name);

            let mut out = format!("{}(\n", target);
            for (name, v) in entries {
                let entry_col = inner + name.chars().count() + 1;
                out.push_str(&pad);
                out.push_str(name);
                out.push('=');
                out.push_str(&render(v, entry_col, inner, path)?);
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push(')');
            out
        }
        Value::Mapping(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            let mut out = "{\n".to_string();
            for key in keys {
                let quoted = quote(key);
                let entry_col = inner + quoted.chars().count() + 2;
                out.push_str(&pad);
                out.push_str(&quoted);
                out.push_str(": ");
                out.push_str(&render(&map[key.as_str()], entry_col, inner, path)?);
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push('}');
            out
        }
        Value::Sequence(seq) => {
            let mut out = "[\n".to_string();
            for item in seq {
                out.push_str(&pad);
                out.push_str(&render(item, inner, inner, path)?);
                out.push_str(",\n");
            }
            out.push_str(&close);
            out.push(']');
            out
        }
        // Scalars have no block form
        _ => inline,
    })
}

fn render_target(target: &Target, path: &str) -> Result<String> {
    match target {
        Target::Name(name) => Ok(name.clone()),
        Target::Callable(factory) => registry::encode(factory).map_err(|e| e.with_path(path)),
        Target::Call(inner) => render_inline(&Value::Call((**inner).clone()), path),
    }
}

fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
