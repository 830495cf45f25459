//! # Patches
//!
//! JSON-Patch-like description of one change to one container.
//!
//! Containers are diffed through their serde JSON form: a transaction
//! serializes the committed snapshot and the draft, [`diff`] walks both and
//! emits the forward patches plus the inverse patches that undo them.
//! [`apply`] replays either list against the JSON form again.
//!
//! Arrays are diffed with a shared prefix and suffix so a single splice
//! (insert or remove one child) produces a single `add` / `remove` instead
//! of rewriting every following element.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Name of a store container, as sent to the persistence endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Root,
    Props,
    Breakpoints,
}

impl Namespace {
    pub const ALL: [Namespace; 3] = [Namespace::Root, Namespace::Props, Namespace::Breakpoints];

    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Root => "root",
            Namespace::Props => "props",
            Namespace::Breakpoints => "breakpoints",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub op: PatchOp,
    /// RFC 6901 pointer into the container's JSON form
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Patch {
    pub fn add(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn replace(path: impl Into<String>, value: Value) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }
}

/// Patches for one container within a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamespacedPatches {
    pub namespace: Namespace,
    pub patches: Vec<Patch>,
}

/// Everything one store transaction changed, one entry per touched container
pub type Transaction = Vec<NamespacedPatches>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PatchError {
    #[error("Invalid pointer: {0}")]
    InvalidPointer(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Patch {op:?} at {path} is missing a value")]
    MissingValue { op: PatchOp, path: String },

    #[error("Cannot remove the document root")]
    RemoveRoot,
}

/// Escape one reference token of a JSON pointer
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn child_path(path: &str, token: &str) -> String {
    format!("{}/{}", path, escape_token(token))
}

/// Diff two JSON documents.
///
/// Returns `(patches, inverse)`: applying `patches` to `old` yields `new`,
/// applying `inverse` to `new` yields `old` again.
pub fn diff(old: &Value, new: &Value) -> (Vec<Patch>, Vec<Patch>) {
    let mut patches = Vec::new();
    let mut inverse = Vec::new();
    diff_at("", old, new, &mut patches, &mut inverse);
    inverse.reverse();
    (patches, inverse)
}

// Each forward patch pushes the patch that undoes it; the caller reverses
// the inverse list so the undo runs newest-first.
fn diff_at(path: &str, old: &Value, new: &Value, patches: &mut Vec<Patch>, inverse: &mut Vec<Patch>) {
    if old == new {
        return;
    }

    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => {
            for (key, old_value) in old_map {
                let path = child_path(path, key);
                match new_map.get(key) {
                    Some(new_value) => diff_at(&path, old_value, new_value, patches, inverse),
                    None => {
                        patches.push(Patch::remove(&path));
                        inverse.push(Patch::add(&path, old_value.clone()));
                    }
                }
            }
            for (key, new_value) in new_map {
                if !old_map.contains_key(key) {
                    let path = child_path(path, key);
                    patches.push(Patch::add(&path, new_value.clone()));
                    inverse.push(Patch::remove(&path));
                }
            }
        }
        (Value::Array(old_items), Value::Array(new_items)) => {
            diff_arrays(path, old_items, new_items, patches, inverse);
        }
        _ => {
            patches.push(Patch::replace(path, new.clone()));
            inverse.push(Patch::replace(path, old.clone()));
        }
    }
}

fn diff_arrays(
    path: &str,
    old: &[Value],
    new: &[Value],
    patches: &mut Vec<Patch>,
    inverse: &mut Vec<Patch>,
) {
    let shortest = old.len().min(new.len());
    let prefix = old.iter().zip(new).take_while(|(a, b)| a == b).count();
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(shortest - prefix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];
    let paired = old_mid.len().min(new_mid.len());

    for i in 0..paired {
        let item_path = format!("{}/{}", path, prefix + i);
        diff_at(&item_path, &old_mid[i], &new_mid[i], patches, inverse);
    }

    for (i, value) in new_mid.iter().enumerate().skip(paired) {
        let item_path = format!("{}/{}", path, prefix + i);
        patches.push(Patch::add(&item_path, value.clone()));
        inverse.push(Patch::remove(&item_path));
    }

    for i in (paired..old_mid.len()).rev() {
        let item_path = format!("{}/{}", path, prefix + i);
        patches.push(Patch::remove(&item_path));
        inverse.push(Patch::add(&item_path, old_mid[i].clone()));
    }
}

fn parse_pointer(path: &str) -> Result<Vec<String>, PatchError> {
    if path.is_empty() {
        return Ok(Vec::new());
    }
    let rest = path
        .strip_prefix('/')
        .ok_or_else(|| PatchError::InvalidPointer(path.to_string()))?;
    Ok(rest.split('/').map(unescape_token).collect())
}

fn parse_index(token: &str, path: &str) -> Result<usize, PatchError> {
    token
        .parse::<usize>()
        .map_err(|_| PatchError::InvalidPointer(path.to_string()))
}

/// Apply one patch in place
pub fn apply_patch(doc: &mut Value, patch: &Patch) -> Result<(), PatchError> {
    let tokens = parse_pointer(&patch.path)?;
    let not_found = || PatchError::PathNotFound(patch.path.clone());

    let Some((last, parents)) = tokens.split_last() else {
        return match (patch.op, &patch.value) {
            (PatchOp::Remove, _) => Err(PatchError::RemoveRoot),
            (_, Some(value)) => {
                *doc = value.clone();
                Ok(())
            }
            (op, None) => Err(PatchError::MissingValue {
                op,
                path: patch.path.clone(),
            }),
        };
    };

    let mut target = doc;
    for token in parents {
        target = match target {
            Value::Object(map) => map.get_mut(token).ok_or_else(not_found)?,
            Value::Array(items) => {
                let index = parse_index(token, &patch.path)?;
                items.get_mut(index).ok_or_else(not_found)?
            }
            _ => return Err(not_found()),
        };
    }

    let value = || {
        patch.value.clone().ok_or_else(|| PatchError::MissingValue {
            op: patch.op,
            path: patch.path.clone(),
        })
    };

    match target {
        Value::Object(map) => match patch.op {
            PatchOp::Add => {
                map.insert(last.clone(), value()?);
            }
            PatchOp::Replace => {
                let slot = map.get_mut(last).ok_or_else(not_found)?;
                *slot = value()?;
            }
            PatchOp::Remove => {
                map.remove(last).ok_or_else(not_found)?;
            }
        },
        Value::Array(items) => match patch.op {
            PatchOp::Add => {
                let index = if last == "-" {
                    items.len()
                } else {
                    parse_index(last, &patch.path)?
                };
                if index > items.len() {
                    return Err(not_found());
                }
                items.insert(index, value()?);
            }
            PatchOp::Replace => {
                let index = parse_index(last, &patch.path)?;
                let slot = items.get_mut(index).ok_or_else(not_found)?;
                *slot = value()?;
            }
            PatchOp::Remove => {
                let index = parse_index(last, &patch.path)?;
                if index >= items.len() {
                    return Err(not_found());
                }
                items.remove(index);
            }
        },
        _ => return Err(not_found()),
    }

    Ok(())
}

/// Apply patches in order. On error `doc` may be partially patched, so
/// callers apply to a scratch copy.
pub fn apply(doc: &mut Value, patches: &[Patch]) -> Result<(), PatchError> {
    patches.iter().try_for_each(|patch| apply_patch(doc, patch))
}
