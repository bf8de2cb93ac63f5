//! Paths into a root's object graph and the arguments of a call.

use std::fmt;

use crate::error::{ClientError, Result};
use crate::types::Value;

/// One step of a [`CallPath`].
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Attr(String),
    Index(Value),
}

/// An unapplied reference into the root, such as `uploads.create`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPath {
    segments: Vec<Segment>,
}

impl CallPath {
    /// The empty path, i.e. the root itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.segments.push(Segment::Attr(name.into()));
        self
    }

    pub fn index(mut self, key: Value) -> Self {
        self.segments.push(Segment::Index(key));
        self
    }

    /// Attribute names of the path, or `None` if it contains an index step.
    pub fn attr_names(&self) -> Option<Vec<&str>> {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Attr(name) => Some(name.as_str()),
                Segment::Index(_) => None,
            })
            .collect()
    }

    /// Whether the path is exactly the given chain of attribute names.
    pub fn is(&self, names: &[&str]) -> bool {
        self.attr_names().is_some_and(|n| n == names)
    }
}

impl fmt::Display for CallPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Attr(name) if i == 0 => f.write_str(name)?,
                Segment::Attr(name) => write!(f, ".{name}")?,
                Segment::Index(key) => write!(f, "[{key}]")?,
            }
        }
        Ok(())
    }
}

/// Fully resolved arguments of an invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub positional: Vec<Value>,
    /// Keyword arguments in insertion order.
    pub keyword: Vec<(String, Value)>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    /// Look up an argument by keyword, falling back to its position.
    pub fn get(&self, name: &str, position: usize) -> Option<&Value> {
        self.keyword
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v)
            .or_else(|| self.positional.get(position))
    }

    /// Remove and return an argument by keyword, falling back to its position.
    pub fn take(&mut self, name: &str, position: usize) -> Option<Value> {
        if let Some(i) = self.keyword.iter().position(|(k, _)| k == name) {
            return Some(self.keyword.remove(i).1);
        }
        self.positional
            .get_mut(position)
            .map(std::mem::take)
            .filter(|v| !matches!(v, Value::Null))
    }

    pub fn require(&mut self, name: &str, position: usize) -> Result<Value> {
        self.take(name, position)
            .ok_or_else(|| ClientError::InvalidArgument(format!("missing argument `{name}`")))
    }

    pub fn require_string(&mut self, name: &str, position: usize) -> Result<String> {
        match self.require(name, position)? {
            Value::Json(serde_json::Value::String(s)) => Ok(s),
            Value::Json(serde_json::Value::Number(n)) => Ok(n.to_string()),
            other => Err(ClientError::InvalidArgument(format!(
                "argument `{name}` must be a string, got {}",
                other.kind()
            ))),
        }
    }

    pub fn optional_string(&mut self, name: &str, position: usize) -> Result<Option<String>> {
        match self.take(name, position) {
            None => Ok(None),
            Some(v) if v.is_null() => Ok(None),
            Some(Value::Json(serde_json::Value::String(s))) => Ok(Some(s)),
            Some(other) => Err(ClientError::InvalidArgument(format!(
                "argument `{name}` must be a string, got {}",
                other.kind()
            ))),
        }
    }
}
