//! Dynamic values flowing through effects.

use bytes::Bytes;

use super::HttpResponse;
use crate::error::{ClientError, Result};

/// Result of resolving an effect, or an argument passed to one.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Json(serde_json::Value),
    Bytes(Bytes),
    Response(HttpResponse),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Json(serde_json::Value::Null))
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(serde_json::Value::as_str)
    }

    /// Convert into JSON. `Null` maps to JSON null, a JSON response is parsed.
    pub fn into_json(self) -> Result<serde_json::Value> {
        match self {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Json(v) => Ok(v),
            Value::Response(r) if r.is_json() => r.json(),
            Value::Response(r) => Err(ClientError::UnexpectedResponse(format!(
                "expected a JSON body, got HTTP {} with content type {:?}",
                r.status,
                r.content_type()
            ))),
            Value::Bytes(_) => Err(ClientError::UnexpectedResponse(
                "expected JSON, got raw bytes".to_string(),
            )),
        }
    }

    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Value::Bytes(b) => Ok(b),
            Value::Response(r) => Ok(r.body),
            Value::Json(serde_json::Value::String(s)) => Ok(Bytes::from(s)),
            other => Err(ClientError::InvalidArgument(format!(
                "expected bytes, got {}",
                other.kind()
            ))),
        }
    }

    pub fn into_response(self) -> Result<HttpResponse> {
        match self {
            Value::Response(r) => Ok(r),
            other => Err(ClientError::UnexpectedResponse(format!(
                "expected an HTTP response, got {}",
                other.kind()
            ))),
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Json(_) => "json",
            Value::Bytes(_) => "bytes",
            Value::Response(_) => "response",
        }
    }

    /// Attribute access on a resolved value.
    pub fn get_attr(&self, name: &str) -> Result<Value> {
        match self {
            Value::Json(serde_json::Value::Object(map)) => map
                .get(name)
                .cloned()
                .map(Value::Json)
                .ok_or_else(|| ClientError::UnknownTarget(format!("no attribute `{name}`"))),
            Value::Response(r) => match name {
                "status" | "status_code" => Ok(Value::Json(r.status.into())),
                "body" | "content" => Ok(Value::Bytes(r.body.clone())),
                "headers" => {
                    let headers = r
                        .headers
                        .iter()
                        .filter_map(|(k, v)| {
                            v.to_str()
                                .ok()
                                .map(|v| (k.as_str().to_string(), v.to_string().into()))
                        })
                        .collect::<serde_json::Map<_, _>>();
                    Ok(Value::Json(serde_json::Value::Object(headers)))
                }
                _ => Err(ClientError::UnknownTarget(format!(
                    "response has no attribute `{name}`"
                ))),
            },
            other => Err(ClientError::UnknownTarget(format!(
                "{} has no attribute `{name}`",
                other.kind()
            ))),
        }
    }

    /// Subscript access on a resolved value.
    pub fn index(&self, key: &Value) -> Result<Value> {
        let missing = || ClientError::UnknownTarget(format!("no item at {key}"));
        match (self, key) {
            (Value::Json(serde_json::Value::Array(items)), Value::Json(k)) => {
                let i = k.as_u64().ok_or_else(missing)?;
                let i = usize::try_from(i).map_err(|_| missing())?;
                items.get(i).cloned().map(Value::Json).ok_or_else(missing)
            }
            (Value::Json(serde_json::Value::Object(map)), Value::Json(k)) => {
                let k = k.as_str().ok_or_else(missing)?;
                map.get(k).cloned().map(Value::Json).ok_or_else(missing)
            }
            (Value::Response(r), Value::Json(serde_json::Value::String(name))) => r
                .header(name)
                .map(|v| Value::Json(v.into()))
                .ok_or_else(missing),
            _ => Err(missing()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Json(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Response(r) => write!(f, "<HTTP {}>", r.status),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl From<Bytes> for Value {
    fn from(b: Bytes) -> Self {
        Value::Bytes(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(b))
    }
}

impl From<HttpResponse> for Value {
    fn from(r: HttpResponse) -> Self {
        Value::Response(r)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

macro_rules! impl_from_json {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Json(serde_json::Value::from(v))
                }
            }
        )*
    };
}

impl_from_json!(&str, String, bool, i32, i64, u16, u32, u64, usize, f64);
