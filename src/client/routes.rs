//! Mapping of effect paths onto HTTP calls.

use bytes::Bytes;
use reqwest::Method;
use serde_json::json;

use crate::effect::{CallArgs, CallPath};
use crate::error::{ClientError, Result};
use crate::types::{ApiRequest, Value};

/// What an invocation on a client root does.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Route {
    /// A call against the API.
    Api(ApiRequest),
    /// Raw upload to a presigned storage URL.
    StoragePut { url: String, data: Bytes },
}

impl Route {
    pub(crate) fn parse(path: &CallPath, mut args: CallArgs) -> Result<Self> {
        let Some(names) = path.attr_names() else {
            return Err(ClientError::UnknownTarget(path.to_string()));
        };
        let route = match names.as_slice() {
            ["request"] => Route::Api(generic_request(&mut args)?),
            ["uploads", "create"] => {
                let filename = args.require_string("filename", 0)?;
                Route::Api(ApiRequest::post("uploads/").json(json!({ "filename": filename })))
            }
            ["uploads", "generate_presigned_urls"] => {
                let base = upload_path(&mut args)?;
                let part_numbers = args.require("part_numbers", 2)?.into_json()?;
                if !part_numbers.is_array() {
                    return Err(ClientError::InvalidArgument(
                        "`part_numbers` must be a list".to_string(),
                    ));
                }
                Route::Api(
                    ApiRequest::patch(format!("{base}generate-presigned-urls/"))
                        .json(json!({ "part_numbers": part_numbers })),
                )
            }
            ["uploads", "complete"] => {
                let base = upload_path(&mut args)?;
                let parts = args.require("parts", 2)?.into_json()?;
                Route::Api(
                    ApiRequest::patch(format!("{base}complete-multipart-upload/"))
                        .json(json!({ "parts": parts })),
                )
            }
            ["uploads", "abort"] => {
                let base = upload_path(&mut args)?;
                Route::Api(ApiRequest::patch(format!("{base}abort-multipart-upload/")))
            }
            ["storage", "put"] => Route::StoragePut {
                url: args.require_string("url", 0)?,
                data: args.require("data", 1)?.into_bytes()?,
            },
            _ => return Err(ClientError::UnknownTarget(path.to_string())),
        };
        Ok(route)
    }
}

fn upload_path(args: &mut CallArgs) -> Result<String> {
    let pk = path_segment("pk", &args.require_string("pk", 0)?)?;
    let upload_id = path_segment("upload_id", &args.require_string("upload_id", 1)?)?;
    Ok(format!("uploads/{pk}/{upload_id}/"))
}

/// Percent-encode `value` as a single path segment.
fn path_segment(name: &str, value: &str) -> Result<String> {
    if value.is_empty() || value == "." || value == ".." {
        return Err(ClientError::InvalidArgument(format!(
            "`{name}` is not a valid path segment: {value:?}"
        )));
    }
    Ok(urlencoding::encode(value).into_owned())
}

fn string_map(value: Option<Value>, name: &str) -> Result<Vec<(String, String)>> {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return Ok(Vec::new());
    };
    let json = value.into_json()?;
    let object = json.as_object().ok_or_else(|| {
        ClientError::InvalidArgument(format!("`{name}` must be a mapping"))
    })?;
    Ok(object
        .iter()
        .map(|(k, v)| {
            let v = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), v)
        })
        .collect())
}

fn generic_request(args: &mut CallArgs) -> Result<ApiRequest> {
    let method = match args.optional_string("method", 0)? {
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| ClientError::InvalidArgument(format!("invalid method `{m}`")))?,
        None => Method::GET,
    };
    let mut request = ApiRequest::new(method, args.optional_string("path", 2)?.unwrap_or_default());
    request.url = args.optional_string("url", 1)?.filter(|u| !u.is_empty());
    request.params = string_map(args.take("params", 3), "params")?;
    request.json = match args.take("json", 4) {
        Some(v) if !v.is_null() => Some(v.into_json()?),
        _ => None,
    };
    request.extra_headers = string_map(args.take("extra_headers", 5), "extra_headers")?
        .into_iter()
        .collect();
    Ok(request)
}
