//! The multipart upload routine.
//!
//! Written once against [`Co`], it runs unchanged under the blocking and the
//! async driver. Every server interaction is an effect on the root:
//!
//! - `uploads.create(filename)`
//! - `uploads.generate_presigned_urls(pk, upload_id, part_numbers)`
//! - `storage.put(url, data)`
//! - `uploads.complete(pk, upload_id, parts)`
//! - `uploads.abort(pk, upload_id)`

use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;

use super::options::{CompensationFailure, UploadOptions};
use super::part::upload_part;
use super::session::{SessionState, UploadSession};
use crate::driver::Co;
use crate::effect::{Args, EffectProxy};
use crate::error::{ClientError, Result};
use crate::types::Value;

fn uploads(co: &Co, operation: &str) -> EffectProxy {
    co.root().attr("uploads").attr(operation)
}

/// Upload `source` as `filename` in chunks and return the completed upload.
///
/// On any failure after the upload was created the server-side upload is
/// aborted once before the error is returned.
pub async fn upload_multipart<R: Read + Seek>(
    co: &Co,
    mut source: R,
    filename: &str,
    options: &UploadOptions,
) -> Result<Value> {
    options.validate()?;

    let created = co
        .perform(uploads(co, "create").call(Args::new().kwarg("filename", filename)))
        .await?
        .into_json()?;
    let mut session =
        UploadSession::from_created(&created, options.presigned_url_batch_size as usize)?;
    tracing::debug!(
        target: "hybrid_http::upload",
        id = session.id(),
        upload_id = session.upload_id(),
        filename,
        "upload created"
    );

    match transfer(co, &mut source, &mut session, options).await {
        Ok(completed) => {
            session.mark_completed();
            Ok(completed)
        }
        Err(original) => Err(compensate(co, &mut session, original, options.compensation).await),
    }
}

async fn transfer<R: Read + Seek>(
    co: &Co,
    source: &mut R,
    session: &mut UploadSession,
    options: &UploadOptions,
) -> Result<Value> {
    let last_part = part_count(source, options.chunk_size)?;

    for part_number in 1..=last_part {
        if session.state() != SessionState::Open {
            return Err(ClientError::InvalidState(format!(
                "upload {} is no longer open",
                session.id()
            )));
        }
        let chunk = read_chunk(source, options.chunk_size)?;
        let url = presigned_url(co, session, part_number, last_part, options).await?;
        let etag = upload_part(
            co,
            &url,
            chunk,
            part_number,
            options.max_part_retry_attempts,
        )
        .await?;
        session.record_part(part_number, etag)?;
        tracing::debug!(target: "hybrid_http::upload", part_number, last_part, "part stored");
    }

    let complete = uploads(co, "complete").call(
        Args::new()
            .kwarg("pk", session.id())
            .kwarg("upload_id", session.upload_id())
            .kwarg("parts", session.parts_payload()?),
    );
    co.perform(complete).await
}

/// URL for `part_number`, fetching the next batch when it is not cached.
async fn presigned_url(
    co: &Co,
    session: &mut UploadSession,
    part_number: u32,
    last_part: u32,
    options: &UploadOptions,
) -> Result<String> {
    if let Some(url) = session.urls_mut().take(part_number) {
        return Ok(url);
    }

    let end = part_number
        .saturating_add(options.presigned_url_batch_size)
        .min(last_part + 1);
    let requested: Vec<u32> = (part_number..end).collect();
    let generate = uploads(co, "generate_presigned_urls").call(
        Args::new()
            .kwarg("pk", session.id())
            .kwarg("upload_id", session.upload_id())
            .kwarg("part_numbers", serde_json::json!(requested)),
    );
    let response = co.perform(generate).await?.into_json()?;
    let urls = response
        .get("presigned_urls")
        .and_then(serde_json::Value::as_object)
        .ok_or_else(|| {
            ClientError::UnexpectedResponse("response has no `presigned_urls` map".to_string())
        })?;
    session.urls_mut().merge(&requested, urls)?;

    session.urls_mut().take(part_number).ok_or_else(|| {
        ClientError::UnexpectedResponse(format!("no presigned URL for part {part_number}"))
    })
}

async fn compensate(
    co: &Co,
    session: &mut UploadSession,
    original: ClientError,
    policy: CompensationFailure,
) -> ClientError {
    session.mark_abort_requested();
    tracing::warn!(
        target: "hybrid_http::upload",
        id = session.id(),
        error = %original,
        "upload failed, aborting"
    );

    let abort = uploads(co, "abort").call(
        Args::new()
            .kwarg("pk", session.id())
            .kwarg("upload_id", session.upload_id()),
    );
    match co.perform(abort).await {
        Ok(_) => original,
        Err(abort) => {
            tracing::error!(
                target: "hybrid_http::upload",
                id = session.id(),
                original = %original,
                abort = %abort,
                "aborting the upload failed"
            );
            match policy {
                CompensationFailure::Chain => ClientError::CompensationFailed {
                    original: Box::new(original),
                    abort: Box::new(abort),
                },
                CompensationFailure::SurfaceAbort => abort,
            }
        }
    }
}

/// Number of parts the rest of `source` splits into. Never less than one.
fn part_count<R: Seek>(source: &mut R, chunk_size: usize) -> Result<u32> {
    let position = source.stream_position()?;
    let end = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(position))?;

    let remaining = end.saturating_sub(position);
    let parts = remaining.div_ceil(chunk_size as u64).max(1);
    u32::try_from(parts).map_err(|_| {
        ClientError::InvalidArgument(format!(
            "source of {remaining} bytes needs {parts} parts of {chunk_size} bytes"
        ))
    })
}

fn read_chunk<R: Read>(source: &mut R, chunk_size: usize) -> Result<Bytes> {
    let mut buffer = Vec::with_capacity(chunk_size.min(8 * 1024 * 1024));
    Read::take(&mut *source, chunk_size as u64).read_to_end(&mut buffer)?;
    Ok(Bytes::from(buffer))
}
