//! Server-side upload session bookkeeping.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// A part the object store has accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    #[serde(rename = "ETag")]
    pub etag: String,
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    AbortRequested,
    Completed,
}

/// Presigned part URLs fetched ahead of use.
#[derive(Debug, Clone, Default)]
pub struct PresignedUrlCache {
    urls: BTreeMap<u32, String>,
    window: usize,
}

impl PresignedUrlCache {
    pub fn new(window: usize) -> Self {
        Self {
            urls: BTreeMap::new(),
            window,
        }
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Remove and return the URL for `part_number`.
    pub fn take(&mut self, part_number: u32) -> Option<String> {
        self.urls.remove(&part_number)
    }

    /// Merge a `{"<part number>": "<url>"}` map answering a request for
    /// `requested`. Every requested part must be present; entries that were
    /// not requested are ignored.
    pub fn merge(
        &mut self,
        requested: &[u32],
        urls: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<()> {
        if self.urls.len() + requested.len() > self.window {
            return Err(ClientError::InvalidState(format!(
                "presigned URL cache would exceed its window of {}",
                self.window
            )));
        }
        for part_number in requested {
            let url = urls
                .get(&part_number.to_string())
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    ClientError::UnexpectedResponse(format!(
                        "no presigned URL returned for part {part_number}"
                    ))
                })?;
            self.urls.insert(*part_number, url.to_string());
        }
        Ok(())
    }
}

/// State of one multipart upload.
#[derive(Debug, Clone)]
pub struct UploadSession {
    id: String,
    upload_id: String,
    parts: Vec<CompletedPart>,
    urls: PresignedUrlCache,
    state: SessionState,
}

impl UploadSession {
    pub fn new(id: impl Into<String>, upload_id: impl Into<String>, window: usize) -> Self {
        Self {
            id: id.into(),
            upload_id: upload_id.into(),
            parts: Vec::new(),
            urls: PresignedUrlCache::new(window),
            state: SessionState::Open,
        }
    }

    /// Build a session from the create-upload response.
    pub fn from_created(created: &serde_json::Value, window: usize) -> Result<Self> {
        let field = |names: &[&str]| {
            names.iter().find_map(|name| match created.get(*name)? {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };
        let id = field(&["id", "pk"]).ok_or_else(|| {
            ClientError::UnexpectedResponse("create upload response has no `id`".to_string())
        })?;
        let upload_id = field(&["upload_id"]).ok_or_else(|| {
            ClientError::UnexpectedResponse(
                "create upload response has no `upload_id`".to_string(),
            )
        })?;
        Ok(Self::new(id, upload_id, window))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }

    pub fn parts(&self) -> &[CompletedPart] {
        &self.parts
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn urls(&self) -> &PresignedUrlCache {
        &self.urls
    }

    pub fn urls_mut(&mut self) -> &mut PresignedUrlCache {
        &mut self.urls
    }

    /// Record an accepted part. Parts must arrive in order, starting at 1.
    pub fn record_part(&mut self, part_number: u32, etag: impl Into<String>) -> Result<()> {
        if self.state != SessionState::Open {
            return Err(ClientError::InvalidState(format!(
                "cannot record part {part_number}: session is {:?}",
                self.state
            )));
        }
        let expected = self.parts.last().map_or(1, |p| p.part_number + 1);
        if part_number != expected {
            return Err(ClientError::InvalidState(format!(
                "part {part_number} recorded out of order, expected {expected}"
            )));
        }
        self.parts.push(CompletedPart {
            etag: etag.into(),
            part_number,
        });
        Ok(())
    }

    pub fn mark_abort_requested(&mut self) {
        self.state = SessionState::AbortRequested;
    }

    pub fn mark_completed(&mut self) {
        self.state = SessionState::Completed;
    }

    /// JSON list of the recorded parts, as the complete call expects.
    pub fn parts_payload(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.parts).map_err(ClientError::from)
    }
}
