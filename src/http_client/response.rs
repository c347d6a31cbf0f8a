//! Successful fetch result.

use std::collections::HashMap;

/// Body and metadata of a successful (HTTP 200) fetch.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub url: String,
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    /// Number of attempts it took, starting at 1.
    pub attempts: u32,
}

impl FetchedDocument {
    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// First `max_bytes` of a body as lossy UTF-8, for log previews.
pub(crate) fn body_preview(body: &[u8], max_bytes: usize) -> String {
    let end = body.len().min(max_bytes);
    String::from_utf8_lossy(&body[..end]).into_owned()
}
