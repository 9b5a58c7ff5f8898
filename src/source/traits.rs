use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use super::redirect::extract_path_id;

/// Outcome of following a redirect chain to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    /// URL of the terminal response.
    pub final_url: String,
    /// Status of the terminal response.
    pub status: u16,
    /// Most recent URL in the chain whose query carried a `pathid` key.
    pub path_id_url: Option<String>,
}

impl ResolvedTarget {
    pub fn path_id(&self) -> Option<String> {
        self.path_id_url.as_deref().and_then(extract_path_id)
    }
}

/// A fully read response body.
pub struct FetchedDocument {
    pub status: u16,
    pub body: Bytes,
}

/// Network probes issued by the resolution engine.
///
/// Every error (DNS, connect, timeout, redirect limit) is returned as `Err`;
/// callers treat it exactly like a rejected status.
#[async_trait]
pub trait ContentProbe: Send + Sync {
    /// HEAD request; returns the final status after redirects.
    async fn head(&self, url: &str) -> Result<u16>;
    /// GET request following redirects, without reading the body.
    async fn follow(&self, url: &str) -> Result<ResolvedTarget>;
    /// GET request reading the whole body.
    async fn get(&self, url: &str) -> Result<FetchedDocument>;
}
