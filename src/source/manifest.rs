use anyhow::{anyhow, Result};
use serde::Deserialize;

/// Remote manifest naming the real content source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub url: String,
}

impl Manifest {
    /// Parse a UTF-8 JSON manifest. Any shape other than `{"url": "..."}`,
    /// or an empty `url`, is rejected.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|e| anyhow!("manifest is not utf-8: {}", e))?;
        let manifest: Manifest =
            serde_json::from_str(text).map_err(|e| anyhow!("malformed manifest: {}", e))?;
        if manifest.url.trim().is_empty() {
            return Err(anyhow!("manifest url is empty"));
        }
        Ok(manifest)
    }
}
