use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use super::redirect::PathIdTracker;
use super::traits::{ContentProbe, FetchedDocument, ResolvedTarget};

/// `reqwest`-backed probe client. No cookies, one fixed timeout.
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
    redirect_limit: usize,
}

impl HttpProbe {
    pub fn new(timeout: Duration, redirect_limit: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::limited(redirect_limit))
            .build()?;
        Ok(Self {
            client,
            timeout,
            redirect_limit,
        })
    }

    /// Client for a single redirect walk whose policy reports every hop to `tracker`.
    fn tracking_client(&self, tracker: PathIdTracker) -> Result<Client> {
        let limit = self.redirect_limit;
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() > limit {
                return attempt.error("too many redirects");
            }
            tracker.observe(attempt.url());
            attempt.follow()
        });
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(policy)
            .build()?;
        Ok(client)
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| anyhow!("invalid url {}: {}", url, e))
}

#[async_trait]
impl ContentProbe for HttpProbe {
    async fn head(&self, url: &str) -> Result<u16> {
        let target = parse_url(url)?;
        let resp = self.client.head(target).send().await?;
        let status = resp.status().as_u16();
        debug!("head probe url={} status={}", url, status);
        Ok(status)
    }

    async fn follow(&self, url: &str) -> Result<ResolvedTarget> {
        let start = parse_url(url)?;
        let tracker = PathIdTracker::new();
        tracker.observe(&start);

        let client = self.tracking_client(tracker.clone())?;
        let resp = client.get(start).send().await.map_err(|e| {
            warn!("redirect walk failed url={}: {}", url, e);
            anyhow!("redirect walk failed: {}", e)
        })?;

        let status = resp.status();
        let final_url = resp.url().clone();
        tracker.observe(&final_url);

        // A 3xx the transport did not follow still names the next hop.
        if status.is_redirection() {
            if let Some(loc) = resp
                .headers()
                .get(header::LOCATION)
                .and_then(|v| v.to_str().ok())
            {
                if let Ok(next) = Url::parse(loc).or_else(|_| final_url.join(loc)) {
                    tracker.observe(&next);
                }
            }
        }

        debug!(
            "redirect walk start={} final={} status={}",
            url,
            final_url,
            status.as_u16()
        );

        Ok(ResolvedTarget {
            final_url: final_url.to_string(),
            status: status.as_u16(),
            path_id_url: tracker.last_url().map(|u| u.to_string()),
        })
    }

    async fn get(&self, url: &str) -> Result<FetchedDocument> {
        let target = parse_url(url)?;
        let resp = self.client.get(target).send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        debug!("get url={} status={} bytes={}", url, status, body.len());
        Ok(FetchedDocument { status, body })
    }
}
