use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, info, warn};

use cuebell_core::{config::ScheduleConfig, ScheduleDocument, ScheduleSource, SourceError};

use crate::{cache::ScheduleCache, horaro::parse_document};

/// Schedule source backed by the schedule host's JSON export plus a disk cache.
pub struct HttpScheduleSource {
    client: reqwest::Client,
    cache: ScheduleCache,
    fetch_delay: Duration,
}

impl HttpScheduleSource {
    pub fn new(cfg: &ScheduleConfig) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.fetch_timeout_secs))
            .user_agent(concat!("cuebell/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, cfg))
    }

    pub fn with_client(client: reqwest::Client, cfg: &ScheduleConfig) -> Self {
        Self {
            client,
            cache: ScheduleCache::new(&cfg.cache_dir, cfg.cache_ttl_minutes),
            fetch_delay: Duration::from_millis(cfg.fetch_delay_ms),
        }
    }

    pub fn cache(&self) -> &ScheduleCache {
        &self.cache
    }

    /// Cached document when fresh, otherwise a fetch.
    ///
    /// If the fetch fails for any reason other than a 404 and an expired copy
    /// exists, the expired copy is returned.
    pub async fn load(&self, url: &str) -> Result<ScheduleDocument, SourceError> {
        let cached = match self.cache.read(url).await {
            Ok(c) => c,
            Err(e @ SourceError::Fetch { .. }) => return Err(e),
            Err(e) => {
                warn!(%url, error = %e, "unreadable cache entry, refetching");
                None
            }
        };

        if let Some(hit) = &cached {
            if hit.fresh {
                return parse_document(url, &hit.value);
            }
        }

        match self.refresh(url).await {
            Ok(doc) => Ok(doc),
            Err(e @ SourceError::Fetch { .. }) => match cached {
                Some(stale) => {
                    warn!(%url, error = %e, "fetch failed, serving stale schedule");
                    parse_document(url, &stale.value)
                }
                None => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    /// Fetch `url` now and rewrite its cache entry.
    ///
    /// A payload that does not parse is not cached.
    pub async fn refresh(&self, url: &str) -> Result<ScheduleDocument, SourceError> {
        // validate the cache path before touching the network
        self.cache.path_for(url)?;

        let payload = self.fetch(url).await?;
        let doc = parse_document(url, &payload)?;
        if let Err(e) = self.cache.write(url, &payload).await {
            warn!(%url, error = %e, "failed to cache schedule");
        }
        Ok(doc)
    }

    /// Refresh each URL in turn, pausing between requests. Returns how many
    /// were fetched and cached.
    pub async fn prefetch(&self, urls: &[String]) -> usize {
        let mut ok = 0;
        for (i, url) in urls.iter().enumerate() {
            if i > 0 && !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
            match self.refresh(url).await {
                Ok(_) => ok += 1,
                Err(e) => warn!(%url, error = %e, "prefetch failed"),
            }
        }
        info!(requested = urls.len(), cached = ok, "prefetch complete");
        ok
    }

    async fn fetch(&self, url: &str) -> Result<Value, SourceError> {
        let json_url = format!("{}.json", url.trim_end_matches('/'));
        let fetch_err = |reason: String| SourceError::Fetch {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(&json_url)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;

        if let Some(err) = status_error(url, resp.status()) {
            warn!(%json_url, status = resp.status().as_u16(), "schedule fetch rejected");
            return Err(err);
        }

        let value = resp
            .json::<Value>()
            .await
            .map_err(|e| SourceError::Parse {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        debug!(%json_url, "fetched schedule");
        Ok(value)
    }
}

/// Map a non-success HTTP status to the matching error.
fn status_error(url: &str, status: StatusCode) -> Option<SourceError> {
    if status.is_success() {
        None
    } else if status == StatusCode::NOT_FOUND {
        Some(SourceError::NotFound {
            url: url.to_string(),
        })
    } else {
        Some(SourceError::Fetch {
            url: url.to_string(),
            reason: format!("HTTP {status}"),
        })
    }
}

#[async_trait]
impl ScheduleSource for HttpScheduleSource {
    async fn get(&self, url: &str) -> Result<ScheduleDocument, SourceError> {
        self.load(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::SystemTime;

    // nothing listens on the discard port, so fetches fail fast
    const DEAD_HOST: &str = "http://127.0.0.1:9";

    fn config(dir: &std::path::Path, ttl: u64) -> ScheduleConfig {
        ScheduleConfig {
            cache_dir: dir.to_string_lossy().into_owned(),
            cache_ttl_minutes: ttl,
            fetch_timeout_secs: 2,
            fetch_delay_ms: 0,
        }
    }

    fn payload(name: &str) -> Value {
        json!({
            "schedule": {
                "name": name,
                "timezone": "UTC",
                "start": "2026-08-01T10:00:00Z",
                "columns": ["Game"],
                "items": [
                    { "scheduled": "2026-08-01T10:00:00Z", "length_t": 600, "data": ["Opening"] }
                ]
            }
        })
    }

    #[test]
    fn statuses_map_to_errors() {
        assert!(status_error("u", StatusCode::OK).is_none());
        assert!(matches!(
            status_error("u", StatusCode::NOT_FOUND),
            Some(SourceError::NotFound { .. })
        ));
        assert!(matches!(
            status_error("u", StatusCode::BAD_GATEWAY),
            Some(SourceError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn fresh_cache_is_served_without_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpScheduleSource::new(&config(dir.path(), 60)).unwrap();
        let url = format!("{DEAD_HOST}/org/cached");
        source.cache().write(&url, &payload("Cached")).await.unwrap();

        let doc = ScheduleSource::get(&source, &url).await.unwrap();
        assert_eq!(doc.name, "Cached");
    }

    #[tokio::test]
    async fn stale_cache_is_served_when_fetch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpScheduleSource::new(&config(dir.path(), 1)).unwrap();
        let url = format!("{DEAD_HOST}/org/stale");
        let path = source.cache().write(&url, &payload("Stale")).await.unwrap();
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(SystemTime::now() - Duration::from_secs(3600))
            .unwrap();

        let doc = source.load(&url).await.unwrap();
        assert_eq!(doc.name, "Stale");
    }

    #[tokio::test]
    async fn fetch_failure_without_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpScheduleSource::new(&config(dir.path(), 60)).unwrap();
        let err = source.load(&format!("{DEAD_HOST}/org/none")).await.unwrap_err();
        assert!(matches!(err, SourceError::Fetch { .. }));
    }

    #[tokio::test]
    async fn prefetch_counts_successes_only() {
        let dir = tempfile::tempdir().unwrap();
        let source = HttpScheduleSource::new(&config(dir.path(), 60)).unwrap();
        let urls = vec![
            format!("{DEAD_HOST}/org/a"),
            format!("{DEAD_HOST}/org/b"),
        ];
        assert_eq!(source.prefetch(&urls).await, 0);
        assert!(source.cache().read(&urls[0]).await.unwrap().is_none());
    }
}
