use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;
use tracing::debug;

use cuebell_core::SourceError;

/// A payload read back from the cache.
#[derive(Debug, Clone)]
pub struct CachedPayload {
    pub value: Value,
    /// Younger than the TTL (always true when the TTL is disabled).
    pub fresh: bool,
}

/// On-disk copy of raw schedule payloads, one file per schedule URL:
/// `<root>/<url path>.json`.
#[derive(Debug, Clone)]
pub struct ScheduleCache {
    root: PathBuf,
    ttl: Option<Duration>,
}

impl ScheduleCache {
    /// `ttl_minutes == 0` keeps entries fresh forever.
    pub fn new(root: impl Into<PathBuf>, ttl_minutes: u64) -> Self {
        Self {
            root: root.into(),
            ttl: (ttl_minutes > 0).then(|| Duration::from_secs(ttl_minutes * 60)),
        }
    }

    /// Cache file for `url`. The URL path must be non-empty and may not
    /// climb out of the cache root.
    pub fn path_for(&self, url: &str) -> Result<PathBuf, SourceError> {
        let parsed = Url::parse(url).map_err(|e| SourceError::Fetch {
            url: url.to_string(),
            reason: format!("invalid url: {e}"),
        })?;

        let rel = parsed.path().trim_matches('/');
        let rel_path = Path::new(rel);
        let escapes = rel_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if rel.is_empty() || escapes || rel.split('/').any(|seg| seg == "..") {
            return Err(SourceError::Cache(format!(
                "refusing cache path for {url}"
            )));
        }

        Ok(self.root.join(format!("{rel}.json")))
    }

    /// Read the cached payload for `url`, if any.
    pub async fn read(&self, url: &str) -> Result<Option<CachedPayload>, SourceError> {
        let path = self.path_for(url)?;
        let meta = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SourceError::Cache(format!("{}: {e}", path.display()))),
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| SourceError::Cache(format!("{}: {e}", path.display())))?;
        let value: Value = serde_json::from_slice(&bytes)
            .map_err(|e| SourceError::Cache(format!("{}: {e}", path.display())))?;

        let fresh = match (self.ttl, meta.modified()) {
            (None, _) => true,
            (Some(ttl), Ok(modified)) => modified
                .elapsed()
                // mtime in the future: treat as just written
                .map(|age| age <= ttl)
                .unwrap_or(true),
            (Some(_), Err(_)) => false,
        };
        debug!(path = %path.display(), fresh, "schedule cache hit");
        Ok(Some(CachedPayload { value, fresh }))
    }

    /// Store `value` as the cached payload for `url`, replacing any previous copy.
    pub async fn write(&self, url: &str, value: &Value) -> Result<PathBuf, SourceError> {
        let path = self.path_for(url)?;
        let cache_err = |e: std::io::Error| SourceError::Cache(format!("{}: {e}", path.display()));

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(cache_err)?;
        }
        let body = serde_json::to_vec_pretty(value)
            .map_err(|e| SourceError::Cache(e.to_string()))?;

        // write-then-rename so a reader never sees a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body).await.map_err(cache_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(cache_err)?;
        debug!(path = %path.display(), "schedule cached");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::SystemTime;

    #[test]
    fn path_mirrors_url_path() {
        let cache = ScheduleCache::new("/var/cache/cuebell", 60);
        let p = cache.path_for("https://horaro.example/marathon/summer").unwrap();
        assert_eq!(p, PathBuf::from("/var/cache/cuebell/marathon/summer.json"));
    }

    #[test]
    fn traversal_and_empty_paths_are_rejected() {
        let cache = ScheduleCache::new("/tmp/c", 60);
        for url in [
            "https://h.example/a/../../etc/passwd",
            "https://h.example/a/%2e%2e/%2e%2e/etc/passwd",
        ] {
            if let Ok(p) = cache.path_for(url) {
                assert!(p.starts_with("/tmp/c"), "{url} escaped to {}", p.display());
            }
        }
        assert!(matches!(
            cache.path_for("https://h.example/"),
            Err(SourceError::Cache(_))
        ));
        assert!(matches!(
            cache.path_for("not a url"),
            Err(SourceError::Fetch { .. })
        ));
    }

    #[tokio::test]
    async fn write_then_read_is_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ScheduleCache::new(dir.path(), 60);
        let url = "https://h.example/org/event";

        assert!(cache.read(url).await.unwrap().is_none());
        let path = cache.write(url, &json!({ "schedule": { "name": "x" } })).await.unwrap();
        assert!(path.ends_with("org/event.json"));

        let hit = cache.read(url).await.unwrap().unwrap();
        assert!(hit.fresh);
        assert_eq!(hit.value["schedule"]["name"], "x");
    }

    #[tokio::test]
    async fn old_file_is_stale_unless_ttl_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let url = "https://h.example/org/old";
        let cache = ScheduleCache::new(dir.path(), 60);
        let path = cache.write(url, &json!({})).await.unwrap();

        let two_hours_ago = SystemTime::now() - Duration::from_secs(2 * 3600);
        std::fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(two_hours_ago)
            .unwrap();

        assert!(!cache.read(url).await.unwrap().unwrap().fresh);

        let forever = ScheduleCache::new(dir.path(), 0);
        assert!(forever.read(url).await.unwrap().unwrap().fresh);
    }
}
