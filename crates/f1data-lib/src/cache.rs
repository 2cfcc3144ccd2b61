//! On-disk cache of upstream API responses.
//!
//! The cache is enabled once at start-up with [`ResponseCache::enable`] and
//! handed to the provider, which owns it for the life of the process. Entries
//! are keyed by the SHA-256 of the request URL.
//!
//! Responses about finished seasons are [`Freshness::Settled`] and are served
//! for as long as the file exists. Anything about the current or a future
//! season is [`Freshness::Live`] and is refetched once the file is older than
//! the cache's max age (12 hours unless `F1DATA_CACHE_MAX_AGE` says otherwise).

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{Datelike, Utc};
use directories::BaseDirs;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

const CACHE_DIR_NAME: &str = "f1data";
const CACHE_DIR_ENV: &str = "F1DATA_CACHE_DIR";
const FALLBACK_CACHE_DIR: &str = ".f1data_cache";
const MAX_AGE_ENV: &str = "F1DATA_CACHE_MAX_AGE";

pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// How long a cached response may be served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Results of a finished season do not change.
    Settled,
    /// Subject to the cache's max age.
    Live,
}

impl Freshness {
    /// Seasons before the current calendar year are settled.
    pub fn for_season(year: i32) -> Self {
        if year < Utc::now().year() {
            Freshness::Settled
        } else {
            Freshness::Live
        }
    }
}

/// `F1DATA_CACHE_MAX_AGE` in seconds, or [`DEFAULT_MAX_AGE`].
fn max_age_from_env() -> Duration {
    env::var(MAX_AGE_ENV)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_MAX_AGE)
}

/// Resolve the default cache directory.
///
/// Honors `F1DATA_CACHE_DIR`, then the platform cache directory, and finally
/// falls back to `.f1data_cache` relative to the working directory.
pub fn default_cache_dir() -> PathBuf {
    if let Some(override_dir) = env::var_os(CACHE_DIR_ENV) {
        return PathBuf::from(override_dir);
    }

    match BaseDirs::new() {
        Some(dirs) => dirs.cache_dir().join(CACHE_DIR_NAME),
        None => PathBuf::from(FALLBACK_CACHE_DIR),
    }
}

/// Handle to an enabled response cache directory.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
    max_age: Duration,
}

impl ResponseCache {
    /// Enable the cache rooted at `dir`, creating the directory if needed.
    pub fn enable(dir: impl AsRef<Path>) -> Result<Self> {
        let root = dir.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|source| Error::CacheInit {
            path: root.clone(),
            source,
        })?;
        let max_age = max_age_from_env();
        info!(
            path = %root.display(),
            max_age_secs = max_age.as_secs(),
            "response cache enabled"
        );
        Ok(Self { root, max_age })
    }

    pub fn with_max_age(self, max_age: Duration) -> Self {
        Self { max_age, ..self }
    }

    /// Directory the cache writes into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Cached body for `url`, unless absent or, for live data, older than
    /// the max age.
    pub fn get(&self, url: &str, freshness: Freshness) -> Option<Vec<u8>> {
        let path = self.entry_path(url);
        if freshness == Freshness::Live && self.is_stale(&path) {
            debug!(url, path = %path.display(), "cached response expired, refetching");
            return None;
        }

        match fs::read(&path) {
            Ok(bytes) => {
                debug!(url, path = %path.display(), "response cache hit");
                Some(bytes)
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => None,
            Err(err) => {
                warn!(url, error = %err, "failed to read cached response, refetching");
                None
            }
        }
    }

    /// Store the body for `url`, replacing any earlier entry atomically.
    pub fn put(&self, url: &str, body: &[u8]) -> Result<()> {
        let destination = self.entry_path(url);
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(body)?;
        tmp.flush()?;
        tmp.persist(&destination).map_err(|err| err.error)?;
        debug!(url, path = %destination.display(), "response cached");
        Ok(())
    }

    /// A missing file is not stale; the read that follows reports the miss.
    /// An mtime in the future counts as fresh.
    fn is_stale(&self, path: &Path) -> bool {
        let modified = match fs::metadata(path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        SystemTime::now()
            .duration_since(modified)
            .is_ok_and(|age| age > self.max_age)
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.root.join(format!("{}.json", hex::encode(digest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn enable_creates_missing_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("cache");
        let cache = ResponseCache::enable(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(cache.root(), dir.as_path());
    }

    #[test]
    fn miss_then_hit() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path()).unwrap();
        let url = "https://api.example.test/2023.json";

        assert!(cache.get(url, Freshness::Live).is_none());
        cache.put(url, br#"{"ok":true}"#).unwrap();
        assert_eq!(cache.get(url, Freshness::Live).unwrap(), br#"{"ok":true}"#.to_vec());
    }

    #[test]
    fn distinct_urls_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path()).unwrap();

        cache.put("https://a.test/x", b"a").unwrap();
        cache.put("https://a.test/y", b"b").unwrap();
        assert_eq!(cache.get("https://a.test/x", Freshness::Live).unwrap(), b"a".to_vec());
        assert_eq!(cache.get("https://a.test/y", Freshness::Live).unwrap(), b"b".to_vec());
    }

    fn age_entry(cache: &ResponseCache, url: &str, age: Duration) {
        let file = fs::File::options()
            .write(true)
            .open(cache.entry_path(url))
            .unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn live_entry_older_than_max_age_is_refetched() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path())
            .unwrap()
            .with_max_age(DEFAULT_MAX_AGE);
        let url = "https://api.example.test/2026/driverStandings.json";

        cache.put(url, br#"{"stale":true}"#).unwrap();
        age_entry(&cache, url, Duration::from_secs(90 * 24 * 60 * 60));

        assert!(cache.get(url, Freshness::Live).is_none());
        assert_eq!(
            cache.get(url, Freshness::Settled).unwrap(),
            br#"{"stale":true}"#.to_vec()
        );
    }

    #[test]
    fn live_entry_within_max_age_is_served() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path())
            .unwrap()
            .with_max_age(Duration::from_secs(3600));
        let url = "https://api.example.test/sessions?year=2026";

        cache.put(url, b"[]").unwrap();
        age_entry(&cache, url, Duration::from_secs(60));
        assert_eq!(cache.get(url, Freshness::Live).unwrap(), b"[]".to_vec());
    }

    #[test]
    fn past_seasons_are_settled() {
        let this_year = Utc::now().year();
        assert_eq!(Freshness::for_season(2019), Freshness::Settled);
        assert_eq!(Freshness::for_season(this_year - 1), Freshness::Settled);
        assert_eq!(Freshness::for_season(this_year), Freshness::Live);
        assert_eq!(Freshness::for_season(this_year + 1), Freshness::Live);
    }

    #[test]
    fn put_overwrites_existing_entry() {
        let temp = TempDir::new().unwrap();
        let cache = ResponseCache::enable(temp.path()).unwrap();

        cache.put("https://a.test/x", b"old").unwrap();
        cache.put("https://a.test/x", b"new").unwrap();
        assert_eq!(cache.get("https://a.test/x", Freshness::Live).unwrap(), b"new".to_vec());
    }
}
