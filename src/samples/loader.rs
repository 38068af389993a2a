// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Fetches and decodes samples into the cache.
//!
//! Loads never fail outward. A failed load is reported once through the
//! failure hook and leaves the cache untouched, so the same key can be loaded
//! again later.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};
use url::Url;

use super::cache::{LoadClaim, SampleCache};
use super::decode::{decode, DecodedSample};
use super::error::{DecodeError, LoadError};

/// Called with the URL of every failed load.
pub type FailureHook = Arc<dyn Fn(&str) + Send + Sync>;

fn default_failure_hook() -> FailureHook {
    Arc::new(|url: &str| warn!(url, "Unable to load the sample"))
}

/// Loads samples over HTTP (or from `file://` URLs) into a [`SampleCache`].
/// Cheap to clone; clones share the cache and the HTTP client.
#[derive(Clone)]
pub struct SampleLoader {
    cache: Arc<SampleCache>,
    client: reqwest::Client,
    /// Relative URLs are resolved against this.
    base_url: Option<Url>,
    /// Decoded samples are resampled to this rate.
    sample_rate: u32,
    on_failure: FailureHook,
}

impl SampleLoader {
    /// Creates a new sample loader that decodes samples for output at `sample_rate`.
    pub fn new(
        cache: Arc<SampleCache>,
        sample_rate: u32,
        base_url: Option<Url>,
        fetch_timeout: Duration,
    ) -> Result<SampleLoader, LoadError> {
        let client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(LoadError::Client)?;

        Ok(SampleLoader {
            cache,
            client,
            base_url,
            sample_rate,
            on_failure: default_failure_hook(),
        })
    }

    /// Replaces the failure hook.
    pub fn with_failure_hook<F>(mut self, hook: F) -> SampleLoader
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(hook);
        self
    }

    /// The cache this loader fills.
    pub fn cache(&self) -> &Arc<SampleCache> {
        &self.cache
    }

    /// Loads `url` into the cache under `key`, unless the key is already
    /// cached. If another load of the key is running, waits for it and only
    /// fetches `url` if that load failed. Failures go to the failure hook,
    /// exactly once.
    pub async fn load(&self, key: &str, url: &str) {
        if let Err(e) = self.try_load(key, url).await {
            warn!(key, url, error = %e, "Sample load failed");
            (self.on_failure)(url);
        }
    }

    /// Like [`SampleLoader::load`], but returns the failure instead of
    /// reporting it. `Ok(false)` means the load was skipped because the key
    /// was already cached, possibly by a concurrent load.
    pub async fn try_load(&self, key: &str, url: &str) -> Result<bool, LoadError> {
        loop {
            match self.cache.begin_load(key) {
                LoadClaim::Claimed => break,
                LoadClaim::Cached => {
                    debug!(key, url, "Sample already loaded, skipping");
                    return Ok(false);
                }
                claim @ LoadClaim::InFlight(_) => {
                    debug!(key, url, "Sample is being loaded, waiting");
                    claim.finished().await;
                }
            }
        }

        let loaded = self.fetch_and_decode(url).await.map(|sample| {
            info!(
                key,
                url,
                channels = sample.channel_count(),
                duration_ms = sample.duration().as_millis(),
                memory_kb = sample.memory_size() / 1024,
                "Sample loaded"
            );
            self.cache.put(key, sample)
        });

        self.cache.finish_load(key);
        loaded
    }

    /// Resolves `url` against the base URL. Absolute URLs are returned as is.
    pub fn resolve(&self, url: &str) -> Result<Url, LoadError> {
        let resolved = match &self.base_url {
            Some(base) => base.join(url),
            None => Url::parse(url),
        };
        resolved.map_err(|e| LoadError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    async fn fetch_and_decode(&self, url: &str) -> Result<DecodedSample, LoadError> {
        let resolved = self.resolve(url)?;
        let payload = self.fetch(&resolved).await?;
        debug!(url = %resolved, bytes = payload.len(), "Fetched sample");

        let extension = Path::new(resolved.path())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        let sample_rate = self.sample_rate;
        let decoded =
            tokio::task::spawn_blocking(move || decode(payload, extension.as_deref(), sample_rate))
                .await
                .map_err(DecodeError::from)
                .and_then(|decoded| decoded);

        decoded.map_err(|source| LoadError::Decode {
            url: resolved.to_string(),
            source,
        })
    }

    async fn fetch(&self, url: &Url) -> Result<Bytes, LoadError> {
        if url.scheme() == "file" {
            let path = url.to_file_path().map_err(|_| LoadError::InvalidUrl {
                url: url.to_string(),
                reason: "not a local file path".to_string(),
            })?;
            let payload = tokio::fs::read(&path).await;
            return payload
                .map(Bytes::from)
                .map_err(|source| LoadError::Io { path, source });
        }

        let transport = |source| LoadError::Transport {
            url: url.to_string(),
            source,
        };
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LoadError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.bytes().await.map_err(transport)
    }
}

impl std::fmt::Debug for SampleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleLoader")
            .field("base_url", &self.base_url.as_ref().map(Url::as_str))
            .field("sample_rate", &self.sample_rate)
            .field("cache", &self.cache)
            .finish()
    }
}
