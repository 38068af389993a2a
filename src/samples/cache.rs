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
use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::debug;

use super::decode::DecodedSample;

/// Decoded samples by key. Entries are written once and never replaced or
/// evicted. Also tracks which keys are currently being loaded so that a key
/// is only fetched once at a time.
#[derive(Default)]
pub struct SampleCache {
    entries: RwLock<HashMap<String, DecodedSample>>,
    /// Dropping a sender wakes every load waiting on that key.
    in_flight: Mutex<HashMap<String, watch::Sender<()>>>,
}

/// The outcome of [`SampleCache::begin_load`].
#[derive(Debug)]
pub enum LoadClaim {
    /// The caller now holds the claim and must call [`SampleCache::finish_load`].
    Claimed,
    /// The key already has an entry.
    Cached,
    /// Another load holds the claim. The receiver closes when that load
    /// finishes, whether or not it stored an entry.
    InFlight(watch::Receiver<()>),
}

impl LoadClaim {
    /// Waits for the load holding the claim to finish. Returns immediately
    /// for any other outcome.
    pub async fn finished(self) {
        if let LoadClaim::InFlight(mut done) = self {
            // Nothing is ever sent, so this only returns once the sender is dropped.
            let _ = done.changed().await;
        }
    }
}

impl SampleCache {
    pub fn new() -> SampleCache {
        SampleCache::default()
    }

    /// Returns true if a sample is cached under `key`.
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Returns the sample cached under `key`. The sample data is shared, not copied.
    pub fn get(&self, key: &str) -> Option<DecodedSample> {
        self.entries.read().get(key).cloned()
    }

    /// Caches `sample` under `key` unless the key already has an entry.
    /// Returns whether the sample was stored.
    pub fn put(&self, key: &str, sample: DecodedSample) -> bool {
        let mut entries = self.entries.write();
        if entries.contains_key(key) {
            debug!(key, "Sample already cached, keeping the first");
            return false;
        }
        entries.insert(key.to_string(), sample);
        true
    }

    /// Tries to claim `key` for loading.
    pub fn begin_load(&self, key: &str) -> LoadClaim {
        let mut in_flight = self.in_flight.lock();
        if self.has(key) {
            return LoadClaim::Cached;
        }
        if let Some(done) = in_flight.get(key) {
            return LoadClaim::InFlight(done.subscribe());
        }
        in_flight.insert(key.to_string(), watch::Sender::new(()));
        LoadClaim::Claimed
    }

    /// Releases the claim taken by [`SampleCache::begin_load`] and wakes any
    /// loads waiting on it.
    pub fn finish_load(&self, key: &str) {
        self.in_flight.lock().remove(key);
    }

    /// Returns true while a load for `key` holds the claim.
    pub fn is_loading(&self, key: &str) -> bool {
        self.in_flight.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// The cached keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Total bytes held by cached samples.
    pub fn memory_usage(&self) -> usize {
        self.entries
            .read()
            .values()
            .map(DecodedSample::memory_size)
            .sum()
    }
}

impl std::fmt::Debug for SampleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleCache")
            .field("samples", &self.keys())
            .field("loading", &self.in_flight.lock().len())
            .field("total_memory_kb", &(self.memory_usage() / 1024))
            .finish()
    }
}
