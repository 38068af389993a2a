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
use std::path::Path;
use std::time::Duration;

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;
use url::Url;

use super::audio::Audio;
use super::error::ConfigError;

const DEFAULT_REFRESH_RATE: f64 = 60.0;
const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_VOICES: usize = 32;
const DEFAULT_EVENT_BUFFER: usize = 64;

/// The configuration for the sample engine.
#[derive(Deserialize, Clone, Debug)]
pub struct Engine {
    /// The audio output configuration.
    audio: Audio,

    /// Base URL that relative sample URLs are resolved against.
    base_url: Option<String>,

    /// How many times per second the audio clock is broadcast (default: 60).
    refresh_rate: Option<f64>,

    /// Timeout for a single sample fetch, e.g. "10s" (default: 10s).
    fetch_timeout: Option<String>,

    /// Maximum number of voices mixed at once (default: 32).
    max_voices: Option<usize>,

    /// Capacity of the outbound event channel (default: 64).
    event_buffer: Option<usize>,
}

impl Engine {
    /// Creates an engine configuration with defaults for everything but the audio output.
    pub fn new(audio: Audio) -> Engine {
        Engine {
            audio,
            base_url: None,
            refresh_rate: None,
            fetch_timeout: None,
            max_voices: None,
            event_buffer: None,
        }
    }

    /// Parse an engine configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Engine, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Engine>()?)
    }

    /// Sets the base URL for relative sample URLs.
    pub fn with_base_url(mut self, base_url: &str) -> Engine {
        self.base_url = Some(base_url.to_string());
        self
    }

    /// Sets the clock broadcast rate in Hz.
    pub fn with_refresh_rate(mut self, refresh_rate: f64) -> Engine {
        self.refresh_rate = Some(refresh_rate);
        self
    }

    /// Returns the audio output configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// Returns the parsed base URL, if one is configured.
    pub fn base_url(&self) -> Result<Option<Url>, ConfigError> {
        self.base_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Returns the clock broadcast rate in Hz (default: 60).
    pub fn refresh_rate(&self) -> Result<f64, ConfigError> {
        let rate = self.refresh_rate.unwrap_or(DEFAULT_REFRESH_RATE);
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigError::RefreshRate(rate));
        }
        Ok(rate)
    }

    /// Returns the time between two clock broadcasts. Rates whose interval
    /// rounds to zero or does not fit in a `Duration` are rejected.
    pub fn refresh_interval(&self) -> Result<Duration, ConfigError> {
        let rate = self.refresh_rate()?;
        match Duration::try_from_secs_f64(1.0 / rate) {
            Ok(interval) if !interval.is_zero() => Ok(interval),
            _ => Err(ConfigError::RefreshRate(rate)),
        }
    }

    /// Returns the sample fetch timeout (default: 10s).
    pub fn fetch_timeout(&self) -> Result<Duration, ConfigError> {
        match &self.fetch_timeout {
            Some(timeout) => DurationString::from_string(timeout.clone())
                .map(Duration::from)
                .map_err(|e| ConfigError::Duration {
                    value: timeout.clone(),
                    reason: e.to_string(),
                }),
            None => Ok(DEFAULT_FETCH_TIMEOUT),
        }
    }

    /// Returns the voice limit (default: 32).
    pub fn max_voices(&self) -> usize {
        self.max_voices.unwrap_or(DEFAULT_MAX_VOICES).max(1)
    }

    /// Returns the outbound event channel capacity (default: 64).
    pub fn event_buffer(&self) -> usize {
        self.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER).max(1)
    }
}
