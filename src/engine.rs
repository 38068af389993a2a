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

//! The command boundary: one engine owns the output device, the sample
//! cache, the loader, the scheduler and the clock loop, and turns inbound
//! commands into work on them.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::audio::{self, AudioError, Device};
use crate::clock::{AudioClock, ClockLoop, ClockSource};
use crate::config::{self, ConfigError};
use crate::samples::{LoadError, PlaybackScheduler, SampleCache, SampleLoader};

/// Commands sent into the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Start broadcasting the audio clock.
    StartAudioClock,
    /// Stop broadcasting the audio clock.
    StopAudioClock,
    /// Fetch and cache the sample at `url` under `key`.
    LoadSample { key: String, url: String },
    /// Play the sample cached under `key` at `when` seconds on the audio clock.
    PlaySample { key: String, when: f64 },
}

/// Events sent out of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    /// The audio clock, in seconds. Sent once per refresh tick while the
    /// clock is running.
    AudioClockUpdate(f64),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Loader(#[from] LoadError),
}

/// The sample engine.
pub struct Engine {
    device: Arc<dyn Device>,
    clock: AudioClock,
    cache: Arc<SampleCache>,
    loader: SampleLoader,
    scheduler: PlaybackScheduler,
    clock_loop: ClockLoop,
}

impl Engine {
    /// Opens the configured output device and builds an engine around it.
    /// Returns the engine and the receiving end of its event channel.
    pub fn new(config: &config::Engine) -> Result<(Engine, mpsc::Receiver<Event>), EngineError> {
        let device = audio::get_device(config.audio(), config.max_voices())?;
        Engine::with_device(config, device)
    }

    /// Builds an engine around an already opened device.
    pub fn with_device(
        config: &config::Engine,
        device: Arc<dyn Device>,
    ) -> Result<(Engine, mpsc::Receiver<Event>), EngineError> {
        let mixer = device.mixer().clone();
        let clock = AudioClock::new(mixer.clone());
        let cache = Arc::new(SampleCache::new());

        let loader = SampleLoader::new(
            cache.clone(),
            mixer.sample_rate(),
            config.base_url()?,
            config.fetch_timeout()?,
        )?;
        let scheduler = PlaybackScheduler::new(cache.clone(), clock.clone(), mixer.voice_sender());

        let (events_tx, events_rx) = mpsc::channel(config.event_buffer());
        let clock_loop = ClockLoop::new(
            Arc::new(clock.clone()),
            config.refresh_interval()?,
            events_tx,
        );

        info!(device = %device, "Sample engine ready");

        Ok((
            Engine {
                device,
                clock,
                cache,
                loader,
                scheduler,
                clock_loop,
            },
            events_rx,
        ))
    }

    /// Replaces the hook called with the URL of every failed load.
    pub fn with_failure_hook<F>(mut self, hook: F) -> Engine
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.loader = self.loader.with_failure_hook(hook);
        self
    }

    /// Dispatches a single command. Loads run in the background; everything
    /// else completes before this returns. Must be called within a tokio
    /// runtime.
    pub fn handle(&self, command: Command) {
        debug!(?command, "Handling command");
        match command {
            Command::StartAudioClock => self.clock_loop.start(),
            Command::StopAudioClock => self.clock_loop.stop(),
            Command::LoadSample { key, url } => {
                let loader = self.loader.clone();
                tokio::spawn(async move { loader.load(&key, &url).await });
            }
            Command::PlaySample { key, when } => self.scheduler.play(&key, when),
        }
    }

    /// Handles commands until every sender is dropped, then stops the clock.
    pub async fn run(&self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            self.handle(command);
        }
        self.clock_loop.stop();
        info!("Command channel closed, engine stopped");
    }

    /// The current audio clock, in seconds.
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn is_clock_running(&self) -> bool {
        self.clock_loop.is_running()
    }

    pub fn cache(&self) -> &Arc<SampleCache> {
        &self.cache
    }

    pub fn loader(&self) -> &SampleLoader {
        &self.loader
    }

    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("device", &self.device.to_string())
            .field("loader", &self.loader)
            .field("clock_running", &self.is_clock_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use url::Url;

    use super::*;
    use crate::testutil::{audio::wav_bytes, eventually_async};

    fn engine() -> (Engine, mpsc::Receiver<Event>) {
        let config =
            config::Engine::new(config::Audio::new("mock-engine")).with_refresh_rate(100.0);
        Engine::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_clock_updates_are_monotonic() {
        let (engine, mut events) = engine();
        engine.handle(Command::StartAudioClock);
        engine.handle(Command::StartAudioClock);
        assert!(engine.is_clock_running());

        let mut last = 0.0;
        for _ in 0..5 {
            let Some(Event::AudioClockUpdate(ts)) = events.recv().await else {
                panic!("event channel closed");
            };
            assert!(ts >= last);
            last = ts;
        }
        assert!(last > 0.0);

        engine.handle(Command::StopAudioClock);
        engine.handle(Command::StopAudioClock);
        assert!(!engine.is_clock_running());
    }

    #[tokio::test]
    async fn test_load_and_play() {
        let mut file = tempfile::Builder::new().suffix(".wav").tempfile().unwrap();
        file.write_all(&wav_bytes(&[0.5; 4410], 1, 44100)).unwrap();
        let url = Url::from_file_path(file.path()).unwrap().to_string();

        let (engine, _events) = engine();
        engine.handle(Command::LoadSample {
            key: "Kick".to_string(),
            url,
        });
        eventually_async(
            || async { engine.cache().has("Kick") },
            "Kick was never loaded",
        )
        .await;

        let mixer = engine.device().mixer().clone();
        engine.handle(Command::PlaySample {
            key: "Kick".to_string(),
            when: engine.now() + 0.05,
        });
        eventually_async(
            || async { mixer.active_voice_count() == 1 },
            "Kick was never scheduled",
        )
        .await;
        eventually_async(
            || async { mixer.active_voice_count() == 0 },
            "Kick never finished playing",
        )
        .await;
    }

    #[tokio::test]
    async fn test_play_missing_key_is_ignored() {
        let (engine, _events) = engine();
        engine.handle(Command::PlaySample {
            key: "nonexistent".to_string(),
            when: 0.0,
        });
        assert!(engine.cache().is_empty());
        assert_eq!(engine.device().mixer().active_voice_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_load_calls_hook() {
        let failures = Arc::new(AtomicUsize::new(0));
        let counter = failures.clone();
        let (engine, _events) = engine();
        let engine = engine.with_failure_hook(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.handle(Command::LoadSample {
            key: "Kick".to_string(),
            url: "file:///nonexistent/samplecue/kick.wav".to_string(),
        });
        eventually_async(
            || async { failures.load(Ordering::SeqCst) == 1 },
            "Failure hook was never called",
        )
        .await;
        assert!(!engine.cache().has("Kick"));
    }

    #[tokio::test]
    async fn test_run_stops_clock_when_commands_close() {
        let (engine, mut events) = engine();
        let (tx, rx) = mpsc::channel(8);

        tx.send(Command::StartAudioClock).await.unwrap();
        drop(tx);
        engine.run(rx).await;

        assert!(!engine.is_clock_running());
        // The clock may have ticked before it was stopped, but not after.
        while events.try_recv().is_ok() {}
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(events.try_recv().is_err());
    }
}
