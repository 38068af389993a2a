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
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::SampleCache;
use crate::audio::{Voice, VoiceSender};
use crate::clock::AudioClock;

/// Starts cached samples on the output at a given time on the audio clock.
pub struct PlaybackScheduler {
    cache: Arc<SampleCache>,
    clock: AudioClock,
    voices: VoiceSender,
}

impl PlaybackScheduler {
    pub fn new(cache: Arc<SampleCache>, clock: AudioClock, voices: VoiceSender) -> Self {
        PlaybackScheduler {
            cache,
            clock,
            voices,
        }
    }

    /// Plays the sample cached under `key` starting at `when` seconds on the
    /// audio clock. Times in the past, negative or NaN start immediately.
    /// A key with nothing cached is ignored.
    pub fn play(&self, key: &str, when: f64) {
        let Some(sample) = self.cache.get(key) else {
            debug!(key, "No sample cached for key, ignoring play");
            return;
        };

        let now = self.clock.current_frame();
        let start_frame = self.start_frame(when).max(now);
        let voice = Voice::new(
            key,
            sample.data().clone(),
            sample.channel_count(),
            start_frame,
        );

        debug!(
            key,
            when,
            start_frame,
            frames_ahead = start_frame - now,
            voice_id = voice.id(),
            "Scheduling sample"
        );

        if self.voices.send(voice).is_err() {
            warn!(key, "Output has shut down, dropping voice");
        }
    }

    /// Converts a time on the audio clock to an absolute frame.
    fn start_frame(&self, when: f64) -> u64 {
        if !when.is_finite() || when <= 0.0 {
            return 0;
        }
        (when * self.clock.sample_rate() as f64).round() as u64
    }
}
