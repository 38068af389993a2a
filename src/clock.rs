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

//! The audio clock and the loop that broadcasts it.

use crate::audio::AudioMixer;

mod broadcast;

pub use broadcast::ClockLoop;

/// A monotonic time source, in seconds.
pub trait ClockSource: Send + Sync {
    /// Returns the current time. Two successive calls never go backwards.
    fn now(&self) -> f64;
}

/// The hardware clock: the number of frames the output device has rendered
/// divided by the output sample rate. Starts at zero when the device opens.
#[derive(Clone, Debug)]
pub struct AudioClock {
    mixer: AudioMixer,
}

impl AudioClock {
    pub fn new(mixer: AudioMixer) -> AudioClock {
        AudioClock { mixer }
    }

    /// The current position of the clock in frames.
    pub fn current_frame(&self) -> u64 {
        self.mixer.current_frame()
    }

    /// The sample rate the clock counts frames at.
    pub fn sample_rate(&self) -> u32 {
        self.mixer.sample_rate()
    }
}

impl ClockSource for AudioClock {
    fn now(&self) -> f64 {
        self.mixer.current_frame() as f64 / self.mixer.sample_rate() as f64
    }
}
