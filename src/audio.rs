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

//! Audio output: the shared mixer and the devices that render it.

use std::{fmt, sync::Arc};

use crate::config;

pub mod cpal;
mod error;
pub mod format;
pub mod mixer;
pub mod mock;
mod thread_priority;
pub mod voice;

pub use error::AudioError;
pub use format::{OutputFormat, SampleFormat};
pub use mixer::{AudioMixer, VoiceSender};
pub use voice::Voice;

/// An output sink. Every device owns exactly one mixer, renders it continuously
/// from its own thread, and advances the mixer's frame counter as it goes.
pub trait Device: fmt::Display + Send + Sync {
    /// The mixer rendered by this device.
    fn mixer(&self) -> &AudioMixer;

    /// The format the device renders at.
    fn format(&self) -> &OutputFormat;
}

/// Describes an output device found on the system.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    /// The device name, as used in the configuration.
    pub name: String,
    /// The name of the audio host the device belongs to.
    pub host: String,
    /// The largest channel count the device supports.
    pub max_channels: u16,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name, self.max_channels, self.host
        )
    }
}

/// Lists the output devices available on this system.
pub fn list_devices() -> Result<Vec<DeviceInfo>, AudioError> {
    cpal::Device::list()
}

/// Opens the configured device. Names starting with "mock" open a mock device
/// that renders in real time without hardware.
pub fn get_device(config: &config::Audio, max_voices: usize) -> Result<Arc<dyn Device>, AudioError> {
    let format = config.output_format()?;
    let mixer = AudioMixer::with_max_voices(format.channels, format.sample_rate, max_voices);

    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::start(
            device,
            format,
            mixer,
            config.buffer_size(),
            config.thread_priority(),
        )?));
    }

    Ok(Arc::new(cpal::Device::get(config, format, mixer)?))
}
