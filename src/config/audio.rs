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
use std::str::FromStr;

use serde::Deserialize;

use crate::audio::{AudioError, OutputFormat, SampleFormat};

const DEFAULT_SAMPLE_RATE: u32 = 44100;
const DEFAULT_CHANNELS: u16 = 2;
const DEFAULT_BITS_PER_SAMPLE: u16 = 32;
const DEFAULT_BUFFER_SIZE: usize = 256;

/// A YAML representation of the audio output configuration.
#[derive(Deserialize, Clone, Debug)]
pub struct Audio {
    /// The audio device. Names starting with "mock" select the mock device.
    device: String,

    /// Output sample rate in Hz (default: 44100).
    sample_rate: Option<u32>,

    /// Number of output channels (default: 2).
    channels: Option<u16>,

    /// Output sample format (default: "float").
    sample_format: Option<String>,

    /// Bits per sample for integer output (default: 32).
    bits_per_sample: Option<u16>,

    /// Frames rendered per block by the mock device and requested from CPAL
    /// (default: 256).
    buffer_size: Option<usize>,

    /// Priority (0-99) for the render thread. Left at the OS default when unset.
    thread_priority: Option<u8>,
}

impl Audio {
    /// New will create a new Audio configuration with defaults for everything but the device.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: device.to_string(),
            sample_rate: None,
            channels: None,
            sample_format: None,
            bits_per_sample: None,
            buffer_size: None,
            thread_priority: None,
        }
    }

    /// Returns the device from the configuration.
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Returns the output sample rate (default: 44100).
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// Returns the number of output channels (default: 2).
    pub fn channels(&self) -> u16 {
        self.channels.unwrap_or(DEFAULT_CHANNELS)
    }

    /// Returns the output sample format (default: Float).
    pub fn sample_format(&self) -> Result<SampleFormat, AudioError> {
        match self.sample_format.as_deref() {
            Some(format) => SampleFormat::from_str(format),
            None => Ok(SampleFormat::Float),
        }
    }

    /// Returns the bits per sample for integer output (default: 32).
    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample.unwrap_or(DEFAULT_BITS_PER_SAMPLE)
    }

    /// Returns the render block size in frames (default: 256).
    pub fn buffer_size(&self) -> usize {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE).max(1)
    }

    /// Returns the configured render thread priority, if any.
    pub fn thread_priority(&self) -> Option<u8> {
        self.thread_priority
    }

    /// Builds the validated output format.
    pub fn output_format(&self) -> Result<OutputFormat, AudioError> {
        OutputFormat::new(
            self.sample_rate(),
            self.channels(),
            self.sample_format()?,
            self.bits_per_sample(),
        )
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    #[test]
    fn test_audio_defaults() {
        let audio = Audio::new("mock-device");
        assert_eq!(audio.device(), "mock-device");
        assert_eq!(audio.sample_rate(), 44100);
        assert_eq!(audio.channels(), 2);
        assert_eq!(audio.sample_format().unwrap(), SampleFormat::Float);
        assert_eq!(audio.buffer_size(), 256);
        assert_eq!(audio.thread_priority(), None);
    }

    #[test]
    fn test_audio_deserialize() {
        let yaml = r#"
            device: UltraLite-mk5
            sample_rate: 48000
            channels: 8
            sample_format: int
            bits_per_sample: 16
            buffer_size: 128
            thread_priority: 70
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(audio.device(), "UltraLite-mk5");
        let format = audio.output_format().unwrap();
        assert_eq!(format.sample_rate, 48000);
        assert_eq!(format.channels, 8);
        assert_eq!(format.sample_format, SampleFormat::Int);
        assert_eq!(format.bits_per_sample, 16);
        assert_eq!(audio.buffer_size(), 128);
        assert_eq!(audio.thread_priority(), Some(70));
    }

    #[test]
    fn test_audio_invalid_format() {
        let yaml = r#"
            device: mock-device
            sample_format: double
        "#;

        let audio: Audio = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert!(audio.output_format().is_err());
    }
}
