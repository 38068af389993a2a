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
/// Errors raised while setting up the audio output.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("Invalid output format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported bit depth for integer output: {0}")]
    UnsupportedBitDepth(u16),

    #[error("No device found with name {0}")]
    NoDevice(String),

    #[error("Device {device} only has {available} channels, {requested} requested")]
    NotEnoughChannels {
        device: String,
        requested: u16,
        available: u16,
    },

    #[error("Unable to enumerate audio hosts: {0}")]
    Host(#[from] cpal::HostUnavailable),

    #[error("Unable to read device name: {0}")]
    DeviceName(#[from] cpal::DeviceNameError),

    #[error("Unable to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("Unable to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("Output thread exited before the stream started")]
    OutputThread,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
