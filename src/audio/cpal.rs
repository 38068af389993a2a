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
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use parking_lot::Mutex;
use tracing::{error, info, span, Level};

use super::{
    error::AudioError,
    format::{OutputFormat, SampleFormat},
    mixer::AudioMixer,
    thread_priority::configure_render_thread_priority,
    DeviceInfo,
};
use crate::config;

/// How often the output thread checks whether it should shut the stream down.
const STREAM_KEEPALIVE_POLL: Duration = Duration::from_millis(100);

/// A small wrapper around a cpal::Device. The mixer is rendered directly in the
/// CPAL callback, so the mixer's frame counter follows the hardware.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The maximum number of channels the device supports.
    max_channels: u16,
    /// The host ID of the device.
    host_id: cpal::HostId,
    /// The format the stream was opened with.
    format: OutputFormat,
    /// The mixer rendered by the stream.
    mixer: AudioMixer,
    /// Set to stop the output thread.
    stopped: Arc<AtomicBool>,
    /// Owns the stream. CPAL streams are not Send on every platform, so the
    /// stream lives on this thread for its whole life.
    output_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (Channels={}) ({})",
            self.name,
            self.max_channels,
            self.host_id.name()
        )
    }
}

/// f32 callback: render directly into the CPAL buffer.
fn create_f32_callback(
    mixer: AudioMixer,
    thread_priority: Option<u8>,
) -> impl FnMut(&mut [f32], &cpal::OutputCallbackInfo) + Send + 'static {
    let channels = mixer.num_channels() as usize;
    let mut priority_set = false;
    move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
        if !priority_set {
            configure_render_thread_priority(thread_priority);
            priority_set = true;
        }
        let frames = data.len() / channels;
        mixer.process_into_output(data, frames);
    }
}

/// Integer callback: render into a scratch buffer and convert.
fn create_int_callback<T>(
    mixer: AudioMixer,
    thread_priority: Option<u8>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: SizedSample + Sample + FromSample<f32>,
{
    let channels = mixer.num_channels() as usize;
    let mut scratch: Vec<f32> = Vec::new();
    let mut priority_set = false;
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        if !priority_set {
            configure_render_thread_priority(thread_priority);
            priority_set = true;
        }
        if scratch.len() < data.len() {
            scratch.resize(data.len(), 0.0);
        }
        let frames = data.len() / channels;
        mixer.process_into_output(&mut scratch, frames);
        for (dst, &src) in data.iter_mut().zip(scratch.iter()) {
            *dst = T::from_sample(src.clamp(-1.0, 1.0));
        }
    }
}

/// Builds the output stream for the requested format.
fn build_stream(
    device: &cpal::Device,
    format: &OutputFormat,
    buffer_size: usize,
    mixer: AudioMixer,
    thread_priority: Option<u8>,
) -> Result<cpal::Stream, AudioError> {
    let stream_config = cpal::StreamConfig {
        channels: format.channels,
        sample_rate: cpal::SampleRate(format.sample_rate),
        buffer_size: cpal::BufferSize::Fixed(buffer_size as u32),
    };
    let on_error = |err: cpal::StreamError| error!("CPAL output stream error: {}", err);

    let stream = match (format.sample_format, format.bits_per_sample) {
        (SampleFormat::Float, _) => device.build_output_stream(
            &stream_config,
            create_f32_callback(mixer, thread_priority),
            on_error,
            None,
        )?,
        (SampleFormat::Int, 16) => device.build_output_stream(
            &stream_config,
            create_int_callback::<i16>(mixer, thread_priority),
            on_error,
            None,
        )?,
        (SampleFormat::Int, 32) => device.build_output_stream(
            &stream_config,
            create_int_callback::<i32>(mixer, thread_priority),
            on_error,
            None,
        )?,
        (SampleFormat::Int, bits) => return Err(AudioError::UnsupportedBitDepth(bits)),
    };
    Ok(stream)
}

impl Device {
    /// Lists cpal output devices.
    pub fn list() -> Result<Vec<DeviceInfo>, AudioError> {
        Ok(Device::list_cpal_devices()?
            .into_iter()
            .map(|(name, host_id, max_channels, _)| DeviceInfo {
                name,
                host: host_id.name().to_string(),
                max_channels,
            })
            .collect())
    }

    /// Lists cpal devices with at least one output channel.
    fn list_cpal_devices() -> Result<Vec<(String, cpal::HostId, u16, cpal::Device)>, AudioError> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut devices = Vec::new();
        for host_id in cpal::available_hosts() {
            let host_devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(host_devices) => host_devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in host_devices {
                let Ok(output_configs) = device.supported_output_configs() else {
                    continue;
                };
                let max_channels = output_configs
                    .map(|config| config.channels())
                    .max()
                    .unwrap_or(0);

                if max_channels > 0 {
                    devices.push((device.name()?, host_id, max_channels, device));
                }
            }
        }

        devices.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(devices)
    }

    /// Opens the given cpal device and starts rendering `mixer` through it.
    pub fn get(
        config: &config::Audio,
        format: OutputFormat,
        mixer: AudioMixer,
    ) -> Result<Device, AudioError> {
        let name = config.device();
        let (name, host_id, max_channels, device) = Device::list_cpal_devices()?
            .into_iter()
            .find(|(device_name, ..)| device_name.trim() == name)
            .ok_or_else(|| AudioError::NoDevice(name.to_string()))?;

        if max_channels < format.channels {
            return Err(AudioError::NotEnoughChannels {
                device: name,
                requested: format.channels,
                available: max_channels,
            });
        }

        let stopped = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = mpsc::channel::<Result<(), AudioError>>();

        let output_thread = {
            let format = format.clone();
            let mixer = mixer.clone();
            let stopped = stopped.clone();
            let buffer_size = config.buffer_size();
            let thread_priority = config.thread_priority();
            let device_name = name.clone();
            thread::Builder::new()
                .name("cpal-output".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "render (cpal)", device = device_name);
                    let _enter = span.enter();

                    let stream =
                        match build_stream(&device, &format, buffer_size, mixer, thread_priority)
                            .and_then(|stream| {
                                stream.play()?;
                                Ok(stream)
                            }) {
                            Ok(stream) => stream,
                            Err(e) => {
                                let _ = started_tx.send(Err(e));
                                return;
                            }
                        };

                    info!("CPAL output stream started successfully");
                    let _ = started_tx.send(Ok(()));

                    // Keep the stream alive until the device is dropped.
                    while !stopped.load(Ordering::Relaxed) {
                        thread::sleep(STREAM_KEEPALIVE_POLL);
                    }
                    drop(stream);
                    info!("CPAL output stream stopped");
                })?
        };

        // The thread reports back once the stream is playing or has failed.
        started_rx.recv().map_err(|_| AudioError::OutputThread)??;

        Ok(Device {
            name,
            max_channels,
            host_id,
            format,
            mixer,
            stopped,
            output_thread: Mutex::new(Some(output_thread)),
        })
    }
}

impl super::Device for Device {
    fn mixer(&self) -> &AudioMixer {
        &self.mixer
    }

    fn format(&self) -> &OutputFormat {
        &self.format
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        if let Some(thread) = self.output_thread.lock().take() {
            let _ = thread.join();
        }
    }
}
