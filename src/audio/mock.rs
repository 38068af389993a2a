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
        Arc,
    },
    thread,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info, span, Level};

use super::{
    error::AudioError, format::OutputFormat, mixer::AudioMixer,
    thread_priority::configure_render_thread_priority,
};

/// How long the render thread sleeps between checks of the wall clock.
const RENDER_POLL: Duration = Duration::from_millis(2);

/// A mock device. Renders the mixer in real time and discards the output, so
/// the audio clock advances exactly as it would on hardware.
pub struct Device {
    name: String,
    format: OutputFormat,
    mixer: AudioMixer,
    /// Set to stop the render thread.
    stopped: Arc<AtomicBool>,
    /// Handle to the render thread, joined on drop.
    render_thread: Mutex<Option<thread::JoinHandle<()>>>,
}

impl Device {
    /// Starts a mock device rendering `mixer` in blocks of `block_frames`.
    pub fn start(
        name: &str,
        format: OutputFormat,
        mixer: AudioMixer,
        block_frames: usize,
        thread_priority: Option<u8>,
    ) -> Result<Device, AudioError> {
        let stopped = Arc::new(AtomicBool::new(false));

        let render_thread = {
            let mixer = mixer.clone();
            let stopped = stopped.clone();
            let name = name.to_string();
            thread::Builder::new()
                .name("mock-render".to_string())
                .spawn(move || {
                    let span = span!(Level::INFO, "render (mock)", device = name);
                    let _enter = span.enter();
                    configure_render_thread_priority(thread_priority);
                    render_in_real_time(&mixer, block_frames, &stopped);
                })?
        };

        info!(
            device = name,
            sample_rate = format.sample_rate,
            channels = format.channels,
            "Mock device started"
        );

        Ok(Device {
            name: name.to_string(),
            format,
            mixer,
            stopped,
            render_thread: Mutex::new(Some(render_thread)),
        })
    }
}

/// Renders whole blocks until the mixer has caught up with the wall clock.
fn render_in_real_time(mixer: &AudioMixer, block_frames: usize, stopped: &AtomicBool) {
    let sample_rate = mixer.sample_rate() as f64;
    let mut scratch = vec![0.0f32; block_frames * mixer.num_channels() as usize];
    let started = Instant::now();
    let start_frame = mixer.current_frame();

    while !stopped.load(Ordering::Relaxed) {
        let due = start_frame + (started.elapsed().as_secs_f64() * sample_rate) as u64;
        while mixer.current_frame() + block_frames as u64 <= due {
            mixer.process_into_output(&mut scratch, block_frames);
        }
        thread::sleep(RENDER_POLL);
    }

    debug!("Mock render thread stopped");
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
        if let Some(thread) = self.render_thread.lock().take() {
            let _ = thread.join();
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::audio::{Device as _, Voice};
    use crate::testutil::eventually;

    #[test]
    fn test_mock_device_advances_clock() {
        let format = OutputFormat::default();
        let mixer = AudioMixer::new(format.channels, format.sample_rate);
        let device = Device::start("mock-test", format, mixer, 64, None).unwrap();

        let before = device.mixer().current_frame();
        eventually(
            || device.mixer().current_frame() > before + 441,
            "Mock device never rendered 10ms of audio",
        );
    }

    #[test]
    fn test_mock_device_plays_voices() {
        let format = OutputFormat::default();
        let mixer = AudioMixer::new(format.channels, format.sample_rate);
        let device = Device::start("mock-test", format, mixer, 64, None).unwrap();

        let start = device.mixer().current_frame();
        device
            .mixer()
            .voice_sender()
            .send(Voice::new("click", Arc::new(vec![0.5; 128]), 1, start))
            .unwrap();

        eventually(
            || device.mixer().current_frame() > start + 1024 && device.mixer().active_voice_count() == 0,
            "Voice never finished on the mock device",
        );
    }
}
