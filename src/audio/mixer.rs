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
// Core mixing logic shared by the CPAL and mock devices.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use tracing::{trace, warn};

use super::voice::Voice;

/// Channel used to hand new voices to the render thread without locking.
pub type VoiceSender = Sender<Voice>;

/// Default maximum number of voices mixed at once.
pub const DEFAULT_MAX_VOICES: usize = 32;

/// Sums scheduled voices into interleaved output blocks and keeps the count of
/// rendered frames, which is the audio clock.
#[derive(Clone)]
pub struct AudioMixer {
    /// Voices that have been admitted by the render thread.
    voices: Arc<Mutex<Vec<Voice>>>,
    /// Sender half of the voice queue.
    voice_tx: VoiceSender,
    /// Receiver half of the voice queue, drained at the start of every block.
    voice_rx: Receiver<Voice>,
    /// Number of frames rendered so far.
    frames_rendered: Arc<AtomicU64>,
    /// Number of output channels.
    num_channels: u16,
    /// Sample rate.
    sample_rate: u32,
    /// Maximum number of admitted voices before the oldest is stolen.
    max_voices: usize,
}

impl AudioMixer {
    /// Creates a new audio mixer.
    pub fn new(num_channels: u16, sample_rate: u32) -> Self {
        Self::with_max_voices(num_channels, sample_rate, DEFAULT_MAX_VOICES)
    }

    /// Creates a new audio mixer with a voice limit.
    pub fn with_max_voices(num_channels: u16, sample_rate: u32, max_voices: usize) -> Self {
        let (voice_tx, voice_rx) = crossbeam_channel::unbounded();
        Self {
            voices: Arc::new(Mutex::new(Vec::new())),
            voice_tx,
            voice_rx,
            frames_rendered: Arc::new(AtomicU64::new(0)),
            num_channels,
            sample_rate,
            max_voices: max_voices.max(1),
        }
    }

    /// Returns a sender for scheduling voices.
    pub fn voice_sender(&self) -> VoiceSender {
        self.voice_tx.clone()
    }

    /// The absolute index of the next frame to be rendered.
    pub fn current_frame(&self) -> u64 {
        self.frames_rendered.load(Ordering::Acquire)
    }

    /// Gets the number of output channels
    pub fn num_channels(&self) -> u16 {
        self.num_channels
    }

    /// Gets the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of voices currently admitted (playing or waiting for their start frame).
    pub fn active_voice_count(&self) -> usize {
        self.voices.lock().len()
    }

    /// Admits queued voices, stealing the oldest when the limit is reached.
    fn admit_pending(&self, voices: &mut Vec<Voice>) {
        for voice in self.voice_rx.try_iter() {
            if voices.len() >= self.max_voices {
                if let Some(oldest) = voices.iter().map(Voice::id).min() {
                    voices.retain(|v| v.id() != oldest);
                    warn!(
                        max_voices = self.max_voices,
                        "Voice limit reached, stealing oldest"
                    );
                }
            }
            trace!(
                key = voice.key(),
                start_at_frame = voice.start_at_frame(),
                "Voice admitted"
            );
            voices.push(voice);
        }
    }

    /// Renders `num_frames` frames into the front of `output` and advances the clock.
    /// Voices scheduled for a frame that has already passed start at the first
    /// frame of this block.
    pub fn process_into_output(&self, output: &mut [f32], num_frames: usize) {
        let channels = self.num_channels as usize;
        let block = &mut output[..num_frames * channels];
        block.fill(0.0);

        let mut voices = self.voices.lock();
        self.admit_pending(&mut voices);

        let block_start = self.frames_rendered.load(Ordering::Acquire);
        for voice in voices.iter_mut() {
            voice.render(block, channels, block_start);
        }
        voices.retain(|voice| !voice.is_finished());
        drop(voices);

        self.frames_rendered
            .fetch_add(num_frames as u64, Ordering::AcqRel);
    }

    /// Renders `num_frames` frames into a new buffer.
    pub fn process_frames(&self, num_frames: usize) -> Vec<f32> {
        let mut frames = vec![0.0f32; num_frames * self.num_channels as usize];
        self.process_into_output(&mut frames, num_frames);
        frames
    }
}

impl std::fmt::Debug for AudioMixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioMixer")
            .field("num_channels", &self.num_channels)
            .field("sample_rate", &self.sample_rate)
            .field("current_frame", &self.current_frame())
            .field("active_voices", &self.active_voice_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(samples: Vec<f32>, channels: u16, start: u64) -> Voice {
        Voice::new("test", Arc::new(samples), channels, start)
    }

    #[test]
    fn test_clock_advances_with_rendering() {
        let mixer = AudioMixer::new(2, 44100);
        assert_eq!(mixer.current_frame(), 0);

        mixer.process_frames(128);
        mixer.process_frames(64);
        assert_eq!(mixer.current_frame(), 192);
    }

    #[test]
    fn test_basic_mixing() {
        let mixer = AudioMixer::new(2, 44100);
        mixer
            .voice_sender()
            .send(voice(vec![0.5, 0.3, 0.8, 0.2], 2, 0))
            .unwrap();

        let frames = mixer.process_frames(3);
        assert_eq!(frames, vec![0.5, 0.3, 0.8, 0.2, 0.0, 0.0]);
        assert_eq!(mixer.active_voice_count(), 0);
    }

    #[test]
    fn test_multiple_voice_mixing() {
        let mixer = AudioMixer::new(2, 44100);
        let tx = mixer.voice_sender();
        tx.send(voice(vec![0.5, 0.25], 2, 0)).unwrap();
        tx.send(voice(vec![0.25, 0.125], 2, 0)).unwrap();

        let frame = mixer.process_frames(1);
        assert_eq!(frame, vec![0.75, 0.375]);
    }

    #[test]
    fn test_voice_starts_on_scheduled_frame() {
        let mixer = AudioMixer::new(1, 100);
        mixer.process_frames(10);

        // Scheduled for frame 13, the fourth frame of the next block.
        mixer
            .voice_sender()
            .send(voice(vec![1.0, 1.0], 1, 13))
            .unwrap();

        let frames = mixer.process_frames(8);
        assert_eq!(frames, vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_late_voice_starts_immediately() {
        let mixer = AudioMixer::new(1, 100);
        mixer.process_frames(50);

        mixer
            .voice_sender()
            .send(voice(vec![0.5, 0.5], 1, 10))
            .unwrap();

        let frames = mixer.process_frames(4);
        assert_eq!(frames, vec![0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_voice_stealing_drops_oldest() {
        let mixer = AudioMixer::with_max_voices(1, 100, 2);
        let tx = mixer.voice_sender();

        // All three wait far in the future so none finish on their own.
        let first = voice(vec![1.0], 1, 1_000);
        let first_id = first.id();
        tx.send(first).unwrap();
        tx.send(voice(vec![1.0], 1, 1_000)).unwrap();
        tx.send(voice(vec![1.0], 1, 1_000)).unwrap();

        mixer.process_frames(1);
        assert_eq!(mixer.active_voice_count(), 2);
        assert!(mixer.voices.lock().iter().all(|v| v.id() != first_id));
    }
}
