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

//! One-shot playback voices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Global voice ID counter. IDs increase monotonically, so the smallest ID is
/// always the oldest voice.
static NEXT_VOICE_ID: AtomicU64 = AtomicU64::new(1);

/// A single scheduled playback of a decoded buffer. The buffer is shared with
/// the sample cache, so creating a voice never copies audio data.
pub struct Voice {
    /// Unique ID for this voice.
    id: u64,
    /// The sample key this voice plays (for logging).
    key: String,
    /// Interleaved sample data.
    data: Arc<Vec<f32>>,
    /// Number of interleaved channels in `data`.
    channel_count: u16,
    /// The absolute output frame at which playback begins.
    start_at_frame: u64,
    /// Next frame of `data` to render.
    position: usize,
}

impl Voice {
    /// Creates a voice that starts at the given output frame.
    pub fn new(key: &str, data: Arc<Vec<f32>>, channel_count: u16, start_at_frame: u64) -> Self {
        Self {
            id: NEXT_VOICE_ID.fetch_add(1, Ordering::Relaxed),
            key: key.to_string(),
            data,
            channel_count: channel_count.max(1),
            start_at_frame,
            position: 0,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn start_at_frame(&self) -> u64 {
        self.start_at_frame
    }

    /// Total length of the voice in frames.
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channel_count as usize
    }

    /// Returns true once every frame has been rendered.
    pub fn is_finished(&self) -> bool {
        self.position >= self.frame_count()
    }

    /// Mixes this voice into an interleaved output block whose first frame is
    /// the absolute output frame `block_start`.
    ///
    /// Mono voices are copied to every output channel. Otherwise source channel
    /// `n` feeds output channel `n`; source channels past the output width are
    /// dropped.
    pub fn render(&mut self, output: &mut [f32], output_channels: usize, block_start: u64) {
        if output_channels == 0 {
            return;
        }
        let block_frames = output.len() / output_channels;
        let offset = self.start_at_frame.saturating_sub(block_start);
        if offset >= block_frames as u64 {
            return;
        }

        let source_channels = self.channel_count as usize;
        let total_frames = self.frame_count();
        for frame in (offset as usize)..block_frames {
            if self.position >= total_frames {
                break;
            }
            let src = &self.data[self.position * source_channels..][..source_channels];
            let dst = &mut output[frame * output_channels..][..output_channels];
            if source_channels == 1 {
                for out in dst.iter_mut() {
                    *out += src[0];
                }
            } else {
                for (out, sample) in dst.iter_mut().zip(src.iter()) {
                    *out += *sample;
                }
            }
            self.position += 1;
        }
    }
}

impl std::fmt::Debug for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Voice")
            .field("id", &self.id)
            .field("key", &self.key)
            .field("start_at_frame", &self.start_at_frame)
            .field("position", &self.position)
            .field("frames", &self.frame_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_ids_increase() {
        let data = Arc::new(vec![0.0; 4]);
        let first = Voice::new("a", data.clone(), 1, 0);
        let second = Voice::new("a", data, 1, 0);
        assert!(second.id() > first.id());
    }

    #[test]
    fn test_mono_voice_fills_all_channels() {
        let mut voice = Voice::new("mono", Arc::new(vec![0.5, 0.25]), 1, 0);
        let mut output = vec![0.0; 6];
        voice.render(&mut output, 2, 0);

        assert_eq!(output, vec![0.5, 0.5, 0.25, 0.25, 0.0, 0.0]);
        assert!(voice.is_finished());
    }

    #[test]
    fn test_voice_waits_for_start_frame() {
        let mut voice = Voice::new("late", Arc::new(vec![1.0, 1.0]), 1, 6);

        // Entire block is before the start frame.
        let mut output = vec![0.0; 4];
        voice.render(&mut output, 1, 0);
        assert_eq!(output, vec![0.0; 4]);

        // Start lands on the third frame of the second block.
        let mut output = vec![0.0; 4];
        voice.render(&mut output, 1, 4);
        assert_eq!(output, vec![0.0, 0.0, 1.0, 1.0]);
        assert!(voice.is_finished());
    }

    #[test]
    fn test_extra_source_channels_are_dropped() {
        // Three channel source into a stereo output.
        let mut voice = Voice::new("wide", Arc::new(vec![0.1, 0.2, 0.3]), 3, 0);
        let mut output = vec![0.0; 2];
        voice.render(&mut output, 2, 0);
        assert_eq!(output, vec![0.1, 0.2]);
    }
}
