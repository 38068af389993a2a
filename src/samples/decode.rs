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
use std::{fmt, io::Cursor, sync::Arc, time::Duration};

use bytes::Bytes;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, info};

use super::error::DecodeError;

/// A decoded sample, ready to play. The frames are interleaved and shared
/// between every voice that plays the sample.
#[derive(Clone)]
pub struct DecodedSample {
    data: Arc<Vec<f32>>,
    channel_count: u16,
    sample_rate: u32,
}

impl DecodedSample {
    pub fn new(data: Vec<f32>, channel_count: u16, sample_rate: u32) -> DecodedSample {
        DecodedSample {
            data: Arc::new(data),
            channel_count,
            sample_rate,
        }
    }

    /// The interleaved sample data.
    pub fn data(&self) -> &Arc<Vec<f32>> {
        &self.data
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channel_count.max(1) as usize
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frame_count() as f64 / self.sample_rate as f64)
    }

    /// Returns the memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<f32>()
    }
}

impl fmt::Debug for DecodedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedSample")
            .field("channel_count", &self.channel_count)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frame_count())
            .finish()
    }
}

/// Decodes an encoded audio payload into memory, resampling it to
/// `target_rate` when the payload's rate differs. `extension` is a hint for
/// the format probe, typically taken from the URL.
///
/// This reads the whole payload synchronously, so call it from a blocking
/// task.
pub fn decode(
    payload: Bytes,
    extension: Option<&str>,
    target_rate: u32,
) -> Result<DecodedSample, DecodeError> {
    if payload.is_empty() {
        return Err(DecodeError::Empty);
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;
    let track_id = track.id;
    let source_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::NoSampleRate)?;
    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut samples = Vec::new();
    let mut channel_count = 0;
    while let Some((decoded, channels)) =
        decode_next_packet(format_reader.as_mut(), decoder.as_mut(), track_id)?
    {
        channel_count = channels;
        samples.extend_from_slice(&decoded);
    }

    if channel_count == 0 || samples.is_empty() {
        return Err(DecodeError::NoFrames);
    }
    let channel_count = channel_count as u16;

    let samples = if source_rate != target_rate {
        debug!(
            source_rate,
            target_rate, "Resampling sample to the output rate"
        );
        resample(&samples, channel_count, source_rate, target_rate)
    } else {
        samples
    };

    let sample = DecodedSample::new(samples, channel_count, target_rate);
    info!(
        channels = channel_count,
        sample_rate = target_rate,
        frames = sample.frame_count(),
        "Decoded sample"
    );
    Ok(sample)
}

/// Reads the next packet for the track. `Ok(None)` at the end of the stream.
fn next_packet(format_reader: &mut dyn FormatReader) -> Result<Option<Packet>, SymphoniaError> {
    match format_reader.next_packet() {
        Ok(packet) => Ok(Some(packet)),
        Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Ok(None)
        }
        // Some demuxers report the end of the stream as a decode error.
        Err(SymphoniaError::DecodeError(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Decodes the next non-empty packet for `track_id` into interleaved f32
/// samples, resetting the decoder when the stream asks for it.
fn decode_next_packet(
    format_reader: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
) -> Result<Option<(Vec<f32>, usize)>, SymphoniaError> {
    loop {
        let packet = match next_packet(format_reader) {
            Ok(Some(packet)) => packet,
            Ok(None) => return Ok(None),
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                decoder.decode(&packet)?
            }
            // A corrupt packet is skipped, not fatal.
            Err(SymphoniaError::DecodeError(e)) => {
                debug!(error = e, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e),
        };

        let (samples, channels) = interleave(decoded);
        if channels > 0 && !samples.is_empty() {
            return Ok(Some((samples, channels)));
        }
    }
}

/// Converts a decoded buffer to interleaved f32 in [-1, 1].
fn interleave(decoded: AudioBufferRef) -> (Vec<f32>, usize) {
    match decoded {
        AudioBufferRef::F32(buf) => interleave_planes(&buf, |s| s),
        AudioBufferRef::F64(buf) => interleave_planes(&buf, |s| s as f32),
        AudioBufferRef::S8(buf) => interleave_planes(&buf, scale_s8),
        AudioBufferRef::S16(buf) => interleave_planes(&buf, scale_s16),
        AudioBufferRef::S24(buf) => interleave_planes(&buf, |s| scale_s24(s.inner())),
        AudioBufferRef::S32(buf) => interleave_planes(&buf, scale_s32),
        AudioBufferRef::U8(buf) => interleave_planes(&buf, scale_u8),
        AudioBufferRef::U16(buf) => interleave_planes(&buf, scale_u16),
        AudioBufferRef::U24(buf) => interleave_planes(&buf, |s| scale_u24(s.inner())),
        AudioBufferRef::U32(buf) => interleave_planes(&buf, scale_u32),
    }
}

fn interleave_planes<T, F>(buf: &AudioBuffer<T>, convert: F) -> (Vec<f32>, usize)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let frames = buf.frames();
    let channels = buf.spec().channels.count();
    let planes = buf.planes();
    let planes = planes.planes();
    let mut samples = Vec::with_capacity(frames * channels);
    for frame in 0..frames {
        for plane in planes.iter().take(channels) {
            samples.push(convert(plane[frame]));
        }
    }
    (samples, channels)
}

#[inline]
fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// Resamples interleaved audio with linear interpolation. Good enough for
/// one-shots and drum hits.
pub(crate) fn resample(
    samples: &[f32],
    channel_count: u16,
    source_rate: u32,
    target_rate: u32,
) -> Vec<f32> {
    let channels = channel_count.max(1) as usize;
    let ratio = target_rate as f64 / source_rate as f64;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::audio::{wav_bytes, wav_bytes_i16};

    #[test]
    fn test_decode_float_wav() {
        let payload = wav_bytes(&[0.5, -0.5, 0.25, 0.0], 1, 44100);
        let sample = decode(Bytes::from(payload), Some("wav"), 44100).unwrap();

        assert_eq!(sample.channel_count(), 1);
        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.data().as_slice(), &[0.5, -0.5, 0.25, 0.0]);
        assert_eq!(sample.memory_size(), 16);
    }

    #[test]
    fn test_decode_int_wav_is_scaled() {
        // Stereo, two frames.
        let payload = wav_bytes_i16(&[i16::MAX, i16::MIN, 0, 16384], 2, 48000);
        let sample = decode(Bytes::from(payload), None, 48000).unwrap();

        assert_eq!(sample.channel_count(), 2);
        assert_eq!(sample.frame_count(), 2);
        let data = sample.data();
        assert!((data[0] - 1.0).abs() < 0.001);
        assert_eq!(data[1], -1.0);
        assert_eq!(data[2], 0.0);
        assert_eq!(data[3], 0.5);
    }

    #[test]
    fn test_decode_resamples_to_target_rate() {
        let payload = wav_bytes(&vec![0.25; 22050], 1, 22050);
        let sample = decode(Bytes::from(payload), Some("wav"), 44100).unwrap();

        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.frame_count(), 44100);
        assert!((sample.duration().as_secs_f64() - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(matches!(
            decode(Bytes::new(), Some("wav"), 44100),
            Err(DecodeError::Empty)
        ));
    }

    #[test]
    fn test_decode_garbage() {
        let payload = Bytes::from_static(b"<html>definitely not audio</html>");
        assert!(decode(payload, None, 44100).is_err());
    }

    #[test]
    fn test_resample_up() {
        let source: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44100.0).sin())
            .collect();

        let result = resample(&source, 1, 44100, 48000);

        let expected_len = (4410.0_f64 * 48000.0 / 44100.0).ceil() as usize;
        assert_eq!(result.len(), expected_len);
    }

    #[test]
    fn test_resample_keeps_channels_apart() {
        // L=1.0, R=-1.0 throughout.
        let source = vec![1.0f32, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];

        let result = resample(&source, 2, 44100, 48000);

        assert!(result.len() >= 8);
        assert!(result.chunks(2).all(|frame| frame[0] == 1.0 && frame[1] == -1.0));
    }

    #[test]
    fn test_scaling() {
        assert_eq!(scale_s16(0), 0.0);
        assert_eq!(scale_s16(i16::MIN), -1.0);
        assert_eq!(scale_s8(i8::MIN), -1.0);
        assert_eq!(scale_s24(-(1 << 23)), -1.0);
        assert_eq!(scale_u8(0), -1.0);
        assert_eq!(scale_u8(u8::MAX), 1.0);
        assert_eq!(scale_u16(u16::MAX), 1.0);
    }
}
