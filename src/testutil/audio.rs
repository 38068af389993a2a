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
use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

/// Encodes interleaved f32 samples as a 32-bit float WAV file.
pub fn wav_bytes(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    encode(samples, channels, sample_rate, 32, SampleFormat::Float)
}

/// Encodes interleaved i16 samples as a 16-bit PCM WAV file.
pub fn wav_bytes_i16(samples: &[i16], channels: u16, sample_rate: u32) -> Vec<u8> {
    encode(samples, channels, sample_rate, 16, SampleFormat::Int)
}

fn encode<S: hound::Sample + Copy>(
    samples: &[S],
    channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut writer = WavWriter::new(
        Cursor::new(&mut bytes),
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample,
            sample_format,
        },
    )
    .unwrap();

    for sample in samples {
        writer.write_sample(*sample).unwrap();
    }
    writer.finalize().unwrap();
    bytes
}
