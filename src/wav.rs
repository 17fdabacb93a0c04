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

//! 16-bit PCM WAV encoding.
//!
//! The container is byte-exact: a fixed 44-byte RIFF/WAVE header followed
//! by interleaved little-endian samples. Buffers are always written as
//! 16-bit PCM regardless of their internal float precision.

use crate::buffer::SampleBuffer;

/// PCM format tag in the fmt chunk.
const FORMAT_PCM: u16 = 1;

/// Output bit depth; the encoder always writes 16-bit samples.
const BIT_DEPTH: u16 = 16;

/// Size of the RIFF/WAVE header in bytes.
const HEADER_LEN: usize = 44;

/// Encodes a buffer as a complete WAV byte blob.
pub fn encode(buffer: &SampleBuffer) -> Vec<u8> {
    let channel_count = buffer.channel_count() as u16;
    let frames = buffer.len();
    let block_align = channel_count * (BIT_DEPTH / 8);
    let data_len = frames as u32 * block_align as u32;
    let byte_rate = buffer.sample_rate() * block_align as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channel_count.to_le_bytes());
    out.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BIT_DEPTH.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..frames {
        for channel in buffer.channels() {
            out.extend_from_slice(&quantize(channel[frame]).to_le_bytes());
        }
    }

    out
}

/// Converts a float sample to a signed 16-bit value. Negative values scale
/// by 32768 and non-negative by 32767 so the result stays in range without
/// folding full-scale peaks.
fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_quantize_scaling() {
        assert_eq!(quantize(-1.0), -32768);
        assert_eq!(quantize(1.0), 32767);
        assert_eq!(quantize(0.0), 0);
        assert_eq!(quantize(0.5), 16383);
        assert_eq!(quantize(-0.5), -16384);
        // Out-of-range input clamps rather than wrapping.
        assert_eq!(quantize(2.0), 32767);
        assert_eq!(quantize(-2.0), -32768);
    }

    #[test]
    fn test_header_layout() {
        let buffer = SampleBuffer::silent(2, 100, 48000);
        let bytes = encode(&buffer);

        assert_eq!(bytes.len(), 44 + 100 * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        // fmt chunk size, format tag, channels.
        assert_eq!(u32::from_le_bytes(bytes[16..20].try_into().unwrap()), 16);
        assert_eq!(u16::from_le_bytes(bytes[20..22].try_into().unwrap()), 1);
        assert_eq!(u16::from_le_bytes(bytes[22..24].try_into().unwrap()), 2);
        // Sample rate, byte rate, block align, bit depth.
        assert_eq!(
            u32::from_le_bytes(bytes[24..28].try_into().unwrap()),
            48000
        );
        assert_eq!(
            u32::from_le_bytes(bytes[28..32].try_into().unwrap()),
            48000 * 4
        );
        assert_eq!(u16::from_le_bytes(bytes[32..34].try_into().unwrap()), 4);
        assert_eq!(u16::from_le_bytes(bytes[34..36].try_into().unwrap()), 16);
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(
            u32::from_le_bytes(bytes[40..44].try_into().unwrap()),
            100 * 2 * 2
        );
    }

    #[test]
    fn test_round_trip_through_standard_reader() {
        let samples: Vec<f32> = (0..1000)
            .map(|i| ((i as f32) * 0.13).sin() * 0.9)
            .collect();
        let buffer = SampleBuffer::from_planar(vec![samples.clone()], 44100);
        let bytes = encode(&buffer);

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).expect("invalid wav");
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(spec.bits_per_sample, 16);
        assert_eq!(spec.sample_format, hound::SampleFormat::Int);

        let decoded: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.unwrap() as f32 / 32768.0)
            .collect();
        assert_eq!(decoded.len(), samples.len());
        // Asymmetric encode scaling against symmetric decode scaling costs
        // slightly under one extra LSB on top of quantization.
        for (original, decoded) in samples.iter().zip(&decoded) {
            assert!((original - decoded).abs() < 2.0 / 32768.0);
        }
    }

    #[test]
    fn test_interleaving_order() {
        let buffer =
            SampleBuffer::from_planar(vec![vec![0.5, 0.5], vec![-0.5, -0.5]], 44100);
        let bytes = encode(&buffer);

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).expect("invalid wav");
        let frames: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(frames, vec![16383, -16384, 16383, -16384]);
    }
}
