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

//! Self-contained AIFF/AIFC parser used when the native decode capability
//! cannot interpret a file.
//!
//! The container is a FORM chunk holding (id, big-endian u32 size,
//! payload) sub-chunks, each padded to an even size. Only two chunks
//! matter here: COMM (channel count, frame count, bit depth, sample rate
//! as an 80-bit extended float, and for AIFC a compression tag) and SSND
//! (data offset plus the interleaved sample bytes). Anything this parser
//! does not support is a soft mismatch: `parse` returns `None` and the
//! caller surfaces the native decoder's error instead.

use crate::buffer::SampleBuffer;

/// Exponent bias of the 80-bit extended float format.
const EXTENDED_FLOAT_BIAS: i32 = 16383;

/// Highest sample width the parser accepts, in bits.
const MAX_BIT_DEPTH: u16 = 32;

/// Attempts to parse the bytes as AIFF/AIFC. Returns `None` when the
/// layout does not match or uses an unsupported feature.
pub(super) fn parse(bytes: &[u8]) -> Option<SampleBuffer> {
    if bytes.len() < 12 {
        return None;
    }
    if &bytes[0..4] != b"FORM" {
        return None;
    }
    let format = &bytes[8..12];
    if format != b"AIFF" && format != b"AIFC" {
        return None;
    }

    let mut offset = 12usize;
    let mut channel_count = 0usize;
    let mut frame_count = 0usize;
    let mut bit_depth = 0u16;
    let mut sample_rate = 44100.0f64;
    let mut compression = *b"NONE";
    let mut sound_data_start: Option<usize> = None;

    while offset + 8 <= bytes.len() {
        let chunk_id = &bytes[offset..offset + 4];
        let chunk_size = read_u32_be(bytes, offset + 4)? as usize;
        let chunk_start = offset + 8;

        match chunk_id {
            b"COMM" => {
                channel_count = read_u16_be(bytes, chunk_start)? as usize;
                frame_count = read_u32_be(bytes, chunk_start + 2)? as usize;
                bit_depth = read_u16_be(bytes, chunk_start + 6)?;
                let rate = read_extended_float(bytes, chunk_start + 8)?;
                if rate != 0.0 {
                    sample_rate = rate;
                }
                if format == b"AIFC" && chunk_size >= 22 {
                    compression = bytes
                        .get(chunk_start + 18..chunk_start + 22)?
                        .try_into()
                        .ok()?;
                }
            }
            b"SSND" => {
                let data_offset = read_u32_be(bytes, chunk_start)? as usize;
                // Block size follows the offset; unused here.
                sound_data_start = Some(chunk_start + 8 + data_offset);
            }
            _ => {}
        }

        offset = chunk_start + chunk_size + (chunk_size % 2);
    }

    let sound_data_start = sound_data_start?;
    if channel_count == 0 || frame_count == 0 || bit_depth == 0 {
        return None;
    }
    if bit_depth > MAX_BIT_DEPTH {
        return None;
    }
    let little_endian = match &compression {
        b"NONE" => false,
        b"sowt" => true,
        _ => return None,
    };

    let bytes_per_sample = (bit_depth as usize).div_ceil(8).max(1);
    let total_bytes = frame_count
        .checked_mul(channel_count)?
        .checked_mul(bytes_per_sample)?;
    if sound_data_start.checked_add(total_bytes)? > bytes.len() {
        return None;
    }

    let mut channels = vec![Vec::with_capacity(frame_count); channel_count];
    for (ch_idx, channel) in channels.iter_mut().enumerate() {
        for frame in 0..frame_count {
            let sample_index = frame * channel_count + ch_idx;
            let byte_offset = sound_data_start + sample_index * bytes_per_sample;
            channel.push(read_sample(
                bytes,
                byte_offset,
                bytes_per_sample,
                little_endian,
            ));
        }
    }

    Some(SampleBuffer::from_planar(
        channels,
        super::sanitize_sample_rate(sample_rate),
    ))
}

fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_be_bytes(
        bytes.get(offset..offset + 2)?.try_into().ok()?,
    ))
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_be_bytes(
        bytes.get(offset..offset + 4)?.try_into().ok()?,
    ))
}

/// Reconstructs an 80-bit extended-precision float: a sign bit, a 15-bit
/// exponent biased by 16383, and a 64-bit mantissa read as two words.
fn read_extended_float(bytes: &[u8], offset: usize) -> Option<f64> {
    let exponent_word = read_u16_be(bytes, offset)?;
    let hi = read_u32_be(bytes, offset + 2)?;
    let lo = read_u32_be(bytes, offset + 6)?;

    if exponent_word == 0 && hi == 0 && lo == 0 {
        return Some(0.0);
    }

    let sign = if exponent_word & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = (exponent_word & 0x7FFF) as i32 - EXTENDED_FLOAT_BIAS;
    let value =
        hi as f64 * 2f64.powi(exponent - 31) + lo as f64 * 2f64.powi(exponent - 63);
    Some(sign * value)
}

/// Reads one interleaved sample and normalizes it to [-1, 1] by the full
/// scale of its width.
fn read_sample(bytes: &[u8], offset: usize, bytes_per_sample: usize, little_endian: bool) -> f32 {
    match bytes_per_sample {
        1 => bytes
            .get(offset)
            .map(|&b| b as i8 as f32 / (1i64 << 7) as f32)
            .unwrap_or(0.0),
        2 => read_i16(bytes, offset, little_endian) as f32 / (1i64 << 15) as f32,
        3 => read_i24(bytes, offset, little_endian) as f32 / (1i64 << 23) as f32,
        4 => read_i32(bytes, offset, little_endian) as f32 / (1i64 << 31) as f32,
        _ => 0.0,
    }
}

fn read_i16(bytes: &[u8], offset: usize, little_endian: bool) -> i16 {
    let Some(pair) = bytes.get(offset..offset + 2) else {
        return 0;
    };
    let raw: [u8; 2] = pair.try_into().unwrap_or([0; 2]);
    if little_endian {
        i16::from_le_bytes(raw)
    } else {
        i16::from_be_bytes(raw)
    }
}

fn read_i24(bytes: &[u8], offset: usize, little_endian: bool) -> i32 {
    let Some(triplet) = bytes.get(offset..offset + 3) else {
        return 0;
    };
    let value = if little_endian {
        (triplet[0] as u32) | ((triplet[1] as u32) << 8) | ((triplet[2] as u32) << 16)
    } else {
        ((triplet[0] as u32) << 16) | ((triplet[1] as u32) << 8) | (triplet[2] as u32)
    };
    // Sign-extend from 24 bits.
    if value & 0x80_0000 != 0 {
        (value | 0xFF00_0000) as i32
    } else {
        value as i32
    }
}

fn read_i32(bytes: &[u8], offset: usize, little_endian: bool) -> i32 {
    let Some(quad) = bytes.get(offset..offset + 4) else {
        return 0;
    };
    let raw: [u8; 4] = quad.try_into().unwrap_or([0; 4]);
    if little_endian {
        i32::from_le_bytes(raw)
    } else {
        i32::from_be_bytes(raw)
    }
}
