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

use symphonia::core::audio::{AudioBuffer, AudioBufferRef};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};

use super::DecodeError;
use crate::buffer::SampleBuffer;

/// Decodes a complete byte blob through symphonia into one in-memory
/// buffer. This is the format-agnostic decode capability: it handles
/// whatever formats symphonia was built with.
pub(super) fn decode_bytes(bytes: &[u8], name: Option<&str>) -> Result<SampleBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    // The file name only hints the probe; it never selects a path.
    let mut hint = Hint::new();
    if let Some(extension) = name.and_then(|n| n.rsplit('.').next()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();
    let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DecodeError::UnsupportedStream("no audio track found".to_string()))?;

    let track_id = track.id;
    let params = &track.codec_params;
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedStream("sample rate not specified".to_string()))?;

    let decoder_opts: DecoderOptions = Default::default();
    let mut decoder = get_codecs().make(params, &decoder_opts)?;

    // Channel count comes from metadata when present, otherwise from the
    // first decoded packet.
    let mut channels: Vec<Vec<f32>> = params
        .channels
        .map(|c| vec![Vec::new(); c.count()])
        .unwrap_or_default();

    loop {
        let packet = match format_reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(SymphoniaError::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // Some decoders report EOF as a decode error.
            Err(SymphoniaError::DecodeError(_)) => break,
            Err(e) => return Err(DecodeError::Audio(e)),
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
            Err(e) => return Err(DecodeError::Audio(e)),
        };

        append_decoded(&mut channels, decoded);
    }

    if channels.iter().all(|c| c.is_empty()) {
        return Err(DecodeError::EmptyStream);
    }

    Ok(SampleBuffer::from_planar(
        channels,
        super::sanitize_sample_rate(sample_rate as f64),
    ))
}

/// Appends a decoded packet's planes to the planar accumulator, converting
/// every supported sample format to f32 in [-1, 1].
fn append_decoded(channels: &mut Vec<Vec<f32>>, decoded: AudioBufferRef) {
    match decoded {
        AudioBufferRef::F32(buf) => append_planes(channels, &buf, |s| s),
        AudioBufferRef::F64(buf) => append_planes(channels, &buf, |s| s as f32),
        AudioBufferRef::S8(buf) => append_planes(channels, &buf, scale_s8),
        AudioBufferRef::S16(buf) => append_planes(channels, &buf, scale_s16),
        AudioBufferRef::S24(buf) => append_planes(channels, &buf, |s| scale_s24(s.inner())),
        AudioBufferRef::S32(buf) => append_planes(channels, &buf, scale_s32),
        AudioBufferRef::U8(buf) => append_planes(channels, &buf, scale_u8),
        AudioBufferRef::U16(buf) => append_planes(channels, &buf, scale_u16),
        AudioBufferRef::U24(buf) => append_planes(channels, &buf, |s| scale_u24(s.inner())),
        AudioBufferRef::U32(buf) => append_planes(channels, &buf, scale_u32),
    }
}

fn append_planes<T, F>(channels: &mut Vec<Vec<f32>>, buf: &AudioBuffer<T>, convert: F)
where
    T: symphonia::core::sample::Sample,
    F: Fn(T) -> f32,
{
    let decoded_channels = buf.spec().channels.count();
    if channels.len() < decoded_channels {
        channels.resize(decoded_channels, Vec::new());
    }

    let planes = buf.planes();
    for (ch_idx, plane) in planes.planes().iter().enumerate().take(channels.len()) {
        channels[ch_idx].extend(plane.iter().map(|&s| convert(s)));
    }
}

#[inline]
pub(crate) fn scale_s8(sample: i8) -> f32 {
    sample as f32 / (1i64 << 7) as f32
}

#[inline]
pub(crate) fn scale_s16(sample: i16) -> f32 {
    sample as f32 / (1i64 << 15) as f32
}

#[inline]
pub(crate) fn scale_s24(sample: i32) -> f32 {
    sample as f32 / (1i64 << 23) as f32
}

#[inline]
pub(crate) fn scale_s32(sample: i32) -> f32 {
    sample as f32 / (1i64 << 31) as f32
}

#[inline]
pub(crate) fn scale_u8(sample: u8) -> f32 {
    (sample as f32 / u8::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u16(sample: u16) -> f32 {
    (sample as f32 / u16::MAX as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u24(sample: u32) -> f32 {
    let max = (1u32 << 24) - 1;
    (sample as f32 / max as f32) * 2.0 - 1.0
}

#[inline]
pub(crate) fn scale_u32(sample: u32) -> f32 {
    (sample as f32 / u32::MAX as f32) * 2.0 - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_scaling_bounds() {
        assert_eq!(scale_s8(i8::MIN), -1.0);
        assert!((scale_s8(i8::MAX) - 1.0).abs() < 0.01);
        assert_eq!(scale_s16(i16::MIN), -1.0);
        assert_eq!(scale_s16(0), 0.0);
        assert_eq!(scale_s32(i32::MIN), -1.0);
    }

    #[test]
    fn test_unsigned_scaling_is_centered() {
        assert_eq!(scale_u8(0), -1.0);
        assert_eq!(scale_u8(u8::MAX), 1.0);
        assert!(scale_u16(u16::MAX / 2).abs() < 0.001);
        assert_eq!(scale_u32(u32::MAX), 1.0);
    }

    #[test]
    fn test_decode_stereo_wav_preserves_channels() {
        let left = vec![0.5f32; 1024];
        let right = vec![-0.5f32; 1024];
        let buffer = SampleBuffer::from_planar(vec![left, right], 48000);
        let bytes = crate::wav::encode(&buffer);

        let decoded = decode_bytes(&bytes, Some("stereo.wav")).expect("decode failed");
        assert_eq!(decoded.channel_count(), 2);
        assert_eq!(decoded.len(), 1024);
        assert!((decoded.channel(0)[0] - 0.5).abs() < 2.0 / 32768.0);
        assert!((decoded.channel(1)[0] + 0.5).abs() < 2.0 / 32768.0);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_bytes(&[0u8; 32], None).is_err());
    }
}
