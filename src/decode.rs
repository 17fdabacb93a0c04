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

//! Turning raw file bytes into a sample buffer.
//!
//! Decoding tries two paths in order: the native symphonia-backed decode
//! capability, then a self-contained AIFF/AIFC chunk parser for files the
//! native path cannot interpret. A fallback mismatch is soft; when both
//! paths fail, the native error is the one surfaced to the caller.

mod aiff;
mod native;

use tracing::{info, warn};

use crate::buffer::SampleBuffer;

/// Lowest sample rate a decoded buffer may claim.
pub const MIN_SAMPLE_RATE: u32 = 8000;

/// Highest sample rate a decoded buffer may claim.
pub const MAX_SAMPLE_RATE: u32 = 192000;

/// Fallback rate for files whose rate is unreadable.
pub const FALLBACK_SAMPLE_RATE: u32 = 44100;

/// Error type for decode operations.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("audio file error: {0}")]
    Audio(#[from] symphonia::core::errors::Error),

    #[error("unsupported audio stream: {0}")]
    UnsupportedStream(String),

    #[error("audio file contains no samples")]
    EmptyStream,
}

/// Clamps a claimed sample rate into the supported range, substituting the
/// fallback rate when it is unusable.
pub(crate) fn sanitize_sample_rate(rate: f64) -> u32 {
    if !rate.is_finite() || rate <= 0.0 {
        return FALLBACK_SAMPLE_RATE;
    }
    (rate as u32).clamp(MIN_SAMPLE_RATE, MAX_SAMPLE_RATE)
}

/// Decodes raw file bytes into a sample buffer. The optional name is used
/// only as a format hint and in logs, never to select a decode path.
///
/// The native capability runs first; on failure the AIFF fallback parser
/// is attempted, and if that also declines, the native error is returned.
pub fn decode(bytes: &[u8], name: Option<&str>) -> Result<SampleBuffer, DecodeError> {
    let native_error = match native::decode_bytes(bytes, name) {
        Ok(buffer) => return Ok(buffer),
        Err(e) => e,
    };

    warn!(
        name = name.unwrap_or("buffer"),
        error = %native_error,
        "Native decode failed, trying AIFF fallback"
    );

    if let Some(buffer) = aiff::parse(bytes) {
        info!(
            name = name.unwrap_or("buffer"),
            channels = buffer.channel_count(),
            frames = buffer.len(),
            sample_rate = buffer.sample_rate(),
            "AIFF fallback decode succeeded"
        );
        return Ok(buffer);
    }

    Err(native_error)
}
