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

//! Offline buffer-to-buffer transforms.
//!
//! The pipeline applies trim, reversal, bit-depth reduction, and
//! downsampling in that fixed order. Every stage is pure and returns a
//! fresh buffer; with default settings the pipeline is the identity.

use serde::{Deserialize, Serialize};

use crate::buffer::SampleBuffer;

/// Default playback/export rate when none is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Bit depth at and above which no requantization is applied.
pub const FULL_BIT_DEPTH: u32 = 16;

/// Settings applied to a source buffer before slicing or export.
/// Owned by the caller and passed by value; all fields are clamped into
/// their valid ranges when applied rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcessingSettings {
    /// Start of the trim window as a fraction of the whole buffer.
    #[serde(default)]
    pub start_fraction: f64,
    /// End of the trim window as a fraction of the whole buffer.
    #[serde(default = "default_end_fraction")]
    pub end_fraction: f64,
    /// Whether to reverse the trimmed window.
    #[serde(default)]
    pub reverse: bool,
    /// Target bit depth; depths of 16 and above leave samples untouched.
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u32,
    /// Target sample rate; the pipeline only ever downsamples.
    #[serde(default = "default_sample_rate")]
    pub target_sample_rate: u32,
}

fn default_end_fraction() -> f64 {
    1.0
}

fn default_bit_depth() -> u32 {
    FULL_BIT_DEPTH
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        ProcessingSettings {
            start_fraction: 0.0,
            end_fraction: 1.0,
            reverse: false,
            bit_depth: FULL_BIT_DEPTH,
            target_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }
}

impl ProcessingSettings {
    /// Returns a copy with every field forced into its valid range:
    /// fractions in [0, 1] with start <= end, bit depth and sample rate
    /// at least 1.
    pub fn clamped(&self) -> Self {
        let start = if self.start_fraction.is_finite() {
            self.start_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let end = if self.end_fraction.is_finite() {
            self.end_fraction.clamp(start, 1.0)
        } else {
            1.0
        };
        ProcessingSettings {
            start_fraction: start,
            end_fraction: end.max(start),
            reverse: self.reverse,
            bit_depth: self.bit_depth.max(1),
            target_sample_rate: self.target_sample_rate.max(1),
        }
    }
}

/// Runs the full transform pipeline over a buffer. Stages that would be
/// identities are skipped entirely, so default settings return a buffer
/// sample-equal to the input.
pub fn process(buffer: &SampleBuffer, settings: &ProcessingSettings) -> SampleBuffer {
    let settings = settings.clamped();
    let mut processed = buffer.clone();

    if settings.start_fraction != 0.0 || settings.end_fraction != 1.0 {
        processed = trim(&processed, settings.start_fraction, settings.end_fraction);
    }

    if settings.reverse {
        processed = reverse(&processed);
    }

    if settings.bit_depth < FULL_BIT_DEPTH {
        processed = bitcrush(&processed, settings.bit_depth);
    }

    if settings.target_sample_rate < processed.sample_rate() {
        processed = resample(&processed, settings.target_sample_rate);
    }

    processed
}

/// Trims the buffer to the window `[floor(L*start), floor(L*end))`.
/// The result is always at least one frame long.
pub fn trim(buffer: &SampleBuffer, start_fraction: f64, end_fraction: f64) -> SampleBuffer {
    let frames = buffer.len();
    let start_sample = (frames as f64 * start_fraction).floor() as usize;
    let end_sample = (frames as f64 * end_fraction).floor() as usize;
    let new_frames = end_sample.saturating_sub(start_sample).max(1);

    let channels = buffer
        .channels()
        .iter()
        .map(|src| {
            (0..new_frames)
                .map(|i| src.get(start_sample + i).copied().unwrap_or(0.0))
                .collect()
        })
        .collect();

    SampleBuffer::from_planar(channels, buffer.sample_rate())
}

/// Reverses each channel in time.
pub fn reverse(buffer: &SampleBuffer) -> SampleBuffer {
    let channels = buffer
        .channels()
        .iter()
        .map(|src| src.iter().rev().copied().collect())
        .collect();

    SampleBuffer::from_planar(channels, buffer.sample_rate())
}

/// Requantizes samples to `2^bit_depth` uniform levels with
/// round-to-nearest. Depths of 16 and above return an unmodified copy.
pub fn bitcrush(buffer: &SampleBuffer, bit_depth: u32) -> SampleBuffer {
    if bit_depth >= FULL_BIT_DEPTH {
        return buffer.clone();
    }

    let levels = 1u32 << bit_depth.max(1);
    let step = 2.0f32 / levels as f32;

    let channels = buffer
        .channels()
        .iter()
        .map(|src| {
            src.iter()
                .map(|&s| {
                    let clamped = s.clamp(-1.0, 1.0);
                    step * (clamped / step + 0.5).floor()
                })
                .collect()
        })
        .collect();

    SampleBuffer::from_planar(channels, buffer.sample_rate())
}

/// Downsamples the buffer to `target_rate` using linear interpolation.
/// Upsampling is never performed; a target at or above the current rate
/// returns an unmodified copy.
pub fn resample(buffer: &SampleBuffer, target_rate: u32) -> SampleBuffer {
    let source_rate = buffer.sample_rate();
    if target_rate >= source_rate {
        return buffer.clone();
    }

    let frames = buffer.len();
    let ratio = target_rate as f64 / source_rate as f64;
    let new_frames = (frames as f64 * ratio).floor() as usize;

    let channels = buffer
        .channels()
        .iter()
        .map(|src| {
            (0..new_frames)
                .map(|i| {
                    let source_index = i as f64 / ratio;
                    let floor = source_index.floor() as usize;
                    let ceil = (floor + 1).min(frames.saturating_sub(1));
                    let fraction = (source_index - floor as f64) as f32;

                    let s0 = src.get(floor).copied().unwrap_or(0.0);
                    let s1 = src.get(ceil).copied().unwrap_or(s0);
                    s0 * (1.0 - fraction) + s1 * fraction
                })
                .collect()
        })
        .collect();

    SampleBuffer::from_planar(channels, target_rate)
}
