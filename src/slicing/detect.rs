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

//! Transient detection over a peak-amplitude envelope.
//!
//! The detector computes a hop-sized envelope, normalizes and smooths it,
//! derives an adaptive threshold from the median and the median absolute
//! deviation, then scans for local peaks that clear the threshold with
//! enough margin and spacing. The constants below are empirical and
//! tunable; none of them is load-bearing for correctness.

use tracing::debug;

use super::{Slice, MAX_SLICES};
use crate::buffer::SampleBuffer;

/// Envelope hop length as a fraction of a second (~2.5ms).
const HOP_SECONDS: f64 = 0.0025;

/// Minimum hop length in samples.
const MIN_HOP: usize = 256;

/// Base minimum spacing between boundaries in seconds (20ms), widened by
/// up to `SPACING_SPREAD_SECONDS` as sensitivity decreases.
const MIN_SPACING_SECONDS: f64 = 0.02;

/// Additional spacing applied at zero sensitivity (50ms).
const SPACING_SPREAD_SECONDS: f64 = 0.05;

/// Multiplier on the median absolute deviation for the adaptive base.
const MAD_MULTIPLIER: f32 = 1.5;

/// Threshold bias applied as sensitivity decreases.
const SENSITIVITY_BIAS: f32 = 0.15;

/// Hard clamp on the detection threshold.
const THRESHOLD_FLOOR: f32 = 0.05;
const THRESHOLD_CEIL: f32 = 0.95;

/// Hysteresis as a fraction of the threshold.
const HYSTERESIS_RATIO: f32 = 0.85;

/// Fraction of the hysteresis a peak must exceed its neighbors by.
const PEAK_EXCESS_RATIO: f32 = 0.25;

/// Detects transient boundaries in a buffer and returns the resulting
/// slice set. Higher sensitivity lowers the effective threshold and
/// narrows the spacing window, yielding more slices.
///
/// Returns an empty list when no internal boundary is found (silent or
/// featureless material); the caller is expected to fall back to
/// equal-division slicing.
pub fn detect_slices(buffer: &SampleBuffer, sensitivity: f32) -> Vec<Slice> {
    let frames = buffer.len();
    if frames == 0 {
        return Vec::new();
    }

    let sensitivity = if sensitivity.is_finite() {
        sensitivity.clamp(0.0, 1.0)
    } else {
        0.5
    };
    let sample_rate = buffer.sample_rate();
    let channel_count = buffer.channel_count();

    let hop = ((sample_rate as f64 * HOP_SECONDS).floor() as usize).max(MIN_HOP);
    let spacing_seconds =
        MIN_SPACING_SECONDS + (1.0 - sensitivity as f64) * SPACING_SPREAD_SECONDS;
    let min_spacing = ((sample_rate as f64 * spacing_seconds).floor() as usize).max(hop);

    // Coarse peak envelope: max |sample| across channels per hop, scaled
    // down by the channel count.
    let mut magnitudes = Vec::with_capacity(frames / hop + 1);
    let mut start = 0;
    while start < frames {
        let end = (start + hop).min(frames);
        let mut peak = 0.0f32;
        for channel in buffer.channels() {
            for &sample in &channel[start..end] {
                let abs = sample.abs();
                if abs > peak {
                    peak = abs;
                }
            }
        }
        magnitudes.push(peak / channel_count as f32);
        start += hop;
    }

    let max_magnitude = magnitudes.iter().copied().fold(0.0f32, f32::max);
    if max_magnitude == 0.0 || !max_magnitude.is_finite() {
        return Vec::new();
    }

    let normalized: Vec<f32> = magnitudes.iter().map(|&v| v / max_magnitude).collect();

    // 3-point moving average; edge frames reuse themselves for the
    // missing neighbor.
    let smoothed: Vec<f32> = (0..normalized.len())
        .map(|i| {
            let prev = if i > 0 { normalized[i - 1] } else { normalized[i] };
            let next = normalized.get(i + 1).copied().unwrap_or(normalized[i]);
            (prev + normalized[i] + next) / 3.0
        })
        .collect();

    let median = median_of(&smoothed);
    let deviations: Vec<f32> = smoothed.iter().map(|&v| (v - median).abs()).collect();
    let mad = lower_median_of(&deviations);
    let adaptive_base = median + mad * MAD_MULTIPLIER;

    let threshold = (adaptive_base + (1.0 - sensitivity) * SENSITIVITY_BIAS)
        .clamp(THRESHOLD_FLOOR, THRESHOLD_CEIL);
    let hysteresis = threshold * HYSTERESIS_RATIO;

    let mut boundaries: Vec<usize> = Vec::new();
    let mut last_boundary = 0usize;

    for i in 1..smoothed.len().saturating_sub(1) {
        let value = smoothed[i];
        if value < threshold {
            continue;
        }
        let prev = smoothed[i - 1];
        let next = smoothed[i + 1];
        if value < prev && value < next {
            continue;
        }
        if value - prev.max(next) < hysteresis * PEAK_EXCESS_RATIO {
            continue;
        }
        let sample_index = i * hop;
        if sample_index - last_boundary < min_spacing {
            continue;
        }
        boundaries.push(sample_index);
        last_boundary = sample_index;
        if boundaries.len() >= MAX_SLICES - 1 {
            break;
        }
    }

    debug!(
        frames,
        hop,
        threshold,
        detected = boundaries.len(),
        "Transient scan complete"
    );

    if boundaries.is_empty() {
        return Vec::new();
    }

    let mut all = Vec::with_capacity(boundaries.len() + 2);
    all.push(0);
    all.extend(boundaries);
    all.push(frames);

    all.windows(2)
        .take(MAX_SLICES)
        .enumerate()
        .map(|(index, pair)| Slice::new(index, pair[0], pair[1], sample_rate))
        .collect()
}

/// Median with even-length averaging.
fn median_of(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Median taken as the middle element of the sorted values (upper element
/// for even lengths), the rougher estimate used for the deviation spread.
fn lower_median_of(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted[sorted.len() / 2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicing::assert_invariants;

    /// A mostly silent mono buffer with decaying bursts starting at the
    /// given frame positions. Each burst spans three envelope hops.
    fn burst_buffer(frames: usize, bursts: &[usize]) -> SampleBuffer {
        let mut samples = vec![0.0f32; frames];
        for &at in bursts {
            for (offset, level) in [(0usize, 1.0f32), (256, 0.4), (512, 0.2)] {
                for i in 0..256 {
                    if let Some(sample) = samples.get_mut(at + offset + i) {
                        *sample = level;
                    }
                }
            }
        }
        SampleBuffer::from_planar(vec![samples], 44100)
    }

    #[test]
    fn test_detects_bursts_as_boundaries() {
        let buffer = burst_buffer(32768, &[8192, 16384, 24576]);
        let slices = detect_slices(&buffer, 0.5);

        assert_eq!(slices.len(), 4);
        let starts: Vec<usize> = slices.iter().map(|s| s.start_sample).collect();
        assert_eq!(starts, vec![0, 8448, 16640, 24832]);
        assert_invariants(&slices, 32768);
    }

    #[test]
    fn test_detection_is_deterministic() {
        let buffer = burst_buffer(32768, &[8192, 24576]);
        assert_eq!(detect_slices(&buffer, 0.7), detect_slices(&buffer, 0.7));
    }

    #[test]
    fn test_silence_yields_no_slices() {
        let buffer = SampleBuffer::silent(2, 44100, 44100);
        assert!(detect_slices(&buffer, 0.5).is_empty());
    }

    #[test]
    fn test_featureless_dc_yields_no_slices() {
        // A constant signal normalizes to a flat envelope; no frame can
        // exceed its neighbors, so no boundary is found.
        let buffer = SampleBuffer::from_planar(vec![vec![0.5; 44100]], 44100);
        assert!(detect_slices(&buffer, 1.0).is_empty());
    }

    #[test]
    fn test_boundary_count_is_capped() {
        // Bursts every 4096 frames, far more than MAX_SLICES can hold.
        let bursts: Vec<usize> = (1..128).map(|i| i * 4096).collect();
        let buffer = burst_buffer(128 * 4096 + 4096, &bursts);
        let slices = detect_slices(&buffer, 1.0);
        assert!(slices.len() <= MAX_SLICES);
        assert_invariants(&slices, buffer.len());
    }

    #[test]
    fn test_spacing_widens_with_low_sensitivity() {
        // Bursts 2048 frames apart: within the high-sensitivity spacing
        // window (~880 frames) but closer than the low-sensitivity one
        // (~3000 frames), so the second boundary survives only at high
        // sensitivity.
        let buffer = burst_buffer(32768, &[8192, 10240]);
        let eager = detect_slices(&buffer, 1.0);
        let strict = detect_slices(&buffer, 0.0);
        assert!(eager.len() >= strict.len());
        if !strict.is_empty() {
            assert_invariants(&strict, 32768);
        }
    }

    #[test]
    fn test_empty_buffer() {
        let buffer = SampleBuffer::from_planar(vec![Vec::new()], 44100);
        assert!(detect_slices(&buffer, 0.5).is_empty());
    }
}
