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

//! The audio playback capability boundary.
//!
//! The engine itself never talks to an audio stack directly; it is handed
//! an `AudioBackend` that can start playing an in-memory buffer and hand
//! back a handle for stopping it. The cpal implementation is the real
//! one; the mock exists for tests and is driven manually.

use cpal::traits::{DeviceTrait, HostTrait};

use crate::buffer::SampleBuffer;

pub mod cpal_backend;
pub mod mock;

/// Callback invoked exactly once when playback reaches the natural end of
/// the buffer. Not invoked when playback is stopped explicitly.
pub type CompletionCallback = Box<dyn FnOnce() + Send>;

/// Error type for playback operations.
#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("no output device available")]
    NoDevice,

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("failed to enumerate output devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("playback device error: {0}")]
    Device(String),
}

/// A handle to one in-flight playback of a buffer.
pub trait PlaybackHandle: Send + Sync {
    /// Tells the underlying stream to stop. Returns only once the stop
    /// request has been delivered; the stream winds down on its own.
    fn stop(&self) -> Result<(), PlaybackError>;

    /// Returns true once playback has reached the end of the buffer.
    fn is_finished(&self) -> bool;
}

/// Something that can render a sample buffer out loud.
pub trait AudioBackend: Send + Sync {
    /// Starts playing the buffer once. `on_complete` fires when the
    /// buffer plays out naturally, not when the handle is stopped.
    fn play(
        &self,
        buffer: &SampleBuffer,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError>;
}

/// Lists the names of the available cpal output devices.
pub fn list_output_devices() -> Result<Vec<String>, PlaybackError> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    for device in host.output_devices()? {
        match device.name() {
            Ok(name) => names.push(name),
            Err(e) => names.push(format!("unknown device ({})", e)),
        }
    }
    Ok(names)
}

/// Interleaves a planar buffer for a frame-ordered output stream.
pub(crate) fn interleave(buffer: &SampleBuffer) -> Vec<f32> {
    let channels = buffer.channel_count();
    let frames = buffer.len();
    let mut out = Vec::with_capacity(frames * channels);
    for frame in 0..frames {
        for channel in buffer.channels() {
            out.push(channel[frame]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_orders_frames() {
        let buffer =
            SampleBuffer::from_planar(vec![vec![1.0, 3.0], vec![2.0, 4.0]], 44100);
        assert_eq!(interleave(&buffer), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_interleave_mono_is_passthrough() {
        let buffer = SampleBuffer::from_planar(vec![vec![0.1, 0.2, 0.3]], 44100);
        assert_eq!(interleave(&buffer), vec![0.1, 0.2, 0.3]);
    }
}
