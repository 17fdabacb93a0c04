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
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use super::{AudioBackend, CompletionCallback, PlaybackError, PlaybackHandle};
use crate::buffer::SampleBuffer;

/// A mock backend. Doesn't actually play anything; playback finishes only
/// when a test drives it via `complete`.
#[derive(Clone, Default)]
pub struct Backend {
    /// Every handle ever started, in start order.
    handles: Arc<Mutex<Vec<Arc<HandleState>>>>,
    /// When set, handles report a stop failure (state still changes).
    fail_stop: bool,
}

struct HandleState {
    frames: usize,
    stopped: AtomicBool,
    finished: AtomicBool,
    fail_stop: bool,
    on_complete: Mutex<Option<CompletionCallback>>,
}

struct Handle {
    state: Arc<HandleState>,
}

impl Backend {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose handles fail their stop calls.
    pub fn with_failing_stop() -> Self {
        Backend {
            handles: Arc::new(Mutex::new(Vec::new())),
            fail_stop: true,
        }
    }

    /// Number of playbacks started so far.
    pub fn started_count(&self) -> usize {
        self.handles.lock().map(|h| h.len()).unwrap_or(0)
    }

    /// True if the most recently started playback is neither stopped nor
    /// finished.
    pub fn is_playing(&self) -> bool {
        self.handles
            .lock()
            .ok()
            .and_then(|handles| {
                handles.last().map(|state| {
                    !state.stopped.load(Ordering::Relaxed)
                        && !state.finished.load(Ordering::Relaxed)
                })
            })
            .unwrap_or(false)
    }

    /// True if the `index`-th playback (in start order) was stopped.
    pub fn was_stopped(&self, index: usize) -> bool {
        self.handles
            .lock()
            .ok()
            .and_then(|handles| {
                handles
                    .get(index)
                    .map(|state| state.stopped.load(Ordering::Relaxed))
            })
            .unwrap_or(false)
    }

    /// Frame count handed to the `index`-th playback.
    pub fn started_frames(&self, index: usize) -> Option<usize> {
        self.handles
            .lock()
            .ok()
            .and_then(|handles| handles.get(index).map(|state| state.frames))
    }

    /// Simulates the `index`-th playback reaching the end of its buffer:
    /// marks it finished and fires its completion callback.
    pub fn complete(&self, index: usize) {
        let state = match self.handles.lock() {
            Ok(handles) => match handles.get(index) {
                Some(state) => state.clone(),
                None => return,
            },
            Err(_) => return,
        };
        state.finished.store(true, Ordering::Relaxed);
        let callback = state.on_complete.lock().ok().and_then(|mut cb| cb.take());
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Completes the most recently started playback.
    pub fn complete_last(&self) {
        let count = self.started_count();
        if count > 0 {
            self.complete(count - 1);
        }
    }
}

impl AudioBackend for Backend {
    fn play(
        &self,
        buffer: &SampleBuffer,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let state = Arc::new(HandleState {
            frames: buffer.len(),
            stopped: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            fail_stop: self.fail_stop,
            on_complete: Mutex::new(Some(on_complete)),
        });
        if let Ok(mut handles) = self.handles.lock() {
            handles.push(state.clone());
        }
        Ok(Box::new(Handle { state }))
    }
}

impl PlaybackHandle for Handle {
    fn stop(&self) -> Result<(), PlaybackError> {
        self.state.stopped.store(true, Ordering::Relaxed);
        // Stopping suppresses the completion callback.
        if let Ok(mut callback) = self.state.on_complete.lock() {
            callback.take();
        }
        if self.state.fail_stop {
            return Err(PlaybackError::Device("mock stop failure".to_string()));
        }
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_lifecycle() {
        let backend = Backend::new();
        let buffer = SampleBuffer::silent(1, 64, 44100);
        let completed = Arc::new(AtomicBool::new(false));

        let handle = {
            let completed = completed.clone();
            backend
                .play(
                    &buffer,
                    Box::new(move || completed.store(true, Ordering::Relaxed)),
                )
                .expect("play failed")
        };

        assert!(backend.is_playing());
        assert!(!handle.is_finished());
        assert_eq!(backend.started_frames(0), Some(64));

        backend.complete_last();
        assert!(handle.is_finished());
        assert!(completed.load(Ordering::Relaxed));
    }

    #[test]
    fn test_mock_stop_suppresses_completion() {
        let backend = Backend::new();
        let buffer = SampleBuffer::silent(1, 64, 44100);
        let completed = Arc::new(AtomicBool::new(false));

        let handle = {
            let completed = completed.clone();
            backend
                .play(
                    &buffer,
                    Box::new(move || completed.store(true, Ordering::Relaxed)),
                )
                .expect("play failed")
        };

        handle.stop().expect("stop failed");
        backend.complete_last();
        assert!(!completed.load(Ordering::Relaxed));
        assert!(backend.was_stopped(0));
    }

    #[test]
    fn test_mock_failing_stop_still_changes_state() {
        let backend = Backend::with_failing_stop();
        let buffer = SampleBuffer::silent(1, 64, 44100);
        let handle = backend.play(&buffer, Box::new(|| {})).expect("play failed");

        assert!(handle.stop().is_err());
        assert!(backend.was_stopped(0));
    }
}
