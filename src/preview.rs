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

//! Audition playback with a single active session.
//!
//! At most one preview plays at any time. Starting a preview for a
//! different session stops the current one first; starting the same
//! session again while it plays is a toggle and stops it. Natural
//! completion clears the session and notifies an optional callback so UI
//! indicators can reset without an explicit stop.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::audio::{AudioBackend, PlaybackError, PlaybackHandle};
use crate::buffer::SampleBuffer;

/// What a preview session is auditioning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewKind {
    /// The whole processed loop.
    Loop,
    /// One slice of the loop.
    Slice,
}

/// Identifies the buffer being auditioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewSession {
    pub kind: PreviewKind,
    pub id: usize,
}

impl PreviewSession {
    pub fn whole_loop() -> Self {
        PreviewSession {
            kind: PreviewKind::Loop,
            id: 0,
        }
    }

    pub fn slice(id: usize) -> Self {
        PreviewSession {
            kind: PreviewKind::Slice,
            id,
        }
    }
}

impl fmt::Display for PreviewSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PreviewKind::Loop => write!(f, "loop"),
            PreviewKind::Slice => write!(f, "slice {}", self.id + 1),
        }
    }
}

/// Callback fired when a session ends by playing out naturally.
pub type SessionEndCallback = Arc<dyn Fn(PreviewSession) + Send + Sync>;

struct ActivePreview {
    session: PreviewSession,
    handle: Box<dyn PlaybackHandle>,
    /// Monotonic token distinguishing this playback from any later one
    /// reusing the same session id.
    token: u64,
}

struct ControllerState {
    active: Option<ActivePreview>,
    next_token: u64,
}

/// Manages the one-at-a-time preview playback session.
pub struct PreviewController {
    backend: Arc<dyn AudioBackend>,
    state: Arc<Mutex<ControllerState>>,
    on_session_end: Option<SessionEndCallback>,
}

impl PreviewController {
    /// Creates a controller over the given backend.
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        PreviewController {
            backend,
            state: Arc::new(Mutex::new(ControllerState {
                active: None,
                next_token: 0,
            })),
            on_session_end: None,
        }
    }

    /// Installs a callback fired when a session completes naturally.
    pub fn on_session_end(
        mut self,
        callback: impl Fn(PreviewSession) + Send + Sync + 'static,
    ) -> Self {
        self.on_session_end = Some(Arc::new(callback));
        self
    }

    /// Starts auditioning a buffer under the given session. If that same
    /// session is already playing this is a toggle: the preview stops and
    /// nothing new starts. Any other active session is stopped first.
    pub fn preview(
        &self,
        buffer: &SampleBuffer,
        session: PreviewSession,
    ) -> Result<(), PlaybackError> {
        let mut state = self.state.lock();

        if let Some(active) = state.active.take() {
            stop_handle(active.handle.as_ref());
            if active.session == session {
                debug!(?session, "Preview toggled off");
                return Ok(());
            }
        }

        let token = state.next_token;
        state.next_token += 1;

        let on_complete = {
            let state = self.state.clone();
            let on_session_end = self.on_session_end.clone();
            Box::new(move || {
                let mut state = state.lock();
                let matches = state
                    .active
                    .as_ref()
                    .map(|active| active.token == token)
                    .unwrap_or(false);
                if matches {
                    state.active = None;
                    drop(state);
                    debug!(?session, "Preview completed");
                    if let Some(callback) = &on_session_end {
                        callback(session);
                    }
                }
            })
        };

        let handle = self.backend.play(buffer, on_complete)?;
        state.active = Some(ActivePreview {
            session,
            handle,
            token,
        });
        debug!(?session, "Preview started");
        Ok(())
    }

    /// Stops the active preview, if any. Stopping is best-effort: a
    /// failing handle is logged and the session state is cleared
    /// regardless.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(active) = state.active.take() {
            stop_handle(active.handle.as_ref());
            debug!(session = ?active.session, "Preview stopped");
        }
    }

    /// The currently playing session, if any.
    pub fn active_session(&self) -> Option<PreviewSession> {
        self.state.lock().active.as_ref().map(|a| a.session)
    }

    /// Returns true if the given session is currently playing.
    pub fn is_previewing(&self, session: PreviewSession) -> bool {
        self.active_session() == Some(session)
    }
}

fn stop_handle(handle: &dyn PlaybackHandle) {
    if let Err(e) = handle.stop() {
        warn!(error = %e, "Failed to stop preview playback");
    }
}
