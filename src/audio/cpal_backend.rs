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
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Condvar, Mutex,
};
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, error};

use super::{interleave, AudioBackend, CompletionCallback, PlaybackError, PlaybackHandle};
use crate::buffer::SampleBuffer;

/// A cpal-backed audio backend. Each `play` spawns a thread that owns the
/// output stream (cpal streams are not Send) and winds it down when the
/// buffer plays out or the handle is stopped.
pub struct Backend {
    /// Output device name; the host default when unset.
    device_name: Option<String>,
}

impl Backend {
    /// Creates a backend using the default output device.
    pub fn new() -> Self {
        Backend { device_name: None }
    }

    /// Creates a backend targeting a named output device.
    pub fn with_device(name: &str) -> Self {
        Backend {
            device_name: Some(name.to_string()),
        }
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::new()
    }
}

/// Signals the playback thread that the stream should wind down, either
/// because the handle was stopped or because the buffer played out.
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn new() -> Self {
        StopSignal {
            stopped: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    fn stop(&self) {
        if let Ok(mut stopped) = self.stopped.lock() {
            *stopped = true;
        }
        self.condvar.notify_all();
    }

    fn notify(&self) {
        self.condvar.notify_all();
    }

    fn is_stopped(&self) -> bool {
        self.stopped.lock().map(|s| *s).unwrap_or(true)
    }

    /// Blocks until the handle is stopped or `finished` is set by the
    /// stream callback.
    fn wait(&self, finished: &AtomicBool) {
        let Ok(guard) = self.stopped.lock() else {
            return;
        };
        let _unused = self
            .condvar
            .wait_while(guard, |stopped| {
                !*stopped && !finished.load(Ordering::Relaxed)
            });
    }
}

struct Handle {
    signal: Arc<StopSignal>,
    finished: Arc<AtomicBool>,
}

impl PlaybackHandle for Handle {
    fn stop(&self) -> Result<(), PlaybackError> {
        self.signal.stop();
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

impl AudioBackend for Backend {
    fn play(
        &self,
        buffer: &SampleBuffer,
        on_complete: CompletionCallback,
    ) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
        let host = cpal::default_host();
        let device = match &self.device_name {
            Some(name) => host
                .output_devices()?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or(PlaybackError::NoDevice)?,
            None => host
                .default_output_device()
                .ok_or(PlaybackError::NoDevice)?,
        };

        let channels = buffer.channel_count().max(1) as u16;
        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(buffer.sample_rate()),
            buffer_size: cpal::BufferSize::Default,
        };

        let samples = Arc::new(interleave(buffer));
        let signal = Arc::new(StopSignal::new());
        let finished = Arc::new(AtomicBool::new(false));

        // Stream setup happens on the playback thread; hand its result
        // back so setup failures surface to the caller.
        let (setup_tx, setup_rx) = crossbeam_channel::bounded::<Result<(), PlaybackError>>(1);

        {
            let samples = samples.clone();
            let signal = signal.clone();
            let finished = finished.clone();
            thread::spawn(move || {
                let position = Arc::new(AtomicUsize::new(0));
                let callback_signal = signal.clone();
                let callback_finished = finished.clone();

                let stream = device.build_output_stream(
                    &config,
                    move |output: &mut [f32], _: &cpal::OutputCallbackInfo| {
                        let start = position.load(Ordering::Relaxed);
                        let available = samples.len().saturating_sub(start);
                        let to_copy = available.min(output.len());

                        output[..to_copy]
                            .copy_from_slice(&samples[start..start + to_copy]);
                        for sample in output[to_copy..].iter_mut() {
                            *sample = 0.0;
                        }

                        position.store(start + to_copy, Ordering::Relaxed);
                        if to_copy < output.len()
                            && !callback_finished.swap(true, Ordering::Relaxed)
                        {
                            callback_signal.notify();
                        }
                    },
                    |e| error!(error = %e, "Output stream error"),
                    None,
                );

                let stream = match stream {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = setup_tx.send(Err(e.into()));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = setup_tx.send(Err(e.into()));
                    return;
                }
                let _ = setup_tx.send(Ok(()));

                signal.wait(&finished);
                drop(stream);

                // Completion fires only when the buffer played out; an
                // explicit stop suppresses it.
                if !signal.is_stopped() {
                    debug!("Playback reached end of buffer");
                    on_complete();
                }
            });
        }

        match setup_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => return Err(PlaybackError::Device(e.to_string())),
        }

        Ok(Box::new(Handle { signal, finished }))
    }
}
