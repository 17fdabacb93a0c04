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

//! YAML session configuration.
//!
//! A session file captures the processing settings and slicing options
//! for one source file, e.g.:
//!
//! ```yaml
//! processing:
//!   start_fraction: 0.1
//!   end_fraction: 0.9
//!   reverse: false
//!   bit_depth: 12
//!   target_sample_rate: 26000
//! slicing:
//!   mode: transient
//!   count: 8
//!   sensitivity: 0.7
//! ```
//!
//! Out-of-range values are clamped when applied, never rejected; the host
//! UI offers a fixed menu of bit depths and rates but any positive value
//! is accepted here.

use std::error::Error;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::pipeline::ProcessingSettings;
use crate::slicing::workspace::{DEFAULT_SENSITIVITY, DEFAULT_SLICE_COUNT};
use crate::slicing::{SliceMode, SlicingWorkspace};

/// Bit depths offered by the host UI.
pub const BIT_DEPTH_CHOICES: [u32; 4] = [4, 8, 12, 16];

/// Sample rates offered by the host UI.
pub const SAMPLE_RATE_CHOICES: [u32; 4] = [9000, 16000, 26000, 44100];

/// A YAML representation of one slicing session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transform pipeline settings.
    #[serde(default)]
    processing: ProcessingSettings,

    /// Slice generation options.
    #[serde(default)]
    slicing: SlicingOptions,
}

/// Slice generation options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicingOptions {
    /// How slices are generated.
    #[serde(default = "default_mode")]
    mode: SliceMode,

    /// Equal-division slice count.
    #[serde(default = "default_count")]
    count: usize,

    /// Transient detection sensitivity in [0, 1].
    #[serde(default = "default_sensitivity")]
    sensitivity: f32,
}

fn default_mode() -> SliceMode {
    SliceMode::Equal
}

fn default_count() -> usize {
    DEFAULT_SLICE_COUNT
}

fn default_sensitivity() -> f32 {
    DEFAULT_SENSITIVITY
}

impl Default for SlicingOptions {
    fn default() -> Self {
        SlicingOptions {
            mode: default_mode(),
            count: default_count(),
            sensitivity: default_sensitivity(),
        }
    }
}

impl SessionConfig {
    /// Reads a session config from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SessionConfig, Box<dyn Error>> {
        let contents = fs::read_to_string(path.as_ref())?;
        Ok(serde_yml::from_str(&contents)?)
    }

    /// Gets the processing settings.
    pub fn processing(&self) -> ProcessingSettings {
        self.processing
    }

    /// Gets the slicing mode.
    pub fn mode(&self) -> SliceMode {
        self.slicing.mode
    }

    /// Sets the slicing mode.
    pub fn set_mode(&mut self, mode: SliceMode) {
        self.slicing.mode = mode;
    }

    /// Gets the slice count.
    pub fn count(&self) -> usize {
        self.slicing.count
    }

    /// Sets the slice count.
    pub fn set_count(&mut self, count: usize) {
        self.slicing.count = count;
    }

    /// Gets the transient sensitivity.
    pub fn sensitivity(&self) -> f32 {
        self.slicing.sensitivity
    }

    /// Sets the transient sensitivity.
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.slicing.sensitivity = sensitivity;
    }

    /// Sets the processing settings.
    pub fn set_processing(&mut self, settings: ProcessingSettings) {
        self.processing = settings;
    }

    /// Applies the whole config to a workspace. The workspace clamps
    /// every value into range; the mode switch happens last so it
    /// regenerates with the final count and sensitivity.
    pub fn apply_to(&self, workspace: &mut SlicingWorkspace) {
        workspace.set_settings(self.processing);
        workspace.set_slice_count(self.slicing.count);
        workspace.set_sensitivity(self.slicing.sensitivity);
        workspace.set_mode(self.slicing.mode);
    }
}
