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

//! The slicing workspace: one loaded source, its processing settings, and
//! the editable slice list over the processed result.
//!
//! All mutable slicing state lives in this explicit value rather than in
//! ambient globals, so the engine can be driven outside a UI event loop
//! and tested directly. Malformed edit requests (splitting a slice that is
//! too small, deleting the last slice) are rejected silently; callers can
//! inspect the state afterward to detect the no-op.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{detect, equal_slices, normalize, Slice, MAX_SLICES};
use crate::buffer::SampleBuffer;
use crate::pipeline::{self, ProcessingSettings};
use crate::wav;

/// Default slice count for a fresh workspace.
pub const DEFAULT_SLICE_COUNT: usize = 8;

/// Default transient sensitivity for a fresh workspace.
pub const DEFAULT_SENSITIVITY: f32 = 0.5;

/// Minimum width of each half when splitting a slice, in frames.
const MIN_SPLIT_FRAMES: usize = 2;

/// How the slice list is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SliceMode {
    /// Fixed-count equal division.
    Equal,
    /// Transient detection with equal-division fallback.
    Transient,
    /// Manually edited boundaries, preserved across recomputes.
    Custom,
}

impl std::str::FromStr for SliceMode {
    type Err = Box<dyn std::error::Error>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal" | "Equal" => Ok(SliceMode::Equal),
            "transient" | "Transient" => Ok(SliceMode::Transient),
            "custom" | "Custom" => Ok(SliceMode::Custom),
            _ => Err(format!("unsupported slice mode: {}", s).into()),
        }
    }
}

impl fmt::Display for SliceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceMode::Equal => write!(f, "equal"),
            SliceMode::Transient => write!(f, "transient"),
            SliceMode::Custom => write!(f, "custom"),
        }
    }
}

/// Where the current slice list actually came from. Differs from the mode
/// when transient detection fell back to the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceSource {
    Grid,
    Transient,
    Custom,
}

impl fmt::Display for SliceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceSource::Grid => write!(f, "grid"),
            SliceSource::Transient => write!(f, "transient"),
            SliceSource::Custom => write!(f, "custom"),
        }
    }
}

/// Label for a sensitivity value, as presented to users.
pub fn sensitivity_label(sensitivity: f32) -> &'static str {
    if sensitivity <= 0.33 {
        "Low"
    } else if sensitivity <= 0.66 {
        "Medium"
    } else {
        "High"
    }
}

/// A loaded source buffer plus the processing settings and slice list
/// derived from it.
pub struct SlicingWorkspace {
    /// The decoded source, untouched by processing.
    source: SampleBuffer,
    /// Friendly identifier derived from the source file name.
    base_name: String,
    /// Settings applied to the source to produce the processed buffer.
    settings: ProcessingSettings,
    /// The processed buffer all slices refer to.
    processed: SampleBuffer,
    mode: SliceMode,
    sensitivity: f32,
    slice_count: usize,
    slices: Vec<Slice>,
    slice_source: SliceSource,
    selected: Option<usize>,
}

impl SlicingWorkspace {
    /// Creates a workspace for a decoded source. The name, when present,
    /// has its extension stripped and whitespace collapsed to underscores;
    /// otherwise the workspace is called "loop".
    pub fn new(source: SampleBuffer, name: Option<&str>) -> Self {
        let base_name = derive_base_name(name);
        let settings = ProcessingSettings::default();
        let processed = pipeline::process(&source, &settings);

        let mut workspace = SlicingWorkspace {
            source,
            base_name,
            settings,
            processed,
            mode: SliceMode::Equal,
            sensitivity: DEFAULT_SENSITIVITY,
            slice_count: DEFAULT_SLICE_COUNT,
            slices: Vec::new(),
            slice_source: SliceSource::Grid,
            selected: None,
        };
        workspace.reslice();
        workspace
    }

    /// The processed buffer that slice boundaries refer to.
    pub fn processed(&self) -> &SampleBuffer {
        &self.processed
    }

    /// The unprocessed source buffer.
    pub fn source(&self) -> &SampleBuffer {
        &self.source
    }

    /// The current slice list.
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Where the current slice list came from.
    pub fn slice_source(&self) -> SliceSource {
        self.slice_source
    }

    pub fn mode(&self) -> SliceMode {
        self.mode
    }

    pub fn settings(&self) -> ProcessingSettings {
        self.settings
    }

    pub fn slice_count(&self) -> usize {
        self.slice_count
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Applies new processing settings, reprocesses the source, and
    /// regenerates the slice list for the current mode.
    pub fn set_settings(&mut self, settings: ProcessingSettings) {
        self.settings = settings.clamped();
        self.processed = pipeline::process(&self.source, &self.settings);
        self.reslice();
    }

    /// Switches the slicing mode and regenerates the slice list. Custom
    /// mode preserves the existing list, seeding from equal division when
    /// there is nothing to preserve.
    pub fn set_mode(&mut self, mode: SliceMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        self.reslice();
    }

    /// Sets the equal-division slice count, clamped to [1, MAX_SLICES].
    /// Only equal mode reslices immediately; other modes pick the count up
    /// the next time they fall back to the grid.
    pub fn set_slice_count(&mut self, count: usize) {
        self.slice_count = count.clamp(1, MAX_SLICES);
        if self.mode == SliceMode::Equal {
            self.reslice();
        }
    }

    /// Sets the transient sensitivity, clamped to [0, 1].
    pub fn set_sensitivity(&mut self, sensitivity: f32) {
        self.sensitivity = if sensitivity.is_finite() {
            sensitivity.clamp(0.0, 1.0)
        } else {
            DEFAULT_SENSITIVITY
        };
        if self.mode == SliceMode::Transient {
            self.reslice();
        }
    }

    /// Selects a slice for editing, or clears the selection with `None`.
    /// An out-of-range index leaves the selection untouched.
    pub fn select(&mut self, index: Option<usize>) {
        match index {
            None => self.selected = None,
            Some(i) if i < self.slices.len() => self.selected = Some(i),
            Some(_) => {}
        }
    }

    /// Moves the selected slice's boundaries to the given fractions of the
    /// whole processed buffer. The start is clamped to the previous
    /// slice's end and the end to the next slice's start, keeping at least
    /// one frame of width. Editing pins the workspace into custom mode.
    pub fn edit_selected_bounds(&mut self, start_fraction: f64, end_fraction: f64) {
        let Some(index) = self.selected else {
            return;
        };
        if index >= self.slices.len() {
            return;
        }

        self.enter_custom_mode();

        let frames = self.processed.len();
        let start_fraction = if start_fraction.is_finite() {
            start_fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let end_fraction = if end_fraction.is_finite() {
            end_fraction.clamp(start_fraction, 1.0)
        } else {
            1.0
        };

        let previous_end = if index == 0 {
            0
        } else {
            self.slices[index - 1].end_sample
        };
        let next_start = if index == self.slices.len() - 1 {
            frames
        } else {
            self.slices[index + 1].start_sample
        };

        // Cap the start below the next boundary so start+1 can never push
        // the end past it (dragging both fractions to 1.0 would otherwise
        // produce a slice past the end of the buffer).
        let start = ((start_fraction * frames as f64).floor() as usize)
            .max(previous_end)
            .min(next_start.saturating_sub(1));
        let end = ((end_fraction * frames as f64).floor() as usize)
            .min(next_start)
            .max(start + 1);

        self.slices[index].start_sample = start;
        self.slices[index].end_sample = end;
        normalize(&mut self.slices, self.processed.sample_rate());

        // The edited slice keeps the selection even if sorting moved it.
        self.selected = self.slices.iter().position(|s| s.start_sample == start);

        debug!(index, start, end, "Slice bounds edited");
    }

    /// Splits the selected slice at its midpoint and selects the new
    /// right-hand half. Rejected when either half would be smaller than
    /// the minimum slice width.
    pub fn split_selected(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        let Some(slice) = self.slices.get(index) else {
            return;
        };
        if self.slices.len() >= MAX_SLICES {
            return;
        }

        let midpoint = (slice.start_sample + slice.end_sample) / 2;
        if midpoint < slice.start_sample + MIN_SPLIT_FRAMES
            || midpoint + MIN_SPLIT_FRAMES > slice.end_sample
        {
            return;
        }

        let sample_rate = self.processed.sample_rate();
        let right = Slice::new(index + 1, midpoint, slice.end_sample, sample_rate);
        self.slices[index].end_sample = midpoint;
        self.slices.insert(index + 1, right);

        self.enter_custom_mode();
        normalize(&mut self.slices, sample_rate);
        self.selected = self.slices.iter().position(|s| s.start_sample == midpoint);

        debug!(index, midpoint, "Slice split");
    }

    /// Deletes the selected slice, extending a neighbor to absorb its
    /// span, and selects the slice now occupying that position. Rejected
    /// when it is the only remaining slice.
    pub fn delete_selected(&mut self) {
        let Some(index) = self.selected else {
            return;
        };
        if self.slices.len() <= 1 || index >= self.slices.len() {
            return;
        }

        let removed = self.slices.remove(index);
        if index > 0 {
            self.slices[index - 1].end_sample = removed.end_sample;
        } else {
            self.slices[0].start_sample = removed.start_sample;
        }

        self.enter_custom_mode();
        normalize(&mut self.slices, self.processed.sample_rate());
        self.selected = if self.slices.is_empty() {
            None
        } else {
            Some(index.min(self.slices.len() - 1))
        };

        debug!(index, "Slice deleted");
    }

    /// Copies the frames of slice `index` into a fresh buffer.
    pub fn slice_buffer(&self, index: usize) -> Option<SampleBuffer> {
        let slice = self.slices.get(index)?;
        Some(
            self.processed
                .copy_range(slice.start_sample, slice.end_sample),
        )
    }

    /// Writes every slice to `dir` as a 16-bit PCM WAV named
    /// `<base>_<NN>.wav`, creating the directory if needed. Returns the
    /// written paths in slice order.
    pub fn export_to_dir(&self, dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut paths = Vec::with_capacity(self.slices.len());
        for index in 0..self.slices.len() {
            let Some(buffer) = self.slice_buffer(index) else {
                continue;
            };
            let path = dir.join(format!("{}_{:02}.wav", self.base_name, index + 1));
            std::fs::write(&path, wav::encode(&buffer))?;
            paths.push(path);
        }

        info!(
            base = %self.base_name,
            slices = paths.len(),
            dir = %dir.display(),
            "Exported kit slices"
        );
        Ok(paths)
    }

    /// Switches into custom mode without regenerating the list; manual
    /// edits pin the current boundaries.
    fn enter_custom_mode(&mut self) {
        self.mode = SliceMode::Custom;
        self.slice_source = SliceSource::Custom;
    }

    /// Regenerates the slice list from the processed buffer for the
    /// current mode and records which generator actually produced it.
    fn reslice(&mut self) {
        let frames = self.processed.len();
        let sample_rate = self.processed.sample_rate();

        match self.mode {
            SliceMode::Custom => {
                if self.slices.is_empty() {
                    self.slices = equal_slices(frames, sample_rate, self.slice_count);
                } else {
                    // Clamp the preserved boundaries into the (possibly
                    // shorter) processed buffer.
                    for slice in self.slices.iter_mut() {
                        slice.start_sample =
                            slice.start_sample.min(frames.saturating_sub(1));
                        slice.end_sample =
                            slice.end_sample.min(frames).max(slice.start_sample + 1);
                    }
                    normalize(&mut self.slices, sample_rate);
                }
                self.slice_source = SliceSource::Custom;
            }
            SliceMode::Transient => {
                let detected = detect::detect_slices(&self.processed, self.sensitivity);
                if detected.len() >= 2 {
                    self.slices = detected;
                    self.slice_source = SliceSource::Transient;
                } else {
                    self.slices = equal_slices(frames, sample_rate, self.slice_count);
                    self.slice_count = self.slices.len().max(1);
                    self.slice_source = SliceSource::Grid;
                }
            }
            SliceMode::Equal => {
                self.slices = equal_slices(frames, sample_rate, self.slice_count);
                self.slice_count = self.slices.len().max(1);
                self.slice_source = SliceSource::Grid;
            }
        }

        if let Some(selected) = self.selected {
            if selected >= self.slices.len() {
                self.selected = None;
            }
        }

        debug!(
            mode = ?self.mode,
            source = %self.slice_source,
            slices = self.slices.len(),
            "Workspace resliced"
        );
    }
}

impl fmt::Display for SlicingWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seconds = self.processed.duration().as_secs_f64();
        let duration = if seconds >= 10.0 {
            format!("{:.1}", seconds)
        } else {
            format!("{:.2}", seconds)
        };
        let count = self.slices.len();
        write!(
            f,
            "{} - {}s - {}Hz - {} slice{} ({})",
            self.base_name,
            duration,
            self.processed.sample_rate(),
            count,
            if count == 1 { "" } else { "s" },
            self.slice_source
        )
    }
}

impl fmt::Debug for SlicingWorkspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlicingWorkspace")
            .field("base_name", &self.base_name)
            .field("frames", &self.processed.len())
            .field("mode", &self.mode)
            .field("slices", &self.slices.len())
            .field("selected", &self.selected)
            .finish()
    }
}

/// Strips the extension from a file name, collapses whitespace runs to
/// underscores, and falls back to "loop" for unusable names.
fn derive_base_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return "loop".to_string();
    };
    let stem = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };
    let joined = stem
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        "loop".to_string()
    } else {
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slicing::assert_invariants;

    fn workspace_with_frames(frames: usize) -> SlicingWorkspace {
        let samples: Vec<f32> = (0..frames).map(|i| (i as f32 * 0.001).sin()).collect();
        SlicingWorkspace::new(
            SampleBuffer::from_planar(vec![samples], 44100),
            Some("test loop.wav"),
        )
    }

    #[test]
    fn test_new_workspace_slices_equally() {
        let workspace = workspace_with_frames(44100);
        assert_eq!(workspace.slices().len(), DEFAULT_SLICE_COUNT);
        assert_eq!(workspace.slice_source(), SliceSource::Grid);
        assert_invariants(workspace.slices(), 44100);
    }

    #[test]
    fn test_base_name_derivation() {
        assert_eq!(derive_base_name(Some("my break loop.aif")), "my_break_loop");
        assert_eq!(derive_base_name(Some("break.tar.wav")), "break.tar");
        assert_eq!(derive_base_name(Some(".hidden")), "loop");
        assert_eq!(derive_base_name(Some("   ")), "loop");
        assert_eq!(derive_base_name(None), "loop");
    }

    #[test]
    fn test_split_creates_contiguous_halves() {
        let mut workspace = workspace_with_frames(800);
        workspace.set_slice_count(8);
        workspace.select(Some(0));
        workspace.split_selected();

        // Slice 0 was [0, 100); its halves are [0, 50) and [50, 100).
        let slices = workspace.slices();
        assert_eq!(slices.len(), 9);
        assert_eq!(slices[0].end_sample, 50);
        assert_eq!(slices[1].start_sample, 50);
        assert_eq!(slices[1].end_sample, 100);
        assert_eq!(workspace.selected(), Some(1));
        assert_eq!(workspace.mode(), SliceMode::Custom);
        assert_invariants(slices, 800);
    }

    #[test]
    fn test_split_rejects_tiny_slices() {
        let mut workspace = workspace_with_frames(6);
        workspace.set_slice_count(2);
        // Each slice is 3 frames: splitting would leave a 1-frame half.
        workspace.select(Some(0));
        let before = workspace.slices().to_vec();
        workspace.split_selected();
        assert_eq!(workspace.slices(), &before[..]);
    }

    #[test]
    fn test_split_rejects_at_max_slices() {
        let mut workspace = workspace_with_frames(MAX_SLICES * 100);
        workspace.set_slice_count(MAX_SLICES);
        workspace.select(Some(0));
        workspace.split_selected();
        assert_eq!(workspace.slices().len(), MAX_SLICES);
    }

    #[test]
    fn test_delete_absorbs_into_previous() {
        let mut workspace = workspace_with_frames(90);
        workspace.set_slice_count(3);
        // Slices are [0,30), [30,60), [60,90). Delete the middle one.
        workspace.select(Some(1));
        workspace.delete_selected();

        let slices = workspace.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].end_sample, 60);
        assert_eq!(slices[1].start_sample, 60);
        assert_invariants(slices, 90);
    }

    #[test]
    fn test_delete_first_extends_next_backward() {
        let mut workspace = workspace_with_frames(90);
        workspace.set_slice_count(3);
        workspace.select(Some(0));
        workspace.delete_selected();

        let slices = workspace.slices();
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].start_sample, 0);
        assert_eq!(slices[0].end_sample, 60);
        assert_eq!(slices[1].end_sample, 90);
        assert_eq!(workspace.selected(), Some(0));
        assert_invariants(slices, 90);
    }

    #[test]
    fn test_delete_last_remaining_is_rejected() {
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(1);
        workspace.select(Some(0));
        workspace.delete_selected();
        assert_eq!(workspace.slices().len(), 1);
    }

    #[test]
    fn test_edit_bounds_clamps_to_neighbors() {
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(4);
        // Slices at [0,25), [25,50), [50,75), [75,100).
        workspace.select(Some(1));
        // Try to stretch slice 1 over the whole buffer.
        workspace.edit_selected_bounds(0.0, 1.0);

        let slices = workspace.slices();
        assert_eq!(slices[1].start_sample, 25);
        assert_eq!(slices[1].end_sample, 50);
        assert_eq!(workspace.mode(), SliceMode::Custom);
        assert_invariants(slices, 100);
    }

    #[test]
    fn test_edit_bounds_moves_within_free_space() {
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(2);
        workspace.select(Some(1));
        workspace.edit_selected_bounds(0.6, 1.0);

        let slices = workspace.slices();
        assert_eq!(slices[1].start_sample, 60);
        assert_eq!(slices[1].end_sample, 100);
        // The gap [50, 60) belongs to no slice until the caller reslices;
        // manual bounds only clamp against neighbors.
        assert_eq!(workspace.slice_source(), SliceSource::Custom);
    }

    #[test]
    fn test_edit_bounds_at_buffer_end_stays_in_range() {
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(1);
        workspace.select(Some(0));
        // Dragging both handles to 1.0 must not push the slice past the
        // end of the buffer.
        workspace.edit_selected_bounds(1.0, 1.0);

        let slices = workspace.slices();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].start_sample, 99);
        assert_eq!(slices[0].end_sample, 100);

        // Same drag on the last of several slices.
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(4);
        workspace.select(Some(3));
        workspace.edit_selected_bounds(1.0, 1.0);

        let slices = workspace.slices();
        assert_eq!(slices[3].start_sample, 99);
        assert_eq!(slices[3].end_sample, 100);
    }

    #[test]
    fn test_edit_without_selection_is_a_noop() {
        let mut workspace = workspace_with_frames(100);
        let before = workspace.slices().to_vec();
        workspace.edit_selected_bounds(0.1, 0.9);
        assert_eq!(workspace.slices(), &before[..]);
        assert_eq!(workspace.mode(), SliceMode::Equal);
    }

    #[test]
    fn test_transient_mode_records_fallback() {
        // A featureless ramp gives the detector nothing; the workspace
        // substitutes the grid and says so.
        let mut workspace = workspace_with_frames(8192);
        workspace.set_mode(SliceMode::Transient);
        assert_eq!(workspace.slice_source(), SliceSource::Grid);
        assert!(!workspace.slices().is_empty());
        assert_invariants(workspace.slices(), 8192);
    }

    #[test]
    fn test_custom_mode_preserves_manual_edits() {
        let mut workspace = workspace_with_frames(100);
        workspace.set_slice_count(2);
        workspace.select(Some(0));
        workspace.split_selected();
        let edited = workspace.slices().to_vec();

        // Changing the count in custom mode does not discard manual work.
        workspace.set_slice_count(7);
        assert_eq!(workspace.slices(), &edited[..]);

        // An explicit mode switch back to equal regenerates.
        workspace.set_mode(SliceMode::Equal);
        assert_eq!(workspace.slices().len(), 7);
    }

    #[test]
    fn test_set_settings_reprocesses_and_reslices() {
        let mut workspace = workspace_with_frames(1000);
        workspace.set_settings(ProcessingSettings {
            start_fraction: 0.0,
            end_fraction: 0.5,
            ..Default::default()
        });
        assert_eq!(workspace.processed().len(), 500);
        assert_invariants(workspace.slices(), 500);
    }

    #[test]
    fn test_selection_cleared_when_slice_disappears() {
        let mut workspace = workspace_with_frames(1000);
        workspace.set_slice_count(8);
        workspace.select(Some(7));
        workspace.set_slice_count(2);
        assert_eq!(workspace.selected(), None);
    }

    #[test]
    fn test_select_out_of_range_is_ignored() {
        let mut workspace = workspace_with_frames(1000);
        workspace.select(Some(2));
        workspace.select(Some(99));
        assert_eq!(workspace.selected(), Some(2));
    }

    #[test]
    fn test_slice_buffer_extraction() {
        let workspace = workspace_with_frames(800);
        let slice = workspace.slice_buffer(1).unwrap();
        assert_eq!(slice.len(), 100);
        assert_eq!(slice.sample_rate(), 44100);
        assert_eq!(
            slice.channel(0),
            &workspace.processed().channel(0)[100..200]
        );
        assert!(workspace.slice_buffer(99).is_none());
    }

    #[test]
    fn test_sensitivity_labels() {
        assert_eq!(sensitivity_label(0.1), "Low");
        assert_eq!(sensitivity_label(0.5), "Medium");
        assert_eq!(sensitivity_label(0.9), "High");
    }

    #[test]
    fn test_display_meta_line() {
        let workspace = workspace_with_frames(44100);
        let line = format!("{}", workspace);
        assert!(line.contains("test_loop"));
        assert!(line.contains("44100Hz"));
        assert!(line.contains("8 slices (grid)"));
    }

    #[test]
    fn test_slice_mode_from_str() {
        use std::str::FromStr;
        assert_eq!(SliceMode::from_str("equal").unwrap(), SliceMode::Equal);
        assert_eq!(
            SliceMode::from_str("transient").unwrap(),
            SliceMode::Transient
        );
        assert_eq!(SliceMode::from_str("custom").unwrap(), SliceMode::Custom);
        assert!(SliceMode::from_str("grid").is_err());
    }

    #[test]
    fn test_export_writes_one_wav_per_slice() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let mut workspace = workspace_with_frames(800);
        workspace.set_slice_count(4);

        let paths = workspace
            .export_to_dir(dir.path())
            .expect("export failed");
        assert_eq!(paths.len(), 4);
        assert!(paths[0].ends_with("test_loop_01.wav"));
        assert!(paths[3].ends_with("test_loop_04.wav"));

        // Each file is a 200-frame mono 16-bit WAV.
        for path in &paths {
            let reader = hound::WavReader::open(path).expect("invalid wav");
            assert_eq!(reader.spec().channels, 1);
            assert_eq!(reader.spec().bits_per_sample, 16);
            assert_eq!(reader.duration(), 200);
        }
    }

    #[test]
    fn test_invariants_after_edit_sequences() {
        let mut workspace = workspace_with_frames(4800);
        workspace.set_slice_count(6);
        for _ in 0..4 {
            workspace.select(Some(0));
            workspace.split_selected();
        }
        workspace.select(Some(3));
        workspace.delete_selected();
        workspace.select(Some(0));
        workspace.delete_selected();
        assert_invariants(workspace.slices(), 4800);
        assert!(workspace.slices().len() <= MAX_SLICES);
    }
}
