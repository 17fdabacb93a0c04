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
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use clap::{crate_version, Parser, Subcommand};

use chopkit::audio;
use chopkit::audio::cpal_backend;
use chopkit::config::SessionConfig;
use chopkit::decode;
use chopkit::preview::{PreviewController, PreviewSession};
use chopkit::slicing::workspace::sensitivity_label;
use chopkit::slicing::{SliceMode, SlicingWorkspace};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A sample slicing kit builder."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decodes an audio file and prints its properties.
    Inspect {
        /// The audio file to inspect.
        file: PathBuf,
    },
    /// Processes a file and prints the resulting slice table.
    Slice {
        /// The audio file to slice.
        file: PathBuf,
        /// Path to a YAML session config.
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Slicing mode: equal, transient, or custom.
        #[arg(short, long)]
        mode: Option<String>,
        /// Equal-division slice count.
        #[arg(short, long)]
        count: Option<usize>,
        /// Transient sensitivity between 0 and 1.
        #[arg(long)]
        sensitivity: Option<f32>,
    },
    /// Processes and slices a file, writing one WAV per slice.
    Export {
        /// The audio file to slice.
        file: PathBuf,
        /// The directory to write slice WAVs into.
        #[arg(short, long)]
        output: PathBuf,
        /// Path to a YAML session config.
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Slicing mode: equal, transient, or custom.
        #[arg(short, long)]
        mode: Option<String>,
        /// Equal-division slice count.
        #[arg(short, long)]
        count: Option<usize>,
        /// Transient sensitivity between 0 and 1.
        #[arg(long)]
        sensitivity: Option<f32>,
    },
    /// Plays a processed file through the audio interface.
    Play {
        /// The audio file to audition.
        file: PathBuf,
        /// The output device name to play through.
        #[arg(short, long)]
        device: Option<String>,
        /// Path to a YAML session config.
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Lists the available audio output devices.
    Devices {},
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Inspect { file } => {
            let workspace = load_workspace(&file)?;
            let source = workspace.source();
            println!("{}", file.display());
            println!("- channels: {}", source.channel_count());
            println!("- frames: {}", source.len());
            println!("- sample rate: {}Hz", source.sample_rate());
            println!("- duration: {:.3}s", source.duration().as_secs_f64());
        }
        Commands::Slice {
            file,
            settings,
            mode,
            count,
            sensitivity,
        } => {
            let mut workspace = load_workspace(&file)?;
            let config = build_config(settings, mode, count, sensitivity)?;
            config.apply_to(&mut workspace);

            println!("{}", workspace);
            if workspace.mode() == SliceMode::Transient {
                println!(
                    "- sensitivity: {} ({})",
                    workspace.sensitivity(),
                    sensitivity_label(workspace.sensitivity())
                );
            }
            for slice in workspace.slices() {
                println!(
                    "- slice {:>2}: [{:>8}, {:>8})  {:>9.1} ms",
                    slice.index + 1,
                    slice.start_sample,
                    slice.end_sample,
                    slice.duration_ms
                );
            }
        }
        Commands::Export {
            file,
            output,
            settings,
            mode,
            count,
            sensitivity,
        } => {
            let mut workspace = load_workspace(&file)?;
            let config = build_config(settings, mode, count, sensitivity)?;
            config.apply_to(&mut workspace);

            let paths = workspace.export_to_dir(&output)?;
            println!("Wrote {} slices to {}:", paths.len(), output.display());
            for path in paths {
                println!("- {}", path.display());
            }
        }
        Commands::Play {
            file,
            device,
            settings,
        } => {
            let mut workspace = load_workspace(&file)?;
            let config = build_config(settings, None, None, None)?;
            config.apply_to(&mut workspace);

            let backend: Arc<dyn audio::AudioBackend> = match device {
                Some(name) => Arc::new(cpal_backend::Backend::with_device(&name)),
                None => Arc::new(cpal_backend::Backend::new()),
            };

            // Block until the loop plays out.
            let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
            let controller = PreviewController::new(backend)
                .on_session_end(move |_| {
                    let _ = done_tx.send(());
                });

            println!("{}", workspace);
            controller.preview(workspace.processed(), PreviewSession::whole_loop())?;
            done_rx.recv()?;
        }
        Commands::Devices {} => {
            let devices = audio::list_output_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
    }

    Ok(())
}

/// Decodes a file into a fresh workspace named after it.
fn load_workspace(file: &PathBuf) -> Result<SlicingWorkspace, Box<dyn Error>> {
    let bytes = fs::read(file)?;
    let name = file.file_name().and_then(|n| n.to_str());
    let buffer = decode::decode(&bytes, name)?;
    Ok(SlicingWorkspace::new(buffer, name))
}

/// Merges the optional settings file with command-line overrides.
fn build_config(
    settings: Option<PathBuf>,
    mode: Option<String>,
    count: Option<usize>,
    sensitivity: Option<f32>,
) -> Result<SessionConfig, Box<dyn Error>> {
    let mut config = match settings {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    if let Some(mode) = mode {
        config.set_mode(SliceMode::from_str(&mode)?);
    }
    if let Some(count) = count {
        config.set_count(count);
    }
    if let Some(sensitivity) = sensitivity {
        config.set_sensitivity(sensitivity);
    }
    Ok(config)
}
