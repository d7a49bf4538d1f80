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
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use zonemap::config::{self, ExportSettings};
use zonemap::export::{open_preset, ExportError, Exporter};
use zonemap::mapping::{KeySummary, MappingModel};
use zonemap::paths::PathResolver;
use zonemap::verify::{self, Validator};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A multisample mapper that exports Sampler presets."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exports an instrument definition as a preset.
    Export {
        /// The path to the instrument definition.
        definition: PathBuf,
        /// Where to write the preset.
        preset: PathBuf,
        /// The path to the export settings.
        #[arg[short, long]]
        settings: Option<PathBuf>,
        /// Copy the referenced samples next to the preset.
        #[arg[short, long]]
        copy_samples: bool,
    },
    /// Verifies an instrument definition without writing anything.
    Verify {
        /// The path to the instrument definition.
        definition: PathBuf,
        /// The directory the preset would be saved in.
        preset_dir: PathBuf,
        /// The path to the export settings.
        #[arg[short, long]]
        settings: Option<PathBuf>,
    },
    /// Lists the keys mapped by a preset.
    Inspect {
        /// The path to the preset.
        preset: PathBuf,
        /// Print JSON instead of YAML.
        #[arg[short, long]]
        json: bool,
    },
    /// Prints the audio facts read from a sample file.
    Probe {
        /// The path to the audio file.
        file: PathBuf,
    },
}

#[derive(Serialize)]
struct Listing<'a> {
    name: &'a str,
    parts: usize,
    keys: Vec<KeySummary>,
}

fn listing(model: &MappingModel) -> Listing<'_> {
    Listing {
        name: model.name(),
        parts: model.part_count(),
        keys: model.key_summaries(),
    }
}

fn load_settings(path: Option<&Path>) -> Result<ExportSettings, Box<dyn Error>> {
    Ok(config::load_settings(path)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Export {
            definition,
            preset,
            settings,
            copy_samples,
        } => {
            let mut settings = load_settings(settings.as_deref())?;
            if copy_samples {
                settings = settings.with_copy_samples(true);
            }
            let model = config::load_instrument(&definition)?;
            let plan = match Exporter::new(settings).export(&model, &preset) {
                Ok(plan) => plan,
                Err(ExportError::Validation(report)) => {
                    verify::print_report(&report, &model);
                    return Err(ExportError::Validation(report).into());
                }
                Err(e) => return Err(e.into()),
            };

            if !plan.warnings().is_clean() {
                verify::print_report(plan.warnings(), &model);
            }
            println!(
                "Wrote {} ({} sample part(s), {} companion file(s)).",
                plan.preset().display(),
                model.part_count(),
                plan.companions().len()
            );
            if !copy_samples {
                for (source, destination) in plan.companions() {
                    println!("- {} -> {}", source.display(), destination.display());
                }
            }
        }
        Commands::Verify {
            definition,
            preset_dir,
            settings,
        } => {
            let settings = load_settings(settings.as_deref())?;
            let model = config::load_instrument(&definition)?;
            let report = Validator::from_settings(&settings)
                .check(&model, &PathResolver::for_directory(preset_dir));
            verify::print_report(&report, &model);
            if report.has_errors() {
                return Err(format!("{} blocking issue(s) found", report.error_count()).into());
            }
        }
        Commands::Inspect { preset, json } => {
            let model = open_preset(&preset)?;
            let listing = listing(&model);
            if json {
                println!("{}", serde_json::to_string_pretty(&listing)?);
            } else {
                print!("{}", serde_yml::to_string(&listing)?);
            }
        }
        Commands::Probe { file } => {
            let sample = zonemap::audio::probe(&file)?;
            print!("{}", serde_yml::to_string(&sample)?);
        }
    }

    Ok(())
}
