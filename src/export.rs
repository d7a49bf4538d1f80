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

//! Writing presets to disk and reading them back.
//!
//! An export is all or nothing: the preset only appears at its final path once
//! the whole document has been validated, encoded and written.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::ExportSettings;
use crate::error::MappingError;
use crate::mapping::MappingModel;
use crate::paths::PathResolver;
use crate::preset::{PresetDecoder, PresetEncoder};
use crate::util::{filename_display, filename_stem};
use crate::verify::{Validator, VerificationReport};

/// Error types for exporting and opening presets
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("mapping failed verification with {} blocking issue(s)", .0.error_count())]
    Validation(VerificationReport),

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// What an export wrote, and the companion files it expects next to it.
#[derive(Debug, Clone)]
pub struct ExportPlan {
    preset: PathBuf,
    companions: Vec<(PathBuf, PathBuf)>,
    warnings: VerificationReport,
}

impl ExportPlan {
    pub fn preset(&self) -> &Path {
        &self.preset
    }

    /// (source, destination) pairs, one per distinct companion file.
    pub fn companions(&self) -> &[(PathBuf, PathBuf)] {
        &self.companions
    }

    /// Non-blocking findings from validation.
    pub fn warnings(&self) -> &VerificationReport {
        &self.warnings
    }

    /// Copies every companion file into place. A destination that already is
    /// its source is left alone. Returns the number of files copied.
    pub fn copy_samples(&self) -> Result<usize, ExportError> {
        let mut copied = 0;
        for (source, destination) in &self.companions {
            if same_file(source, destination) {
                debug!(path = ?destination, "Companion sample already in place");
                continue;
            }
            if let Some(dir) = destination.parent() {
                fs::create_dir_all(dir).map_err(io_error(dir))?;
            }
            fs::copy(source, destination).map_err(io_error(source))?;
            debug!(from = ?source, to = ?destination, "Copied companion sample");
            copied += 1;
        }
        info!(copied, preset = filename_display(&self.preset), "Copied companion samples");
        Ok(copied)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Runs validation, path resolution and encoding, then writes the preset.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    settings: ExportSettings,
}

impl Exporter {
    pub fn new(settings: ExportSettings) -> Exporter {
        Exporter { settings }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// The preset path for a name in a directory, using the configured extension.
    pub fn preset_path(&self, dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{}.{}", name, self.settings.preset_extension()))
    }

    /// Exports the model to `preset_path`. Nothing is written when validation
    /// finds a blocking issue. Companion files are copied only when the
    /// settings ask for it.
    pub fn export(&self, model: &MappingModel, preset_path: &Path) -> Result<ExportPlan, ExportError> {
        let resolver = PathResolver::for_preset(preset_path);
        let verified = Validator::from_settings(&self.settings)
            .validate(model, &resolver)
            .map_err(ExportError::Validation)?;

        let bytes = PresetEncoder::new(self.settings.creator()).encode(model, &verified.paths)?;
        write_atomic(preset_path, &bytes)?;
        info!(
            preset = ?preset_path,
            parts = model.part_count(),
            bytes = bytes.len(),
            "Wrote preset"
        );

        let plan = ExportPlan {
            preset: preset_path.to_path_buf(),
            companions: verified.paths.companion_files(),
            warnings: verified.warnings,
        };
        if self.settings.copy_samples() {
            plan.copy_samples()?;
        }
        Ok(plan)
    }
}

/// Writes next to the target first, then renames over it.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(io_error(dir))?;
    }
    let temp_path = path.with_file_name(format!(".{}.tmp", filename_display(path)));
    fs::write(&temp_path, bytes).map_err(io_error(&temp_path))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        fs::remove_file(&temp_path).ok();
        return Err(io_error(path)(e));
    }
    Ok(())
}

/// Reads and decodes a preset. Sample paths point at the companion copies
/// below the preset's directory and the model is named after the file.
pub fn open_preset(path: &Path) -> Result<MappingModel, ExportError> {
    let bytes = fs::read(path).map_err(io_error(path))?;
    let mut decoder = PresetDecoder::new();
    if let Some(dir) = path.parent() {
        decoder = decoder.with_preset_dir(dir);
    }
    let mut model = decoder.decode(&bytes)?;
    model.set_name(filename_stem(path));
    Ok(model)
}
