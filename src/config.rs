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
use std::path::{Path, PathBuf};

use crate::mapping::MappingModel;

mod definition;
mod error;
mod export;

pub use self::definition::InstrumentDefinition;
pub use self::error::ConfigError;
pub use self::export::{ExportSettings, ReportMode, RootKeyPolicy};

/// Loads an instrument definition and builds its mapping. Sample paths are
/// relative to the definition's directory and the name defaults to its file stem.
pub fn load_instrument(path: &Path) -> Result<MappingModel, ConfigError> {
    let definition = InstrumentDefinition::deserialize(path)?;
    let base_dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut model = definition.to_model(&base_dir)?;
    if definition.name().is_none() {
        model.set_name(crate::util::filename_stem(path));
    }
    Ok(model)
}

/// Loads export settings, or the defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<ExportSettings, ConfigError> {
    match path {
        Some(path) => ExportSettings::deserialize(path),
        None => Ok(ExportSettings::default()),
    }
}
