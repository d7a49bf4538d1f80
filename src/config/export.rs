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
use std::path::Path;

use config::{Config, File};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use crate::paths::RELATIVE_PATH_TYPE;
use crate::preset::{DEFAULT_CREATOR, PRESET_EXTENSION};

/// How a pitched part whose root key lies outside its key range is reported.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RootKeyPolicy {
    /// Report a warning and export anyway.
    #[default]
    Warn,
    /// Block the export.
    Error,
}

/// How many blocking findings the validator collects.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    /// Collect every finding.
    #[default]
    Batch,
    /// Stop at the first blocking finding.
    First,
}

/// A YAML representation of the export settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ExportSettings {
    /// File extension of written presets.
    preset_extension: String,

    /// Written into the document root.
    creator: String,

    /// Path convention recorded for samples. Only 3 is supported.
    relative_path_type: u8,

    root_key_policy: RootKeyPolicy,

    report_mode: ReportMode,

    /// Copy companion samples next to the preset after writing it.
    copy_samples: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        ExportSettings {
            preset_extension: PRESET_EXTENSION.to_string(),
            creator: DEFAULT_CREATOR.to_string(),
            relative_path_type: RELATIVE_PATH_TYPE,
            root_key_policy: RootKeyPolicy::default(),
            report_mode: ReportMode::default(),
            copy_samples: false,
        }
    }
}

impl ExportSettings {
    /// Parse export settings from a YAML file.
    pub fn deserialize(path: &Path) -> Result<ExportSettings, ConfigError> {
        Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<ExportSettings>()?
            .checked()
    }

    /// Rejects settings the exporter cannot honour.
    pub(crate) fn checked(self) -> Result<ExportSettings, ConfigError> {
        if self.relative_path_type != RELATIVE_PATH_TYPE {
            return Err(ConfigError::UnsupportedRelativePathType(
                self.relative_path_type,
            ));
        }
        if self.preset_extension.is_empty() || self.preset_extension.contains(['/', '.']) {
            return Err(ConfigError::Invalid(format!(
                "preset extension \"{}\" is not a plain extension",
                self.preset_extension
            )));
        }
        Ok(self)
    }

    pub fn preset_extension(&self) -> &str {
        &self.preset_extension
    }

    pub fn creator(&self) -> &str {
        &self.creator
    }

    pub fn root_key_policy(&self) -> RootKeyPolicy {
        self.root_key_policy
    }

    pub fn report_mode(&self) -> ReportMode {
        self.report_mode
    }

    pub fn copy_samples(&self) -> bool {
        self.copy_samples
    }

    pub fn with_copy_samples(mut self, copy_samples: bool) -> ExportSettings {
        self.copy_samples = copy_samples;
        self
    }

    pub fn with_root_key_policy(mut self, policy: RootKeyPolicy) -> ExportSettings {
        self.root_key_policy = policy;
        self
    }

    pub fn with_report_mode(mut self, mode: ReportMode) -> ExportSettings {
        self.report_mode = mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use config::FileFormat;

    use super::*;

    fn parse(yaml: &str) -> Result<ExportSettings, ConfigError> {
        Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<ExportSettings>()?
            .checked()
    }

    #[test]
    fn test_defaults() {
        let settings = parse("copy_samples: false").unwrap();
        assert_eq!(settings, ExportSettings::default());
        assert_eq!(settings.preset_extension(), "adv");
        assert_eq!(settings.root_key_policy(), RootKeyPolicy::Warn);
        assert_eq!(settings.report_mode(), ReportMode::Batch);
        assert!(settings.creator().starts_with("zonemap "));
    }

    #[test]
    fn test_full_settings() {
        let settings = parse(
            r#"
preset_extension: adv
creator: studio
relative_path_type: 3
root_key_policy: error
report_mode: first
copy_samples: true
"#,
        )
        .unwrap();
        assert_eq!(settings.creator(), "studio");
        assert_eq!(settings.root_key_policy(), RootKeyPolicy::Error);
        assert_eq!(settings.report_mode(), ReportMode::First);
        assert!(settings.copy_samples());
    }

    #[test]
    fn test_rejects_other_path_types() {
        assert!(matches!(
            parse("relative_path_type: 1"),
            Err(ConfigError::UnsupportedRelativePathType(1))
        ));
    }

    #[test]
    fn test_rejects_bad_extension() {
        assert!(matches!(
            parse("preset_extension: tar.gz"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(parse("root_key_policy: sometimes").is_err());
    }

    #[test]
    fn test_deserialize_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.yaml");
        std::fs::write(&path, "creator: file\n").unwrap();
        let settings = ExportSettings::deserialize(&path).unwrap();
        assert_eq!(settings.creator(), "file");
        assert!(!settings.copy_samples());
    }
}
