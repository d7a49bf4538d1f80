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

use config::{Config, File};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::ConfigError;
use crate::audio;
use crate::mapping::{KeyRange, LayerRef, MappingModel, PitchSettings, SampleFile, VelocityRange};

/// A YAML representation of an instrument: which files play on which keys.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct InstrumentDefinition {
    /// The instrument name. Defaults to the definition's file stem.
    name: Option<String>,

    /// The mapped keys.
    #[serde(default)]
    keys: Vec<KeyDefinition>,
}

/// One key and its velocity layers.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct KeyDefinition {
    /// MIDI key number, 0-127.
    key: u32,

    /// Velocity layers, in any order.
    #[serde(default)]
    layers: Vec<LayerDefinition>,
}

/// One velocity layer and its round-robin slots.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct LayerDefinition {
    /// The inclusive velocity range. Defaults to the full range.
    #[serde(default = "default_range")]
    velocity: [u8; 2],

    /// Crossfade bounds. Default to the velocity range.
    crossfade: Option<[u8; 2]>,

    /// Pitch-shift settings. Fixed pitch when absent.
    pitch: Option<PitchDefinition>,

    /// Round-robin slots. `null` entries are holes.
    #[serde(default)]
    slots: Vec<Option<SlotDefinition>>,
}

fn default_range() -> [u8; 2] {
    [0, 127]
}

/// Pitched playback across a key range.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct PitchDefinition {
    /// Defaults to the owning key.
    root_key: Option<u8>,

    key_range: [u8; 2],
}

/// One sample file in a round-robin slot.
#[derive(Deserialize, Clone, Serialize, Debug)]
pub struct SlotDefinition {
    /// The audio file, relative to the definition's directory.
    file: String,

    /// The part name. Defaults to the file stem.
    name: Option<String>,

    /// Playback region in frames, end exclusive.
    segment: Option<[u64; 2]>,

    /// Overrides the probed sample rate.
    sample_rate: Option<f64>,

    /// Overrides the probed frame count.
    frames: Option<u64>,
}

impl InstrumentDefinition {
    /// Parse an instrument definition from a YAML file.
    pub fn deserialize(path: &Path) -> Result<InstrumentDefinition, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<InstrumentDefinition>()?)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Builds a mapping model. Relative sample paths are resolved against
    /// `base_dir`.
    pub fn to_model(&self, base_dir: &Path) -> Result<MappingModel, ConfigError> {
        let mut model = MappingModel::new(self.name.clone().unwrap_or_default());
        for key in &self.keys {
            for layer in &key.layers {
                layer.apply(&mut model, key.key, base_dir)?;
            }
        }
        info!(
            name = model.name(),
            parts = model.part_count(),
            "Loaded instrument definition"
        );
        Ok(model)
    }
}

impl LayerDefinition {
    fn apply(&self, model: &mut MappingModel, key: u32, base_dir: &Path) -> Result<(), ConfigError> {
        let mut range = VelocityRange::new(self.velocity[0], self.velocity[1])?;
        if let Some([min, max]) = self.crossfade {
            range = range.with_crossfade(min, max)?;
        }
        let layer = model.add_velocity_layer(key, range)?;

        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(slot) = slot {
                slot.apply(model, layer, index, base_dir)?;
            }
        }

        if let Some(pitch) = &self.pitch {
            model.apply_pitch_settings(
                layer,
                PitchSettings::Pitched {
                    root_key: pitch.root_key,
                    key_range: KeyRange::new(pitch.key_range[0], pitch.key_range[1])?,
                },
            )?;
        }
        Ok(())
    }
}

impl SlotDefinition {
    fn apply(
        &self,
        model: &mut MappingModel,
        layer: LayerRef,
        index: usize,
        base_dir: &Path,
    ) -> Result<(), ConfigError> {
        let file = self.sample_file(base_dir)?;
        let id = model.assign_round_robin_slot(layer, index, file)?;
        if let Some(name) = &self.name {
            model.rename_part(id, name.as_str())?;
        }
        if let Some([start, end]) = self.segment {
            model.set_segment(id, start, end)?;
        }
        Ok(())
    }

    /// Probes the file unless both the rate and the length are given.
    fn sample_file(&self, base_dir: &Path) -> Result<SampleFile, ConfigError> {
        let path = resolve_file(base_dir, &self.file);
        if let (Some(rate), Some(frames)) = (self.sample_rate, self.frames) {
            debug!(path = ?path, "Using declared sample metadata");
            return Ok(SampleFile::new(path, rate, frames));
        }

        let probed = audio::probe(&path).map_err(|source| ConfigError::Probe {
            path: path.clone(),
            source,
        })?;
        if self.sample_rate.is_none() && self.frames.is_none() {
            return Ok(probed);
        }
        Ok(SampleFile::new(
            probed.path(),
            self.sample_rate.unwrap_or(probed.sample_rate()),
            self.frames.unwrap_or(probed.frame_count()),
        )
        .with_file_size(probed.file_size())
        .with_last_modified(probed.last_modified()))
    }
}

fn resolve_file(base_dir: &Path, file: &str) -> PathBuf {
    let path = Path::new(file);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
