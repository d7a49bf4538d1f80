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
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::key::PianoKey;
use super::layer::{LayerId, LayerRef, VelocityLayer};
use super::part::{MultiSamplePart, PartId, SampleFile, Segment};
use super::velocity::{KeyRange, VelocityRange};
use super::{check_midi_value, midi_key, DEFAULT_VELOCITY, MAX_ROUND_ROBIN, MIDI_KEY_COUNT};
use crate::audio::AudioContainer;
use crate::error::MappingError;

/// Pitch behaviour applied to every occupied slot of a layer at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PitchSettings {
    /// Plays unshifted on the owning key only.
    Fixed,
    /// Pitch-shifts across `key_range` relative to `root_key`. The root defaults
    /// to the owning key.
    Pitched {
        root_key: Option<u8>,
        key_range: KeyRange,
    },
}

/// Where an occupied slot sits, in serialization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotAddress {
    pub key: u8,
    pub layer: LayerId,
    /// Position of the layer among the key's occupied layers.
    pub layer_index: usize,
    /// Round-robin index within the layer.
    pub slot: usize,
    pub part: PartId,
}

impl SlotAddress {
    pub fn layer_ref(&self) -> LayerRef {
        LayerRef {
            key: self.key,
            layer: self.layer,
        }
    }
}

/// A read-only view of one mapped key for listings.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct KeySummary {
    pub number: u8,
    pub note_name: String,
    pub is_black: bool,
    pub layers: usize,
    pub samples: usize,
}

/// The authoritative mapping: 128 keys, their layers, and the part arena.
///
/// Not built for concurrent writers. Validation and encoding borrow the model
/// immutably, so it cannot change under an export in progress.
#[derive(Clone, Debug)]
pub struct MappingModel {
    name: String,
    keys: Vec<PianoKey>,
    parts: BTreeMap<PartId, MultiSamplePart>,
    next_part_id: u64,
    next_layer_id: u64,
}

impl MappingModel {
    /// Creates an empty model with all 128 keys.
    pub fn new(name: impl Into<String>) -> MappingModel {
        MappingModel {
            name: name.into(),
            keys: (0..MIDI_KEY_COUNT).map(|n| PianoKey::new(n as u8)).collect(),
            parts: BTreeMap::new(),
            next_part_id: 0,
            next_layer_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn keys(&self) -> &[PianoKey] {
        &self.keys
    }

    pub fn key(&self, key: u8) -> Option<&PianoKey> {
        self.keys.get(key as usize)
    }

    pub fn layer(&self, layer: LayerRef) -> Option<&VelocityLayer> {
        self.key(layer.key).and_then(|key| key.layer(layer.layer))
    }

    pub fn part(&self, id: PartId) -> Option<&MultiSamplePart> {
        self.parts.get(&id)
    }

    /// All parts in identity order.
    pub fn parts(&self) -> impl Iterator<Item = &MultiSamplePart> {
        self.parts.values()
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// True when no key has a sample mapped.
    pub fn is_empty(&self) -> bool {
        !self.keys.iter().any(|key| key.has_sample())
    }

    /// Every occupied slot: keys ascending, layers in stored order, round-robin
    /// index ascending. Holes and layers without samples are skipped.
    pub fn slots(&self) -> impl Iterator<Item = SlotAddress> + '_ {
        self.keys.iter().flat_map(|key| {
            key.layers()
                .iter()
                .filter(|layer| layer.active_sample_count() > 0)
                .enumerate()
                .flat_map(move |(layer_index, layer)| {
                    layer.occupied().map(move |(slot, part)| SlotAddress {
                        key: key.number(),
                        layer: layer.id(),
                        layer_index,
                        slot,
                        part,
                    })
                })
        })
    }

    /// Summaries of every key that has at least one layer.
    pub fn key_summaries(&self) -> Vec<KeySummary> {
        self.keys
            .iter()
            .filter(|key| !key.layers().is_empty())
            .map(|key| KeySummary {
                number: key.number(),
                note_name: key.note_name(),
                is_black: key.is_black(),
                layers: key.layers().len(),
                samples: key
                    .layers()
                    .iter()
                    .map(|layer| layer.active_sample_count())
                    .sum(),
            })
            .collect()
    }

    /// Maps a file onto a key as a fixed-pitch part.
    ///
    /// The part goes into the first layer covering the default mapping velocity
    /// (or the loudest layer when none does). A full-range layer is created when
    /// the key has none. The first hole is filled, otherwise a new round-robin
    /// slot is appended.
    pub fn add_sample(&mut self, key: u32, file: SampleFile) -> Result<PartId, MappingError> {
        let key = midi_key(key)?;
        check_format(&file)?;

        let layer = {
            let piano_key = &self.keys[key as usize];
            piano_key
                .layers()
                .iter()
                .find(|layer| layer.range().covers(DEFAULT_VELOCITY))
                .or_else(|| piano_key.layers().first())
                .map(|layer| layer.id())
        };
        let layer = match layer {
            Some(layer) => LayerRef { key, layer },
            None => self.add_velocity_layer(key as u32, VelocityRange::full())?,
        };

        let index = match self.layer(layer) {
            Some(existing) => existing
                .first_hole()
                .unwrap_or(existing.round_robin_count()),
            None => return Err(MappingError::UnknownLayer(layer)),
        };
        self.assign_round_robin_slot(layer, index, file)
    }

    /// Adds a velocity layer to a key. Overlapping ranges are allowed.
    ///
    /// Layers are kept in descending velocity order; a new layer goes after any
    /// existing layer with the same range.
    pub fn add_velocity_layer(
        &mut self,
        key: u32,
        range: VelocityRange,
    ) -> Result<LayerRef, MappingError> {
        let key = midi_key(key)?;
        range.check(&format!("new layer on key {}", key))?;

        let id = self.next_layer_id();
        let layers = self.keys[key as usize].layers_mut();
        let position = layers
            .iter()
            .position(|existing| range.descending(&existing.range()).is_lt())
            .unwrap_or(layers.len());
        layers.insert(position, VelocityLayer::new(id, range));

        debug!(key, layer = id.0, %range, position, "Added velocity layer");
        Ok(LayerRef { key, layer: id })
    }

    /// Removes a layer and every part in it. Returns the removed part identities.
    pub fn remove_velocity_layer(&mut self, layer: LayerRef) -> Result<Vec<PartId>, MappingError> {
        let key = self
            .keys
            .get_mut(layer.key as usize)
            .ok_or(MappingError::UnknownLayer(layer))?;
        let position = key
            .layers()
            .iter()
            .position(|existing| existing.id() == layer.layer)
            .ok_or(MappingError::UnknownLayer(layer))?;
        let removed = key.layers_mut().remove(position);

        let ids: Vec<PartId> = removed.occupied().map(|(_, id)| id).collect();
        for id in &ids {
            self.parts.remove(id);
        }
        debug!(%layer, parts = ids.len(), "Removed velocity layer");
        Ok(ids)
    }

    /// Puts a new part for `file` into round-robin slot `index` of the layer,
    /// padding with holes as needed. A part already in that slot is dropped.
    pub fn assign_round_robin_slot(
        &mut self,
        layer: LayerRef,
        index: usize,
        file: SampleFile,
    ) -> Result<PartId, MappingError> {
        if index >= MAX_ROUND_ROBIN {
            return Err(MappingError::out_of_range(
                "round-robin slot",
                index as u64,
                0,
                (MAX_ROUND_ROBIN - 1) as u64,
                layer.to_string(),
            ));
        }
        check_format(&file)?;
        let range = self
            .layer(layer)
            .map(|existing| existing.range())
            .ok_or(MappingError::UnknownLayer(layer))?;

        let id = self.next_part_id();
        let part = MultiSamplePart::new(id, layer.key, range, file);
        let replaced = self
            .layer_mut(layer)
            .ok_or(MappingError::UnknownLayer(layer))?
            .set_slot(index, id);
        if let Some(replaced) = replaced {
            self.parts.remove(&replaced);
            debug!(part = %replaced, "Replaced round-robin slot");
        }
        debug!(%layer, slot = index, part = %id, name = part.name(), "Assigned round-robin slot");
        self.parts.insert(id, part);
        Ok(id)
    }

    /// Applies pitch settings to every occupied slot of a layer.
    ///
    /// Arguments are checked before anything changes, so either every part is
    /// updated or none is.
    pub fn apply_pitch_settings(
        &mut self,
        layer: LayerRef,
        settings: PitchSettings,
    ) -> Result<(), MappingError> {
        let context = format!("pitch settings for {}", layer);
        let (key_range, root_key) = match settings {
            PitchSettings::Fixed => (KeyRange::single(layer.key), None),
            PitchSettings::Pitched {
                root_key,
                key_range,
            } => {
                key_range.check(&context)?;
                let root_key = root_key.unwrap_or(layer.key);
                check_midi_value("root key", root_key, &context)?;
                (key_range, Some(root_key))
            }
        };

        let ids: Vec<PartId> = self
            .layer(layer)
            .ok_or(MappingError::UnknownLayer(layer))?
            .occupied()
            .map(|(_, id)| id)
            .collect();
        for id in &ids {
            if let Some(part) = self.parts.get_mut(id) {
                part.set_pitch(key_range, root_key);
            }
        }
        debug!(%layer, %key_range, ?root_key, parts = ids.len(), "Applied pitch settings");
        Ok(())
    }

    /// Removes a part. Its slot becomes a hole so round-robin indices stay put.
    pub fn remove_sample(&mut self, id: PartId) -> Result<MultiSamplePart, MappingError> {
        let part = self.parts.remove(&id).ok_or(MappingError::UnknownPart(id))?;
        for key in self.keys.iter_mut() {
            if key
                .layers_mut()
                .iter_mut()
                .any(|layer| layer.clear_part(id))
            {
                break;
            }
        }
        debug!(part = %id, name = part.name(), "Removed sample");
        Ok(part)
    }

    pub fn rename_part(&mut self, id: PartId, name: impl Into<String>) -> Result<(), MappingError> {
        self.parts
            .get_mut(&id)
            .ok_or(MappingError::UnknownPart(id))?
            .set_name(name.into());
        Ok(())
    }

    /// Sets the playback region of a part. The end is exclusive and may not pass
    /// the source frame count.
    pub fn set_segment(&mut self, id: PartId, start: u64, end: u64) -> Result<(), MappingError> {
        let part = self.parts.get_mut(&id).ok_or(MappingError::UnknownPart(id))?;
        let frames = part.source().frame_count();
        let context = format!("{} \"{}\"", id, part.name());
        if end > frames {
            return Err(MappingError::out_of_range(
                "segment end",
                end,
                start,
                frames,
                context,
            ));
        }
        if start > end {
            return Err(MappingError::out_of_range(
                "segment start",
                start,
                0,
                end,
                context,
            ));
        }
        part.set_segment(Segment { start, end });
        Ok(())
    }

    /// Appends a layer in document order, without sorting.
    pub(crate) fn push_layer(&mut self, key: u8, range: VelocityRange) -> LayerRef {
        let id = self.next_layer_id();
        self.keys[key as usize]
            .layers_mut()
            .push(VelocityLayer::new(id, range));
        LayerRef { key, layer: id }
    }

    /// Places an already-built part, keeping its identity.
    pub(crate) fn place_part(
        &mut self,
        layer: LayerRef,
        index: usize,
        part: MultiSamplePart,
    ) -> Result<(), MappingError> {
        let id = part.id();
        if self.parts.contains_key(&id) {
            return Err(MappingError::IdentityCollision(id));
        }
        let next_part_id = id.0.checked_add(1).ok_or_else(|| {
            MappingError::MalformedDocument(format!("{} is too large", id))
        })?;
        if index >= MAX_ROUND_ROBIN {
            return Err(MappingError::MalformedDocument(format!(
                "{} has more than {} round-robin slots",
                layer, MAX_ROUND_ROBIN
            )));
        }
        let target = self
            .layer_mut(layer)
            .ok_or(MappingError::UnknownLayer(layer))?;
        if target.slots().get(index).is_some_and(|slot| slot.is_some()) {
            return Err(MappingError::MalformedDocument(format!(
                "{} round-robin slot {} is assigned twice",
                layer, index
            )));
        }
        target.set_slot(index, id);
        self.parts.insert(id, part);
        self.next_part_id = self.next_part_id.max(next_part_id);
        Ok(())
    }

    fn layer_mut(&mut self, layer: LayerRef) -> Option<&mut VelocityLayer> {
        self.keys
            .get_mut(layer.key as usize)
            .and_then(|key| key.layer_mut(layer.layer))
    }

    fn next_part_id(&mut self) -> PartId {
        let id = PartId(self.next_part_id);
        self.next_part_id += 1;
        id
    }

    fn next_layer_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }
}

#[cfg(test)]
impl MappingModel {
    /// Points a slot at an existing part without any checks (test only).
    pub(crate) fn force_slot(&mut self, layer: LayerRef, index: usize, id: PartId) {
        if let Some(target) = self.layer_mut(layer) {
            target.set_slot(index, id);
        }
    }

    /// Mutable access to a part, bypassing the checked mutators (test only).
    pub(crate) fn part_mut(&mut self, id: PartId) -> Option<&mut MultiSamplePart> {
        self.parts.get_mut(&id)
    }
}

fn check_format(file: &SampleFile) -> Result<(), MappingError> {
    match AudioContainer::from_path(file.path()) {
        Some(_) => Ok(()),
        None => Err(MappingError::UnsupportedFormat(file.path().to_path_buf())),
    }
}
