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
use std::fmt::Display;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use tracing::{debug, info};

use super::document::*;
use crate::error::MappingError;
use crate::mapping::{MappingModel, MultiSamplePart, SlotAddress, MAX_MIDI_VALUE};
use crate::paths::{ResolvedPath, ResolvedPaths};

/// Creator string written when none is configured.
pub const DEFAULT_CREATOR: &str = concat!("zonemap ", env!("CARGO_PKG_VERSION"));

/// Serializes a mapping into a Sampler preset document.
///
/// Output depends only on the model and the resolved paths: keys ascending,
/// layers in stored order, round-robin slots ascending, holes omitted.
#[derive(Clone, Debug)]
pub struct PresetEncoder {
    creator: String,
}

impl Default for PresetEncoder {
    fn default() -> Self {
        PresetEncoder {
            creator: DEFAULT_CREATOR.to_string(),
        }
    }
}

impl PresetEncoder {
    pub fn new(creator: impl Into<String>) -> PresetEncoder {
        PresetEncoder {
            creator: creator.into(),
        }
    }

    /// Encodes the model. Fails with `EmptyMapping` when nothing is mapped and
    /// with `UnresolvedPath` when any part lacks a resolved path.
    pub fn encode(
        &self,
        model: &MappingModel,
        paths: &ResolvedPaths,
    ) -> Result<Vec<u8>, MappingError> {
        if model.is_empty() {
            return Err(MappingError::EmptyMapping);
        }

        let mut entries = Vec::new();
        for slot in model.slots() {
            let part = model
                .part(slot.part)
                .ok_or(MappingError::UnknownPart(slot.part))?;
            let path = paths
                .get(slot.part)
                .ok_or(MappingError::UnresolvedPath(slot.part))?;
            entries.push((slot, part, path));
        }

        let mut out = DocumentWriter::new();
        out.declaration()?;
        out.open(
            ROOT,
            &[
                ("MajorVersion", MAJOR_VERSION),
                ("MinorVersion", MINOR_VERSION),
                ("SchemaChangeCount", SCHEMA_CHANGE_COUNT),
                ("Creator", &self.creator),
                ("Revision", ""),
            ],
        )?;
        out.open(MULTI_SAMPLER, &[])?;
        out.open(PLAYER, &[])?;
        out.open(MULTI_SAMPLE_MAP, &[])?;
        out.open(SAMPLE_PARTS, &[])?;
        for (slot, part, path) in &entries {
            write_part(&mut out, slot, part, path)?;
        }
        out.close(SAMPLE_PARTS)?;
        out.close(MULTI_SAMPLE_MAP)?;
        out.close(PLAYER)?;
        out.close(MULTI_SAMPLER)?;
        out.close(ROOT)?;

        let bytes = out.finish();
        info!(
            parts = entries.len(),
            bytes = bytes.len(),
            "Encoded preset document"
        );
        Ok(bytes)
    }
}

fn write_part(
    out: &mut DocumentWriter,
    slot: &SlotAddress,
    part: &MultiSamplePart,
    path: &ResolvedPath,
) -> Result<(), MappingError> {
    let id = part.id().value().to_string();
    let key = slot.key.to_string();
    let layer = slot.layer_index.to_string();
    let round_robin = slot.slot.to_string();
    out.open(
        MULTI_SAMPLE_PART,
        &[
            (ID, &id),
            (MAP_KEY, &key),
            (MAP_LAYER, &layer),
            (MAP_SLOT, &round_robin),
        ],
    )?;

    out.value(NAME, part.name())?;

    let keys = part.key_range();
    out.range(KEY_RANGE, keys.min, keys.max, keys.min, keys.max)?;
    let velocity = part.velocity();
    out.range(
        VELOCITY_RANGE,
        velocity.min,
        velocity.max,
        velocity.crossfade_min,
        velocity.crossfade_max,
    )?;
    out.range(SELECTOR_RANGE, 0, MAX_MIDI_VALUE, 0, MAX_MIDI_VALUE)?;

    // An absent root key tells the host the part is unpitched.
    if let Some(root_key) = part.root_key() {
        out.value(ROOT_KEY, root_key)?;
    }
    out.value(DETUNE, 0)?;
    out.value(TUNE_SCALE, 100)?;
    out.value(PANORAMA, 0)?;
    out.value(VOLUME, 1)?;
    out.value(LINK, false)?;
    out.value(SAMPLE_START, part.segment().start)?;
    out.value(SAMPLE_END, part.segment().end)?;

    let source = part.source();
    out.open(SAMPLE_REF, &[])?;
    out.open(FILE_REF, &[])?;
    out.value(RELATIVE_PATH_TYPE, crate::paths::RELATIVE_PATH_TYPE)?;
    out.value(RELATIVE_PATH, path.relative())?;
    out.value(PATH, source.original_path().display())?;
    out.value(TYPE, 1)?;
    out.value(LIVE_PACK_NAME, "")?;
    out.value(LIVE_PACK_ID, "")?;
    out.value(ORIGINAL_FILE_SIZE, source.file_size())?;
    out.value(ORIGINAL_CRC, 0)?;
    out.close(FILE_REF)?;
    out.value(LAST_MOD_DATE, source.last_modified())?;
    out.empty(SOURCE_CONTEXT, &[])?;
    out.value(SAMPLE_USAGE_HINT, 0)?;
    out.value(DEFAULT_DURATION, source.frame_count())?;
    out.value(DEFAULT_SAMPLE_RATE, source.sample_rate())?;
    out.close(SAMPLE_REF)?;

    out.close(MULTI_SAMPLE_PART)?;
    debug!(part = %part.id(), key = slot.key, slot = slot.slot, "Encoded sample part");
    Ok(())
}

/// Tab-indented element writer over an in-memory buffer.
struct DocumentWriter {
    writer: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> DocumentWriter {
        DocumentWriter {
            writer: Writer::new_with_indent(Vec::new(), b'\t', 1),
        }
    }

    fn declaration(&mut self) -> Result<(), MappingError> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MappingError> {
        let start = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Start(start))
    }

    fn close(&mut self, name: &str) -> Result<(), MappingError> {
        self.write(Event::End(BytesEnd::new(name)))
    }

    fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<(), MappingError> {
        let element = BytesStart::new(name).with_attributes(attributes.iter().copied());
        self.write(Event::Empty(element))
    }

    /// Writes `<name Value="value"/>`.
    fn value(&mut self, name: &str, value: impl Display) -> Result<(), MappingError> {
        let value = value.to_string();
        self.empty(name, &[(VALUE, &value)])
    }

    fn range(&mut self, name: &str, min: u8, max: u8, cf_min: u8, cf_max: u8) -> Result<(), MappingError> {
        self.open(name, &[])?;
        self.value(MIN, min)?;
        self.value(MAX, max)?;
        self.value(CROSSFADE_MIN, cf_min)?;
        self.value(CROSSFADE_MAX, cf_max)?;
        self.close(name)
    }

    fn write(&mut self, event: Event<'_>) -> Result<(), MappingError> {
        self.writer
            .write_event(event)
            .map_err(|e| MappingError::MalformedDocument(format!("could not write document: {}", e)))
    }

    fn finish(self) -> Vec<u8> {
        let mut bytes = self.writer.into_inner();
        bytes.push(b'\n');
        bytes
    }
}
