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
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::document::*;
use crate::error::MappingError;
use crate::mapping::{
    KeyRange, MappingModel, MultiSamplePart, PartId, SampleFile, Segment, VelocityRange,
    MAX_MIDI_VALUE, MAX_ROUND_ROBIN,
};
use crate::paths;

/// Editor addressing recorded on a part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Address {
    key: u8,
    layer: usize,
    slot: usize,
}

/// Rebuilds a mapping from a preset document.
///
/// When parts carry `MapKey`/`MapLayer`/`MapSlot`, round-robin holes come back
/// from the gaps in slot indices. Without them the owning key is the bottom of
/// the key range, layers are grouped by velocity range in document order and
/// slots are densely packed.
#[derive(Clone, Debug, Default)]
pub struct PresetDecoder {
    preset_dir: Option<PathBuf>,
}

impl PresetDecoder {
    pub fn new() -> PresetDecoder {
        PresetDecoder::default()
    }

    /// Points decoded parts at their companion copies below `preset_dir`
    /// instead of their original location.
    pub fn with_preset_dir(mut self, preset_dir: impl Into<PathBuf>) -> PresetDecoder {
        self.preset_dir = Some(preset_dir.into());
        self
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<MappingModel, MappingError> {
        let root = Element::parse(bytes)?;
        if root.name != ROOT {
            return Err(malformed(format!(
                "root element is <{}>, expected <{}>",
                root.name, ROOT
            )));
        }
        let sample_parts = root
            .require(MULTI_SAMPLER)?
            .require(PLAYER)?
            .require(MULTI_SAMPLE_MAP)?
            .require(SAMPLE_PARTS)?;

        let mut decoded = Vec::new();
        for element in sample_parts.children_named(MULTI_SAMPLE_PART) {
            decoded.push((read_address(element)?, self.read_part(element)?));
        }

        let explicit = decoded.iter().filter(|(address, _)| address.is_some()).count();
        let model = if explicit == decoded.len() {
            build_addressed(decoded)?
        } else if explicit == 0 {
            build_packed(decoded)?
        } else {
            return Err(malformed(
                "only some sample parts carry mapping addresses",
            ));
        };

        info!(parts = model.part_count(), "Decoded preset document");
        Ok(model)
    }

    fn read_part(&self, element: &Element) -> Result<MultiSamplePart, MappingError> {
        let id: u64 = element
            .parse_attribute(ID)?
            .ok_or_else(|| malformed(format!("<{}> has no {}", MULTI_SAMPLE_PART, ID)))?;
        let context = format!("{} {}", MULTI_SAMPLE_PART, id);

        let keys = element.require(KEY_RANGE)?;
        let key_range = KeyRange {
            min: midi_value(keys, MIN, &context)?,
            max: midi_value(keys, MAX, &context)?,
        };
        let velocities = element.require(VELOCITY_RANGE)?;
        let min = midi_value(velocities, MIN, &context)?;
        let max = midi_value(velocities, MAX, &context)?;
        let velocity = VelocityRange {
            min,
            max,
            crossfade_min: optional_midi_value(velocities, CROSSFADE_MIN, &context)?.unwrap_or(min),
            crossfade_max: optional_midi_value(velocities, CROSSFADE_MAX, &context)?.unwrap_or(max),
        };
        if key_range.min > key_range.max || velocity.min > velocity.max {
            return Err(malformed(format!("{} has an inverted range", context)));
        }
        let root_key = optional_midi_value(element, ROOT_KEY, &context)?;

        let sample_ref = element.require(SAMPLE_REF)?;
        let file_ref = sample_ref.require(FILE_REF)?;
        if let Some(kind) = file_ref.parse_value::<u8>(RELATIVE_PATH_TYPE)? {
            if kind != paths::RELATIVE_PATH_TYPE {
                return Err(malformed(format!(
                    "{} uses relative path type {}, only {} is supported",
                    context,
                    kind,
                    paths::RELATIVE_PATH_TYPE
                )));
            }
        }
        let relative = file_ref
            .value_of(RELATIVE_PATH)
            .filter(|relative| !relative.is_empty())
            .ok_or_else(|| malformed(format!("{} has no {}", context, RELATIVE_PATH)))?;
        let original = file_ref
            .value_of(PATH)
            .filter(|path| !path.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(relative));
        let current = match &self.preset_dir {
            Some(dir) => relative
                .split('/')
                .fold(dir.clone(), |path, component| path.join(component)),
            None => original.clone(),
        };

        let frame_count: u64 = sample_ref.require_value(DEFAULT_DURATION)?;
        let sample_rate: f64 = sample_ref.require_value(DEFAULT_SAMPLE_RATE)?;
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(malformed(format!(
                "{} has sample rate {}",
                context, sample_rate
            )));
        }
        let source = SampleFile::new(current, sample_rate, frame_count)
            .with_original_path(original)
            .with_file_size(file_ref.parse_value(ORIGINAL_FILE_SIZE)?.unwrap_or(0))
            .with_last_modified(sample_ref.parse_value(LAST_MOD_DATE)?.unwrap_or(0));

        let segment = Segment {
            start: element.parse_value(SAMPLE_START)?.unwrap_or(0),
            end: element.parse_value(SAMPLE_END)?.unwrap_or(frame_count),
        };
        let name = match element.value_of(NAME) {
            Some(name) => name.to_string(),
            None => Path::new(relative)
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or_default()
                .to_string(),
        };

        Ok(MultiSamplePart::from_parts(
            PartId(id),
            name,
            key_range,
            velocity,
            source,
            segment,
            root_key,
        ))
    }
}

fn read_address(element: &Element) -> Result<Option<Address>, MappingError> {
    let key: Option<u32> = element.parse_attribute(MAP_KEY)?;
    let layer: Option<usize> = element.parse_attribute(MAP_LAYER)?;
    let slot: Option<usize> = element.parse_attribute(MAP_SLOT)?;
    match (key, layer, slot) {
        (Some(key), Some(layer), Some(slot)) => {
            if key > MAX_MIDI_VALUE as u32 {
                return Err(malformed(format!("{} {} is outside 0-127", MAP_KEY, key)));
            }
            if slot >= MAX_ROUND_ROBIN {
                return Err(malformed(format!(
                    "{} {} is outside 0-{}",
                    MAP_SLOT,
                    slot,
                    MAX_ROUND_ROBIN - 1
                )));
            }
            Ok(Some(Address {
                key: key as u8,
                layer,
                slot,
            }))
        }
        (None, None, None) => Ok(None),
        _ => Err(malformed(format!(
            "<{}> has an incomplete mapping address",
            MULTI_SAMPLE_PART
        ))),
    }
}

fn build_addressed(
    decoded: Vec<(Option<Address>, MultiSamplePart)>,
) -> Result<MappingModel, MappingError> {
    let mut layers: BTreeMap<(u8, usize), Vec<(usize, MultiSamplePart)>> = BTreeMap::new();
    for (address, part) in decoded {
        if let Some(address) = address {
            layers
                .entry((address.key, address.layer))
                .or_default()
                .push((address.slot, part));
        }
    }

    let mut model = MappingModel::new("");
    for ((key, ordinal), mut parts) in layers {
        parts.sort_by_key(|(slot, _)| *slot);
        let range = parts
            .first()
            .map(|(_, part)| part.velocity())
            .unwrap_or_default();
        let layer = model.push_layer(key, range);
        debug!(key, layer = ordinal, parts = parts.len(), "Rebuilt velocity layer");
        for (slot, part) in parts {
            model.place_part(layer, slot, part)?;
        }
    }
    Ok(model)
}

fn build_packed(
    decoded: Vec<(Option<Address>, MultiSamplePart)>,
) -> Result<MappingModel, MappingError> {
    let mut keys: BTreeMap<u8, Vec<(VelocityRange, Vec<MultiSamplePart>)>> = BTreeMap::new();
    for (_, part) in decoded {
        let layers = keys.entry(part.key_range().min).or_default();
        match layers
            .iter_mut()
            .find(|(range, _)| *range == part.velocity())
        {
            Some((_, parts)) => parts.push(part),
            None => layers.push((part.velocity(), vec![part])),
        }
    }

    let mut model = MappingModel::new("");
    for (key, layers) in keys {
        for (range, parts) in layers {
            let layer = model.push_layer(key, range);
            for (slot, part) in parts.into_iter().enumerate() {
                model.place_part(layer, slot, part)?;
            }
        }
    }
    Ok(model)
}

fn midi_value(parent: &Element, name: &str, context: &str) -> Result<u8, MappingError> {
    optional_midi_value(parent, name, context)?.ok_or_else(|| {
        malformed(format!(
            "{} is missing <{}> in <{}>",
            context, name, parent.name
        ))
    })
}

fn optional_midi_value(
    parent: &Element,
    name: &str,
    context: &str,
) -> Result<Option<u8>, MappingError> {
    match parent.parse_value::<u32>(name)? {
        Some(value) if value > MAX_MIDI_VALUE as u32 => Err(malformed(format!(
            "{} <{}> in <{}> is {}, outside 0-127",
            context, name, parent.name, value
        ))),
        Some(value) => Ok(Some(value as u8)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{LayerRef, PitchSettings};
    use crate::paths::PathResolver;
    use crate::preset::PresetEncoder;
    use crate::testutil::sample_file;

    /// (key, velocity range, round-robin index, identity) for every occupied slot.
    fn tuples(model: &MappingModel) -> Vec<(u8, VelocityRange, usize, PartId)> {
        model
            .slots()
            .map(|slot| {
                let part = model.part(slot.part).unwrap();
                (slot.key, part.velocity(), slot.slot, slot.part)
            })
            .collect()
    }

    fn round_trip(model: &MappingModel) -> MappingModel {
        let paths = PathResolver::for_directory("/presets")
            .resolve_all(model)
            .unwrap();
        let bytes = PresetEncoder::default().encode(model, &paths).unwrap();
        PresetDecoder::new().decode(&bytes).unwrap()
    }

    fn drum_kit() -> (MappingModel, LayerRef) {
        let mut model = MappingModel::new("kit");
        model.add_sample(36, sample_file("/tmp/kick.wav", 4410)).unwrap();
        let loud = model
            .add_velocity_layer(38, VelocityRange::new(64, 127).unwrap())
            .unwrap();
        let soft = model
            .add_velocity_layer(
                38,
                VelocityRange::new(0, 63).unwrap().with_crossfade(0, 70).unwrap(),
            )
            .unwrap();
        model
            .assign_round_robin_slot(loud, 0, sample_file("/tmp/snare_hard1.wav", 100))
            .unwrap();
        model
            .assign_round_robin_slot(loud, 2, sample_file("/tmp/snare_hard3.wav", 100))
            .unwrap();
        model
            .assign_round_robin_slot(soft, 1, sample_file("/tmp/snare_soft2.wav", 100))
            .unwrap();
        let piano = model
            .add_velocity_layer(60, VelocityRange::full())
            .unwrap();
        model
            .assign_round_robin_slot(piano, 0, sample_file("/tmp/piano_c4.wav", 1000))
            .unwrap();
        model
            .apply_pitch_settings(
                piano,
                PitchSettings::Pitched {
                    root_key: None,
                    key_range: KeyRange::new(48, 72).unwrap(),
                },
            )
            .unwrap();
        (model, loud)
    }

    #[test]
    fn test_round_trip_preserves_tuples() {
        let (model, loud) = drum_kit();
        let decoded = round_trip(&model);
        assert_eq!(tuples(&decoded), tuples(&model));

        // Holes come back from index gaps.
        let layer = &decoded.key(38).unwrap().layers()[0];
        assert_eq!(layer.round_robin_count(), 3);
        assert_eq!(layer.slots()[1], None);
        assert_eq!(layer.range(), model.layer(loud).unwrap().range());
    }

    #[test]
    fn test_round_trip_preserves_parts() {
        let (model, _) = drum_kit();
        let decoded = round_trip(&model);
        for part in model.parts() {
            assert_eq!(decoded.part(part.id()), Some(part));
        }
        assert_eq!(decoded.part_count(), model.part_count());
    }

    #[test]
    fn test_round_trip_is_stable() {
        let (model, _) = drum_kit();
        let resolver = PathResolver::for_directory("/presets");
        let encoder = PresetEncoder::default();
        let first = encoder
            .encode(&model, &resolver.resolve_all(&model).unwrap())
            .unwrap();
        let decoded = PresetDecoder::new().decode(&first).unwrap();
        let second = encoder
            .encode(&decoded, &resolver.resolve_all(&decoded).unwrap())
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_new_parts_after_decode_get_fresh_identity() {
        let (model, _) = drum_kit();
        let mut decoded = round_trip(&model);
        let id = decoded
            .add_sample(40, sample_file("/tmp/tom.wav", 10))
            .unwrap();
        assert!(model.part(id).is_none());
    }

    #[test]
    fn test_preset_dir_rebases_sources() {
        let (model, _) = drum_kit();
        let paths = PathResolver::for_directory("/presets")
            .resolve_all(&model)
            .unwrap();
        let bytes = PresetEncoder::default().encode(&model, &paths).unwrap();
        let decoded = PresetDecoder::new()
            .with_preset_dir("/moved")
            .decode(&bytes)
            .unwrap();
        let kick = decoded
            .parts()
            .find(|part| part.name() == "kick")
            .unwrap();
        assert_eq!(
            kick.source().path(),
            Path::new("/moved/Samples/Imported/kick.wav")
        );
        assert_eq!(kick.source().original_path(), Path::new("/tmp/kick.wav"));
    }

    const MINIMAL_PART: &str = r#"<MultiSamplePart Id="4">
	<KeyRange><Min Value="60"/><Max Value="60"/></KeyRange>
	<VelocityRange><Min Value="0"/><Max Value="127"/></VelocityRange>
	<SampleRef>
		<FileRef><RelativePath Value="Samples/Imported/kick.wav"/></FileRef>
		<DefaultDuration Value="4410"/>
		<DefaultSampleRate Value="44100"/>
	</SampleRef>
</MultiSamplePart>"#;

    fn wrap(parts: &str) -> String {
        format!(
            "<Ableton><MultiSampler><Player><MultiSampleMap><SampleParts>{}</SampleParts></MultiSampleMap></Player></MultiSampler></Ableton>",
            parts
        )
    }

    #[test]
    fn test_missing_optional_fields() {
        let model = PresetDecoder::new()
            .decode(wrap(MINIMAL_PART).as_bytes())
            .unwrap();
        let part = model.part(PartId(4)).unwrap();
        assert_eq!(part.name(), "kick");
        assert_eq!(part.segment(), Segment { start: 0, end: 4410 });
        assert_eq!(part.velocity(), VelocityRange::full());
        assert!(!part.is_pitched());
        assert_eq!(part.source().path(), Path::new("Samples/Imported/kick.wav"));
        assert!(model.key(60).unwrap().has_sample());
    }

    #[test]
    fn test_unaddressed_parts_are_packed() {
        let second = MINIMAL_PART
            .replace("Id=\"4\"", "Id=\"5\"")
            .replace("kick.wav", "kick2.wav");
        let model = PresetDecoder::new()
            .decode(wrap(&format!("{}{}", MINIMAL_PART, second)).as_bytes())
            .unwrap();
        let layers = model.key(60).unwrap().layers();
        assert_eq!(layers.len(), 1);
        assert_eq!(layers[0].slots(), &[Some(PartId(4)), Some(PartId(5))]);
    }

    #[test]
    fn test_malformed_documents() {
        let decoder = PresetDecoder::new();
        let cases = [
            "not xml at all <".to_string(),
            "<Other/>".to_string(),
            "<Ableton><MultiSampler/></Ableton>".to_string(),
            wrap(&MINIMAL_PART.replace(" Id=\"4\"", "")),
            wrap(&MINIMAL_PART.replace("<Min Value=\"60\"/>", "<Min Value=\"200\"/>")),
            wrap(&MINIMAL_PART.replace("<Max Value=\"127\"/>", "<Max Value=\"loud\"/>")),
            wrap(&MINIMAL_PART.replace("<RelativePath Value=\"Samples/Imported/kick.wav\"/>", "")),
            wrap(&MINIMAL_PART.replace("<DefaultSampleRate Value=\"44100\"/>", "")),
            wrap(&MINIMAL_PART.replace("Id=\"4\"", "Id=\"4\" MapKey=\"60\"")),
            wrap(&MINIMAL_PART.replace("<FileRef>", "<FileRef><RelativePathType Value=\"1\"/>")),
        ];
        for case in cases {
            let result = decoder.decode(case.as_bytes());
            assert!(
                matches!(result, Err(MappingError::MalformedDocument(_))),
                "expected malformed document for {}: {:?}",
                case,
                result
            );
        }
    }

    #[test]
    fn test_duplicate_identity() {
        let doc = wrap(&format!("{}{}", MINIMAL_PART, MINIMAL_PART));
        assert!(matches!(
            PresetDecoder::new().decode(doc.as_bytes()),
            Err(MappingError::IdentityCollision(PartId(4)))
        ));
    }

    #[test]
    fn test_unusable_slot_or_identity() {
        let addressed = |slot: &str| {
            MINIMAL_PART.replace(
                "Id=\"4\"",
                &format!("Id=\"4\" MapKey=\"60\" MapLayer=\"0\" MapSlot=\"{}\"", slot),
            )
        };
        let cases = [
            wrap(&addressed("18446744073709551615")),
            wrap(&addressed("4000000000")),
            wrap(&addressed("128")),
            wrap(&MINIMAL_PART.replace("Id=\"4\"", "Id=\"18446744073709551615\"")),
        ];
        for case in cases {
            let result = PresetDecoder::new().decode(case.as_bytes());
            assert!(
                matches!(result, Err(MappingError::MalformedDocument(_))),
                "expected malformed document for {}: {:?}",
                case,
                result
            );
        }

        let model = PresetDecoder::new()
            .decode(wrap(&addressed("127")).as_bytes())
            .unwrap();
        assert_eq!(model.key(60).unwrap().layers()[0].round_robin_count(), 128);
    }

    #[test]
    fn test_empty_layer_re_encodes_identically() {
        let mut model = MappingModel::new("snare");
        model
            .add_velocity_layer(38, VelocityRange::new(64, 127).unwrap())
            .unwrap();
        let soft = model
            .add_velocity_layer(38, VelocityRange::new(0, 63).unwrap())
            .unwrap();
        model
            .assign_round_robin_slot(soft, 0, sample_file("/tmp/snare_soft.wav", 100))
            .unwrap();

        let resolver = PathResolver::for_directory("/presets");
        let encoder = PresetEncoder::default();
        let first = encoder
            .encode(&model, &resolver.resolve_all(&model).unwrap())
            .unwrap();
        assert!(String::from_utf8_lossy(&first).contains("MapLayer=\"0\""));

        let decoded = PresetDecoder::new().decode(&first).unwrap();
        let second = encoder
            .encode(&decoded, &resolver.resolve_all(&decoded).unwrap())
            .unwrap();
        assert_eq!(first, second);
    }
}
