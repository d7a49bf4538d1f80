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

//! Element names of the Sampler preset document and a minimal element tree used
//! when reading one back.

use std::fmt::Display;
use std::str::FromStr;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::MappingError;

pub const ROOT: &str = "Ableton";
pub const MAJOR_VERSION: &str = "5";
pub const MINOR_VERSION: &str = "11.0_433";
pub const SCHEMA_CHANGE_COUNT: &str = "3";

pub const MULTI_SAMPLER: &str = "MultiSampler";
pub const PLAYER: &str = "Player";
pub const MULTI_SAMPLE_MAP: &str = "MultiSampleMap";
pub const SAMPLE_PARTS: &str = "SampleParts";
pub const MULTI_SAMPLE_PART: &str = "MultiSamplePart";

pub const ID: &str = "Id";
pub const MAP_KEY: &str = "MapKey";
pub const MAP_LAYER: &str = "MapLayer";
pub const MAP_SLOT: &str = "MapSlot";
pub const VALUE: &str = "Value";

pub const NAME: &str = "Name";
pub const KEY_RANGE: &str = "KeyRange";
pub const VELOCITY_RANGE: &str = "VelocityRange";
pub const SELECTOR_RANGE: &str = "SelectorRange";
pub const MIN: &str = "Min";
pub const MAX: &str = "Max";
pub const CROSSFADE_MIN: &str = "CrossfadeMin";
pub const CROSSFADE_MAX: &str = "CrossfadeMax";
pub const ROOT_KEY: &str = "RootKey";
pub const DETUNE: &str = "Detune";
pub const TUNE_SCALE: &str = "TuneScale";
pub const PANORAMA: &str = "Panorama";
pub const VOLUME: &str = "Volume";
pub const LINK: &str = "Link";
pub const SAMPLE_START: &str = "SampleStart";
pub const SAMPLE_END: &str = "SampleEnd";

pub const SAMPLE_REF: &str = "SampleRef";
pub const FILE_REF: &str = "FileRef";
pub const RELATIVE_PATH_TYPE: &str = "RelativePathType";
pub const RELATIVE_PATH: &str = "RelativePath";
pub const PATH: &str = "Path";
pub const TYPE: &str = "Type";
pub const LIVE_PACK_NAME: &str = "LivePackName";
pub const LIVE_PACK_ID: &str = "LivePackId";
pub const ORIGINAL_FILE_SIZE: &str = "OriginalFileSize";
pub const ORIGINAL_CRC: &str = "OriginalCrc";
pub const LAST_MOD_DATE: &str = "LastModDate";
pub const SOURCE_CONTEXT: &str = "SourceContext";
pub const SAMPLE_USAGE_HINT: &str = "SampleUsageHint";
pub const DEFAULT_DURATION: &str = "DefaultDuration";
pub const DEFAULT_SAMPLE_RATE: &str = "DefaultSampleRate";

/// One parsed element with its attributes and children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    /// Parses a whole document and returns its root element.
    pub fn parse(bytes: &[u8]) -> Result<Element, MappingError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader.read_event_into(&mut buf).map_err(|e| {
                malformed(format!(
                    "unparsable XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            match event {
                Event::Start(e) => stack.push(Element::from_start(&e)?),
                Event::Empty(e) => {
                    let element = Element::from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("unexpected closing tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(open) = stack.last() {
            return Err(malformed(format!("<{}> is never closed", open.name)));
        }
        root.ok_or_else(|| malformed("document has no root element"))
    }

    fn from_start(start: &BytesStart) -> Result<Element, MappingError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| malformed(format!("bad attribute on <{}>: {}", name, e)))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| malformed(format!("bad attribute {} on <{}>: {}", key, name, e)))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Element {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// The child element, or a malformed-document error naming it.
    pub fn require(&self, name: &str) -> Result<&Element, MappingError> {
        self.child(name)
            .ok_or_else(|| malformed(format!("<{}> is missing <{}>", self.name, name)))
    }

    /// The `Value` attribute of a child element, if present.
    pub fn value_of(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(|child| child.attribute(VALUE))
    }

    /// Parses the `Value` attribute of an optional child element.
    pub fn parse_value<T>(&self, name: &str) -> Result<Option<T>, MappingError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.value_of(name) {
            Some(raw) => parse_number(name, raw).map(Some),
            None => Ok(None),
        }
    }

    /// Parses the `Value` attribute of a required child element.
    pub fn require_value<T>(&self, name: &str) -> Result<T, MappingError>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.parse_value(name)?.ok_or_else(|| {
            malformed(format!("<{}> is missing a value for <{}>", self.name, name))
        })
    }

    /// Parses an optional attribute.
    pub fn parse_attribute<T>(&self, key: &str) -> Result<Option<T>, MappingError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.attribute(key) {
            Some(raw) => parse_number(key, raw).map(Some),
            None => Ok(None),
        }
    }
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), MappingError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(malformed(format!(
            "<{}> appears after the root element",
            element.name
        ))),
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, MappingError>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| malformed(format!("{} has unparsable value \"{}\": {}", name, raw, e)))
}

pub(crate) fn malformed(message: impl Into<String>) -> MappingError {
    MappingError::MalformedDocument(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let doc = br#"<?xml version="1.0" encoding="UTF-8"?>
<Ableton MajorVersion="5">
	<Outer>
		<Name Value="a &amp; b" />
		<Empty />
	</Outer>
</Ableton>"#;
        let root = Element::parse(doc).unwrap();
        assert_eq!(root.name, "Ableton");
        assert_eq!(root.attribute("MajorVersion"), Some("5"));
        let outer = root.require("Outer").unwrap();
        assert_eq!(outer.value_of("Name"), Some("a & b"));
        assert!(outer.child("Empty").is_some());
        assert!(outer.require("Missing").is_err());
    }

    #[test]
    fn test_parse_values() {
        let root = Element::parse(br#"<R><Min Value="12"/><Rate Value="44100.5"/><Bad Value="x"/></R>"#)
            .unwrap();
        assert_eq!(root.require_value::<u32>("Min").unwrap(), 12);
        assert_eq!(root.parse_value::<f64>("Rate").unwrap(), Some(44100.5));
        assert_eq!(root.parse_value::<u32>("Missing").unwrap(), None);
        assert!(root.require_value::<u32>("Missing").is_err());
        assert!(root.require_value::<u32>("Bad").is_err());
    }

    #[test]
    fn test_parse_rejects_broken_documents() {
        assert!(Element::parse(b"").is_err());
        assert!(Element::parse(b"<A><B></A>").is_err());
        assert!(Element::parse(b"<A>").is_err());
        assert!(Element::parse(b"<A/><B/>").is_err());
    }
}
