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
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::velocity::{KeyRange, VelocityRange};
use crate::error::MappingError;

/// Stable identity of a sample part, independent of where it sits in the mapping.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartId(pub(crate) u64);

impl PartId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "part {}", self.0)
    }
}

/// An audio file reference with metadata that has already been read by the caller.
/// The mapping core trusts these facts and never touches the file itself.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SampleFile {
    /// Absolute path of the file when the part was created.
    path: PathBuf,
    /// The path the file was first imported from; kept when the file moves.
    original_path: PathBuf,
    /// Sample rate in Hz.
    sample_rate: f64,
    /// Total frames in the file.
    frame_count: u64,
    /// Size on disk in bytes.
    file_size: u64,
    /// Last modification time in seconds since the Unix epoch.
    last_modified: u64,
}

impl SampleFile {
    /// Creates a reference whose original path is the current path.
    pub fn new(path: impl Into<PathBuf>, sample_rate: f64, frame_count: u64) -> SampleFile {
        let path = path.into();
        SampleFile {
            original_path: path.clone(),
            path,
            sample_rate,
            frame_count,
            file_size: 0,
            last_modified: 0,
        }
    }

    pub fn with_original_path(mut self, original_path: impl Into<PathBuf>) -> SampleFile {
        self.original_path = original_path.into();
        self
    }

    pub fn with_file_size(mut self, file_size: u64) -> SampleFile {
        self.file_size = file_size;
        self
    }

    pub fn with_last_modified(mut self, last_modified: u64) -> SampleFile {
        self.last_modified = last_modified;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_path(&self) -> &Path {
        &self.original_path
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn last_modified(&self) -> u64 {
        self.last_modified
    }

    /// The base file name, if it is valid UTF-8.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// The file name without its extension, used as the default part name.
    pub fn stem(&self) -> Option<&str> {
        self.path.file_stem().and_then(|stem| stem.to_str())
    }
}

/// A sub-region of the source file, in frames. `end` is exclusive.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    pub start: u64,
    pub end: u64,
}

/// The unit that is serialized as one sample reference.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct MultiSamplePart {
    id: PartId,
    name: String,
    key_range: KeyRange,
    velocity: VelocityRange,
    source: SampleFile,
    segment: Segment,
    /// Present only in pitched mode.
    root_key: Option<u8>,
}

impl MultiSamplePart {
    /// Creates a fixed-pitch part covering a single key and the whole file.
    pub(crate) fn new(id: PartId, key: u8, velocity: VelocityRange, source: SampleFile) -> Self {
        let name = source.stem().unwrap_or("sample").to_string();
        let segment = Segment {
            start: 0,
            end: source.frame_count(),
        };
        MultiSamplePart {
            id,
            name,
            key_range: KeyRange::single(key),
            velocity,
            source,
            segment,
            root_key: None,
        }
    }

    /// Rebuilds a part from already-parsed fields.
    pub(crate) fn from_parts(
        id: PartId,
        name: String,
        key_range: KeyRange,
        velocity: VelocityRange,
        source: SampleFile,
        segment: Segment,
        root_key: Option<u8>,
    ) -> Self {
        MultiSamplePart {
            id,
            name,
            key_range,
            velocity,
            source,
            segment,
            root_key,
        }
    }

    pub fn id(&self) -> PartId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key_range(&self) -> KeyRange {
        self.key_range
    }

    pub fn velocity(&self) -> VelocityRange {
        self.velocity
    }

    pub fn source(&self) -> &SampleFile {
        &self.source
    }

    pub fn segment(&self) -> Segment {
        self.segment
    }

    pub fn is_pitched(&self) -> bool {
        self.root_key.is_some()
    }

    /// The root key as recorded; absent in fixed mode.
    pub fn root_key(&self) -> Option<u8> {
        self.root_key
    }

    /// The key the host plays the sample unshifted at.
    pub fn effective_root_key(&self) -> u8 {
        self.root_key.unwrap_or(self.key_range.min)
    }

    /// Whether a pitched part's root key lies inside its own key range.
    pub fn root_key_in_range(&self) -> bool {
        self.root_key
            .map(|root| self.key_range.contains(root))
            .unwrap_or(true)
    }

    /// Reports every segment problem against the source frame count.
    pub fn segment_problems(&self) -> Vec<MappingError> {
        let mut problems = Vec::new();
        let context = format!("{} \"{}\"", self.id, self.name);
        if self.segment.end > self.source.frame_count() {
            problems.push(MappingError::out_of_range(
                "segment end",
                self.segment.end,
                self.segment.start,
                self.source.frame_count(),
                context.clone(),
            ));
        }
        if self.segment.start > self.segment.end {
            problems.push(MappingError::out_of_range(
                "segment start",
                self.segment.start,
                0,
                self.segment.end,
                context,
            ));
        }
        problems
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_segment(&mut self, segment: Segment) {
        self.segment = segment;
    }

    pub(crate) fn set_pitch(&mut self, key_range: KeyRange, root_key: Option<u8>) {
        self.key_range = key_range;
        self.root_key = root_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kick() -> SampleFile {
        SampleFile::new("/tmp/kick.wav", 44100.0, 4410)
            .with_file_size(8864)
            .with_last_modified(1_700_000_000)
    }

    #[test]
    fn test_new_part_defaults() {
        let part = MultiSamplePart::new(PartId(1), 60, VelocityRange::full(), kick());
        assert_eq!(part.name(), "kick");
        assert_eq!(part.key_range(), KeyRange::single(60));
        assert_eq!(part.segment(), Segment { start: 0, end: 4410 });
        assert!(!part.is_pitched());
        assert_eq!(part.root_key(), None);
        assert_eq!(part.effective_root_key(), 60);
        assert!(part.segment_problems().is_empty());
    }

    #[test]
    fn test_original_path_survives_move() {
        let moved = kick().with_original_path("/old/kick.wav");
        let part = MultiSamplePart::new(PartId(1), 60, VelocityRange::full(), moved);
        assert_eq!(part.source().original_path(), Path::new("/old/kick.wav"));
        assert_eq!(part.source().path(), Path::new("/tmp/kick.wav"));
    }

    #[test]
    fn test_segment_problems() {
        let mut part = MultiSamplePart::new(PartId(1), 60, VelocityRange::full(), kick());
        part.set_segment(Segment {
            start: 5000,
            end: 4411,
        });
        assert_eq!(part.segment_problems().len(), 2);
    }

    #[test]
    fn test_root_key_outside_range() {
        let mut part = MultiSamplePart::new(PartId(1), 60, VelocityRange::full(), kick());
        part.set_pitch(KeyRange { min: 48, max: 59 }, Some(60));
        assert!(part.is_pitched());
        assert!(!part.root_key_in_range());
        assert_eq!(part.effective_root_key(), 60);
    }
}
