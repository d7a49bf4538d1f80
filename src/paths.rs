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

//! Decides where each sample is recorded in the preset and where its companion
//! copy must live on disk. Nothing here touches the file system.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MappingError;
use crate::mapping::{MappingModel, PartId, SampleFile};

/// The host's "relative to the preset's directory" path convention.
pub const RELATIVE_PATH_TYPE: u8 = 3;

/// Companion samples live here, below the preset's directory.
pub const SAMPLES_SUBDIR: [&str; 2] = ["Samples", "Imported"];

/// Where one sample is recorded and where its companion file belongs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Written into the document, always `Samples/Imported/<file>`.
    relative: String,
    /// The absolute source the companion copy is taken from.
    source: PathBuf,
    /// `<preset dir>/Samples/Imported/<file>`.
    destination: PathBuf,
}

impl ResolvedPath {
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }
}

/// Resolved paths for every part of a model, keyed by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedPaths {
    by_part: BTreeMap<PartId, ResolvedPath>,
}

impl ResolvedPaths {
    pub fn get(&self, id: PartId) -> Option<&ResolvedPath> {
        self.by_part.get(&id)
    }

    pub fn len(&self) -> usize {
        self.by_part.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_part.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PartId, &ResolvedPath)> {
        self.by_part.iter().map(|(id, path)| (*id, path))
    }

    /// Distinct (source, destination) pairs, one per companion file.
    pub fn companion_files(&self) -> Vec<(PathBuf, PathBuf)> {
        let mut seen: BTreeMap<&Path, &Path> = BTreeMap::new();
        for path in self.by_part.values() {
            seen.entry(path.destination.as_path())
                .or_insert(path.source.as_path());
        }
        seen.into_iter()
            .map(|(destination, source)| (source.to_path_buf(), destination.to_path_buf()))
            .collect()
    }

    pub(crate) fn insert(&mut self, id: PartId, path: ResolvedPath) {
        self.by_part.insert(id, path);
    }
}

/// Resolves sample paths against a preset's save directory.
#[derive(Clone, Debug)]
pub struct PathResolver {
    preset_dir: PathBuf,
}

impl PathResolver {
    /// Creates a resolver for a preset that will be saved at `preset_path`.
    pub fn for_preset(preset_path: &Path) -> PathResolver {
        PathResolver {
            preset_dir: preset_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    /// Creates a resolver for presets saved in `preset_dir`.
    pub fn for_directory(preset_dir: impl Into<PathBuf>) -> PathResolver {
        PathResolver {
            preset_dir: preset_dir.into(),
        }
    }

    pub fn preset_dir(&self) -> &Path {
        &self.preset_dir
    }

    /// The directory companion samples are placed in.
    pub fn samples_dir(&self) -> PathBuf {
        SAMPLES_SUBDIR
            .iter()
            .fold(self.preset_dir.clone(), |dir, part| dir.join(part))
    }

    /// The path recorded in the document for a file name.
    pub fn relative_path(file_name: &str) -> String {
        format!("{}/{}", SAMPLES_SUBDIR.join("/"), file_name)
    }

    /// Resolves one source file. Only the file name matters; where the source
    /// currently lives does not.
    pub fn resolve(&self, source: &SampleFile) -> Result<ResolvedPath, MappingError> {
        let file_name = source
            .file_name()
            .ok_or_else(|| MappingError::UnsupportedFormat(source.path().to_path_buf()))?;
        Ok(ResolvedPath {
            relative: PathResolver::relative_path(file_name),
            source: source.path().to_path_buf(),
            destination: self.samples_dir().join(file_name),
        })
    }

    /// Resolves every part, reporting every failure instead of stopping at the
    /// first. Two different sources sharing a base name (ignoring case) are a
    /// collision; the same source used by several parts is not.
    pub fn resolve_with_problems(&self, model: &MappingModel) -> (ResolvedPaths, Vec<MappingError>) {
        let mut resolved = ResolvedPaths::default();
        let mut problems = Vec::new();
        let mut claimed: HashMap<String, PathBuf> = HashMap::new();

        for slot in model.slots() {
            let Some(part) = model.part(slot.part) else {
                continue;
            };
            let path = match self.resolve(part.source()) {
                Ok(path) => path,
                Err(e) => {
                    problems.push(e);
                    continue;
                }
            };

            let name = part.source().file_name().unwrap_or_default();
            match claimed.get(&name.to_lowercase()) {
                Some(first) if first != part.source().path() => {
                    problems.push(MappingError::DuplicateSampleName {
                        name: name.to_string(),
                        first: first.clone(),
                        second: part.source().path().to_path_buf(),
                    });
                    continue;
                }
                Some(_) => {}
                None => {
                    claimed.insert(name.to_lowercase(), part.source().path().to_path_buf());
                }
            }

            debug!(part = %slot.part, relative = path.relative(), "Resolved sample path");
            resolved.insert(slot.part, path);
        }

        (resolved, problems)
    }

    /// Resolves every part, failing on the first problem.
    pub fn resolve_all(&self, model: &MappingModel) -> Result<ResolvedPaths, MappingError> {
        let (resolved, problems) = self.resolve_with_problems(model);
        match problems.into_iter().next() {
            Some(e) => Err(e),
            None => Ok(resolved),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::sample_file;

    #[test]
    fn test_relative_path_ignores_source_location() {
        let resolver = PathResolver::for_preset(Path::new("/presets/Kit.adv"));
        assert_eq!(resolver.preset_dir(), Path::new("/presets"));

        for source in ["/tmp/kick.wav", "/home/me/deep/dir/kick.wav"] {
            let path = resolver.resolve(&sample_file(source, 10)).unwrap();
            assert_eq!(path.relative(), "Samples/Imported/kick.wav");
            assert_eq!(
                path.destination(),
                Path::new("/presets/Samples/Imported/kick.wav")
            );
            assert_eq!(path.source(), Path::new(source));
        }
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = PathResolver::for_directory("/presets");
        let file = sample_file("/tmp/snare.wav", 10);
        assert_eq!(resolver.resolve(&file), resolver.resolve(&file));
        assert_eq!(
            resolver.samples_dir(),
            PathBuf::from("/presets/Samples/Imported")
        );
    }

    #[test]
    fn test_duplicate_sample_name() {
        let mut model = MappingModel::new("kit");
        model.add_sample(36, sample_file("/a/kick.wav", 10)).unwrap();
        model.add_sample(37, sample_file("/b/kick.wav", 10)).unwrap();

        let resolver = PathResolver::for_directory("/presets");
        assert_eq!(
            resolver.resolve_all(&model),
            Err(MappingError::DuplicateSampleName {
                name: "kick.wav".to_string(),
                first: PathBuf::from("/a/kick.wav"),
                second: PathBuf::from("/b/kick.wav"),
            })
        );
    }

    #[test]
    fn test_duplicate_sample_name_ignores_case() {
        let mut model = MappingModel::new("kit");
        model.add_sample(36, sample_file("/a/Kick.wav", 10)).unwrap();
        model.add_sample(37, sample_file("/b/kick.WAV", 10)).unwrap();

        let (_, problems) = PathResolver::for_directory("/presets").resolve_with_problems(&model);
        assert_eq!(problems.len(), 1);
        assert_eq!(problems[0].category(), "duplicate-sample-name");
    }

    #[test]
    fn test_same_source_shared_by_parts() {
        let mut model = MappingModel::new("kit");
        let a = model.add_sample(36, sample_file("/a/kick.wav", 10)).unwrap();
        let b = model.add_sample(37, sample_file("/a/kick.wav", 10)).unwrap();

        let resolved = PathResolver::for_directory("/presets")
            .resolve_all(&model)
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.get(a), resolved.get(b));
        assert_eq!(
            resolved.companion_files(),
            vec![(
                PathBuf::from("/a/kick.wav"),
                PathBuf::from("/presets/Samples/Imported/kick.wav")
            )]
        );
    }
}
