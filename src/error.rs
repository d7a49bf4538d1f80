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
use std::path::PathBuf;

use crate::mapping::{LayerRef, PartId};

/// Errors raised while building, checking, resolving, encoding or decoding a mapping.
/// Every variant is recoverable; nothing in the core aborts the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MappingError {
    #[error("MIDI key {0} is outside 0-127")]
    InvalidKey(u32),

    #[error("{} is not a supported audio file", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error(
        "sample name \"{name}\" is used by both {} and {}",
        .first.display(),
        .second.display()
    )]
    DuplicateSampleName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("no key has a sample mapped; nothing to export")]
    EmptyMapping,

    #[error("{0} has no resolved relative path")]
    UnresolvedPath(PartId),

    #[error("malformed preset document: {0}")]
    MalformedDocument(String),

    #[error("{field} value {value} is outside {min}-{max} ({context})")]
    OutOfRangeValue {
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
        context: String,
    },

    #[error("{0} is referenced by more than one slot")]
    IdentityCollision(PartId),

    #[error("{0} does not exist")]
    UnknownLayer(LayerRef),

    #[error("{0} does not exist")]
    UnknownPart(PartId),
}

impl MappingError {
    /// Shorthand for an out of range report.
    pub fn out_of_range(
        field: &'static str,
        value: u64,
        min: u64,
        max: u64,
        context: impl Into<String>,
    ) -> MappingError {
        MappingError::OutOfRangeValue {
            field,
            value,
            min,
            max,
            context: context.into(),
        }
    }

    /// A short stable category name, used to group verification issues.
    pub fn category(&self) -> &'static str {
        match self {
            MappingError::InvalidKey(_) => "invalid-key",
            MappingError::UnsupportedFormat(_) => "unsupported-format",
            MappingError::DuplicateSampleName { .. } => "duplicate-sample-name",
            MappingError::EmptyMapping => "empty-mapping",
            MappingError::UnresolvedPath(_) => "unresolved-path",
            MappingError::MalformedDocument(_) => "malformed-document",
            MappingError::OutOfRangeValue { .. } => "out-of-range",
            MappingError::IdentityCollision(_) => "identity-collision",
            MappingError::UnknownLayer(_) => "unknown-layer",
            MappingError::UnknownPart(_) => "unknown-part",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_range_message() {
        let err = MappingError::out_of_range("velocity max", 130, 0, 127, "key 60 layer 0");
        assert_eq!(
            err.to_string(),
            "velocity max value 130 is outside 0-127 (key 60 layer 0)"
        );
        assert_eq!(err.category(), "out-of-range");
    }

    #[test]
    fn test_duplicate_name_message() {
        let err = MappingError::DuplicateSampleName {
            name: "kick.wav".to_string(),
            first: PathBuf::from("/a/kick.wav"),
            second: PathBuf::from("/b/kick.wav"),
        };
        assert!(err.to_string().contains("/a/kick.wav"));
        assert!(err.to_string().contains("/b/kick.wav"));
    }
}
