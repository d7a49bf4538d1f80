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

//! The multisample mapping model.
//!
//! A [`MappingModel`] owns 128 [`PianoKey`]s. Each key owns an ordered list of
//! [`VelocityLayer`]s, and each layer holds round-robin slots that point into a
//! single arena of [`MultiSamplePart`]s by [`PartId`]. Parts live only in the
//! arena, so a slot and the part it names can never disagree.

mod key;
mod layer;
mod model;
mod part;
mod velocity;

pub use key::PianoKey;
pub use layer::{LayerId, LayerRef, VelocityLayer};
pub use model::{KeySummary, MappingModel, PitchSettings, SlotAddress};
pub use part::{MultiSamplePart, PartId, SampleFile, Segment};
pub use velocity::{KeyRange, VelocityRange};

use crate::error::MappingError;

/// Number of MIDI keys held by every model.
pub const MIDI_KEY_COUNT: usize = 128;

/// Highest value a MIDI key or velocity can take.
pub const MAX_MIDI_VALUE: u8 = 127;

/// The velocity new samples are mapped at when no layer is given.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Most round-robin slots a single velocity layer can hold.
pub const MAX_ROUND_ROBIN: usize = 128;

/// Checks that a MIDI key number is inside 0-127 and narrows it.
pub fn midi_key(key: u32) -> Result<u8, MappingError> {
    if key > MAX_MIDI_VALUE as u32 {
        return Err(MappingError::InvalidKey(key));
    }
    Ok(key as u8)
}

/// Checks that a MIDI data value (key or velocity) is inside 0-127.
pub(crate) fn check_midi_value(
    field: &'static str,
    value: u8,
    context: &str,
) -> Result<(), MappingError> {
    if value > MAX_MIDI_VALUE {
        return Err(MappingError::out_of_range(
            field,
            value as u64,
            0,
            MAX_MIDI_VALUE as u64,
            context,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midi_key_bounds() {
        for key in 0..=127u32 {
            assert_eq!(midi_key(key), Ok(key as u8));
        }
        assert_eq!(midi_key(128), Err(MappingError::InvalidKey(128)));
        assert_eq!(midi_key(u32::MAX), Err(MappingError::InvalidKey(u32::MAX)));
    }

    #[test]
    fn test_check_midi_value() {
        assert!(check_midi_value("velocity", 127, "ctx").is_ok());
        let err = check_midi_value("velocity", 128, "ctx").unwrap_err();
        assert_eq!(err.category(), "out-of-range");
    }
}
