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
use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{check_midi_value, MAX_MIDI_VALUE};
use crate::error::MappingError;

/// An inclusive velocity interval plus the crossfade bounds the host uses when
/// blending neighbouring layers.
///
/// Fields are public so that decoded or hand-built values can be checked by the
/// validator rather than rejected at construction.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VelocityRange {
    pub min: u8,
    pub max: u8,
    pub crossfade_min: u8,
    pub crossfade_max: u8,
}

impl VelocityRange {
    /// Creates a checked range whose crossfade bounds sit on its edges.
    pub fn new(min: u8, max: u8) -> Result<VelocityRange, MappingError> {
        let range = VelocityRange {
            min,
            max,
            crossfade_min: min,
            crossfade_max: max,
        };
        range.check("velocity range")?;
        Ok(range)
    }

    /// The whole 0-127 range.
    pub fn full() -> VelocityRange {
        VelocityRange {
            min: 0,
            max: MAX_MIDI_VALUE,
            crossfade_min: 0,
            crossfade_max: MAX_MIDI_VALUE,
        }
    }

    /// Replaces the crossfade bounds.
    pub fn with_crossfade(
        mut self,
        crossfade_min: u8,
        crossfade_max: u8,
    ) -> Result<VelocityRange, MappingError> {
        self.crossfade_min = crossfade_min;
        self.crossfade_max = crossfade_max;
        self.check("velocity range")?;
        Ok(self)
    }

    /// Returns true if the velocity falls inside [min, max].
    pub fn covers(&self, velocity: u8) -> bool {
        velocity >= self.min && velocity <= self.max
    }

    /// Reports every bound problem with this range.
    pub fn problems(&self, context: &str) -> Vec<MappingError> {
        let mut problems = Vec::new();
        for (field, value) in [
            ("velocity min", self.min),
            ("velocity max", self.max),
            ("velocity crossfade min", self.crossfade_min),
            ("velocity crossfade max", self.crossfade_max),
        ] {
            if let Err(e) = check_midi_value(field, value, context) {
                problems.push(e);
            }
        }
        if self.min > self.max {
            problems.push(MappingError::out_of_range(
                "velocity min",
                self.min as u64,
                0,
                self.max as u64,
                context,
            ));
        }
        problems
    }

    /// Returns the first bound problem with this range, if any.
    pub fn check(&self, context: &str) -> Result<(), MappingError> {
        match self.problems(context).into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Presentation order: louder layers first.
    pub(crate) fn descending(&self, other: &VelocityRange) -> Ordering {
        other
            .max
            .cmp(&self.max)
            .then_with(|| other.min.cmp(&self.min))
    }
}

impl Default for VelocityRange {
    fn default() -> Self {
        VelocityRange::full()
    }
}

impl fmt::Display for VelocityRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// An inclusive MIDI key interval.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeyRange {
    pub min: u8,
    pub max: u8,
}

impl KeyRange {
    /// Creates a checked key range.
    pub fn new(min: u8, max: u8) -> Result<KeyRange, MappingError> {
        let range = KeyRange { min, max };
        range.check("key range")?;
        Ok(range)
    }

    /// A range covering one key.
    pub fn single(key: u8) -> KeyRange {
        KeyRange { min: key, max: key }
    }

    /// Returns true if the key falls inside [min, max].
    pub fn contains(&self, key: u8) -> bool {
        key >= self.min && key <= self.max
    }

    /// Reports every bound problem with this range.
    pub fn problems(&self, context: &str) -> Vec<MappingError> {
        let mut problems = Vec::new();
        if let Err(e) = check_midi_value("key range min", self.min, context) {
            problems.push(e);
        }
        if let Err(e) = check_midi_value("key range max", self.max, context) {
            problems.push(e);
        }
        if self.min > self.max {
            problems.push(MappingError::out_of_range(
                "key range min",
                self.min as u64,
                0,
                self.max as u64,
                context,
            ));
        }
        problems
    }

    /// Returns the first bound problem with this range, if any.
    pub fn check(&self, context: &str) -> Result<(), MappingError> {
        match self.problems(context).into_iter().next() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_range_new() {
        let range = VelocityRange::new(10, 90).unwrap();
        assert_eq!(range.crossfade_min, 10);
        assert_eq!(range.crossfade_max, 90);
        assert!(range.covers(10));
        assert!(range.covers(90));
        assert!(!range.covers(91));

        assert!(VelocityRange::new(91, 90).is_err());
        assert!(VelocityRange::new(0, 128).is_err());
    }

    #[test]
    fn test_velocity_crossfade_bounds() {
        // Crossfades are only checked for MIDI membership.
        let range = VelocityRange::new(40, 80)
            .unwrap()
            .with_crossfade(30, 90)
            .unwrap();
        assert_eq!(range.crossfade_min, 30);
        assert!(VelocityRange::full().with_crossfade(0, 200).is_err());
    }

    #[test]
    fn test_velocity_problems_are_batched() {
        let range = VelocityRange {
            min: 130,
            max: 129,
            crossfade_min: 0,
            crossfade_max: 127,
        };
        assert_eq!(range.problems("ctx").len(), 3);
    }

    #[test]
    fn test_descending_order() {
        let soft = VelocityRange::new(0, 63).unwrap();
        let loud = VelocityRange::new(64, 127).unwrap();
        let mut ranges = vec![soft, loud];
        ranges.sort_by(|a, b| a.descending(b));
        assert_eq!(ranges, vec![loud, soft]);
    }

    #[test]
    fn test_key_range() {
        let range = KeyRange::new(48, 72).unwrap();
        assert!(range.contains(60));
        assert!(!range.contains(73));
        assert_eq!(KeyRange::single(60), KeyRange { min: 60, max: 60 });
        assert!(KeyRange::new(72, 48).is_err());
        assert!(KeyRange::new(0, 128).is_err());
    }
}
