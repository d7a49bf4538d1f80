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

use super::part::PartId;
use super::velocity::VelocityRange;

/// Stable identity of a velocity layer, independent of its position on the key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub(crate) u64);

/// Addresses one velocity layer on one key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerRef {
    pub key: u8,
    pub layer: LayerId,
}

impl fmt::Display for LayerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "key {} layer #{}", self.key, self.layer.0)
    }
}

/// A velocity bucket of round-robin slots on one key.
///
/// Slots may be empty (holes) while the user is still filling in alternates.
/// Holes keep their index so that round-robin positions stay put.
#[derive(Clone, Debug)]
pub struct VelocityLayer {
    id: LayerId,
    range: VelocityRange,
    slots: Vec<Option<PartId>>,
}

impl VelocityLayer {
    pub(crate) fn new(id: LayerId, range: VelocityRange) -> VelocityLayer {
        VelocityLayer {
            id,
            range,
            slots: Vec::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn range(&self) -> VelocityRange {
        self.range
    }

    /// The round-robin slots, holes included.
    pub fn slots(&self) -> &[Option<PartId>] {
        &self.slots
    }

    /// Number of occupied slots.
    pub fn active_sample_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Length of the slot sequence.
    pub fn round_robin_count(&self) -> usize {
        self.slots.len()
    }

    /// The occupied slots with their round-robin index.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, PartId)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.map(|id| (index, id)))
    }

    /// Index of the first hole, if any.
    pub(crate) fn first_hole(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }

    /// Sets a slot, padding with holes up to `index`. Returns the part that was replaced.
    pub(crate) fn set_slot(&mut self, index: usize, id: PartId) -> Option<PartId> {
        if index >= self.slots.len() {
            self.slots.resize(index + 1, None);
        }
        self.slots[index].replace(id)
    }

    /// Empties the slot holding `id` without shrinking the sequence.
    pub(crate) fn clear_part(&mut self, id: PartId) -> bool {
        match self.slots.iter_mut().find(|slot| **slot == Some(id)) {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }

    /// Whether any slot of this layer holds `id`.
    pub fn contains(&self, id: PartId) -> bool {
        self.slots.contains(&Some(id))
    }
}
