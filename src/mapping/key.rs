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
use super::layer::{LayerId, VelocityLayer};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One of the 128 MIDI key slots. Keys are created with the model and never removed.
#[derive(Clone, Debug)]
pub struct PianoKey {
    number: u8,
    layers: Vec<VelocityLayer>,
}

impl PianoKey {
    pub(crate) fn new(number: u8) -> PianoKey {
        PianoKey {
            number,
            layers: Vec::new(),
        }
    }

    /// The MIDI note number.
    pub fn number(&self) -> u8 {
        self.number
    }

    /// The note name, with middle C (60) as C4.
    pub fn note_name(&self) -> String {
        let octave = (self.number / 12) as i8 - 1;
        format!("{}{}", NOTE_NAMES[(self.number % 12) as usize], octave)
    }

    /// Whether this is a black key on a piano keyboard.
    pub fn is_black(&self) -> bool {
        matches!(self.number % 12, 1 | 3 | 6 | 8 | 10)
    }

    /// Whether at least one slot on this key holds a sample.
    pub fn has_sample(&self) -> bool {
        self.layers.iter().any(|layer| layer.active_sample_count() > 0)
    }

    /// The velocity layers in stored (descending velocity) order.
    pub fn layers(&self) -> &[VelocityLayer] {
        &self.layers
    }

    pub(crate) fn layers_mut(&mut self) -> &mut Vec<VelocityLayer> {
        &mut self.layers
    }

    pub(crate) fn layer(&self, id: LayerId) -> Option<&VelocityLayer> {
        self.layers.iter().find(|layer| layer.id() == id)
    }

    pub(crate) fn layer_mut(&mut self, id: LayerId) -> Option<&mut VelocityLayer> {
        self.layers.iter_mut().find(|layer| layer.id() == id)
    }
}
