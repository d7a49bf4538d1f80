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

//! Reading and writing Sampler multisample presets (`.adv`, uncompressed XML).
//!
//! Encoding and decoding are pure: bytes in, bytes out. Writing to disk is the
//! job of [`crate::export`].

mod decoder;
mod document;
mod encoder;

pub use decoder::PresetDecoder;
pub use encoder::{PresetEncoder, DEFAULT_CREATOR};

/// Default file extension of a preset.
pub const PRESET_EXTENSION: &str = "adv";
