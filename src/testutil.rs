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
use std::{error::Error, fs::File, path::PathBuf};

use hound::{Sample, SampleFormat, WavSpec, WavWriter};

use crate::mapping::SampleFile;

/// A sample reference as the probe would report it for a 44.1 kHz file.
pub fn sample_file(path: &str, frames: u64) -> SampleFile {
    SampleFile::new(path, 44100.0, frames)
        .with_file_size(8864)
        .with_last_modified(1_700_000_000)
}

/// Writes a 32 bit WAV file with one inner vector per channel. Channels should
/// have equal lengths.
pub fn write_wav<S: Sample + Copy + 'static>(
    path: PathBuf,
    samples: Vec<Vec<S>>,
    sample_rate: u32,
) -> Result<(), Box<dyn Error>> {
    let tempwav = File::create(path)?;

    // Determine sample format based on the type
    let sample_format = if std::any::TypeId::of::<S>() == std::any::TypeId::of::<f32>() {
        SampleFormat::Float
    } else if std::any::TypeId::of::<S>() == std::any::TypeId::of::<i32>() {
        SampleFormat::Int
    } else {
        return Err("Unsupported sample format".into());
    };

    let num_channels = samples.len();
    assert!(num_channels <= u16::MAX.into(), "Too many channels!");
    let mut writer = WavWriter::new(
        tempwav,
        WavSpec {
            channels: num_channels as u16,
            sample_rate,
            bits_per_sample: 32,
            sample_format,
        },
    )?;

    let frames = samples.iter().map(Vec::len).max().unwrap_or(0);
    for frame in 0..frames {
        for sample in samples.iter().filter_map(|channel| channel.get(frame)) {
            writer.write_sample(*sample)?;
        }
    }
    writer.finalize()?;

    Ok(())
}
