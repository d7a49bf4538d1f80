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

//! Reads the facts the mapping core needs from an audio file on disk.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::debug;

use super::format::AudioContainer;
use crate::mapping::SampleFile;

/// Error types for audio probing
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("{} is not a supported audio file", .0.display())]
    Unsupported(PathBuf),

    #[error("{} has no audio track", .0.display())]
    NoAudioTrack(PathBuf),

    #[error("{} does not declare a sample rate", .0.display())]
    NoSampleRate(PathBuf),

    #[error("Audio file error: {0}")]
    AudioError(#[from] SymphoniaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Probes an audio file and returns a reference carrying its absolute path,
/// sample rate, frame count, size and modification time.
pub fn probe(path: &Path) -> Result<SampleFile, ProbeError> {
    let container = AudioContainer::from_path(path)
        .ok_or_else(|| ProbeError::Unsupported(path.to_path_buf()))?;

    let path = path.canonicalize().map_err(|e| {
        ProbeError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })?;
    let metadata = fs::metadata(&path)?;
    let last_modified = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);

    let mss = MediaSourceStream::new(Box::new(File::open(&path)?), Default::default());
    let mut hint = Hint::new();
    hint.with_extension(container.as_str());

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format_reader = probed.format;

    let track = format_reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ProbeError::NoAudioTrack(path.clone()))?;
    let track_id = track.id;
    let params = track.codec_params.clone();
    let sample_rate = params
        .sample_rate
        .ok_or_else(|| ProbeError::NoSampleRate(path.clone()))?;

    // Some containers don't record a length, so count decoded frames instead.
    let frame_count = match params.n_frames {
        Some(frames) => frames,
        None => {
            let mut decoder = get_codecs().make(&params, &DecoderOptions::default())?;
            let mut frames = 0u64;
            loop {
                let packet = match format_reader.next_packet() {
                    Ok(packet) => packet,
                    Err(SymphoniaError::IoError(e))
                        if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                    {
                        break
                    }
                    Err(e) => return Err(e.into()),
                };
                if packet.track_id() != track_id {
                    continue;
                }
                frames += decoder.decode(&packet)?.frames() as u64;
            }
            frames
        }
    };

    debug!(
        path = ?path,
        container = %container,
        sample_rate,
        frame_count,
        file_size = metadata.len(),
        "Probed audio file"
    );

    Ok(SampleFile::new(path, sample_rate as f64, frame_count)
        .with_file_size(metadata.len())
        .with_last_modified(last_modified))
}
