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

use std::{error::Error, fmt, path::Path, str::FromStr};

/// Audio containers the target host can load as sampler zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioContainer {
    Wav,
    Aiff,
    Flac,
    Mp3,
    Ogg,
}

impl FromStr for AudioContainer {
    /// Convert from a file extension, ignoring case
    fn from_str(s: &str) -> Result<Self, Box<dyn Error>> {
        match s.to_ascii_lowercase().as_str() {
            "wav" | "wave" => Ok(AudioContainer::Wav),
            "aif" | "aiff" => Ok(AudioContainer::Aiff),
            "flac" => Ok(AudioContainer::Flac),
            "mp3" => Ok(AudioContainer::Mp3),
            "ogg" => Ok(AudioContainer::Ogg),
            _ => Err(format!("Unsupported audio container: {}", s).into()),
        }
    }

    type Err = Box<dyn Error>;
}

impl AudioContainer {
    /// Recognises the container from a path's extension.
    pub fn from_path(path: &Path) -> Option<AudioContainer> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.parse().ok())
    }

    /// Convert to string representation
    pub fn as_str(self) -> &'static str {
        match self {
            AudioContainer::Wav => "wav",
            AudioContainer::Aiff => "aiff",
            AudioContainer::Flac => "flac",
            AudioContainer::Mp3 => "mp3",
            AudioContainer::Ogg => "ogg",
        }
    }
}

impl fmt::Display for AudioContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_from_str() {
        assert_eq!(
            AudioContainer::from_str("wav").unwrap(),
            AudioContainer::Wav
        );
        assert_eq!(
            AudioContainer::from_str("WAV").unwrap(),
            AudioContainer::Wav
        );
        assert_eq!(
            AudioContainer::from_str("aif").unwrap(),
            AudioContainer::Aiff
        );
        assert_eq!(
            AudioContainer::from_str("Flac").unwrap(),
            AudioContainer::Flac
        );
    }

    #[test]
    fn test_container_from_str_invalid() {
        assert!(AudioContainer::from_str("txt").is_err());
        assert!(AudioContainer::from_str("").is_err());
        assert!(AudioContainer::from_str("mid").is_err());
    }

    #[test]
    fn test_container_from_path() {
        assert_eq!(
            AudioContainer::from_path(Path::new("/tmp/kick.wav")),
            Some(AudioContainer::Wav)
        );
        assert_eq!(
            AudioContainer::from_path(Path::new("/tmp/Snare.AIFF")),
            Some(AudioContainer::Aiff)
        );
        assert_eq!(AudioContainer::from_path(Path::new("/tmp/kick")), None);
        assert_eq!(AudioContainer::from_path(Path::new("/tmp/kick.txt")), None);
    }

    #[test]
    fn test_container_display() {
        assert_eq!(format!("{}", AudioContainer::Mp3), "mp3");
        assert_eq!(AudioContainer::Ogg.as_str(), "ogg");
    }
}
