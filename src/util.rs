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
use std::path::Path;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// The file name without its extension, or an empty string if it is unreadable.
pub fn filename_stem(path: &Path) -> &str {
    path.file_stem().and_then(|f| f.to_str()).unwrap_or_default()
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use crate::util::{filename_display, filename_stem};

    #[test]
    fn test_file_names() {
        assert_eq!("Kit.adv", filename_display(Path::new("/presets/Kit.adv")));
        assert_eq!("Kit", filename_stem(Path::new("/presets/Kit.adv")));
        assert_eq!("unreadable file name", filename_display(Path::new("/")));
        assert_eq!("", filename_stem(Path::new("/")));
    }
}
