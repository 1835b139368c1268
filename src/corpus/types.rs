//! Core types for corpus data structures.
//!
//! This module contains fundamental types used throughout the corpus system:
//! - `AssetId`: the stable identity of a binary asset (its vault-relative path)
//! - `Span`: a line/column range with conversion from byte offsets

use std::ops::Range;
use std::path::{Path, PathBuf};

use ropey::Rope;
use serde::{Deserialize, Serialize};

/// The stable identity of an asset: its current path relative to the vault
/// root. Link targets are compared through their resolved `AssetId`, never
/// through raw text, so a bare name, a relative path, and a full vault path
/// pointing at the same file all compare equal.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Serialize, Deserialize)]
pub struct AssetId(PathBuf);

impl AssetId {
    pub fn new(path: impl Into<PathBuf>) -> AssetId {
        AssetId(path.into())
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// The asset's file name including its extension.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()?.to_str()
    }

    /// The vault path as a forward-slash string, the form links are written in.
    pub fn vault_path(&self) -> String {
        self.0
            .components()
            .filter_map(|c| c.as_os_str().to_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.vault_path())
    }
}

impl From<&Path> for AssetId {
    fn from(value: &Path) -> Self {
        AssetId(value.to_path_buf())
    }
}

/// A position in a document, zero-based, counted in characters.
#[derive(
    Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize,
)]
pub struct Pos {
    pub line: u32,
    pub character: u32,
}

/// A character range in a document.
///
/// Provides conversion from byte offsets using rope-based character counting.
#[derive(
    Debug, Default, PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize,
)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    /// Creates a `Span` from a byte offset range using rope for position calculation.
    pub fn from_byte_range(rope: &Rope, range: Range<usize>) -> Span {
        // convert from byte offset to char offset
        let char_start = rope.byte_to_char(range.start);
        let char_end = rope.byte_to_char(range.end);

        let start_line = rope.char_to_line(char_start);
        let start_offset = char_start - rope.line_to_char(start_line);

        let end_line = rope.char_to_line(char_end);
        let end_offset = char_end - rope.line_to_char(end_line);

        Span {
            start: Pos {
                line: start_line as u32,
                character: start_offset as u32,
            },
            end: Pos {
                line: end_line as u32,
                character: end_offset as u32,
            },
        }
    }

}
