//! Cross-reference tile groups with published files.

use crate::catalog::RemoteFile;
use neonaop_tiles::{TileGroups, TileKey};
use std::collections::BTreeMap;

/// A published file that covers one of the selected tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedFile {
    /// File name.
    pub name: String,
    /// Download URL.
    pub url: String,
    /// Tile whose key appears in the file name.
    pub tile: TileKey,
    /// Plots inside that tile.
    pub plot_ids: Vec<String>,
}

/// Matched files keyed by file name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileMatches {
    files: BTreeMap<String, MatchedFile>,
}

impl FileMatches {
    /// File name to URL mapping, as handed to a download strategy.
    pub fn urls(&self) -> BTreeMap<String, String> {
        self.files
            .values()
            .map(|f| (f.name.clone(), f.url.clone()))
            .collect()
    }

    /// Look up a match by file name.
    pub fn get(&self, name: &str) -> Option<&MatchedFile> {
        self.files.get(name)
    }

    /// Iterate over matches in file name order.
    pub fn iter(&self) -> impl Iterator<Item = &MatchedFile> {
        self.files.values()
    }

    /// Number of matched files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl IntoIterator for FileMatches {
    type Item = MatchedFile;
    type IntoIter = std::collections::btree_map::IntoValues<String, MatchedFile>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_values()
    }
}

/// Select the files whose names contain a tile key of the grouping.
///
/// Files are visited in the order given and tiles in key order; when more
/// than one tile key occurs in the same name the last one visited wins.
pub fn match_files(groups: &TileGroups, files: &[RemoteFile]) -> FileMatches {
    let keys: Vec<(String, &TileKey, &Vec<String>)> = groups
        .iter()
        .map(|(key, ids)| (key.to_string(), key, ids))
        .collect();

    let mut matches = FileMatches::default();
    for file in files {
        for (needle, key, ids) in &keys {
            if file.name.contains(needle.as_str()) {
                matches.files.insert(
                    file.name.clone(),
                    MatchedFile {
                        name: file.name.clone(),
                        url: file.url.clone(),
                        tile: **key,
                        plot_ids: (*ids).clone(),
                    },
                );
            }
        }
    }
    matches
}
