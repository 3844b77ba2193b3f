use std::path::{Path, PathBuf};

use crate::error::{LayerError, Result};

/// One training example: an image and its per-pixel label image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub image: PathBuf,
    pub label: PathBuf,
}

/// Ordered list of image/label pairs.
///
/// The file format is plain text: whitespace-separated paths taken two at a
/// time (`image label image label ...`). Line breaks carry no meaning, so
/// paths cannot contain whitespace.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Reads and parses `path`, joining every entry onto `root`.
    pub fn read(path: &Path, root: &Path) -> Result<Manifest> {
        let text = std::fs::read_to_string(path).map_err(|source| LayerError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        Manifest::parse(&text, root).map_err(|err| match err {
            LayerError::Config(msg) => {
                LayerError::Config(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn parse(text: &str, root: &Path) -> Result<Manifest> {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(LayerError::Config("manifest lists no image/label pairs".to_string()));
        }
        if tokens.len() % 2 != 0 {
            return Err(LayerError::Config(format!(
                "manifest has {} paths; expected image/label pairs, `{}` has no label",
                tokens.len(),
                tokens[tokens.len() - 1]
            )));
        }
        let entries = tokens
            .chunks_exact(2)
            .map(|pair| ManifestEntry {
                image: root.join(pair[0]),
                label: root.join(pair[1]),
            })
            .collect();
        Ok(Manifest { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ManifestEntry> {
        self.entries.get(index)
    }
}
