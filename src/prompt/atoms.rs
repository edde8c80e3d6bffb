//! Lazy, cached loading of atom files under a theme's atoms tree

use crate::io::error::{PipelineError, Result};
use crate::io::configuration::ATOM_EXTENSION;
use crate::math::probability::RandomSelector;
use std::collections::{hash_map::Entry, HashMap};
use std::path::{Path, PathBuf};

/// Cached loader of newline-delimited atom files
///
/// An atom name is a relative path below the atoms root without the `.txt`
/// extension (`color`, `subjects/nature`). Files are read once per process
/// and the stripped candidate lists cached for the lifetime of the store.
pub struct AtomStore {
    root: PathBuf,
    cache: HashMap<String, Vec<String>>,
}

impl AtomStore {
    /// Create a store rooted at a theme's atoms directory
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            cache: HashMap::new(),
        }
    }

    /// Atoms root this store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Candidate lines for an atom name, loading and caching on first use
    ///
    /// Blank lines and lines whose first non-whitespace character is `#` are
    /// discarded; the remaining line order is preserved.
    ///
    /// # Errors
    ///
    /// Returns `AtomMissing` when no file exists for the name.
    pub fn lookup(&mut self, name: &str) -> Result<&[String]> {
        match self.cache.entry(name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let lines = load_atom_file(&self.root, name)?;
                Ok(entry.insert(lines))
            }
        }
    }

    /// Select one atom uniformly at random from the candidate list
    ///
    /// # Errors
    ///
    /// Returns `AtomMissing` when the file is absent and `AtomEmpty` when it
    /// yields zero candidates.
    pub fn select(&mut self, name: &str, selector: &mut RandomSelector) -> Result<String> {
        let candidates = self.lookup(name)?;
        if candidates.is_empty() {
            return Err(PipelineError::AtomEmpty {
                name: name.to_string(),
            });
        }
        let index = selector.uniform_choice(candidates.len());
        Ok(candidates[index].clone())
    }
}

/// Read and strip one atom file
fn load_atom_file(root: &Path, name: &str) -> Result<Vec<String>> {
    // Names come from the template grammar ([a-z0-9_/]+), which cannot
    // escape the atoms root, but a missing file must still report the
    // exact path probed.
    let path = root.join(format!("{name}.{ATOM_EXTENSION}"));
    let text = std::fs::read_to_string(&path).map_err(|_| PipelineError::AtomMissing {
        name: name.to_string(),
        path: path.clone(),
    })?;

    let lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect::<Vec<_>>();

    tracing::debug!(name, count = lines.len(), "loaded atom file");
    Ok(lines)
}
