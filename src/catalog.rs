//! Sound catalog loading
//!
//! The catalog is the immutable list of playable clip identifiers. It is
//! loaded once from a JSON manifest (an array of strings) and every round
//! draws from it.

use std::{collections::HashSet, fs, path::Path};

use thiserror::Error;

use crate::options::format_name;

/// Errors that can occur while loading the catalog
#[derive(Error, Debug)]
pub enum Error {
    /// The manifest could not be read
    #[error("failed to read clip manifest: {0}")]
    Io(#[from] std::io::Error),
    /// The manifest is not a JSON array of strings
    #[error("clip manifest is not a JSON array of strings: {0}")]
    Json(#[from] serde_json::Error),
    /// The manifest holds no usable clip
    #[error("clip manifest contains no clips")]
    Empty,
}

/// The ordered, non-empty list of playable clips
///
/// Display names are computed once on load so rounds never reformat
/// the whole catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Clip identifiers in manifest order
    clips: Vec<String>,
    /// Display name of each clip, index-aligned with `clips`
    display_names: Vec<String>,
    /// Number of distinct display names
    distinct_names: usize,
}

impl Catalog {
    /// Builds a catalog from clip identifiers
    ///
    /// Blank identifiers and identifiers without a usable display name
    /// (such as a bare `.ogg`) are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if no clip remains.
    pub fn new<I, S>(clips: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (clips, display_names): (Vec<_>, Vec<_>) = clips
            .into_iter()
            .map(Into::into)
            .filter_map(|clip: String| {
                let clip = clip.trim().to_owned();
                let name = format_name(&clip);
                if name.is_empty() {
                    if !clip.is_empty() {
                        log::warn!("skipping clip {clip:?} without a display name");
                    }
                    None
                } else {
                    Some((clip, name))
                }
            })
            .unzip();

        if clips.is_empty() {
            return Err(Error::Empty);
        }

        let distinct_names = display_names.iter().collect::<HashSet<_>>().len();

        Ok(Self {
            clips,
            display_names,
            distinct_names,
        })
    }

    /// Parses a catalog from the JSON manifest format
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not an array of strings and
    /// [`Error::Empty`] if it holds no usable clip.
    pub fn from_json(manifest: &str) -> Result<Self, Error> {
        let clips: Vec<String> = serde_json::from_str(manifest)?;
        Self::new(clips)
    }

    /// Parses a catalog from a plain list with one identifier per line
    ///
    /// This is the source format the JSON manifest is generated from.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Empty`] if no line holds a usable clip.
    pub fn from_lines(list: &str) -> Result<Self, Error> {
        Self::new(list.lines())
    }

    /// Reads and parses the JSON manifest at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, otherwise the
    /// errors of [`Catalog::from_json`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        let catalog = Self::from_json(&fs::read_to_string(path)?)?;
        log::info!("loaded {} clips from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// Returns the number of clips
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    /// Returns whether the catalog has no clips (never true once built)
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Returns the number of distinct display names
    pub fn distinct_names(&self) -> usize {
        self.distinct_names
    }

    /// Returns the clip identifiers
    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    /// Returns the display names, index-aligned with [`Catalog::clips`]
    pub fn display_names(&self) -> &[String] {
        &self.display_names
    }

    /// Returns the clip identifier and display name at `index`
    pub fn get(&self, index: usize) -> Option<(&str, &str)> {
        Some((
            self.clips.get(index)?.as_str(),
            self.display_names.get(index)?.as_str(),
        ))
    }

    /// Picks a clip index uniformly at random
    pub fn random_index(&self, rng: &mut fastrand::Rng) -> usize {
        rng.usize(..self.len())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_from_json() {
        let catalog = Catalog::from_json(r#"["a.ogg", "b_c.ogg", "d.wav"]"#).unwrap();

        assert_eq!(catalog.len(), 3);
        assert!(!catalog.is_empty());
        assert_eq!(catalog.get(1), Some(("b_c.ogg", "B C")));
        assert_eq!(catalog.get(3), None);
        assert_eq!(catalog.distinct_names(), 3);
    }

    #[test]
    fn test_from_json_empty_array() {
        assert!(matches!(Catalog::from_json("[]"), Err(Error::Empty)));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(Catalog::from_json("{}"), Err(Error::Json(_))));
        assert!(matches!(Catalog::from_json("[1, 2]"), Err(Error::Json(_))));
        assert!(matches!(Catalog::from_json(""), Err(Error::Json(_))));
    }

    #[test]
    fn test_blank_entries_skipped() {
        let catalog = Catalog::from_json(r#"["", "  ", ".ogg", "zote.ogg"]"#).unwrap();
        assert_eq!(catalog.clips(), &["zote.ogg".to_string()]);

        assert!(matches!(
            Catalog::from_json(r#"["", ".ogg"]"#),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn test_from_lines() {
        let catalog = Catalog::from_lines("a.ogg\n\n  b.ogg  \nc.ogg\n").unwrap();
        assert_eq!(catalog.clips(), &["a.ogg", "b.ogg", "c.ogg"]);
    }

    #[test]
    fn test_distinct_names_collapse() {
        let catalog = Catalog::new(["a.ogg", "a.wav", "A.mp3", "b.ogg"]).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.distinct_names(), 2);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        fs::write(&path, r#"["a.ogg", "b.ogg"]"#).unwrap();

        let catalog = Catalog::load(&path).unwrap();
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Catalog::load(dir.path().join("missing.json"));
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_random_index_in_range() {
        let catalog = Catalog::new(["a.ogg", "b.ogg", "c.ogg"]).unwrap();
        let mut rng = fastrand::Rng::with_seed(5);
        for _ in 0..100 {
            assert!(catalog.random_index(&mut rng) < 3);
        }
    }
}
