//! Keyword list files: one keyword per line, `//` starts a comment line.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::common::{EngineError, Result};
use crate::domain::noise::{KeywordSet, NoiseClassifier};

pub const MUNDANE_CALLS: &str = "mundane_calls.txt";
pub const MUNDANE_CLASSES: &str = "mundane_classes.txt";
pub const TEXTS: &str = "texts.txt";
pub const KEY_METHODS: &str = "key_methods.txt";

/// The four lists, compiled once per batch and shared by every worker.
#[derive(Debug, Clone)]
pub struct KeywordLists {
    pub mundane_calls: KeywordSet,
    pub mundane_classes: KeywordSet,
    pub texts: KeywordSet,
    pub key_methods: KeywordSet,
}

impl KeywordLists {
    pub fn load(dir: &Path) -> Result<Self> {
        Ok(Self {
            mundane_calls: read_list(&dir.join(MUNDANE_CALLS))?,
            mundane_classes: read_list(&dir.join(MUNDANE_CLASSES))?,
            texts: read_list(&dir.join(TEXTS))?,
            key_methods: read_list(&dir.join(KEY_METHODS))?,
        })
    }

    pub fn noise_classifier(&self) -> NoiseClassifier {
        NoiseClassifier::new(self.mundane_calls.clone(), self.mundane_classes.clone())
    }
}

/// A missing file is an empty list.
pub fn read_list(path: &Path) -> Result<KeywordSet> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_list(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "keyword list not found, using an empty list");
            Ok(KeywordSet::new(Vec::<String>::new()))
        }
        Err(e) => Err(EngineError::io(path, e)),
    }
}

pub fn parse_list(text: &str) -> KeywordSet {
    KeywordSet::new(
        text.lines()
            .map(str::trim)
            .filter(|line| !line.starts_with("//")),
    )
}
