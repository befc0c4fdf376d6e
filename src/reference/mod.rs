pub mod catalog;
pub mod creatures;

use crate::error::DataError;
use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export the main types for convenience
pub use catalog::{PhonemeDescriptor, SoundCatalog};
pub use creatures::{Creature, CreatureId, CreaturePool};

static DATA_DIR: Dir = include_dir!("src/reference/data");

/// A target sound such as `s`, `sh` or `ch`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phoneme(String);

impl Phoneme {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phoneme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Phoneme {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Phoneme {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Read one of the embedded reference data files as a string
fn read_embedded(file_name: &str) -> Result<&'static str, DataError> {
    let file = DATA_DIR
        .get_file(file_name)
        .ok_or_else(|| DataError::MissingFile(file_name.to_string()))?;

    file.contents_utf8()
        .ok_or_else(|| DataError::NotUtf8(file_name.to_string()))
}
