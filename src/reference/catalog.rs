use super::{read_embedded, Phoneme};
use crate::error::DataError;
use serde::Deserialize;
use serde_json::from_str;

/// Reference entry describing how a sound is made
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct PhonemeDescriptor {
    pub symbol: Phoneme,
    pub description: String,
    pub examples: Vec<String>,
}

/// Static catalog of every sound the game can ask for
#[derive(Deserialize, Clone, Debug)]
pub struct SoundCatalog {
    pub name: String,
    phonemes: Vec<PhonemeDescriptor>,
}

impl SoundCatalog {
    pub fn new(name: impl Into<String>, phonemes: Vec<PhonemeDescriptor>) -> Self {
        Self {
            name: name.into(),
            phonemes,
        }
    }

    /// The catalog shipped with the binary
    pub fn embedded() -> Result<Self, DataError> {
        Self::from_json(read_embedded("sounds.json")?)
    }

    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(from_str(json)?)
    }

    /// The phoneme universe in catalog order
    pub fn phonemes(&self) -> Vec<Phoneme> {
        self.phonemes.iter().map(|d| d.symbol.clone()).collect()
    }

    pub fn descriptors(&self) -> &[PhonemeDescriptor] {
        &self.phonemes
    }

    pub fn get(&self, symbol: &Phoneme) -> Option<&PhonemeDescriptor> {
        self.phonemes.iter().find(|d| &d.symbol == symbol)
    }

    pub fn len(&self) -> usize {
        self.phonemes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phonemes.is_empty()
    }
}
