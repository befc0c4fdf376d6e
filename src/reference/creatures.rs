use super::{read_embedded, Phoneme};
use crate::error::DataError;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::from_str;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreatureId(String);

impl CreatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CreatureId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A creature the learner can pick; it "has" exactly one sound
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Creature {
    pub id: CreatureId,
    pub name: String,
    /// Key the presentation layer uses to find the picture and sound clip
    pub asset_key: String,
    pub has_sound: Phoneme,
}

impl Creature {
    pub fn new(id: &str, name: &str, has_sound: &str) -> Self {
        Self {
            id: CreatureId::from(id),
            name: name.to_string(),
            asset_key: format!("creatures/{id}"),
            has_sound: Phoneme::from(has_sound),
        }
    }

    pub fn has(&self, phoneme: &Phoneme) -> bool {
        &self.has_sound == phoneme
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct CreaturePool {
    pub name: String,
    creatures: Vec<Creature>,
}

impl CreaturePool {
    pub fn new(name: impl Into<String>, creatures: Vec<Creature>) -> Self {
        Self {
            name: name.into(),
            creatures,
        }
    }

    pub fn embedded() -> Result<Self, DataError> {
        Self::from_json(read_embedded("creatures.json")?)
    }

    /// Parse a pool, rejecting ids that appear more than once
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let pool: Self = from_str(json)?;
        match pool.duplicate_id() {
            Some(id) => Err(DataError::DuplicateCreature(id.to_string())),
            None => Ok(pool),
        }
    }

    /// First id listed more than once, if any
    pub fn duplicate_id(&self) -> Option<&CreatureId> {
        self.creatures.iter().map(|c| &c.id).duplicates().next()
    }

    pub fn creatures(&self) -> &[Creature] {
        &self.creatures
    }

    pub fn get(&self, id: &CreatureId) -> Option<&Creature> {
        self.creatures.iter().find(|c| &c.id == id)
    }

    /// Creatures carrying the sound
    pub fn with_sound(&self, phoneme: &Phoneme) -> Vec<&Creature> {
        self.creatures.iter().filter(|c| c.has(phoneme)).collect()
    }

    /// Everything else
    pub fn without_sound(&self, phoneme: &Phoneme) -> Vec<&Creature> {
        self.creatures.iter().filter(|c| !c.has(phoneme)).collect()
    }

    pub fn len(&self) -> usize {
        self.creatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creatures.is_empty()
    }
}
