use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Where in a creature's name the sound is listened for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SoundPosition {
    Beginning,
    Middle,
    Ending,
}

/// Parameters that shape every round of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub name: String,
    pub creature_count: usize,
    pub time_limit_secs: u32,
    pub positions: Vec<SoundPosition>,
}

impl DifficultyProfile {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.creature_count == 0 {
            return Err(ConfigError::ZeroCreatureCount(self.name.clone()));
        }
        if self.positions.is_empty() {
            return Err(ConfigError::NoSoundPositions(self.name.clone()));
        }
        Ok(())
    }
}

/// The three canonical profiles
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn profile(&self) -> DifficultyProfile {
        use SoundPosition::*;
        let (creature_count, time_limit_secs, positions) = match self {
            Difficulty::Easy => (6, 60, vec![Beginning]),
            Difficulty::Medium => (8, 45, vec![Beginning, Ending]),
            Difficulty::Hard => (10, 30, vec![Beginning, Middle, Ending]),
        };
        DifficultyProfile {
            name: self.to_string(),
            creature_count,
            time_limit_secs,
            positions,
        }
    }
}

impl From<Difficulty> for DifficultyProfile {
    fn from(d: Difficulty) -> Self {
        d.profile()
    }
}
