pub mod rotation;
pub mod scoring;
pub mod selector;

use crate::difficulty::{DifficultyProfile, SoundPosition};
use crate::reference::Phoneme;
use serde::Serialize;

pub use rotation::next_sound;
pub use scoring::{evaluate, RoundResult};
pub use selector::{select_candidates, BalancedSelector, CandidateSelector};

/// Everything that parameterizes a single round
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundConfig {
    pub target: Phoneme,
    pub position: SoundPosition,
    pub profile: DifficultyProfile,
    /// Cosmetic backdrop tag, passed through untouched
    pub environment: String,
}
