// Library surface for the terminal driver and headless/integration tests.
pub mod analytics;
pub mod app_dirs;
pub mod config;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod input;
pub mod narration;
pub mod reference;
pub mod round;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod timer;

pub use difficulty::{Difficulty, DifficultyProfile, SoundPosition};
pub use engine::{Handled, SessionEngine, SessionEvent, SessionOptions};
pub use error::{AnalyticsError, ConfigError, DataError};
pub use reference::{Creature, CreatureId, CreaturePool, Phoneme, SoundCatalog};
pub use session::Phase;
