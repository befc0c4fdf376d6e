use thiserror::Error;

/// Reasons a game cannot be started with the supplied setup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("a session needs at least one round (got {0})")]
    InvalidRounds(usize),

    #[error("the creature pool is empty")]
    EmptyCreaturePool,

    #[error("the sound catalog has no phonemes")]
    EmptyPhonemeUniverse,

    #[error("difficulty profile '{0}' asks for zero creatures per round")]
    ZeroCreatureCount(String),

    #[error("difficulty profile '{0}' allows no sound positions")]
    NoSoundPositions(String),

    #[error("creature '{0}' appears more than once in the pool")]
    DuplicateCreature(String),
}

/// Reference data could not be loaded
#[derive(Error, Debug)]
pub enum DataError {
    #[error("reference data file not found: {0}")]
    MissingFile(String),

    #[error("reference data file is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("unable to parse reference data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("creature id '{0}' is listed more than once")]
    DuplicateCreature(String),
}

/// Delivery of a session summary failed
#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("analytics storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("analytics log error: {0}")]
    Csv(#[from] csv::Error),

    #[error("analytics io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("analytics sink unavailable: {0}")]
    Unavailable(String),
}
