use crate::difficulty::{Difficulty, DifficultyProfile};
use crate::engine::{Handled, SessionEngine, SessionEvent};
use crate::error::ConfigError;
use crate::reference::Creature;
use crate::runtime::{Runner, SafariEventSource, Ticker};
use crate::session::Phase;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::RngCore;

/// Number of candidates reachable from the keyboard (digits 1-9, then 0)
pub const MAX_SLOTS: usize = 10;

/// What a key press asks the driver to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Session(SessionEvent),
    Quit,
}

/// What the driver should do after a command was applied
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// The engine changed; show the new state
    Redraw,
    Unchanged,
    /// `start_game` refused the chosen setup
    Rejected(ConfigError),
    Quit,
}

/// Digit shown next to the candidate at `index`; the tenth creature is `0`
pub fn slot_label(index: usize) -> Option<char> {
    match index {
        0..=8 => char::from_digit(index as u32 + 1, 10),
        9 => Some('0'),
        _ => None,
    }
}

fn slot_index(c: char) -> Option<usize> {
    match c.to_digit(10)? {
        0 => Some(9),
        d => Some(d as usize - 1),
    }
}

/// Map a key press to a command for the current phase.
///
/// `profile` is used when a key starts a game or returns to difficulty
/// selection without naming a level itself. Only the first [`MAX_SLOTS`]
/// candidates have a key; profiles showing more cannot be fully played
/// from the keyboard.
pub fn command_for_key(
    key: &KeyEvent,
    phase: Phase,
    candidates: &[Creature],
    profile: &DifficultyProfile,
) -> Option<Command> {
    if key.code == KeyCode::Esc
        || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
    {
        return Some(Command::Quit);
    }

    let event = match (phase, key.code) {
        (Phase::Config, KeyCode::Char('e')) => SessionEvent::StartGame(Difficulty::Easy.profile()),
        (Phase::Config, KeyCode::Char('m')) => {
            SessionEvent::StartGame(Difficulty::Medium.profile())
        }
        (Phase::Config, KeyCode::Char('h')) => SessionEvent::StartGame(Difficulty::Hard.profile()),
        (Phase::Config, KeyCode::Enter) => SessionEvent::StartGame(profile.clone()),

        (Phase::Loading, KeyCode::Enter) => SessionEvent::LoadComplete,

        (Phase::Intro, KeyCode::Enter | KeyCode::Char(' ')) => SessionEvent::Continue,

        (Phase::Playing, KeyCode::Char(c)) if c.is_ascii_digit() => {
            let creature = candidates.get(slot_index(c)?)?;
            SessionEvent::Toggle(creature.id.clone())
        }
        (Phase::Playing, KeyCode::Enter) => SessionEvent::SubmitCurrent,

        (Phase::Results, KeyCode::Char('r')) => SessionEvent::TryAgain,
        (Phase::Results, KeyCode::Enter | KeyCode::Char('n')) => SessionEvent::NextRound,

        (Phase::Complete, KeyCode::Enter | KeyCode::Char('p')) => SessionEvent::PlayAgain,
        (Phase::Complete, KeyCode::Char('d')) => SessionEvent::ChangeDifficulty(profile.clone()),

        _ => return None,
    };
    Some(Command::Session(event))
}

/// Apply a command to the engine, then run the steps the terminal drives
/// on its own: a prepared round leaves Loading straight away, and entering
/// Playing starts the round clock once narration has been issued.
pub fn apply_command<R, E, T>(
    engine: &mut SessionEngine<R>,
    runner: &mut Runner<E, T>,
    command: Command,
) -> Flow
where
    R: RngCore,
    E: SafariEventSource,
    T: Ticker,
{
    let event = match command {
        Command::Quit => {
            engine.abandon();
            return Flow::Quit;
        }
        Command::Session(event) => event,
    };

    let before = engine.phase();
    match engine.dispatch(event) {
        Ok(Handled::Applied) => {}
        Ok(Handled::Ignored) => return Flow::Unchanged,
        Err(e) => return Flow::Rejected(e),
    }

    if engine.is_ready() {
        engine.load_complete();
    }
    // Narration is synchronous, so the introduction is over by the time
    // Playing is entered
    if engine.phase() == Phase::Playing && before != Phase::Playing {
        engine.introduction_finished();
        runner.reset_tick();
    }
    Flow::Redraw
}

/// Map a key press and apply it. `fallback` is the profile used before any
/// game has been started.
pub fn handle_key<R, E, T>(
    engine: &mut SessionEngine<R>,
    runner: &mut Runner<E, T>,
    key: &KeyEvent,
    fallback: &DifficultyProfile,
) -> Flow
where
    R: RngCore,
    E: SafariEventSource,
    T: Ticker,
{
    let profile = engine.profile().cloned().unwrap_or_else(|| fallback.clone());
    match command_for_key(key, engine.phase(), engine.candidates(), &profile) {
        Some(command) => apply_command(engine, runner, command),
        None => Flow::Unchanged,
    }
}
