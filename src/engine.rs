use crate::analytics::AnalyticsSink;
use crate::difficulty::DifficultyProfile;
use crate::error::ConfigError;
use crate::narration::Narrator;
use crate::reference::{Creature, CreatureId, CreaturePool, Phoneme, SoundCatalog};
use crate::round::{evaluate, next_sound, BalancedSelector, CandidateSelector, RoundConfig, RoundResult};
use crate::session::{GameSession, Phase};
use crate::timer::CountdownTick;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::collections::{BTreeSet, HashSet};

/// Session-wide settings fixed at engine construction
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub total_rounds: usize,
    pub environment: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            total_rounds: 5,
            environment: "savanna".to_string(),
        }
    }
}

/// Whether an event changed anything. Events that arrive for a phase the
/// engine has already left are `Ignored`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    Applied,
    Ignored,
}

/// Inbound events from the presentation driver
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StartGame(DifficultyProfile),
    LoadComplete,
    Continue,
    IntroductionFinished,
    Toggle(CreatureId),
    Submit(BTreeSet<CreatureId>),
    SubmitCurrent,
    Tick,
    TryAgain,
    NextRound,
    PlayAgain,
    ChangeDifficulty(DifficultyProfile),
    Abandon,
}

/// Drives one learner's game through its phases.
///
/// Every transition runs to completion before returning; the engine owns its
/// session exclusively and is not shared between learners.
pub struct SessionEngine<R = StdRng> {
    catalog: SoundCatalog,
    pool: CreaturePool,
    options: SessionOptions,
    phase: Phase,
    session: Option<GameSession>,
    /// Profile picked via `change_difficulty`, used until the next `start_game`
    selected_profile: Option<DifficultyProfile>,
    selector: Box<dyn CandidateSelector>,
    narrator: Box<dyn Narrator>,
    analytics: Box<dyn AnalyticsSink>,
    rng: R,
}

impl SessionEngine<StdRng> {
    pub fn new(
        catalog: SoundCatalog,
        pool: CreaturePool,
        options: SessionOptions,
        narrator: Box<dyn Narrator>,
        analytics: Box<dyn AnalyticsSink>,
    ) -> Self {
        Self::with_rng(
            catalog,
            pool,
            options,
            narrator,
            analytics,
            StdRng::from_entropy(),
        )
    }
}

impl<R: RngCore> SessionEngine<R> {
    pub fn with_rng(
        catalog: SoundCatalog,
        pool: CreaturePool,
        options: SessionOptions,
        narrator: Box<dyn Narrator>,
        analytics: Box<dyn AnalyticsSink>,
        rng: R,
    ) -> Self {
        Self {
            catalog,
            pool,
            options,
            phase: Phase::Config,
            session: None,
            selected_profile: None,
            selector: Box::new(BalancedSelector),
            narrator,
            analytics,
            rng,
        }
    }

    /// Swap the candidate selection strategy
    pub fn with_selector(mut self, selector: Box<dyn CandidateSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Single entry point for drivers
    pub fn dispatch(&mut self, event: SessionEvent) -> Result<Handled, ConfigError> {
        let handled = match event {
            SessionEvent::StartGame(profile) => return self.start_game(profile),
            SessionEvent::LoadComplete => self.load_complete(),
            SessionEvent::Continue => self.continue_to_play(),
            SessionEvent::IntroductionFinished => self.introduction_finished(),
            SessionEvent::Toggle(id) => self.toggle(&id),
            SessionEvent::Submit(selection) => self.submit(selection),
            SessionEvent::SubmitCurrent => self.submit_current(),
            SessionEvent::Tick => self.tick(),
            SessionEvent::TryAgain => self.try_again(),
            SessionEvent::NextRound => self.next_round(),
            SessionEvent::PlayAgain => self.play_again(),
            SessionEvent::ChangeDifficulty(profile) => self.change_difficulty(profile),
            SessionEvent::Abandon => self.abandon(),
        };
        Ok(handled)
    }

    /// Config -> Loading. Rejects configurations no round could be built from.
    pub fn start_game(&mut self, profile: DifficultyProfile) -> Result<Handled, ConfigError> {
        if self.phase != Phase::Config {
            return Ok(Handled::Ignored);
        }

        if self.options.total_rounds == 0 {
            return Err(ConfigError::InvalidRounds(self.options.total_rounds));
        }
        if self.pool.is_empty() {
            return Err(ConfigError::EmptyCreaturePool);
        }
        if let Some(id) = self.pool.duplicate_id() {
            return Err(ConfigError::DuplicateCreature(id.to_string()));
        }
        if self.catalog.is_empty() {
            return Err(ConfigError::EmptyPhonemeUniverse);
        }
        profile.validate()?;

        let (round_config, candidates, used) = self
            .draw_round(&profile, &HashSet::new())
            .ok_or(ConfigError::EmptyPhonemeUniverse)?;

        info!(
            "starting {} round session on {} with /{}/",
            self.options.total_rounds, profile.name, round_config.target
        );
        let mut session = GameSession::new(
            profile,
            self.options.total_rounds,
            used,
            round_config,
            candidates,
        );
        session.countdown.reset(session.profile.time_limit_secs);

        self.selected_profile = None;
        self.session = Some(session);
        self.set_phase(Phase::Loading);
        Ok(Handled::Applied)
    }

    /// Loading -> Intro, once the presentation layer has finished its loading beat
    pub fn load_complete(&mut self) -> Handled {
        if self.phase != Phase::Loading || self.session.is_none() {
            return Handled::Ignored;
        }
        self.set_phase(Phase::Intro);
        Handled::Applied
    }

    /// Intro -> Playing
    pub fn continue_to_play(&mut self) -> Handled {
        if self.phase != Phase::Intro {
            return Handled::Ignored;
        }
        self.enter_playing();
        Handled::Applied
    }

    /// The narrated introduction has finished; start the round clock
    pub fn introduction_finished(&mut self) -> Handled {
        if self.phase != Phase::Playing {
            return Handled::Ignored;
        }
        match self.session.as_mut() {
            Some(session) if !session.countdown.is_armed() => {
                session.countdown.arm();
                if !session.countdown.is_armed() {
                    // No time limit; the round only ends on submit
                    return Handled::Ignored;
                }
                debug!("round clock started at {}s", session.countdown.remaining());
                Handled::Applied
            }
            _ => Handled::Ignored,
        }
    }

    /// Add or remove a creature from the in-progress selection
    pub fn toggle(&mut self, id: &CreatureId) -> Handled {
        if self.phase != Phase::Playing {
            return Handled::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return Handled::Ignored;
        };
        if !session.is_candidate(id) {
            return Handled::Ignored;
        }
        if !session.selection.remove(id) {
            session.selection.insert(id.clone());
        }
        Handled::Applied
    }

    /// Playing -> Results with an explicit selection
    pub fn submit(&mut self, selection: BTreeSet<CreatureId>) -> Handled {
        if self.phase != Phase::Playing {
            return Handled::Ignored;
        }
        self.finish_round(selection);
        Handled::Applied
    }

    /// Playing -> Results with whatever has been toggled so far
    pub fn submit_current(&mut self) -> Handled {
        if self.phase != Phase::Playing {
            return Handled::Ignored;
        }
        match self.session.as_ref().map(|s| s.selection.clone()) {
            Some(selection) => self.submit(selection),
            None => Handled::Ignored,
        }
    }

    /// One elapsed second. Expiry submits the partial selection exactly once.
    pub fn tick(&mut self) -> Handled {
        if self.phase != Phase::Playing {
            return Handled::Ignored;
        }
        let Some(session) = self.session.as_mut() else {
            return Handled::Ignored;
        };
        match session.countdown.tick() {
            CountdownTick::Idle => Handled::Ignored,
            CountdownTick::Running { .. } => Handled::Applied,
            CountdownTick::Expired => {
                debug!("round {} timed out", session.round);
                let selection = session.selection.clone();
                self.finish_round(selection);
                Handled::Applied
            }
        }
    }

    /// Results -> Playing for the same round and answer key
    pub fn try_again(&mut self) -> Handled {
        if self.phase != Phase::Results {
            return Handled::Ignored;
        }
        self.enter_playing();
        Handled::Applied
    }

    /// Results -> Loading with a fresh round, or Results -> Complete after the last one
    pub fn next_round(&mut self) -> Handled {
        if self.phase != Phase::Results {
            return Handled::Ignored;
        }
        let Some(session) = self.session.as_ref() else {
            return Handled::Ignored;
        };

        if session.is_last_round() {
            info!(
                "session complete with {} points over {} rounds",
                session.cumulative_score(),
                session.total_rounds
            );
            self.set_phase(Phase::Complete);
            self.emit_summary(true);
            return Handled::Applied;
        }

        let profile = session.profile.clone();
        let used = session.used_phonemes.clone();
        let Some((round_config, candidates, used)) = self.draw_round(&profile, &used) else {
            return Handled::Ignored;
        };

        if let Some(session) = self.session.as_mut() {
            session.round += 1;
            session.used_phonemes = used;
            session.round_config = round_config;
            session.candidates = candidates;
            session.selection.clear();
            session.countdown.reset(profile.time_limit_secs);
            debug!("round {} targets /{}/", session.round, session.round_config.target);
        }
        self.set_phase(Phase::Loading);
        Handled::Applied
    }

    /// Complete -> Loading with a new session on the same profile.
    /// The sound rotation carries on from the previous session.
    pub fn play_again(&mut self) -> Handled {
        if self.phase != Phase::Complete {
            return Handled::Ignored;
        }
        let Some(previous) = self.session.take() else {
            return Handled::Ignored;
        };

        let Some((round_config, candidates, used)) =
            self.draw_round(&previous.profile, &previous.used_phonemes)
        else {
            self.session = Some(previous);
            return Handled::Ignored;
        };

        let mut session = GameSession::new(
            previous.profile,
            self.options.total_rounds,
            used,
            round_config,
            candidates,
        );
        session.countdown.reset(session.profile.time_limit_secs);
        info!("playing again with /{}/", session.round_config.target);

        self.session = Some(session);
        self.set_phase(Phase::Loading);
        Handled::Applied
    }

    /// Complete -> Config, discarding the session and its sound rotation
    pub fn change_difficulty(&mut self, profile: DifficultyProfile) -> Handled {
        if self.phase != Phase::Complete {
            return Handled::Ignored;
        }
        self.session = None;
        self.selected_profile = Some(profile);
        self.set_phase(Phase::Config);
        Handled::Applied
    }

    /// Learner leaves mid-session. Reports the partial session and returns to Config.
    pub fn abandon(&mut self) -> Handled {
        if self.session.is_none() {
            return Handled::Ignored;
        }
        self.emit_summary(false);
        self.session = None;
        self.set_phase(Phase::Config);
        Handled::Applied
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current round, 1-based. Reads 1 while no session is active.
    pub fn round(&self) -> usize {
        self.session.as_ref().map_or(1, |s| s.round)
    }

    pub fn total_rounds(&self) -> usize {
        self.options.total_rounds
    }

    pub fn cumulative_score(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.cumulative_score())
    }

    /// Profile of the active session, or the one chosen with `change_difficulty`
    pub fn profile(&self) -> Option<&DifficultyProfile> {
        self.session
            .as_ref()
            .map(|s| &s.profile)
            .or(self.selected_profile.as_ref())
    }

    pub fn round_config(&self) -> Option<&RoundConfig> {
        self.session.as_ref().map(|s| &s.round_config)
    }

    pub fn candidates(&self) -> &[Creature] {
        match &self.session {
            Some(session) => &session.candidates,
            None => &[],
        }
    }

    pub fn selection(&self) -> Option<&BTreeSet<CreatureId>> {
        self.session.as_ref().map(|s| &s.selection)
    }

    /// Result of the current round, once submitted
    pub fn last_result(&self) -> Option<&RoundResult> {
        self.session.as_ref().and_then(|s| s.current_result())
    }

    /// Sounds already drawn in the current rotation; `None` reads as empty
    pub fn used_phonemes(&self) -> Option<&HashSet<Phoneme>> {
        self.session.as_ref().map(|s| &s.used_phonemes)
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.countdown.remaining())
    }

    pub fn correct_count_in_round(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.correct_count())
    }

    pub fn selection_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.selection.len())
    }

    /// The round is prepared and the presentation may leave Loading
    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Loading && self.session.is_some()
    }

    pub fn catalog(&self) -> &SoundCatalog {
        &self.catalog
    }

    fn set_phase(&mut self, next: Phase) {
        debug!("{} -> {}", self.phase, next);
        self.phase = next;
    }

    fn draw_round(
        &mut self,
        profile: &DifficultyProfile,
        used: &HashSet<Phoneme>,
    ) -> Option<(RoundConfig, Vec<Creature>, HashSet<Phoneme>)> {
        let (target, used) = next_sound(used, &self.catalog.phonemes(), &mut self.rng)?;
        let position = *profile.positions.choose(&mut self.rng)?;
        let candidates = self.selector.select_candidates(
            &target,
            &self.pool,
            profile.creature_count,
            &mut self.rng,
        );

        let round_config = RoundConfig {
            target,
            position,
            profile: profile.clone(),
            environment: self.options.environment.clone(),
        };
        Some((round_config, candidates, used))
    }

    /// Clear the selection, load a fresh clock and narrate the round.
    /// The clock starts on `introduction_finished`.
    fn enter_playing(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.selection.clear();
        session.countdown.reset(session.profile.time_limit_secs);

        self.narrator
            .announce_phoneme(session.round_config.target.as_str());
        for creature in &session.candidates {
            self.narrator.announce_creature(&creature.name);
        }
        self.set_phase(Phase::Playing);
    }

    fn finish_round(&mut self, selection: BTreeSet<CreatureId>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.countdown.cancel();

        let selection: BTreeSet<CreatureId> = selection
            .into_iter()
            .filter(|id| session.is_candidate(id))
            .collect();
        let result = evaluate(&session.candidates, &session.round_config.target, &selection);
        debug!(
            "round {} scored {} ({} correct, {} incorrect, {} missed)",
            session.round,
            result.score,
            result.correct_selected.len(),
            result.incorrect_selected.len(),
            result.missed_correct.len()
        );

        self.narrator.celebrate(result.score);
        session.selection = selection;
        session.store_result(result);
        self.set_phase(Phase::Results);
    }

    fn emit_summary(&mut self, completed: bool) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.summary_emitted {
            return;
        }
        session.summary_emitted = true;

        let summary = session.summary(completed);
        if let Err(e) = self.analytics.record(&summary) {
            warn!("failed to record session summary: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{MemorySink, NullSink, SessionSummary};
    use crate::difficulty::{Difficulty, SoundPosition};
    use crate::error::AnalyticsError;
    use crate::narration::SilentNarrator;
    use crate::reference::PhonemeDescriptor;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Said {
        Phoneme(String),
        Creature(String),
        Celebrate(u32),
    }

    #[derive(Default, Clone)]
    struct RecordingNarrator {
        said: Rc<RefCell<Vec<Said>>>,
    }

    impl Narrator for RecordingNarrator {
        fn announce_phoneme(&mut self, text: &str) {
            self.said.borrow_mut().push(Said::Phoneme(text.to_string()));
        }
        fn announce_creature(&mut self, text: &str) {
            self.said.borrow_mut().push(Said::Creature(text.to_string()));
        }
        fn celebrate(&mut self, score: u32) {
            self.said.borrow_mut().push(Said::Celebrate(score));
        }
    }

    struct FailingSink;

    impl AnalyticsSink for FailingSink {
        fn record(&mut self, _summary: &SessionSummary) -> Result<(), AnalyticsError> {
            Err(AnalyticsError::Unavailable("offline".into()))
        }
    }

    /// Only ever shows distractors
    struct DistractorSelector;

    impl CandidateSelector for DistractorSelector {
        fn select_candidates(
            &self,
            target: &Phoneme,
            pool: &CreaturePool,
            count: usize,
            _rng: &mut dyn RngCore,
        ) -> Vec<Creature> {
            pool.without_sound(target)
                .into_iter()
                .take(count)
                .cloned()
                .collect()
        }
    }

    fn descriptor(symbol: &str) -> PhonemeDescriptor {
        PhonemeDescriptor {
            symbol: Phoneme::from(symbol),
            description: format!("say {symbol}"),
            examples: vec![],
        }
    }

    fn test_catalog() -> SoundCatalog {
        SoundCatalog::new("test", vec![descriptor("s"), descriptor("m"), descriptor("t")])
    }

    fn test_pool() -> CreaturePool {
        CreaturePool::new(
            "test",
            vec![
                Creature::new("snake", "Snake", "s"),
                Creature::new("seal", "Seal", "s"),
                Creature::new("spider", "Spider", "s"),
                Creature::new("squirrel", "Squirrel", "s"),
                Creature::new("monkey", "Monkey", "m"),
                Creature::new("mouse", "Mouse", "m"),
                Creature::new("moose", "Moose", "m"),
                Creature::new("meerkat", "Meerkat", "m"),
                Creature::new("tiger", "Tiger", "t"),
                Creature::new("turtle", "Turtle", "t"),
                Creature::new("toucan", "Toucan", "t"),
                Creature::new("tapir", "Tapir", "t"),
            ],
        )
    }

    fn engine_with(options: SessionOptions, seed: u64) -> SessionEngine<StdRng> {
        SessionEngine::with_rng(
            test_catalog(),
            test_pool(),
            options,
            Box::new(SilentNarrator),
            Box::new(NullSink),
            StdRng::seed_from_u64(seed),
        )
    }

    fn seeded(seed: u64) -> SessionEngine<StdRng> {
        engine_with(SessionOptions::default(), seed)
    }

    fn to_playing(engine: &mut SessionEngine<StdRng>) {
        assert_eq!(engine.load_complete(), Handled::Applied);
        assert_eq!(engine.continue_to_play(), Handled::Applied);
        assert_eq!(engine.phase(), Phase::Playing);
    }

    fn correct_ids(engine: &SessionEngine<StdRng>) -> BTreeSet<CreatureId> {
        let target = &engine.round_config().unwrap().target;
        engine
            .candidates()
            .iter()
            .filter(|c| c.has(target))
            .map(|c| c.id.clone())
            .collect()
    }

    #[test]
    fn test_start_game_prepares_first_round() {
        let mut engine = seeded(1);

        assert_eq!(engine.start_game(Difficulty::Easy.profile()), Ok(Handled::Applied));

        assert_eq!(engine.phase(), Phase::Loading);
        assert!(engine.is_ready());
        assert_eq!(engine.round(), 1);
        assert_eq!(engine.cumulative_score(), 0);
        assert_eq!(engine.candidates().len(), 6);
        assert_eq!(engine.time_remaining_secs(), 60);

        let config = engine.round_config().unwrap();
        assert_eq!(config.position, SoundPosition::Beginning);
        assert_eq!(config.environment, "savanna");
        assert_eq!(
            engine.used_phonemes().unwrap(),
            &HashSet::from([config.target.clone()])
        );
        assert!((2..=4).contains(&engine.correct_count_in_round()));
    }

    #[test]
    fn test_config_errors_keep_engine_in_config() {
        let mut engine = engine_with(
            SessionOptions {
                total_rounds: 0,
                ..SessionOptions::default()
            },
            1,
        );
        assert_eq!(
            engine.start_game(Difficulty::Easy.profile()),
            Err(ConfigError::InvalidRounds(0))
        );
        assert_eq!(engine.phase(), Phase::Config);

        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            CreaturePool::new("empty", vec![]),
            SessionOptions::default(),
            Box::new(SilentNarrator),
            Box::new(NullSink),
            StdRng::seed_from_u64(1),
        );
        assert_eq!(
            engine.start_game(Difficulty::Easy.profile()),
            Err(ConfigError::EmptyCreaturePool)
        );

        let mut engine = SessionEngine::with_rng(
            SoundCatalog::new("empty", vec![]),
            test_pool(),
            SessionOptions::default(),
            Box::new(SilentNarrator),
            Box::new(NullSink),
            StdRng::seed_from_u64(1),
        );
        assert_eq!(
            engine.start_game(Difficulty::Easy.profile()),
            Err(ConfigError::EmptyPhonemeUniverse)
        );

        let mut engine = seeded(1);
        let mut profile = Difficulty::Easy.profile();
        profile.creature_count = 0;
        assert_matches!(
            engine.start_game(profile),
            Err(ConfigError::ZeroCreatureCount(_))
        );
        assert_eq!(engine.phase(), Phase::Config);
        assert!(!engine.is_ready());
    }

    #[test]
    fn test_events_in_wrong_phase_are_ignored() {
        let mut engine = seeded(2);

        assert_eq!(engine.load_complete(), Handled::Ignored);
        assert_eq!(engine.submit_current(), Handled::Ignored);
        assert_eq!(engine.tick(), Handled::Ignored);
        assert_eq!(engine.next_round(), Handled::Ignored);
        assert_eq!(engine.abandon(), Handled::Ignored);

        engine.start_game(Difficulty::Easy.profile()).unwrap();
        assert_eq!(engine.start_game(Difficulty::Hard.profile()), Ok(Handled::Ignored));
        assert_eq!(engine.continue_to_play(), Handled::Ignored);
        assert_eq!(engine.try_again(), Handled::Ignored);
        assert_eq!(engine.play_again(), Handled::Ignored);
        assert_eq!(engine.phase(), Phase::Loading);
    }

    #[test]
    fn test_submit_scores_and_accumulates() {
        let mut engine = seeded(3);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);

        let correct = correct_ids(&engine);
        assert_eq!(engine.submit(correct), Handled::Applied);

        assert_eq!(engine.phase(), Phase::Results);
        assert_eq!(engine.last_result().unwrap().score, 100);
        assert_eq!(engine.cumulative_score(), 100);

        // A late submission for the finished round is dropped
        assert_eq!(engine.submit(BTreeSet::new()), Handled::Ignored);
        assert_eq!(engine.cumulative_score(), 100);
    }

    #[test]
    fn test_toggle_builds_selection() {
        let mut engine = seeded(4);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);

        let first = engine.candidates()[0].id.clone();
        assert_eq!(engine.toggle(&first), Handled::Applied);
        assert_eq!(engine.selection_count(), 1);
        assert_eq!(engine.toggle(&first), Handled::Applied);
        assert_eq!(engine.selection_count(), 0);

        let pool = test_pool();
        let outsider = pool
            .creatures()
            .iter()
            .find(|c| !engine.candidates().contains(c))
            .unwrap();
        assert_eq!(engine.toggle(&outsider.id), Handled::Ignored);

        for id in correct_ids(&engine) {
            engine.toggle(&id);
        }
        engine.submit_current();
        assert_eq!(engine.last_result().unwrap().score, 100);
    }

    #[test]
    fn test_submit_drops_unknown_ids() {
        let mut engine = seeded(5);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);

        let selection = BTreeSet::from([CreatureId::from("unicorn")]);
        engine.submit(selection);

        assert_eq!(engine.selection_count(), 0);
        assert!(engine.last_result().unwrap().incorrect_selected.is_empty());
    }

    #[test]
    fn test_timer_waits_for_introduction() {
        let mut engine = seeded(6);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);

        assert_eq!(engine.tick(), Handled::Ignored);
        assert_eq!(engine.time_remaining_secs(), 60);

        assert_eq!(engine.introduction_finished(), Handled::Applied);
        assert_eq!(engine.introduction_finished(), Handled::Ignored);
        assert_eq!(engine.tick(), Handled::Applied);
        assert_eq!(engine.time_remaining_secs(), 59);
    }

    #[test]
    fn test_zero_time_limit_never_starts_clock() {
        let mut profile = Difficulty::Easy.profile();
        profile.time_limit_secs = 0;
        let mut engine = seeded(6);
        engine.start_game(profile).unwrap();
        to_playing(&mut engine);

        assert_eq!(engine.introduction_finished(), Handled::Ignored);
        assert_eq!(engine.introduction_finished(), Handled::Ignored);
        assert_eq!(engine.tick(), Handled::Ignored);
        assert_eq!(engine.phase(), Phase::Playing);

        assert_eq!(engine.submit_current(), Handled::Applied);
        assert_eq!(engine.phase(), Phase::Results);
    }

    #[test]
    fn test_repeated_creature_ids_reject_start() {
        let mut creatures = test_pool().creatures().to_vec();
        creatures.push(Creature::new("snake", "Snake", "s"));
        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            CreaturePool::new("twins", creatures),
            SessionOptions::default(),
            Box::new(SilentNarrator),
            Box::new(NullSink),
            StdRng::seed_from_u64(1),
        );

        assert_eq!(
            engine.start_game(Difficulty::Easy.profile()),
            Err(ConfigError::DuplicateCreature("snake".into()))
        );
        assert_eq!(engine.phase(), Phase::Config);
    }

    #[test]
    fn test_time_expiry_submits_partial_selection_once() {
        let mut profile = Difficulty::Easy.profile();
        profile.time_limit_secs = 3;
        let mut engine = seeded(7);
        engine.start_game(profile).unwrap();
        to_playing(&mut engine);
        engine.introduction_finished();

        let pick = correct_ids(&engine).into_iter().next().unwrap();
        engine.toggle(&pick);

        engine.tick();
        engine.tick();
        assert_eq!(engine.phase(), Phase::Playing);
        assert_eq!(engine.tick(), Handled::Applied);

        assert_eq!(engine.phase(), Phase::Results);
        assert_eq!(engine.time_remaining_secs(), 0);
        let result = engine.last_result().unwrap().clone();
        assert_eq!(result.correct_selected.len(), 1);

        // No second expiry
        for _ in 0..5 {
            assert_eq!(engine.tick(), Handled::Ignored);
        }
        assert_eq!(engine.last_result(), Some(&result));
    }

    #[test]
    fn test_submit_cancels_timer() {
        let mut engine = seeded(8);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);
        engine.introduction_finished();
        engine.tick();

        engine.submit_current();
        let remaining = engine.time_remaining_secs();

        for _ in 0..100 {
            assert_eq!(engine.tick(), Handled::Ignored);
        }
        assert_eq!(engine.time_remaining_secs(), remaining);
        assert_eq!(engine.phase(), Phase::Results);
    }

    #[test]
    fn test_try_again_keeps_round() {
        let mut engine = seeded(9);
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);
        engine.introduction_finished();
        engine.tick();
        engine.submit(BTreeSet::new());
        assert_eq!(engine.cumulative_score(), 0);

        let candidates = engine.candidates().to_vec();
        let used = engine.used_phonemes().unwrap().clone();

        assert_eq!(engine.try_again(), Handled::Applied);
        assert_eq!(engine.phase(), Phase::Playing);
        assert_eq!(engine.round(), 1);
        assert_eq!(engine.candidates(), candidates.as_slice());
        assert_eq!(engine.used_phonemes().unwrap(), &used);
        assert_eq!(engine.selection_count(), 0);
        assert_eq!(engine.time_remaining_secs(), 60);

        let correct = correct_ids(&engine);
        engine.submit(correct);
        // The retry replaces the earlier attempt
        assert_eq!(engine.cumulative_score(), 100);
    }

    #[test]
    fn test_session_progression_reaches_complete_after_last_round() {
        let sink = MemorySink::new();
        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            test_pool(),
            SessionOptions::default(),
            Box::new(SilentNarrator),
            Box::new(sink.clone()),
            StdRng::seed_from_u64(10),
        );
        engine.start_game(Difficulty::Easy.profile()).unwrap();

        for round in 1..=5 {
            assert_eq!(engine.round(), round);
            to_playing(&mut engine);
            let correct = correct_ids(&engine);
            engine.submit(correct);
            assert_eq!(engine.phase(), Phase::Results);
            assert!(sink.records().is_empty());
            engine.next_round();
            if round < 5 {
                assert_eq!(engine.phase(), Phase::Loading);
            }
        }

        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.cumulative_score(), 500);
        assert_eq!(engine.next_round(), Handled::Ignored);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].completed);
        assert_eq!(records[0].creatures_shown, 30);
        assert_eq!(records[0].incorrect_selections, 0);
        assert_eq!(records[0].success_rate_percent, 100.0);
        assert_eq!(records[0].difficulty, "easy");
    }

    #[test]
    fn test_rounds_rotate_sounds() {
        let mut engine = seeded(11);
        engine.start_game(Difficulty::Easy.profile()).unwrap();

        let mut targets = Vec::new();
        for _ in 0..3 {
            targets.push(engine.round_config().unwrap().target.clone());
            to_playing(&mut engine);
            engine.submit_current();
            engine.next_round();
        }

        let unique: HashSet<_> = targets.iter().collect();
        assert_eq!(unique.len(), 3);
        // Fourth round restarts the rotation
        assert_eq!(engine.used_phonemes().unwrap().len(), 1);
    }

    #[test]
    fn test_play_again_resets_score_and_continues_rotation() {
        let mut engine = engine_with(
            SessionOptions {
                total_rounds: 1,
                ..SessionOptions::default()
            },
            12,
        );
        engine.start_game(Difficulty::Medium.profile()).unwrap();
        let first = engine.round_config().unwrap().target.clone();
        to_playing(&mut engine);
        let correct = correct_ids(&engine);
        engine.submit(correct);
        engine.next_round();
        assert_eq!(engine.phase(), Phase::Complete);

        assert_eq!(engine.play_again(), Handled::Applied);

        assert_eq!(engine.phase(), Phase::Loading);
        assert_eq!(engine.round(), 1);
        assert_eq!(engine.cumulative_score(), 0);
        assert!(engine.last_result().is_none());
        assert_eq!(engine.candidates().len(), 8);
        let second = engine.round_config().unwrap().target.clone();
        assert_ne!(first, second);
        assert_eq!(engine.used_phonemes().unwrap().len(), 2);
    }

    #[test]
    fn test_change_difficulty_returns_to_config() {
        let mut engine = engine_with(
            SessionOptions {
                total_rounds: 1,
                ..SessionOptions::default()
            },
            13,
        );
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);
        engine.submit_current();
        engine.next_round();

        assert_eq!(engine.change_difficulty(Difficulty::Hard.profile()), Handled::Applied);

        assert_eq!(engine.phase(), Phase::Config);
        assert_eq!(engine.round(), 1);
        assert_eq!(engine.cumulative_score(), 0);
        assert!(engine.used_phonemes().is_none());
        assert_eq!(engine.profile().unwrap().name, "hard");

        let profile = engine.profile().unwrap().clone();
        engine.start_game(profile).unwrap();
        assert_eq!(engine.candidates().len(), 10);
        assert_eq!(engine.used_phonemes().unwrap().len(), 1);
    }

    #[test]
    fn test_abandon_reports_partial_session_once() {
        let sink = MemorySink::new();
        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            test_pool(),
            SessionOptions::default(),
            Box::new(SilentNarrator),
            Box::new(sink.clone()),
            StdRng::seed_from_u64(14),
        );
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);
        engine.introduction_finished();
        engine.tick();
        engine.tick();
        engine.submit_current();

        assert_eq!(engine.abandon(), Handled::Applied);
        assert_eq!(engine.phase(), Phase::Config);
        assert_eq!(engine.abandon(), Handled::Ignored);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert!(!records[0].completed);
        assert_eq!(records[0].time_spent_seconds, 2);
        assert_eq!(records[0].creatures_shown, 6);
    }

    #[test]
    fn test_analytics_failure_does_not_block_completion() {
        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            test_pool(),
            SessionOptions {
                total_rounds: 1,
                ..SessionOptions::default()
            },
            Box::new(SilentNarrator),
            Box::new(FailingSink),
            StdRng::seed_from_u64(15),
        );
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);
        engine.submit_current();

        assert_eq!(engine.next_round(), Handled::Applied);
        assert_eq!(engine.phase(), Phase::Complete);
        assert_eq!(engine.play_again(), Handled::Applied);
    }

    #[test]
    fn test_narration_intents() {
        let narrator = RecordingNarrator::default();
        let mut engine = SessionEngine::with_rng(
            test_catalog(),
            test_pool(),
            SessionOptions::default(),
            Box::new(narrator.clone()),
            Box::new(NullSink),
            StdRng::seed_from_u64(16),
        );
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        engine.load_complete();
        assert!(narrator.said.borrow().is_empty());

        engine.continue_to_play();
        let target = engine.round_config().unwrap().target.to_string();
        {
            let said = narrator.said.borrow();
            assert_eq!(said.len(), 7);
            assert_eq!(said[0], Said::Phoneme(target));
            assert_eq!(said[1], Said::Creature(engine.candidates()[0].name.clone()));
        }

        let correct = correct_ids(&engine);
        engine.submit(correct);
        assert_eq!(narrator.said.borrow().last(), Some(&Said::Celebrate(100)));
    }

    #[test]
    fn test_round_without_correct_creatures_scores_zero() {
        let mut engine = seeded(17).with_selector(Box::new(DistractorSelector));
        engine.start_game(Difficulty::Easy.profile()).unwrap();
        to_playing(&mut engine);

        assert_eq!(engine.correct_count_in_round(), 0);
        let everything: BTreeSet<_> = engine.candidates().iter().map(|c| c.id.clone()).collect();
        engine.submit(everything);

        assert_eq!(engine.last_result().unwrap().score, 0);
        assert_eq!(engine.phase(), Phase::Results);
    }

    #[test]
    fn test_dispatch_routes_events() {
        let mut engine = seeded(18);

        assert_eq!(
            engine.dispatch(SessionEvent::StartGame(Difficulty::Easy.profile())),
            Ok(Handled::Applied)
        );
        assert_eq!(engine.dispatch(SessionEvent::LoadComplete), Ok(Handled::Applied));
        assert_eq!(engine.dispatch(SessionEvent::Continue), Ok(Handled::Applied));
        assert_eq!(
            engine.dispatch(SessionEvent::IntroductionFinished),
            Ok(Handled::Applied)
        );
        assert_eq!(engine.dispatch(SessionEvent::Tick), Ok(Handled::Applied));
        assert_eq!(engine.dispatch(SessionEvent::SubmitCurrent), Ok(Handled::Applied));
        assert_eq!(engine.dispatch(SessionEvent::TryAgain), Ok(Handled::Applied));
        assert_eq!(
            engine.dispatch(SessionEvent::Submit(BTreeSet::new())),
            Ok(Handled::Applied)
        );
        assert_eq!(engine.dispatch(SessionEvent::NextRound), Ok(Handled::Applied));
        assert_eq!(engine.dispatch(SessionEvent::Abandon), Ok(Handled::Applied));
        assert_eq!(engine.phase(), Phase::Config);
    }
}
