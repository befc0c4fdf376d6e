use crate::analytics::SessionSummary;
use crate::difficulty::DifficultyProfile;
use crate::reference::{Creature, CreatureId, Phoneme};
use crate::round::{RoundConfig, RoundResult};
use crate::timer::Countdown;
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum Phase {
    Config,
    Loading,
    Intro,
    Playing,
    Results,
    Complete,
}

/// Mutable root of one learner's game, owned by the engine
#[derive(Debug, Clone)]
pub struct GameSession {
    pub profile: DifficultyProfile,
    /// 1-based
    pub round: usize,
    pub total_rounds: usize,
    /// Latest result of each completed round, indexed by `round - 1`
    pub results: Vec<RoundResult>,
    /// Candidate set size of each completed round
    pub round_sizes: Vec<usize>,
    pub used_phonemes: HashSet<Phoneme>,
    pub round_config: RoundConfig,
    pub candidates: Vec<Creature>,
    pub selection: BTreeSet<CreatureId>,
    pub countdown: Countdown,
    pub summary_emitted: bool,
}

impl GameSession {
    pub fn new(
        profile: DifficultyProfile,
        total_rounds: usize,
        used_phonemes: HashSet<Phoneme>,
        round_config: RoundConfig,
        candidates: Vec<Creature>,
    ) -> Self {
        Self {
            profile,
            round: 1,
            total_rounds,
            results: Vec::new(),
            round_sizes: Vec::new(),
            used_phonemes,
            round_config,
            candidates,
            selection: BTreeSet::new(),
            countdown: Countdown::new(),
            summary_emitted: false,
        }
    }

    /// Always derived from the stored results
    pub fn cumulative_score(&self) -> u32 {
        self.results.iter().map(|r| r.score).sum()
    }

    pub fn current_result(&self) -> Option<&RoundResult> {
        self.results.get(self.round - 1)
    }

    /// Store the result for the current round, replacing an earlier attempt
    pub fn store_result(&mut self, result: RoundResult) {
        let idx = self.round - 1;
        if idx < self.results.len() {
            self.results[idx] = result;
            self.round_sizes[idx] = self.candidates.len();
        } else {
            self.results.push(result);
            self.round_sizes.push(self.candidates.len());
        }
    }

    pub fn summary(&self, completed: bool) -> SessionSummary {
        let success_rate_percent = if self.results.is_empty() {
            0.0
        } else {
            self.cumulative_score() as f64 / self.results.len() as f64
        };

        SessionSummary {
            target_sound: self.round_config.target.clone(),
            sound_position: self.round_config.position,
            environment: self.round_config.environment.clone(),
            difficulty: self.profile.name.clone(),
            creatures_shown: self.round_sizes.iter().sum::<usize>() as u32,
            correct_selections: self.results.iter().map(|r| r.correct_selected.len() as u32).sum(),
            incorrect_selections: self
                .results
                .iter()
                .map(|r| r.incorrect_selected.len() as u32)
                .sum(),
            success_rate_percent,
            time_spent_seconds: self.countdown.elapsed(),
            completed,
        }
    }

    pub fn correct_count(&self) -> usize {
        let target = &self.round_config.target;
        self.candidates.iter().filter(|c| c.has(target)).count()
    }

    pub fn is_candidate(&self, id: &CreatureId) -> bool {
        self.candidates.iter().any(|c| &c.id == id)
    }

    pub fn is_last_round(&self) -> bool {
        self.round >= self.total_rounds
    }
}
