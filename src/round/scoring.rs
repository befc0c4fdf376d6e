use crate::reference::{Creature, CreatureId, Phoneme};
use serde::Serialize;
use std::collections::BTreeSet;

/// Outcome of one submission, computed once and never mutated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResult {
    pub correct_selected: Vec<Creature>,
    pub incorrect_selected: Vec<Creature>,
    pub missed_correct: Vec<Creature>,
    /// 0-100
    pub score: u32,
}

impl RoundResult {
    pub fn total_correct(&self) -> usize {
        self.correct_selected.len() + self.missed_correct.len()
    }

    pub fn is_perfect(&self) -> bool {
        self.score == 100 && self.incorrect_selected.is_empty()
    }
}

/// Categorize a selection against the round's answer key.
///
/// Ids outside the candidate set are ignored. Lists keep candidate order.
/// A round with no correct creatures always scores 0.
pub fn evaluate(
    candidates: &[Creature],
    target: &Phoneme,
    selection: &BTreeSet<CreatureId>,
) -> RoundResult {
    let mut correct_selected = Vec::new();
    let mut incorrect_selected = Vec::new();
    let mut missed_correct = Vec::new();

    for creature in candidates {
        match (creature.has(target), selection.contains(&creature.id)) {
            (true, true) => correct_selected.push(creature.clone()),
            (true, false) => missed_correct.push(creature.clone()),
            (false, true) => incorrect_selected.push(creature.clone()),
            (false, false) => {}
        }
    }

    let total_correct = correct_selected.len() + missed_correct.len();
    let score = if total_correct == 0 {
        0
    } else {
        ((correct_selected.len() as f64 / total_correct as f64) * 100.0).round() as u32
    };

    RoundResult {
        correct_selected,
        incorrect_selected,
        missed_correct,
        score,
    }
}
