use crate::reference::{Creature, CreaturePool, Phoneme};
use log::debug;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore};
use std::ops::RangeInclusive;

/// Trait for different candidate selection strategies
pub trait CandidateSelector {
    /// Pick the creatures shown in one round
    fn select_candidates(
        &self,
        target: &Phoneme,
        pool: &CreaturePool,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Creature>;
}

/// Mixes 40-60% creatures carrying the target sound with distractors
pub struct BalancedSelector;

impl CandidateSelector for BalancedSelector {
    fn select_candidates(
        &self,
        target: &Phoneme,
        pool: &CreaturePool,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Vec<Creature> {
        select_candidates(target, pool, count, rng)
    }
}

/// Inclusive bounds for the number of correct creatures:
/// `max(2, floor(count * 0.4))..=min(available, ceil(count * 0.6))`.
/// The range is empty when too few creatures carry the sound.
pub fn correct_range(count: usize, available: usize) -> RangeInclusive<usize> {
    let lower = (count * 2 / 5).max(2);
    let upper = available.min((count * 3).div_ceil(5));
    lower..=upper
}

/// Number of correct creatures to include in a round
pub fn pick_correct_count<R: Rng + ?Sized>(count: usize, available: usize, rng: &mut R) -> usize {
    let range = correct_range(count, available);
    if range.is_empty() {
        available.min(count)
    } else {
        rng.gen_range(range)
    }
}

/// Build a shuffled candidate set for `target`.
///
/// Creatures are sampled without replacement from both sides of the pool.
/// If no creature carries the sound the round silently has zero correct answers.
pub fn select_candidates<R: Rng + ?Sized>(
    target: &Phoneme,
    pool: &CreaturePool,
    count: usize,
    rng: &mut R,
) -> Vec<Creature> {
    let with_sound = pool.with_sound(target);
    let without_sound = pool.without_sound(target);

    let num_correct = pick_correct_count(count, with_sound.len(), rng);
    let num_incorrect = count.saturating_sub(num_correct).min(without_sound.len());

    let mut candidates: Vec<Creature> = with_sound
        .choose_multiple(rng, num_correct)
        .chain(without_sound.choose_multiple(rng, num_incorrect))
        .map(|c| (*c).clone())
        .collect();
    candidates.shuffle(rng);

    debug!(
        "selected {} candidates for /{}/ ({} correct, {} distractors)",
        candidates.len(),
        target,
        num_correct,
        num_incorrect
    );
    if num_correct == 0 {
        debug!("no creature carries /{target}/, round has nothing to find");
    }

    candidates
}
