use crate::reference::Phoneme;
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// Pick the next target sound, avoiding repeats until every sound has been used.
///
/// Returns the chosen phoneme and the updated used set. Once `all` is
/// exhausted the rotation restarts and the used set becomes `{chosen}`.
/// Returns `None` only when `all` is empty.
pub fn next_sound<R: Rng + ?Sized>(
    used: &HashSet<Phoneme>,
    all: &[Phoneme],
    rng: &mut R,
) -> Option<(Phoneme, HashSet<Phoneme>)> {
    let available: Vec<&Phoneme> = all.iter().filter(|p| !used.contains(*p)).collect();

    if let Some(chosen) = available.choose(rng) {
        let chosen = (*chosen).clone();
        let mut updated: HashSet<Phoneme> =
            used.iter().filter(|p| all.contains(p)).cloned().collect();
        updated.insert(chosen.clone());
        return Some((chosen, updated));
    }

    let chosen = all.choose(rng)?.clone();
    debug!("all {} sounds used, restarting rotation with /{chosen}/", all.len());
    Some((chosen.clone(), HashSet::from([chosen])))
}
