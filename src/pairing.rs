// 🎲 Pairing Selector - two distinct Pokemon, uniformly at random
//
// Draws two indices without replacement, so every unordered pair is equally
// likely and either member is equally likely to come first.

use crate::catalog::Entity;
use crate::error::{Result, VoteError};
use rand::seq::index;
use rand::Rng;

/// Pick two distinct entities using the given random source
pub fn select_pair<'a, R: Rng + ?Sized>(
    entities: &'a [Entity],
    rng: &mut R,
) -> Result<(&'a Entity, &'a Entity)> {
    if entities.len() < 2 {
        return Err(VoteError::InsufficientCatalog {
            available: entities.len(),
        });
    }

    let picked = index::sample(rng, entities.len(), 2);
    Ok((&entities[picked.index(0)], &entities[picked.index(1)]))
}

/// `select_pair` with the thread-local RNG
pub fn select_random_pair(entities: &[Entity]) -> Result<(&Entity, &Entity)> {
    select_pair(entities, &mut rand::thread_rng())
}
