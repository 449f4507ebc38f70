// 🤝 Voting service - the operations the front ends call
//
// Joins the catalog with a fresh store snapshot and validates vote
// submissions before they reach the store. Shared by the CLI and the
// HTTP API.

use crate::catalog::{Catalog, Entity, EntityId};
use crate::error::{Result, ValidationError};
use crate::pairing;
use crate::ranking::{self, RankedEntity};
use crate::store::{VoteCounters, VoteStore};
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// BOUNDARY SHAPES
// ============================================================================

/// Entity fields plus its tally, as the front ends see it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityStats {
    #[serde(flatten)]
    pub entity: Entity,
    pub wins: u64,
    pub losses: u64,
    pub total_votes: u64,
}

impl EntityStats {
    pub fn new(entity: Entity, counters: &VoteCounters) -> Self {
        EntityStats {
            entity,
            wins: counters.wins,
            losses: counters.losses,
            total_votes: counters.total_votes,
        }
    }
}

/// A leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedStats {
    pub rank: usize,
    #[serde(flatten)]
    pub stats: EntityStats,
    pub win_rate: f64,
}

impl From<RankedEntity> for RankedStats {
    fn from(ranked: RankedEntity) -> Self {
        RankedStats {
            rank: ranked.rank,
            stats: EntityStats::new(ranked.entity, &ranked.counters),
            win_rate: ranked.win_rate,
        }
    }
}

/// Raw vote submission. Ids are optional and signed so that missing or
/// negative values reach validation instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub winner_id: Option<i64>,
    #[serde(default)]
    pub loser_id: Option<i64>,
}

impl VoteRequest {
    pub fn new(winner_id: i64, loser_id: i64) -> Self {
        VoteRequest {
            winner_id: Some(winner_id),
            loser_id: Some(loser_id),
        }
    }

    /// Check presence, distinctness and range against the catalog
    pub fn validate(
        &self,
        catalog: &Catalog,
    ) -> std::result::Result<(EntityId, EntityId), ValidationError> {
        let winner = self.winner_id.ok_or_else(|| ValidationError::missing("winnerId"))?;
        let loser = self.loser_id.ok_or_else(|| ValidationError::missing("loserId"))?;

        if winner == loser {
            return Err(ValidationError::same_entity(winner));
        }

        let winner = checked_id("winnerId", winner, catalog)?;
        let loser = checked_id("loserId", loser, catalog)?;

        Ok((winner, loser))
    }
}

fn checked_id(
    field: &str,
    id: i64,
    catalog: &Catalog,
) -> std::result::Result<EntityId, ValidationError> {
    EntityId::try_from(id)
        .ok()
        .filter(|id| catalog.contains(*id))
        .ok_or_else(|| ValidationError::out_of_range(field, id, catalog.len()))
}

// ============================================================================
// OPERATIONS
// ============================================================================

/// Every catalog entry with its current counters, in id order
pub fn entities_with_stats(catalog: &Catalog, store: &VoteStore) -> Result<Vec<EntityStats>> {
    // get_all yields one zero-filled entry per catalog id, ascending, which
    // lines up with the catalog's own order
    let counters = store.get_all()?;

    Ok(catalog
        .entities()
        .iter()
        .zip(counters)
        .map(|(entity, counters)| {
            debug_assert_eq!(entity.id, counters.entity_id);
            EntityStats::new(entity.clone(), &counters)
        })
        .collect())
}

/// One catalog entry with its counters; `None` for an unknown id
pub fn entity_with_stats(
    catalog: &Catalog,
    store: &VoteStore,
    id: EntityId,
) -> Result<Option<EntityStats>> {
    match catalog.get(id) {
        Some(entity) => {
            let counters = store.get(id)?;
            Ok(Some(EntityStats::new(entity.clone(), &counters)))
        }
        None => Ok(None),
    }
}

/// Leaderboard computed from a fresh snapshot
pub fn ranked_results(catalog: &Catalog, store: &VoteStore) -> Result<Vec<RankedStats>> {
    let counters = store.get_all()?;

    Ok(ranking::rank(catalog.entities(), &counters)
        .into_iter()
        .map(RankedStats::from)
        .collect())
}

/// Validate a submission and record it
pub fn submit_vote(
    catalog: &Catalog,
    store: &VoteStore,
    request: &VoteRequest,
) -> Result<(EntityId, EntityId)> {
    let (winner, loser) = match request.validate(catalog) {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(error = %e, "vote rejected");
            return Err(e.into());
        }
    };

    store.record_vote(winner, loser)?;

    tracing::info!(
        winner = %catalog.get(winner).map_or("?", |e| e.name.as_str()),
        loser = %catalog.get(loser).map_or("?", |e| e.name.as_str()),
        "vote recorded"
    );
    Ok((winner, loser))
}

/// Next matchup for the vote screen
pub fn random_pair<'a, R: Rng + ?Sized>(
    catalog: &'a Catalog,
    rng: &mut R,
) -> Result<(&'a Entity, &'a Entity)> {
    pairing::select_pair(catalog.entities(), rng)
}

// ============================================================================
// TESTS
// ============================================================================
