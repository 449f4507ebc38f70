// 🏆 Ranking Engine - win rate leaderboard
//
// Order: higher win rate, then more total votes, then lower id.
// The last rule leaves no ties, so the output is fully deterministic.

use crate::catalog::Entity;
use crate::store::VoteCounters;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Win rate as a percentage; 0 when nobody has voted yet
pub fn win_rate(wins: u64, total_votes: u64) -> f64 {
    if total_votes == 0 {
        return 0.0;
    }
    wins as f64 / total_votes as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntity {
    /// 1-based position in the leaderboard
    pub rank: usize,
    pub entity: Entity,
    pub counters: VoteCounters,
    pub win_rate: f64,
}

/// Join entities with their counters and sort them into leaderboard order.
/// Entities without a counters row are ranked as if they had zero votes.
pub fn rank(entities: &[Entity], counters: &[VoteCounters]) -> Vec<RankedEntity> {
    let by_id: HashMap<_, _> = counters.iter().map(|c| (c.entity_id, c)).collect();

    let mut joined: Vec<(Entity, VoteCounters)> = entities
        .iter()
        .map(|entity| {
            let counters = by_id
                .get(&entity.id)
                .map(|c| (*c).clone())
                .unwrap_or_else(|| VoteCounters::zeroed(entity.id));
            (entity.clone(), counters)
        })
        .collect();

    joined.sort_by(|(a, a_counters), (b, b_counters)| compare(a, a_counters, b, b_counters));

    joined
        .into_iter()
        .enumerate()
        .map(|(index, (entity, counters))| RankedEntity {
            rank: index + 1,
            win_rate: win_rate(counters.wins, counters.total_votes),
            entity,
            counters,
        })
        .collect()
}

/// Leaderboard comparator (`Less` means `a` ranks above `b`)
pub fn compare(
    a: &Entity,
    a_counters: &VoteCounters,
    b: &Entity,
    b_counters: &VoteCounters,
) -> Ordering {
    compare_win_rate(b_counters, a_counters)
        .then_with(|| b_counters.total_votes.cmp(&a_counters.total_votes))
        .then_with(|| a.id.cmp(&b.id))
}

// Exact comparison of wins/total via cross multiplication, so 8/10 and 4/5
// always tie. A zero total counts as 0/1.
fn compare_win_rate(a: &VoteCounters, b: &VoteCounters) -> Ordering {
    let a_total = a.total_votes.max(1) as u128;
    let b_total = b.total_votes.max(1) as u128;
    let a_wins = if a.total_votes == 0 { 0 } else { a.wins as u128 };
    let b_wins = if b.total_votes == 0 { 0 } else { b.wins as u128 };

    (a_wins * b_total).cmp(&(b_wins * a_total))
}

// ============================================================================
// TESTS
// ============================================================================
