// 🗳️ Vote Store - durable win/loss counters per Pokemon (SQLite + WAL)
//
// One row per catalog id, created eagerly by `initialize()` or lazily by the
// upsert in `record_vote()`. Counters only ever go up, and every increment
// happens inside SQL so two concurrent votes can never lose an update.

use crate::catalog::{Catalog, EntityId};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::Error::FromSqlConversionFailure;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

// ============================================================================
// VOTE COUNTERS
// ============================================================================

/// Tally for one entity. Invariant: `total_votes == wins + losses`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCounters {
    pub entity_id: EntityId,
    pub wins: u64,
    pub losses: u64,
    pub total_votes: u64,

    /// Last time a vote touched this row (None = never voted on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl VoteCounters {
    pub fn zeroed(entity_id: EntityId) -> Self {
        VoteCounters {
            entity_id,
            wins: 0,
            losses: 0,
            total_votes: 0,
            updated_at: None,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.total_votes == self.wins + self.losses
    }
}

// ============================================================================
// VOTE STORE
// ============================================================================

/// Handle to the counters table.
///
/// Clones share a single connection; the mutex serializes callers and each
/// `record_vote` runs in its own transaction. Nothing is cached in-process,
/// so every read reflects the latest committed state.
#[derive(Clone)]
pub struct VoteStore {
    conn: Arc<Mutex<Connection>>,
    known_ids: Arc<[EntityId]>,
}

impl VoteStore {
    /// Open (or create) the database file at `db_path`
    pub fn open(db_path: &Path, catalog: &Catalog) -> Result<Self> {
        Self::open_with_timeout(db_path, catalog, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(
        db_path: &Path,
        catalog: &Catalog,
        busy_timeout: Duration,
    ) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        // WAL for crash recovery and readers that don't block the writer
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(busy_timeout)?;

        tracing::debug!(path = ?db_path, "vote store opened");
        Ok(Self::from_connection(conn, catalog))
    }

    /// Private in-memory database, mostly for tests and demos
    pub fn open_in_memory(catalog: &Catalog) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn, catalog))
    }

    fn from_connection(conn: Connection, catalog: &Catalog) -> Self {
        VoteStore {
            conn: Arc::new(Mutex::new(conn)),
            known_ids: catalog.ids().into(),
        }
    }

    pub fn known_ids(&self) -> &[EntityId] {
        &self.known_ids
    }

    /// Create the table and a zero row for every known id. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        let mut conn = self.conn.lock();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS pokemon_votes (
                pokemon_id INTEGER PRIMARY KEY,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                total_votes INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT
            )",
            [],
        )?;

        let now = Utc::now().to_rfc3339();
        let tx = conn.transaction()?;
        let mut created = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO pokemon_votes (pokemon_id, wins, losses, total_votes, created_at)
                 VALUES (?1, 0, 0, 0, ?2)
                 ON CONFLICT (pokemon_id) DO NOTHING",
            )?;
            for id in self.known_ids.iter() {
                created += stmt.execute(params![id, now])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            known = self.known_ids.len(),
            created,
            "vote store initialized"
        );
        Ok(())
    }

    /// Counters for one id; zeroed when the row doesn't exist yet
    pub fn get(&self, id: EntityId) -> Result<VoteCounters> {
        if !self.known_ids.contains(&id) {
            return Err(ValidationError::out_of_range("id", id.into(), self.known_ids.len()).into());
        }

        let conn = self.conn.lock();
        let counters = conn
            .query_row(
                "SELECT pokemon_id, wins, losses, total_votes, updated_at
                 FROM pokemon_votes
                 WHERE pokemon_id = ?1",
                [id],
                row_to_counters,
            )
            .optional()?;

        Ok(counters.unwrap_or_else(|| VoteCounters::zeroed(id)))
    }

    /// One entry per known id, ascending. Missing rows come back zeroed.
    pub fn get_all(&self) -> Result<Vec<VoteCounters>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT pokemon_id, wins, losses, total_votes, updated_at
             FROM pokemon_votes
             ORDER BY pokemon_id",
        )?;

        let mut rows: HashMap<EntityId, VoteCounters> = stmt
            .query_map([], row_to_counters)?
            .map(|row| row.map(|c| (c.entity_id, c)))
            .collect::<std::result::Result<_, _>>()?;

        let mut ids = self.known_ids.to_vec();
        ids.sort_unstable();

        Ok(ids
            .into_iter()
            .map(|id| rows.remove(&id).unwrap_or_else(|| VoteCounters::zeroed(id)))
            .collect())
    }

    /// Winner gets `wins + 1`, loser gets `losses + 1`, both get
    /// `total_votes + 1`. Both upserts commit together or not at all.
    pub fn record_vote(&self, winner_id: EntityId, loser_id: EntityId) -> Result<()> {
        self.validate_pair(winner_id, loser_id)?;

        let now = Utc::now().to_rfc3339();
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO pokemon_votes
                (pokemon_id, wins, losses, total_votes, created_at, updated_at)
             VALUES (?1, 1, 0, 1, ?2, ?2)
             ON CONFLICT (pokemon_id) DO UPDATE SET
                wins = pokemon_votes.wins + 1,
                total_votes = pokemon_votes.total_votes + 1,
                updated_at = excluded.updated_at",
            params![winner_id, now],
        )?;

        tx.execute(
            "INSERT INTO pokemon_votes
                (pokemon_id, wins, losses, total_votes, created_at, updated_at)
             VALUES (?1, 0, 1, 1, ?2, ?2)
             ON CONFLICT (pokemon_id) DO UPDATE SET
                losses = pokemon_votes.losses + 1,
                total_votes = pokemon_votes.total_votes + 1,
                updated_at = excluded.updated_at",
            params![loser_id, now],
        )?;

        tx.commit()?;

        tracing::debug!(winner_id, loser_id, "vote recorded");
        Ok(())
    }

    /// Number of votes cast overall (each vote touches two rows)
    pub fn total_votes_cast(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let sum: i64 = conn.query_row(
            "SELECT COALESCE(SUM(total_votes), 0) FROM pokemon_votes",
            [],
            |row| row.get(0),
        )?;

        Ok(sum.max(0) as u64 / 2)
    }

    fn validate_pair(&self, winner_id: EntityId, loser_id: EntityId) -> Result<()> {
        let max = self.known_ids.len();

        if !self.known_ids.contains(&winner_id) {
            return Err(ValidationError::out_of_range("winnerId", winner_id.into(), max).into());
        }
        if !self.known_ids.contains(&loser_id) {
            return Err(ValidationError::out_of_range("loserId", loser_id.into(), max).into());
        }
        if winner_id == loser_id {
            return Err(ValidationError::same_entity(winner_id.into()).into());
        }

        Ok(())
    }
}

// Corrupt rows (negative counts, unparseable timestamps) are reported as
// conversion errors rather than patched up.
fn row_to_counters(row: &rusqlite::Row<'_>) -> rusqlite::Result<VoteCounters> {
    let updated_at = match row.get::<_, Option<String>>(4)? {
        Some(text) => Some(
            DateTime::parse_from_rfc3339(&text)
                .map_err(|e| FromSqlConversionFailure(4, Type::Text, Box::new(e)))?
                .with_timezone(&Utc),
        ),
        None => None,
    };

    Ok(VoteCounters {
        entity_id: row.get(0)?,
        wins: counter_column(row, 1)?,
        losses: counter_column(row, 2)?,
        total_votes: counter_column(row, 3)?,
        updated_at,
    })
}

fn counter_column(row: &rusqlite::Row<'_>, index: usize) -> rusqlite::Result<u64> {
    let value: i64 = row.get(index)?;
    u64::try_from(value).map_err(|e| FromSqlConversionFailure(index, Type::Integer, Box::new(e)))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Entity;
    use crate::error::VoteError;
    use std::thread;

    fn initialized_store() -> VoteStore {
        let store = VoteStore::open_in_memory(&Catalog::builtin()).unwrap();
        store.initialize().unwrap();
        store
    }

    fn counters_for(store: &VoteStore, id: EntityId) -> (u64, u64, u64) {
        let c = store.get(id).unwrap();
        (c.wins, c.losses, c.total_votes)
    }

    #[test]
    fn test_initialize_creates_zero_rows() {
        let store = initialized_store();
        let all = store.get_all().unwrap();

        assert_eq!(all.len(), 10);
        for (index, counters) in all.iter().enumerate() {
            assert_eq!(counters.entity_id, index as EntityId + 1);
            assert_eq!((counters.wins, counters.losses, counters.total_votes), (0, 0, 0));
            assert!(counters.updated_at.is_none());
        }
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let store = initialized_store();
        store.record_vote(1, 2).unwrap();

        // Re-initializing must not reset recorded votes
        store.initialize().unwrap();
        store.initialize().unwrap();

        assert_eq!(counters_for(&store, 1), (1, 0, 1));
        assert_eq!(counters_for(&store, 2), (0, 1, 1));
        assert_eq!(store.get_all().unwrap().len(), 10);
    }

    #[test]
    fn test_record_vote_touches_only_two_rows() {
        let store = initialized_store();
        let before = store.get_all().unwrap();

        store.record_vote(3, 7).unwrap();
        let after = store.get_all().unwrap();

        for (old, new) in before.iter().zip(after.iter()) {
            match new.entity_id {
                3 => {
                    assert_eq!(new.wins, old.wins + 1);
                    assert_eq!(new.losses, old.losses);
                    assert_eq!(new.total_votes, old.total_votes + 1);
                    assert!(new.updated_at.is_some());
                }
                7 => {
                    assert_eq!(new.wins, old.wins);
                    assert_eq!(new.losses, old.losses + 1);
                    assert_eq!(new.total_votes, old.total_votes + 1);
                }
                _ => assert_eq!(new, old),
            }
        }
        assert_eq!(store.total_votes_cast().unwrap(), 1);
    }

    #[test]
    fn test_record_vote_upserts_missing_rows() {
        // Table exists but holds no rows
        let store = VoteStore::open_in_memory(&Catalog::builtin()).unwrap();
        store.initialize().unwrap();
        store
            .conn
            .lock()
            .execute("DELETE FROM pokemon_votes", [])
            .unwrap();

        assert_eq!(counters_for(&store, 4), (0, 0, 0));

        store.record_vote(4, 5).unwrap();
        store.record_vote(4, 5).unwrap();

        assert_eq!(counters_for(&store, 4), (2, 0, 2));
        assert_eq!(counters_for(&store, 5), (0, 2, 2));

        // get_all still reports every catalog id
        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 10);
        assert_eq!(all[0], VoteCounters::zeroed(1));
    }

    #[test]
    fn test_record_vote_rejects_same_entity() {
        let store = initialized_store();
        let before = store.get_all().unwrap();

        let result = store.record_vote(6, 6);

        assert!(matches!(result, Err(VoteError::Validation(_))));
        assert_eq!(store.get_all().unwrap(), before);
    }

    #[test]
    fn test_record_vote_rejects_unknown_ids() {
        let store = initialized_store();

        for (winner, loser) in [(0, 1), (1, 11), (11, 12), (99, 0)] {
            let result = store.record_vote(winner, loser);
            assert!(
                matches!(result, Err(VoteError::Validation(_))),
                "({}, {}) should be rejected",
                winner,
                loser
            );
        }

        assert_eq!(store.total_votes_cast().unwrap(), 0);
        assert!(matches!(store.get(11), Err(VoteError::Validation(_))));
    }

    #[test]
    fn test_counters_stay_consistent() {
        let store = initialized_store();
        let votes = [(1, 2), (2, 3), (3, 1), (1, 3), (10, 9), (9, 10), (5, 1)];

        for (winner, loser) in votes {
            store.record_vote(winner, loser).unwrap();
        }

        let all = store.get_all().unwrap();
        assert!(all.iter().all(VoteCounters::is_consistent));

        let wins: u64 = all.iter().map(|c| c.wins).sum();
        let losses: u64 = all.iter().map(|c| c.losses).sum();
        assert_eq!(wins, votes.len() as u64);
        assert_eq!(losses, votes.len() as u64);
        assert_eq!(store.total_votes_cast().unwrap(), votes.len() as u64);
    }

    #[test]
    fn test_failed_vote_rolls_back_both_rows() {
        let store = initialized_store();
        store
            .conn
            .lock()
            .execute_batch(
                "CREATE TRIGGER reject_charizard_loss
                 BEFORE UPDATE OF losses ON pokemon_votes
                 WHEN NEW.pokemon_id = 2
                 BEGIN
                     SELECT RAISE(ABORT, 'losses locked');
                 END;",
            )
            .unwrap();

        let result = store.record_vote(1, 2);

        assert!(matches!(result, Err(VoteError::StorageUnavailable(_))));
        // The winner upsert ran first and must not survive the failed loser upsert
        assert_eq!(counters_for(&store, 1), (0, 0, 0));
        assert_eq!(counters_for(&store, 2), (0, 0, 0));
        assert!(store.get(1).unwrap().updated_at.is_none());
        assert_eq!(store.total_votes_cast().unwrap(), 0);

        // Other pairs still go through
        store.record_vote(1, 3).unwrap();
        assert_eq!(counters_for(&store, 1), (1, 0, 1));
    }

    #[test]
    fn test_corrupt_rows_are_reported() {
        let store = initialized_store();
        {
            let conn = store.conn.lock();
            conn.execute("UPDATE pokemon_votes SET wins = -1 WHERE pokemon_id = 3", [])
                .unwrap();
            conn.execute(
                "UPDATE pokemon_votes SET updated_at = 'not-a-date' WHERE pokemon_id = 4",
                [],
            )
            .unwrap();
        }

        assert!(matches!(store.get(3), Err(VoteError::StorageUnavailable(_))));
        assert!(matches!(store.get(4), Err(VoteError::StorageUnavailable(_))));
        assert!(matches!(store.get_all(), Err(VoteError::StorageUnavailable(_))));

        // Healthy rows still read fine
        assert_eq!(counters_for(&store, 5), (0, 0, 0));
    }

    #[test]
    fn test_concurrent_votes_are_not_lost() {
        let store = initialized_store();
        let threads = 8;
        let votes_per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for _ in 0..votes_per_thread {
                        // Everyone votes on entity 1, alternating sides
                        if t % 2 == 0 {
                            store.record_vote(1, 2).unwrap();
                        } else {
                            store.record_vote(3, 1).unwrap();
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let expected = (threads * votes_per_thread) as u64;
        let pikachu = store.get(1).unwrap();
        assert_eq!(pikachu.total_votes, expected);
        assert_eq!(pikachu.wins, expected / 2);
        assert_eq!(pikachu.losses, expected / 2);
        assert_eq!(store.total_votes_cast().unwrap(), expected);
    }

    #[test]
    fn test_file_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("votes.db");
        let catalog = Catalog::from_entities(vec![
            Entity::new(1, "X", "x.png", "Fire"),
            Entity::new(2, "Y", "y.png", "Water"),
        ])
        .unwrap();

        {
            let store = VoteStore::open(&db_path, &catalog).unwrap();
            store.initialize().unwrap();
            store.record_vote(2, 1).unwrap();
        }

        let reopened = VoteStore::open(&db_path, &catalog).unwrap();
        reopened.initialize().unwrap();

        assert_eq!(counters_for(&reopened, 2), (1, 0, 1));
        assert_eq!(counters_for(&reopened, 1), (0, 1, 1));
    }

    #[test]
    fn test_open_fails_for_unreachable_path() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("missing").join("votes.db");

        let result = VoteStore::open(&db_path, &Catalog::builtin());

        assert!(matches!(result, Err(VoteError::StorageUnavailable(_))));
    }
}
