// Pokemon Vote - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod pairing;
pub mod ranking;
pub mod store;
pub mod voting;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use catalog::{Catalog, Entity, EntityId};
pub use config::StoreConfig;
pub use error::{ValidationError, VoteError};
pub use pairing::{select_pair, select_random_pair};
pub use ranking::{rank, win_rate, RankedEntity};
pub use store::{VoteCounters, VoteStore};
pub use voting::{
    entities_with_stats, entity_with_stats, random_pair, ranked_results, submit_vote,
    EntityStats, RankedStats, VoteRequest,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
