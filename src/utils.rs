//! Utility functions for the relay service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique participant ID
pub fn generate_participant_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a new unique match ID
pub fn generate_match_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Pick which side of a fresh match moves first.
///
/// Returns `true` when the earlier arrival goes first; uniform 50/50.
pub fn first_arrival_moves_first() -> bool {
    rand::random::<bool>()
}
