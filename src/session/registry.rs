//! Registry of active matches
//!
//! The participant index and the match records live in one struct behind one
//! lock, so a reader sees either a whole match or none of it.

use crate::error::GameError;
use crate::types::{MatchId, ParticipantId};
use crate::utils::{current_timestamp, generate_match_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// A pairing of two participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    /// Earlier arrival in the queue
    pub first: ParticipantId,
    pub second: ParticipantId,
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// The participant opposite `id`, if `id` belongs to this match
    pub fn peer_of(&self, id: ParticipantId) -> Option<ParticipantId> {
        if id == self.first {
            Some(self.second)
        } else if id == self.second {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Statistics about registry operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryStats {
    pub matches_created: u64,
    pub matches_ended: u64,
    pub active_matches: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    by_participant: HashMap<ParticipantId, MatchId>,
    matches: HashMap<MatchId, MatchRecord>,
    stats: RegistryStats,
}

impl RegistryState {
    fn drop_record(&mut self, match_id: MatchId) {
        if self.matches.remove(&match_id).is_some() {
            self.stats.matches_ended += 1;
            self.stats.active_matches = self.matches.len();
        }
    }
}

/// Owner of all match records and the participant→match index
#[derive(Debug, Default)]
pub struct SessionRegistry {
    state: RwLock<RegistryState>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new match between `first` and `second`
    pub fn create_match(
        &self,
        first: ParticipantId,
        second: ParticipantId,
    ) -> Result<MatchId, GameError> {
        if first == second {
            return Err(GameError::AlreadyInMatch {
                participant_id: first,
            });
        }

        let mut state = self
            .state
            .write()
            .map_err(|_| GameError::lock_poisoned("registry"))?;

        for participant_id in [first, second] {
            if state.by_participant.contains_key(&participant_id) {
                return Err(GameError::AlreadyInMatch { participant_id });
            }
        }

        let record = MatchRecord {
            id: generate_match_id(),
            first,
            second,
            created_at: current_timestamp(),
        };
        let match_id = record.id;

        state.by_participant.insert(first, match_id);
        state.by_participant.insert(second, match_id);
        state.matches.insert(match_id, record);
        state.stats.matches_created += 1;
        state.stats.active_matches = state.matches.len();

        info!("Created match {} ({} vs {})", match_id, first, second);
        Ok(match_id)
    }

    pub fn match_of(&self, id: ParticipantId) -> Option<MatchId> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.by_participant.get(&id).copied())
    }

    /// The peer in `id`'s match, while the peer is still indexed to it
    pub fn other_participant(&self, id: ParticipantId) -> Option<ParticipantId> {
        let state = self.state.read().ok()?;
        let match_id = state.by_participant.get(&id)?;
        let peer = state.matches.get(match_id)?.peer_of(id)?;
        let peer_still_in = state.by_participant.get(&peer) == Some(match_id);
        peer_still_in.then_some(peer)
    }

    pub fn get_match(&self, match_id: MatchId) -> Option<MatchRecord> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.matches.get(&match_id).cloned())
    }

    /// Tear down the whole match containing `id`
    pub fn end_match(&self, id: ParticipantId) -> Result<Option<MatchId>, GameError> {
        Ok(self.end_match_with_peer(id)?.map(|(match_id, _)| match_id))
    }

    /// Like [`end_match`](Self::end_match), also returning the peer that was
    /// still indexed to the match when it was torn down
    pub fn end_match_with_peer(
        &self,
        id: ParticipantId,
    ) -> Result<Option<(MatchId, Option<ParticipantId>)>, GameError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| GameError::lock_poisoned("registry"))?;

        let Some(match_id) = state.by_participant.remove(&id) else {
            return Ok(None);
        };

        let peer = state
            .matches
            .get(&match_id)
            .and_then(|m| m.peer_of(id))
            .filter(|peer| state.by_participant.get(peer) == Some(&match_id));
        if let Some(peer) = peer {
            state.by_participant.remove(&peer);
        }
        state.drop_record(match_id);

        info!("Ended match {} (initiated by {})", match_id, id);
        Ok(Some((match_id, peer)))
    }

    /// Clear only `id`'s side of its match.
    ///
    /// The peer stays indexed until it leaves or disconnects; the record is
    /// dropped once nobody is left in it.
    pub fn leave_match(&self, id: ParticipantId) -> Result<Option<MatchId>, GameError> {
        Ok(self.leave_match_with_status(id)?.map(|(match_id, _)| match_id))
    }

    /// Like [`leave_match`](Self::leave_match), also returning whether this
    /// leave dropped the record
    pub fn leave_match_with_status(
        &self,
        id: ParticipantId,
    ) -> Result<Option<(MatchId, bool)>, GameError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| GameError::lock_poisoned("registry"))?;

        let Some(match_id) = state.by_participant.remove(&id) else {
            return Ok(None);
        };

        let peer_still_in = state
            .matches
            .get(&match_id)
            .and_then(|m| m.peer_of(id))
            .is_some_and(|peer| state.by_participant.get(&peer) == Some(&match_id));

        if peer_still_in {
            debug!("Participant {} left match {}; peer remains", id, match_id);
        } else {
            state.drop_record(match_id);
            info!("Match {} closed after both participants left", match_id);
        }
        Ok(Some((match_id, !peer_still_in)))
    }

    pub fn active_matches(&self) -> usize {
        self.state
            .read()
            .map(|state| state.matches.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> RegistryStats {
        self.state
            .read()
            .map(|state| state.stats.clone())
            .unwrap_or_default()
    }

    pub fn is_poisoned(&self) -> bool {
        self.state.is_poisoned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::generate_participant_id;

    #[test]
    fn test_create_match_indexes_both_sides() {
        let registry = SessionRegistry::new();
        let (a, b) = (generate_participant_id(), generate_participant_id());

        let match_id = registry.create_match(a, b).unwrap();

        assert_eq!(registry.match_of(a), Some(match_id));
        assert_eq!(registry.match_of(a), registry.match_of(b));
        assert_eq!(registry.other_participant(a), Some(b));
        assert_eq!(registry.other_participant(b), Some(a));

        let record = registry.get_match(match_id).unwrap();
        assert_eq!((record.first, record.second), (a, b));
    }

    #[test]
    fn test_already_in_match() {
        let registry = SessionRegistry::new();
        let [a, b, c] = [(); 3].map(|_| generate_participant_id());

        registry.create_match(a, b).unwrap();
        assert_eq!(
            registry.create_match(c, b),
            Err(GameError::AlreadyInMatch { participant_id: b })
        );
        assert_eq!(
            registry.create_match(c, c),
            Err(GameError::AlreadyInMatch { participant_id: c })
        );
        assert_eq!(registry.match_of(c), None);
        assert_eq!(registry.active_matches(), 1);
    }

    #[test]
    fn test_end_match_removes_both_sides() {
        let registry = SessionRegistry::new();
        let (a, b) = (generate_participant_id(), generate_participant_id());
        let match_id = registry.create_match(a, b).unwrap();

        assert_eq!(registry.end_match(b).unwrap(), Some(match_id));
        assert_eq!(registry.match_of(a), None);
        assert_eq!(registry.match_of(b), None);
        assert_eq!(registry.get_match(match_id), None);
        assert_eq!(registry.end_match(a).unwrap(), None);

        let stats = registry.stats();
        assert_eq!(stats.matches_created, 1);
        assert_eq!(stats.matches_ended, 1);
        assert_eq!(stats.active_matches, 0);
    }

    #[test]
    fn test_leave_match_is_one_sided() {
        let registry = SessionRegistry::new();
        let (a, b) = (generate_participant_id(), generate_participant_id());
        let match_id = registry.create_match(a, b).unwrap();

        assert_eq!(registry.leave_match(a).unwrap(), Some(match_id));
        assert_eq!(registry.match_of(a), None);
        assert_eq!(registry.match_of(b), Some(match_id));
        // The peer has nobody left to relay to
        assert_eq!(registry.other_participant(b), None);
        assert_eq!(registry.active_matches(), 1);

        assert_eq!(registry.leave_match(b).unwrap(), Some(match_id));
        assert_eq!(registry.active_matches(), 0);
        assert_eq!(registry.stats().matches_ended, 1);
    }

    #[test]
    fn test_leave_reports_which_side_closed_the_record() {
        let registry = SessionRegistry::new();
        let (a, b) = (generate_participant_id(), generate_participant_id());
        let match_id = registry.create_match(a, b).unwrap();

        assert_eq!(
            registry.leave_match_with_status(b).unwrap(),
            Some((match_id, false))
        );
        assert_eq!(
            registry.leave_match_with_status(a).unwrap(),
            Some((match_id, true))
        );
        assert_eq!(registry.leave_match_with_status(a).unwrap(), None);
    }

    #[test]
    fn test_left_participant_can_be_matched_again() {
        let registry = SessionRegistry::new();
        let [a, b, c] = [(); 3].map(|_| generate_participant_id());
        let first = registry.create_match(a, b).unwrap();
        registry.leave_match(a).unwrap();

        let second = registry.create_match(a, c).unwrap();
        assert_ne!(first, second);
        assert_eq!(registry.other_participant(a), Some(c));
        // b's stale match still resolves to itself but has no live peer
        assert_eq!(registry.match_of(b), Some(first));
        assert_eq!(registry.other_participant(b), None);
    }
}
