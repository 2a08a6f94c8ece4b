//! Participant-side game model
//!
//! Pure state for a connected player; rendering and networking are left to
//! whatever front end drives it.

pub mod participant;

pub use participant::{MatchOutcome, ParticipantMatch, ParticipantUpdate};
