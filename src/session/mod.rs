//! Session management for the relay service
//!
//! This module pairs waiting connections, tracks active matches, and relays
//! moves between the two participants of each match.

pub mod queue;
pub mod registry;
pub mod relay;
pub mod server;

// Re-export commonly used types
pub use queue::MatchmakingQueue;
pub use registry::{MatchRecord, RegistryStats, SessionRegistry};
pub use relay::{ChannelOutbox, Outbox, RelayHub};
pub use server::{SessionServer, SessionServerStats};
