//! Rinkside Realtime — point-in-time snapshots and their distribution.
//!
//! Snapshots compose the authoritative aggregate with the ten most recent
//! events into a versioned client view. Broadcast is best-effort fan-out:
//! a failed delivery to one subscriber never aborts the rest and never
//! fails the write that triggered it.

pub mod broadcast;
pub mod registry;
pub mod snapshot;

pub use broadcast::BroadcastDispatcher;
pub use registry::{ChannelRegistry, Connection, ConnectionRegistry, OutboundMessage};
pub use snapshot::{GameSnapshot, SnapshotGenerator};
