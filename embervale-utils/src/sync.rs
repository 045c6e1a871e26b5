//! Sync-primitive aliases.
//!
//! A thin re-export of `parking_lot` primitives under names that read as
//! intent ("this data is shared and synchronized") rather than
//! implementation ("this is a parking_lot mutex").

/// A mutex over data shared between the tick task and ingress tasks.
pub type SyncMutex<T> = parking_lot::Mutex<T>;

/// A reader/writer lock over data shared between the tick task and ingress
/// tasks, for data read far more often than it is written.
pub type SyncRwLock<T> = parking_lot::RwLock<T>;
