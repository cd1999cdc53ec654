pub mod store;
pub mod sync;

pub use store::{HistoryEntry, HistoryStore, RestHistoryStore};
pub use sync::{HistorySynchronizer, MAX_CACHED_ENTRIES};
