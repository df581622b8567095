//! Scan history
//!
//! Every successful classification becomes a [`ClassificationRecord`]
//! appended to a [`HistoryStore`]. The default store is a JSON array on
//! disk, compatible with the `db.json` files written by earlier versions.

mod record;
mod store;

pub use record::{ClassificationRecord, NO_TEXT_RETURNED};
pub use store::{HistoryStore, JsonFileStore, MemoryStore};
