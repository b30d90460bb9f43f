//! Per-user persisted state: session, favorites, library and history

pub mod favorites;
pub mod history;
pub mod session;
pub mod storage;

pub use favorites::{Collection, FavoriteEntry, FavoritesState, FavoritesStore};
pub use history::{HistoryEntry, HistoryStore};
pub use session::{Session, SessionManager};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
