//! 记忆层：对话消息、Memory Store（SQLite / 内存）、有界历史缓冲

pub mod conversation;
pub mod history;
pub mod sqlite;
pub mod store;

pub use conversation::{Message, Role, StoredMessage};
pub use history::BoundedHistory;
pub use sqlite::SqliteMemoryStore;
pub use store::{InMemoryStore, MemoryStore};
