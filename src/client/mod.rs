//! Chat client: view state plus the HTTP calls it drives.
pub mod api;
pub mod session;
pub mod storage;

pub use api::{ChatApi, ClientError, HttpChatApi};
pub use session::{ChatEntry, ChatSession, EntryId, EntryRole, Status};
pub use storage::{FileSessionStorage, MemorySessionStorage, SessionStorage};
