use crate::models::chat::ConversationId;
use std::path::PathBuf;
use std::sync::Mutex;

/// Where the client remembers the active conversation between runs.
pub trait SessionStorage {
    fn load(&self) -> Option<ConversationId>;
    fn save(&self, id: ConversationId) -> std::io::Result<()>;
    fn clear(&self) -> std::io::Result<()>;
}

/// Keeps the conversation id in a small text file.
#[derive(Debug, Clone)]
pub struct FileSessionStorage {
    path: PathBuf,
}

impl FileSessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SessionStorage for FileSessionStorage {
    fn load(&self) -> Option<ConversationId> {
        let raw = std::fs::read_to_string(&self.path).ok()?;
        match raw.trim().parse() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("Ignoring unreadable session file {}", self.path.display());
                None
            }
        }
    }

    fn save(&self, id: ConversationId) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, id.to_string())
    }

    fn clear(&self) -> std::io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    id: Mutex<Option<ConversationId>>,
}

impl MemorySessionStorage {
    pub fn with_id(id: ConversationId) -> Self {
        Self {
            id: Mutex::new(Some(id)),
        }
    }
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Option<ConversationId> {
        *self.id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save(&self, id: ConversationId) -> std::io::Result<()> {
        *self.id.lock().unwrap_or_else(|e| e.into_inner()) = Some(id);
        Ok(())
    }

    fn clear(&self) -> std::io::Result<()> {
        *self.id.lock().unwrap_or_else(|e| e.into_inner()) = None;
        Ok(())
    }
}
