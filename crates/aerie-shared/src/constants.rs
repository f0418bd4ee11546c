/// Application name
pub const APP_NAME: &str = "Aerie";

/// Length of one attachment chunk: 500 KiB of base64 text
pub const CHUNK_SIZE: usize = 500 * 1024;

/// Maximum attachment size in bytes, before base64 encoding (50 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 50 * 1024 * 1024;

/// Maximum number of write/delete operations per atomic store batch
pub const MAX_BATCH_OPS: usize = 500;

/// Default HTTP port for the completion relay server
pub const DEFAULT_RELAY_PORT: u16 = 3001;

/// Persistent channel messages
pub const COLLECTION_MESSAGES: &str = "messages";

/// Self-destructing channel messages
pub const COLLECTION_SECURE_MESSAGES: &str = "secureMessages";

/// Attachment chunks, shared by both channels
pub const COLLECTION_FILE_CHUNKS: &str = "fileChunks";

/// Presence markers, one per connected identity
pub const COLLECTION_ONLINE_USERS: &str = "onlineUsers";

/// User accounts and profiles
pub const COLLECTION_USERS: &str = "users";

/// Project board entries
pub const COLLECTION_PROJECTS: &str = "projects";
