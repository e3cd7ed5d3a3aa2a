pub mod codec;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod storage;

pub use config::{ConfigManager, TxlabConfig};
pub use error::{ErrorCategory, ToolboxError};
pub use session::SessionState;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
