pub mod config;
pub mod database;
pub mod debounce;
pub mod deletion;
pub mod editor;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod payload;
pub mod question;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod transport;

pub use config::{AutosaveConfig, Settings};
pub use editor::QuestionEditor;
pub use engine::AutosaveEngine;
pub use error::{ErrorInfo, SaveError, SessionError};
pub use identifier::{ChildId, QuestionId, TempIdAllocator};
pub use session::AutosaveHandle;
pub use status::SaveState;
pub use transport::SaveTransport;
