// Orchestration: per-session state machine sequencing search, email
// resolution and outreach, plus the HTTP handlers and result export.
// Agents never touch session state; only the orchestrator mutates it.

pub mod error;
pub mod export;
pub mod handlers;
pub mod pipeline;
pub mod session;

pub use error::RunError;
pub use export::{ExportFormat, RunReport};
pub use pipeline::{BulkSend, Orchestrator, SearchParams};
pub use session::{Session, SessionStore};
