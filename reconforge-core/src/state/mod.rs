//! State management module

pub mod export;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod store;

pub use export::{export_session, ExportFormat, ExportPayload};
pub use migrations::run_migrations;
pub use models::{SessionRecord, SessionSummary, Turn, TurnKind};
pub use store::SessionStore;
