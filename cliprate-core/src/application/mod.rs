// --- USE CASES / ORCHESTRATION ---

pub mod export;
pub mod gateway;
pub mod session;

pub use export::{export_all, ExportSummary};
pub use gateway::PersistenceGateway;
pub use session::SurveySession;
