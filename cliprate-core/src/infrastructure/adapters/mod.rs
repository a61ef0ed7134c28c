pub mod local_json;
pub mod worksheet;

pub use local_json::LocalJsonStore;
pub use worksheet::WorksheetStore;
