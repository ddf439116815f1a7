// src/lib.rs
// Everything the StageFrost binary drives; the UI modules live beside main.rs
pub mod catalog;
pub mod config;
pub mod logging;
pub mod odbc_session;
pub mod outcome;
pub mod profile;
pub mod session;
pub mod sql;
pub mod stage_explorer;
pub mod upload;
pub mod warehouse;

#[cfg(test)]
mod testing;

pub use catalog::{CatalogLevel, CatalogSelection, Picker};
pub use outcome::{BatchReport, FailurePolicy, ItemOutcome};
pub use session::{AppContext, Connector, Session, SessionInfo};
pub use sql::StagePath;
pub use warehouse::{PutResult, Warehouse};
