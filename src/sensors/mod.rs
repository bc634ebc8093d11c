pub mod memory;
pub mod models;
pub mod store;

pub use store::{EfficiencySnapshot, HistoryQuery, ReadingPage, TelemetryStore};
