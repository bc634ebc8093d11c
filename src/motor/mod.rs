pub mod models;
pub mod tracker;

pub use models::{FaultRecord, MotorChannel, MotorCommand, MotorSnapshot};
pub use tracker::{MotorError, MotorTracker};
