pub mod dispatch;
pub mod live;
pub mod mqtt;

pub use dispatch::{BusMessage, Dispatcher};
pub use live::{LiveEvent, LiveFeed};
