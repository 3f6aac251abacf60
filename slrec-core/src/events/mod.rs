pub mod channels;
pub mod log;

pub use channels::{DEFAULT_CHANNEL_BUFFER, LedgerEventReceiver, LedgerEventSender};
pub use log::{EventLog, InProcessEventLog, PublishError};
