pub mod manager;
pub mod sinks;

pub use manager::{AlertKeyState, AlertManager, AlertRecord, GLOBAL_CROWD_THRESHOLD, TOTAL_KEY};
pub use sinks::{AlertSink, ConsoleSink, LogSink};
