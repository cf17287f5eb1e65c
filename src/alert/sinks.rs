use std::{
    io::{self, Write},
    sync::Mutex,
};

use anyhow::{anyhow, Context, Result};
use log::warn;

use super::manager::AlertRecord;
use crate::settings::AlertMethod;

/// Fire-and-forget delivery target for a decided alert.
pub trait AlertSink: Send + Sync {
    fn name(&self) -> &'static str;
    fn deliver(&self, alert: &AlertRecord) -> Result<()>;
}

/// Prints a bannered alert. Write errors (a closed stdout, for instance)
/// are returned to the caller instead of panicking.
pub struct ConsoleSink {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(writer)),
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::stdout()
    }
}

impl AlertSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn deliver(&self, alert: &AlertRecord) -> Result<()> {
        let banner = "=".repeat(50);
        let mut out = self
            .out
            .lock()
            .map_err(|_| anyhow!("console writer lock poisoned"))?;
        writeln!(out, "\n{banner}\n{}\n{banner}\n", alert.message)
            .context("failed to write alert to console")?;
        out.flush().context("failed to flush console")
    }
}

pub struct LogSink;

impl AlertSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn deliver(&self, alert: &AlertRecord) -> Result<()> {
        warn!(target: "crowdwatch::alert", "{}", alert.message);
        Ok(())
    }
}

pub fn sinks_for(methods: &[AlertMethod]) -> Vec<Box<dyn AlertSink>> {
    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::with_capacity(methods.len());
    for method in methods {
        match method {
            AlertMethod::Console => sinks.push(Box::new(ConsoleSink::stdout())),
            AlertMethod::Log => sinks.push(Box::new(LogSink)),
        }
    }
    sinks
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;

    /// Every write fails the way a closed pipe does.
    pub(crate) struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn record() -> AlertRecord {
        AlertRecord {
            timestamp: Utc::now(),
            region: "door".into(),
            count: 4,
            max_count: 2,
            message: "ALERT: Abnormal gathering detected in door. \
                      Current count: 4, Maximum normal: 2"
                .into(),
        }
    }

    #[test]
    fn console_prints_bannered_message() {
        let captured = Captured::default();
        let sink = ConsoleSink::with_writer(captured.clone());
        sink.deliver(&record()).unwrap();

        let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        let banner = "=".repeat(50);
        assert_eq!(
            text,
            format!("\n{banner}\n{}\n{banner}\n\n", record().message)
        );
    }

    #[test]
    fn console_write_failure_is_an_error() {
        let sink = ConsoleSink::with_writer(BrokenPipe);
        let err = sink.deliver(&record()).unwrap_err();
        assert!(format!("{err:#}").contains("stdout closed"));
    }

    #[test]
    fn methods_map_to_sinks_in_order() {
        let sinks = sinks_for(&[AlertMethod::Log, AlertMethod::Console]);
        let names: Vec<_> = sinks.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["log", "console"]);
    }
}
