use std::fmt;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// How the presentation layer should highlight a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
    /// Raw output forwarded from a remote process.
    Output,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Severity::Info => "INFO",
            Severity::Success => "OK",
            Severity::Error => "ERROR",
            Severity::Output => "OUT",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub timestamp: DateTime<Local>,
    pub severity: Severity,
    pub text: String,
}

pub type LogReceiver = UnboundedReceiver<LogLine>;

/// Append-only, thread-safe handle into the operation log.
///
/// Cloning is cheap; every clone appends to the same ordered stream, which is
/// drained by whoever holds the [`LogReceiver`].
#[derive(Clone)]
pub struct LogSink {
    tx: UnboundedSender<LogLine>,
}

impl LogSink {
    pub fn channel() -> (LogSink, LogReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (LogSink { tx }, rx)
    }

    pub fn info(&self, text: impl Into<String>) {
        self.append(Severity::Info, text.into());
    }

    pub fn success(&self, text: impl Into<String>) {
        self.append(Severity::Success, text.into());
    }

    pub fn error(&self, text: impl Into<String>) {
        self.append(Severity::Error, text.into());
    }

    pub fn output(&self, text: impl Into<String>) {
        self.append(Severity::Output, text.into());
    }

    pub fn append(&self, severity: Severity, text: String) {
        match severity {
            Severity::Error => tracing::warn!("{text}"),
            Severity::Output => tracing::trace!("{text}"),
            _ => tracing::info!("{text}"),
        }
        let line = LogLine {
            timestamp: Local::now(),
            severity,
            text,
        };
        // a closed receiver means the console is going away
        let _ = self.tx.send(line);
    }
}
