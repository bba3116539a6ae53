use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of the remote session and the operations run over it.
///
/// Every variant is reported to the log sink by the session manager at the
/// operation boundary; none of them terminates the process.
#[derive(Debug, Error)]
pub enum Error {
    /// Dial, authentication or handshake timeout.
    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("not connected to the target")]
    NotConnected,

    /// A channel could not be opened, or the command could not be started on it.
    #[error("remote channel error: {0}")]
    Channel(String),

    #[error("`{command}` {}", describe_status(.status))]
    RemoteExecution {
        command: String,
        status: Option<u32>,
        output: String,
    },

    #[error("script listing {}", describe_status(.status))]
    Discovery { status: Option<u32>, output: String },

    /// The session was shut down; no further transitions are possible.
    #[error("session is closed")]
    SessionClosed,

    /// A connection attempt finished after a newer connect, disconnect or shutdown.
    #[error("connection attempt to {0} was superseded")]
    Superseded(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

fn describe_status(status: &Option<u32>) -> String {
    match status {
        Some(code) => format!("exited with status {code}"),
        None => "ended without an exit status".to_string(),
    }
}

impl From<russh::Error> for Error {
    fn from(e: russh::Error) -> Self {
        Error::Channel(e.to_string())
    }
}
