pub mod app;
pub mod config;
pub mod error;
pub mod helper;
pub mod log_sink;
pub mod session;
pub mod ssh;
pub mod widgets;

pub use error::{Error, Result};
pub use log_sink::{LogLine, LogSink, Severity};
pub use session::{SessionManager, SessionState};
pub use ssh::password_session::PasswordConnector;
pub use ssh::ssh_session::{Connector, Target, Transport};
