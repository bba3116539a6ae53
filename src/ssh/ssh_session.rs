use std::fmt;
use std::sync::Arc;

use zeroize::Zeroizing;

use crate::error::Result;

/// The single remote computer the console talks to.
#[derive(Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: Zeroizing<String>,
}

impl Target {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: username.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

// never print the password
impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.username, self.host, self.port)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Something that happened on a command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Bytes written by the remote process to stdout or stderr.
    Output(Vec<u8>),
    /// The remote process reported its exit status.
    Exit(u32),
}

/// One command-execution stream, scoped to a single command.
#[async_trait::async_trait]
pub trait CommandChannel: Send {
    async fn exec(&mut self, command: &str) -> Result<()>;

    /// Next event from the remote side, `None` once the channel has ended.
    async fn next_event(&mut self) -> Option<ChannelEvent>;

    async fn close(&mut self);
}

/// An authenticated connection able to hand out fresh channels.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn open_channel(&self) -> Result<Box<dyn CommandChannel>>;

    /// Tear the connection down. Calling this more than once is a no-op.
    async fn close(&self);
}

/// Dials and authenticates against a [`Target`].
#[async_trait::async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Transport>>;
}
