use std::time::Duration;

use russh::{client, client::Msg, Channel, ChannelMsg};
use tracing::debug;

use super::ssh_session::{ChannelEvent, CommandChannel};
use crate::error::Result;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Client settings shared by every connection to the target.
pub fn default_ssh_config() -> client::Config {
    client::Config {
        // no inactivity timeout: streamed scripts may stay silent for a long time
        keepalive_interval: Some(KEEPALIVE_INTERVAL),
        ..<_>::default()
    }
}

/// A russh session channel used for exactly one command.
pub struct SshChannel {
    channel: Channel<Msg>,
    closed: bool,
}

impl SshChannel {
    pub fn new(channel: Channel<Msg>) -> Self {
        Self {
            channel,
            closed: false,
        }
    }
}

#[async_trait::async_trait]
impl CommandChannel for SshChannel {
    async fn exec(&mut self, command: &str) -> Result<()> {
        // no PTY: output is consumed by the console, not by a terminal
        self.channel.exec(true, command).await?;
        Ok(())
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            match self.channel.wait().await? {
                ChannelMsg::Data { ref data } => {
                    return Some(ChannelEvent::Output(data.to_vec()));
                }
                // stderr is merged into the same stream
                ChannelMsg::ExtendedData { ref data, .. } => {
                    return Some(ChannelEvent::Output(data.to_vec()));
                }
                // not the end of the stream: callers keep polling until None
                ChannelMsg::ExitStatus { exit_status } => {
                    return Some(ChannelEvent::Exit(exit_status));
                }
                ChannelMsg::ExitSignal { signal_name, .. } => {
                    debug!("remote process killed by signal {:?}", signal_name);
                }
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.channel.close().await {
            // the peer may already have closed its side
            debug!("channel close: {e}");
        }
    }
}
