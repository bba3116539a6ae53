use tracing::debug;

use super::ssh_session::{ChannelEvent, CommandChannel, Transport};
use crate::error::{Error, Result};
use crate::log_sink::LogSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Run to completion and buffer the combined output.
    Captured,
    /// Forward every output line to the log sink as it arrives.
    Streamed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub command: String,
    pub mode: ExecMode,
    /// Named in the failure line of a streamed run, e.g. `run-script`.
    pub operation: Option<&'static str>,
}

impl CommandInvocation {
    pub fn captured(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            mode: ExecMode::Captured,
            operation: None,
        }
    }

    pub fn streamed(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            mode: ExecMode::Streamed,
            operation: None,
        }
    }

    pub fn for_operation(mut self, operation: &'static str) -> Self {
        self.operation = Some(operation);
        self
    }

    /// The line logged when a streamed run does not succeed.
    fn failure_line(&self, err: &Error) -> String {
        match self.operation {
            Some(op) => format!("{op} failed: {err}"),
            None => err.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `None` when the channel ended without the remote side reporting a status.
    pub exit_status: Option<u32>,
    /// Combined stdout/stderr. Always empty for streamed runs.
    pub output: String,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    pub fn into_error(self, command: &str) -> Error {
        Error::RemoteExecution {
            command: command.to_string(),
            status: self.exit_status,
            output: self.output,
        }
    }
}

/// Runs single commands over fresh channels.
///
/// Concurrent calls are not serialized; each one gets its own channel.
#[derive(Clone)]
pub struct CommandExecutor {
    sink: LogSink,
}

impl CommandExecutor {
    pub fn new(sink: LogSink) -> Self {
        Self { sink }
    }

    /// Runs `invocation` on a channel opened from `transport`.
    ///
    /// A missing transport fails with [`Error::NotConnected`] before anything
    /// is opened. A non-zero exit is not an error here: it is reported in the
    /// returned [`ExecutionResult`] so the caller decides what success means.
    pub async fn execute(
        &self,
        transport: Option<&dyn Transport>,
        invocation: &CommandInvocation,
    ) -> Result<ExecutionResult> {
        let transport = transport.ok_or(Error::NotConnected)?;
        let mut channel = transport.open_channel().await?;
        debug!("exec ({:?}): {}", invocation.mode, invocation.command);

        let result = match channel.exec(&invocation.command).await {
            Ok(()) => Ok(self.drain(channel.as_mut(), invocation).await),
            Err(e) => Err(e),
        };
        channel.close().await;
        result
    }

    async fn drain(
        &self,
        channel: &mut dyn CommandChannel,
        invocation: &CommandInvocation,
    ) -> ExecutionResult {
        let mut exit_status = None;
        let mut captured = Vec::new();
        let mut lines = LineBuffer::default();

        while let Some(event) = channel.next_event().await {
            match event {
                ChannelEvent::Output(data) => match invocation.mode {
                    ExecMode::Captured => captured.extend_from_slice(&data),
                    ExecMode::Streamed => {
                        for line in lines.push(&data) {
                            self.sink.output(line);
                        }
                    }
                },
                ChannelEvent::Exit(status) => exit_status = Some(status),
            }
        }

        let result = ExecutionResult {
            exit_status,
            output: String::from_utf8_lossy(&captured).into_owned(),
        };

        if invocation.mode == ExecMode::Streamed {
            if let Some(rest) = lines.finish() {
                self.sink.output(rest);
            }
            if result.success() {
                self.sink
                    .success(format!("`{}` finished successfully", invocation.command));
            } else {
                let err = result.clone().into_error(&invocation.command);
                self.sink.error(invocation.failure_line(&err));
            }
        }
        result
    }
}

/// Splits a byte stream into text lines, holding back a trailing partial line.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, data: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(data);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&raw[..raw.len() - 1]));
        }
        lines
    }

    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.pending);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
