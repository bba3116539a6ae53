//! Lifecycle of the single connection to the target, and the operations
//! that are only meaningful while it is up.
//!
//! ```text
//! Disconnected --connect--> Connecting --ok--> Connected --disconnect--> Disconnected
//!                                 \--fail--> Disconnected
//! (any) --shutdown--> Closed
//! ```
//!
//! The connection lives in an `Option<Arc<dyn Transport>>` that only this
//! module replaces. Operations copy the `Arc` out under the lock and release
//! the lock before any remote I/O.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info};

use crate::config::app_config::{RemoteConfig, Service};
use crate::error::{Error, Result};
use crate::log_sink::LogSink;
use crate::ssh::discovery::{ScriptCandidate, ScriptDiscovery};
use crate::ssh::executor::{CommandExecutor, CommandInvocation, ExecutionResult};
use crate::ssh::ssh_session::{Connector, Target, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// Terminal: entered on shutdown.
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
            SessionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

struct Inner {
    state: SessionState,
    transport: Option<Arc<dyn Transport>>,
    /// Description of the current or pending target, for log lines.
    target: Option<String>,
    /// Bumped by every transition that invalidates an in-flight connect.
    generation: u64,
}

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Mutex<Inner>>,
    state_tx: Arc<watch::Sender<SessionState>>,
    connector: Arc<dyn Connector>,
    executor: CommandExecutor,
    sink: LogSink,
    settings: Arc<RemoteConfig>,
}

impl SessionManager {
    pub fn new(connector: Arc<dyn Connector>, sink: LogSink, settings: RemoteConfig) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: SessionState::Disconnected,
                transport: None,
                target: None,
                generation: 0,
            })),
            state_tx: Arc::new(state_tx),
            connector,
            executor: CommandExecutor::new(sink.clone()),
            sink,
            settings: Arc::new(settings),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Receives every state change, for rendering.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    fn transition(&self, inner: &mut Inner, next: SessionState) {
        debug!("session {} -> {}", inner.state, next);
        inner.state = next;
        self.state_tx.send_replace(next);
    }

    /// Connects to `target`, closing any existing connection first.
    pub async fn connect(&self, target: Target) -> Result<()> {
        let label = target.to_string();
        let (previous, generation) = {
            let mut inner = self.inner.lock().await;
            if inner.state == SessionState::Closed {
                drop(inner);
                return Err(self.report("connect", Error::SessionClosed));
            }
            inner.generation += 1;
            let previous = inner.transport.take();
            inner.target = Some(label.clone());
            self.transition(&mut inner, SessionState::Connecting);
            (previous, inner.generation)
        };

        if let Some(previous) = previous {
            self.sink.info("Closing the previous connection");
            previous.close().await;
        }

        self.sink.info(format!("Connecting to {label}..."));
        let timeout = self.settings.connect_timeout();
        let result = match tokio::time::timeout(timeout, self.connector.connect(&target)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Connect {
                target: label.clone(),
                reason: format!("timed out after {}s", timeout.as_secs()),
            }),
        };

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            drop(inner);
            if let Ok(transport) = result {
                transport.close().await;
            }
            // superseded on request, not a failure
            self.sink
                .info(format!("Abandoned the connection attempt to {label}"));
            return Err(Error::Superseded(label));
        }

        match result {
            Ok(transport) => {
                inner.transport = Some(transport);
                self.transition(&mut inner, SessionState::Connected);
                drop(inner);
                info!("connected to {label}");
                self.sink.success(format!("Connected to {label}"));
                Ok(())
            }
            Err(e) => {
                inner.target = None;
                self.transition(&mut inner, SessionState::Disconnected);
                drop(inner);
                Err(self.report("connect", e))
            }
        }
    }

    /// Starts `service` in a detached session. Success only means the
    /// launcher returned 0, not that the service itself is healthy.
    pub async fn run_service(&self, service: &Service) -> Result<ExecutionResult> {
        let op = "run-service";
        let transport = self.connected_transport(op).await?;
        let command = service.launch_command();
        let invocation = CommandInvocation::captured(command.clone());

        match self.executor.execute(Some(transport.as_ref()), &invocation).await {
            Ok(result) if result.success() => {
                self.sink
                    .success(format!("Started {} with `{}`", service.name, command));
                Ok(result)
            }
            Ok(result) => Err(self.report(op, result.into_error(&command))),
            Err(e) => Err(self.report(op, e)),
        }
    }

    /// Lists runnable executables under the configured workspace root.
    pub async fn discover_scripts(&self) -> Result<Vec<ScriptCandidate>> {
        let op = "discover-scripts";
        let transport = self.connected_transport(op).await?;
        let discovery = ScriptDiscovery::new(&self.executor, &self.settings.workspace_root);

        match discovery.discover(Some(transport.as_ref())).await {
            Ok(candidates) => {
                self.sink.info(format!(
                    "Found {} script(s) under {}",
                    candidates.len(),
                    self.settings.workspace_root
                ));
                Ok(candidates)
            }
            Err(e) => Err(self.report(op, e)),
        }
    }

    /// Runs `candidate` in the foreground, streaming its output to the log.
    pub async fn run_script(&self, candidate: &ScriptCandidate) -> Result<ExecutionResult> {
        let op = "run-script";
        let transport = self.connected_transport(op).await?;
        let command = candidate.run_command(&self.settings.script_runner);
        self.sink.info(format!("Running `{command}`"));

        // the executor reports the outcome of a streamed run itself
        let invocation = CommandInvocation::streamed(command).for_operation(op);
        self.executor
            .execute(Some(transport.as_ref()), &invocation)
            .await
            .map_err(|e| self.report(op, e))
    }

    pub async fn disconnect(&self) -> Result<()> {
        let (transport, target) = {
            let mut inner = self.inner.lock().await;
            let state = inner.state;
            match state {
                SessionState::Connected | SessionState::Connecting => {}
                SessionState::Disconnected => {
                    self.sink.info("Already disconnected");
                    return Ok(());
                }
                SessionState::Closed => {
                    drop(inner);
                    return Err(self.report("disconnect", Error::SessionClosed));
                }
            }
            inner.generation += 1;
            self.transition(&mut inner, SessionState::Disconnected);
            (inner.transport.take(), inner.target.take())
        };

        if let Some(transport) = transport {
            transport.close().await;
        }
        let target = target.unwrap_or_else(|| "target".to_string());
        self.sink.info(format!("Disconnected from {target}"));
        Ok(())
    }

    /// Final transition on exit; releases the connection if there is one.
    pub async fn shutdown(&self) {
        let transport = {
            let mut inner = self.inner.lock().await;
            if inner.state == SessionState::Closed {
                return;
            }
            inner.generation += 1;
            inner.target = None;
            self.transition(&mut inner, SessionState::Closed);
            inner.transport.take()
        };
        if let Some(transport) = transport {
            transport.close().await;
        }
        self.sink.info("Session closed");
    }

    async fn connected_transport(&self, op: &str) -> Result<Arc<dyn Transport>> {
        let transport = {
            let inner = self.inner.lock().await;
            match inner.state {
                SessionState::Connected => inner.transport.clone(),
                _ => None,
            }
        };
        transport.ok_or_else(|| self.report(op, Error::NotConnected))
    }

    /// Writes the single error line for a failed operation and hands the error back.
    fn report(&self, op: &str, err: Error) -> Error {
        let detail = match &err {
            Error::RemoteExecution { output, .. } | Error::Discovery { output, .. } => {
                output.trim()
            }
            _ => "",
        };
        if detail.is_empty() {
            self.sink.error(format!("{op} failed: {err}"));
        } else {
            self.sink.error(format!("{op} failed: {err}: {detail}"));
        }
        err
    }
}
