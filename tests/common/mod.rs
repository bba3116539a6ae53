#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use auv_console_lib::config::app_config::RemoteConfig;
use auv_console_lib::log_sink::LogReceiver;
use auv_console_lib::ssh::ssh_session::{ChannelEvent, CommandChannel, Connector, Target, Transport};
use auv_console_lib::{Error, LogLine, LogSink, Result, SessionManager};

/// How the fake target answers a command.
pub enum Reply {
    Events(Vec<ChannelEvent>),
    /// The exec request itself is refused.
    Reject,
}

pub type Responder = dyn Fn(&str) -> Reply + Send + Sync;

pub fn exits(status: u32, output: &str) -> Reply {
    let mut events = Vec::new();
    if !output.is_empty() {
        events.push(ChannelEvent::Output(output.as_bytes().to_vec()));
    }
    events.push(ChannelEvent::Exit(status));
    Reply::Events(events)
}

/// Ordered record of everything the fake transport layer saw.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<String>>,
}

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn position(&self, entry: &str) -> Option<usize> {
        self.entries().iter().position(|e| e == entry)
    }
}

pub struct MockChannel {
    journal: Arc<Journal>,
    responder: Arc<Responder>,
    events: VecDeque<ChannelEvent>,
}

#[async_trait]
impl CommandChannel for MockChannel {
    async fn exec(&mut self, command: &str) -> Result<()> {
        self.journal.push(format!("exec {command}"));
        match (self.responder)(command) {
            Reply::Events(events) => {
                self.events = events.into();
                Ok(())
            }
            Reply::Reject => Err(Error::Channel("exec request rejected".into())),
        }
    }

    async fn next_event(&mut self) -> Option<ChannelEvent> {
        self.events.pop_front()
    }

    async fn close(&mut self) {
        self.journal.push("channel-close");
    }
}

pub struct MockTransport {
    pub host: String,
    journal: Arc<Journal>,
    responder: Arc<Responder>,
    refuse_channels: bool,
    closed: AtomicBool,
    pub close_count: AtomicUsize,
}

impl MockTransport {
    pub fn new(host: &str, journal: Arc<Journal>, responder: Arc<Responder>) -> Self {
        Self {
            host: host.to_string(),
            journal,
            responder,
            refuse_channels: false,
            closed: AtomicBool::new(false),
            close_count: AtomicUsize::new(0),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open_channel(&self) -> Result<Box<dyn CommandChannel>> {
        self.journal.push(format!("open {}", self.host));
        if self.refuse_channels {
            return Err(Error::Channel("administratively prohibited".into()));
        }
        Ok(Box::new(MockChannel {
            journal: self.journal.clone(),
            responder: self.responder.clone(),
            events: VecDeque::new(),
        }))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.close_count.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("close {}", self.host));
    }
}

pub struct MockConnector {
    pub journal: Arc<Journal>,
    responder: Arc<Responder>,
    failing_hosts: Vec<String>,
    slow_hosts: HashMap<String, Duration>,
    refuse_channels: bool,
    pub transports: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockConnector {
    pub fn new(responder: impl Fn(&str) -> Reply + Send + Sync + 'static) -> Self {
        Self {
            journal: Arc::new(Journal::default()),
            responder: Arc::new(responder),
            failing_hosts: Vec::new(),
            slow_hosts: HashMap::new(),
            refuse_channels: false,
            transports: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(mut self, host: &str) -> Self {
        self.failing_hosts.push(host.to_string());
        self
    }

    pub fn slow(mut self, host: &str, delay: Duration) -> Self {
        self.slow_hosts.insert(host.to_string(), delay);
        self
    }

    pub fn refusing_channels(mut self) -> Self {
        self.refuse_channels = true;
        self
    }

    pub fn transport(&self, index: usize) -> Arc<MockTransport> {
        self.transports.lock().unwrap()[index].clone()
    }

    pub fn live_transports(&self) -> usize {
        self.transports
            .lock()
            .unwrap()
            .iter()
            .filter(|t| !t.is_closed())
            .count()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Transport>> {
        self.journal.push(format!("connect-start {}", target.host));
        if let Some(delay) = self.slow_hosts.get(&target.host) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_hosts.contains(&target.host) {
            self.journal.push(format!("connect-failed {}", target.host));
            return Err(Error::Connect {
                target: target.to_string(),
                reason: "Connection refused (os error 111)".into(),
            });
        }
        let mut transport = MockTransport::new(&target.host, self.journal.clone(), self.responder.clone());
        transport.refuse_channels = self.refuse_channels;
        let transport = Arc::new(transport);
        self.transports.lock().unwrap().push(transport.clone());
        self.journal.push(format!("connect-done {}", target.host));
        Ok(transport)
    }
}

pub fn settings() -> RemoteConfig {
    RemoteConfig {
        workspace_root: "/home/jetson/catkin_ws/devel/lib".to_string(),
        script_runner: "rosrun".to_string(),
        connect_timeout_secs: 1,
    }
}

pub fn manager(connector: Arc<MockConnector>) -> (SessionManager, LogReceiver) {
    let (sink, rx) = LogSink::channel();
    (SessionManager::new(connector, sink, settings()), rx)
}

pub fn target(host: &str) -> Target {
    Target::new(host, "jetson", "jetson")
}

pub fn drain(rx: &mut LogReceiver) -> Vec<LogLine> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}
