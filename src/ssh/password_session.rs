use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use russh::keys::*;
use russh::*;
use tracing::{debug, info};

use super::common::{default_ssh_config, SshChannel};
use super::ssh_session::{CommandChannel, Connector, Target, Transport};
use crate::error::{Error, Result};

pub struct Client {}

#[async_trait]
impl client::Handler for Client {
    type Error = russh::Error;

    /// Host keys are not verified.
    ///
    /// Accepted trust trade-off: the console only talks to the vehicle's own
    /// computer over its private link.
    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!("accepting host key {}", server_public_key.fingerprint());
        Ok(true)
    }
}

/// An SSH connection authenticated with a password.
pub struct PasswordSession {
    session: client::Handle<Client>,
    closed: AtomicBool,
}

impl PasswordSession {
    pub async fn connect(target: &Target) -> Result<Self> {
        let connect_err = |reason: String| Error::Connect {
            target: target.to_string(),
            reason,
        };

        let config = Arc::new(default_ssh_config());
        let sh = Client {};

        let mut session = client::connect(config, (target.host.as_str(), target.port), sh)
            .await
            .map_err(|e| connect_err(e.to_string()))?;

        let auth_res = session
            .authenticate_password(target.username.clone(), target.password.as_str())
            .await
            .map_err(|e| connect_err(e.to_string()))?;

        if !auth_res {
            // leave nothing half-open behind
            let _ = session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await;
            return Err(connect_err("authentication (with password) failed".into()));
        }

        info!("authenticated to {target}");
        Ok(Self {
            session,
            closed: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl Transport for PasswordSession {
    async fn open_channel(&self) -> Result<Box<dyn CommandChannel>> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        let channel = self.session.channel_open_session().await?;
        debug!("opened channel {:?}", channel.id());
        Ok(Box::new(SshChannel::new(channel)))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self
            .session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!("disconnect: {e}");
        }
    }
}

/// Opens [`PasswordSession`]s.
#[derive(Default)]
pub struct PasswordConnector;

#[async_trait]
impl Connector for PasswordConnector {
    async fn connect(&self, target: &Target) -> Result<Arc<dyn Transport>> {
        let session = PasswordSession::connect(target).await?;
        Ok(Arc::new(session))
    }
}
