use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval_at;
use tokio::time::timeout;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ConsulTransport;
use crate::DecodeError;
use crate::Result;
use crate::SessionConfig;
use crate::SessionError;

const CREATE_PATH: &str = "/v1/session/create";
const RENEW_PATH: &str = "/v1/session/renew";
const DESTROY_PATH: &str = "/v1/session/destroy";
const SESSION_NOT_FOUND: u16 = 404;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Serialize)]
struct CreateRequest {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "LockDelay")]
    lock_delay: String,
    #[serde(rename = "TTL")]
    ttl: String,
}

#[derive(Deserialize)]
struct CreateResponse {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Debug)]
pub(crate) enum SessionCommand {
    /// Throw away the current id and create a fresh session
    Recreate,
}

/// A Consul TTL session kept alive by a background renewal actor.
///
/// The session id is replaced, never mutated: readers grab the current id
/// through an [`ArcSwapOption`] without blocking the renewal loop. All writes
/// to the id go through the single actor task, so create/renew/recreate never
/// race.
pub struct Session {
    inner: Arc<SessionInner>,
    commands: mpsc::Sender<SessionCommand>,
    command_feed: Mutex<Option<mpsc::Receiver<SessionCommand>>>,
    shutdown: CancellationToken,
    actor: Mutex<Option<JoinHandle<()>>>,
}

pub(crate) struct SessionInner {
    name: String,
    transport: Arc<dyn ConsulTransport>,
    ttl_seconds: u64,
    lock_delay_seconds: u64,
    id: ArcSwapOption<String>,
}

impl Session {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ConsulTransport>,
        config: &SessionConfig,
    ) -> Self {
        let (commands, command_feed) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        Self {
            inner: Arc::new(SessionInner {
                name: name.into(),
                transport,
                ttl_seconds: config.ttl_seconds,
                lock_delay_seconds: config.lock_delay_seconds,
                id: ArcSwapOption::const_empty(),
            }),
            commands,
            command_feed: Mutex::new(Some(command_feed)),
            shutdown: CancellationToken::new(),
            actor: Mutex::new(None),
        }
    }

    /// Creates the session and starts renewing it every `ttl - 2` seconds.
    ///
    /// A failed initial creation is logged and left to the renewal loop: the
    /// next renewal tick finds no live session and recreates it.
    pub async fn start(&self) {
        let Some(command_feed) = self.command_feed.lock().take() else {
            warn!(name = %self.inner.name, "Session already started");
            return;
        };

        self.inner.recreate().await;

        let inner = self.inner.clone();
        let shutdown = self.shutdown.clone();
        let actor = tokio::spawn(run_renewal(inner, command_feed, shutdown));
        *self.actor.lock() = Some(actor);
    }

    /// Current session id, if one has ever been created.
    pub fn current_id(&self) -> Result<String> {
        self.inner
            .id
            .load_full()
            .map(|id| (*id).clone())
            .ok_or_else(|| SessionError::Uninitialized.into())
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Asks the renewal actor to drop the current session and create a fresh
    /// one. Queued behind any in-flight renewal.
    pub async fn refresh(&self) {
        if self.commands.send(SessionCommand::Recreate).await.is_err() {
            warn!(name = %self.inner.name, "Session actor is gone, refresh dropped");
        }
    }

    /// Destroys the session best-effort and stops the renewal actor.
    pub async fn close(&self) {
        if let Ok(id) = self.current_id() {
            self.inner.destroy(&id).await;
        }
        self.shutdown.cancel();

        let actor = self.actor.lock().take();
        if let Some(mut actor) = actor {
            if timeout(SHUTDOWN_GRACE, &mut actor).await.is_err() {
                warn!(name = %self.inner.name, "Session actor did not stop in time, aborting");
                actor.abort();
            }
        }
    }
}

async fn run_renewal(
    inner: Arc<SessionInner>,
    mut commands: mpsc::Receiver<SessionCommand>,
    shutdown: CancellationToken,
) {
    let period = inner.renew_interval();
    let mut ticks = interval_at(Instant::now() + period, period);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticks.tick() => inner.renew_once().await,
            command = commands.recv() => match command {
                Some(SessionCommand::Recreate) => inner.recreate().await,
                None => break,
            },
        }
    }
    debug!(name = %inner.name, "Session renewal actor stopped");
}

impl SessionInner {
    pub(crate) fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds.saturating_sub(2).max(1))
    }

    /// Creates a new session, replacing whatever id was held before.
    pub(crate) async fn recreate(&self) {
        match self.try_create().await {
            Ok(id) => {
                info!(name = %self.name, session_id = %id, "Consul session created");
                self.id.store(Some(Arc::new(id)));
            }
            Err(error) => {
                error!(name = %self.name, %error, "Failed to create Consul session");
            }
        }
    }

    async fn try_create(&self) -> Result<String> {
        let request = CreateRequest {
            name: self.name.clone(),
            lock_delay: format!("{}s", self.lock_delay_seconds),
            ttl: format!("{}s", self.ttl_seconds),
        };
        let body = serde_json::to_vec(&request).map_err(DecodeError::Json)?;

        let response = self.transport.put(CREATE_PATH, Vec::new(), body).await?;
        if !response.is_success() {
            return Err(crate::ProtocolError::UnexpectedStatus {
                status: response.status,
                body: response.body_text(),
            }
            .into());
        }

        let created: CreateResponse =
            serde_json::from_slice(&response.body).map_err(DecodeError::Json)?;
        Ok(created.id)
    }

    /// One renewal attempt. A 404 means the agent expired the session, in
    /// which case a fresh one is created right away.
    pub(crate) async fn renew_once(&self) {
        let Some(id) = self.id.load_full() else {
            info!(name = %self.name, "No session to renew, creating one");
            self.recreate().await;
            return;
        };

        let path = format!("{RENEW_PATH}/{id}");
        match self.transport.put(&path, Vec::new(), Vec::new()).await {
            Ok(response) if response.is_success() => {
                debug!(name = %self.name, session_id = %id, "Session renewed");
            }
            Ok(response) if response.status == SESSION_NOT_FOUND => {
                info!(
                    name = %self.name,
                    session_id = %id,
                    "Session expired on the agent side, recreating"
                );
                self.recreate().await;
            }
            Ok(response) => {
                warn!(
                    name = %self.name,
                    session_id = %id,
                    status = response.status,
                    "Unexpected status renewing session"
                );
            }
            Err(error) => {
                error!(name = %self.name, session_id = %id, %error, "Failed to renew session");
            }
        }
    }

    pub(crate) async fn destroy(
        &self,
        id: &str,
    ) {
        let path = format!("{DESTROY_PATH}/{id}");
        match self.transport.put(&path, Vec::new(), Vec::new()).await {
            Ok(response) if response.is_success() => {
                info!(name = %self.name, session_id = %id, "Session destroyed");
            }
            Ok(response) => {
                warn!(
                    name = %self.name,
                    session_id = %id,
                    status = response.status,
                    "Unexpected status destroying session"
                );
            }
            Err(error) => {
                warn!(name = %self.name, session_id = %id, %error, "Failed to destroy session");
            }
        }
    }
}

#[cfg(test)]
impl Session {
    pub(crate) fn inner(&self) -> &SessionInner {
        &self.inner
    }
}
