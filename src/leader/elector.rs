use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use nanoid::nanoid;
use parking_lot::Mutex;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio::time::interval_at;
use tokio::time::sleep;
use tokio::time::timeout;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ConsulTransport;
use crate::ConsulWatcher;
use crate::DecodeError;
use crate::LeaderConfig;
use crate::LeadershipObserver;
use crate::Result;
use crate::Session;
use crate::SessionConfig;
use crate::WatchConfig;
use crate::WatchHandle;
use crate::WatchResult;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One entry of the lock key's KV response. `Session` is the id of the
/// session holding the lock, `Value` the base64-encoded node id the holder
/// wrote when acquiring.
#[derive(Debug, Deserialize)]
pub(crate) struct LockEntry {
    #[serde(rename = "Session")]
    pub(crate) session: Option<String>,
    #[serde(rename = "Value")]
    pub(crate) value: Option<String>,
}

/// What a lock-key update asks the elector to do next
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum LockDisposition {
    /// The lock is free (or abandoned): try to acquire it after the delay
    AcquireAfter(Duration),
    /// The lock is held with a live session, nothing to do
    Held,
}

/// Session-based leader election on a single KV lock key.
///
/// One elector per service name. It keeps a TTL [`Session`] alive, watches
/// `/v1/kv/service/<name>/leader` and tries to acquire the key whenever it
/// looks free. Leadership is what the agent says it is: promotion happens
/// only on an acquisition the agent confirmed, demotion as soon as the
/// watched key names another holder or the watch itself fails.
pub struct LeaderElector {
    inner: Arc<ElectorInner>,
    session: Arc<Session>,
    watcher: Arc<ConsulWatcher>,
    rescue_interval: Duration,
    rescue_task: Mutex<Option<JoinHandle<()>>>,
    watch_handle: Mutex<Option<WatchHandle>>,
}

pub(crate) struct ElectorInner {
    node_id: String,
    lock_key: String,
    lock_delay: Duration,
    session: Arc<Session>,
    transport: Arc<dyn ConsulTransport>,
    is_leader: AtomicBool,
    observers: RwLock<Vec<Arc<dyn LeadershipObserver>>>,
    shutdown: CancellationToken,
}

impl LeaderElector {
    pub fn builder(
        name: impl Into<String>,
        transport: Arc<dyn ConsulTransport>,
    ) -> LeaderElectorBuilder {
        LeaderElectorBuilder::new(name, transport)
    }

    /// Starts the session, the periodic rescue attempts and the lock watch.
    pub async fn start(&self) {
        self.session.start().await;

        let rescue_inner = self.inner.clone();
        let rescue_interval = self.rescue_interval;
        let rescue = tokio::spawn(async move {
            // first tick fires immediately so a fresh node contends right away
            let mut ticks = interval_at(Instant::now(), rescue_interval);
            loop {
                tokio::select! {
                    _ = rescue_inner.shutdown.cancelled() => break,
                    _ = ticks.tick() => rescue_inner.acquire_lock().await,
                }
            }
            debug!(lock_key = %rescue_inner.lock_key, "Lock rescue task stopped");
        });
        *self.rescue_task.lock() = Some(rescue);

        let update_inner = self.inner.clone();
        let failure_inner = self.inner.clone();
        let handle = self.watcher.watch_endpoint(
            &self.inner.lock_key,
            move |result: WatchResult<String>| {
                update_inner.on_lock_update(result.body());
            },
            move |error| {
                error!(
                    lock_key = %failure_inner.lock_key,
                    %error,
                    "Lock watch failed, relinquishing leadership until it recovers"
                );
                failure_inner.demote();
            },
        );
        *self.watch_handle.lock() = Some(handle);
    }

    pub fn is_leader(&self) -> bool {
        self.inner.is_leader.load(Ordering::SeqCst)
    }

    pub fn node_id(&self) -> &str {
        &self.inner.node_id
    }

    pub fn register_observer(
        &self,
        observer: Arc<dyn LeadershipObserver>,
    ) {
        self.inner.observers.write().push(observer);
    }

    pub fn unregister_observer(
        &self,
        observer: &Arc<dyn LeadershipObserver>,
    ) {
        self.inner
            .observers
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, observer));
    }

    /// Destroys the session, stops the watch and rescue tasks and steps down.
    pub async fn close(&self) {
        self.session.close().await;
        self.inner.shutdown.cancel();

        if let Some(handle) = self.watch_handle.lock().take() {
            handle.cancel();
        }
        self.watcher.close().await;

        let rescue = self.rescue_task.lock().take();
        if let Some(mut rescue) = rescue {
            if timeout(SHUTDOWN_GRACE, &mut rescue).await.is_err() {
                warn!(lock_key = %self.inner.lock_key, "Lock rescue task did not stop in time, aborting");
                rescue.abort();
            }
        }

        // the session is gone, so the lock is no longer ours
        self.inner.demote();
    }
}

impl ElectorInner {
    /// Reacts to a lock-key change: demotes when another node holds the key
    /// and schedules an acquisition attempt when nobody does.
    pub(crate) fn on_lock_update(
        self: &Arc<Self>,
        body: &str,
    ) {
        match self.classify_lock(body) {
            Ok(LockDisposition::AcquireAfter(delay)) => self.schedule_acquire(delay),
            Ok(LockDisposition::Held) => {}
            Err(error) => {
                error!(lock_key = %self.lock_key, %error, "Undecodable lock key update");
            }
        }
    }

    pub(crate) fn classify_lock(
        &self,
        body: &str,
    ) -> Result<LockDisposition> {
        let entries: Vec<LockEntry> = serde_json::from_str(body).map_err(DecodeError::Json)?;
        let Some(entry) = entries.first() else {
            warn!(lock_key = %self.lock_key, "Lock key disappeared, contending for it");
            self.demote();
            return Ok(LockDisposition::AcquireAfter(self.lock_delay));
        };

        let holder = match entry.value.as_deref() {
            Some(encoded) => {
                let raw = STANDARD.decode(encoded).map_err(DecodeError::Base64)?;
                String::from_utf8_lossy(&raw).into_owned()
            }
            None => String::new(),
        };
        if holder != self.node_id {
            self.demote();
        }

        match entry.session.as_deref() {
            Some(session) if !session.is_empty() => Ok(LockDisposition::Held),
            _ => {
                debug!(lock_key = %self.lock_key, "Lock is not held by any session");
                Ok(LockDisposition::AcquireAfter(self.lock_delay))
            }
        }
    }

    /// Tries to acquire the lock after `delay`, unless shut down first.
    pub(crate) fn schedule_acquire(
        self: &Arc<Self>,
        delay: Duration,
    ) {
        let inner = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = inner.shutdown.cancelled() => {}
                _ = sleep(delay) => inner.acquire_lock().await,
            }
        });
    }

    /// One acquisition attempt. The agent's answer body is the verdict:
    /// literal `true` means the lock is ours.
    pub(crate) async fn acquire_lock(&self) {
        let session_id = match self.session.current_id() {
            Ok(id) => id,
            Err(_) => {
                warn!(lock_key = %self.lock_key, "No session yet, skipping lock acquisition");
                return;
            }
        };

        let query = vec![("acquire".to_string(), session_id)];
        let body = self.node_id.clone().into_bytes();
        match self.transport.put(&self.lock_key, query, body).await {
            Ok(response) if response.is_success() => {
                if response.body_text().trim().eq_ignore_ascii_case("true") {
                    self.promote();
                } else {
                    debug!(lock_key = %self.lock_key, "Lock is held elsewhere");
                }
            }
            Ok(response) => {
                warn!(
                    lock_key = %self.lock_key,
                    status = response.status,
                    "Unexpected status acquiring lock"
                );
            }
            Err(error) => {
                error!(lock_key = %self.lock_key, %error, "Failed to acquire lock");
            }
        }
    }

    pub(crate) fn promote(&self) {
        if !self.is_leader.swap(true, Ordering::SeqCst) {
            info!(lock_key = %self.lock_key, node_id = %self.node_id, "Promoted to leader");
            for observer in self.observers_snapshot() {
                observer.promoted();
            }
        }
    }

    pub(crate) fn demote(&self) {
        if self.is_leader.swap(false, Ordering::SeqCst) {
            info!(lock_key = %self.lock_key, node_id = %self.node_id, "Demoted from leader");
            for observer in self.observers_snapshot() {
                observer.demoted();
            }
        }
    }

    // observers are notified outside the lock, so a callback may
    // register/unregister without deadlocking
    fn observers_snapshot(&self) -> Vec<Arc<dyn LeadershipObserver>> {
        self.observers.read().clone()
    }
}

pub struct LeaderElectorBuilder {
    name: String,
    transport: Arc<dyn ConsulTransport>,
    leader_config: LeaderConfig,
    session_config: SessionConfig,
    watch_config: WatchConfig,
}

impl LeaderElectorBuilder {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ConsulTransport>,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            leader_config: LeaderConfig::default(),
            session_config: SessionConfig::default(),
            watch_config: WatchConfig::default(),
        }
    }

    pub fn with_leader_config(
        mut self,
        config: &LeaderConfig,
    ) -> Self {
        self.leader_config = config.clone();
        self
    }

    pub fn with_session_config(
        mut self,
        config: &SessionConfig,
    ) -> Self {
        self.session_config = *config;
        self
    }

    pub fn with_watch_config(
        mut self,
        config: &WatchConfig,
    ) -> Self {
        self.watch_config = config.clone();
        self
    }

    pub fn with_node_id(
        mut self,
        node_id: impl Into<String>,
    ) -> Self {
        self.leader_config.node_id = Some(node_id.into());
        self
    }

    pub fn build(self) -> Result<LeaderElector> {
        let node_id = self.leader_config.node_id.unwrap_or_else(|| nanoid!());
        let session = Arc::new(Session::new(
            self.name.clone(),
            self.transport.clone(),
            &self.session_config,
        ));
        let watcher = Arc::new(
            ConsulWatcher::builder(self.transport.clone())
                .with_config(&self.watch_config)
                .build()?,
        );

        Ok(LeaderElector {
            inner: Arc::new(ElectorInner {
                node_id,
                lock_key: format!("/v1/kv/service/{}/leader", self.name),
                lock_delay: Duration::from_secs(self.leader_config.lock_delay_seconds),
                session: session.clone(),
                transport: self.transport,
                is_leader: AtomicBool::new(false),
                observers: RwLock::new(Vec::new()),
                shutdown: CancellationToken::new(),
            }),
            session,
            watcher,
            rescue_interval: Duration::from_secs(self.leader_config.lock_rescue_interval_seconds),
            rescue_task: Mutex::new(None),
            watch_handle: Mutex::new(None),
        })
    }
}

#[cfg(test)]
impl LeaderElector {
    pub(crate) fn inner(&self) -> &Arc<ElectorInner> {
        &self.inner
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
