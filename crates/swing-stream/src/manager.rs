//! Session registry and manager.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swing_analysis::{FrameValidator, SwingAnalyzer};
use swing_core::{
    classify_club, ClubClassification, Error, Handedness, PoseFrame, Result, SessionId, UserId,
};
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::{ManagerConfig, SessionConfig, SessionOverrides};
use crate::events::{CloseReason, SessionEvent, TerminalRecord};
use crate::stats::SessionStats;
use crate::worker::{Command, FrameOutcome, SessionWorker, WorkerSetup};

const COMMAND_QUEUE_SIZE: usize = 64;

/// Request to open a streaming session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartSession {
    pub user_id: Option<UserId>,
    pub club_name: String,
    pub handedness: Handedness,
    pub overrides: SessionOverrides,
}

/// A newly opened session and its event stream
#[derive(Debug)]
pub struct SessionStarted {
    pub session_id: SessionId,
    pub club: ClubClassification,
    pub config: SessionConfig,
    pub events: mpsc::Receiver<SessionEvent>,
}

#[derive(Clone)]
struct SessionHandle {
    commands: mpsc::Sender<Command>,
    stats: watch::Receiver<SessionStats>,
    cancel: Arc<watch::Sender<bool>>,
    last_activity: Arc<Mutex<Instant>>,
}

impl SessionHandle {
    fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }
}

/// Bounded log of terminated sessions, oldest evicted first
struct TerminalLog {
    capacity: usize,
    order: VecDeque<SessionId>,
    records: HashMap<SessionId, TerminalRecord>,
}

impl TerminalLog {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            records: HashMap::new(),
        }
    }

    fn insert(&mut self, record: TerminalRecord) {
        let id = record.session_id;
        if self.records.insert(id, record).is_none() {
            self.order.push_back(id);
        }
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
    }
}

/// Shared map of live sessions plus retained terminal records
pub struct SessionRegistry {
    active: RwLock<HashMap<SessionId, SessionHandle>>,
    terminated: RwLock<TerminalLog>,
}

impl SessionRegistry {
    fn new(terminated_history: usize) -> Self {
        Self {
            active: RwLock::new(HashMap::new()),
            terminated: RwLock::new(TerminalLog::new(terminated_history)),
        }
    }

    async fn register(&self, id: SessionId, handle: SessionHandle, limit: usize) -> Result<()> {
        let mut active = self.active.write().await;
        if active.len() >= limit {
            return Err(Error::SessionLimit { limit });
        }
        active.insert(id, handle);
        Ok(())
    }

    async fn handle(&self, id: SessionId) -> Option<SessionHandle> {
        self.active.read().await.get(&id).cloned()
    }

    /// Move a session from the active map to the terminal log
    pub(crate) async fn retire(&self, record: TerminalRecord) {
        let id = record.session_id;
        self.terminated.write().await.insert(record);
        self.active.write().await.remove(&id);
    }

    pub async fn terminal(&self, id: SessionId) -> Option<TerminalRecord> {
        self.terminated.read().await.records.get(&id).cloned()
    }

    pub async fn active_count(&self) -> usize {
        self.active.read().await.len()
    }
}

/// Entry point for streaming sessions
pub struct SessionManager {
    config: ManagerConfig,
    validator: FrameValidator,
    analyzer: Arc<dyn SwingAnalyzer>,
    registry: Arc<SessionRegistry>,
}

impl SessionManager {
    pub fn new(config: ManagerConfig, analyzer: Arc<dyn SwingAnalyzer>) -> Self {
        Self {
            validator: FrameValidator::new(config.validator.clone()),
            registry: Arc::new(SessionRegistry::new(config.terminated_history)),
            analyzer,
            config,
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Register a session and spawn its worker
    pub async fn start_session(&self, request: StartSession) -> Result<SessionStarted> {
        let club = classify_club(&request.club_name);
        if club.default_applied && self.config.strict_club {
            return Err(Error::UnknownClub(request.club_name));
        }
        let config = self.config.session.with_overrides(&request.overrides)?;

        let session_id = SessionId::new();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_SIZE);
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_size);
        let (stats_tx, stats_rx) = watch::channel(SessionStats::new(session_id, config.stride));
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let handle = SessionHandle {
            commands: command_tx,
            stats: stats_rx,
            cancel: Arc::new(cancel_tx),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        };
        self.registry
            .register(session_id, handle, self.config.max_sessions)
            .await?;

        // The closing event must always fit, whatever the consumer does
        let terminal_slot = event_tx.clone().try_reserve_owned().ok();
        let _ = event_tx.try_send(SessionEvent::Started {
            session_id,
            club,
            config: config.clone(),
        });

        let worker = SessionWorker::new(WorkerSetup {
            session_id,
            user_id: request.user_id,
            club,
            handedness: request.handedness,
            config: config.clone(),
            validator: self.validator.clone(),
            analyzer: Arc::clone(&self.analyzer),
            registry: Arc::clone(&self.registry),
            events: event_tx,
            terminal_slot,
            stats: stats_tx,
            cancel: cancel_rx,
        });
        tokio::spawn(worker.run(command_rx));

        Ok(SessionStarted {
            session_id,
            club,
            config,
            events: event_rx,
        })
    }

    /// Hand a frame to the session's worker
    pub async fn push_frame(&self, session_id: SessionId, frame: PoseFrame) -> Result<FrameOutcome> {
        const OPERATION: &str = "accept frames";

        let Some(handle) = self.registry.handle(session_id).await else {
            return Err(self.closed_error(session_id, OPERATION).await);
        };
        handle.touch();

        let (reply, response) = oneshot::channel();
        if handle
            .commands
            .send(Command::Frame { frame, reply })
            .await
            .is_err()
        {
            return Err(self.closed_error(session_id, OPERATION).await);
        }
        match response.await {
            Ok(outcome) => outcome,
            Err(_) => Err(self.closed_error(session_id, OPERATION).await),
        }
    }

    /// Drain with a final analysis and close. Ending a closed session
    /// returns its terminal record again.
    pub async fn end_session(&self, session_id: SessionId) -> Result<TerminalRecord> {
        self.close(session_id, CloseReason::Ended).await
    }

    /// Close without a final analysis, abandoning any in-flight analysis.
    /// Takes effect ahead of queued frames and of a drain already under way.
    pub async fn cancel_session(&self, session_id: SessionId) -> Result<TerminalRecord> {
        if let Some(handle) = self.registry.handle(session_id).await {
            handle.cancel.send_replace(true);
        }
        self.close(session_id, CloseReason::Cancelled).await
    }

    async fn close(&self, session_id: SessionId, reason: CloseReason) -> Result<TerminalRecord> {
        if let Some(handle) = self.registry.handle(session_id).await {
            let (reply, response) = oneshot::channel();
            let command = Command::Close {
                reason,
                reply: Some(reply),
            };
            if handle.commands.send(command).await.is_ok() {
                if let Ok(record) = response.await {
                    return Ok(record);
                }
            }
        }
        // Already terminal, or closed concurrently
        self.registry
            .terminal(session_id)
            .await
            .ok_or(Error::SessionNotFound(session_id))
    }

    /// Latest statistics snapshot, live or terminal
    pub async fn session_stats(&self, session_id: SessionId) -> Result<SessionStats> {
        if let Some(handle) = self.registry.handle(session_id).await {
            return Ok(handle.stats.borrow().clone());
        }
        self.registry
            .terminal(session_id)
            .await
            .map(|record| record.stats)
            .ok_or(Error::SessionNotFound(session_id))
    }

    pub async fn terminal_record(&self, session_id: SessionId) -> Option<TerminalRecord> {
        self.registry.terminal(session_id).await
    }

    pub async fn active_sessions(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.registry.active.read().await.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Ask every idle session to drain. Returns the number signalled.
    pub async fn reap_idle(&self) -> usize {
        let idle_timeout = Duration::from_millis(self.config.idle_timeout_ms);
        let handles: Vec<(SessionId, SessionHandle)> = self
            .registry
            .active
            .read()
            .await
            .iter()
            .map(|(id, h)| (*id, h.clone()))
            .collect();

        let mut reaped = 0;
        for (id, handle) in handles {
            let idle = handle.idle_for();
            if idle < idle_timeout {
                continue;
            }
            let command = Command::Close {
                reason: CloseReason::IdleTimeout,
                reply: None,
            };
            if handle.commands.try_send(command).is_ok() {
                // Not signalled again while it drains
                handle.touch();
                reaped += 1;
                tracing::info!(session = %id, idle_ms = idle.as_millis() as u64, "Reaping idle session");
            }
        }
        reaped
    }

    /// Periodically reap idle sessions until the manager is dropped
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let manager = Arc::downgrade(self);
        let period = Duration::from_millis(self.config.reaper_interval_ms.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.reap_idle().await;
            }
        })
    }

    async fn closed_error(&self, session_id: SessionId, operation: &'static str) -> Error {
        match self.registry.terminal(session_id).await {
            Some(record) => Error::SessionState {
                session_id,
                state: record.state,
                operation,
            },
            None => Error::SessionNotFound(session_id),
        }
    }
}
