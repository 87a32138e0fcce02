//! Per-session worker task.
//!
//! The worker owns all mutable session state. Commands arrive over an
//! mpsc channel in producer order; analysis runs on the blocking pool with
//! at most one job in flight. Cancellation is signalled out of band and
//! takes priority over queued commands and running analyses.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swing_analysis::{FrameValidator, SwingAnalysisResult, SwingAnalyzer, WindowRequest};
use swing_core::{
    ClubClassification, Error, Handedness, PoseFrame, Result, SessionId, SessionState, Timestamp,
    UserId, ValidationError,
};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use crate::buffer::FrameBuffer;
use crate::config::SessionConfig;
use crate::events::{CloseReason, SessionEvent, TerminalRecord};
use crate::manager::SessionRegistry;
use crate::stats::{LatencyTracker, SessionStats};

/// What happened to a pushed frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Accepted; no stride boundary reached
    Buffered,
    /// Accepted and an analysis of the window was started
    AnalysisStarted,
    /// Accepted on a stride boundary while an analysis was in flight
    AnalysisSkipped,
    Rejected { error: ValidationError },
}

pub(crate) enum Command {
    Frame {
        frame: PoseFrame,
        reply: oneshot::Sender<Result<FrameOutcome>>,
    },
    Close {
        reason: CloseReason,
        reply: Option<oneshot::Sender<TerminalRecord>>,
    },
}

/// Everything a worker needs at spawn time
pub(crate) struct WorkerSetup {
    pub session_id: SessionId,
    pub user_id: Option<UserId>,
    pub club: ClubClassification,
    pub handedness: Handedness,
    pub config: SessionConfig,
    pub validator: FrameValidator,
    pub analyzer: Arc<dyn SwingAnalyzer>,
    pub registry: Arc<SessionRegistry>,
    pub events: mpsc::Sender<SessionEvent>,
    /// Slot held back for the closing event
    pub terminal_slot: Option<mpsc::OwnedPermit<SessionEvent>>,
    pub stats: watch::Sender<SessionStats>,
    pub cancel: watch::Receiver<bool>,
}

struct InFlight {
    handle: JoinHandle<SwingAnalysisResult>,
    started: Instant,
}

pub(crate) struct SessionWorker {
    id: SessionId,
    user_id: Option<UserId>,
    club: ClubClassification,
    handedness: Handedness,
    config: SessionConfig,
    state: SessionState,
    buffer: FrameBuffer,
    validator: FrameValidator,
    analyzer: Arc<dyn SwingAnalyzer>,
    registry: Arc<SessionRegistry>,
    events: mpsc::Sender<SessionEvent>,
    terminal_slot: Option<mpsc::OwnedPermit<SessionEvent>>,
    stats_tx: watch::Sender<SessionStats>,
    cancel: watch::Receiver<bool>,
    stats: SessionStats,
    latency: LatencyTracker,
    effective_stride: usize,
    since_trigger: usize,
    consecutive_rejections: usize,
}

impl SessionWorker {
    pub(crate) fn new(setup: WorkerSetup) -> Self {
        let stats = setup.stats.borrow().clone();
        Self {
            id: setup.session_id,
            user_id: setup.user_id,
            club: setup.club,
            handedness: setup.handedness,
            buffer: FrameBuffer::new(setup.config.buffer_capacity),
            effective_stride: setup.config.stride,
            config: setup.config,
            state: SessionState::Created,
            validator: setup.validator,
            analyzer: setup.analyzer,
            registry: setup.registry,
            events: setup.events,
            terminal_slot: setup.terminal_slot,
            stats_tx: setup.stats,
            cancel: setup.cancel,
            stats,
            latency: LatencyTracker::default(),
            since_trigger: 0,
            consecutive_rejections: 0,
        }
    }

    pub(crate) async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::info!(
            session = %self.id,
            club = %self.club.club,
            stride = self.config.stride,
            capacity = self.config.buffer_capacity,
            "Session started"
        );

        let mut in_flight: Option<InFlight> = None;

        let (record, reply) = loop {
            tokio::select! {
                biased;

                _ = cancel_requested(&mut self.cancel) => {
                    let record = self.drain(CloseReason::Cancelled, in_flight.take()).await;
                    break (record, None);
                }
                (joined, latency) = wait_for(&mut in_flight) => {
                    in_flight = None;
                    if let Err(reason) = self.complete(joined, latency) {
                        break (self.terminate(SessionState::Errored, reason, None), None);
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::Frame { frame, reply }) => {
                        let outcome = self.on_frame(frame, in_flight.is_some());
                        if matches!(outcome, Ok(FrameOutcome::AnalysisStarted)) {
                            in_flight = Some(self.spawn_analysis(false));
                        }
                        self.publish();
                        let _ = reply.send(outcome);

                        if self.consecutive_rejections >= self.config.max_consecutive_rejections {
                            abandon(in_flight.take());
                            let reason = CloseReason::TooManyRejections {
                                consecutive: self.consecutive_rejections,
                            };
                            break (self.terminate(SessionState::Errored, reason, None), None);
                        }
                    }
                    Some(Command::Close { reason, reply }) => {
                        let record = self.drain(reason, in_flight.take()).await;
                        break (record, reply);
                    }
                    None => {
                        let record = self.drain(CloseReason::Cancelled, in_flight.take()).await;
                        break (record, None);
                    }
                }
            }
        };

        self.registry.retire(record.clone()).await;

        let event = if record.state == SessionState::Errored {
            tracing::error!(session = %self.id, reason = ?record.reason, "Session errored");
            SessionEvent::Errored {
                record: Box::new(record.clone()),
            }
        } else {
            tracing::info!(
                session = %self.id,
                reason = ?record.reason,
                analyses = record.stats.analyses_run,
                dropped = record.stats.frames_dropped,
                "Session closed"
            );
            SessionEvent::Closed {
                record: Box::new(record.clone()),
            }
        };
        match self.terminal_slot.take() {
            Some(slot) => {
                slot.send(event);
            }
            None => self.emit(event),
        }

        if let Some(reply) = reply {
            let _ = reply.send(record);
        }
    }

    fn on_frame(&mut self, frame: PoseFrame, busy: bool) -> Result<FrameOutcome> {
        if !self.state.accepts_frames() {
            return Err(Error::SessionState {
                session_id: self.id,
                state: self.state,
                operation: "accept frames",
            });
        }
        if self.state == SessionState::Created {
            self.transition(SessionState::Active)?;
        }
        self.stats.frames_received += 1;

        if let Err(error) = self.validator.validate_next(self.buffer.last(), &frame) {
            self.consecutive_rejections += 1;
            self.stats.frames_rejected += 1;
            tracing::debug!(
                session = %self.id,
                frame = frame.frame_index(),
                %error,
                "Frame rejected"
            );
            self.emit(SessionEvent::FrameRejected {
                session_id: self.id,
                error: error.clone(),
            });
            return Ok(FrameOutcome::Rejected { error });
        }

        self.consecutive_rejections = 0;
        self.stats.frames_accepted += 1;
        if self.buffer.push(frame) {
            tracing::trace!(session = %self.id, dropped = self.buffer.dropped(), "Evicted unanalyzed frame");
        }

        self.since_trigger += 1;
        if self.since_trigger < self.effective_stride {
            return Ok(FrameOutcome::Buffered);
        }
        self.since_trigger = 0;

        if busy {
            self.stats.analyses_skipped += 1;
            tracing::debug!(session = %self.id, "Analysis in flight; trigger skipped");
            Ok(FrameOutcome::AnalysisSkipped)
        } else {
            Ok(FrameOutcome::AnalysisStarted)
        }
    }

    fn spawn_analysis(&mut self, is_final: bool) -> InFlight {
        let request = WindowRequest {
            session_id: self.id,
            club: self.club,
            handedness: self.handedness,
            frames: self.buffer.snapshot(),
            frame_rate: self.config.frame_rate,
            is_final,
        };
        let analyzer = Arc::clone(&self.analyzer);
        InFlight {
            handle: tokio::task::spawn_blocking(move || analyzer.analyze_window(request)),
            started: Instant::now(),
        }
    }

    /// Record a finished analysis and emit its result and alerts
    fn complete(
        &mut self,
        joined: std::result::Result<SwingAnalysisResult, JoinError>,
        latency: Duration,
    ) -> std::result::Result<SwingAnalysisResult, CloseReason> {
        let result = joined.map_err(|e| CloseReason::AnalysisFailed {
            message: e.to_string(),
        })?;

        self.stats.analyses_run += 1;
        self.latency.record(latency);
        self.stats.avg_latency_ms = self.latency.average_ms();
        self.stats.last_latency_ms = latency.as_secs_f64() * 1_000.0;
        if let Some(trailing) = result.trailing_frame() {
            self.stats.last_analyzed_frame = Some(trailing);
        }
        self.stats.faults_detected += result.faults.len() as u64;
        self.adapt_stride(latency);

        for fault in result.faults_above(self.config.feedback_threshold) {
            self.stats.alerts_emitted += 1;
            self.emit(SessionEvent::FaultAlert {
                session_id: self.id,
                trailing_frame: result.trailing_frame(),
                fault: Box::new(fault.clone()),
            });
        }
        self.emit(SessionEvent::Analysis {
            result: Box::new(result.clone()),
        });
        self.publish();

        Ok(result)
    }

    /// Double the stride above the latency budget, halve it back below
    /// half the budget
    fn adapt_stride(&mut self, latency: Duration) {
        let budget = Duration::from_millis(self.config.latency_budget_ms);
        let previous = self.effective_stride;

        if latency > budget {
            self.effective_stride = (previous * 2).min(self.config.max_stride());
        } else if latency < budget / 2 {
            self.effective_stride = (previous / 2).max(self.config.stride);
        }

        if self.effective_stride != previous {
            tracing::debug!(
                session = %self.id,
                latency_ms = latency.as_secs_f64() * 1_000.0,
                from = previous,
                to = self.effective_stride,
                "Adjusted analysis stride"
            );
        }
        self.stats.effective_stride = self.effective_stride;
    }

    async fn drain(&mut self, reason: CloseReason, in_flight: Option<InFlight>) -> TerminalRecord {
        if let Err(e) = self.transition(SessionState::Draining) {
            tracing::warn!(session = %self.id, error = %e, "Cannot drain session");
        }

        if !reason.runs_final_analysis() {
            abandon(in_flight);
            return self.terminate(SessionState::Closed, reason, None);
        }

        if let Some(job) = in_flight {
            let Some((joined, latency)) = self.finish(job).await else {
                return self.terminate(SessionState::Closed, CloseReason::Cancelled, None);
            };
            if let Err(failure) = self.complete(joined, latency) {
                return self.terminate(SessionState::Errored, failure, None);
            }
        }

        let mut final_result = None;
        if !self.buffer.is_empty() {
            let job = self.spawn_analysis(true);
            let Some((joined, latency)) = self.finish(job).await else {
                return self.terminate(SessionState::Closed, CloseReason::Cancelled, None);
            };
            match self.complete(joined, latency) {
                Ok(result) => final_result = Some(result),
                Err(failure) => return self.terminate(SessionState::Errored, failure, None),
            }
        }

        self.terminate(SessionState::Closed, reason, final_result)
    }

    /// Wait for a job unless a cancel arrives first
    async fn finish(
        &mut self,
        mut job: InFlight,
    ) -> Option<(std::result::Result<SwingAnalysisResult, JoinError>, Duration)> {
        tokio::select! {
            biased;

            _ = cancel_requested(&mut self.cancel) => {
                tracing::debug!(session = %self.id, "Cancelled while draining");
                job.handle.abort();
                None
            }
            joined = &mut job.handle => Some((joined, job.started.elapsed())),
        }
    }

    fn terminate(
        &mut self,
        state: SessionState,
        reason: CloseReason,
        final_result: Option<SwingAnalysisResult>,
    ) -> TerminalRecord {
        if let Err(e) = self.transition(state) {
            tracing::warn!(session = %self.id, error = %e, "Forcing terminal state");
            self.state = state;
            self.stats.state = state;
        }
        self.publish();

        TerminalRecord {
            session_id: self.id,
            user_id: self.user_id,
            club: self.club,
            state: self.state,
            reason,
            closed_at: Timestamp::now(),
            stats: self.stats.clone(),
            final_result,
        }
    }

    fn transition(&mut self, next: SessionState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let from = std::mem::replace(&mut self.state, next);
        self.stats.state = next;
        tracing::debug!(session = %self.id, %from, to = %next, "Session state changed");
        self.emit(SessionEvent::StateChanged {
            session_id: self.id,
            from,
            to: next,
        });
        Ok(())
    }

    fn emit(&mut self, event: SessionEvent) {
        match self.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.stats.events_dropped += 1;
                tracing::warn!(session = %self.id, "Event queue full; event dropped");
            }
            // Consumer went away; the session keeps running until closed
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    fn publish(&mut self) {
        self.stats.buffered_frames = self.buffer.len();
        self.stats.frames_dropped = self.buffer.dropped();
        self.stats.effective_stride = self.effective_stride;
        self.stats_tx.send_replace(self.stats.clone());
    }
}

async fn wait_for(
    in_flight: &mut Option<InFlight>,
) -> (std::result::Result<SwingAnalysisResult, JoinError>, Duration) {
    match in_flight {
        Some(job) => {
            let joined = (&mut job.handle).await;
            (joined, job.started.elapsed())
        }
        None => std::future::pending().await,
    }
}

/// Resolves once cancellation is signalled; pending if it never can be
async fn cancel_requested(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|cancelled| *cancelled).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn abandon(in_flight: Option<InFlight>) {
    if let Some(job) = in_flight {
        // Blocking jobs run to completion; the result is discarded
        job.handle.abort();
    }
}
