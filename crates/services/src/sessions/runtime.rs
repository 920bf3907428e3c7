//! Drives a [`SessionController`] on its own task.
//!
//! Each open session is a single tokio task that owns the controller. Commands,
//! network completions and timer ticks are applied one at a time, so every
//! transition sees a consistent state. After each step the task publishes a
//! fresh [`SessionSnapshot`] and forwards any [`ShellSignal`]s.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinError, JoinHandle, JoinSet};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info_span, warn, Instrument};

use assess_core::model::{ActivityDefinition, ActivityId, OptionId, SessionId, SubmissionResult, UnitId};
use assess_core::Clock;

use super::controller::{Effect, RequestToken, SessionController, ShellSignal};
use super::progress::SessionSnapshot;
use crate::config::ServiceConfig;
use crate::content::{ContentFormat, ContentSource, HttpContentSource};
use crate::error::{ContentError, SessionError};
use crate::http::build_client;
use crate::scoring::{HttpScoringClient, ScoringClient, SubmissionCoordinator};

/// Interval between pacing timer ticks.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Learner intents accepted by a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    SelectAnswer { question: UnitId, option: OptionId },
    MoveUp(usize),
    MoveDown(usize),
    Next,
    Previous,
    JumpTo(usize),
    Submit,
    Retry,
    Refresh,
    DismissNotice,
}

/// Opens sessions against a content source and a scoring client.
#[derive(Clone)]
pub struct SessionRuntime {
    content: Arc<dyn ContentSource>,
    coordinator: SubmissionCoordinator,
    clock: Clock,
    tick_period: Duration,
}

impl SessionRuntime {
    #[must_use]
    pub fn new(
        content: Arc<dyn ContentSource>,
        scoring: Arc<dyn ScoringClient>,
        clock: Clock,
    ) -> Self {
        Self {
            content,
            coordinator: SubmissionCoordinator::new(scoring),
            clock,
            tick_period: TICK_PERIOD,
        }
    }

    /// HTTP-backed runtime sharing one client between content and scoring.
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn from_config(config: &ServiceConfig, clock: Clock) -> Result<Self, reqwest::Error> {
        let client = build_client(config)?;
        let content = HttpContentSource::with_client(client.clone(), config.clone());
        let scoring = HttpScoringClient::with_client(client, config.clone());
        Ok(Self::new(Arc::new(content), Arc::new(scoring), clock))
    }

    #[must_use]
    pub fn with_tick_period(mut self, tick_period: Duration) -> Self {
        self.tick_period = tick_period;
        self
    }

    /// Starts a session and begins loading its content.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open(&self, activity_id: ActivityId, hint: Option<ContentFormat>) -> SessionHandle {
        let controller = SessionController::new(activity_id, hint, self.clock);
        let id = controller.id();
        let span = info_span!("session", session = %id, activity = %controller.activity_id());

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());

        let driver = SessionDriver {
            controller,
            content: Arc::clone(&self.content),
            coordinator: self.coordinator.clone(),
            commands: command_rx,
            snapshots: snapshot_tx,
            signals: signal_tx,
            inflight: JoinSet::new(),
            pending: HashMap::new(),
            tick_period: self.tick_period,
        };
        let task = tokio::spawn(driver.run().instrument(span));

        SessionHandle {
            id,
            commands: command_tx,
            snapshots: snapshot_rx,
            signals: signal_rx,
            task,
        }
    }
}

//
// ─── DRIVER ────────────────────────────────────────────────────────────────────
//

enum NetworkOutcome {
    Loaded(RequestToken, Result<ActivityDefinition, ContentError>),
    Scored(RequestToken, Result<SubmissionResult, SessionError>),
}

/// What a network task was issued for, so a task that dies can still be answered.
#[derive(Debug, Clone, Copy)]
enum InFlight {
    Load(RequestToken),
    Submit(RequestToken),
}

struct SessionDriver {
    controller: SessionController,
    content: Arc<dyn ContentSource>,
    coordinator: SubmissionCoordinator,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    signals: mpsc::UnboundedSender<ShellSignal>,
    inflight: JoinSet<NetworkOutcome>,
    pending: HashMap<task::Id, InFlight>,
    tick_period: Duration,
}

impl SessionDriver {
    async fn run(mut self) {
        if let Some(request) = self.controller.begin_load() {
            self.spawn_effect(Effect::Fetch(request));
        }
        self.publish();

        let mut ticker = time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut was_armed = false;

        loop {
            let armed = self.controller.timer_armed();
            if armed && !was_armed {
                // First tick lands one full period after arming.
                ticker.reset();
            }
            was_armed = armed;

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.apply(command),
                    None => {
                        debug!("session handle dropped");
                        return;
                    }
                },
                Some(joined) = self.inflight.join_next_with_id() => match joined {
                    Ok((id, outcome)) => {
                        self.pending.remove(&id);
                        self.complete(outcome);
                    }
                    Err(err) => self.abandon(&err),
                },
                _ = ticker.tick(), if armed => {
                    self.controller.tick();
                }
            }

            self.publish();
        }
    }

    fn apply(&mut self, command: SessionCommand) {
        debug!(?command, "applying command");
        let controller = &mut self.controller;
        let outcome = match command {
            SessionCommand::SelectAnswer { question, option } => {
                controller.select_answer(&question, &option).map(|_| None)
            }
            SessionCommand::MoveUp(index) => controller.move_up(index).map(|_| None),
            SessionCommand::MoveDown(index) => controller.move_down(index).map(|_| None),
            SessionCommand::Next => controller.go_next().map(|_| None),
            SessionCommand::Previous => controller.go_previous().map(|_| None),
            SessionCommand::JumpTo(index) => controller.jump_to(index).map(|_| None),
            SessionCommand::Submit => controller.submit().map(|request| request.map(Effect::Submit)),
            SessionCommand::Retry => controller.retry(),
            SessionCommand::Refresh => controller.refresh().map(|request| request.map(Effect::Fetch)),
            SessionCommand::DismissNotice => {
                controller.dismiss_notice();
                Ok(None)
            }
        };

        match outcome {
            Ok(effect) => {
                self.controller.clear_rejection();
                if let Some(effect) = effect {
                    self.spawn_effect(effect);
                }
            }
            Err(err) => {
                debug!(error = %err, "command rejected");
                self.controller.note_rejection(err);
            }
        }
    }

    fn spawn_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Fetch(request) => {
                let content = Arc::clone(&self.content);
                let token = request.token;
                let handle = self.inflight.spawn(
                    async move {
                        let outcome = content
                            .fetch_activity(&request.activity_id, request.hint)
                            .await;
                        NetworkOutcome::Loaded(request.token, outcome)
                    }
                    .in_current_span(),
                );
                self.pending.insert(handle.id(), InFlight::Load(token));
            }
            Effect::Submit(request) => {
                let coordinator = self.coordinator.clone();
                let token = request.token;
                let handle = self.inflight.spawn(
                    async move {
                        let outcome = coordinator
                            .submit(&request.activity_id, &request.payload)
                            .await;
                        NetworkOutcome::Scored(request.token, outcome)
                    }
                    .in_current_span(),
                );
                self.pending.insert(handle.id(), InFlight::Submit(token));
            }
        }
    }

    fn complete(&mut self, outcome: NetworkOutcome) {
        match outcome {
            NetworkOutcome::Loaded(token, result) => self.controller.finish_load(token, result),
            NetworkOutcome::Scored(token, result) => self.controller.finish_submit(token, result),
        }
    }

    /// Answers the request of a task that panicked or was cancelled as a failure.
    fn abandon(&mut self, err: &JoinError) {
        warn!(error = %err, "network task did not finish");
        match self.pending.remove(&err.id()) {
            Some(InFlight::Load(token)) => self
                .controller
                .finish_load(token, Err(ContentError::Aborted(err.to_string()))),
            Some(InFlight::Submit(token)) => self.controller.finish_submit(
                token,
                Err(SessionError::SubmissionFailed(format!(
                    "scoring request aborted: {err}"
                ))),
            ),
            None => debug!(task = %err.id(), "no request recorded for task"),
        }
    }

    fn publish(&mut self) {
        for signal in self.controller.take_signals() {
            // The shell may have stopped listening; snapshots still carry the outcome.
            let _ = self.signals.send(signal);
        }
        self.snapshots.send_replace(self.controller.snapshot());
    }
}

//
// ─── HANDLE ────────────────────────────────────────────────────────────────────
//

/// Shell-side handle to a running session.
///
/// Dropping the handle stops the session; responses still in flight are discarded.
pub struct SessionHandle {
    id: SessionId,
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    signals: mpsc::UnboundedReceiver<ShellSignal>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn send(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| SessionError::Closed)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn select_answer(&self, question: UnitId, option: OptionId) -> Result<(), SessionError> {
        self.send(SessionCommand::SelectAnswer { question, option })
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn reorder_up(&self, index: usize) -> Result<(), SessionError> {
        self.send(SessionCommand::MoveUp(index))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn reorder_down(&self, index: usize) -> Result<(), SessionError> {
        self.send(SessionCommand::MoveDown(index))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn go_next(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Next)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn go_previous(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Previous)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn jump_to(&self, index: usize) -> Result<(), SessionError> {
        self.send(SessionCommand::JumpTo(index))
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn submit(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Submit)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn retry(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Retry)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn refresh(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::Refresh)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session task has stopped.
    pub fn dismiss_notice(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::DismissNotice)
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for the first snapshot matching `predicate`, the current one included.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Closed` if the session stops first.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(predicate)
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok((*snapshot).clone())
    }

    pub async fn next_signal(&mut self) -> Option<ShellSignal> {
        self.signals.recv().await
    }

    pub fn try_next_signal(&mut self) -> Option<ShellSignal> {
        self.signals.try_recv().ok()
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
