use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use assess_core::model::{
    ActivityDefinition, ActivityId, ActivityKind, AttemptId, OptionId, SessionId,
    SubmissionResult, UnitId,
};
use assess_core::time::whole_secs_between;
use assess_core::{Clock, Ledger, NavigationCursor, PacingTimer, Recorded, Tick};

use super::progress::{SessionProgress, SessionSnapshot};
use crate::content::ContentFormat;
use crate::error::{ContentError, Rejection, SessionError};
use crate::scoring::{SubmissionCoordinator, SubmissionPayload};

//
// ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
//

/// Lifecycle phase of a session.
///
/// ```text
/// Loading -> Ready -> InProgress <-> Submitting -> Completed
///    |                    |              |
///    +-> Failed           +--------------+-> Redirected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    Loading,
    Ready,
    InProgress,
    Submitting,
    Completed,
    /// Content could not be loaded. Only a full retry leaves this phase.
    Failed,
    /// Credentials were rejected; the shell has been asked to re-authenticate.
    Redirected,
}

impl SessionPhase {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::Completed | SessionPhase::Failed | SessionPhase::Redirected
        )
    }
}

/// Identifies one network request issued by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(u64);

/// Content fetch the host must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub token: RequestToken,
    pub activity_id: ActivityId,
    pub hint: Option<ContentFormat>,
}

/// Scoring call the host must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub token: RequestToken,
    pub activity_id: ActivityId,
    pub payload: SubmissionPayload,
}

/// Network work requested by a controller transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Fetch(LoadRequest),
    Submit(SubmitRequest),
}

/// Requests to the hosting shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellSignal {
    /// Route to the results view for this attempt.
    ShowResults(AttemptId),
    LessonFinished,
    RedirectToLogin,
}

/// How a session reached `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Scored(Arc<SubmissionResult>),
    LessonFinished { slides: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    SubmissionFailed,
    RefreshFailed,
    TimeUp,
}

/// Inline, dismissible message that does not interrupt the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl SessionNotice {
    fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

struct Attempt {
    definition: Arc<ActivityDefinition>,
    cursor: NavigationCursor,
    ledger: Ledger,
}

/// Owns one learner's attempt at one activity.
///
/// The controller performs no I/O. Transitions that need the network hand back
/// a [`LoadRequest`] or [`SubmitRequest`]; the host runs it and feeds the outcome
/// to [`finish_load`](Self::finish_load) / [`finish_submit`](Self::finish_submit).
/// Outcomes whose token is not the one outstanding are discarded, so at most one
/// request per purpose is ever applied.
pub struct SessionController {
    id: SessionId,
    activity_id: ActivityId,
    hint: Option<ContentFormat>,
    clock: Clock,
    phase: SessionPhase,
    attempt: Option<Attempt>,
    timer: PacingTimer,
    last_token: u64,
    pending_load: Option<RequestToken>,
    pending_submit: Option<RequestToken>,
    submit_attempts: u32,
    notice: Option<SessionNotice>,
    failure: Option<SessionError>,
    rejection: Option<SessionError>,
    completion: Option<Completion>,
    signals: Vec<ShellSignal>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl SessionController {
    #[must_use]
    pub fn new(activity_id: ActivityId, hint: Option<ContentFormat>, clock: Clock) -> Self {
        Self {
            id: SessionId::generate(),
            activity_id,
            hint,
            clock,
            phase: SessionPhase::Loading,
            attempt: None,
            timer: PacingTimer::default(),
            last_token: 0,
            pending_load: None,
            pending_submit: None,
            submit_attempts: 0,
            notice: None,
            failure: None,
            rejection: None,
            completion: None,
            signals: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn activity_id(&self) -> &ActivityId {
        &self.activity_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn definition(&self) -> Option<&Arc<ActivityDefinition>> {
        self.attempt.as_ref().map(|a| &a.definition)
    }

    #[must_use]
    pub fn ledger(&self) -> Option<&Ledger> {
        self.attempt.as_ref().map(|a| &a.ledger)
    }

    #[must_use]
    pub fn cursor(&self) -> Option<NavigationCursor> {
        self.attempt.as_ref().map(|a| a.cursor)
    }

    #[must_use]
    pub fn timer(&self) -> &PacingTimer {
        &self.timer
    }

    /// Whether the host should be delivering one-second ticks.
    #[must_use]
    pub fn timer_armed(&self) -> bool {
        self.phase == SessionPhase::InProgress && self.timer.is_armed()
    }

    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    #[must_use]
    pub fn notice(&self) -> Option<&SessionNotice> {
        self.notice.as_ref()
    }

    #[must_use]
    pub fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn submit_attempts(&self) -> u32 {
        self.submit_attempts
    }

    /// Drains signals raised since the last call.
    pub fn take_signals(&mut self) -> Vec<ShellSignal> {
        std::mem::take(&mut self.signals)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Issues the content fetch. `None` unless `Loading` with no fetch in flight.
    pub fn begin_load(&mut self) -> Option<LoadRequest> {
        if self.phase != SessionPhase::Loading || self.pending_load.is_some() {
            debug!(phase = ?self.phase, "load not issued");
            return None;
        }
        Some(self.load_request())
    }

    fn load_request(&mut self) -> LoadRequest {
        let token = self.issue_token();
        self.pending_load = Some(token);
        LoadRequest {
            token,
            activity_id: self.activity_id.clone(),
            hint: self.hint,
        }
    }

    /// Applies a content fetch outcome.
    pub fn finish_load(
        &mut self,
        token: RequestToken,
        outcome: Result<ActivityDefinition, ContentError>,
    ) {
        if self.pending_load != Some(token) {
            warn!(?token, "discarding stale content response");
            return;
        }
        self.pending_load = None;

        match self.phase {
            SessionPhase::Loading => self.apply_initial_load(outcome),
            SessionPhase::InProgress => self.apply_refresh(outcome),
            phase => debug!(?phase, "content arrived after the session moved on"),
        }
    }

    fn apply_initial_load(&mut self, outcome: Result<ActivityDefinition, ContentError>) {
        let definition = match outcome {
            Ok(definition) => definition,
            Err(ContentError::Unauthorized) => return self.redirect(),
            Err(err) => return self.fail(err.into()),
        };
        let ledger = match Ledger::for_definition(&definition) {
            Ok(ledger) => ledger,
            Err(err) => {
                return self.fail(SessionError::ContentUnavailable {
                    status: None,
                    message: Some(err.to_string()),
                });
            }
        };

        info!(
            kind = %definition.kind(),
            units = definition.units().len(),
            "activity loaded"
        );
        self.timer = PacingTimer::new(definition.pacing_secs().unwrap_or(0));
        self.attempt = Some(Attempt {
            cursor: NavigationCursor::new(definition.units().len()),
            ledger,
            definition: Arc::new(definition),
        });
        self.phase = SessionPhase::Ready;
        self.enter_in_progress();
    }

    fn apply_refresh(&mut self, outcome: Result<ActivityDefinition, ContentError>) {
        let definition = match outcome {
            Ok(definition) => definition,
            Err(ContentError::Unauthorized) => return self.redirect(),
            Err(err) => {
                warn!(error = %err, "lesson refresh failed; keeping current content");
                self.notice = Some(SessionNotice::new(NoticeKind::RefreshFailed, err.to_string()));
                return;
            }
        };
        let Some(attempt) = self.attempt.as_mut() else {
            return;
        };
        if definition.kind() != ActivityKind::Lesson {
            warn!(kind = %definition.kind(), "refresh changed activity kind; ignoring");
            self.notice = Some(SessionNotice::new(
                NoticeKind::RefreshFailed,
                "refreshed content is no longer a lesson",
            ));
            return;
        }

        attempt.cursor = attempt.cursor.resized(definition.units().len());
        self.timer.reset(definition.pacing_secs().unwrap_or(0));
        if !self.timer.is_armed() {
            self.timer.arm();
        }
        attempt.definition = Arc::new(definition);
        info!(remaining = self.timer.remaining_secs(), "lesson content refreshed");
    }

    /// Re-fetches a lesson's content mid-session, replacing the definition wholesale.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress` and
    /// `Rejection::WrongActivityKind` for quizzes and puzzles, whose ledgers
    /// are bound to the loaded definition.
    pub fn refresh(&mut self) -> Result<Option<LoadRequest>, SessionError> {
        let attempt = self.active_attempt_mut("refresh")?;
        if attempt.definition.kind() != ActivityKind::Lesson {
            return Err(Rejection::WrongActivityKind.into());
        }
        if self.pending_load.is_some() {
            return Ok(None);
        }
        Ok(Some(self.load_request()))
    }

    // ── Interaction ──────────────────────────────────────────────────

    /// Records an answer; `Ok(false)` if the question was already answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress` and
    /// `SessionError::ValidationRejected` for non-quiz activities or unknown ids.
    pub fn select_answer(
        &mut self,
        question: &UnitId,
        option: &OptionId,
    ) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("select an answer")?;
        let Ledger::Answers(answers) = &mut attempt.ledger else {
            return Err(Rejection::WrongActivityKind.into());
        };
        match answers.record(question, option)? {
            Recorded::Accepted => {
                debug!(%question, %option, "answer recorded");
                Ok(true)
            }
            Recorded::AlreadyAnswered => {
                debug!(%question, "question already answered; first answer stands");
                Ok(false)
            }
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress` and
    /// `Rejection::WrongActivityKind` for non-puzzle activities.
    pub fn move_up(&mut self, index: usize) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("reorder")?;
        let Ledger::Order(order) = &mut attempt.ledger else {
            return Err(Rejection::WrongActivityKind.into());
        };
        Ok(order.move_up(index))
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress` and
    /// `Rejection::WrongActivityKind` for non-puzzle activities.
    pub fn move_down(&mut self, index: usize) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("reorder")?;
        let Ledger::Order(order) = &mut attempt.ledger else {
            return Err(Rejection::WrongActivityKind.into());
        };
        Ok(order.move_down(index))
    }

    /// Moves forward one unit. Past the last slide of a lesson this completes it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`.
    pub fn go_next(&mut self) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("advance")?;
        if attempt.cursor.advance() {
            return Ok(true);
        }
        if attempt.definition.kind() == ActivityKind::Lesson {
            self.finish_lesson();
            return Ok(true);
        }
        Ok(false)
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`.
    pub fn go_previous(&mut self) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("go back")?;
        Ok(attempt.cursor.retreat())
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`.
    pub fn jump_to(&mut self, index: usize) -> Result<bool, SessionError> {
        let attempt = self.active_attempt_mut("jump")?;
        Ok(attempt.cursor.jump_to(index))
    }

    pub fn dismiss_notice(&mut self) -> bool {
        self.notice.take().is_some()
    }

    pub fn note_rejection(&mut self, err: SessionError) {
        self.rejection = Some(err);
    }

    pub fn clear_rejection(&mut self) {
        self.rejection = None;
    }

    /// Advances the pacing timer by one second. Ignored outside `InProgress`.
    pub fn tick(&mut self) -> Tick {
        if self.phase != SessionPhase::InProgress {
            return Tick::Ignored;
        }
        let tick = self.timer.tick();
        if tick == Tick::Expired {
            info!("pacing time is up");
            if self.notice.is_none() {
                self.notice = Some(SessionNotice::new(NoticeKind::TimeUp, "time is up"));
            }
        }
        tick
    }

    // ── Submission ───────────────────────────────────────────────────

    /// Starts the scoring round-trip.
    ///
    /// A second call while `Submitting` returns `Ok(None)` without issuing another
    /// request. Lessons complete locally from their last slide.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` outside `InProgress`/`Submitting` and
    /// `SessionError::ValidationRejected` for an incomplete quiz or a lesson that
    /// is not on its last slide.
    pub fn submit(&mut self) -> Result<Option<SubmitRequest>, SessionError> {
        if self.phase == SessionPhase::Submitting {
            debug!("submission already in flight; ignoring");
            return Ok(None);
        }
        let attempt = self.active_attempt_mut("submit")?;
        if attempt.definition.kind() == ActivityKind::Lesson {
            if !attempt.cursor.is_last() {
                return Err(Rejection::NotOnFinalUnit.into());
            }
            self.finish_lesson();
            return Ok(None);
        }
        let payload = SubmissionCoordinator::prepare(&attempt.ledger)?;

        let token = self.issue_token();
        self.pending_submit = Some(token);
        self.submit_attempts += 1;
        self.phase = SessionPhase::Submitting;
        self.timer.disarm();
        self.notice = None;
        info!(attempt = self.submit_attempts, "submitting");

        Ok(Some(SubmitRequest {
            token,
            activity_id: self.activity_id.clone(),
            payload,
        }))
    }

    /// Applies a scoring outcome. On failure the ledger is left exactly as it was.
    pub fn finish_submit(
        &mut self,
        token: RequestToken,
        outcome: Result<SubmissionResult, SessionError>,
    ) {
        if self.phase != SessionPhase::Submitting || self.pending_submit != Some(token) {
            warn!(?token, "discarding stale scoring response");
            return;
        }
        self.pending_submit = None;

        match outcome {
            Ok(result) => {
                let attempt_id = result.attempt_id().clone();
                self.complete(
                    Completion::Scored(Arc::new(result)),
                    ShellSignal::ShowResults(attempt_id),
                );
            }
            Err(SessionError::Unauthorized) => self.redirect(),
            Err(err) => {
                warn!(error = %err, "submission failed; answers kept for retry");
                self.notice = Some(SessionNotice::new(NoticeKind::SubmissionFailed, err.to_string()));
                self.enter_in_progress();
            }
        }
    }

    /// Retries whatever failed last: a full reload from `Failed`, or the
    /// submission from `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidPhase` in `Loading`, `Ready`, `Completed`
    /// and `Redirected`, plus any error from [`submit`](Self::submit).
    pub fn retry(&mut self) -> Result<Option<Effect>, SessionError> {
        match self.phase {
            SessionPhase::Failed => {
                info!("retrying activity load");
                self.phase = SessionPhase::Loading;
                self.failure = None;
                self.attempt = None;
                Ok(self.begin_load().map(Effect::Fetch))
            }
            SessionPhase::InProgress | SessionPhase::Submitting => {
                Ok(self.submit()?.map(Effect::Submit))
            }
            phase => Err(SessionError::InvalidPhase {
                phase,
                action: "retry",
            }),
        }
    }

    // ── Views ────────────────────────────────────────────────────────

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let Some(attempt) = self.attempt.as_ref() else {
            return SessionProgress::default();
        };
        let total = attempt.definition.units().len();
        match &attempt.ledger {
            Ledger::Lesson => {
                let done = self.phase == SessionPhase::Completed;
                let viewed = if done { total } else { attempt.cursor.index() + 1 };
                SessionProgress::new(total, viewed, done)
            }
            Ledger::Answers(answers) => SessionProgress::new(
                answers.total(),
                answers.answered_count(),
                answers.is_complete(),
            ),
            Ledger::Order(order) => SessionProgress::new(total, order.len(), true),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let attempt = self.attempt.as_ref();
        let current_unit =
            attempt.and_then(|a| a.definition.unit(a.cursor.index()).cloned());
        let selected_option = attempt.zip(current_unit.as_ref()).and_then(|(a, unit)| {
            a.ledger
                .as_answers()
                .and_then(|answers| answers.answer_for(unit.id()).cloned())
        });

        SessionSnapshot {
            session_id: self.id,
            activity_id: self.activity_id.clone(),
            phase: self.phase,
            kind: attempt.map(|a| a.definition.kind()),
            title: attempt.map(|a| a.definition.title().to_owned()),
            unit_index: attempt.map_or(0, |a| a.cursor.index()),
            unit_count: attempt.map_or(0, |a| a.cursor.len()),
            current_unit,
            selected_option,
            order: attempt
                .and_then(|a| a.ledger.as_order())
                .map(|order| order.order().to_vec()),
            remaining_secs: (self.timer.duration_secs() > 0).then(|| self.timer.remaining_secs()),
            timer_armed: self.timer_armed(),
            progress: self.progress(),
            submit_attempts: self.submit_attempts,
            notice: self.notice.clone(),
            failure: self.failure.clone(),
            rejection: self.rejection.clone(),
            completion: self.completion.clone(),
            started_at: self.started_at,
            completed_at: self.completed_at,
            elapsed_secs: self.started_at.map(|start| match self.completed_at {
                Some(end) => whole_secs_between(start, end),
                None => self.clock.secs_since(start),
            }),
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn issue_token(&mut self) -> RequestToken {
        self.last_token += 1;
        RequestToken(self.last_token)
    }

    fn active_attempt_mut(&mut self, action: &'static str) -> Result<&mut Attempt, SessionError> {
        let phase = self.phase;
        if phase != SessionPhase::InProgress {
            return Err(SessionError::InvalidPhase { phase, action });
        }
        self.attempt
            .as_mut()
            .ok_or(SessionError::InvalidPhase { phase, action })
    }

    fn enter_in_progress(&mut self) {
        self.phase = SessionPhase::InProgress;
        if self.started_at.is_none() {
            self.started_at = Some(self.clock.now());
        }
        if self.timer.arm() {
            info!(remaining = self.timer.remaining_secs(), "pacing timer armed");
        }
    }

    fn finish_lesson(&mut self) {
        // Lessons pass through Submitting without a network call.
        self.phase = SessionPhase::Submitting;
        let slides = self
            .attempt
            .as_ref()
            .map_or(0, |a| a.definition.units().len());
        self.complete(Completion::LessonFinished { slides }, ShellSignal::LessonFinished);
    }

    fn complete(&mut self, completion: Completion, signal: ShellSignal) {
        self.timer.disarm();
        self.phase = SessionPhase::Completed;
        self.completed_at = Some(self.clock.now());
        self.completion = Some(completion);
        self.notice = None;
        self.signals.push(signal);
        info!("session completed");
    }

    fn fail(&mut self, err: SessionError) {
        warn!(error = %err, "activity could not be loaded");
        self.timer.disarm();
        self.phase = SessionPhase::Failed;
        self.failure = Some(err);
    }

    fn redirect(&mut self) {
        warn!("credentials rejected; asking shell to re-authenticate");
        self.timer.disarm();
        self.pending_load = None;
        self.pending_submit = None;
        self.phase = SessionPhase::Redirected;
        self.signals.push(ShellSignal::RedirectToLogin);
    }
}

impl fmt::Debug for SessionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionController")
            .field("id", &self.id)
            .field("activity_id", &self.activity_id)
            .field("phase", &self.phase)
            .field("cursor", &self.cursor())
            .field("timer", &self.timer)
            .field("pending_load", &self.pending_load)
            .field("pending_submit", &self.pending_submit)
            .field("submit_attempts", &self.submit_attempts)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
