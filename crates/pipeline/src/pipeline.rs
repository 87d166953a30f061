use crate::{
    config::PipelineConfig,
    error::{PipelineError, Result},
    retriever::Retriever,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use vault_suggest_protocol::{Suggestion, TriggerSource, TriggerSpan};
use vault_suggest_search::{CandidateResolver, DocumentLookup};

/// Triggers queued for the session loop before `try_submit` reports `Busy`.
pub const COMMAND_CAPACITY: usize = 64;

/// Identifies one suggestion session; newer sessions carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SessionToken(u64);

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A query typed, selected or bracketed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerEvent {
    pub query: String,
    pub source: TriggerSource,
}

impl TriggerEvent {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            source: TriggerSource::Query,
        }
    }

    pub fn selection(text: impl Into<String>) -> Self {
        Self {
            query: text.into(),
            source: TriggerSource::Selection,
        }
    }

    #[must_use]
    pub fn inline(span: TriggerSpan) -> Self {
        Self {
            query: span.query.clone(),
            source: TriggerSource::Inline(span),
        }
    }

    fn is_empty(&self) -> bool {
        self.query.trim().is_empty()
    }
}

/// Suggestions delivered for one session
#[derive(Debug, Clone, Serialize)]
pub struct SuggestionBatch {
    pub session: SessionToken,
    pub query: String,
    pub source: TriggerSource,
    pub suggestions: Vec<Suggestion>,
    /// Set when retrieval failed; the batch is then empty
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SuggestionBatch {
    fn empty(session: SessionToken, event: TriggerEvent) -> Self {
        Self {
            session,
            query: event.query,
            source: event.source,
            suggestions: Vec::new(),
            error: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No session is waiting or running
    Idle,
    /// Waiting for the debounce window to elapse
    Pending,
    /// Retrieval and resolution in flight
    Resolving,
}

/// How the last finished session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub session: Option<SessionToken>,
    pub last_outcome: Option<SessionOutcome>,
    /// Trigger events received, including empty queries
    pub triggers: u64,
    pub retrievals: u64,
    pub delivered: u64,
    pub cancelled: u64,
    pub last_error: Option<String>,
    pub last_duration_ms: Option<u64>,
}

impl PipelineStatus {
    const fn initial() -> Self {
        Self {
            state: PipelineState::Idle,
            session: None,
            last_outcome: None,
            triggers: 0,
            retrievals: 0,
            delivered: 0,
            cancelled: 0,
            last_error: None,
            last_duration_ms: None,
        }
    }
}

/// Debounced, cancellable retrieval and resolution of suggestions.
///
/// Triggers restart the quiet window. When the window elapses the latest query is
/// retrieved and resolved in a background task. Any newer trigger supersedes the
/// running session, whose results are dropped instead of delivered.
#[derive(Clone)]
pub struct SuggestionPipeline {
    inner: Arc<SuggestionPipelineInner>,
}

struct SuggestionPipelineInner {
    command_tx: mpsc::Sender<PipelineCommand>,
    batch_tx: broadcast::Sender<SuggestionBatch>,
    status_tx: watch::Sender<PipelineStatus>,
}

enum PipelineCommand {
    Trigger(TriggerEvent),
    Shutdown,
}

struct Completed {
    session: SessionToken,
    batch: SuggestionBatch,
    duration: Duration,
}

impl SuggestionPipeline {
    /// Spawn the session loop on the current tokio runtime.
    pub fn start<C>(
        retriever: Arc<dyn Retriever>,
        resolver: Arc<CandidateResolver<C>>,
        auth_token: impl Into<String>,
        config: PipelineConfig,
    ) -> Self
    where
        C: DocumentLookup + 'static,
    {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, _) = watch::channel(PipelineStatus::initial());
        let (batch_tx, _) = broadcast::channel(32);

        spawn_session_loop(
            SessionContext {
                retriever,
                resolver,
                auth_token: Arc::from(auth_token.into()),
                max_suggestions: config.max_suggestions,
            },
            config,
            command_rx,
            batch_tx.clone(),
            status_tx.clone(),
        );

        Self {
            inner: Arc::new(SuggestionPipelineInner {
                command_tx,
                batch_tx,
                status_tx,
            }),
        }
    }

    pub async fn submit(&self, event: TriggerEvent) -> Result<()> {
        self.inner
            .command_tx
            .send(PipelineCommand::Trigger(event))
            .await
            .map_err(|_| PipelineError::Closed)
    }

    /// Non-blocking submit for synchronous callers such as key handlers.
    /// A full queue is `Busy`; the caller may drop the keystroke or retry.
    pub fn try_submit(&self, event: TriggerEvent) -> Result<()> {
        self.inner
            .command_tx
            .try_send(PipelineCommand::Trigger(event))
            .map_err(|err| match err {
                TrySendError::Full(_) => PipelineError::Busy,
                TrySendError::Closed(_) => PipelineError::Closed,
            })
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SuggestionBatch> {
        self.inner.batch_tx.subscribe()
    }

    /// Run `callback` for every delivered batch until the pipeline shuts down
    pub fn on_batch<F>(&self, mut callback: F) -> JoinHandle<()>
    where
        F: FnMut(SuggestionBatch) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(batch) => callback(batch),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Suggestion subscriber lagged, skipped {skipped} batches");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    #[must_use]
    pub fn status(&self) -> PipelineStatus {
        self.inner.status_tx.borrow().clone()
    }

    #[must_use]
    pub fn status_stream(&self) -> watch::Receiver<PipelineStatus> {
        self.inner.status_tx.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.inner.command_tx.send(PipelineCommand::Shutdown).await;
    }
}

impl Drop for SuggestionPipeline {
    fn drop(&mut self) {
        if Arc::strong_count(&self.inner) == 1 {
            let _ = self.inner.command_tx.try_send(PipelineCommand::Shutdown);
        }
    }
}

struct SessionContext<C> {
    retriever: Arc<dyn Retriever>,
    resolver: Arc<CandidateResolver<C>>,
    auth_token: Arc<str>,
    max_suggestions: usize,
}

impl<C> Clone for SessionContext<C> {
    fn clone(&self) -> Self {
        Self {
            retriever: self.retriever.clone(),
            resolver: self.resolver.clone(),
            auth_token: self.auth_token.clone(),
            max_suggestions: self.max_suggestions,
        }
    }
}

impl<C: DocumentLookup> SessionContext<C> {
    async fn run(&self, session: SessionToken, event: TriggerEvent) -> SuggestionBatch {
        let candidates = match self.retriever.retrieve(&event.query, &self.auth_token).await {
            Ok(candidates) => candidates,
            Err(err) => {
                warn!("Retrieval failed for session {session}: {err}");
                let mut batch = SuggestionBatch::empty(session, event);
                batch.error = Some(err.to_string());
                return batch;
            }
        };

        let mut candidates = candidates;
        candidates.truncate(self.max_suggestions);
        let suggestions = self.resolver.resolve_all(candidates).await;

        SuggestionBatch {
            session,
            query: event.query,
            source: event.source,
            suggestions,
            error: None,
        }
    }
}

fn spawn_session_loop<C>(
    context: SessionContext<C>,
    config: PipelineConfig,
    mut command_rx: mpsc::Receiver<PipelineCommand>,
    batch_tx: broadcast::Sender<SuggestionBatch>,
    status_tx: watch::Sender<PipelineStatus>,
) where
    C: DocumentLookup + 'static,
{
    tokio::spawn(async move {
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completed>();
        let mut sessions = SessionState::new(config.debounce);
        let mut status = PipelineStatus::initial();

        loop {
            let next_deadline = sessions.next_deadline();

            tokio::select! {
                cmd = command_rx.recv() => {
                    if matches!(cmd, Some(PipelineCommand::Trigger(_))) {
                        status.triggers += 1;
                    }
                    match cmd {
                        Some(PipelineCommand::Trigger(event)) if event.is_empty() => {
                            if sessions.cancel_running() {
                                status.cancelled += 1;
                            }
                            let session = sessions.abandon_pending();
                            debug!("Empty query, delivering empty batch for session {session}");
                            let _ = batch_tx.send(SuggestionBatch::empty(session, event));
                            status.delivered += 1;
                            status.last_outcome = Some(SessionOutcome::Delivered);
                        }
                        Some(PipelineCommand::Trigger(event)) => {
                            if sessions.cancel_running() {
                                status.cancelled += 1;
                                status.last_outcome = Some(SessionOutcome::Cancelled);
                            }
                            let session = sessions.schedule(event);
                            debug!("Session {session} pending");
                        }
                        Some(PipelineCommand::Shutdown) | None => break,
                    }
                }
                Some(done) = done_rx.recv() => {
                    if !sessions.complete(done.session) {
                        debug!("Dropping results of superseded session {}", done.session);
                        continue;
                    }
                    status.last_duration_ms = Some(saturating_millis(done.duration));
                    match &done.batch.error {
                        Some(err) => status.last_error = Some(err.clone()),
                        None => status.last_error = None,
                    }
                    info!(
                        "Session {} delivered {} suggestions in {:?}",
                        done.session,
                        done.batch.suggestions.len(),
                        done.duration
                    );
                    let _ = batch_tx.send(done.batch);
                    status.delivered += 1;
                    status.last_outcome = Some(SessionOutcome::Delivered);
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if next_deadline.is_some() => {
                    if let Some((session, event)) = sessions.fire() {
                        debug!("Session {session} resolving {:?}", event.query);
                        status.retrievals += 1;
                        spawn_session(context.clone(), session, event, done_tx.clone());
                    }
                }
            }

            status.state = sessions.state();
            status.session = sessions.current();
            status_tx.send_replace(status.clone());
        }

        debug!("Suggestion pipeline stopped");
    });
}

fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn spawn_session<C>(
    context: SessionContext<C>,
    session: SessionToken,
    event: TriggerEvent,
    done_tx: mpsc::UnboundedSender<Completed>,
) where
    C: DocumentLookup + 'static,
{
    tokio::spawn(async move {
        let started = Instant::now();
        let batch = context.run(session, event).await;
        let _ = done_tx.send(Completed {
            session,
            batch,
            duration: started.elapsed(),
        });
    });
}

struct PendingSession {
    token: SessionToken,
    event: TriggerEvent,
    deadline: Instant,
}

/// Session bookkeeping owned by the loop: at most one pending and one running session.
struct SessionState {
    debounce: Duration,
    next_token: u64,
    pending: Option<PendingSession>,
    running: Option<SessionToken>,
}

impl SessionState {
    const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            next_token: 0,
            pending: None,
            running: None,
        }
    }

    fn issue(&mut self) -> SessionToken {
        self.next_token += 1;
        SessionToken(self.next_token)
    }

    /// Start or restart the quiet window with `event`
    fn schedule(&mut self, event: TriggerEvent) -> SessionToken {
        let token = self.issue();
        self.pending = Some(PendingSession {
            token,
            event,
            deadline: Instant::now() + self.debounce,
        });
        token
    }

    /// Forget the running session; its results will be dropped
    fn cancel_running(&mut self) -> bool {
        match self.running.take() {
            Some(token) => {
                debug!("Session {token} cancelled");
                true
            }
            None => false,
        }
    }

    /// Drop any pending session and hand out a token for an immediate delivery
    fn abandon_pending(&mut self) -> SessionToken {
        self.pending = None;
        self.issue()
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    fn fire(&mut self) -> Option<(SessionToken, TriggerEvent)> {
        let pending = self.pending.take()?;
        self.running = Some(pending.token);
        Some((pending.token, pending.event))
    }

    /// Whether a finished session is still the one the caller is waiting for
    fn complete(&mut self, token: SessionToken) -> bool {
        if self.running == Some(token) {
            self.running = None;
            true
        } else {
            false
        }
    }

    const fn state(&self) -> PipelineState {
        if self.pending.is_some() {
            PipelineState::Pending
        } else if self.running.is_some() {
            PipelineState::Resolving
        } else {
            PipelineState::Idle
        }
    }

    fn current(&self) -> Option<SessionToken> {
        self.pending
            .as_ref()
            .map(|pending| pending.token)
            .or(self.running)
    }
}
