//! Orchestrator — sequences search, email resolution and outreach for one
//! session and owns every phase transition.
//!
//! Phases: Idle → Searching → ResolvingEmails → Ready → Sending → Done.
//! Transitions are check-and-set under the session lock; agent calls happen
//! with the lock released.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::{Config, PipelineSettings};
use crate::llm_client::{LanguageModel, LlmClient};
use crate::models::{Delivery, Prospect, RunPhase, RunStatus, SenderProfile};
use crate::orchestrator::error::RunError;
use crate::orchestrator::session::{Session, SessionState};
use crate::outreach::{OutreachAgent, SendOptions};
use crate::resolution::EmailResolver;
use crate::search::{SearchAgent, SearchMode};
use crate::services::{
    EmailLookup, GmailTransport, HunterClient, MailTransport, SearchService, ServiceError,
    TavilyClient,
};
use crate::throttle::{Backoff, Pacer, RateLimiter, RetryPolicy, ServiceGate, UniformPacer};

/// What to search for. `recency_days` falls back to the configured window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub profile: SenderProfile,
    pub mode: SearchMode,
    pub recency_days: Option<u32>,
}

/// A bulk send that has claimed the session's `Sending` phase.
#[derive(Debug)]
pub struct BulkSend {
    targets: Vec<(usize, Prospect)>,
    sender: SenderProfile,
    options: SendOptions,
    cancel: CancellationToken,
}

impl BulkSend {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub struct Orchestrator {
    search: SearchAgent,
    resolver: EmailResolver,
    outreach: OutreachAgent,
    default_recency_days: u32,
}

impl Orchestrator {
    pub fn new(
        search: SearchAgent,
        resolver: EmailResolver,
        outreach: OutreachAgent,
        default_recency_days: u32,
    ) -> Self {
        Self {
            search,
            resolver,
            outreach,
            default_recency_days,
        }
    }

    /// Wires the production clients: Tavily, Hunter, Anthropic and (when a
    /// token is configured) Gmail, each behind its own gate.
    pub fn from_config(config: &Config) -> Result<Self, ServiceError> {
        let settings = &config.pipeline;

        let search_gate = ServiceGate::new(
            "search",
            RateLimiter::per_second(settings.search_rate_limit),
            RetryPolicy::new(settings.max_retries, settings.retry_delay, Backoff::Fixed),
        );
        let lookup_gate = ServiceGate::new(
            "email_lookup",
            RateLimiter::per_second(settings.lookup_rate_limit),
            RetryPolicy::new(settings.max_retries, settings.retry_delay, Backoff::Linear),
        );

        let search: Arc<dyn SearchService> =
            Arc::new(TavilyClient::new(config.tavily_api_key.clone(), search_gate)?);
        let lookup: Arc<dyn EmailLookup> =
            Arc::new(HunterClient::new(config.hunter_api_key.clone(), lookup_gate)?);
        let model: Arc<dyn LanguageModel> = Arc::new(
            LlmClient::new(config.anthropic_api_key.clone())
                .map_err(ServiceError::from)?,
        );

        let transport: Option<Arc<dyn MailTransport>> = match &config.gmail_access_token {
            Some(token) => Some(Arc::new(GmailTransport::new(
                token.clone(),
                config.gmail_sender.clone(),
            )?)),
            None => {
                warn!("GMAIL_ACCESS_TOKEN not set, only dry runs can send");
                None
            }
        };

        Ok(Self::from_parts(search, lookup, model, transport, settings))
    }

    /// Assembles the agents from service handles.
    pub fn from_parts(
        search: Arc<dyn SearchService>,
        lookup: Arc<dyn EmailLookup>,
        model: Arc<dyn LanguageModel>,
        transport: Option<Arc<dyn MailTransport>>,
        settings: &PipelineSettings,
    ) -> Self {
        let pacer: Arc<dyn Pacer> = Arc::new(UniformPacer::new(
            settings.send_delay_min,
            settings.send_delay_max,
        ));
        Self::with_pacer(search, lookup, model, transport, pacer, settings)
    }

    pub fn with_pacer(
        search: Arc<dyn SearchService>,
        lookup: Arc<dyn EmailLookup>,
        model: Arc<dyn LanguageModel>,
        transport: Option<Arc<dyn MailTransport>>,
        pacer: Arc<dyn Pacer>,
        settings: &PipelineSettings,
    ) -> Self {
        Self::new(
            SearchAgent::new(search, model.clone()),
            EmailResolver::new(lookup, settings.min_email_confidence),
            OutreachAgent::new(model, transport, pacer),
            settings.recency_days,
        )
    }

    pub fn can_transmit(&self) -> bool {
        self.outreach.can_transmit()
    }

    // ────────────────────────────────────────────────────────────────────────
    // Search + resolve
    // ────────────────────────────────────────────────────────────────────────

    /// Runs search then email resolution, replacing whatever the session held.
    /// Any terminal failure returns the session to `Idle` with nothing kept.
    pub async fn search(&self, session: &Session, params: SearchParams) -> Result<RunStatus, RunError> {
        let goal = params.profile.goal.trim().to_string();
        if goal.is_empty() {
            return Err(RunError::Validation("goal is required".to_string()));
        }
        let recency_days = params.recency_days.unwrap_or(self.default_recency_days);

        {
            let mut state = session.lock();
            if !state.phase.accepts_search() {
                return Err(RunError::Busy(format!(
                    "cannot start a search while {:?}",
                    state.phase
                )));
            }
            state.clear_results();
            state.phase = RunPhase::Searching;
            state.profile = params.profile.clone();
            state.started_at = Some(Utc::now());
            state.current_step = Some(format!("Searching for '{goal}'..."));
        }
        let claim = PhaseClaim::new(session, RunPhase::Idle);
        info!("Session {}: searching for '{}'", session.id(), goal);

        let on_step = |step: String| session.set_step(step);

        let outcome = match self
            .search
            .search(&goal, params.mode, recency_days, &on_step)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                claim.release();
                return Err(fail(session, e));
            }
        };

        {
            let mut state = session.lock();
            state.companies = outcome.companies;
            state.prospects = outcome.prospects.clone();
            state.phase = RunPhase::ResolvingEmails;
            state.current_step = Some(format!(
                "Finding emails for {} prospects...",
                outcome.prospects.len()
            ));
        }

        let resolved = match self.resolver.resolve_all(outcome.prospects, &on_step).await {
            Ok(resolved) => resolved,
            Err(e) => {
                claim.release();
                return Err(fail(session, e));
            }
        };

        claim.release();
        let mut state = session.lock();
        let found = resolved.iter().filter(|p| p.has_email()).count();
        state.deliveries = vec![None; resolved.len()];
        state.current_step = Some(format!(
            "Found {} prospects, {} with email",
            resolved.len(),
            found
        ));
        state.prospects = resolved;
        state.phase = RunPhase::Ready;

        info!(
            "Session {}: ready with {} prospects ({} emails)",
            session.id(),
            state.prospects.len(),
            found
        );
        Ok(state.status())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Sending
    // ────────────────────────────────────────────────────────────────────────

    /// Claims the session for a bulk send. Rejects instead of queueing when
    /// the session is busy.
    pub fn begin_send_all(&self, session: &Session, options: SendOptions) -> Result<BulkSend, RunError> {
        let mut state = session.lock();
        self.check_can_send(&state, &options)?;

        let targets: Vec<(usize, Prospect)> = state
            .sendable_indices()
            .into_iter()
            .map(|idx| (idx, state.prospects[idx].clone()))
            .collect();
        if targets.is_empty() {
            return Err(RunError::Validation(
                "no prospects with an email address left to send to".to_string(),
            ));
        }

        let cancel = CancellationToken::new();
        state.phase = RunPhase::Sending;
        state.dry_run = options.dry_run;
        state.cancel = Some(cancel.clone());
        state.finished_at = None;
        state.current_step = Some(format!("Sending {} emails...", targets.len()));

        Ok(BulkSend {
            targets,
            sender: state.profile.clone(),
            options,
            cancel,
        })
    }

    /// Processes a claimed bulk send. Pauses after each real transmission
    /// except the last; cancellation is honoured between prospects and while
    /// pausing.
    pub async fn run_send_all(&self, session: &Session, job: BulkSend) -> RunStatus {
        let claim = PhaseClaim::new(session, RunPhase::Ready);
        let total = job.targets.len();
        let mut processed = 0;
        let mut cancelled = false;

        for (pos, (index, prospect)) in job.targets.iter().enumerate() {
            if job.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            session.set_step(format!(
                "Sending {}/{}: {}",
                pos + 1,
                total,
                prospect.full_name()
            ));
            let delivery = self
                .outreach
                .generate_and_send(*index, prospect, &job.sender, &job.options)
                .await;
            let paced = delivery.is_delivered();
            session.lock().record(delivery);
            processed += 1;

            if paced && pos + 1 < total && !self.outreach.pace(&job.cancel).await {
                cancelled = true;
                break;
            }
        }

        claim.release();
        let mut state = session.lock();
        state.cancel = None;
        if cancelled && processed < total {
            state.phase = RunPhase::Ready;
            state.current_step = Some(format!("Cancelled after {processed} of {total} emails"));
            info!("Session {}: bulk send cancelled after {}/{}", session.id(), processed, total);
        } else {
            state.phase = RunPhase::Done;
            state.finished_at = Some(Utc::now());
            let status = state.status();
            state.current_step = Some(format!(
                "Done: {} sent, {} failed",
                status.emails_sent, status.emails_failed
            ));
            info!(
                "Session {}: bulk send finished ({} sent, {} failed)",
                session.id(),
                status.emails_sent,
                status.emails_failed
            );
        }
        state.status()
    }

    /// Sends to every resolved prospect not yet delivered, in order.
    pub async fn send_all(&self, session: &Session, options: SendOptions) -> Result<RunStatus, RunError> {
        let job = self.begin_send_all(session, options)?;
        Ok(self.run_send_all(session, job).await)
    }

    /// Generates and sends for one prospect, then returns to `Ready`.
    pub async fn send_one(
        &self,
        session: &Session,
        index: usize,
        options: SendOptions,
    ) -> Result<Delivery, RunError> {
        let (prospect, sender) = {
            let mut state = session.lock();
            self.check_can_send(&state, &options)?;
            let prospect = state
                .prospects
                .get(index)
                .cloned()
                .ok_or_else(|| RunError::NotFound(format!("prospect {index}")))?;
            state.phase = RunPhase::Sending;
            state.dry_run = options.dry_run;
            state.current_step = Some(format!("Sending to {}...", prospect.full_name()));
            (prospect, state.profile.clone())
        };
        let claim = PhaseClaim::new(session, RunPhase::Ready);

        let delivery = self
            .outreach
            .generate_and_send(index, &prospect, &sender, &options)
            .await;

        claim.release();
        let mut state = session.lock();
        state.record(delivery.clone());
        state.phase = RunPhase::Ready;
        state.current_step = Some(format!("{}: {}", prospect.full_name(), delivery.detail));
        Ok(delivery)
    }

    fn check_can_send(&self, state: &SessionState, options: &SendOptions) -> Result<(), RunError> {
        if state.phase.is_processing() {
            return Err(RunError::Busy(format!("session is {:?}", state.phase)));
        }
        if state.phase != RunPhase::Ready {
            return Err(RunError::InvalidState(format!(
                "sending requires a completed search (phase is {:?})",
                state.phase
            )));
        }
        if !options.dry_run && !self.outreach.can_transmit() {
            return Err(RunError::Configuration(
                "no mail transport configured; set GMAIL_ACCESS_TOKEN or use a dry run".to_string(),
            ));
        }
        Ok(())
    }

    // ────────────────────────────────────────────────────────────────────────
    // Control
    // ────────────────────────────────────────────────────────────────────────

    pub fn status(&self, session: &Session) -> RunStatus {
        session.status()
    }

    /// Requests cancellation of the running bulk send.
    pub fn cancel(&self, session: &Session) -> Result<RunStatus, RunError> {
        let mut state = session.lock();
        let token = match (state.phase, state.cancel.clone()) {
            (RunPhase::Sending, Some(token)) => token,
            _ => return Err(RunError::InvalidState("no bulk send in progress".to_string())),
        };
        token.cancel();
        state.current_step = Some("Cancelling...".to_string());
        Ok(state.status())
    }

    /// Back to `Idle` with nothing kept.
    pub fn reset(&self, session: &Session) -> Result<RunStatus, RunError> {
        let mut state = session.lock();
        if state.phase.is_processing() {
            return Err(RunError::Busy(format!("cannot reset while {:?}", state.phase)));
        }
        *state = SessionState::default();
        Ok(state.status())
    }
}

/// Holds a claimed processing phase for the duration of one run.
///
/// If the owning future is dropped before `release` (client disconnect,
/// Ctrl-C), the session is rolled back to `rollback` so it never stays busy
/// with nothing driving it. Must not be dropped while the session lock is
/// held.
struct PhaseClaim<'a> {
    session: &'a Session,
    rollback: RunPhase,
    armed: bool,
}

impl<'a> PhaseClaim<'a> {
    fn new(session: &'a Session, rollback: RunPhase) -> Self {
        Self {
            session,
            rollback,
            armed: true,
        }
    }

    fn release(mut self) {
        self.armed = false;
    }
}

impl Drop for PhaseClaim<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.session.lock();
        warn!(
            "Session {}: run dropped while {:?}, rolling back to {:?}",
            self.session.id(),
            state.phase,
            self.rollback
        );
        if self.rollback == RunPhase::Idle {
            state.clear_results();
        }
        state.phase = self.rollback;
        state.cancel = None;
        state.current_step = Some("Interrupted".to_string());
        state.last_error = Some("run was interrupted before completing".to_string());
    }
}

/// Terminal search/resolve failure: back to `Idle`, partial results discarded.
fn fail(session: &Session, e: ServiceError) -> RunError {
    error!("Session {}: run failed: {e}", session.id());
    let mut state = session.lock();
    state.clear_results();
    state.phase = RunPhase::Idle;
    state.last_error = Some(e.to_string());
    RunError::from(e)
}
