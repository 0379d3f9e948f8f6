//! Per-session run state and the in-memory session store.
//!
//! State sits behind a `std::sync::Mutex`. Guards are never held across an
//! `.await`: every method here locks, reads or mutates, and releases.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::models::{Company, Delivery, DeliveryStatus, Prospect, RunPhase, RunStatus, SenderProfile};

/// Everything one run holds. Mutated only by the orchestrator.
#[derive(Debug, Default)]
pub struct SessionState {
    pub phase: RunPhase,
    pub profile: SenderProfile,
    pub companies: Vec<Company>,
    pub prospects: Vec<Prospect>,
    /// Latest delivery per prospect, index-aligned with `prospects`.
    pub deliveries: Vec<Option<Delivery>>,
    pub current_step: Option<String>,
    pub last_error: Option<String>,
    pub dry_run: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub(crate) cancel: Option<CancellationToken>,
}

impl SessionState {
    /// Indices a bulk send would process: resolved prospects not yet
    /// delivered for real.
    pub fn sendable_indices(&self) -> Vec<usize> {
        self.prospects
            .iter()
            .enumerate()
            .filter(|(_, p)| p.has_email())
            .filter(|(idx, _)| {
                !self
                    .deliveries
                    .get(*idx)
                    .and_then(Option::as_ref)
                    .is_some_and(Delivery::is_delivered)
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn delivery(&self, index: usize) -> Option<&Delivery> {
        self.deliveries.get(index).and_then(Option::as_ref)
    }

    pub fn record(&mut self, delivery: Delivery) {
        if self.deliveries.len() < self.prospects.len() {
            self.deliveries.resize(self.prospects.len(), None);
        }
        if let Some(slot) = self.deliveries.get_mut(delivery.index) {
            *slot = Some(delivery);
        }
    }

    fn count_deliveries(&self, status: DeliveryStatus) -> usize {
        self.deliveries
            .iter()
            .flatten()
            .filter(|d| d.status == status)
            .count()
    }

    pub fn status(&self) -> RunStatus {
        RunStatus {
            phase: self.phase,
            companies_found: self.companies.len(),
            total_prospects: self.prospects.len(),
            emails_found: self.prospects.iter().filter(|p| p.has_email()).count(),
            emails_sent: self.count_deliveries(DeliveryStatus::Sent),
            emails_failed: self.count_deliveries(DeliveryStatus::Failed),
            is_processing: self.phase.is_processing(),
            current_step: self.current_step.clone(),
            dry_run: self.dry_run,
            can_send: self.phase == RunPhase::Ready && !self.sendable_indices().is_empty(),
        }
    }

    /// Clears results and counters for a fresh run.
    pub fn clear_results(&mut self) {
        self.companies.clear();
        self.prospects.clear();
        self.deliveries.clear();
        self.current_step = None;
        self.last_error = None;
        self.dry_run = false;
        self.started_at = None;
        self.finished_at = None;
    }
}

/// One user's isolated run.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Locks the state. A poisoned lock still yields the data: every
    /// mutation is a plain field write, so there is no half-applied update.
    pub fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Consistent snapshot of counters and phase.
    pub fn status(&self) -> RunStatus {
        self.lock().status()
    }

    pub fn set_step(&self, step: impl Into<String>) {
        self.lock().current_step = Some(step.into());
    }

    pub fn prospects(&self) -> Vec<Prospect> {
        self.lock().prospects.clone()
    }

    pub fn prospect(&self, index: usize) -> Option<(Prospect, Option<Delivery>)> {
        let state = self.lock();
        state
            .prospects
            .get(index)
            .map(|p| (p.clone(), state.delivery(index).cloned()))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory sessions keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<Session>>> {
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new());
        self.map().insert(session.id(), session.clone());
        session
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.map().get(&id).cloned()
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<Session>> {
        self.map().remove(&id)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prospect(first: &str, email: Option<&str>) -> Prospect {
        let mut p = Prospect::new(first, "Doe", "Acme");
        p.email = email.map(str::to_string);
        p
    }

    fn delivery(index: usize, status: DeliveryStatus, dry_run: bool) -> Delivery {
        Delivery {
            index,
            email: Some("x@acme.com".into()),
            status,
            detail: String::new(),
            dry_run,
            subject: None,
            body: None,
        }
    }

    fn ready_state() -> SessionState {
        let mut state = SessionState {
            phase: RunPhase::Ready,
            prospects: vec![
                prospect("A", Some("a@acme.com")),
                prospect("B", None),
                prospect("C", Some("c@acme.com")),
            ],
            ..SessionState::default()
        };
        state.deliveries = vec![None; 3];
        state
    }

    #[test]
    fn test_sendable_skips_missing_emails_and_real_sends() {
        let mut state = ready_state();
        assert_eq!(state.sendable_indices(), vec![0, 2]);

        state.record(delivery(0, DeliveryStatus::Sent, false));
        assert_eq!(state.sendable_indices(), vec![2]);
    }

    #[test]
    fn test_dry_run_and_failed_deliveries_stay_sendable() {
        let mut state = ready_state();
        state.record(delivery(0, DeliveryStatus::Sent, true));
        state.record(delivery(2, DeliveryStatus::Failed, false));
        assert_eq!(state.sendable_indices(), vec![0, 2]);
    }

    #[test]
    fn test_status_counters_hold_ordering() {
        let mut state = ready_state();
        state.record(delivery(0, DeliveryStatus::Sent, false));
        state.record(delivery(0, DeliveryStatus::Sent, false));
        state.record(delivery(2, DeliveryStatus::Failed, false));

        let status = state.status();
        assert_eq!(status.total_prospects, 3);
        assert_eq!(status.emails_found, 2);
        assert_eq!(status.emails_sent, 1);
        assert_eq!(status.emails_failed, 1);
        assert!(status.emails_sent <= status.emails_found);
        assert!(status.can_send);
    }

    #[test]
    fn test_can_send_requires_ready_phase() {
        let mut state = ready_state();
        state.phase = RunPhase::Done;
        assert!(!state.status().can_send);
    }

    #[test]
    fn test_record_ignores_out_of_range_index() {
        let mut state = ready_state();
        state.record(delivery(7, DeliveryStatus::Sent, false));
        assert_eq!(state.status().emails_sent, 0);
    }

    #[test]
    fn test_store_create_get_remove() {
        let store = SessionStore::new();
        let session = store.create();
        assert_eq!(store.len(), 1);
        assert!(store.get(session.id()).is_some());
        assert!(store.get(Uuid::new_v4()).is_none());
        store.remove(session.id());
        assert!(store.is_empty());
    }

    #[test]
    fn test_status_is_idempotent() {
        let session = Session::new();
        *session.lock() = ready_state();
        assert_eq!(session.status(), session.status());
    }
}
