use serde::{Deserialize, Serialize};

/// Lifecycle of one session's run.
///
/// `Idle → Searching → ResolvingEmails → Ready → Sending → Done`, with `Idle`
/// reachable again through reset. Bulk sends may only start from `Ready`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Searching,
    ResolvingEmails,
    Ready,
    Sending,
    Done,
}

impl RunPhase {
    pub fn is_processing(self) -> bool {
        matches!(
            self,
            RunPhase::Searching | RunPhase::ResolvingEmails | RunPhase::Sending
        )
    }

    /// A new search may replace whatever the session holds unless work is in flight.
    pub fn accepts_search(self) -> bool {
        !self.is_processing()
    }
}

/// Aggregate counters for a run. Snapshots of this are what front ends see.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatus {
    pub phase: RunPhase,
    pub companies_found: usize,
    pub total_prospects: usize,
    pub emails_found: usize,
    /// Prospects whose latest delivery was sent (or would have been, in a dry run).
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub is_processing: bool,
    pub current_step: Option<String>,
    pub dry_run: bool,
    /// True when a bulk send could be launched right now.
    pub can_send: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
    Skipped,
}

/// Outcome of one generate-and-send attempt for the prospect at `index`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
    pub index: usize,
    pub email: Option<String>,
    pub status: DeliveryStatus,
    pub detail: String,
    pub dry_run: bool,
    pub subject: Option<String>,
    pub body: Option<String>,
}

impl Delivery {
    /// A real transmission that went through. Dry runs never count here.
    pub fn is_delivered(&self) -> bool {
        self.status == DeliveryStatus::Sent && !self.dry_run
    }
}
