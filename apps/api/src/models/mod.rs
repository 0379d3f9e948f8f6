pub mod prospect;
pub mod run;

pub use prospect::{Company, Prospect, SenderProfile};
pub use run::{Delivery, DeliveryStatus, RunPhase, RunStatus};
