// Outreach: drafting personalized messages and transmitting them with pacing.
// Drafting goes through llm_client; transmission through the MailTransport trait.

pub mod agent;
pub mod compose;
pub mod prompts;

pub use agent::{OutreachAgent, SendOptions};
