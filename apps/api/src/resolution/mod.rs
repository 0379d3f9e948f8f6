// Email resolution: direct finder lookup, guessed-domain fallback, domain-wide
// search, and the confidence threshold every accepted address must clear.

pub mod agent;
pub mod domain;
pub mod validation;

pub use agent::EmailResolver;
