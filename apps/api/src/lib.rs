//! Job-outreach prospecting pipeline: web search and LLM extraction, email
//! resolution, drafted outreach with paced sending, and the per-session
//! orchestrator behind the HTTP API and the CLI.

pub mod config;
pub mod errors;
pub mod extract;
pub mod llm_client;
pub mod models;
pub mod orchestrator;
pub mod outreach;
pub mod resolution;
pub mod routes;
pub mod search;
pub mod services;
pub mod state;
pub mod throttle;
