//! # Tasksumma
//!
//! A todo tracker that can summarize pending tasks with an LLM and post the
//! summary to a team chat channel.
//!
//! ## Features
//!
//! - **Task store**: sled-backed CRUD over HTTP
//! - **Summaries**: OpenAI-compatible agent, with a rule-based fallback when
//!   the account is out of quota
//! - **Chat delivery**: Slack incoming-webhook payloads

pub mod agent;
pub mod config;
pub mod fallback;
pub mod notify;
pub mod pipeline;
pub mod prompt;
pub mod server;
pub mod storage;
pub mod task;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use pipeline::{SummaryOutcome, SummaryPipeline};
pub use storage::Storage;
pub use task::{NewTask, Priority, Task};
