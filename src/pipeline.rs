//! The summarize pipeline: load pending tasks, ask the agent for a summary
//! (or build one locally when the agent is out of quota), then post it to
//! the chat channel.

use crate::agent::{AgentError, Summarizer};
use crate::fallback::{fallback_summary, is_fallback};
use crate::notify::{ChatPayload, Notifier, NotifyError};
use crate::prompt::render_task_list;
use crate::storage::{Storage, StorageError};
use chrono::{DateTime, FixedOffset, Local, TimeZone};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// `M/D/YYYY, H:MM:SS AM` as shown in the message footer.
const FOOTER_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No pending todos to summarize")]
    NoPendingTasks,
    #[error("failed to load pending todos: {0}")]
    Storage(#[from] StorageError),
    #[error("summarization failed: {0}")]
    Summarizer(AgentError),
    /// The summary was produced but could not be posted.
    #[error("failed to deliver summary: {source}")]
    Delivery {
        summary: String,
        #[source]
        source: NotifyError,
    },
}

/// Zone that due dates are bucketed and rendered in.
///
/// Any chrono zone whose offsets are plain [`FixedOffset`]s qualifies, which
/// covers [`Local`] as well as [`FixedOffset`] itself. The zone is kept as a
/// whole rather than as the offset in effect "now", so midnight a few days
/// out is computed with whatever offset applies on that day.
pub trait ReferenceZone: TimeZone<Offset = FixedOffset> + Send + Sync + 'static {}

impl<Tz> ReferenceZone for Tz where Tz: TimeZone<Offset = FixedOffset> + Send + Sync + 'static {}

/// Source of "now". Injected so tests can pin the date buckets and footer.
pub trait Clock<Tz: ReferenceZone = Local>: Send + Sync {
    fn now(&self) -> DateTime<Tz>;
}

/// Wall clock in the server's local zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Result of a delivered summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutcome {
    pub summary: String,
    pub used_fallback: bool,
    pub task_count: usize,
}

pub struct SummaryPipeline<Tz: ReferenceZone = Local> {
    storage: Arc<Storage>,
    summarizer: Arc<dyn Summarizer>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock<Tz>>,
    title: String,
}

impl<Tz: ReferenceZone> SummaryPipeline<Tz> {
    pub fn new(
        storage: Arc<Storage>,
        summarizer: Arc<dyn Summarizer>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock<Tz>>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            summarizer,
            notifier,
            clock,
            title: title.into(),
        }
    }

    /// Summarize pending tasks (all users, or one) and post the result.
    pub async fn run(&self, user_id: Option<&str>) -> Result<SummaryOutcome, PipelineError> {
        info!(user = user_id.unwrap_or("all users"), "generating summary");

        let tasks = self.storage.pending(user_id)?;
        if tasks.is_empty() {
            return Err(PipelineError::NoPendingTasks);
        }
        info!(pending = tasks.len(), "loaded pending todos");

        let now = self.clock.now();
        let task_list = render_task_list(&tasks, &now.timezone());

        let summary = match self.summarizer.summarize(&task_list).await {
            Ok(text) => text.trim().to_string(),
            Err(err) if err.is_quota_exhausted() => {
                warn!(error = %err, "summarizer out of quota, using fallback summary");
                fallback_summary(&tasks, &now)
            }
            Err(err) => return Err(PipelineError::Summarizer(err)),
        };

        let sent_at = self.clock.now().format(FOOTER_TIME_FORMAT).to_string();
        let payload = ChatPayload::new(self.title.clone(), summary.clone(), &sent_at);
        if let Err(source) = self.notifier.send(&payload).await {
            warn!(error = %source, "chat delivery failed");
            return Err(PipelineError::Delivery { summary, source });
        }
        info!("summary posted to chat");

        Ok(SummaryOutcome {
            used_fallback: is_fallback(&summary),
            summary,
            task_count: tasks.len(),
        })
    }
}
