//! Prompt construction for the summarization agent.

use crate::task::Task;
use chrono::TimeZone;
use std::fmt::{Display, Write};

/// Default system persona sent with every summarization request.
pub const DEFAULT_PERSONA: &str = "You are a helpful assistant that creates concise yet informative summaries of todo lists. Group related items, identify priorities, and organize by urgency. Keep the summary professional and actionable.";

/// Render pending tasks as a numbered plain-text list, one line per task:
///
/// `<n>. <title>[ - <description>][ (Priority: <priority>)][ (Due: <date>)]`
///
/// Due dates are shown as `M/D/YYYY` in `tz`.
pub fn render_task_list<Tz>(tasks: &[Task], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    for (index, task) in tasks.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{}. {}", index + 1, task.title);
        if let Some(description) = &task.description {
            let _ = write!(out, " - {description}");
        }
        if let Some(priority) = task.priority {
            let _ = write!(out, " (Priority: {priority})");
        }
        if let Some(due) = task.due_date {
            let _ = write!(out, " (Due: {})", due.with_timezone(tz).format("%-m/%-d/%Y"));
        }
    }
    out
}

/// Wrap the rendered list in the user message.
pub fn user_message(task_list: &str) -> String {
    format!("Please summarize the following list of pending todos:\n\n{task_list}")
}
