//! Rule-based summary used when the language model is out of quota.
//!
//! Tasks are tallied by priority and bucketed by how close their due date is
//! to "today" (the reference instant truncated to midnight in its own zone).
//! The boundary rules mix raw and truncated comparisons:
//!
//! - overdue: due instant strictly before midnight today
//! - due today / due tomorrow: due date, truncated to midnight, equals the
//!   boundary
//! - due this week: due instant strictly after midnight tomorrow and no later
//!   than midnight seven days from today
//! - other: no due date
//!
//! A task due tomorrow at any time other than midnight therefore lands in
//! both "Due Tomorrow" and "Due This Week".

use crate::task::{Priority, Task};
use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use std::fmt::Write;

/// Closing line of every fallback summary. Callers detect fallback mode by
/// looking for this text, so it must stay stable.
pub const FALLBACK_MARKER: &str =
    "*Note: This summary was generated using the fallback system due to language model quota limits.*";

/// Whether `summary` came from [`fallback_summary`].
pub fn is_fallback(summary: &str) -> bool {
    summary.contains(FALLBACK_MARKER)
}

/// Per-priority counts over a task set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityTally {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityTally {
    pub fn count(tasks: &[Task]) -> Self {
        let mut tally = Self::default();
        for task in tasks {
            match task.priority {
                Some(Priority::High) => tally.high += 1,
                Some(Priority::Medium) => tally.medium += 1,
                Some(Priority::Low) => tally.low += 1,
                None => {}
            }
        }
        tally
    }
}

/// Tasks grouped by due-date proximity. Each vector keeps input order.
#[derive(Debug, Default)]
pub struct DueBuckets<'a> {
    pub overdue: Vec<&'a Task>,
    pub today: Vec<&'a Task>,
    pub tomorrow: Vec<&'a Task>,
    pub this_week: Vec<&'a Task>,
    pub other: Vec<&'a Task>,
}

impl<'a> DueBuckets<'a> {
    pub fn classify<Tz: TimeZone>(tasks: &'a [Task], now: &DateTime<Tz>) -> Self {
        let tz = now.timezone();
        let today_date = now.date_naive();
        let today = start_of_day(today_date, &tz);
        let tomorrow = start_of_day(today_date + Days::new(1), &tz);
        let next_week = start_of_day(today_date + Days::new(7), &tz);

        let mut buckets = Self::default();
        for task in tasks {
            let Some(due) = task.due_date else {
                buckets.other.push(task);
                continue;
            };
            let due_day = start_of_day(due.with_timezone(&tz).date_naive(), &tz);

            if due < today {
                buckets.overdue.push(task);
            }
            if due_day == today {
                buckets.today.push(task);
            }
            if due_day == tomorrow {
                buckets.tomorrow.push(task);
            }
            if due > tomorrow && due <= next_week {
                buckets.this_week.push(task);
            }
        }
        buckets
    }

    fn dated_sections(&self) -> [(&'static str, &[&'a Task]); 4] {
        [
            ("Overdue Tasks", self.overdue.as_slice()),
            ("Due Today", self.today.as_slice()),
            ("Due Tomorrow", self.tomorrow.as_slice()),
            ("Due This Week", self.this_week.as_slice()),
        ]
    }
}

/// Build the fallback summary for `tasks` as of `now`.
///
/// Every dated section is followed by a blank line; "Other Tasks" is not, so
/// the marker sits one blank line below it but two below a dated section.
pub fn fallback_summary<Tz: TimeZone>(tasks: &[Task], now: &DateTime<Tz>) -> String {
    let tally = PriorityTally::count(tasks);
    let buckets = DueBuckets::classify(tasks, now);

    let mut out = String::from("*Todo Summary*\n\n");
    out.push_str("*Overview:*\n");
    let _ = writeln!(
        out,
        "You have {} pending tasks: {} high priority, {} medium priority, and {} low priority.\n",
        tasks.len(),
        tally.high,
        tally.medium,
        tally.low
    );

    for (label, members) in buckets.dated_sections() {
        if !members.is_empty() {
            write_section(&mut out, label, members);
            out.push('\n');
        }
    }
    if !buckets.other.is_empty() {
        write_section(&mut out, "Other Tasks", &buckets.other);
    }

    out.push('\n');
    out.push_str(FALLBACK_MARKER);
    out
}

fn write_section(out: &mut String, label: &str, members: &[&Task]) {
    let _ = writeln!(out, "*{label} ({}):*", members.len());
    for task in members {
        let flag = if task.priority == Some(Priority::High) {
            " (High Priority)"
        } else {
            ""
        };
        let _ = writeln!(out, "• {}{flag}", task.title);
    }
}

/// Midnight at the start of `date` in `tz`, as a UTC instant.
fn start_of_day<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        // Zones that skip midnight for DST have no local 00:00 that day.
        .unwrap_or_else(|| midnight.and_utc())
}
