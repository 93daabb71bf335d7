//! Task records and the request shapes used to create and patch them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::value::StrDeserializer;
use serde::de::IntoDeserializer;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Task priority. Serialized lowercase (`"low"`, `"medium"`, `"high"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Sort weight used by the priority ordering; unset tasks rank below `Low`.
    fn rank(priority: Option<Priority>) -> u8 {
        match priority {
            Some(Priority::High) => 3,
            Some(Priority::Medium) => 2,
            Some(Priority::Low) => 1,
            None => 0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_wire_name(s)
    }
}

/// A todo item as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Build a task from a creation request. The id and timestamps are
    /// assigned by the caller (normally the store).
    pub fn from_new(id: String, new: NewTask, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: new.title.trim().to_string(),
            description: new.description,
            completed: new.completed.unwrap_or(false),
            priority: new.priority,
            due_date: new.due_date,
            user_id: new.user_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update. Fields absent from the patch are left alone.
    pub fn apply(&mut self, patch: TaskPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(user_id) = patch.user_id {
            self.user_id = user_id;
        }
        self.updated_at = now;
    }

    pub fn is_pending(&self) -> bool {
        !self.completed
    }
}

/// Body of `POST /todos`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "optional_priority")]
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "optional_due_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub user_id: Option<String>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

/// Body of `PUT /todos/:id`.
///
/// The outer `Option` tells whether a field was sent at all; for optional
/// task fields the inner `Option` is `None` when the client sent `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_blank_as_none")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default, deserialize_with = "present_priority")]
    pub priority: Option<Option<Priority>>,
    #[serde(default, deserialize_with = "present_due_date")]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "present_blank_as_none")]
    pub user_id: Option<Option<String>>,
}

/// Which tasks `GET /todos` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Active => !task.completed,
            StatusFilter::Completed => task.completed,
        }
    }
}

/// Ordering applied to task listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "date-desc")]
    NewestFirst,
    #[serde(rename = "date-asc")]
    OldestFirst,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "due-date")]
    DueDate,
}

impl SortOrder {
    /// Sort in place. Ties keep their relative order.
    pub fn sort(&self, tasks: &mut [Task]) {
        match self {
            SortOrder::NewestFirst => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::OldestFirst => tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Priority => {
                tasks.sort_by(|a, b| Priority::rank(b.priority).cmp(&Priority::rank(a.priority)))
            }
            SortOrder::DueDate => tasks.sort_by(|a, b| match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }),
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_wire_name(s)
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        from_wire_name(s)
    }
}

/// Parse a unit enum from the same name it has on the wire, so CLI flags
/// and query strings accept exactly what serde does.
fn from_wire_name<'de, T: Deserialize<'de>>(name: &'de str) -> Result<T, String> {
    let deserializer: StrDeserializer<'de, serde::de::value::Error> = name.into_deserializer();
    T::deserialize(deserializer).map_err(|e| e.to_string())
}

/// Parse a due date as sent by clients: either a full RFC 3339 timestamp or
/// a bare `YYYY-MM-DD` date, which is taken as midnight UTC.
pub fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("invalid due date '{raw}'"))
}

// Web forms send "" for untouched inputs.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn priority_from(value: Option<String>) -> Result<Option<Priority>, String> {
    non_blank(value).map(|s| s.parse()).transpose()
}

fn due_date_from(value: Option<String>) -> Result<Option<DateTime<Utc>>, String> {
    non_blank(value).map(|s| parse_due_date(&s)).transpose()
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(non_blank)
}

fn optional_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: Deserializer<'de>,
{
    priority_from(Option::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

fn optional_due_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    due_date_from(Option::deserialize(deserializer)?).map_err(serde::de::Error::custom)
}

// The `present_*` helpers only run when the field is in the body, so they
// always wrap their result in `Some`.

fn present_blank_as_none<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    blank_as_none(deserializer).map(Some)
}

fn present_priority<'de, D>(deserializer: D) -> Result<Option<Option<Priority>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_priority(deserializer).map(Some)
}

fn present_due_date<'de, D>(deserializer: D) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_due_date(deserializer).map(Some)
}
