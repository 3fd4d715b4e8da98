//! Core data types for the blockcal calendar.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage format for task dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Storage format for task start times.
pub const TIME_FORMAT: &str = "%H:%M";

/// Duration given to tasks created without one, in minutes.
pub const DEFAULT_DURATION: u32 = 45;

/// Longest block a task may occupy, in minutes (one day).
pub const MAX_DURATION: u32 = 24 * 60;

/// Maximum length of a user-supplied title in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Maximum location length in characters.
pub const MAX_LOCATION_LEN: usize = 200;

/// A single time block on the calendar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Store-assigned identifier, never reused
    pub id: i64,

    /// Calendar date, `YYYY-MM-DD`
    pub date: String,

    /// Time of day, `HH:MM` (24-hour)
    pub start_time: String,

    /// Length in minutes, 1..=MAX_DURATION
    pub duration: u32,

    pub title: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,

    /// When created
    #[serde(skip, default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last mutation
    #[serde(skip, default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Chronological ordering key. Plain string comparison is valid because
    /// both fields are fixed-width.
    pub fn sort_key(&self) -> (&str, &str) {
        (&self.date, &self.start_time)
    }

    /// Validate the task's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.date,
            &self.start_time,
            self.duration,
            &self.title,
            &self.location,
        )?;

        if self.updated_at < self.created_at {
            return Err(ValidationError::InvalidTimestamp);
        }

        Ok(())
    }
}

/// Payload for creating a task. The store assigns the id and timestamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTask {
    pub date: String,
    pub start_time: String,

    #[serde(default = "default_duration")]
    pub duration: u32,

    pub title: String,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub description: String,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION
}

impl NewTask {
    /// Create a payload with the default duration and empty optional fields.
    pub fn new(date: impl Into<String>, start_time: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            start_time: start_time.into(),
            duration: DEFAULT_DURATION,
            title: title.into(),
            location: String::new(),
            description: String::new(),
        }
    }

    /// Set the duration in minutes.
    pub fn with_duration(mut self, duration: u32) -> Self {
        self.duration = duration;
        self
    }

    /// Set the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate the payload's fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            &self.date,
            &self.start_time,
            self.duration,
            &self.title,
            &self.location,
        )?;
        validate_title_len(&self.title)
    }
}

/// Partial update. Absent fields keep their current values.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TaskPatch {
    /// Check the fields only a caller can supply. The merged result is
    /// validated as a whole by `Task::validate`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) => validate_title_len(title),
            None => Ok(()),
        }
    }

    /// Apply the patch on top of an existing task. Does not touch `id` or timestamps.
    pub fn apply(self, task: Task) -> Task {
        Task {
            date: self.date.unwrap_or(task.date),
            start_time: self.start_time.unwrap_or(task.start_time),
            duration: self.duration.unwrap_or(task.duration),
            title: self.title.unwrap_or(task.title),
            location: self.location.unwrap_or(task.location),
            description: self.description.unwrap_or(task.description),
            ..task
        }
    }
}

/// Validation errors for task fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    InvalidDate(String),
    InvalidStartTime(String),
    ZeroDuration,
    DurationTooLong(u32),
    EmptyTitle,
    TitleTooLong,
    InvalidCharacters,
    LocationTooLong,
    InvalidTimestamp,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidDate(date) => write!(f, "invalid date '{}': expected YYYY-MM-DD", date),
            ValidationError::InvalidStartTime(time) => {
                write!(f, "invalid start time '{}': expected HH:MM", time)
            }
            ValidationError::ZeroDuration => write!(f, "duration must be greater than 0"),
            ValidationError::DurationTooLong(d) => {
                write!(f, "duration {} exceeds {} minutes", d, MAX_DURATION)
            }
            ValidationError::EmptyTitle => write!(f, "title cannot be empty"),
            ValidationError::TitleTooLong => write!(f, "title exceeds {} characters", MAX_TITLE_LEN),
            ValidationError::InvalidCharacters => write!(f, "title contains control characters"),
            ValidationError::LocationTooLong => write!(f, "location exceeds {} characters", MAX_LOCATION_LEN),
            ValidationError::InvalidTimestamp => write!(f, "updated_at cannot be before created_at"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Parse a canonical `YYYY-MM-DD` date. Non-padded forms are rejected so that
/// string ordering stays chronological.
pub fn parse_date(date: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(date, DATE_FORMAT)
        .ok()
        .filter(|d| d.format(DATE_FORMAT).to_string() == date)
        .ok_or_else(|| ValidationError::InvalidDate(date.to_string()))
}

/// Parse a canonical `HH:MM` time of day.
pub fn parse_start_time(time: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(time, TIME_FORMAT)
        .ok()
        .filter(|t| t.format(TIME_FORMAT).to_string() == time)
        .ok_or_else(|| ValidationError::InvalidStartTime(time.to_string()))
}

fn validate_fields(
    date: &str,
    start_time: &str,
    duration: u32,
    title: &str,
    location: &str,
) -> Result<(), ValidationError> {
    parse_date(date)?;
    parse_start_time(start_time)?;

    if duration == 0 {
        return Err(ValidationError::ZeroDuration);
    }
    if duration > MAX_DURATION {
        return Err(ValidationError::DurationTooLong(duration));
    }

    // Title: required, no control characters. Length is only checked on
    // caller input since split suffixes may push a stored title past it.
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    if title.chars().any(|c| c.is_control()) {
        return Err(ValidationError::InvalidCharacters);
    }

    if location.chars().count() > MAX_LOCATION_LEN {
        return Err(ValidationError::LocationTooLong);
    }

    Ok(())
}

/// Titles typed in by a caller are limited to `MAX_TITLE_LEN` characters.
pub fn validate_title_len(title: &str) -> Result<(), ValidationError> {
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}
