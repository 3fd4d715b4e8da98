//! Timeline engine: merge and split planning over in-memory tasks.
//!
//! Nothing here touches storage. Each operation takes a snapshot of tasks and
//! returns a plan that the store applies atomically.

use crate::types::{MAX_DURATION, NewTask, TIME_FORMAT, Task, parse_start_time};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Rest inserted after every segment produced by a split, in minutes.
pub const REST_GAP_MINUTES: u32 = 10;

/// Smallest number of tasks a merge accepts.
pub const MIN_MERGE_TASKS: usize = 2;

/// Smallest number of parts a split accepts.
pub const MIN_SPLIT_COUNT: u32 = 2;

/// Largest number of parts a split accepts.
pub const MAX_SPLIT_COUNT: u32 = 100;

/// Field replacements applied to the surviving task of a merge.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MergeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of a merge: one task to update, the rest to delete.
#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    /// Chronologically earliest input task, carrying the summed duration
    pub survivor: Task,
    /// Ids of every other input task, in chronological order
    pub removed: Vec<i64>,
}

/// Outcome of a split: the shortened original plus the tasks to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitPlan {
    /// Original task (same id) with its duration cut to one part
    pub original: Task,
    /// Parts 2..=n, not yet persisted
    pub new_tasks: Vec<NewTask>,
    /// Minutes lost to integer division
    pub remainder_minutes: u32,
}

/// Errors raised by the timeline engine. All of them are caller errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineError {
    /// Fewer than two tasks supplied to a merge.
    TooFewTasks(usize),
    /// Merged duration would exceed the longest allowed block.
    DurationOverflow(u64),
    /// Split count below two.
    SplitCountTooSmall(u32),
    /// Split count above the part limit.
    SplitCountTooLarge(u32),
    /// Split would produce zero-minute parts.
    SplitTooFine { duration: u32, split_count: u32 },
    /// Stored start time could not be parsed.
    InvalidStartTime(String),
}

impl std::fmt::Display for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimelineError::TooFewTasks(n) => {
                write!(f, "at least {} tasks required (got {})", MIN_MERGE_TASKS, n)
            }
            TimelineError::DurationOverflow(total) => write!(
                f,
                "merged duration of {} minutes exceeds {} minutes",
                total, MAX_DURATION
            ),
            TimelineError::SplitCountTooSmall(n) => {
                write!(f, "split count must be at least {} (got {})", MIN_SPLIT_COUNT, n)
            }
            TimelineError::SplitCountTooLarge(n) => {
                write!(f, "split count must be at most {} (got {})", MAX_SPLIT_COUNT, n)
            }
            TimelineError::SplitTooFine { duration, split_count } => write!(
                f,
                "cannot split a {} minute task into {} parts of at least one minute",
                duration, split_count
            ),
            TimelineError::InvalidStartTime(t) => write!(f, "invalid start time '{}'", t),
        }
    }
}

impl std::error::Error for TimelineError {}

/// Merge tasks into the chronologically earliest one.
///
/// Tasks are ordered by `(date, start_time)` with a stable sort, so ties keep
/// the order in which they were passed. The survivor's duration is the plain
/// sum of all durations; gaps between the original blocks are not counted.
/// A task passed more than once counts once.
pub fn merge(mut tasks: Vec<Task>, overrides: &MergeOverrides) -> Result<MergePlan, TimelineError> {
    let mut seen = HashSet::new();
    tasks.retain(|t| seen.insert(t.id));

    if tasks.len() < MIN_MERGE_TASKS {
        return Err(TimelineError::TooFewTasks(tasks.len()));
    }

    let total: u64 = tasks.iter().map(|t| u64::from(t.duration)).sum();
    let total = u32::try_from(total)
        .ok()
        .filter(|t| *t <= MAX_DURATION)
        .ok_or(TimelineError::DurationOverflow(total))?;

    // Vec::sort_by is stable
    tasks.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let mut rest = tasks.into_iter();
    let first = rest.next().ok_or(TimelineError::TooFewTasks(0))?;
    let removed: Vec<i64> = rest.map(|t| t.id).collect();

    let survivor = Task {
        duration: total,
        title: overrides.title.clone().unwrap_or(first.title),
        location: overrides.location.clone().unwrap_or(first.location),
        description: overrides.description.clone().unwrap_or(first.description),
        ..first
    };

    Ok(MergePlan { survivor, removed })
}

/// Split a task into `split_count` equal parts separated by rest gaps.
///
/// The original keeps its id and start time. Part `i` (1-based, `i >= 1`)
/// starts `i * (part + REST_GAP_MINUTES)` minutes after the original start and
/// is titled `"{title} ({i + 1})"`. Remainder minutes are dropped. Start times
/// wrap past midnight without changing the date.
pub fn split(task: &Task, split_count: u32) -> Result<SplitPlan, TimelineError> {
    if split_count < MIN_SPLIT_COUNT {
        return Err(TimelineError::SplitCountTooSmall(split_count));
    }
    if split_count > MAX_SPLIT_COUNT {
        return Err(TimelineError::SplitCountTooLarge(split_count));
    }
    if split_count > task.duration {
        return Err(TimelineError::SplitTooFine {
            duration: task.duration,
            split_count,
        });
    }

    let part = task.duration / split_count;
    let remainder_minutes = task.duration % split_count;

    let stride = u64::from(part) + u64::from(REST_GAP_MINUTES);

    let mut new_tasks = Vec::new();
    for i in 1..split_count {
        new_tasks.push(NewTask {
            date: task.date.clone(),
            start_time: shift_time(&task.start_time, stride * u64::from(i))?,
            duration: part,
            title: format!("{} ({})", task.title, i + 1),
            location: task.location.clone(),
            description: task.description.clone(),
        });
    }

    let original = Task {
        duration: part,
        ..task.clone()
    };

    Ok(SplitPlan {
        original,
        new_tasks,
        remainder_minutes,
    })
}

/// Shift an `HH:MM` time by a number of minutes, wrapping at midnight.
pub fn shift_time(start_time: &str, minutes: u64) -> Result<String, TimelineError> {
    let start =
        parse_start_time(start_time).map_err(|_| TimelineError::InvalidStartTime(start_time.to_string()))?;
    Ok(advance(start, minutes).format(TIME_FORMAT).to_string())
}

fn advance(time: NaiveTime, minutes: u64) -> NaiveTime {
    // Whole days are discarded
    let minutes = minutes % MINUTES_PER_DAY;
    time.overflowing_add_signed(Duration::minutes(minutes as i64)).0
}

const MINUTES_PER_DAY: u64 = 24 * 60;
