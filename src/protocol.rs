//! Message types exchanged between the HTTP layer and the store loop,
//! plus the JSON bodies accepted by the HTTP API.

use crate::store::{SplitResult, StoreError};
use crate::timeline::MergeOverrides;
use crate::types::{NewTask, Task, TaskPatch};
use serde::{Deserialize, Serialize};

/// Split count used when the request body omits one.
pub const DEFAULT_SPLIT_COUNT: i64 = 2;

/// Request sent to the store loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Create a new task.
    Create { task: NewTask },

    /// Get a task by id.
    Get { id: i64 },

    /// List tasks, limited to a date range when both bounds are given.
    List {
        start_date: Option<String>,
        end_date: Option<String>,
    },

    /// Patch an existing task.
    Update { id: i64, patch: TaskPatch },

    /// Delete a task.
    Delete { id: i64 },

    /// Merge tasks into the earliest one.
    Merge {
        task_ids: Vec<i64>,
        overrides: MergeOverrides,
    },

    /// Split a task into equal parts.
    Split { id: i64, split_count: u32 },

    /// Ping to check the store loop is alive.
    Ping,
}

/// Response sent back from the store loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Single task response.
    Task { task: Task },

    /// Multiple tasks response.
    Tasks { tasks: Vec<Task> },

    /// Split outcome.
    Split { result: SplitResult },

    /// Task deleted.
    Deleted { id: i64 },

    /// Referenced task(s) missing.
    NotFound { message: String },

    /// Caller-supplied parameters rejected.
    Invalid { message: String },

    /// Pong response to ping.
    Pong,

    /// Error response.
    Error { message: String },
}

impl Response {
    /// Create an error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Create an invalid-argument response.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Classify a store failure.
    pub fn from_report(report: eyre::Report) -> Self {
        match report.downcast_ref::<StoreError>() {
            Some(e) if e.is_not_found() => Self::NotFound { message: e.to_string() },
            Some(e) if e.is_invalid_argument() => Self::invalid(e.to_string()),
            _ => Self::error(format!("{:#}", report)),
        }
    }
}

/// Query string of `GET /api/tasks`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Body of `POST /api/tasks/merge`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeBody {
    #[serde(default)]
    pub task_ids: Vec<i64>,

    #[serde(flatten)]
    pub overrides: MergeOverrides,
}

/// Body of `POST /api/tasks/{id}/split`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitBody {
    #[serde(default = "default_split_count")]
    pub split_count: i64,
}

fn default_split_count() -> i64 {
    DEFAULT_SPLIT_COUNT
}

impl SplitBody {
    /// Split count as the engine sees it. Negative counts collapse to 0 and
    /// are rejected downstream like any other count below two.
    pub fn count(&self) -> u32 {
        u32::try_from(self.split_count).unwrap_or(if self.split_count < 0 { 0 } else { u32::MAX })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::TimelineError;

    #[test]
    fn test_request_serialization() {
        let req = Request::Split { id: 7, split_count: 3 };

        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();

        if let Request::Split { id, split_count } = parsed {
            assert_eq!(id, 7);
            assert_eq!(split_count, 3);
        } else {
            panic!("Wrong request type");
        }
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::error("test error");
        let json = serde_json::to_string(&resp).unwrap();

        assert!(json.contains("Error"));
        assert!(json.contains("test error"));
    }

    #[test]
    fn test_from_report_classifies_errors() {
        let resp = Response::from_report(eyre::eyre!(StoreError::TaskNotFound(3)));
        assert!(matches!(resp, Response::NotFound { .. }));

        let resp = Response::from_report(eyre::eyre!(StoreError::Timeline(TimelineError::SplitCountTooSmall(1))));
        assert!(matches!(resp, Response::Invalid { .. }));

        let resp = Response::from_report(eyre::eyre!("disk on fire"));
        assert!(matches!(resp, Response::Error { .. }));
    }

    #[test]
    fn test_merge_body_flattens_overrides() {
        let body: MergeBody = serde_json::from_str(r#"{"task_ids":[1,2],"title":"Block"}"#).unwrap();
        assert_eq!(body.task_ids, vec![1, 2]);
        assert_eq!(body.overrides.title, Some("Block".to_string()));
        assert_eq!(body.overrides.location, None);
    }

    #[test]
    fn test_split_body_default_and_clamp() {
        let body: SplitBody = serde_json::from_str("{}").unwrap();
        assert_eq!(body.count(), 2);

        let body = SplitBody { split_count: -4 };
        assert_eq!(body.count(), 0);
    }
}
