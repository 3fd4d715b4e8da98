//! High-level store API for blockcal.

use crate::storage::Storage;
use crate::timeline::{self, MergeOverrides, TimelineError};
use crate::types::{NewTask, Task, TaskPatch, ValidationError, validate_title_len};
use chrono::Utc;
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Errors that can occur during store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Task not found.
    TaskNotFound(i64),
    /// Some of the requested tasks do not exist.
    TasksNotFound(Vec<i64>),
    /// Merge or split preconditions violated.
    Timeline(TimelineError),
    /// Validation error.
    Validation(ValidationError),
}

impl StoreError {
    /// True for errors caused by ids that do not resolve.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::TaskNotFound(_) | StoreError::TasksNotFound(_))
    }

    /// True for errors caused by caller-supplied parameters.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, StoreError::Timeline(_) | StoreError::Validation(_))
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::TaskNotFound(id) => write!(f, "task not found: {}", id),
            StoreError::TasksNotFound(ids) => {
                let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
                write!(f, "some tasks not found: {}", ids.join(", "))
            }
            StoreError::Timeline(e) => write!(f, "{}", e),
            StoreError::Validation(e) => write!(f, "validation error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

/// Result of a split: the shortened original and the newly created parts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SplitResult {
    pub original: Task,
    pub new_tasks: Vec<Task>,
}

/// The main blockcal store.
pub struct Store {
    storage: Storage,
}

impl Store {
    /// Initialize a new store in the given directory.
    pub fn init(root: &Path) -> Result<Self> {
        let storage = Storage::init(root)?;
        Ok(Self { storage })
    }

    /// Open an existing store.
    pub fn open(root: &Path) -> Result<Self> {
        let storage = Storage::open(root)?;
        Ok(Self { storage })
    }

    /// Create a new task.
    pub fn create(&mut self, new: NewTask) -> Result<Task> {
        // Validate before persisting
        new.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let task = self
            .storage
            .insert_task(&new, Utc::now())
            .context("Failed to persist task")?;

        log::debug!("Created task {} on {} at {}", task.id, task.date, task.start_time);
        Ok(task)
    }

    /// Get a task by id.
    pub fn get(&self, id: i64) -> Result<Option<Task>> {
        self.storage.get_task(id)
    }

    /// Get the subset of `ids` that exists.
    pub fn get_many(&self, ids: &[i64]) -> Result<Vec<Task>> {
        self.storage.get_tasks(ids)
    }

    /// List all tasks.
    pub fn list(&self) -> Result<Vec<Task>> {
        self.storage.list_tasks()
    }

    /// List tasks dated between `start_date` and `end_date`, inclusive.
    pub fn range(&self, start_date: &str, end_date: &str) -> Result<Vec<Task>> {
        self.storage.tasks_in_range(start_date, end_date)
    }

    /// Count stored tasks.
    pub fn count(&self) -> Result<usize> {
        self.storage.count_tasks()
    }

    /// Update a task's fields.
    pub fn update(&mut self, id: i64, patch: TaskPatch) -> Result<Task> {
        let existing = self.require(id)?;
        patch.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let updated = Task {
            updated_at: Utc::now(),
            ..patch.apply(existing)
        };

        // Validate before persisting
        updated.validate().map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        if !self
            .storage
            .update_task(&updated)
            .context("Failed to persist updated task")?
        {
            return Err(eyre::eyre!(StoreError::TaskNotFound(id)));
        }

        Ok(updated)
    }

    /// Delete a task.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        if !self.storage.delete_task(id)? {
            return Err(eyre::eyre!(StoreError::TaskNotFound(id)));
        }
        log::debug!("Deleted task {}", id);
        Ok(())
    }

    /// Merge tasks into the earliest one and delete the rest.
    ///
    /// Every id must resolve; otherwise nothing is changed. Repeated ids count once.
    pub fn merge(&mut self, ids: &[i64], overrides: &MergeOverrides) -> Result<Task> {
        let mut seen = HashSet::new();
        let ids: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        if ids.len() < timeline::MIN_MERGE_TASKS {
            return Err(eyre::eyre!(StoreError::Timeline(TimelineError::TooFewTasks(ids.len()))));
        }

        let mut found: HashMap<i64, Task> = self
            .storage
            .get_tasks(&ids)?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let missing: Vec<i64> = ids.iter().copied().filter(|id| !found.contains_key(id)).collect();
        if !missing.is_empty() {
            return Err(eyre::eyre!(StoreError::TasksNotFound(missing)));
        }

        // Keep request order so equal start times tie-break on it
        let tasks: Vec<Task> = ids.iter().filter_map(|id| found.remove(id)).collect();

        if let Some(title) = &overrides.title {
            validate_title_len(title).map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;
        }

        let plan = timeline::merge(tasks, overrides).map_err(|e| eyre::eyre!(StoreError::Timeline(e)))?;

        let survivor = Task {
            updated_at: Utc::now(),
            ..plan.survivor
        };
        survivor
            .validate()
            .map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        self.storage
            .apply_merge(&survivor, &plan.removed)
            .context("Failed to persist merge")?;

        log::info!(
            "Merged tasks {:?} into {} ({} minutes)",
            plan.removed,
            survivor.id,
            survivor.duration
        );
        Ok(survivor)
    }

    /// Split a task into `split_count` parts separated by rest gaps.
    pub fn split(&mut self, id: i64, split_count: u32) -> Result<SplitResult> {
        let task = self.require(id)?;

        let plan = timeline::split(&task, split_count).map_err(|e| eyre::eyre!(StoreError::Timeline(e)))?;

        let now = Utc::now();
        let original = Task {
            updated_at: now,
            ..plan.original
        };

        // Parts copy the original's fields apart from the numbered title
        original
            .validate()
            .map_err(|e| eyre::eyre!(StoreError::Validation(e)))?;

        let new_tasks = self
            .storage
            .apply_split(&original, &plan.new_tasks, now)
            .context("Failed to persist split")?;

        if plan.remainder_minutes > 0 {
            log::warn!(
                "Split of task {} into {} parts dropped {} minute(s)",
                id,
                split_count,
                plan.remainder_minutes
            );
        }
        log::info!(
            "Split task {} into {} parts of {} minutes",
            id,
            split_count,
            original.duration
        );

        Ok(SplitResult { original, new_tasks })
    }

    fn require(&self, id: i64) -> Result<Task> {
        self.storage
            .get_task(id)?
            .ok_or_else(|| eyre::eyre!(StoreError::TaskNotFound(id)))
    }
}
