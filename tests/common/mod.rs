//! Shared test infrastructure for blockcal integration tests.
//!
//! Provides TestEnv helper for consistent test setup/teardown.

#![allow(dead_code)]

use blockcal::{MergeOverrides, NewTask, Server, ServerConfig, ServerHandle, SplitResult, Store, StoreError, Task};
use tempfile::TempDir;

/// Test environment with automatic cleanup.
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub store: Store,
}

impl TestEnv {
    /// Create a new test environment with an initialized store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Store::init(temp_dir.path()).expect("Failed to init store");
        Self { temp_dir, store }
    }

    /// Create a task with the given slot and duration.
    pub fn create_task(&mut self, date: &str, start_time: &str, duration: u32) -> Task {
        let title = format!("Task {} {}", date, start_time);
        self.create_titled(date, start_time, duration, &title)
    }

    /// Create a task with an explicit title.
    pub fn create_titled(&mut self, date: &str, start_time: &str, duration: u32, title: &str) -> Task {
        self.store
            .create(NewTask::new(date, start_time, title).with_duration(duration))
            .expect("Failed to create task")
    }

    /// Merge tasks without overrides.
    pub fn merge(&mut self, tasks: &[&Task]) -> Task {
        let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
        self.store
            .merge(&ids, &MergeOverrides::default())
            .expect("Failed to merge tasks")
    }

    /// Split a task.
    pub fn split(&mut self, task: &Task, count: u32) -> SplitResult {
        self.store.split(task.id, count).expect("Failed to split task")
    }

    /// Reload a task from the store.
    pub fn reload(&self, task: &Task) -> Option<Task> {
        self.store.get(task.id).expect("Failed to get task")
    }

    /// Assert that a task still exists.
    pub fn assert_exists(&self, task: &Task) {
        assert!(
            self.reload(task).is_some(),
            "Expected task {} to exist, but it was deleted",
            task.id
        );
    }

    /// Assert that a task no longer exists.
    pub fn assert_deleted(&self, task: &Task) {
        assert!(
            self.reload(task).is_none(),
            "Expected task {} to be deleted, but it still exists",
            task.id
        );
    }

    /// Get all tasks count.
    pub fn total_count(&self) -> usize {
        self.store.count().expect("Failed to count tasks")
    }

    /// Start an HTTP server on a free local port backed by this store's directory.
    pub async fn start_server(&self) -> ServerHandle {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::new(self.temp_dir.path())
        };
        Server::new(config)
            .expect("Failed to create server")
            .start()
            .await
            .expect("Failed to start server")
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the typed store error from a failed operation.
pub fn store_error<T: std::fmt::Debug>(result: eyre::Result<T>) -> StoreError {
    match result.unwrap_err().downcast::<StoreError>() {
        Ok(e) => e,
        Err(other) => panic!("expected StoreError, got {:?}", other),
    }
}
