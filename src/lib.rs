//! Blockcal: a time-blocked task calendar with merge and split scheduling.
//!
//! Tasks are stored in SQLite. Besides plain CRUD, the store can merge
//! several tasks into one block and split one task into shorter blocks with
//! rest gaps in between. The scheduling rules live in [`timeline`] and are
//! pure; the store applies their output atomically.
//!
//! # Example
//!
//! ```no_run
//! use blockcal::{MergeOverrides, NewTask, Store};
//! use std::path::Path;
//!
//! // Initialize a new store
//! let mut store = Store::init(Path::new(".")).unwrap();
//!
//! // Create tasks
//! let a = store.create(NewTask::new("2024-01-01", "09:00", "Reading").with_duration(30)).unwrap();
//! let b = store.create(NewTask::new("2024-01-01", "10:00", "Notes").with_duration(45)).unwrap();
//!
//! // Merge them into one 75 minute block
//! let merged = store.merge(&[a.id, b.id], &MergeOverrides::default()).unwrap();
//! assert_eq!(merged.duration, 75);
//!
//! // Split it back into three parts with rest gaps
//! let split = store.split(merged.id, 3).unwrap();
//! assert_eq!(split.new_tasks.len(), 2);
//! ```

mod storage;
mod store;
mod types;

pub mod protocol;
pub mod server;
pub mod timeline;

// Re-export public API
pub use protocol::{Request, Response};
pub use server::{Server, ServerConfig, ServerHandle};
pub use store::{SplitResult, Store, StoreError};
pub use timeline::{MergeOverrides, MergePlan, SplitPlan, TimelineError};
pub use types::{NewTask, Task, TaskPatch, ValidationError};
