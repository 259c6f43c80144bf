//! Task records as supplied by the caller
//!
//! The engine only reads these; persistence lives elsewhere.

use serde::{Deserialize, Serialize};

/// A task record from the task store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            tags: Vec::new(),
            metadata: None,
        }
    }
}

/// Load a JSON array of tasks from disk
pub fn load_tasks(path: &std::path::Path) -> crate::Result<Vec<Task>> {
    let content = std::fs::read_to_string(path)?;
    let tasks: Vec<Task> = serde_json::from_str(&content)?;
    Ok(tasks)
}
