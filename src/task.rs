use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: u32,
    pub title: String,
    pub description: String,
    pub due_date: String,
    pub priority: String, // free text, e.g. "High", "Medium", "Low"
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(
        id: u32,
        title: String,
        description: String,
        due_date: String,
        priority: String,
    ) -> Self {
        Self {
            id,
            title,
            description,
            due_date,
            priority,
            completed: false,
        }
    }

    /// Glyph shown in the "Completed" column.
    pub fn status_glyph(&self) -> &'static str {
        if self.completed {
            "✓"
        } else {
            "✗"
        }
    }
}
