use crate::storage::StorageBackend;
use crate::task::Task;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A user's tasks plus the id counter that survives deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    next_id: u32,
    tasks: Vec<Task>,
}

/// Task files written before the id counter existed are bare arrays.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredTasks {
    Current(TaskList),
    Legacy(Vec<Task>),
}

impl Default for TaskList {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskList {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            tasks: Vec::new(),
        }
    }

    /// Build a list from existing tasks, recovering a counter that cannot
    /// collide with any of them.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        let mut list = Self { next_id: 1, tasks };
        list.repair_next_id();
        list
    }

    fn repair_next_id(&mut self) {
        let after_max = self
            .tasks
            .iter()
            .map(|t| t.id)
            .max()
            .map_or(1, |id| id.saturating_add(1));
        let after_len = self.tasks.len() as u32 + 1;
        self.next_id = self.next_id.max(after_max).max(after_len);
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn add_task(
        &mut self,
        title: String,
        description: String,
        due_date: String,
        priority: String,
    ) -> &Task {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        self.tasks.push(Task::new(id, title, description, due_date, priority));
        &self.tasks[self.tasks.len() - 1]
    }

    pub fn find(&self, id: u32) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Remove the first task with `id`.
    pub fn delete_task(&mut self, id: u32) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }

    /// Mark the first task with `id` as completed.
    pub fn complete_task(&mut self, id: u32) -> Option<&Task> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = true;
        Some(task)
    }
}

/// File name holding `username`'s tasks.
pub fn task_file_name(username: &str) -> String {
    format!("{}_tasks.json", username)
}

/// Loads and saves per-user task lists.
pub struct TaskStore<'a> {
    backend: &'a mut dyn StorageBackend,
}

impl<'a> TaskStore<'a> {
    pub fn new(backend: &'a mut dyn StorageBackend) -> Self {
        Self { backend }
    }

    /// Load `username`'s tasks. A malformed file is treated as empty.
    pub fn load(&self, username: &str) -> Result<TaskList> {
        let file = task_file_name(username);
        let Some(raw) = self.backend.read(&file)? else {
            return Ok(TaskList::new());
        };
        let list = match serde_json::from_str::<StoredTasks>(&raw) {
            Ok(StoredTasks::Current(mut list)) => {
                list.repair_next_id();
                list
            }
            Ok(StoredTasks::Legacy(tasks)) => {
                debug!(file = %file, "read legacy task array");
                TaskList::from_tasks(tasks)
            }
            Err(e) => {
                warn!(file = %file, error = %e, "ignoring malformed task file");
                TaskList::new()
            }
        };
        debug!(username, count = list.len(), "loaded tasks");
        Ok(list)
    }

    /// Replace `username`'s stored tasks with `list`.
    pub fn save(&mut self, list: &TaskList, username: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(list)?;
        self.backend.write(&task_file_name(username), &json)?;
        debug!(username, count = list.len(), "saved tasks");
        Ok(())
    }
}
