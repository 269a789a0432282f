use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Task;
use super::QuestPolicy;

/// Ordered collection of tasks. Owns them outright; removing a task drops
/// its subtasks with it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestBoard {
    #[serde(default)]
    tasks: Vec<Task>,
}

impl QuestBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, task: Task) -> Uuid {
        let id = task.id;
        self.tasks.push(task);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn get_mut(&mut self, id: Uuid) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
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

    /// Resolve an id from a prefix of its string form, as typed on a CLI.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<Uuid> {
        let prefix = prefix.trim().to_ascii_lowercase();
        if prefix.is_empty() {
            return None;
        }
        let mut matches = self
            .tasks
            .iter()
            .filter(|t| t.id.to_string().starts_with(&prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first.id)
    }

    /// `(task, subtask)` ids of every running timer.
    pub fn active_timers(&self) -> Vec<(Uuid, Option<Uuid>)> {
        let mut active = Vec::new();
        for task in &self.tasks {
            if task.timer.is_active() {
                active.push((task.id, None));
            }
            for subtask in task.subtasks.iter().filter(|s| s.timer.is_active()) {
                active.push((task.id, Some(subtask.id)));
            }
        }
        active
    }

    pub fn escalated(&self, now: DateTime<Utc>, policy: &QuestPolicy) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|t| t.is_escalated(now, policy))
            .collect()
    }
}
