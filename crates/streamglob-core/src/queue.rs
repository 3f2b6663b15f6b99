use std::collections::VecDeque;

use streamglob_proto::protocol::{TaskId, TaskView};

use crate::task::Task;

/// Ordered list of tasks: a pending queue or a running/completed roster.
#[derive(Debug, Default)]
pub struct TaskList {
    tasks: VecDeque<Task>,
}

impl TaskList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, task: Task) {
        self.tasks.push_back(task);
    }

    pub fn pop_front(&mut self) -> Option<Task> {
        self.tasks.pop_front()
    }

    pub fn remove_by_id(&mut self, id: TaskId) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id() == id)?;
        self.tasks.remove(idx)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id() == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.iter_mut()
    }

    /// Remove and return every task matching `pred`, keeping the order of both halves.
    pub fn extract_if(&mut self, mut pred: impl FnMut(&Task) -> bool) -> Vec<Task> {
        let (taken, kept): (VecDeque<Task>, VecDeque<Task>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|t| pred(t));
        self.tasks = kept;
        taken.into()
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Task> + '_ {
        self.tasks.drain(..)
    }

    pub fn views(&self) -> Vec<TaskView> {
        self.tasks.iter().map(Task::view).collect()
    }
}

impl Extend<Task> for TaskList {
    fn extend<I: IntoIterator<Item = Task>>(&mut self, iter: I) {
        self.tasks.extend(iter);
    }
}
