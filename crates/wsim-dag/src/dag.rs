//! DAG model of a workflow: tasks with parent/child edges and named file dependencies.

use std::collections::{HashMap, HashSet};

use crate::error::{DagError, DagResult};
use crate::file_item::{FileItem, FileKind};
use crate::task::{Task, TaskId};

/// A workflow as a directed acyclic graph of [tasks](Task), with a registry of the named
/// [files](FileItem) they consume and produce.
///
/// Unlike [`Job`](crate::job::Job) parent/child edges (computed once by the clustering engine), task
/// edges here are the ground truth the planner ranks and schedules against.
#[derive(Clone, Default)]
pub struct TaskDag {
    tasks: Vec<Task>,
    files: HashMap<String, FileItem>,
    /// Name of the file -> id of the task that produces it as an output, if any.
    producers: HashMap<String, TaskId>,
}

impl TaskDag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new task with the given name, length (millions of instructions), PE count and
    /// owning user, and returns its id.
    pub fn add_task(&mut self, name: &str, length: u64, pes: u32, user_id: u64) -> DagResult<TaskId> {
        if name.is_empty() {
            return Err(DagError::EmptyTaskName(name.to_string()));
        }
        if length == 0 {
            return Err(DagError::NonPositiveLength { name: name.to_string(), length: 0 });
        }
        let id = self.tasks.len();
        self.tasks.push(Task::new(id, name, length, pes, user_id));
        Ok(id)
    }

    /// Declares `file_name` as an input of `task_id`, registering it in the file registry if new.
    pub fn add_task_input(&mut self, task_id: TaskId, file_name: &str, size: u64) -> DagResult<()> {
        self.register_file(file_name, size, FileKind::Input)?;
        self.task_mut(task_id)?.add_input(file_name);
        Ok(())
    }

    /// Declares `file_name` as an output of `task_id`, registering it as the file's sole producer.
    pub fn add_task_output(&mut self, task_id: TaskId, file_name: &str, size: u64) -> DagResult<()> {
        self.register_file(file_name, size, FileKind::Output)?;
        self.producers.insert(file_name.to_string(), task_id);
        self.task_mut(task_id)?.add_output(file_name);
        Ok(())
    }

    fn register_file(&mut self, name: &str, size: u64, kind: FileKind) -> DagResult<()> {
        if name.is_empty() {
            return Err(DagError::EmptyFileName(name.to_string()));
        }
        if size == 0 {
            return Err(DagError::NonPositiveFileSize { name: name.to_string(), size: 0 });
        }
        self.files
            .entry(name.to_string())
            .or_insert_with(|| FileItem::new(name, size, kind));
        Ok(())
    }

    /// Adds a `parent -> child` dependency edge.
    pub fn add_dependency(&mut self, parent: TaskId, child: TaskId) -> DagResult<()> {
        if parent == child {
            return Err(DagError::SelfDependency(parent));
        }
        self.task(child)?;
        self.task(parent)?;
        self.tasks[parent].children.push(child);
        self.tasks[child].parents.push(parent);
        Ok(())
    }

    pub fn task(&self, task_id: TaskId) -> DagResult<&Task> {
        self.tasks.get(task_id).ok_or(DagError::UnknownTask(task_id))
    }

    fn task_mut(&mut self, task_id: TaskId) -> DagResult<&mut Task> {
        self.tasks.get_mut(task_id).ok_or(DagError::UnknownTask(task_id))
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub fn file(&self, name: &str) -> Option<&FileItem> {
        self.files.get(name)
    }

    pub fn files(&self) -> impl Iterator<Item = &FileItem> {
        self.files.values()
    }

    /// A file is a "real input" to the DAG as a whole only if no task anywhere in the DAG
    /// produces it as an output; otherwise it is materialized in-flight (§3 FileItem).
    pub fn is_real_input(&self, file_name: &str) -> bool {
        !self.producers.contains_key(file_name)
    }

    pub fn roots(&self) -> Vec<TaskId> {
        self.tasks.iter().filter(|t| t.is_root()).map(|t| t.id).collect()
    }

    pub fn exits(&self) -> Vec<TaskId> {
        self.tasks.iter().filter(|t| t.is_exit()).map(|t| t.id).collect()
    }

    /// Computes each task's depth as its longest path length from a root, via a topological pass.
    pub fn compute_depths(&mut self) {
        let order = self.topological_order();
        for id in order {
            let depth = self.tasks[id]
                .parents
                .iter()
                .map(|&p| self.tasks[p].depth + 1)
                .max()
                .unwrap_or(0);
            self.tasks[id].depth = depth;
        }
    }

    /// Propagates impact weight from exit nodes upward: each exit gets `1 / |exits|`; a parent
    /// receives `child.impact / |child.children|` summed over every child (§4.4).
    pub fn propagate_impact(&mut self) {
        let exits = self.exits();
        if exits.is_empty() {
            return;
        }
        for t in self.tasks.iter_mut() {
            t.impact = 0.;
        }
        let share = 1. / exits.len() as f64;
        for &e in &exits {
            self.tasks[e].impact = share;
        }
        let order = self.topological_order();
        for id in order.into_iter().rev() {
            let children = self.tasks[id].children.clone();
            if children.is_empty() {
                continue;
            }
            let contribution: f64 = children
                .iter()
                .map(|&c| self.tasks[c].impact / self.tasks[c].parents.len().max(1) as f64)
                .sum();
            self.tasks[id].impact += contribution;
        }
    }

    /// Kahn's algorithm; the DAG is assumed acyclic (validated by the parser that built it).
    fn topological_order(&self) -> Vec<TaskId> {
        let mut in_degree: Vec<usize> = self.tasks.iter().map(|t| t.parents.len()).collect();
        let mut queue: Vec<TaskId> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &d)| d == 0)
            .map(|(i, _)| i)
            .collect();
        let mut order = Vec::with_capacity(self.tasks.len());
        let mut visited: HashSet<TaskId> = HashSet::new();
        while let Some(id) = queue.pop() {
            if !visited.insert(id) {
                continue;
            }
            order.push(id);
            for &child in &self.tasks[id].children {
                in_degree[child] -= 1;
                if in_degree[child] == 0 {
                    queue.push(child);
                }
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depths_follow_longest_path() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 1000, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        let c = dag.add_task("C", 1000, 1, 0).unwrap();
        dag.add_dependency(a, b).unwrap();
        dag.add_dependency(b, c).unwrap();
        dag.compute_depths();
        assert_eq!(dag.task(a).unwrap().depth, 0);
        assert_eq!(dag.task(b).unwrap().depth, 1);
        assert_eq!(dag.task(c).unwrap().depth, 2);
    }

    #[test]
    fn impact_splits_evenly_at_forks() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 500, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        let c = dag.add_task("C", 2000, 1, 0).unwrap();
        let d = dag.add_task("D", 500, 1, 0).unwrap();
        dag.add_dependency(a, b).unwrap();
        dag.add_dependency(a, c).unwrap();
        dag.add_dependency(b, d).unwrap();
        dag.add_dependency(c, d).unwrap();
        dag.propagate_impact();
        assert_eq!(dag.task(d).unwrap().impact, 1.0);
        assert_eq!(dag.task(b).unwrap().impact, 1.0);
        assert_eq!(dag.task(c).unwrap().impact, 1.0);
        assert_eq!(dag.task(a).unwrap().impact, 2.0);
    }

    #[test]
    fn file_produced_within_dag_is_not_a_real_input() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 1000, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        dag.add_task_output(a, "f.txt", 1024).unwrap();
        dag.add_task_input(b, "f.txt", 1024).unwrap();
        assert!(!dag.is_real_input("f.txt"));
    }

    #[test]
    fn unproduced_input_is_a_real_input() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 1000, 1, 0).unwrap();
        dag.add_task_input(a, "external.dat", 4096).unwrap();
        assert!(dag.is_real_input("external.dat"));
    }
}
