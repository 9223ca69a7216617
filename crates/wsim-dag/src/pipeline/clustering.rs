//! Clustering Engine (C4): turns planned tasks into jobs and injects the synthetic STAGE_IN root (§4.4).

use std::collections::{BTreeMap, HashMap, HashSet};

use wsim_core::{cast, log_info, Event, EventHandler, Id, SimulationContext};

use crate::dag::TaskDag;
use crate::file_item::FileItem;
use crate::job::{Job, JobClass};
use crate::parsers::config::ClusteringParams;
use crate::pipeline::events::{JobsClustered, TasksPlanned};
use crate::pipeline::state::SharedState;
use crate::task::TaskId;

pub struct ClusteringEngine {
    state: SharedState,
    params: ClusteringParams,
    workflow_engine: Id,
    ctx: SimulationContext,
}

impl ClusteringEngine {
    pub fn new(state: SharedState, params: ClusteringParams, ctx: SimulationContext) -> Self {
        Self { state, params, workflow_engine: 0, ctx }
    }

    pub fn set_workflow_engine(&mut self, id: Id) {
        self.workflow_engine = id;
    }
}

/// Builds a job from a group of task ids, per the shared construction rule §4.4 uses for both the
/// default policy and every re-clustering outcome: length sums, user/priority/depth copy from the
/// first member, files de-duplicate by name, required_files are inputs not produced by a sibling.
pub fn job_from_tasks(id: crate::job::JobId, class: JobClass, task_ids: &[TaskId], dag: &TaskDag) -> Job {
    let tasks = dag.tasks();
    let first = &tasks[task_ids[0]];
    let mut job = Job::new(id, class, first.user_id);
    job.depth = first.depth;
    job.priority = first.impact;
    job.vm_id = first.vm_id;
    job.tasks = task_ids.to_vec();
    job.length = task_ids.iter().map(|&t| tasks[t].length).sum();

    let mut seen = HashSet::new();
    let mut outputs = HashSet::new();
    for &t in task_ids {
        for name in &tasks[t].outputs {
            outputs.insert(name.clone());
        }
    }
    for &t in task_ids {
        for name in tasks[t].inputs.iter().chain(tasks[t].outputs.iter()) {
            if seen.insert(name.clone()) {
                let kind = if outputs.contains(name) { crate::file_item::FileKind::Output } else { crate::file_item::FileKind::Input };
                let size = dag.file(name).map(|f| f.size).unwrap_or(1);
                job.files.push(FileItem::new(name, size, kind));
            }
        }
    }
    job.required_files = job
        .files
        .iter()
        .filter(|f| f.kind == crate::file_item::FileKind::Input && !outputs.contains(&f.name))
        .map(|f| f.name.clone())
        .collect();
    job
}

/// Derives job parent/child edges from task parent/child edges through `job_of_task`, skipping
/// self-edges and duplicates - the `update_dependencies` step §4.4 and §9 require of every clustering
/// policy, not only the default one.
pub fn wire_job_dependencies(jobs: &mut [Job], tasks: &[crate::task::Task], job_of_task: &HashMap<TaskId, crate::job::JobId>) {
    let mut parents: HashMap<crate::job::JobId, Vec<crate::job::JobId>> = HashMap::new();
    let mut children: HashMap<crate::job::JobId, Vec<crate::job::JobId>> = HashMap::new();
    for job in jobs.iter() {
        for &task_id in &job.tasks {
            for &parent_task in &tasks[task_id].parents {
                if let Some(&parent_job) = job_of_task.get(&parent_task) {
                    if parent_job != job.id {
                        let list = parents.entry(job.id).or_default();
                        if !list.contains(&parent_job) {
                            list.push(parent_job);
                        }
                        let clist = children.entry(parent_job).or_default();
                        if !clist.contains(&job.id) {
                            clist.push(job.id);
                        }
                    }
                }
            }
        }
    }
    for job in jobs.iter_mut() {
        if let Some(p) = parents.remove(&job.id) {
            job.parents = p;
        }
        if let Some(c) = children.remove(&job.id) {
            job.children = c;
        }
    }
}

impl EventHandler for ClusteringEngine {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            TasksPlanned {} => {
                let mut state = self.state.borrow_mut();
                let horizontal_factor = self.params.horizontal_factor.max(1) as usize;

                let mut by_depth: BTreeMap<u32, Vec<TaskId>> = BTreeMap::new();
                for task in state.dag.tasks() {
                    by_depth.entry(task.depth).or_default().push(task.id);
                }

                let mut jobs = Vec::new();
                let mut job_of_task = HashMap::new();
                for (_, mut task_ids) in by_depth {
                    task_ids.sort_unstable();
                    for chunk in task_ids.chunks(horizontal_factor) {
                        let id = state.alloc_job_id();
                        let job = job_from_tasks(id, JobClass::Compute, chunk, &state.dag);
                        for &t in chunk {
                            job_of_task.insert(t, id);
                        }
                        jobs.push(job);
                    }
                }
                wire_job_dependencies(&mut jobs, state.dag.tasks(), &job_of_task);

                let root_job_ids: Vec<crate::job::JobId> =
                    jobs.iter().filter(|j| j.parents.is_empty()).map(|j| j.id).collect();
                let mut real_inputs: Vec<FileItem> =
                    state.dag.files().filter(|f| state.dag.is_real_input(&f.name)).cloned().collect();
                real_inputs.sort_by(|a, b| a.name.cmp(&b.name));
                if !real_inputs.is_empty() {
                    let stage_in_id = state.alloc_job_id();
                    let mut stage_in = Job::new(stage_in_id, JobClass::StageIn, 0);
                    stage_in.depth = 0;
                    stage_in.required_files = real_inputs.iter().map(|f| f.name.clone()).collect();
                    stage_in.files = real_inputs;
                    stage_in.children = root_job_ids.clone();
                    for &root in &root_job_ids {
                        if let Some(job) = jobs.iter_mut().find(|j| j.id == root) {
                            job.parents.push(stage_in_id);
                        }
                    }
                    jobs.push(stage_in);
                }

                log_info!(self.ctx, format!("clustered {} tasks into {} jobs", job_of_task.len(), jobs.len()));
                state.jobs = jobs;
                state.job_of_task = job_of_task;
                drop(state);
                self.ctx.emit_now(JobsClustered {}, self.workflow_engine);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    #[test]
    fn job_from_tasks_marks_internally_produced_files_as_not_required() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 1000, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        dag.add_task_output(a, "f", 1024).unwrap();
        dag.add_task_input(b, "f", 1024).unwrap();
        dag.add_task_input(b, "external.dat", 4096).unwrap();
        dag.add_dependency(a, b).unwrap();
        let job = job_from_tasks(0, JobClass::Compute, &[a, b], &dag);
        assert_eq!(job.required_files, vec!["external.dat".to_string()]);
        assert_eq!(job.length, 2000);
    }

    #[test]
    fn wiring_skips_self_edges_within_the_same_job() {
        let mut a = Task::new(0, "A", 1000, 1, 0);
        let mut b = Task::new(1, "B", 1000, 1, 0);
        a.children.push(1);
        b.parents.push(0);
        let tasks = vec![a, b];
        let mut jobs = vec![Job::new(0, JobClass::Compute, 0)];
        jobs[0].tasks = vec![0, 1];
        let mut job_of_task = HashMap::new();
        job_of_task.insert(0, 0);
        job_of_task.insert(1, 0);
        wire_job_dependencies(&mut jobs, &tasks, &job_of_task);
        assert!(jobs[0].parents.is_empty());
    }
}
