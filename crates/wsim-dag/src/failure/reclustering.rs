//! Reclustering policies applied to a FAILED job to produce its replacement job(s) (§4.7).

use std::collections::BTreeMap;

use crate::failure::monitor::FailureMonitor;
use crate::job::{Job, JobClass, JobId, JobStatus};
use crate::task::{Task, TaskId, TaskStatus};

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ReclusteringPolicy {
    Noop,
    Dynamic { phi: f64, theta: f64, gamma: f64, mean_task_time: f64 },
    Selective,
    Block,
    Vertical { phi: f64, theta: f64, gamma: f64, mean_task_time: f64 },
}

/// Builds a fresh job carrying `task_ids`, copying class/user from `source` and recomputing
/// length/depth/files from the given tasks.
fn job_for(source: &Job, next_id: &mut JobId, task_ids: Vec<TaskId>, tasks: &[Task]) -> Job {
    let mut job = Job::new(*next_id, source.class, source.user_id);
    *next_id += 1;
    job.depth = task_ids.iter().map(|&id| tasks[id].depth).min().unwrap_or(0);
    job.length = task_ids.iter().map(|&id| tasks[id].length).sum();
    job.vm_id = source.vm_id;
    job.parents = source.parents.clone();
    job.children = source.children.clone();
    job.status = JobStatus::Created;
    job.tasks = task_ids;
    job
}

/// Applies `policy` to a FAILED job `source`, returning its replacement job(s). `tasks` is the
/// full task table (status already updated by the failure model); `next_id` is bumped for every
/// new job minted.
pub fn process(
    policy: ReclusteringPolicy,
    source: &Job,
    tasks: &[Task],
    monitor: &FailureMonitor,
    next_id: &mut JobId,
) -> Vec<Job> {
    match policy {
        ReclusteringPolicy::Noop => vec![job_for(source, next_id, source.tasks.clone(), tasks)],
        ReclusteringPolicy::Selective => {
            let failed: Vec<TaskId> =
                source.tasks.iter().copied().filter(|&id| tasks[id].status == TaskStatus::Failed).collect();
            if failed.is_empty() {
                vec![job_for(source, next_id, source.tasks.clone(), tasks)]
            } else {
                vec![job_for(source, next_id, failed, tasks)]
            }
        }
        ReclusteringPolicy::Block => {
            depth_bands(source, tasks)
                .into_iter()
                .filter(|band| band.iter().any(|&id| tasks[id].status == TaskStatus::Failed))
                .map(|band| job_for(source, next_id, band, tasks))
                .collect()
        }
        ReclusteringPolicy::Dynamic { phi, theta, gamma, mean_task_time } => {
            let vm_id = source.vm_id.unwrap_or(0);
            let bands = depth_bands(source, tasks);
            bands
                .into_iter()
                .filter(|band| band.iter().any(|&id| tasks[id].status == TaskStatus::Failed))
                .flat_map(|band| {
                    let depth = tasks[band[0]].depth;
                    let d = monitor.cumulative_delay(vm_id, depth);
                    let k = monitor.get_clustering_factor(mean_task_time, d, phi, theta, gamma).max(1) as usize;
                    band.chunks(k).map(|chunk| job_for(source, next_id, chunk.to_vec(), tasks)).collect::<Vec<_>>()
                })
                .collect()
        }
        // Bisects at mid-depth; each surviving half recurses dynamically on its own next return,
        // since failures in it are only known once its own job comes back (§4.7 "recurse dynamically").
        ReclusteringPolicy::Vertical { phi, theta, gamma, mean_task_time } => {
            let _ = (phi, theta, gamma, mean_task_time);
            let mut depths: Vec<u32> = source.tasks.iter().map(|&id| tasks[id].depth).collect();
            depths.sort_unstable();
            let mid = depths[depths.len() / 2];
            let (low, high): (Vec<TaskId>, Vec<TaskId>) =
                source.tasks.iter().copied().partition(|&id| tasks[id].depth <= mid);
            [low, high]
                .into_iter()
                .filter(|half| !half.is_empty() && half.iter().any(|&id| tasks[id].status == TaskStatus::Failed))
                .map(|half| job_for(source, next_id, half, tasks))
                .collect()
        }
    }
}

/// Groups a job's member tasks by depth, in ascending depth order.
fn depth_bands(job: &Job, tasks: &[Task]) -> Vec<Vec<TaskId>> {
    let mut by_depth: BTreeMap<u32, Vec<TaskId>> = BTreeMap::new();
    for &id in &job.tasks {
        by_depth.entry(tasks[id].depth).or_default().push(id);
    }
    by_depth.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job_and_tasks() -> (Job, Vec<Task>) {
        let mut job = Job::new(0, JobClass::Compute, 0);
        job.tasks = vec![0, 1, 2];
        let mut tasks = vec![
            Task::new(0, "A", 1000, 1, 0),
            Task::new(1, "B", 1000, 1, 0),
            Task::new(2, "C", 1000, 1, 0),
        ];
        tasks[0].depth = 0;
        tasks[1].depth = 1;
        tasks[2].depth = 1;
        tasks[1].status = TaskStatus::Failed;
        (job, tasks)
    }

    #[test]
    fn noop_preserves_the_full_task_list() {
        let (job, tasks) = sample_job_and_tasks();
        let monitor = FailureMonitor::new();
        let mut next_id = 1;
        let result = process(ReclusteringPolicy::Noop, &job, &tasks, &monitor, &mut next_id);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tasks.len(), 3);
        assert_eq!(result[0].depth, job.depth);
    }

    #[test]
    fn selective_resubmits_only_failed_tasks() {
        let (job, tasks) = sample_job_and_tasks();
        let monitor = FailureMonitor::new();
        let mut next_id = 1;
        let result = process(ReclusteringPolicy::Selective, &job, &tasks, &monitor, &mut next_id);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tasks, vec![1]);
    }

    #[test]
    fn block_only_resubmits_depth_bands_with_a_failure() {
        let (job, tasks) = sample_job_and_tasks();
        let monitor = FailureMonitor::new();
        let mut next_id = 1;
        let result = process(ReclusteringPolicy::Block, &job, &tasks, &monitor, &mut next_id);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tasks, vec![1, 2]);
    }
}
