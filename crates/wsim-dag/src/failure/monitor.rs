//! Observed failure-rate bucket analytics feeding the Dynamic/Vertical reclustering estimator.

use std::collections::HashMap;

use crate::job::Job;
use crate::task::{Task, TaskStatus};

#[derive(Clone, Copy, Default, Debug)]
struct Bucket {
    observed: u64,
    failed: u64,
    /// Cumulative extra delay incurred by failures observed in this bucket so far.
    cumulative_delay: f64,
}

/// Tracks, per (depth, VM) bucket, how many tasks have been observed, how many failed, and how
/// much delay those failures have cost so far.
#[derive(Default)]
pub struct FailureMonitor {
    buckets: HashMap<(u32, u32), Bucket>,
}

impl FailureMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rolls a just-returned job's member tasks into their (depth, VM) buckets. Must run before
    /// the reclustering decision for that job is made, so `get_clustering_factor` reflects it.
    pub fn analyze(&mut self, job: &Job, tasks: &[Task]) {
        let vm_id = job.vm_id.unwrap_or(0);
        for &task_id in &job.tasks {
            let task = &tasks[task_id];
            let bucket = self.buckets.entry((vm_id, task.depth)).or_default();
            bucket.observed += 1;
            if task.status == TaskStatus::Failed {
                bucket.failed += 1;
                if let (Some(start), Some(finish)) = (task.start, task.finish) {
                    bucket.cumulative_delay += finish - start;
                }
            }
        }
    }

    /// Observed failure rate `alpha = failed / observed` for a (VM, depth) bucket; 0 with no
    /// observations yet.
    pub fn failure_rate(&self, vm_id: u32, depth: u32) -> f64 {
        match self.buckets.get(&(vm_id, depth)) {
            Some(b) if b.observed > 0 => b.failed as f64 / b.observed as f64,
            _ => 0.,
        }
    }

    pub fn cumulative_delay(&self, vm_id: u32, depth: u32) -> f64 {
        self.buckets.get(&(vm_id, depth)).map(|b| b.cumulative_delay).unwrap_or(0.)
    }

    /// Finds the clustering factor `K` in `1..=200` minimising
    /// `f(K) = (K*t + d)(phi - 1) / K * exp(((K*t + d) / theta)^gamma)`,
    /// given an observed inter-task time `t`, cumulative delay `d`, and shape parameters.
    pub fn get_clustering_factor(&self, t: f64, d: f64, phi: f64, theta: f64, gamma: f64) -> u32 {
        (1..=200)
            .min_by(|&a, &b| {
                f(a as f64, t, d, phi, theta, gamma)
                    .partial_cmp(&f(b as f64, t, d, phi, theta, gamma))
                    .unwrap()
            })
            .unwrap_or(1)
    }
}

fn f(k: f64, t: f64, d: f64, phi: f64, theta: f64, gamma: f64) -> f64 {
    let kt_d = k * t + d;
    (kt_d * (phi - 1.) / k) * (kt_d / theta).powf(gamma).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobClass;

    #[test]
    fn failure_rate_is_zero_with_no_observations() {
        let monitor = FailureMonitor::new();
        assert_eq!(monitor.failure_rate(0, 0), 0.);
    }

    #[test]
    fn analyze_counts_failed_tasks_into_the_right_bucket() {
        let mut monitor = FailureMonitor::new();
        let mut job = Job::new(0, JobClass::Compute, 0);
        job.vm_id = Some(1);
        job.tasks = vec![0, 1];
        let mut tasks = vec![Task::new(0, "A", 1000, 1, 0), Task::new(1, "B", 1000, 1, 0)];
        tasks[0].depth = 2;
        tasks[1].depth = 2;
        tasks[0].status = TaskStatus::Failed;
        tasks[0].start = Some(0.);
        tasks[0].finish = Some(3.);
        monitor.analyze(&job, &tasks);
        assert_eq!(monitor.failure_rate(1, 2), 0.5);
        assert_eq!(monitor.cumulative_delay(1, 2), 3.);
    }

    #[test]
    fn clustering_factor_is_within_bounds() {
        let monitor = FailureMonitor::new();
        let k = monitor.get_clustering_factor(10., 5., 1.5, 100., 1.2);
        assert!((1..=200).contains(&k));
    }
}
