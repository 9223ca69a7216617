//! Per-VM/per-depth statistical failure sampling and reclustering (§4.7).

pub mod monitor;
pub mod reclustering;

use std::collections::HashMap;

use crate::distribution::{DistributionGenerator, DistributionSpec};
use crate::job::Job;
use crate::task::{Task, TaskStatus};

/// Granularity at which failures are sampled: a distribution generator either belongs to the
/// (VM, depth) pair a task runs at, or to one of three coarser fixed indices.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum FailureMode {
    PerVmAndDepth,
    FailureAll,
    FailureJob,
    FailureVm(u32),
}

#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
enum GeneratorKey {
    VmDepth(u32, u32),
    Single,
}

/// Owns the generator table and decides, for a just-returned job, which of its tasks failed.
pub struct FailureModel {
    mode: FailureMode,
    spec: DistributionSpec,
    seed: u64,
    generators: HashMap<GeneratorKey, DistributionGenerator>,
}

impl FailureModel {
    pub fn new(mode: FailureMode, spec: DistributionSpec, seed: u64) -> Self {
        Self { mode, spec, seed, generators: HashMap::new() }
    }

    fn key_for(&self, vm_id: u32, depth: u32) -> GeneratorKey {
        match self.mode {
            FailureMode::PerVmAndDepth => GeneratorKey::VmDepth(vm_id, depth),
            _ => GeneratorKey::Single,
        }
    }

    fn generator_for(&mut self, vm_id: u32, depth: u32) -> &mut DistributionGenerator {
        let key = self.key_for(vm_id, depth);
        let spec = self.spec;
        // Each (kind, parameters, seed) combination gets its own independent stream (§4.7); the
        // key itself folds into the seed so distinct VM/depth buckets don't share one sequence.
        let seed = self.seed ^ match key {
            GeneratorKey::VmDepth(vm, depth) => (vm as u64) << 32 | depth as u64,
            GeneratorKey::Single => 0,
        };
        self.generators.entry(key).or_insert_with(|| DistributionGenerator::new(spec, seed))
    }

    /// Walks each member task of a just-returned job; a task is marked FAILED if the relevant
    /// generator has a sample inside `[start, finish]` (and the sample is consumed). Returns
    /// whether any task failed, which is what makes the job itself FAILED.
    pub fn evaluate_job(&mut self, job: &Job, tasks: &mut [Task]) -> bool {
        let mut any_failed = false;
        for &task_id in &job.tasks {
            let task = &mut tasks[task_id];
            let (Some(start), Some(finish)) = (task.start, task.finish) else {
                continue;
            };
            let vm_id = job.vm_id.unwrap_or(0);
            if self.generator_for(vm_id, task.depth).consume_sample_in_range(start, finish).is_some() {
                task.status = TaskStatus::Failed;
                any_failed = true;
            }
        }
        any_failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_failure_inside_the_window_marks_the_task_failed() {
        let mut model = FailureModel::new(FailureMode::PerVmAndDepth, DistributionSpec::Constant(5.), 1);
        let mut job = Job::new(0, crate::job::JobClass::Compute, 0);
        job.tasks.push(0);
        job.vm_id = Some(0);
        let mut tasks = vec![Task::new(0, "A", 1000, 1, 0)];
        tasks[0].start = Some(0.);
        tasks[0].finish = Some(10.);
        assert!(model.evaluate_job(&job, &mut tasks));
        assert_eq!(tasks[0].status, TaskStatus::Failed);
    }

    #[test]
    fn no_samples_means_no_failure() {
        let mut model = FailureModel::new(FailureMode::PerVmAndDepth, DistributionSpec::Constant(0.), 1);
        let mut job = Job::new(0, crate::job::JobClass::Compute, 0);
        job.tasks.push(0);
        job.vm_id = Some(0);
        let mut tasks = vec![Task::new(0, "A", 1000, 1, 0)];
        tasks[0].start = Some(0.);
        tasks[0].finish = Some(10.);
        assert!(!model.evaluate_job(&job, &mut tasks));
        assert_eq!(tasks[0].status, TaskStatus::Created);
    }
}
