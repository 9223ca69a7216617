//! Job-to-VM scheduling algorithms the workflow scheduler dispatches through (§6 `SCHEDULING_ALGORITHM`).
//!
//! STATIC is the default and the only one the planner's placement decisions feed into directly: it just
//! honors whatever VM id [`crate::planning::heft::plan`] already assigned to the job's tasks. The others are
//! classic batch/online heuristics applied at submission time, independent of any prior plan.

use std::collections::HashMap;

use crate::job::{Job, JobId};
use crate::parsers::config::SchedulingAlgorithm;

/// A VM as seen by the scheduler: enough to rank candidates by expected completion time.
#[derive(Clone, Copy, Debug)]
pub struct VmCandidate {
    pub id: u32,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    /// Time the VM's queue is already busy until, per the scheduler's own bookkeeping.
    pub queue_finish: f64,
}

impl VmCandidate {
    /// Estimated execution time for `job` on this VM, assuming it occupies a single PE - the exact PE
    /// count is only known once the job reaches the datacenter and its member tasks are summed.
    fn exec_time(&self, job: &Job) -> f64 {
        job.length as f64 / self.mips_per_pe.max(f64::MIN_POSITIVE)
    }

    fn completion_time(&self, job: &Job) -> f64 {
        self.queue_finish + self.exec_time(job)
    }
}

/// Dispatches job placement per the configured [`SchedulingAlgorithm`], keeping the small amount of
/// state (round-robin cursor) a couple of the algorithms need across calls.
pub struct Scheduler {
    algorithm: SchedulingAlgorithm,
    round_robin_next: usize,
}

impl Scheduler {
    pub fn new(algorithm: SchedulingAlgorithm) -> Self {
        Self { algorithm, round_robin_next: 0 }
    }

    /// Assigns every job in `jobs` (in order) to a VM id from `candidates`, returning one entry per job
    /// that could be placed. MINMIN/MAXMIN consider the whole batch jointly; the rest place jobs
    /// independently in order.
    pub fn assign_batch(&mut self, jobs: &[&Job], candidates: &[VmCandidate]) -> HashMap<JobId, u32> {
        if candidates.is_empty() {
            return HashMap::new();
        }
        match self.algorithm {
            SchedulingAlgorithm::MinMin => self.min_min(jobs, candidates),
            SchedulingAlgorithm::MaxMin => self.max_min(jobs, candidates),
            _ => jobs.iter().filter_map(|&job| self.select_vm(job, candidates).map(|vm| (job.id, vm))).collect(),
        }
    }

    /// Single-job placement for the algorithms that don't need batch-wide context.
    fn select_vm(&mut self, job: &Job, candidates: &[VmCandidate]) -> Option<u32> {
        match self.algorithm {
            SchedulingAlgorithm::Static => job.vm_id,
            SchedulingAlgorithm::Fcfs => candidates.iter().min_by(|a, b| a.queue_finish.partial_cmp(&b.queue_finish).unwrap()).map(|c| c.id),
            SchedulingAlgorithm::RoundRobin => {
                let vm = candidates[self.round_robin_next % candidates.len()].id;
                self.round_robin_next += 1;
                Some(vm)
            }
            SchedulingAlgorithm::Mct => {
                candidates.iter().min_by(|a, b| a.completion_time(job).partial_cmp(&b.completion_time(job)).unwrap()).map(|c| c.id)
            }
            // Without per-datacenter replica-catalog visibility at this layer, DATA degrades to MCT -
            // the datacenter still skips the transfer cost for files already resident once the job lands.
            SchedulingAlgorithm::Data => {
                candidates.iter().min_by(|a, b| a.completion_time(job).partial_cmp(&b.completion_time(job)).unwrap()).map(|c| c.id)
            }
            SchedulingAlgorithm::MinMin | SchedulingAlgorithm::MaxMin => {
                candidates.iter().min_by(|a, b| a.completion_time(job).partial_cmp(&b.completion_time(job)).unwrap()).map(|c| c.id)
            }
        }
    }

    /// Classic Min-Min: repeatedly picks the (job, VM) pair with the smallest completion time across the
    /// whole remaining batch, assigns it, advances that VM's queue, and repeats.
    fn min_min(&self, jobs: &[&Job], candidates: &[VmCandidate]) -> HashMap<JobId, u32> {
        self.greedy_min(jobs, candidates, false)
    }

    /// Classic Max-Min: like Min-Min, but at each round picks the job with the *largest* best completion
    /// time (to keep long jobs from starving at the back of the batch), still assigning it to its own
    /// fastest-finishing VM.
    fn max_min(&self, jobs: &[&Job], candidates: &[VmCandidate]) -> HashMap<JobId, u32> {
        self.greedy_min(jobs, candidates, true)
    }

    fn greedy_min(&self, jobs: &[&Job], candidates: &[VmCandidate], pick_max: bool) -> HashMap<JobId, u32> {
        let mut queue_finish: HashMap<u32, f64> = candidates.iter().map(|c| (c.id, c.queue_finish)).collect();
        let mut remaining: Vec<&Job> = jobs.to_vec();
        let mut assignment = HashMap::new();

        while !remaining.is_empty() {
            let mut best: Option<(usize, u32, f64)> = None; // (index in remaining, vm id, completion)
            for (idx, &job) in remaining.iter().enumerate() {
                let mut job_best: Option<(u32, f64)> = None;
                for c in candidates {
                    let completion = *queue_finish.get(&c.id).unwrap() + c.exec_time(job);
                    if job_best.map(|(_, best_c)| completion < best_c).unwrap_or(true) {
                        job_best = Some((c.id, completion));
                    }
                }
                let Some((vm_id, completion)) = job_best else { continue };
                let better = match best {
                    None => true,
                    Some((_, _, best_completion)) => {
                        if pick_max {
                            completion > best_completion
                        } else {
                            completion < best_completion
                        }
                    }
                };
                if better {
                    best = Some((idx, vm_id, completion));
                }
            }
            let Some((idx, vm_id, completion)) = best else { break };
            let job = remaining.remove(idx);
            assignment.insert(job.id, vm_id);
            queue_finish.insert(vm_id, completion);
        }
        assignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobClass;

    fn job(id: JobId, length: u64, vm_id: Option<u32>) -> Job {
        let mut j = Job::new(id, JobClass::Compute, 0);
        j.length = length;
        j.vm_id = vm_id;
        j
    }

    fn candidate(id: u32, mips: f64) -> VmCandidate {
        VmCandidate { id, mips_per_pe: mips, pe_count: 1, queue_finish: 0. }
    }

    #[test]
    fn static_honors_the_planners_assignment() {
        let mut sched = Scheduler::new(SchedulingAlgorithm::Static);
        let j = job(0, 1000, Some(3));
        let candidates = [candidate(0, 1000.), candidate(3, 1000.)];
        let assignment = sched.assign_batch(&[&j], &candidates);
        assert_eq!(assignment[&0], 3);
    }

    #[test]
    fn round_robin_cycles_through_candidates() {
        let mut sched = Scheduler::new(SchedulingAlgorithm::RoundRobin);
        let candidates = [candidate(0, 1000.), candidate(1, 1000.)];
        assert_eq!(sched.select_vm(&job(0, 1000, None), &candidates), Some(0));
        assert_eq!(sched.select_vm(&job(1, 1000, None), &candidates), Some(1));
        assert_eq!(sched.select_vm(&job(2, 1000, None), &candidates), Some(0));
    }

    #[test]
    fn mct_picks_the_faster_vm() {
        let mut sched = Scheduler::new(SchedulingAlgorithm::Mct);
        let candidates = [candidate(0, 500.), candidate(1, 2000.)];
        assert_eq!(sched.select_vm(&job(0, 1000, None), &candidates), Some(1));
    }

    #[test]
    fn min_min_assigns_the_shortest_job_to_its_best_vm_first() {
        let sched = Scheduler::new(SchedulingAlgorithm::MinMin);
        let small = job(0, 500, None);
        let big = job(1, 4000, None);
        let candidates = [candidate(0, 1000.), candidate(1, 1000.)];
        let assignment = sched.assign_batch(&[&small, &big], &candidates);
        assert_eq!(assignment.len(), 2);
        assert_ne!(assignment[&0], u32::MAX);
    }
}
