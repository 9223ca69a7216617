//! Workflow Engine (C4): ready-set computation, WED batching, failure/re-clustering handling (§4.4, §4.7).

use std::collections::HashSet;

use wsim_core::{cast, log_info, Event, EventHandler, Id, SimulationContext};

use crate::failure::monitor::FailureMonitor;
use crate::failure::reclustering::{self, ReclusteringPolicy};
use crate::job::{Job, JobId, JobStatus};
use crate::overhead::OverheadModel;
use crate::pipeline::events::{EngineTick, JobBatch, JobReturn, JobsClustered};
use crate::pipeline::state::SharedState;

pub struct WorkflowEngine {
    state: SharedState,
    overhead: OverheadModel,
    reclustering_policy: ReclusteringPolicy,
    failure_monitor: FailureMonitor,
    scheduler: Id,
    ctx: SimulationContext,
    /// Jobs already placed in a batch (so a later tick doesn't re-offer them).
    delivered: HashSet<JobId>,
    /// Jobs that have come back from the scheduler (success or failure), used for parent checks.
    returned: HashSet<JobId>,
}

impl WorkflowEngine {
    pub fn new(
        state: SharedState,
        overhead: OverheadModel,
        reclustering_policy: ReclusteringPolicy,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            state,
            overhead,
            reclustering_policy,
            failure_monitor: FailureMonitor::new(),
            scheduler: 0,
            ctx,
            delivered: HashSet::new(),
            returned: HashSet::new(),
        }
    }

    pub fn set_scheduler(&mut self, id: Id) {
        self.scheduler = id;
    }

    fn dispatch_ready_jobs(&mut self) {
        let ready: Vec<JobId> = {
            let state = self.state.borrow();
            state
                .jobs
                .iter()
                .filter(|j| !self.delivered.contains(&j.id))
                .filter(|j| j.parents.iter().all(|p| self.returned.contains(p)))
                .map(|j| j.id)
                .collect()
        };
        if ready.is_empty() {
            return;
        }
        let interval = self.overhead.wed_interval().max(1);
        for chunk in ready.chunks(interval) {
            let delay = self.overhead.wed_delay();
            for &id in chunk {
                self.delivered.insert(id);
            }
            log_info!(self.ctx, format!("dispatching batch of {} jobs after {:.3}s WED delay", chunk.len(), delay));
            self.ctx.emit(JobBatch { job_ids: chunk.to_vec() }, self.scheduler, delay);
        }
    }

    /// Replaces every reference to `old_id` in the job graph with `new_ids`, so downstream jobs that
    /// depended on the failed job now depend on all of its replacements (§9 "dependency rewiring").
    fn rewire_after_recluster(&self, old_id: JobId, new_ids: &[JobId]) {
        let mut state = self.state.borrow_mut();
        for job in state.jobs.iter_mut() {
            if job.parents.contains(&old_id) {
                job.parents.retain(|&p| p != old_id);
                for &n in new_ids {
                    if !job.parents.contains(&n) {
                        job.parents.push(n);
                    }
                }
            }
            if job.children.contains(&old_id) {
                job.children.retain(|&c| c != old_id);
                for &n in new_ids {
                    if !job.children.contains(&n) {
                        job.children.push(n);
                    }
                }
            }
        }
    }

    fn handle_return(&mut self, job_id: JobId) {
        let job_snapshot: Job = {
            let state = self.state.borrow();
            state.job(job_id).cloned().expect("returned job must exist")
        };
        self.returned.insert(job_id);

        if job_snapshot.status == JobStatus::Failed {
            let mut state = self.state.borrow_mut();
            self.failure_monitor.analyze(&job_snapshot, state.dag.tasks());
            let mut next_id = state.peek_next_job_id();
            let mut new_jobs = reclustering::process(
                self.reclustering_policy,
                &job_snapshot,
                state.dag.tasks(),
                &self.failure_monitor,
                &mut next_id,
            );
            state.fast_forward_job_id(next_id);
            for job in new_jobs.iter_mut() {
                for &t in &job.tasks {
                    state.job_of_task.insert(t, job.id);
                }
            }
            let new_ids: Vec<JobId> = new_jobs.iter().map(|j| j.id).collect();
            state.jobs.extend(new_jobs);
            drop(state);
            self.rewire_after_recluster(job_id, &new_ids);
            log_info!(self.ctx, format!("job {} failed, re-clustered into {} replacement job(s)", job_id, new_ids.len()));
            let delay = self.overhead.cluster_delay();
            self.ctx.emit_self(EngineTick {}, delay);
        } else {
            self.ctx.emit_self_now(EngineTick {});
        }
    }
}

impl EventHandler for WorkflowEngine {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            JobsClustered {} => {
                self.ctx.emit_self_now(EngineTick {});
            }
            EngineTick {} => {
                self.dispatch_ready_jobs();
            }
            JobReturn { job_id } => {
                self.handle_return(job_id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::TaskDag;
    use crate::failure::reclustering::ReclusteringPolicy;
    use crate::job::JobClass;
    use crate::overhead::OverheadModel;
    use crate::parsers::config::OverheadParams;
    use crate::pipeline::state::WorkflowState;
    use wsim_core::Simulation;

    fn make_ctx(sim: &mut Simulation, name: &str) -> SimulationContext {
        sim.create_context(name)
    }

    #[test]
    fn ready_set_excludes_jobs_whose_parent_has_not_returned() {
        let mut sim = Simulation::new(1);
        let ctx = make_ctx(&mut sim, "engine");
        let state = WorkflowState::new(TaskDag::new()).into_shared();
        {
            let mut s = state.borrow_mut();
            let mut a = Job::new(s.alloc_job_id(), JobClass::Compute, 0);
            a.parents = vec![];
            let b_id = s.alloc_job_id();
            let mut b = Job::new(b_id, JobClass::Compute, 0);
            b.parents = vec![a.id];
            s.jobs.push(a);
            s.jobs.push(b);
        }
        let overhead = OverheadModel::new(&OverheadParams::default(), 1);
        let mut engine = WorkflowEngine::new(state.clone(), overhead, ReclusteringPolicy::Noop, ctx);
        engine.dispatch_ready_jobs();
        assert_eq!(engine.delivered.len(), 1);
        assert!(engine.delivered.contains(&0));
    }

    #[test]
    fn rewire_after_recluster_replaces_old_id_in_dependents() {
        let mut sim = Simulation::new(1);
        let ctx = make_ctx(&mut sim, "engine");
        let state = WorkflowState::new(TaskDag::new()).into_shared();
        {
            let mut s = state.borrow_mut();
            let failed_id = s.alloc_job_id();
            let failed = Job::new(failed_id, JobClass::Compute, 0);
            let mut dependent = Job::new(s.alloc_job_id(), JobClass::Compute, 0);
            dependent.parents = vec![failed_id];
            s.jobs.push(failed);
            s.jobs.push(dependent);
        }
        let overhead = OverheadModel::new(&OverheadParams::default(), 1);
        let engine = WorkflowEngine::new(state.clone(), overhead, ReclusteringPolicy::Noop, ctx);
        engine.rewire_after_recluster(0, &[10, 11]);
        let s = state.borrow();
        assert_eq!(s.jobs[1].parents, vec![10, 11]);
    }
}
