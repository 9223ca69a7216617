//! Workflow Scheduler (C4): VM bring-up, per-job placement and failure sampling on return (§4.4, §4.7).
//!
//! Owns the [`FailureModel`] - per §4.7 the scheduler is what "invokes the Failure Generator" on each
//! job return, flips the job to FAILED when any member task lands inside a sampled failure window, and
//! only then forwards the return to the workflow engine (which owns re-clustering instead, see
//! [`super::workflow_engine`]).

use std::collections::{HashMap, HashSet};

use wsim_core::{cast, log_info, Event, EventHandler, Id, SimulationContext};
use wsim_iaas::core::events::{VmCreate, VmCreateAck};

use crate::failure::FailureModel;
use crate::job::{JobClass, JobId, JobStatus};
use crate::overhead::OverheadModel;
use crate::parsers::config::SchedulingAlgorithm;
use crate::pipeline::events::{JobBatch, JobCompleted, JobReturn, SubmitJob};
use crate::pipeline::state::SharedState;
use crate::planning::VmSpec;
use crate::scheduling::{Scheduler, VmCandidate};

pub struct WorkflowScheduler {
    state: SharedState,
    overhead: OverheadModel,
    failure_model: FailureModel,
    scheduler: Scheduler,
    vms: Vec<VmSpec>,
    dc_of_vm: HashMap<u32, Id>,
    datacenters: Vec<Id>,
    queue_finish: HashMap<u32, f64>,
    engine: Id,
    ctx: SimulationContext,

    vm_create_requested: bool,
    vms_ready: bool,
    pending_vm_creates: usize,
    pending_until_ready: Vec<JobId>,
    returned_once: HashSet<JobId>,
}

impl WorkflowScheduler {
    pub fn new(
        state: SharedState,
        overhead: OverheadModel,
        failure_model: FailureModel,
        algorithm: SchedulingAlgorithm,
        vms: Vec<VmSpec>,
        dc_of_vm: HashMap<u32, Id>,
        ctx: SimulationContext,
    ) -> Self {
        let mut datacenters: Vec<Id> = dc_of_vm.values().copied().collect();
        datacenters.sort_unstable();
        datacenters.dedup();
        Self {
            state,
            overhead,
            failure_model,
            scheduler: Scheduler::new(algorithm),
            vms,
            dc_of_vm,
            datacenters,
            queue_finish: HashMap::new(),
            engine: 0,
            ctx,
            vm_create_requested: false,
            vms_ready: false,
            pending_vm_creates: 0,
            pending_until_ready: Vec::new(),
            returned_once: HashSet::new(),
        }
    }

    pub fn set_engine(&mut self, id: Id) {
        self.engine = id;
    }

    fn request_vm_creation(&mut self) {
        self.vm_create_requested = true;
        let mut vm_ids: Vec<u32> = self.dc_of_vm.keys().copied().collect();
        vm_ids.sort_unstable();
        for vm_id in vm_ids {
            let dc = self.dc_of_vm[&vm_id];
            self.ctx.emit_now(VmCreate { vm_id, ack: true }, dc);
            self.pending_vm_creates += 1;
        }
        if self.pending_vm_creates == 0 {
            self.vms_ready = true;
        }
    }

    fn candidates(&self) -> Vec<VmCandidate> {
        self.vms
            .iter()
            .map(|v| VmCandidate {
                id: v.id,
                mips_per_pe: v.mips_per_pe,
                pe_count: v.pe_count,
                queue_finish: self.queue_finish.get(&v.id).copied().unwrap_or(0.),
            })
            .collect()
    }

    fn dispatch_jobs(&mut self, job_ids: Vec<JobId>) {
        let (stage_in, rest): (Vec<JobId>, Vec<JobId>) = {
            let state = self.state.borrow();
            job_ids.into_iter().partition(|&id| state.job(id).map(|j| j.class == JobClass::StageIn).unwrap_or(false))
        };

        for job_id in stage_in {
            for &dc in &self.datacenters {
                let delay = self.overhead.queue_delay();
                self.ctx.emit(SubmitJob { job_id }, dc, delay);
            }
        }

        if rest.is_empty() {
            return;
        }
        let candidates = self.candidates();
        let assignment = {
            let state = self.state.borrow();
            let jobs: Vec<&crate::job::Job> = rest.iter().filter_map(|&id| state.job(id)).collect();
            self.scheduler.assign_batch(&jobs, &candidates)
        };
        for job_id in rest {
            let Some(&vm_id) = assignment.get(&job_id) else {
                log_info!(self.ctx, format!("job {} could not be placed on any vm, dropping", job_id));
                continue;
            };
            let (dc, exec_time) = {
                let mut state = self.state.borrow_mut();
                let mips_per_pe = self.vms.iter().find(|v| v.id == vm_id).map(|v| v.mips_per_pe).unwrap_or(1.);
                let exec_time = state.job(job_id).map(|j| j.length as f64 / mips_per_pe.max(f64::MIN_POSITIVE)).unwrap_or(0.);
                if let Some(job) = state.job_mut(job_id) {
                    job.vm_id = Some(vm_id);
                }
                (self.dc_of_vm.get(&vm_id).copied(), exec_time)
            };
            let base = self.queue_finish.get(&vm_id).copied().unwrap_or(self.ctx.time());
            self.queue_finish.insert(vm_id, base.max(self.ctx.time()) + exec_time);
            let Some(dc) = dc else {
                log_info!(self.ctx, format!("vm {} has no known datacenter, dropping job {}", vm_id, job_id));
                continue;
            };
            let delay = self.overhead.queue_delay();
            self.ctx.emit(SubmitJob { job_id }, dc, delay);
        }
    }
}

impl EventHandler for WorkflowScheduler {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            JobBatch { job_ids } => {
                if !self.vm_create_requested {
                    self.request_vm_creation();
                }
                if self.vms_ready {
                    self.dispatch_jobs(job_ids);
                } else {
                    self.pending_until_ready.extend(job_ids);
                }
            }
            VmCreateAck { vm_id, success } => {
                log_info!(self.ctx, format!("vm {} creation ack: {}", vm_id, success));
                self.pending_vm_creates = self.pending_vm_creates.saturating_sub(1);
                if self.pending_vm_creates == 0 && !self.vms_ready {
                    self.vms_ready = true;
                    let pending = std::mem::take(&mut self.pending_until_ready);
                    if !pending.is_empty() {
                        self.dispatch_jobs(pending);
                    }
                }
            }
            JobCompleted { job_id } => {
                if !self.returned_once.insert(job_id) {
                    return;
                }
                {
                    let mut state = self.state.borrow_mut();
                    let job_snapshot = state.job(job_id).cloned();
                    if let Some(job) = job_snapshot {
                        let failed = self.failure_model.evaluate_job(&job, state.dag.tasks_mut());
                        if failed {
                            if let Some(j) = state.job_mut(job_id) {
                                j.status = JobStatus::Failed;
                            }
                        }
                    }
                }
                let delay = self.overhead.post_delay();
                self.ctx.emit(JobReturn { job_id }, self.engine, delay);
            }
        })
    }
}
