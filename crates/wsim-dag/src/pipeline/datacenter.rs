//! Datacenter (C3): hosts, VM placement and the space-shared cloudlet submission path (§4.3).
//!
//! Listens for the fixed CloudSim-style tag set from [`wsim_iaas::core::events`] for VM/data
//! housekeeping, plus the pipeline-local [`SubmitJob`]/[`JobCompleted`] pair for the actual job
//! dispatch, since a job's content (files, required_files, length) lives in [`WorkflowState`]
//! rather than on the wire.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use wsim_core::{cast, log_info, Event, EventHandler, Id, SimulationContext};
use wsim_iaas::core::allocation_policy::AllocationPolicy;
use wsim_iaas::core::characteristics::{Characteristics, CostModel};
use wsim_iaas::core::cloudlet_scheduler::CloudletSpec;
use wsim_iaas::core::events::{
    CloudletCancel, CloudletMove, CloudletPause, CloudletPauseAck, CloudletResume,
    CloudletResumeAck, CloudletStatusRequest, DataAdd, DataDelete, DatacenterTick, FreePesReply,
    FreePesRequest, Ping, PingReply, ResourceCharacteristicsRequest, VmCreate, VmCreateAck,
    VmDestroy, VmDestroyAck, VmMigrate, VmMigrateAck,
};
use wsim_iaas::core::host::Host;
use wsim_iaas::core::vm::{Vm, VmCost};

use crate::file_item::FileKind;
use crate::job::{JobClass, JobId, JobStatus};
use crate::parsers::config::FileSystemMode;
use crate::pipeline::events::{ForwardedJobMove, JobCompleted, SubmitJob};
use crate::pipeline::state::SharedState;
use crate::replica_catalog::{local_transfer_time, shared_transfer_time, ReplicaCatalog, Site};

/// Static VM spec a datacenter builds a real [`Vm`] from once the scheduler asks for it - the
/// `VmCreate` event itself only carries a `vm_id`, so this table is how the datacenter learns what
/// that id actually means.
#[derive(Clone, Debug)]
pub struct VmBlueprint {
    pub user_id: u32,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    pub ram: u64,
    pub bw: u64,
    pub image_size: u64,
    pub cost: Option<VmCost>,
}

pub struct Datacenter {
    id_num: u32,
    hosts: BTreeMap<u32, Host>,
    allocation_policy: Box<dyn AllocationPolicy>,
    characteristics: Characteristics,
    vm_catalog: Rc<BTreeMap<u32, VmBlueprint>>,
    host_of_vm: BTreeMap<u32, u32>,
    replica_catalog: Rc<RefCell<ReplicaCatalog>>,
    max_storage_transfer_rate: f64,
    state: SharedState,
    scheduler_of: std::collections::HashMap<JobId, Id>,
    /// Entity id of every datacenter in the run, including this one, keyed by its §3 numeric id -
    /// filled in once by [`Self::set_peers`] after every datacenter has been registered with the
    /// kernel, since a datacenter doesn't otherwise have a way to name a sibling (§4.3 cloudlet move).
    peer_datacenters: BTreeMap<u32, Id>,
    min_time_between_events: f64,
    ctx: SimulationContext,
}

impl Datacenter {
    pub fn new(
        id_num: u32,
        hosts: BTreeMap<u32, Host>,
        allocation_policy: Box<dyn AllocationPolicy>,
        characteristics: Characteristics,
        vm_catalog: Rc<BTreeMap<u32, VmBlueprint>>,
        replica_catalog: Rc<RefCell<ReplicaCatalog>>,
        max_storage_transfer_rate: f64,
        state: SharedState,
        ctx: SimulationContext,
    ) -> Self {
        Self {
            id_num,
            hosts,
            allocation_policy,
            characteristics,
            vm_catalog,
            host_of_vm: BTreeMap::new(),
            replica_catalog,
            max_storage_transfer_rate,
            state,
            scheduler_of: std::collections::HashMap::new(),
            peer_datacenters: BTreeMap::new(),
            min_time_between_events: 0.01,
            ctx,
        }
    }

    /// Wires this datacenter up to every datacenter in the run (itself included), so a cloudlet
    /// move naming a remote destination (§4.3) has somewhere to send the forwarded job.
    pub fn set_peers(&mut self, peers: BTreeMap<u32, Id>) {
        self.peer_datacenters = peers;
    }

    fn site(&self, vm_id: u32) -> Site {
        match self.replica_catalog.borrow().mode() {
            FileSystemMode::Shared => Site::Datacenter(self.id_num),
            FileSystemMode::Local => Site::Vm(vm_id),
        }
    }

    /// Re-runs `update_vm_processing` for every VM on every host, draining finished cloudlets back
    /// into `WorkflowState` and notifying whichever scheduler submitted each one. Returns the
    /// earliest next-tick time observed across all VMs, if any are still executing.
    fn run_processing_pass(&mut self) -> Option<f64> {
        let now = self.ctx.time();
        let mut next_tick: Option<f64> = None;
        let mut to_notify = Vec::new();
        let mut to_start = Vec::new();

        for host in self.hosts.values_mut() {
            host.record_energy(now);
            let vm_ids: Vec<u32> = host.vms.keys().copied().collect();
            for vm_id in vm_ids {
                let mips_share = host.allocated_mips_for(vm_id);
                let vm = host.vms.get_mut(&vm_id).unwrap();
                if let Some(t) = vm.cloudlet_scheduler.update_vm_processing(now, &mips_share, self.min_time_between_events) {
                    next_tick = Some(next_tick.map_or(t, |cur: f64| cur.min(t)));
                }
                for rc in vm.cloudlet_scheduler.take_finished() {
                    to_notify.push((rc.spec.id as JobId, vm_id, rc.total_completion_time));
                }
                for (id, start) in vm.cloudlet_scheduler.take_started() {
                    to_start.push((id as JobId, start));
                }
            }
        }

        for (job_id, start) in to_start {
            self.start_job(job_id, start);
        }
        for (job_id, vm_id, elapsed) in to_notify {
            self.finish_job(job_id, vm_id, elapsed, now);
        }

        next_tick
    }

    /// Stamps a job's and its tasks' actual execution start - called once a cloudlet genuinely
    /// begins running, which for a space-shared contention case can be later than its submit time.
    fn start_job(&mut self, job_id: JobId, now: f64) {
        let mut state = self.state.borrow_mut();
        let job = match state.job_mut(job_id) {
            Some(j) => j,
            None => return,
        };
        job.start_time = Some(now);
        let job_tasks = job.tasks.clone();
        let dag_tasks = state.dag.tasks_mut();
        for &t in &job_tasks {
            dag_tasks[t].start = Some(now);
        }
    }

    fn finish_job(&mut self, job_id: JobId, vm_id: u32, elapsed: f64, now: f64) {
        let site = self.site(vm_id);
        let cost = {
            let mut state = self.state.borrow_mut();
            let job = match state.job_mut(job_id) {
                Some(j) => j,
                None => return,
            };
            job.status = JobStatus::Success;
            job.finish_time = Some(now);
            let job_tasks = job.tasks.clone();
            let cost = match self.characteristics.cost_model {
                CostModel::Datacenter => self.characteristics.cost_per_second * elapsed,
                CostModel::Vm => self
                    .host_of_vm
                    .get(&vm_id)
                    .and_then(|hid| self.hosts.get(hid))
                    .and_then(|h| h.vms.get(&vm_id))
                    .and_then(|v| v.cost)
                    .map(|c| c.per_second * elapsed)
                    .unwrap_or(0.),
            };
            job.cost = cost;
            let files = job.files.clone();
            for file in files.iter().filter(|f| f.kind == FileKind::Output) {
                self.replica_catalog.borrow_mut().register(&file.name, site);
            }
            let dag_tasks = state.dag.tasks_mut();
            for &t in &job_tasks {
                dag_tasks[t].finish = Some(now);
            }
            cost
        };
        log_info!(self.ctx, format!("job {} finished on vm {} (cost {:.4})", job_id, vm_id, cost));
        if let Some(&dst) = self.scheduler_of.get(&job_id) {
            self.ctx.emit_now(JobCompleted { job_id }, dst);
        }
    }

    /// Computes the transfer time for `required_files` not already present at `vm_id`'s site, and
    /// registers them as present there afterwards (§4.6).
    fn stage_required_files(&self, required_files: &[String], sizes: &std::collections::HashMap<String, u64>, vm_id: u32) -> f64 {
        let target = self.site(vm_id);
        let mode = self.replica_catalog.borrow().mode();
        let mut total = 0.;
        let mut catalog = self.replica_catalog.borrow_mut();
        for name in required_files {
            if catalog.is_present_at(name, target) {
                continue;
            }
            let size = *sizes.get(name).unwrap_or(&1);
            total += match mode {
                FileSystemMode::Shared => shared_transfer_time(size, self.max_storage_transfer_rate),
                FileSystemMode::Local => {
                    let dst_bw = self
                        .host_of_vm
                        .get(&vm_id)
                        .and_then(|hid| self.hosts.get(hid))
                        .and_then(|h| h.vms.get(&vm_id))
                        .map(|v| v.bw as f64)
                        .unwrap_or(1.);
                    local_transfer_time(size, None, dst_bw)
                }
            };
            catalog.register(name, target);
        }
        total
    }

    fn vm_capacity(&self, vm_id: u32) -> f64 {
        self.host_of_vm
            .get(&vm_id)
            .and_then(|hid| self.hosts.get(hid))
            .and_then(|h| h.vms.get(&vm_id))
            .map(|v| v.mips_per_pe)
            .unwrap_or(1.)
    }

    /// Submits `job_id`, already assigned to `self.scheduler_of`, to its bound VM (§4.3 cloudlet
    /// submit). Shared by a fresh [`SubmitJob`] and by a [`ForwardedJobMove`] landing from another
    /// datacenter - both just need the job's content re-read out of shared state and charged.
    fn do_submit(&mut self, job_id: JobId) {
        self.run_processing_pass();
        let now = self.ctx.time();
        let scheduler = match self.scheduler_of.get(&job_id).copied() {
            Some(s) => s,
            None => return,
        };
        let snapshot = {
            let state = self.state.borrow();
            state.job(job_id).map(|j| (j.class, j.status, j.vm_id, j.required_files.clone(), j.files.clone(), j.length, j.tasks.clone()))
        };
        let (class, status, vm_id_opt, required_files, files, length, tasks) = match snapshot {
            Some(s) => s,
            None => return,
        };
        if matches!(status, JobStatus::Success | JobStatus::Failed) {
            log_info!(self.ctx, format!("job {} already finished, ignoring stale submission", job_id));
            self.ctx.emit_now(JobCompleted { job_id }, scheduler);
            return;
        }
        if class == JobClass::StageIn {
            let site = Site::Datacenter(self.id_num);
            for f in &files {
                self.replica_catalog.borrow_mut().register(&f.name, site);
            }
            let mut state = self.state.borrow_mut();
            if let Some(job) = state.job_mut(job_id) {
                job.status = JobStatus::Success;
                job.start_time = Some(now);
                job.finish_time = Some(now);
                job.cost = 0.;
            }
            drop(state);
            log_info!(self.ctx, format!("stage-in job {} wrote {} file(s)", job_id, files.len()));
            self.ctx.emit_now(JobCompleted { job_id }, scheduler);
            return;
        }
        let vm_id = match vm_id_opt {
            Some(v) => v,
            None => {
                log_info!(self.ctx, format!("job {} has no vm assignment, cannot submit", job_id));
                return;
            }
        };
        let pes = {
            let state = self.state.borrow();
            tasks.iter().filter_map(|&t| state.dag.task(t).ok().map(|t| t.pes)).max().unwrap_or(1)
        };
        let sizes: std::collections::HashMap<String, u64> = files.iter().map(|f| (f.name.clone(), f.size)).collect();
        let file_transfer_time = self.stage_required_files(&required_files, &sizes, vm_id);
        let capacity = self.vm_capacity(vm_id);
        let spec = CloudletSpec { id: job_id as u64, length_mi: length as f64, pes };
        if let Some(&host_id) = self.host_of_vm.get(&vm_id) {
            if let Some(host) = self.hosts.get_mut(&host_id) {
                if let Some(vm) = host.vms.get_mut(&vm_id) {
                    vm.cloudlet_scheduler.cloudlet_submit(spec, now, file_transfer_time, capacity);
                }
            }
        }
        // Real start time is stamped by `run_processing_pass` via the cloudlet scheduler's
        // `started` queue, which distinguishes "submitted" from "actually began executing" -
        // a job queued behind space-shared contention starts later than it was submitted.
        let next = self.run_processing_pass();
        self.schedule_tick(next);
    }

    /// Cancels `job_id` wherever it currently sits in exec/waiting on this datacenter's hosts,
    /// returning `true` if it was found (§4.3 cloudlet move, first step).
    fn cancel_here(&mut self, job_id: JobId) -> bool {
        let mut found = false;
        for host in self.hosts.values_mut() {
            for vm in host.vms.values_mut() {
                if vm.cloudlet_scheduler.cloudlet_cancel(job_id as u64).is_some() {
                    found = true;
                }
            }
        }
        found
    }

    fn schedule_tick(&self, at: Option<f64>) {
        if let Some(t) = at {
            let delay = (t - self.ctx.time()).max(0.);
            self.ctx.emit_self(DatacenterTick {}, delay);
        }
    }

    /// Every VM currently placed on this datacenter, for end-of-run metrics (§6 Output metrics).
    pub fn snapshot_vms(&self) -> Vec<Vm> {
        self.hosts.values().flat_map(|h| h.vms.values().cloned()).collect()
    }

    /// Sum of every host's integrated energy consumption so far.
    pub fn total_energy(&self) -> f64 {
        self.hosts.values().map(|h| h.energy_meter.energy_consumed()).sum()
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            VmCreate { vm_id, ack } => {
                let blueprint = self.vm_catalog.get(&vm_id).cloned();
                let success = if let Some(bp) = blueprint {
                    let mut vm = Vm::new(vm_id, bp.user_id, bp.mips_per_pe, bp.pe_count, bp.ram, bp.bw, bp.image_size);
                    if let Some(cost) = bp.cost {
                        vm = vm.with_cost(cost);
                    }
                    let host_id = self.allocation_policy.select_host(&vm, &self.hosts);
                    match host_id {
                        Some(hid) => match self.hosts.get_mut(&hid).unwrap().vm_create(vm) {
                            Ok(()) => {
                                self.host_of_vm.insert(vm_id, hid);
                                true
                            }
                            Err(_) => false,
                        },
                        None => false,
                    }
                } else {
                    false
                };
                log_info!(self.ctx, format!("vm {} creation {}", vm_id, if success { "succeeded" } else { "failed" }));
                if ack {
                    self.ctx.emit_now(VmCreateAck { vm_id, success }, event.src);
                }
            }
            VmDestroy { vm_id, ack } => {
                let success = self
                    .host_of_vm
                    .remove(&vm_id)
                    .and_then(|hid| self.hosts.get_mut(&hid))
                    .and_then(|h| h.vm_destroy(vm_id))
                    .is_some();
                if ack {
                    self.ctx.emit_now(VmDestroyAck { vm_id, success }, event.src);
                }
            }
            VmMigrate { vm_id, dest_host_id, ack } => {
                let success = if let Some(&src_host) = self.host_of_vm.get(&vm_id) {
                    if let Some(vm) = self.hosts.get_mut(&src_host).and_then(|h| h.vm_destroy(vm_id)) {
                        match self.hosts.get_mut(&dest_host_id) {
                            Some(dest) if dest.vm_create(vm).is_ok() => {
                                self.host_of_vm.insert(vm_id, dest_host_id);
                                true
                            }
                            _ => false,
                        }
                    } else {
                        false
                    }
                } else {
                    false
                };
                if ack {
                    self.ctx.emit_now(VmMigrateAck { vm_id, success }, event.src);
                }
            }
            ResourceCharacteristicsRequest {} => {
                // No reply struct exists in the shared event set; datacenters are looked up by id out of band
                // by whoever configured the run, so this tag is accepted and logged but otherwise a no-op.
                log_info!(self.ctx, "characteristics request received");
            }
            FreePesRequest {} => {
                let free = self.hosts.values().map(|h| h.pe_count() - h.vms.len() as u32).sum::<u32>();
                self.ctx.emit_now(FreePesReply { free_pes: free }, event.src);
            }
            SubmitJob { job_id } => {
                self.scheduler_of.insert(job_id, event.src);
                self.do_submit(job_id);
            }
            ForwardedJobMove { job_id, scheduler } => {
                self.scheduler_of.insert(job_id, scheduler);
                self.do_submit(job_id);
            }
            DatacenterTick {} => {
                let next = self.run_processing_pass();
                self.schedule_tick(next);
            }
            DataAdd { file_name, size: _, vm_id } => {
                let site = vm_id.map(Site::Vm).unwrap_or(Site::Datacenter(self.id_num));
                self.replica_catalog.borrow_mut().register(&file_name, site);
            }
            DataDelete { file_name: _, vm_id: _ } => {
                // Deletions are out of scope for replica bookkeeping: the catalog only tracks "has this
                // file ever landed here", which is what transfer-avoidance needs.
            }
            CloudletCancel { cloudlet_id } => {
                for host in self.hosts.values_mut() {
                    for vm in host.vms.values_mut() {
                        if vm.cloudlet_scheduler.cloudlet_cancel(cloudlet_id).is_some() {
                            break;
                        }
                    }
                }
            }
            CloudletPause { cloudlet_id, ack } => {
                let mut success = false;
                for host in self.hosts.values_mut() {
                    for vm in host.vms.values_mut() {
                        if vm.cloudlet_scheduler.cloudlet_pause(cloudlet_id, self.ctx.time()) {
                            success = true;
                        }
                    }
                }
                if ack {
                    self.ctx.emit_now(CloudletPauseAck { cloudlet_id, success }, event.src);
                }
            }
            CloudletResume { cloudlet_id, ack } => {
                let mut success = false;
                for host in self.hosts.values_mut() {
                    for vm in host.vms.values_mut() {
                        if vm.cloudlet_scheduler.cloudlet_resume(cloudlet_id, self.ctx.time()) {
                            success = true;
                        }
                    }
                }
                if ack {
                    self.ctx.emit_now(CloudletResumeAck { cloudlet_id, success }, event.src);
                }
            }
            CloudletMove { cloudlet_id, dest_vm_id, dest_datacenter } => {
                let job_id = cloudlet_id as JobId;
                if !self.cancel_here(job_id) {
                    log_info!(self.ctx, format!("cloudlet {} not found on this datacenter, move ignored", cloudlet_id));
                    return;
                }
                {
                    let mut state = self.state.borrow_mut();
                    if let Some(job) = state.job_mut(job_id) {
                        job.vm_id = Some(dest_vm_id);
                    }
                }
                let target_dc = dest_datacenter.map(|d| d as u32).unwrap_or(self.id_num);
                if target_dc == self.id_num {
                    log_info!(self.ctx, format!("cloudlet {} moved to local vm {}", cloudlet_id, dest_vm_id));
                    self.do_submit(job_id);
                } else if let Some(&peer) = self.peer_datacenters.get(&target_dc) {
                    let scheduler = self.scheduler_of.remove(&job_id).unwrap_or(event.src);
                    log_info!(self.ctx, format!("cloudlet {} forwarded to datacenter {} vm {}", cloudlet_id, target_dc, dest_vm_id));
                    self.ctx.emit_now(ForwardedJobMove { job_id, scheduler }, peer);
                } else {
                    log_info!(self.ctx, format!("cloudlet {} move names unknown datacenter {}, dropped", cloudlet_id, target_dc));
                }
            }
            CloudletStatusRequest { cloudlet_id } => {
                log_info!(self.ctx, format!("status request for cloudlet {} received", cloudlet_id));
            }
            Ping { hops, sent_time } => {
                self.ctx.emit_now(PingReply { hops, sent_time }, event.src);
            }
        })
    }
}
