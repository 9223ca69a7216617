//! Simulation builder (§6): wires `Planner -> ClusteringEngine -> WorkflowEngine ->
//! WorkflowScheduler -> Datacenter` (one per configured entry), then exposes the same thin
//! step/time passthroughs the host framework's own `DagSimulation` does.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use wsim_core::{Id, Simulation as Kernel};
use wsim_iaas::core::allocation_policy::{AllocationPolicy, FirstFit};
use wsim_iaas::core::characteristics::{Characteristics, CostModel as IaasCostModel};
use wsim_iaas::core::host::Host;
use wsim_iaas::core::vm::{Vm, VmCost};

use crate::dag::TaskDag;
use crate::distribution::DistributionSpec;
use crate::failure::reclustering::ReclusteringPolicy;
use crate::failure::{FailureMode, FailureModel};
use crate::job::Job;
use crate::metrics::{self, Metrics};
use crate::overhead::OverheadModel;
use crate::parsers::config::{CostModel as ParamsCostModel, Parameters};
use crate::pipeline::clustering::ClusteringEngine;
use crate::pipeline::datacenter::{Datacenter, VmBlueprint};
use crate::pipeline::events::StartSimulation;
use crate::pipeline::planner::Planner;
use crate::pipeline::state::WorkflowState;
use crate::pipeline::workflow_engine::WorkflowEngine;
use crate::pipeline::workflow_scheduler::WorkflowScheduler;
use crate::planning::VmSpec;
use crate::replica_catalog::ReplicaCatalog;
use crate::resource::DatacenterConfig;

fn to_iaas_cost_model(c: ParamsCostModel) -> IaasCostModel {
    match c {
        ParamsCostModel::Datacenter => IaasCostModel::Datacenter,
        ParamsCostModel::Vm => IaasCostModel::Vm,
    }
}

/// Assembles an [`ExperimentSimulation`] from a run seed plus the handful of knobs `Parameters`
/// has no field for (§9 open question: `FailureModel`'s mode/spec, the reclustering policy and the
/// allocation policy are all run-level choices the host's own config surface never exposed either).
pub struct SimulationBuilder {
    seed: u64,
    failure_mode: FailureMode,
    failure_spec: DistributionSpec,
    reclustering_policy: ReclusteringPolicy,
    max_storage_transfer_rate: f64,
}

impl SimulationBuilder {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            failure_mode: FailureMode::FailureAll,
            failure_spec: DistributionSpec::Constant(0.),
            reclustering_policy: ReclusteringPolicy::Noop,
            max_storage_transfer_rate: 1_000_000.,
        }
    }

    /// Defaults to a spec that never samples a failure, i.e. a clean run.
    pub fn with_failure_model(mut self, mode: FailureMode, spec: DistributionSpec) -> Self {
        self.failure_mode = mode;
        self.failure_spec = spec;
        self
    }

    pub fn with_reclustering_policy(mut self, policy: ReclusteringPolicy) -> Self {
        self.reclustering_policy = policy;
        self
    }

    /// SHARED-mode storage throughput (bytes/second-equivalent, same units `shared_transfer_time`
    /// expects) shared by every datacenter's storage volume.
    pub fn with_max_storage_transfer_rate(mut self, rate: f64) -> Self {
        self.max_storage_transfer_rate = rate;
        self
    }

    /// Builds every pipeline entity, wires them together, and emits the event that starts
    /// planning - the returned simulation is ready to be stepped.
    pub fn build(self, dag: TaskDag, params: &Parameters, resource_config: Vec<DatacenterConfig>) -> ExperimentSimulation {
        let state = WorkflowState::new(dag).into_shared();
        let overhead_for_engine = OverheadModel::new(&params.overhead_params, self.seed);
        let overhead_for_scheduler = OverheadModel::new(&params.overhead_params, self.seed);
        let failure_model = FailureModel::new(self.failure_mode, self.failure_spec, self.seed);
        let replica_catalog = Rc::new(RefCell::new(ReplicaCatalog::new(params.replica_catalog.file_system)));
        let characteristics = Characteristics { cost_model: to_iaas_cost_model(params.cost_model), ..Characteristics::default() };

        let mut vm_catalog: BTreeMap<u32, VmBlueprint> = BTreeMap::new();
        let mut vms: Vec<VmSpec> = Vec::new();
        let mut dc_of_vm_config: HashMap<u32, u32> = HashMap::new();
        for dc in &resource_config {
            for host in &dc.hosts {
                for vm in &host.vms {
                    let cost = (vm.cost_per_second > 0.)
                        .then(|| VmCost { per_second: vm.cost_per_second, per_mb_ram: 0., per_gb_storage: 0., per_bit_bw: 0. });
                    vm_catalog.insert(
                        vm.id,
                        VmBlueprint {
                            user_id: 0,
                            mips_per_pe: vm.mips_per_pe,
                            pe_count: vm.pe_count,
                            ram: vm.ram,
                            bw: vm.bw,
                            image_size: vm.image_size,
                            cost,
                        },
                    );
                    vms.push(VmSpec { id: vm.id, mips_per_pe: vm.mips_per_pe, pe_count: vm.pe_count, bw: vm.bw as f64 });
                    dc_of_vm_config.insert(vm.id, dc.id);
                }
            }
        }
        let vm_catalog = Rc::new(vm_catalog);

        let mut kernel = Kernel::new(self.seed);

        let planner = Rc::new(RefCell::new(Planner::new(state.clone(), vms.clone(), kernel.create_context("planner"))));
        let planner_id = kernel.add_handler("planner", planner.clone());

        let clustering_engine = Rc::new(RefCell::new(ClusteringEngine::new(
            state.clone(),
            params.clustering_params.clone(),
            kernel.create_context("clustering_engine"),
        )));
        let clustering_id = kernel.add_handler("clustering_engine", clustering_engine.clone());

        let workflow_engine = Rc::new(RefCell::new(WorkflowEngine::new(
            state.clone(),
            overhead_for_engine,
            self.reclustering_policy,
            kernel.create_context("workflow_engine"),
        )));
        let engine_id = kernel.add_handler("workflow_engine", workflow_engine.clone());

        let mut datacenter_ids: HashMap<u32, Id> = HashMap::new();
        let mut datacenters: Vec<Rc<RefCell<Datacenter>>> = Vec::new();
        for dc in &resource_config {
            let mut hosts = BTreeMap::new();
            for host in &dc.hosts {
                hosts.insert(host.id, Host::new(host.id, &host.pe_mips, host.ram, host.bw, host.storage));
            }
            let name = format!("datacenter{}", dc.id);
            let allocation_policy: Box<dyn AllocationPolicy> = Box::new(FirstFit);
            let entity = Rc::new(RefCell::new(Datacenter::new(
                dc.id,
                hosts,
                allocation_policy,
                characteristics.clone(),
                vm_catalog.clone(),
                replica_catalog.clone(),
                self.max_storage_transfer_rate,
                state.clone(),
                kernel.create_context(&name),
            )));
            let id = kernel.add_handler(&name, entity.clone());
            datacenter_ids.insert(dc.id, id);
            datacenters.push(entity);
        }

        let peer_map: BTreeMap<u32, Id> = datacenter_ids.iter().map(|(&dc_id, &id)| (dc_id, id)).collect();
        for dc in &datacenters {
            dc.borrow_mut().set_peers(peer_map.clone());
        }

        let dc_of_vm: HashMap<u32, Id> = dc_of_vm_config
            .into_iter()
            .filter_map(|(vm_id, dc_id)| datacenter_ids.get(&dc_id).map(|&id| (vm_id, id)))
            .collect();

        let scheduler = Rc::new(RefCell::new(WorkflowScheduler::new(
            state.clone(),
            overhead_for_scheduler,
            failure_model,
            params.scheduling_algorithm,
            vms.clone(),
            dc_of_vm,
            kernel.create_context("workflow_scheduler"),
        )));
        let scheduler_id = kernel.add_handler("workflow_scheduler", scheduler.clone());

        planner.borrow_mut().set_clustering_engine(clustering_id);
        clustering_engine.borrow_mut().set_workflow_engine(engine_id);
        workflow_engine.borrow_mut().set_scheduler(scheduler_id);
        scheduler.borrow_mut().set_engine(engine_id);

        let mut client = kernel.create_context("client");
        client.emit_now(StartSimulation {}, planner_id);

        ExperimentSimulation { kernel, state, vms, datacenters }
    }
}

/// One experiment run, ready to be driven to completion and read back for its final metrics.
pub struct ExperimentSimulation {
    kernel: Kernel,
    state: crate::pipeline::state::SharedState,
    vms: Vec<VmSpec>,
    datacenters: Vec<Rc<RefCell<Datacenter>>>,
}

impl ExperimentSimulation {
    pub fn steps(&mut self, step_count: u64) -> bool {
        self.kernel.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.kernel.step_for_duration(duration)
    }

    pub fn step_until_no_events(&mut self) {
        self.kernel.step_until_no_events();
    }

    pub fn event_count(&self) -> u64 {
        self.kernel.event_count()
    }

    pub fn time(&self) -> f64 {
        self.kernel.time()
    }

    /// Every job as it currently stands in shared state, for callers that want more than the
    /// four summary numbers `metrics()` reports.
    pub fn jobs(&self) -> Vec<Job> {
        self.state.borrow().jobs.clone()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    /// The §6 Output metrics: makespan, total cost, utilisation and energy, gathered across every
    /// configured datacenter.
    pub fn metrics(&self) -> Metrics {
        let jobs = self.jobs();
        let vms: Vec<Vm> = self.datacenters.iter().flat_map(|dc| dc.borrow().snapshot_vms()).collect();
        let makespan = metrics::makespan(&jobs);
        let energy: f64 = self.datacenters.iter().map(|dc| dc.borrow().total_energy()).sum();
        Metrics {
            makespan,
            total_cost: metrics::total_cost(&jobs, &vms),
            utilization: metrics::utilization(&jobs, &vms, makespan),
            energy,
        }
    }
}
