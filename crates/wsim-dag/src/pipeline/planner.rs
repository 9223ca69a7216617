//! Planner (C4): runs HEFT once at start-up and hands the result downstream (§4.4, §4.5).

use wsim_core::{cast, log_info, Event, EventHandler, Id, SimulationContext};

use crate::pipeline::events::{StartSimulation, TasksPlanned};
use crate::pipeline::state::SharedState;
use crate::planning::heft;
use crate::planning::VmSpec;

pub struct Planner {
    state: SharedState,
    vms: Vec<VmSpec>,
    clustering_engine: Id,
    ctx: SimulationContext,
}

impl Planner {
    pub fn new(state: SharedState, vms: Vec<VmSpec>, ctx: SimulationContext) -> Self {
        Self { state, vms, clustering_engine: 0, ctx }
    }

    /// Must be called once, after the clustering engine has been registered with the kernel.
    pub fn set_clustering_engine(&mut self, id: Id) {
        self.clustering_engine = id;
    }
}

impl EventHandler for Planner {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            StartSimulation {} => {
                let mut state = self.state.borrow_mut();
                state.dag.compute_depths();
                state.dag.propagate_impact();
                let plan = heft::plan(&state.dag, &self.vms);
                for (&task_id, &vm_id) in &plan.vm_of {
                    state.dag.tasks_mut()[task_id].vm_id = Some(vm_id);
                }
                state.plan = plan;
                log_info!(self.ctx, format!("planned {} tasks onto {} VMs", state.dag.tasks().len(), self.vms.len()));
                drop(state);
                self.ctx.emit_now(TasksPlanned {}, self.clustering_engine);
            }
        })
    }
}
