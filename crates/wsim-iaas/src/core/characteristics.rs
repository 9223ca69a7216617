//! Datacenter characteristics: architecture/OS/VMM identity and the datacenter-wide cost model.

use serde::{Deserialize, Serialize};

/// Where per-resource costs are charged: a flat datacenter-wide rate, or the VM's own [`VmCost`](crate::core::vm::VmCost).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub enum CostModel {
    Datacenter,
    Vm,
}

impl Default for CostModel {
    fn default() -> Self {
        CostModel::Datacenter
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Characteristics {
    pub architecture: String,
    pub os: String,
    pub vmm: String,
    pub time_zone: f64,
    pub cost_model: CostModel,
    pub cost_per_second: f64,
    pub cost_per_mem: f64,
    pub cost_per_storage: f64,
    pub cost_per_bw: f64,
}

impl Default for Characteristics {
    fn default() -> Self {
        Self {
            architecture: "x86".to_string(),
            os: "Linux".to_string(),
            vmm: "wsim".to_string(),
            time_zone: 0.,
            cost_model: CostModel::default(),
            cost_per_second: 0.,
            cost_per_mem: 0.,
            cost_per_storage: 0.,
            cost_per_bw: 0.,
        }
    }
}
