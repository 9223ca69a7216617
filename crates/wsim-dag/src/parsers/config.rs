//! Run configuration: the recognised `Parameters` fields (§6 Configuration options).

use std::path::Path;

use serde::Deserialize;

use crate::distribution::DistributionSpec;
use crate::error::{DagError, DagResult};

#[derive(Clone, Copy, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchedulingAlgorithm {
    MaxMin,
    MinMin,
    Mct,
    Data,
    Static,
    Fcfs,
    RoundRobin,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlanningAlgorithm {
    Invalid,
    Random,
    Heft,
    Dheft,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CostModel {
    Datacenter,
    Vm,
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileSystemMode {
    Shared,
    Local,
}

/// Distributions for the workflow engine's dispatch delay (WED), the scheduler's queue delay
/// applied before a submit and post delay applied before a return, and the clustering engine's
/// cluster-assembly delay, plus the WED batch size.
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct OverheadParams {
    pub wed_delay: DistributionSpec,
    pub queue_delay: DistributionSpec,
    pub post_delay: DistributionSpec,
    pub cluster_delay: DistributionSpec,
    /// Maximum number of ready jobs released to a scheduler per workflow-engine batch.
    pub wed_interval: usize,
}

impl Default for OverheadParams {
    fn default() -> Self {
        Self {
            wed_delay: DistributionSpec::default(),
            queue_delay: DistributionSpec::default(),
            post_delay: DistributionSpec::default(),
            cluster_delay: DistributionSpec::default(),
            wed_interval: usize::MAX,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClusteringParams {
    /// Number of tasks merged into a single job; 1 is the default one-task-per-job policy.
    pub horizontal_factor: u32,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self { horizontal_factor: 1 }
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default)]
pub struct ReplicaCatalogParams {
    pub file_system: FileSystemMode,
}

impl Default for ReplicaCatalogParams {
    fn default() -> Self {
        Self { file_system: FileSystemMode::Shared }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub vm_num: u32,
    pub dax_path: Option<String>,
    pub dax_paths: Vec<String>,
    pub runtime_scale: f64,
    pub scheduling_algorithm: SchedulingAlgorithm,
    pub planning_algorithm: PlanningAlgorithm,
    pub cost_model: CostModel,
    pub deadline: Option<f64>,
    pub overhead_params: OverheadParams,
    pub clustering_params: ClusteringParams,
    pub replica_catalog: ReplicaCatalogParams,
}

impl Parameters {
    /// All configured DAX inputs, `dax_path` (if set) followed by `dax_paths`.
    pub fn dax_inputs(&self) -> Vec<String> {
        self.dax_path.iter().cloned().chain(self.dax_paths.iter().cloned()).collect()
    }
}

/// Reads a `Parameters` record from a YAML config file; every field besides `dax_path`/`dax_paths`
/// has a documented default (§6), so a minimal file only naming a workflow is valid.
pub fn read_parameters<P: AsRef<Path>>(file: P) -> DagResult<Parameters> {
    let path = file.as_ref().display().to_string();
    let text = std::fs::read_to_string(&file).map_err(|e| DagError::Io { path: path.clone(), source: e })?;
    serde_yaml::from_str(&text).map_err(|e| DagError::Parse { format: "parameters YAML", path, message: e.to_string() })
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            vm_num: 1,
            dax_path: None,
            dax_paths: Vec::new(),
            runtime_scale: 1.0,
            scheduling_algorithm: SchedulingAlgorithm::Static,
            planning_algorithm: PlanningAlgorithm::Heft,
            cost_model: CostModel::Vm,
            deadline: None,
            overhead_params: OverheadParams::default(),
            clustering_params: ClusteringParams::default(),
            replica_catalog: ReplicaCatalogParams::default(),
        }
    }
}
