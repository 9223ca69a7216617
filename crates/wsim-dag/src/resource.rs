//! Reads host/VM resource configurations from YAML (§6 Resource configuration).
//!
//! Mirrors the shape of a compute-cluster config file: one entry per host, each listing the VMs
//! placed on it up front (this run's placement is fixed for the whole experiment - VM migration
//! is modeled but never driven by resource configuration itself).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VmConfig {
    pub id: u32,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    #[serde(default = "default_ram")]
    pub ram: u64,
    #[serde(default = "default_bw")]
    pub bw: u64,
    #[serde(default = "default_image_size")]
    pub image_size: u64,
    #[serde(default)]
    pub cost_per_second: f64,
}

fn default_ram() -> u64 {
    4096
}
fn default_bw() -> u64 {
    1000
}
fn default_image_size() -> u64 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostConfig {
    pub id: u32,
    /// MIPS rating of each PE on this host (one entry per PE).
    pub pe_mips: Vec<f64>,
    #[serde(default = "default_ram_host")]
    pub ram: u64,
    #[serde(default = "default_bw_host")]
    pub bw: u64,
    #[serde(default = "default_storage")]
    pub storage: u64,
    #[serde(default)]
    pub vms: Vec<VmConfig>,
}

fn default_ram_host() -> u64 {
    65536
}
fn default_bw_host() -> u64 {
    10_000
}
fn default_storage() -> u64 {
    100_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatacenterConfig {
    pub id: u32,
    #[serde(default)]
    pub hosts: Vec<HostConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResourceFile {
    #[serde(default)]
    datacenters: Vec<DatacenterConfig>,
}

/// Reads a resource configuration file listing one or more datacenters, each with its hosts and
/// the VMs to be created on them.
pub fn read_resource_config<P: AsRef<Path>>(file: P) -> DagResult<Vec<DatacenterConfig>> {
    let path = file.as_ref().display().to_string();
    let text = std::fs::read_to_string(&file).map_err(|e| DagError::Io { path: path.clone(), source: e })?;
    let parsed: ResourceFile = serde_yaml::from_str(&text).map_err(|e| DagError::Parse {
        format: "resource YAML",
        path,
        message: e.to_string(),
    })?;
    Ok(parsed.datacenters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_single_host_single_vm_config() {
        let yaml = r#"
datacenters:
  - id: 0
    hosts:
      - id: 0
        pe_mips: [1000.0, 1000.0]
        vms:
          - id: 0
            mips_per_pe: 1000.0
            pe_count: 1
"#;
        let dir = std::env::temp_dir().join("wsim_resource_test.yaml");
        std::fs::write(&dir, yaml).unwrap();
        let dcs = read_resource_config(&dir).unwrap();
        assert_eq!(dcs.len(), 1);
        assert_eq!(dcs[0].hosts[0].pe_mips.len(), 2);
        assert_eq!(dcs[0].hosts[0].vms[0].mips_per_pe, 1000.0);
        std::fs::remove_file(&dir).ok();
    }

    #[test]
    fn missing_file_is_a_recoverable_error() {
        assert!(read_resource_config("/nonexistent/path.yaml").is_err());
    }
}
