//! Virtual machine model.
//!
//! A VM is placed on at most one host at a time and owns a single
//! [`CloudletScheduler`](crate::core::cloudlet_scheduler::CloudletScheduler) that space-shares its PEs among the
//! cloudlets (jobs) submitted to it.

use serde::Serialize;

use crate::core::cloudlet_scheduler::CloudletScheduler;

/// Per-resource cost parameters, attached to a VM when the cost model is VM-based (otherwise these fields live on
/// the datacenter characteristics instead).
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct VmCost {
    pub per_second: f64,
    pub per_mb_ram: f64,
    pub per_gb_storage: f64,
    pub per_bit_bw: f64,
}

/// A virtual machine: a MIPS/PE/RAM/BW/image-size spec plus the cloudlet scheduler that executes jobs placed on it.
#[derive(Clone)]
pub struct Vm {
    pub id: u32,
    pub user_id: u32,
    pub mips_per_pe: f64,
    pub pe_count: u32,
    pub ram: u64,
    pub bw: u64,
    pub image_size: u64,
    pub cost: Option<VmCost>,
    pub in_migration: bool,
    pub host_id: Option<u32>,
    pub cloudlet_scheduler: CloudletScheduler,
}

impl Vm {
    pub fn new(id: u32, user_id: u32, mips_per_pe: f64, pe_count: u32, ram: u64, bw: u64, image_size: u64) -> Self {
        assert!(mips_per_pe > 0., "VM {} must have positive MIPS per PE", id);
        assert!(pe_count > 0, "VM {} must have at least one PE", id);
        Self {
            id,
            user_id,
            mips_per_pe,
            pe_count,
            ram,
            bw,
            image_size,
            cost: None,
            in_migration: false,
            host_id: None,
            cloudlet_scheduler: CloudletScheduler::new(pe_count),
        }
    }

    pub fn with_cost(mut self, cost: VmCost) -> Self {
        self.cost = Some(cost);
        self
    }

    /// The MIPS vector this VM requests (one entry per PE) when fully utilized.
    pub fn requested_mips_vector(&self) -> Vec<f64> {
        vec![self.mips_per_pe; self.pe_count as usize]
    }

    pub fn total_mips(&self) -> f64 {
        self.mips_per_pe * self.pe_count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_mips_has_one_entry_per_pe() {
        let vm = Vm::new(1, 0, 500., 4, 2048, 1_000_000, 1024);
        assert_eq!(vm.requested_mips_vector(), vec![500.; 4]);
        assert_eq!(vm.total_mips(), 2000.);
    }
}
