//! RAM and bandwidth provisioners.
//!
//! Both follow the same simple contract: a scalar capacity and a map from
//! VM-uid to allocation. Allocation succeeds iff there is enough spare
//! capacity and the request does not exceed the VM's own declared maximum;
//! deallocation always restores the capacity it freed.

use std::collections::BTreeMap;

/// A simple scalar-resource provisioner shared by the RAM and bandwidth
/// models. `T` is `u64` for RAM (MB) and bandwidth (bit/s).
#[derive(Clone)]
pub struct ScalarProvisioner {
    capacity: u64,
    allocated: BTreeMap<u32, u64>,
}

impl ScalarProvisioner {
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            allocated: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated_total(&self) -> u64 {
        self.allocated.values().sum()
    }

    pub fn available(&self) -> u64 {
        self.capacity.saturating_sub(self.allocated_total())
    }

    pub fn allocated_to(&self, vm_id: u32) -> u64 {
        *self.allocated.get(&vm_id).unwrap_or(&0)
    }

    /// Allocates `requested` for `vm_id`, provided `requested` does not
    /// exceed `vm_max` and there is enough spare capacity. Returns whether
    /// the allocation succeeded.
    pub fn allocate(&mut self, vm_id: u32, requested: u64, vm_max: u64) -> bool {
        if requested > vm_max || requested > self.available() {
            return false;
        }
        *self.allocated.entry(vm_id).or_insert(0) += requested;
        true
    }

    /// Releases whatever was allocated to `vm_id`, restoring capacity.
    pub fn deallocate(&mut self, vm_id: u32) {
        self.allocated.remove(&vm_id);
    }
}

/// RAM provisioner: tracks host RAM (in MB) handed out to VMs.
pub type RamProvisioner = ScalarProvisioner;

/// Bandwidth provisioner: tracks host network bandwidth (in bit/s) handed
/// out to VMs.
pub type BwProvisioner = ScalarProvisioner;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_rejects_over_vm_max() {
        let mut p = ScalarProvisioner::new(10_000);
        assert!(!p.allocate(1, 2_000, 1_000));
        assert_eq!(p.available(), 10_000);
    }

    #[test]
    fn allocate_rejects_over_capacity() {
        let mut p = ScalarProvisioner::new(1_000);
        assert!(p.allocate(1, 800, 2_000));
        assert!(!p.allocate(2, 500, 2_000));
        assert!(p.allocate(2, 200, 2_000));
    }

    #[test]
    fn deallocate_restores_capacity() {
        let mut p = ScalarProvisioner::new(1_000);
        p.allocate(1, 1_000, 1_000);
        assert_eq!(p.available(), 0);
        p.deallocate(1);
        assert_eq!(p.available(), 1_000);
    }
}
