//! Time-shared VM scheduler (host level).
//!
//! Distributes a host's PE capacity among the VMs placed on it. Each VM
//! requests a MIPS vector (one entry per VM-PE); the scheduler walks the
//! host's PE list and greedily assigns allocated MIPS out of each PE's
//! remaining capacity, so a VM's allocation may end up spanning several PEs.
//!
//! A VM mid-migration gets a scaled share of what it requested: 10% while
//! migrating in (the link is busy carrying its state), 90% while migrating
//! out, 100% otherwise.

use std::collections::BTreeMap;

use crate::core::pe::Pe;

const MIGRATION_IN_SCALE: f64 = 0.1;
const MIGRATION_OUT_SCALE: f64 = 0.9;

/// Per-host time-shared scheduler tracking requested and allocated MIPS for
/// every VM currently placed on the host.
#[derive(Clone, Default)]
pub struct VmScheduler {
    requested_mips: BTreeMap<u32, Vec<f64>>,
    allocated_mips: BTreeMap<u32, Vec<f64>>,
}

impl VmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested_mips(&self, vm_id: u32) -> Option<&Vec<f64>> {
        self.requested_mips.get(&vm_id)
    }

    pub fn allocated_mips(&self, vm_id: u32) -> Option<&Vec<f64>> {
        self.allocated_mips.get(&vm_id)
    }

    /// Registers (or updates) the MIPS vector requested by `vm_id` and
    /// re-provisions every VM's PEs from scratch against `pes`. Returns
    /// `false` if any single requested share exceeds what a PE can ever
    /// provide, or if total demand exceeds total capacity.
    ///
    /// `migrating_in` scales this VM's share to 10% for this pass (see
    /// [`reprovision_with_migration`](Self::reprovision_with_migration) for
    /// the full migrating-in/migrating-out contract).
    pub fn allocate_for_vm(&mut self, vm_id: u32, requested: Vec<f64>, migrating_in: bool, pes: &mut [Pe]) -> bool {
        self.requested_mips.insert(vm_id, requested);
        self.reprovision_with_migration(pes, |id| migrating_in && id == vm_id, |_| false)
    }

    /// Drops `vm_id` from the scheduler and re-runs provisioning for the
    /// remaining VMs so that freed capacity is compacted, not merely left
    /// unused by the departed VM's former slots.
    pub fn deallocate_pes_for_vm(&mut self, vm_id: u32, pes: &mut [Pe]) {
        self.requested_mips.remove(&vm_id);
        self.allocated_mips.remove(&vm_id);
        for pe in pes.iter_mut() {
            pe.deallocate(vm_id);
        }
        self.reprovision_with_migration(pes, |_| false, |_| false);
    }

    /// Re-provisions every known VM's requested MIPS across `pes`, applying
    /// the migration scale for VMs named in `migrating_in`/`migrating_out`.
    /// `migrating_in`/`migrating_out` are passed via the closures below so
    /// callers (the host) stay the single owner of migration state.
    pub fn reprovision_with_migration<F1, F2>(
        &mut self,
        pes: &mut [Pe],
        is_migrating_in: F1,
        is_migrating_out: F2,
    ) -> bool
    where
        F1: Fn(u32) -> bool,
        F2: Fn(u32) -> bool,
    {
        for pe in pes.iter_mut() {
            pe.clear();
        }
        self.allocated_mips.clear();
        let mut ok = true;
        for (&vm_id, requested) in self.requested_mips.clone().iter() {
            let scale = if is_migrating_in(vm_id) {
                MIGRATION_IN_SCALE
            } else if is_migrating_out(vm_id) {
                MIGRATION_OUT_SCALE
            } else {
                1.0
            };
            let scaled: Vec<f64> = requested.iter().map(|m| m * scale).collect();
            let total: f64 = scaled.iter().sum();
            let available: f64 = pes.iter().map(|pe| pe.available_mips()).sum();
            if total > available + 1e-9 {
                ok = false;
                self.allocated_mips.insert(vm_id, vec![0.; scaled.len()]);
                continue;
            }
            let mut allocated = Vec::with_capacity(scaled.len());
            for &want in scaled.iter() {
                let mut remaining = want;
                for pe in pes.iter_mut() {
                    if remaining <= 1e-9 {
                        break;
                    }
                    let take = remaining.min(pe.available_mips());
                    if take > 0. {
                        pe.allocate(vm_id, take);
                        remaining -= take;
                    }
                }
                allocated.push(want - remaining);
            }
            self.allocated_mips.insert(vm_id, allocated);
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_pes(n: usize, mips: f64) -> Vec<Pe> {
        (0..n as u32).map(|i| Pe::new(i, mips)).collect()
    }

    #[test]
    fn allocate_splits_across_pes() {
        let mut pes = host_pes(2, 1000.);
        let mut sched = VmScheduler::new();
        assert!(sched.allocate_for_vm(1, vec![1500.], false, &mut pes));
        assert_eq!(pes[0].allocated_mips() + pes[1].allocated_mips(), 1500.);
    }

    #[test]
    fn allocate_rejects_over_capacity() {
        let mut pes = host_pes(1, 1000.);
        let mut sched = VmScheduler::new();
        assert!(!sched.allocate_for_vm(1, vec![2000.], false, &mut pes));
    }

    #[test]
    fn deallocate_compacts_remaining_vms() {
        let mut pes = host_pes(1, 1000.);
        let mut sched = VmScheduler::new();
        sched.allocate_for_vm(1, vec![500.], false, &mut pes);
        sched.allocate_for_vm(2, vec![500.], false, &mut pes);
        sched.deallocate_pes_for_vm(1, &mut pes);
        assert_eq!(sched.allocated_mips(2).unwrap()[0], 500.);
        assert_eq!(pes[0].allocated_mips(), 500.);
    }

    #[test]
    fn migration_scaling() {
        let mut pes = host_pes(1, 1000.);
        let mut sched = VmScheduler::new();
        sched.requested_mips.insert(1, vec![1000.]);
        sched.reprovision_with_migration(&mut pes, |id| id == 1, |_| false);
        assert_eq!(sched.allocated_mips(1).unwrap()[0], 100.);
    }
}
