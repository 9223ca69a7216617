//! Physical host model.
//!
//! A host owns a fixed set of PEs, a RAM/bandwidth provisioner pair, a storage budget and a time-shared
//! [`VmScheduler`]. VMs are placed on it by the datacenter's [allocation policy](crate::core::allocation_policy)
//! and each gets its requested MIPS share re-provisioned whenever the set of placed VMs changes.

use std::collections::{BTreeMap, BTreeSet};

use wsim_power_models::power_model::HostPowerModel;

use crate::core::energy_meter::EnergyMeter;
use crate::core::pe::Pe;
use crate::core::provisioner::{BwProvisioner, RamProvisioner};
use crate::core::vm::Vm;
use crate::core::vm_scheduler::VmScheduler;

/// Resources rolled back, in order, when a VM placement fails partway through. Matches the failure-handling design:
/// RAM, then BW, then storage.
#[derive(Debug)]
pub enum VmCreateError {
    NotEnoughRam,
    NotEnoughBw,
    NotEnoughStorage,
    NotEnoughMips,
}

pub struct Host {
    pub id: u32,
    pub pes: Vec<Pe>,
    pub ram: RamProvisioner,
    pub bw: BwProvisioner,
    pub storage: u64,
    storage_used: u64,
    pub vm_scheduler: VmScheduler,
    pub vms: BTreeMap<u32, Vm>,
    migrating_in: BTreeSet<u32>,
    migrating_out: BTreeSet<u32>,
    pub power_model: HostPowerModel,
    pub energy_meter: EnergyMeter,
}

impl Host {
    pub fn new(id: u32, pe_mips: &[f64], ram: u64, bw: u64, storage: u64) -> Self {
        let pes = pe_mips.iter().enumerate().map(|(i, &mips)| Pe::new(i as u32, mips)).collect();
        Self {
            id,
            pes,
            ram: RamProvisioner::new(ram),
            bw: BwProvisioner::new(bw),
            storage,
            storage_used: 0,
            vm_scheduler: VmScheduler::new(),
            vms: BTreeMap::new(),
            migrating_in: BTreeSet::new(),
            migrating_out: BTreeSet::new(),
            power_model: HostPowerModel::new(),
            energy_meter: EnergyMeter::new(),
        }
    }

    pub fn with_power_model(mut self, power_model: HostPowerModel) -> Self {
        self.power_model = power_model;
        self
    }

    /// Samples the current CPU utilisation into the power model and rolls it into the energy meter. Call on every
    /// processing update so the energy integral tracks utilisation changes as they happen.
    pub fn record_energy(&mut self, time: f64) {
        let power = self.power_model.get_power(time, self.utilization());
        self.energy_meter.update(time, power);
    }

    pub fn total_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.total_mips()).sum()
    }

    pub fn available_mips(&self) -> f64 {
        self.pes.iter().map(|pe| pe.available_mips()).sum()
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.len() as u32
    }

    pub fn storage_available(&self) -> u64 {
        self.storage.saturating_sub(self.storage_used)
    }

    /// Whether this host can currently accommodate `vm` without allocating anything, used by allocation policies to
    /// rank candidate hosts before committing to one.
    pub fn can_host(&self, vm: &Vm) -> bool {
        vm.pe_count <= self.pe_count()
            && vm.total_mips() <= self.available_mips()
            && vm.ram <= self.ram.available()
            && vm.bw <= self.bw.available()
            && vm.image_size <= self.storage_available()
    }

    /// Places `vm` on this host, allocating RAM, bandwidth, storage and MIPS shares in that order. Rolls back
    /// whatever was already allocated if a later step fails.
    pub fn vm_create(&mut self, mut vm: Vm) -> Result<(), (Vm, VmCreateError)> {
        if !self.ram.allocate(vm.id, vm.ram, vm.ram) {
            return Err((vm, VmCreateError::NotEnoughRam));
        }
        if !self.bw.allocate(vm.id, vm.bw, vm.bw) {
            self.ram.deallocate(vm.id);
            return Err((vm, VmCreateError::NotEnoughBw));
        }
        if vm.image_size > self.storage_available() {
            self.bw.deallocate(vm.id);
            self.ram.deallocate(vm.id);
            return Err((vm, VmCreateError::NotEnoughStorage));
        }
        self.storage_used += vm.image_size;

        let migrating_in = vm.in_migration;
        if migrating_in {
            self.migrating_in.insert(vm.id);
        }
        let ok = self
            .vm_scheduler
            .allocate_for_vm(vm.id, vm.requested_mips_vector(), migrating_in, &mut self.pes);
        if !ok {
            self.storage_used -= vm.image_size;
            self.bw.deallocate(vm.id);
            self.ram.deallocate(vm.id);
            self.migrating_in.remove(&vm.id);
            return Err((vm, VmCreateError::NotEnoughMips));
        }
        vm.host_id = Some(self.id);
        self.vms.insert(vm.id, vm);
        Ok(())
    }

    pub fn vm_destroy(&mut self, vm_id: u32) -> Option<Vm> {
        let vm = self.vms.remove(&vm_id)?;
        self.storage_used = self.storage_used.saturating_sub(vm.image_size);
        self.ram.deallocate(vm_id);
        self.bw.deallocate(vm_id);
        self.migrating_in.remove(&vm_id);
        self.migrating_out.remove(&vm_id);
        self.vm_scheduler.deallocate_pes_for_vm(vm_id, &mut self.pes);
        Some(vm)
    }

    pub fn mark_migrating_out(&mut self, vm_id: u32) {
        self.migrating_out.insert(vm_id);
        self.reprovision();
    }

    pub fn complete_migration_in(&mut self, vm_id: u32) {
        self.migrating_in.remove(&vm_id);
        if let Some(vm) = self.vms.get_mut(&vm_id) {
            vm.in_migration = false;
        }
        self.reprovision();
    }

    fn reprovision(&mut self) {
        let migrating_in = self.migrating_in.clone();
        let migrating_out = self.migrating_out.clone();
        self.vm_scheduler.reprovision_with_migration(
            &mut self.pes,
            |id| migrating_in.contains(&id),
            |id| migrating_out.contains(&id),
        );
    }

    /// Returns the MIPS share currently allocated to `vm_id`, one entry per host PE (0 for PEs it isn't on).
    pub fn allocated_mips_for(&self, vm_id: u32) -> Vec<f64> {
        self.vm_scheduler.allocated_mips(vm_id).cloned().unwrap_or_default()
    }

    pub fn utilization(&self) -> f64 {
        let total = self.total_mips();
        if total <= 0. {
            0.
        } else {
            (total - self.available_mips()) / total
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(id: u32, mips: f64, pes: u32) -> Vm {
        Vm::new(id, 0, mips, pes, 512, 1_000, 512)
    }

    #[test]
    fn vm_create_and_destroy_round_trip() {
        let mut host = Host::new(0, &[1000., 1000.], 4096, 10_000, 10_000);
        host.vm_create(vm(1, 500., 2)).unwrap();
        assert_eq!(host.vms.len(), 1);
        assert_eq!(host.ram.available(), 4096 - 512);
        let vm = host.vm_destroy(1).unwrap();
        assert_eq!(vm.id, 1);
        assert_eq!(host.ram.available(), 4096);
        assert_eq!(host.available_mips(), 2000.);
    }

    #[test]
    fn vm_create_rolls_back_on_insufficient_mips() {
        let mut host = Host::new(0, &[100.], 4096, 10_000, 10_000);
        let err = host.vm_create(vm(1, 500., 1)).unwrap_err();
        assert!(matches!(err.1, VmCreateError::NotEnoughMips));
        assert_eq!(host.ram.available(), 4096);
        assert_eq!(host.bw.available(), 10_000);
    }
}
