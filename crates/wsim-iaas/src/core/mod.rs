pub mod allocation_policy;
pub mod characteristics;
pub mod cloudlet_scheduler;
pub mod energy_meter;
pub mod events;
pub mod host;
pub mod pe;
pub mod provisioner;
pub mod vm;
pub mod vm_scheduler;
