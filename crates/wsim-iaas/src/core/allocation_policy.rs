//! VM-to-host allocation policies.
//!
//! Mirrors the trait-per-strategy shape of the source's placement algorithms, scaled down to what the datacenter
//! actually needs: pick one host (by id) for a VM out of the datacenter's current host set, or report none fit.

use std::collections::BTreeMap;

use crate::core::host::Host;
use crate::core::vm::Vm;

pub trait AllocationPolicy {
    fn select_host(&self, vm: &Vm, hosts: &BTreeMap<u32, Host>) -> Option<u32>;
}

/// Picks the first host (by ascending id) that can host the VM without any allocation.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstFit;

impl AllocationPolicy for FirstFit {
    fn select_host(&self, vm: &Vm, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        hosts.values().find(|h| h.can_host(vm)).map(|h| h.id)
    }
}

/// Picks the host with the least spare MIPS that can still host the VM, to pack VMs tightly.
#[derive(Clone, Copy, Debug, Default)]
pub struct BestFit;

impl AllocationPolicy for BestFit {
    fn select_host(&self, vm: &Vm, hosts: &BTreeMap<u32, Host>) -> Option<u32> {
        hosts
            .values()
            .filter(|h| h.can_host(vm))
            .min_by(|a, b| a.available_mips().partial_cmp(&b.available_mips()).unwrap())
            .map(|h| h.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(id: u32, mips: f64) -> Host {
        Host::new(id, &[mips], 4096, 10_000, 10_000)
    }

    fn vm(id: u32) -> Vm {
        Vm::new(id, 0, 100., 1, 512, 1_000, 512)
    }

    #[test]
    fn first_fit_picks_lowest_id() {
        let mut hosts = BTreeMap::new();
        hosts.insert(0, host(0, 1000.));
        hosts.insert(1, host(1, 1000.));
        assert_eq!(FirstFit.select_host(&vm(1), &hosts), Some(0));
    }

    #[test]
    fn best_fit_picks_tightest_host() {
        let mut hosts = BTreeMap::new();
        hosts.insert(0, host(0, 1000.));
        hosts.insert(1, host(1, 200.));
        assert_eq!(BestFit.select_host(&vm(1), &hosts), Some(1));
    }

    #[test]
    fn no_host_fits_returns_none() {
        let mut hosts = BTreeMap::new();
        hosts.insert(0, host(0, 50.));
        assert_eq!(FirstFit.select_host(&vm(1), &hosts), None);
    }
}
