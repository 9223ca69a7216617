//! Final-report metrics: makespan, cost, utilisation and energy (§6 Output metrics).

use wsim_iaas::core::host::Host;
use wsim_iaas::core::vm::Vm;

use crate::job::Job;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Metrics {
    pub makespan: f64,
    pub total_cost: f64,
    /// Mean `active_time / makespan` across powered-on VMs, as a percentage.
    pub utilization: f64,
    pub energy: f64,
}

/// `makespan = max(finish) - min(start)` over every job that actually ran.
pub fn makespan(jobs: &[Job]) -> f64 {
    let starts = jobs.iter().filter_map(|j| j.start_time);
    let finishes = jobs.iter().filter_map(|j| j.finish_time);
    let min_start = starts.fold(f64::INFINITY, f64::min);
    let max_finish = finishes.fold(f64::NEG_INFINITY, f64::max);
    if max_finish.is_finite() && min_start.is_finite() {
        max_finish - min_start
    } else {
        0.
    }
}

/// Sum of every job's attached execution cost - already priced at completion time per whichever
/// cost model the run used, datacenter-wide rate or per-VM rate (see
/// [`crate::pipeline::datacenter::Datacenter`]) - plus per-bit bandwidth cost over the union of
/// every job's file list that moved across its VM's link.
pub fn total_cost(jobs: &[Job], vms: &[Vm]) -> f64 {
    let exec_cost: f64 = jobs.iter().map(|j| j.cost).sum();

    let bw_cost: f64 = vms
        .iter()
        .filter_map(|vm| vm.cost.map(|c| (vm, c)))
        .map(|(vm, cost)| {
            let bytes: u64 = jobs
                .iter()
                .filter(|j| j.vm_id == Some(vm.id))
                .flat_map(|j| j.files.iter())
                .map(|f| f.size)
                .sum();
            cost.per_bit_bw * bytes as f64 * 8.
        })
        .sum();

    exec_cost + bw_cost
}

/// Mean `active_time / makespan` across powered-on VMs, as a percentage. A VM is "powered on" if
/// it ran at least one job.
pub fn utilization(jobs: &[Job], vms: &[Vm], makespan: f64) -> f64 {
    if makespan <= 0. {
        return 0.;
    }
    let mut ratios = Vec::new();
    for vm in vms {
        let active_time: f64 = jobs
            .iter()
            .filter(|j| j.vm_id == Some(vm.id))
            .filter_map(|j| match (j.start_time, j.finish_time) {
                (Some(s), Some(f)) => Some(f - s),
                _ => None,
            })
            .sum();
        if active_time > 0. {
            ratios.push(active_time / makespan);
        }
    }
    if ratios.is_empty() {
        0.
    } else {
        100. * ratios.iter().sum::<f64>() / ratios.len() as f64
    }
}

/// Sum of every host's integrated energy consumption, already accumulated by its
/// [`EnergyMeter`](wsim_iaas::core::energy_meter::EnergyMeter) from `f * V^2` power samples.
pub fn energy(hosts: &[Host]) -> f64 {
    hosts.iter().map(|h| h.energy_meter.energy_consumed()).sum()
}

pub fn compute(jobs: &[Job], vms: &[Vm], hosts: &[Host]) -> Metrics {
    let makespan = makespan(jobs);
    Metrics {
        makespan,
        total_cost: total_cost(jobs, vms),
        utilization: utilization(jobs, vms, makespan),
        energy: energy(hosts),
    }
}
