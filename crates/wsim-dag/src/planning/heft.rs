//! Upward-rank, insertion-based HEFT planner.

use std::collections::HashMap;

use crate::dag::TaskDag;
use crate::planning::VmSpec;
use crate::task::TaskId;

/// One task's scheduled interval on a VM's timeline.
#[derive(Clone, Copy, Debug)]
struct ScheduledInterval {
    start: f64,
    finish: f64,
}

/// Outcome of planning: each task's chosen VM and earliest finish time.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    pub vm_of: HashMap<TaskId, u32>,
    pub finish_of: HashMap<TaskId, f64>,
}

fn comp_cost(length: u64, vm: &VmSpec, pes: u32) -> f64 {
    if vm.pe_count < pes {
        f64::INFINITY
    } else {
        length as f64 / (vm.mips_per_pe * pes as f64)
    }
}

/// Sum of the sizes of files that are outputs of `parent` and inputs of `child`, by name.
fn shared_file_bytes(dag: &TaskDag, parent: TaskId, child: TaskId) -> u64 {
    let parent_outputs: std::collections::HashSet<&str> =
        dag.task(parent).unwrap().outputs.iter().map(String::as_str).collect();
    dag.task(child)
        .unwrap()
        .inputs
        .iter()
        .filter(|name| parent_outputs.contains(name.as_str()))
        .filter_map(|name| dag.file(name))
        .map(|f| f.size)
        .sum()
}

fn transfer_cost(dag: &TaskDag, parent: TaskId, child: TaskId, avg_bw: f64) -> f64 {
    let bytes = shared_file_bytes(dag, parent, child);
    bytes as f64 * 8. / avg_bw / crate::replica_catalog::MILLION
}

/// Upward rank: `rank(t) = mean comp cost + max over children of (transfer cost to child + rank(child))`.
/// Exit nodes' rank is just their mean computation cost.
fn upward_ranks(dag: &TaskDag, vms: &[VmSpec], avg_bw: f64) -> HashMap<TaskId, f64> {
    let mut ranks = HashMap::new();
    // Tasks are processed in reverse topological order; `TaskDag::exits`/children give us enough
    // structure to do this with a simple repeat-until-stable pass since DAGs here are small.
    let mut remaining: Vec<TaskId> = dag.tasks().iter().map(|t| t.id).collect();
    while !remaining.is_empty() {
        let mut progressed = false;
        remaining.retain(|&id| {
            let task = dag.task(id).unwrap();
            if task.children.iter().all(|c| ranks.contains_key(c)) {
                let mean_comp: f64 = if vms.is_empty() {
                    0.
                } else {
                    vms.iter().map(|vm| comp_cost(task.length, vm, task.pes)).sum::<f64>() / vms.len() as f64
                };
                let rank = if task.children.is_empty() {
                    mean_comp
                } else {
                    mean_comp
                        + task
                            .children
                            .iter()
                            .map(|&c| transfer_cost(dag, id, c, avg_bw) + ranks[&c])
                            .fold(f64::NEG_INFINITY, f64::max)
                };
                ranks.insert(id, rank);
                progressed = true;
                false
            } else {
                true
            }
        });
        if !progressed {
            // A cycle would stall progress forever; the parser guarantees acyclicity so this is unreachable.
            break;
        }
    }
    ranks
}

/// Scans `schedule` for the earliest slot of length `duration` starting no earlier than `ready`,
/// returning `(start, finish)`. An empty schedule simply starts at `ready`.
fn find_insertion_slot(schedule: &[ScheduledInterval], ready: f64, duration: f64) -> (f64, f64) {
    let mut sorted: Vec<&ScheduledInterval> = schedule.iter().collect();
    sorted.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap());
    let mut candidate = ready;
    for interval in &sorted {
        if candidate + duration <= interval.start {
            return (candidate, candidate + duration);
        }
        candidate = candidate.max(interval.finish);
    }
    (candidate, candidate + duration)
}

/// Plans `dag` onto `vms` per §4.5: ranks tasks by decreasing upward rank, then greedily assigns
/// each to whichever VM gives the earliest finish time, breaking ties toward the lowest VM id.
pub fn plan(dag: &TaskDag, vms: &[VmSpec]) -> Plan {
    let mut plan = Plan::default();
    if vms.is_empty() {
        return plan;
    }
    let avg_bw = vms.iter().map(|vm| vm.bw).sum::<f64>() / vms.len() as f64;
    let ranks = upward_ranks(dag, vms, avg_bw);

    let mut order: Vec<TaskId> = dag.tasks().iter().map(|t| t.id).collect();
    order.sort_by(|a, b| ranks[b].partial_cmp(&ranks[a]).unwrap());

    let mut schedules: HashMap<u32, Vec<ScheduledInterval>> = vms.iter().map(|vm| (vm.id, Vec::new())).collect();

    for task_id in order {
        let task = dag.task(task_id).unwrap();
        let mut best: Option<(u32, f64, f64)> = None; // (vm id, start, finish)
        for vm in vms {
            let duration = comp_cost(task.length, vm, task.pes);
            if !duration.is_finite() {
                continue;
            }
            let ready = task
                .parents
                .iter()
                .map(|&p| {
                    let parent_vm = plan.vm_of[&p];
                    let base = plan.finish_of[&p];
                    if parent_vm == vm.id {
                        base
                    } else {
                        base + transfer_cost(dag, p, task_id, avg_bw)
                    }
                })
                .fold(0_f64, f64::max);
            let (start, finish) = find_insertion_slot(&schedules[&vm.id], ready, duration);
            let better = match best {
                None => true,
                Some((best_vm, _, best_finish)) => finish < best_finish || (finish == best_finish && vm.id < best_vm),
            };
            if better {
                best = Some((vm.id, start, finish));
            }
        }

        let (vm_id, start, finish) = best.expect("no VM can host this task's PE requirement");
        schedules.get_mut(&vm_id).unwrap().push(ScheduledInterval { start, finish });
        plan.vm_of.insert(task_id, vm_id);
        plan.finish_of.insert(task_id, finish);
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vm(id: u32, mips: f64, pes: u32, bw: f64) -> VmSpec {
        VmSpec { id, mips_per_pe: mips, pe_count: pes, bw }
    }

    #[test]
    fn single_task_single_vm() {
        let mut dag = TaskDag::new();
        dag.add_task("A", 1000, 1, 0).unwrap();
        let vms = vec![vm(0, 1000., 1, 1000.)];
        let plan = plan(&dag, &vms);
        assert_eq!(plan.finish_of[&0], 1.0);
        assert_eq!(plan.vm_of[&0], 0);
    }

    #[test]
    fn chain_prefers_colocation_when_transfer_cost_is_positive() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 1000, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        dag.add_task_output(a, "f", 8_000_000).unwrap();
        dag.add_task_input(b, "f", 8_000_000).unwrap();
        dag.add_dependency(a, b).unwrap();
        let vms = vec![vm(0, 1000., 1, 1000.), vm(1, 1000., 1, 1000.)];
        let plan = plan(&dag, &vms);
        assert_eq!(plan.vm_of[&a], plan.vm_of[&b]);
        assert_eq!(plan.finish_of[&b], 2.0);
    }

    #[test]
    fn pe_requirement_above_vm_capacity_is_never_chosen() {
        let mut dag = TaskDag::new();
        dag.add_task("A", 1000, 4, 0).unwrap();
        let vms = vec![vm(0, 1000., 1, 1000.), vm(1, 1000., 4, 1000.)];
        let plan = plan(&dag, &vms);
        assert_eq!(plan.vm_of[&0], 1);
    }

    #[test]
    fn fork_join_orders_ranks_by_the_heavier_branch() {
        let mut dag = TaskDag::new();
        let a = dag.add_task("A", 500, 1, 0).unwrap();
        let b = dag.add_task("B", 1000, 1, 0).unwrap();
        let c = dag.add_task("C", 2000, 1, 0).unwrap();
        let d = dag.add_task("D", 500, 1, 0).unwrap();
        dag.add_dependency(a, b).unwrap();
        dag.add_dependency(a, c).unwrap();
        dag.add_dependency(b, d).unwrap();
        dag.add_dependency(c, d).unwrap();
        let vms = vec![vm(0, 2000., 1, 1000.), vm(1, 1000., 1, 1000.)];
        let avg_bw = 1000.;
        let ranks = upward_ranks(&dag, &vms, avg_bw);
        assert!(ranks[&a] > ranks[&c]);
        assert!(ranks[&c] > ranks[&b]);
        assert!(ranks[&b] > ranks[&d]);
    }
}
