//! Space-shared cloudlet scheduler (VM level).
//!
//! Runs at most `pe_count` cloudlets concurrently, each pinned to a whole number of PEs for its entire execution
//! (no time-slicing within a VM - that is the job of the host-level [`VmScheduler`](crate::core::vm_scheduler::VmScheduler)
//! instead). Work done is tracked in raw instructions (MI * [`MILLION`]) so that `update_vm_processing` advances
//! exactly `floor(capacity * dt * pes * MILLION)` instructions, with no floating-point drift across ticks.

use std::collections::VecDeque;

use serde::Serialize;

/// Scale factor between "millions of instructions" (MI, the unit task/job lengths are specified in) and raw
/// instructions, used so that progress bookkeeping can stay in integers.
pub const MILLION: f64 = 1_000_000.;

/// Cloudlet (job) status, following the state machine in the simulated datacenter's space-shared CPU model.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum CloudletStatus {
    Created,
    Ready,
    Queued,
    InExec,
    Success,
    Paused,
    Resumed,
    Canceled,
    Failed,
    FailedResourceUnavailable,
}

/// The minimal shape the space-shared scheduler needs to know about a submitted unit of work. Richer job/task data
/// (file lists, DAG edges, ...) lives one layer up and is correlated back to a `ResCloudlet` by `id`.
#[derive(Clone, Debug)]
pub struct CloudletSpec {
    pub id: u64,
    /// Length in millions of instructions, already inflated by any amortised file-transfer time.
    pub length_mi: f64,
    pub pes: u32,
}

/// Runtime wrapper for a cloudlet inside a VM's cloudlet scheduler.
#[derive(Clone, Debug)]
pub struct ResCloudlet {
    pub spec: CloudletSpec,
    pub status: CloudletStatus,
    pub pe_ids: Vec<u32>,
    pub arrival_time: f64,
    pub exec_start_time: f64,
    pub total_completion_time: f64,
    finished_instructions: u64,
}

impl ResCloudlet {
    fn new(spec: CloudletSpec, arrival_time: f64) -> Self {
        Self {
            spec,
            status: CloudletStatus::Created,
            pe_ids: Vec::new(),
            arrival_time,
            exec_start_time: -1.,
            total_completion_time: 0.,
            finished_instructions: 0,
        }
    }

    fn target_instructions(&self) -> u64 {
        (self.spec.length_mi * MILLION).round() as u64
    }

    /// Remaining length, in MI.
    pub fn remaining_length(&self) -> f64 {
        let remaining = self.target_instructions().saturating_sub(self.finished_instructions);
        remaining as f64 / MILLION
    }

    pub fn is_finished(&self) -> bool {
        self.finished_instructions >= self.target_instructions()
    }
}

/// Per-VM space-shared scheduler. Maintains the four lists from the design: `exec`, `waiting`, `paused`, `finished`.
#[derive(Clone)]
pub struct CloudletScheduler {
    total_pes: u32,
    used_pes: u32,
    current_cpus: u32,
    last_update: f64,
    exec: Vec<ResCloudlet>,
    waiting: VecDeque<ResCloudlet>,
    paused: Vec<ResCloudlet>,
    finished: Vec<ResCloudlet>,
    /// Cloudlets that began real execution (submit-time or promoted out of `waiting`) since the
    /// last drain, as `(id, exec_start_time)` - lets the datacenter stamp a job's actual start
    /// separately from the moment it was merely submitted into a possibly-queued state.
    started: Vec<(u64, f64)>,
}

impl CloudletScheduler {
    pub fn new(total_pes: u32) -> Self {
        Self {
            total_pes,
            used_pes: 0,
            current_cpus: total_pes,
            last_update: 0.,
            exec: Vec::new(),
            waiting: VecDeque::new(),
            paused: Vec::new(),
            finished: Vec::new(),
            started: Vec::new(),
        }
    }

    pub fn used_pes(&self) -> u32 {
        self.used_pes
    }

    pub fn free_pes(&self) -> u32 {
        self.total_pes.saturating_sub(self.used_pes)
    }

    pub fn exec(&self) -> &[ResCloudlet] {
        &self.exec
    }

    pub fn waiting(&self) -> &VecDeque<ResCloudlet> {
        &self.waiting
    }

    pub fn finished(&self) -> &[ResCloudlet] {
        &self.finished
    }

    /// Drains and returns the finished-cloudlet queue (the datacenter collects these after each tick).
    pub fn take_finished(&mut self) -> Vec<ResCloudlet> {
        std::mem::take(&mut self.finished)
    }

    /// Drains and returns cloudlets that began real execution since the last drain - either
    /// submitted straight into a free slot, or promoted out of `waiting` - as `(id, exec_start_time)`.
    /// Resuming a paused cloudlet does not count: that work already had its start stamped once.
    pub fn take_started(&mut self) -> Vec<(u64, f64)> {
        std::mem::take(&mut self.started)
    }

    /// Submits a cloudlet. `file_transfer_time` is amortised into the cloudlet's length (as extra MI, at the
    /// current per-CPU capacity) so the space-shared model charges for the transfer without a separate phase.
    pub fn cloudlet_submit(&mut self, mut spec: CloudletSpec, now: f64, file_transfer_time: f64, capacity: f64) {
        if file_transfer_time > 0. && capacity > 0. {
            spec.length_mi += capacity * file_transfer_time;
        }
        let mut rc = ResCloudlet::new(spec, now);
        if self.free_pes() >= rc.spec.pes {
            rc.status = CloudletStatus::InExec;
            rc.exec_start_time = now;
            self.used_pes += rc.spec.pes;
            self.started.push((rc.spec.id, now));
            self.exec.push(rc);
        } else {
            rc.status = CloudletStatus::Queued;
            self.waiting.push_back(rc);
        }
    }

    /// Advances every executing cloudlet by `capacity * dt * pes * MILLION` instructions, retires finished ones,
    /// and promotes waiting cloudlets (FIFO) into freed slots. Returns the earliest estimated completion time
    /// among still-executing cloudlets, clamped to be no earlier than `now + min_time_between_events`.
    pub fn update_vm_processing(&mut self, now: f64, mips_share: &[f64], min_time_between_events: f64) -> Option<f64> {
        self.current_cpus = mips_share.len() as u32;
        let active_cpus = mips_share.iter().filter(|m| **m > 0.).count();
        let capacity = if active_cpus > 0 {
            mips_share.iter().sum::<f64>() / active_cpus as f64
        } else {
            0.
        };

        let dt = (now - self.last_update).max(0.);
        let mut newly_finished = Vec::new();
        for rc in self.exec.iter_mut() {
            let delta = (capacity * dt * rc.spec.pes as f64 * MILLION).floor().max(0.) as u64;
            rc.finished_instructions = rc.finished_instructions.saturating_add(delta);
        }
        self.last_update = now;

        let mut i = 0;
        while i < self.exec.len() {
            if self.exec[i].is_finished() {
                let mut rc = self.exec.remove(i);
                rc.status = CloudletStatus::Success;
                rc.total_completion_time += now - rc.exec_start_time;
                self.used_pes = self.used_pes.saturating_sub(rc.spec.pes);
                newly_finished.push(rc);
            } else {
                i += 1;
            }
        }
        self.finished.append(&mut newly_finished);

        // Promote waiting cloudlets into freed slots, FIFO, first-fit on PE count.
        let mut requeue = VecDeque::new();
        while let Some(mut rc) = self.waiting.pop_front() {
            if self.free_pes() >= rc.spec.pes {
                rc.status = CloudletStatus::InExec;
                rc.exec_start_time = now;
                self.used_pes += rc.spec.pes;
                self.started.push((rc.spec.id, now));
                self.exec.push(rc);
            } else {
                requeue.push_back(rc);
            }
        }
        self.waiting = requeue;

        let capacity_now = capacity.max(f64::EPSILON);
        let min_remaining = self
            .exec
            .iter()
            .map(|rc| rc.remaining_length() / (capacity_now * rc.spec.pes as f64))
            .fold(f64::INFINITY, f64::min);

        if min_remaining.is_finite() {
            Some((now + min_remaining).max(now + min_time_between_events))
        } else {
            None
        }
    }

    pub fn cloudlet_pause(&mut self, id: u64, now: f64) -> bool {
        if let Some(pos) = self.exec.iter().position(|rc| rc.spec.id == id) {
            let mut rc = self.exec.remove(pos);
            rc.total_completion_time += now - rc.exec_start_time;
            rc.status = CloudletStatus::Paused;
            self.used_pes = self.used_pes.saturating_sub(rc.spec.pes);
            self.paused.push(rc);
            true
        } else {
            false
        }
    }

    pub fn cloudlet_resume(&mut self, id: u64, now: f64) -> bool {
        if let Some(pos) = self.paused.iter().position(|rc| rc.spec.id == id) {
            let mut rc = self.paused.remove(pos);
            rc.status = CloudletStatus::Resumed;
            if self.free_pes() >= rc.spec.pes {
                rc.status = CloudletStatus::InExec;
                rc.exec_start_time = now;
                self.used_pes += rc.spec.pes;
                self.exec.push(rc);
            } else {
                rc.status = CloudletStatus::Queued;
                self.waiting.push_back(rc);
            }
            true
        } else {
            false
        }
    }

    pub fn cloudlet_cancel(&mut self, id: u64) -> Option<ResCloudlet> {
        if let Some(pos) = self.exec.iter().position(|rc| rc.spec.id == id) {
            let mut rc = self.exec.remove(pos);
            rc.status = CloudletStatus::Canceled;
            self.used_pes = self.used_pes.saturating_sub(rc.spec.pes);
            return Some(rc);
        }
        if let Some(pos) = self.waiting.iter().position(|rc| rc.spec.id == id) {
            let mut rc = self.waiting.remove(pos).unwrap();
            rc.status = CloudletStatus::Canceled;
            return Some(rc);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(id: u64, length_mi: f64, pes: u32) -> CloudletSpec {
        CloudletSpec { id, length_mi, pes }
    }

    #[test]
    fn single_cloudlet_finishes_in_one_tick() {
        let mut sched = CloudletScheduler::new(1);
        sched.cloudlet_submit(spec(1, 1000., 1), 0., 0., 0.);
        let next = sched.update_vm_processing(1.0, &[1000.], 0.01);
        assert_eq!(sched.finished().len(), 1);
        assert_eq!(sched.finished()[0].status, CloudletStatus::Success);
        assert!(next.is_none());
    }

    #[test]
    fn space_shared_contention_queues_third_job() {
        let mut sched = CloudletScheduler::new(2);
        sched.cloudlet_submit(spec(1, 1000., 1), 0., 0., 0.);
        sched.cloudlet_submit(spec(2, 1000., 1), 0., 0., 0.);
        sched.cloudlet_submit(spec(3, 1000., 1), 0., 0., 0.);
        assert_eq!(sched.waiting().len(), 1);
        sched.update_vm_processing(1.0, &[1000., 1000.], 0.01);
        assert_eq!(sched.take_finished().len(), 2);
        assert_eq!(sched.waiting().len(), 0);
        assert_eq!(sched.exec().len(), 1);
        sched.update_vm_processing(2.0, &[1000., 1000.], 0.01);
        let finished = sched.take_finished();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].spec.id, 3);
    }

    #[test]
    fn exact_instruction_count_no_drift() {
        let mut sched = CloudletScheduler::new(1);
        sched.cloudlet_submit(spec(1, 1., 1), 0., 0., 0.);
        // capacity 3 MIPS, dt 0.1s, 1 pe -> floor(3 * 0.1 * 1 * 1e6) = 300_000 instructions.
        sched.update_vm_processing(0.1, &[3.0], 0.01);
        assert_eq!(sched.exec()[0].remaining_length(), (1_000_000 - 300_000) as f64 / MILLION);
    }
}
