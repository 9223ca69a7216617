//! Event tags wiring the four pipeline entities together (§4.4): each arrow in
//! `Planner -> ClusteringEngine -> WorkflowEngine -> WorkflowScheduler -> Datacenter` is one of these.
//!
//! VM lifecycle traffic between the scheduler and the datacenter reuses
//! [`wsim_iaas::core::events`] directly; only the pipeline-specific job-submission path needs its own
//! tags here, since a job's content lives in the shared [`super::state::WorkflowState`] rather than in
//! the event payload.

use serde::Serialize;

use crate::job::JobId;

/// Sent once by the simulation builder to kick off planning.
#[derive(Clone, Serialize)]
pub struct StartSimulation;

/// Planner -> ClusteringEngine: the plan is in `WorkflowState`, this just signals it's ready.
#[derive(Clone, Serialize)]
pub struct TasksPlanned;

/// ClusteringEngine -> WorkflowEngine: the job list is in `WorkflowState`.
#[derive(Clone, Serialize)]
pub struct JobsClustered;

/// WorkflowEngine's own re-processing signal (the "CLOUDLET_SUBMIT self-signal" of §4.4), sent to
/// itself after start, after a batch departs, and after every return.
#[derive(Clone, Serialize)]
pub struct EngineTick;

/// WorkflowEngine -> WorkflowScheduler: one WED-batch of newly-ready jobs.
#[derive(Clone, Serialize)]
pub struct JobBatch {
    pub job_ids: Vec<JobId>,
}

/// WorkflowScheduler -> WorkflowEngine: a job has returned (successfully or not; status already set).
#[derive(Clone, Serialize)]
pub struct JobReturn {
    pub job_id: JobId,
}

/// WorkflowScheduler -> Datacenter: submit one job, already bound to a VM id in `WorkflowState`.
#[derive(Clone, Serialize)]
pub struct SubmitJob {
    pub job_id: JobId,
}

/// Datacenter -> WorkflowScheduler: a submitted job has left the datacenter's exec/finished lists.
#[derive(Clone, Serialize)]
pub struct JobCompleted {
    pub job_id: JobId,
}

/// Datacenter -> Datacenter: a cloudlet move (§4.3) naming a remote destination forwards the whole
/// job in one event, carrying along the original scheduler id so the destination datacenter knows
/// where to deliver the eventual [`JobCompleted`].
#[derive(Clone, Serialize)]
pub struct ForwardedJobMove {
    pub job_id: JobId,
    pub scheduler: wsim_core::Id,
}
