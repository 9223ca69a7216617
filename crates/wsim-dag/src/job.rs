//! Cloudlet-level container of one or more tasks, as dispatched to a datacenter.

use crate::file_item::FileItem;
use crate::task::TaskId;

pub type JobId = usize;

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum JobClass {
    StageIn,
    Compute,
    StageOut,
    CleanUp,
}

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum JobStatus {
    Created,
    Ready,
    Queued,
    InExec,
    Success,
    Failed,
    Canceled,
    Paused,
    Resumed,
    FailedResourceUnavailable,
}

#[derive(Clone, Debug)]
pub struct Job {
    pub id: JobId,
    pub class: JobClass,
    pub status: JobStatus,
    pub tasks: Vec<TaskId>,
    /// Sum of member task lengths, in millions of instructions.
    pub length: u64,
    pub user_id: u64,
    /// Inherited from member tasks; STAGE_IN synthetic jobs use depth 0.
    pub depth: u32,
    pub priority: f64,
    /// Union of member tasks' input/output files.
    pub files: Vec<FileItem>,
    /// Input files not produced as an output by any task within this submit set.
    pub required_files: Vec<String>,
    pub vm_id: Option<u32>,
    pub parents: Vec<JobId>,
    pub children: Vec<JobId>,
    pub cost: f64,
    pub submit_time: Option<f64>,
    pub start_time: Option<f64>,
    pub finish_time: Option<f64>,
}

impl Job {
    pub fn new(id: JobId, class: JobClass, user_id: u64) -> Self {
        Self {
            id,
            class,
            status: JobStatus::Created,
            tasks: Vec::new(),
            length: 0,
            user_id,
            depth: 0,
            priority: 0.,
            files: Vec::new(),
            required_files: Vec::new(),
            vm_id: None,
            parents: Vec::new(),
            children: Vec::new(),
            cost: 0.,
            submit_time: None,
            start_time: None,
            finish_time: None,
        }
    }

    pub fn is_compute(&self) -> bool {
        self.class == JobClass::Compute
    }
}
