//! Shared state the four pipeline entities read and mutate in turn (§4.4, §9 "global state").
//!
//! The kernel dispatches events strictly sequentially (§5), so at any instant at most one entity is
//! actually touching this - wrapping it in `Rc<RefCell<_>>` avoids re-serializing the task/job lists
//! into every hop's event payload, while the event tags between stages (see [`super::events`]) still
//! carry the authoritative "this stage's work is ready" signal.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::dag::TaskDag;
use crate::job::{Job, JobId};
use crate::planning::heft::Plan;
use crate::task::TaskId;

pub type SharedState = Rc<RefCell<WorkflowState>>;

/// Everything downstream of parsing: the task DAG, the HEFT plan, and the evolving job list.
pub struct WorkflowState {
    pub dag: TaskDag,
    pub plan: Plan,
    pub jobs: Vec<Job>,
    /// Task id -> id of the job it was last clustered into.
    pub job_of_task: HashMap<TaskId, JobId>,
    next_job_id: JobId,
}

impl WorkflowState {
    pub fn new(dag: TaskDag) -> Self {
        Self { dag, plan: Plan::default(), jobs: Vec::new(), job_of_task: HashMap::new(), next_job_id: 0 }
    }

    pub fn into_shared(self) -> SharedState {
        Rc::new(RefCell::new(self))
    }

    pub fn alloc_job_id(&mut self) -> JobId {
        let id = self.next_job_id;
        self.next_job_id += 1;
        id
    }

    /// Next id that would be handed out by `alloc_job_id`, without consuming it - used to seed a
    /// counter an external helper (e.g. re-clustering) advances on its own before it's folded back in.
    pub fn peek_next_job_id(&self) -> JobId {
        self.next_job_id
    }

    /// Folds a counter advanced outside `alloc_job_id` back in, so later allocations don't collide.
    pub fn fast_forward_job_id(&mut self, at_least: JobId) {
        if at_least > self.next_job_id {
            self.next_job_id = at_least;
        }
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|j| j.id == id)
    }

    pub fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.id == id)
    }
}
