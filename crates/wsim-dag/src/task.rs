//! Abstract unit of work in a workflow DAG.

pub type TaskId = usize;

#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum TaskStatus {
    Created,
    Success,
    Failed,
}

#[derive(Clone, Debug)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    /// Length in millions of instructions.
    pub length: u64,
    /// Parallel-element (PE/core) count, usually 1.
    pub pes: u32,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub parents: Vec<TaskId>,
    pub children: Vec<TaskId>,
    /// Longest path from a source task, computed by the planner before ranking.
    pub depth: u32,
    pub user_id: u64,
    /// Weight propagated from exit nodes upward; see the planner's impact pass.
    pub impact: f64,
    pub vm_id: Option<u32>,
    pub start: Option<f64>,
    pub finish: Option<f64>,
    pub status: TaskStatus,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, length: u64, pes: u32, user_id: u64) -> Self {
        Self {
            id,
            name: name.into(),
            length,
            pes,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parents: Vec::new(),
            children: Vec::new(),
            depth: 0,
            user_id,
            impact: 0.,
            vm_id: None,
            start: None,
            finish: None,
            status: TaskStatus::Created,
        }
    }

    pub fn add_input(&mut self, file_name: impl Into<String>) {
        self.inputs.push(file_name.into());
    }

    pub fn add_output(&mut self, file_name: impl Into<String>) {
        self.outputs.push(file_name.into());
    }

    pub fn is_exit(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }
}
