//! Reads a workflow from the DAX XML format (§6 Workflow input).

use std::collections::HashMap;

use serde::Deserialize;
use serde_xml_rs::from_str;

use crate::dag::TaskDag;
use crate::error::{DagError, DagResult};
use crate::task::TaskId;

#[derive(Debug, Deserialize)]
struct Uses {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    file: Option<String>,
    link: String,
    #[serde(default)]
    size: Option<i64>,
}

impl Uses {
    /// The `name` attribute, falling back to `file` (§6: a `<uses>` element may give the filename
    /// under either attribute).
    fn filename(&self) -> Option<&str> {
        self.name.as_deref().or(self.file.as_deref())
    }

    /// A missing/zero size becomes 1 (to avoid a downstream zero-size file); a negative size is
    /// taken by absolute value (§6).
    fn byte_size(&self) -> u64 {
        match self.size {
            Some(0) | None => 1,
            Some(s) => s.unsigned_abs(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DaxJob {
    id: String,
    name: String,
    #[serde(default)]
    runtime: Option<f64>,
    #[serde(rename = "uses", default)]
    files: Vec<Uses>,
}

#[derive(Debug, Deserialize)]
struct ParentRef {
    #[serde(rename = "ref")]
    task_ref: String,
}

#[derive(Debug, Deserialize)]
struct Child {
    #[serde(rename = "ref")]
    task_ref: String,
    #[serde(rename = "parent", default)]
    parents: Vec<ParentRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename = "adag")]
struct Dax {
    #[serde(rename = "job", default)]
    jobs: Vec<DaxJob>,
    #[serde(rename = "child", default)]
    children: Vec<Child>,
}

/// `runtime * 1000` gives the cloudlet length in millions of instructions, floored to 100, then
/// scaled post-hoc by the global `runtime_scale`. A job missing a `runtime` attribute is assigned
/// a fallback of 0.1 seconds before scaling (§6).
fn task_length(runtime: Option<f64>, runtime_scale: f64) -> u64 {
    let mi = (runtime.unwrap_or(0.1) * 1000.).floor().max(100.);
    (mi * runtime_scale).floor() as u64
}

/// Parses a DAX document into a [`TaskDag`], applying `runtime_scale` to every task length.
/// Jobs whose `uses` element has a link other than `input`/`output` are logged and skipped (§7).
pub fn parse_dax(xml: &str, runtime_scale: f64) -> DagResult<TaskDag> {
    let dax: Dax = from_str(xml).map_err(|e| DagError::Parse {
        format: "DAX",
        path: String::new(),
        message: e.to_string(),
    })?;

    let mut dag = TaskDag::new();
    let mut id_of: HashMap<String, TaskId> = HashMap::new();
    for job in &dax.jobs {
        let length = task_length(job.runtime, runtime_scale);
        let task_id = dag.add_task(&job.name, length, 1, 0)?;
        id_of.insert(job.id.clone(), task_id);
    }

    for job in &dax.jobs {
        let task_id = id_of[&job.id];
        for file in &job.files {
            let Some(name) = file.filename() else {
                log::warn!("DAX job {:?} has a <uses> element with no name or file attribute, skipping", job.id);
                continue;
            };
            let size = file.byte_size();
            match file.link.as_str() {
                "input" => dag.add_task_input(task_id, name, size)?,
                "output" => dag.add_task_output(task_id, name, size)?,
                other => {
                    log::warn!("DAX job {:?} references file {:?} with unrecognised link {:?}, skipping", job.id, name, other);
                }
            }
        }
    }

    for child in &dax.children {
        let Some(&child_id) = id_of.get(&child.task_ref) else {
            log::warn!("DAX <child ref={:?}> does not match any job id, skipping", child.task_ref);
            continue;
        };
        for parent in &child.parents {
            let Some(&parent_id) = id_of.get(&parent.task_ref) else {
                log::warn!("DAX <parent ref={:?}> does not match any job id, skipping", parent.task_ref);
                continue;
            };
            dag.add_dependency(parent_id, child_id)?;
        }
    }

    dag.compute_depths();
    dag.propagate_impact();
    Ok(dag)
}
