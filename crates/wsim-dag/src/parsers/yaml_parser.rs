//! Reads a workflow from the ambient flat YAML format (§6 Workflow input, YAML alternative) -
//! useful for hand-authored test fixtures where DAX XML would be needlessly heavy.
//!
//! Unlike DAX, this format carries no explicit `<child>/<parent>` edges: dependencies are entirely
//! inferred from a task's inputs matching another task's outputs, the same file-based inference
//! DAX also honors alongside its explicit edges (§6).

use std::collections::HashMap;

use serde::Deserialize;

use crate::dag::TaskDag;
use crate::error::{DagError, DagResult};
use crate::task::TaskId;

#[derive(Debug, Deserialize)]
struct YamlFile {
    name: String,
    #[serde(default = "default_size")]
    size: u64,
}

fn default_size() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct YamlTask {
    name: String,
    flops: u64,
    #[serde(default = "default_cores")]
    max_cores: u32,
    #[serde(default)]
    inputs: Vec<YamlFile>,
    #[serde(default)]
    outputs: Vec<YamlFile>,
}

fn default_cores() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct YamlWorkflow {
    tasks: Vec<YamlTask>,
    #[serde(default)]
    inputs: Vec<YamlFile>,
}

/// Parses the flat YAML workflow format into a [`TaskDag`], applying `runtime_scale` to every
/// task length the same way [`super::parse_dax`] does.
pub fn parse_yaml(yaml: &str, runtime_scale: f64) -> DagResult<TaskDag> {
    let workflow: YamlWorkflow = serde_yaml::from_str(yaml).map_err(|e| DagError::Parse {
        format: "YAML workflow",
        path: String::new(),
        message: e.to_string(),
    })?;

    let mut dag = TaskDag::new();
    let mut id_of: HashMap<String, TaskId> = HashMap::new();
    for task in &workflow.tasks {
        let length = ((task.flops as f64) * runtime_scale).floor().max(100.) as u64;
        let task_id = dag.add_task(&task.name, length, task.max_cores.max(1), 0)?;
        id_of.insert(task.name.clone(), task_id);
    }

    let mut producer_of: HashMap<&str, TaskId> = HashMap::new();
    for task in &workflow.tasks {
        let task_id = id_of[&task.name];
        for file in &task.outputs {
            producer_of.insert(&file.name, task_id);
        }
    }
    for task in &workflow.tasks {
        let task_id = id_of[&task.name];
        for file in &task.outputs {
            dag.add_task_output(task_id, &file.name, file.size)?;
        }
    }

    for task in &workflow.tasks {
        let task_id = id_of[&task.name];
        for file in &task.inputs {
            dag.add_task_input(task_id, &file.name, file.size)?;
            if let Some(&parent_id) = producer_of.get(file.name.as_str()) {
                if parent_id != task_id {
                    dag.add_dependency(parent_id, task_id)?;
                }
            }
        }
    }

    for file in &workflow.inputs {
        if dag.file(&file.name).is_none() {
            log::warn!("YAML workflow input {:?} is not consumed by any task", file.name);
        }
    }

    dag.compute_depths();
    dag.propagate_impact();
    Ok(dag)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN: &str = r#"
tasks:
  - name: stage-a
    flops: 1000
    outputs:
      - name: f.txt
        size: 8000000
  - name: stage-b
    flops: 1000
    inputs:
      - name: f.txt
        size: 8000000
inputs: []
"#;

    #[test]
    fn infers_a_dependency_from_matching_input_output_file_names() {
        let dag = parse_yaml(CHAIN, 1.0).unwrap();
        assert_eq!(dag.tasks().len(), 2);
        let a = dag.tasks().iter().find(|t| t.name == "stage-a").unwrap();
        let b = dag.tasks().iter().find(|t| t.name == "stage-b").unwrap();
        assert_eq!(b.parents, vec![a.id]);
        assert!(!dag.is_real_input("f.txt"));
    }

    #[test]
    fn a_file_with_no_producer_is_a_real_input() {
        let yaml = r#"
tasks:
  - name: only
    flops: 500
    inputs:
      - name: external.dat
        size: 4096
inputs:
  - name: external.dat
    size: 4096
"#;
        let dag = parse_yaml(yaml, 1.0).unwrap();
        assert!(dag.is_real_input("external.dat"));
    }
}
