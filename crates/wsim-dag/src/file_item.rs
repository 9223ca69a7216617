//! Logical file references shared between tasks, jobs and the replica catalog.

use serde::{Deserialize, Serialize};

/// Role a file plays in a task's or job's file list.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    None,
    Input,
    Output,
}

/// A logical file: a name, a size in bytes, and the role it plays where it is listed.
#[derive(Clone, Debug, PartialEq)]
pub struct FileItem {
    pub name: String,
    pub size: u64,
    pub kind: FileKind,
}

impl FileItem {
    pub fn new(name: impl Into<String>, size: u64, kind: FileKind) -> Self {
        Self { name: name.into(), size, kind }
    }

    pub fn input(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, size, FileKind::Input)
    }

    pub fn output(name: impl Into<String>, size: u64) -> Self {
        Self::new(name, size, FileKind::Output)
    }
}
