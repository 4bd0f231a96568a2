//! Declared file operation sets

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Kind of access a task declares on a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// The file is only read
    Read,
    /// An existing file is changed in place
    Modify,
    /// A new file is written
    Create,
    /// The file is removed
    Delete,
}

impl OperationKind {
    /// Returns `true` for operations that write file content.
    pub fn is_write(self) -> bool {
        matches!(self, Self::Modify | Self::Create)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Read => "read",
            Self::Modify => "modify",
            Self::Create => "create",
            Self::Delete => "delete",
        };
        formatter.write_str(label)
    }
}

/// The four declared path sets of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOperations {
    /// Paths read by the task
    #[serde(default)]
    pub reads: BTreeSet<PathBuf>,
    /// Paths modified in place
    #[serde(default)]
    pub modifies: BTreeSet<PathBuf>,
    /// Paths created
    #[serde(default)]
    pub creates: BTreeSet<PathBuf>,
    /// Paths deleted
    #[serde(default)]
    pub deletes: BTreeSet<PathBuf>,
}

impl FileOperations {
    /// Iterates every declared `(path, kind)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, OperationKind)> {
        let reads = self.reads.iter().map(|path| (path, OperationKind::Read));
        let modifies = self
            .modifies
            .iter()
            .map(|path| (path, OperationKind::Modify));
        let creates = self
            .creates
            .iter()
            .map(|path| (path, OperationKind::Create));
        let deletes = self
            .deletes
            .iter()
            .map(|path| (path, OperationKind::Delete));

        reads.chain(modifies).chain(creates).chain(deletes)
    }

    /// Returns `true` when nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
            && self.modifies.is_empty()
            && self.creates.is_empty()
            && self.deletes.is_empty()
    }

    /// Number of declared `(path, kind)` pairs.
    pub fn len(&self) -> usize {
        self.reads.len() + self.modifies.len() + self.creates.len() + self.deletes.len()
    }
}
