use kokiri_vm::VmError;
use serde::Serialize;
use thiserror::Error;

use crate::graph::{EdgeHandle, NodeId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// Cancelled between sweeps. Nodes reached so far stay visited, the
    /// unexpanded ones are picked up by the next call, and that call's
    /// result reports them as reached.
    #[error("exploration cancelled after {sweeps} sweep(s)")]
    Cancelled { sweeps: usize },

    #[error("root {node} is outside the graph ({count} nodes)")]
    UnknownRoot { node: NodeId, count: usize },
}

/// Search result type alias.
pub type SearchResult<T> = Result<T, SearchError>;

/// An edge whose rule failed to evaluate. The edge counts as not crossed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeFailure {
    pub edge: EdgeHandle,
    #[serde(serialize_with = "display")]
    pub error: VmError,
}

fn display<S: serde::Serializer>(error: &VmError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}
