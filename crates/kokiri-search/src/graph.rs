//! The graph the search walks.
//!
//! Storage belongs to the host. The search only needs adjacency by dense
//! ids and the compiled rule guarding each edge.

use kokiri_codegen::Chunk;
use serde::{Deserialize, Serialize};

pub type NodeId = u32;
pub type EdgeId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeHandle {
    pub id: EdgeId,
    pub from: NodeId,
    pub to: NodeId,
}

pub trait WorldGraph {
    fn node_count(&self) -> usize;
    fn edge_count(&self) -> usize;
    /// Edges leaving `node`.
    fn outgoing(&self, node: NodeId) -> &[EdgeId];
    fn edge(&self, id: EdgeId) -> EdgeHandle;
    /// The rule that must hold to cross edge `id`.
    fn rule(&self, id: EdgeId) -> &Chunk;
}
