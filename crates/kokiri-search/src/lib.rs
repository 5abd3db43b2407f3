//! Kokiri search: which nodes of a rule-guarded graph are reachable under
//! the current world state.
//!
//! Each edge carries a compiled rule. [`Search::explore`] evaluates the
//! rules on the edges leaving visited ground and follows every edge that
//! holds, sweep after sweep, until nothing new opens up. Rules that fail
//! to evaluate count as closed; the failure is kept for diagnostics.
//!
//! Searches are incremental: the caller changes the world (places an item,
//! say) and calls `explore` again, and only the edges still blocked are
//! retried. A call that reaches nothing reports [`Explored::NoProgress`].

pub mod bitset;
pub mod error;
pub mod explore;
pub mod graph;
pub mod options;
pub mod sphere;

pub use bitset::Bitset;
pub use error::{EdgeFailure, SearchError, SearchResult};
pub use explore::{Cancellation, ExplorationResult, Explored, Search, Uncancellable};
pub use graph::{EdgeHandle, EdgeId, NodeId, WorldGraph};
pub use options::SearchOptions;
pub use sphere::make_sphere;
