//! Fixed-point exploration.

use std::sync::atomic::{AtomicBool, Ordering};

use kokiri_vm::{truthy, Resolver, Vm, VmResult};
use serde::Serialize;

use crate::bitset::Bitset;
use crate::error::{EdgeFailure, SearchError, SearchResult};
use crate::graph::{EdgeHandle, EdgeId, NodeId, WorldGraph};
use crate::options::SearchOptions;

/// Checked between sweeps, never between edges.
pub trait Cancellation {
    fn is_cancelled(&self) -> bool;
}

impl Cancellation for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

/// A [`Cancellation`] that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uncancellable;

impl Cancellation for Uncancellable {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// What one call to [`Search::explore`] found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExplorationResult {
    /// Every node visited so far, across calls.
    pub visited: Bitset,
    /// Nodes first reached by this call.
    pub reached: Bitset,
    /// Unvisited destinations of edges whose rule did not hold.
    pub pending: Bitset,
    /// Edges crossed by this call.
    pub crossed: Bitset,
    /// Edges evaluated by this call, in evaluation order.
    pub edges: Vec<EdgeHandle>,
    pub failures: Vec<EdgeFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Explored {
    Progress(ExplorationResult),
    /// Nothing new is reachable until the world state changes.
    NoProgress(ExplorationResult),
}

impl Explored {
    pub fn is_progress(&self) -> bool {
        matches!(self, Explored::Progress(_))
    }

    pub fn result(&self) -> &ExplorationResult {
        match self {
            Explored::Progress(r) | Explored::NoProgress(r) => r,
        }
    }

    pub fn into_result(self) -> ExplorationResult {
        match self {
            Explored::Progress(r) | Explored::NoProgress(r) => r,
        }
    }
}

/// Incremental reachability over a [`WorldGraph`].
///
/// The search remembers which nodes it has visited and which visited nodes
/// still have edges it could not cross. Each call to [`explore`] retries
/// those edges against the current world state and follows whatever opens
/// up, until a sweep reaches nothing new.
///
/// [`explore`]: Search::explore
pub struct Search<'w, W: WorldGraph + ?Sized> {
    world: &'w W,
    options: SearchOptions,
    vm: Vm,
    visited: Bitset,
    /// Visited nodes with outgoing edges still to resolve.
    frontier: Bitset,
    crossed: Bitset,
    /// Progress made by a cancelled call, reported by the next one.
    carried: ExplorationResult,
}

impl<'w, W: WorldGraph + ?Sized> Search<'w, W> {
    /// Start a search with `roots` visited.
    pub fn from_roots(
        world: &'w W,
        roots: impl IntoIterator<Item = NodeId>,
        options: SearchOptions,
    ) -> SearchResult<Self> {
        let count = world.node_count();
        let mut visited = Bitset::new();
        for node in roots {
            if node as usize >= count {
                return Err(SearchError::UnknownRoot { node, count });
            }
            visited.insert(node);
        }
        Ok(Self {
            world,
            options,
            vm: Vm::new(options.vm),
            frontier: visited.clone(),
            visited,
            crossed: Bitset::new(),
            carried: ExplorationResult::default(),
        })
    }

    pub fn visited(&self) -> &Bitset {
        &self.visited
    }

    pub fn frontier(&self) -> &Bitset {
        &self.frontier
    }

    /// Every edge crossed so far, across calls.
    pub fn crossed(&self) -> &Bitset {
        &self.crossed
    }

    pub fn explore(&mut self, env: &dyn Resolver) -> SearchResult<Explored> {
        self.explore_with(env, &Uncancellable)
    }

    pub fn explore_with(
        &mut self,
        env: &dyn Resolver,
        cancel: &dyn Cancellation,
    ) -> SearchResult<Explored> {
        let world = self.world;
        let mut result = std::mem::take(&mut self.carried);
        let mut blocked = Bitset::new();
        let mut worklist = std::mem::take(&mut self.frontier);
        let mut sweeps = 0;

        while !worklist.is_empty() {
            if cancel.is_cancelled() {
                worklist.union_with(&blocked);
                self.frontier = worklist;
                // Blocked edges are retried by the next call, so only
                // crossings carry over.
                result.edges.retain(|edge| result.crossed.contains(edge.id));
                result.failures.clear();
                self.carried = result;
                tracing::debug!(sweeps, "exploration cancelled");
                return Err(SearchError::Cancelled { sweeps });
            }
            sweeps += 1;

            let mut next = Bitset::new();
            for origin in &worklist {
                for &id in world.outgoing(origin) {
                    let edge = world.edge(id);
                    if self.visited.contains(edge.to) {
                        continue;
                    }
                    result.edges.push(edge);

                    match self.evaluate(id, env) {
                        Ok(true) => {
                            self.visited.insert(edge.to);
                            self.crossed.insert(id);
                            result.reached.insert(edge.to);
                            result.crossed.insert(id);
                            next.insert(edge.to);
                        }
                        Ok(false) => {
                            blocked.insert(origin);
                        }
                        Err(error) => {
                            tracing::debug!(
                                edge = id,
                                from = edge.from,
                                to = edge.to,
                                error = %error,
                                "edge rule failed"
                            );
                            blocked.insert(origin);
                            if self.options.record_failures {
                                result.failures.push(EdgeFailure { edge, error });
                            }
                        }
                    }
                }
            }
            worklist = next;
        }

        // A blocked edge may have been outflanked by a later crossing.
        for origin in &blocked {
            let mut still_blocked = false;
            for &id in world.outgoing(origin) {
                let to = world.edge(id).to;
                if !self.visited.contains(to) {
                    result.pending.insert(to);
                    still_blocked = true;
                }
            }
            if still_blocked {
                self.frontier.insert(origin);
            }
        }
        result.visited = self.visited.clone();

        tracing::debug!(
            sweeps,
            reached = result.reached.len(),
            pending = result.pending.len(),
            evaluated = result.edges.len(),
            failures = result.failures.len(),
            "exploration finished"
        );

        if result.reached.is_empty() {
            Ok(Explored::NoProgress(result))
        } else {
            Ok(Explored::Progress(result))
        }
    }

    fn evaluate(&mut self, id: EdgeId, env: &dyn Resolver) -> VmResult<bool> {
        let chunk = self.world.rule(id);
        match chunk.constant_result() {
            Some(value) => truthy(value),
            None => self.vm.test(chunk, env),
        }
    }
}
