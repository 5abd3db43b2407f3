//! Search tests: incremental exploration, the no-progress signal, sphere
//! extraction, rule failures, cancellation and result invariants.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

use kokiri_codegen::{Chunk, Compiler, SymbolTable};
use kokiri_parser::parse;
use kokiri_search::{
    make_sphere, Bitset, Cancellation, EdgeHandle, EdgeId, ExplorationResult, Explored, NodeId,
    Search, SearchError, SearchOptions, WorldGraph,
};
use kokiri_types::{RuleSource, Strings};
use kokiri_vm::{Environment, VmError};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

const A: NodeId = 0;
const B: NodeId = 1;
const C: NodeId = 2;
const D: NodeId = 3;

#[derive(Default)]
struct TestWorld {
    nodes: usize,
    edges: Vec<EdgeHandle>,
    rules: Vec<Chunk>,
    adjacency: Vec<Vec<EdgeId>>,
}

impl TestWorld {
    fn new(nodes: usize) -> Self {
        Self {
            nodes,
            adjacency: vec![Vec::new(); nodes],
            ..Self::default()
        }
    }

    fn connect(&mut self, from: NodeId, to: NodeId, rule: &str) -> EdgeId {
        let id = self.edges.len() as EdgeId;
        let expr = match parse(&RuleSource::new("edge", rule)) {
            Ok(expr) => expr,
            Err(e) => panic!("unexpected parse error: {e}"),
        };
        let symbols = SymbolTable::new();
        let mut strings = Strings::new();
        let chunk = Compiler::new(&symbols, &mut strings)
            .compile(&format!("{from} -> {to}"), &expr)
            .unwrap();
        self.edges.push(EdgeHandle { id, from, to });
        self.rules.push(chunk);
        self.adjacency[from as usize].push(id);
        id
    }
}

impl WorldGraph for TestWorld {
    fn node_count(&self) -> usize {
        self.nodes
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }

    fn outgoing(&self, node: NodeId) -> &[EdgeId] {
        &self.adjacency[node as usize]
    }

    fn edge(&self, id: EdgeId) -> EdgeHandle {
        self.edges[id as usize]
    }

    fn rule(&self, id: EdgeId) -> &Chunk {
        &self.rules[id as usize]
    }
}

/// A→B always, B→C needs the Hookshot, B→D always.
fn four_nodes() -> (TestWorld, [EdgeId; 3]) {
    let mut world = TestWorld::new(4);
    let ab = world.connect(A, B, "True");
    let bc = world.connect(B, C, "Hookshot");
    let bd = world.connect(B, D, "True");
    (world, [ab, bc, bd])
}

fn set(ids: &[u32]) -> Bitset {
    ids.iter().copied().collect()
}

/// Fires once `checks` sweeps have been allowed to start.
struct CancelAfter {
    checks: Cell<usize>,
}

impl CancelAfter {
    fn new(checks: usize) -> Self {
        Self {
            checks: Cell::new(checks),
        }
    }
}

impl Cancellation for CancelAfter {
    fn is_cancelled(&self) -> bool {
        match self.checks.get() {
            0 => true,
            n => {
                self.checks.set(n - 1);
                false
            }
        }
    }
}

fn progress(explored: Explored) -> ExplorationResult {
    match explored {
        Explored::Progress(result) => result,
        Explored::NoProgress(result) => panic!("expected progress, got {result:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Exploration
// ─────────────────────────────────────────────────────────────────────

#[test]
fn blocked_edge_opens_after_state_change() {
    let (world, [ab, bc, bd]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();

    let first = progress(search.explore(&env).unwrap());
    assert_eq!(first.visited, set(&[A, B, D]));
    assert_eq!(first.reached, set(&[B, D]));
    assert_eq!(first.pending, set(&[C]));
    assert_eq!(first.crossed, set(&[ab, bd]));
    assert!(first.failures.is_empty());

    env.bind("Hookshot", true);
    let second = progress(search.explore(&env).unwrap());
    assert_eq!(second.reached, set(&[C]));
    assert!(second.crossed.contains(bc));
    assert!(second.pending.is_empty());
    assert_eq!(search.crossed(), &set(&[ab, bc, bd]));
    assert!(search.frontier().is_empty());
}

#[test]
fn repeat_without_change_is_no_progress() {
    let (world, [_, bc, _]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();

    assert!(search.explore(&env).unwrap().is_progress());
    let again = search.explore(&env).unwrap();
    let Explored::NoProgress(result) = again else {
        panic!("expected no progress");
    };
    assert!(result.reached.is_empty());
    assert_eq!(result.pending, set(&[C]));
    assert_eq!(result.edges.iter().map(|e| e.id).collect::<Vec<_>>(), vec![bc]);
}

#[test]
fn exhausted_search_is_no_progress() {
    let (world, _) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", true);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    let first = progress(search.explore(&env).unwrap());
    assert_eq!(first.visited, set(&[A, B, C, D]));
    assert!(!search.explore(&env).unwrap().is_progress());
}

#[test]
fn cycles_terminate() {
    let mut world = TestWorld::new(3);
    world.connect(0, 1, "True");
    world.connect(1, 0, "True");
    world.connect(1, 2, "True");
    world.connect(2, 1, "True");
    let mut search = Search::from_roots(&world, [0], SearchOptions::default()).unwrap();
    let result = progress(search.explore(&Environment::new()).unwrap());
    assert_eq!(result.visited, set(&[0, 1, 2]));
    assert_eq!(result.crossed.len(), 2);
}

#[test]
fn blocked_destination_reached_another_way_is_not_pending() {
    let mut world = TestWorld::new(3);
    world.connect(0, 2, "False");
    world.connect(0, 1, "True");
    world.connect(1, 2, "True");
    let mut search = Search::from_roots(&world, [0], SearchOptions::default()).unwrap();
    let result = progress(search.explore(&Environment::new()).unwrap());
    assert_eq!(result.visited, set(&[0, 1, 2]));
    assert!(result.pending.is_empty());
    assert!(search.frontier().is_empty());
}

#[test]
fn unknown_root_is_rejected() {
    let (world, _) = four_nodes();
    let err = Search::from_roots(&world, [9], SearchOptions::default())
        .err()
        .unwrap();
    assert_eq!(err, SearchError::UnknownRoot { node: 9, count: 4 });
}

// ─────────────────────────────────────────────────────────────────────
// Failures and cancellation
// ─────────────────────────────────────────────────────────────────────

#[test]
fn failing_rule_counts_as_closed() {
    let (world, [_, bc, _]) = four_nodes();
    let env = Environment::new();
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    let result = progress(search.explore(&env).unwrap());
    assert_eq!(result.reached, set(&[B, D]));
    assert_eq!(result.pending, set(&[C]));
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].edge.id, bc);
    assert_eq!(
        result.failures[0].error,
        VmError::UnboundName {
            name: "Hookshot".into()
        }
    );
}

#[test]
fn failures_can_go_unrecorded() {
    let (world, _) = four_nodes();
    let options = SearchOptions::default().with_record_failures(false);
    let mut search = Search::from_roots(&world, [A], options).unwrap();
    let result = progress(search.explore(&Environment::new()).unwrap());
    assert!(result.failures.is_empty());
    assert_eq!(result.pending, set(&[C]));
}

#[test]
fn cancellation_keeps_frontier() {
    let (world, _) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", true);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();

    let cancel = AtomicBool::new(true);
    assert_eq!(
        search.explore_with(&env, &cancel),
        Err(SearchError::Cancelled { sweeps: 0 })
    );
    assert_eq!(search.frontier(), &set(&[A]));

    cancel.store(false, Ordering::Relaxed);
    let result = progress(search.explore_with(&env, &cancel).unwrap());
    assert_eq!(result.visited, set(&[A, B, C, D]));
}

#[test]
fn cancelled_progress_is_reported_by_next_call() {
    let (world, [ab, bc, bd]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();

    assert_eq!(
        search.explore_with(&env, &CancelAfter::new(1)),
        Err(SearchError::Cancelled { sweeps: 1 })
    );
    assert_eq!(search.visited(), &set(&[A, B]));
    assert_eq!(search.frontier(), &set(&[B]));

    let result = progress(search.explore(&env).unwrap());
    assert_eq!(result.reached, set(&[B, D]));
    assert_eq!(result.crossed, set(&[ab, bd]));
    assert_eq!(result.pending, set(&[C]));
    let edges: Vec<EdgeId> = result.edges.iter().map(|e| e.id).collect();
    assert_eq!(edges, vec![ab, bc, bd]);

    let sphere = make_sphere(&result);
    assert_eq!(sphere.crossed, set(&[ab, bd]));

    assert!(!search.explore(&env).unwrap().is_progress());
    assert!(!search.crossed().contains(bc));
}

#[test]
fn repeated_cancellation_keeps_carried_progress() {
    let (world, [ab, _, _]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", true);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();

    assert!(search.explore_with(&env, &CancelAfter::new(1)).is_err());
    assert!(search.explore_with(&env, &CancelAfter::new(0)).is_err());

    let result = progress(search.explore(&env).unwrap());
    assert_eq!(result.reached, set(&[B, C, D]));
    assert!(result.crossed.contains(ab));
    assert_eq!(result.edges.len(), 3);
}

// ─────────────────────────────────────────────────────────────────────
// Spheres
// ─────────────────────────────────────────────────────────────────────

#[test]
fn sphere_keeps_settling_edges() {
    let (world, [ab, bc, bd]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    let result = progress(search.explore(&env).unwrap());

    let sphere = make_sphere(&result);
    assert_eq!(sphere.crossed, set(&[ab, bd]));
    assert!(!sphere.crossed.contains(bc));
    let edges: Vec<EdgeId> = sphere.edges.iter().map(|e| e.id).collect();
    assert_eq!(edges, vec![ab, bd]);
    assert_eq!(sphere.reached, set(&[B, D]));
    assert_eq!(sphere.visited, sphere.reached);
    assert_eq!(sphere.pending, set(&[C]));
}

#[test]
fn sphere_drops_failures_of_blocked_edges() {
    let (world, [ab, _, bd]) = four_nodes();
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    let result = progress(search.explore(&Environment::new()).unwrap());
    assert_eq!(result.failures.len(), 1);

    let sphere = make_sphere(&result);
    let edges: Vec<EdgeId> = sphere.edges.iter().map(|e| e.id).collect();
    assert_eq!(edges, vec![ab, bd]);
    assert!(sphere.failures.is_empty());
    assert_eq!(sphere.pending, set(&[C]));
}

#[test]
fn sphere_of_later_call() {
    let (world, [_, bc, _]) = four_nodes();
    let mut env = Environment::new();
    env.bind("Hookshot", false);
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    search.explore(&env).unwrap();
    env.bind("Hookshot", true);
    let result = progress(search.explore(&env).unwrap());

    let sphere = make_sphere(&result);
    assert_eq!(sphere.crossed, set(&[bc]));
    assert_eq!(sphere.edges.len(), 1);
    assert_eq!(sphere.reached, set(&[C]));
    assert!(sphere.pending.is_empty());
}

#[test]
fn result_serializes() {
    let (world, _) = four_nodes();
    let mut search = Search::from_roots(&world, [A], SearchOptions::default()).unwrap();
    let result = search.explore(&Environment::new()).unwrap().into_result();
    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["reached"], serde_json::json!([1, 3]));
    assert_eq!(json["failures"][0]["error"], "unbound identifier `Hookshot`");
}

// ─────────────────────────────────────────────────────────────────────
// Invariants
// ─────────────────────────────────────────────────────────────────────

fn random_world(nodes: usize, edges: &[(u32, u32, u8)]) -> TestWorld {
    let mut world = TestWorld::new(nodes);
    for &(from, to, rule) in edges {
        let rule = match rule % 3 {
            0 => "True",
            1 => "False",
            _ => "open",
        };
        world.connect(from % nodes as u32, to % nodes as u32, rule);
    }
    world
}

proptest! {
    #[test]
    fn exploration_reaches_a_fixed_point(
        edges in proptest::collection::vec((0u32..12, 0u32..12, 0u8..3), 0..40),
        open in any::<bool>(),
    ) {
        let world = random_world(12, &edges);
        let mut env = Environment::new();
        env.bind("open", open);
        let mut search = Search::from_roots(&world, [0], SearchOptions::default()).unwrap();
        let result = search.explore(&env).unwrap().into_result();

        prop_assert!(result.reached.is_subset(&result.visited.union(&result.pending)));
        prop_assert!(result.pending.intersection(&result.visited).is_empty());
        for id in &result.crossed {
            prop_assert!(result.visited.contains(world.edge(id).to));
        }
        // Every edge leaving visited ground into unvisited ground is closed.
        for edge in &world.edges {
            if result.visited.contains(edge.from) && !result.visited.contains(edge.to) {
                let closed = matches!(world.rules[edge.id as usize].constant_result(), Some(v) if v == kokiri_types::Packed::FALSE)
                    || !open;
                prop_assert!(closed, "edge {:?} should have been crossed", edge);
                prop_assert!(result.pending.contains(edge.to));
            }
        }
        prop_assert!(!search.explore(&env).unwrap().is_progress());
    }
}
