//! Sphere extraction.

use crate::explore::ExplorationResult;

/// The layer of `result` that was settled from already-visited ground.
///
/// Keeps the crossed edges that lead from a visited node into a node
/// reached by this call. The sphere's visited set is exactly what was
/// reached, and its pending set holds the destinations those nodes still
/// could not get to. Blocked edges contribute only to `pending`.
pub fn make_sphere(result: &ExplorationResult) -> ExplorationResult {
    let mut sphere = ExplorationResult {
        visited: result.reached.clone(),
        reached: result.reached.clone(),
        ..ExplorationResult::default()
    };

    for edge in &result.edges {
        if result.crossed.contains(edge.id) {
            if result.visited.contains(edge.from) && result.reached.contains(edge.to) {
                sphere.crossed.insert(edge.id);
                sphere.edges.push(*edge);
            }
        } else if result.reached.contains(edge.from) && result.pending.contains(edge.to) {
            sphere.pending.insert(edge.to);
        }
    }

    sphere.failures = result
        .failures
        .iter()
        .filter(|f| sphere.crossed.contains(f.edge.id))
        .cloned()
        .collect();
    sphere
}
