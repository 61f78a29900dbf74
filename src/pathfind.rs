//! Read-only "how do I get there" queries for hover highlighting.

use crate::engine::TalentTree;
use crate::ir::NodeKind;
use std::collections::VecDeque;

/// Breadth-first search seeded from every Genesis node at once, following
/// prerequisite edges forward. Returns node indices from a root to `target`.
fn route_indices(tree: &TalentTree, target: usize) -> Vec<usize> {
    let nodes = tree.nodes();
    let topology = tree.topology();

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, prereqs) in topology.prerequisites.iter().enumerate() {
        for &p in prereqs {
            dependents[p].push(idx);
        }
    }

    let mut parent: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut visited = vec![false; nodes.len()];
    let mut queue = VecDeque::new();
    for (idx, node) in nodes.iter().enumerate() {
        if node.kind == NodeKind::Genesis {
            visited[idx] = true;
            queue.push_back(idx);
        }
    }

    let mut found = visited[target];
    while !found {
        let Some(current) = queue.pop_front() else {
            break;
        };
        for &next in &dependents[current] {
            if visited[next] {
                continue;
            }
            visited[next] = true;
            parent[next] = Some(current);
            if next == target {
                found = true;
                break;
            }
            queue.push_back(next);
        }
    }

    if !found {
        return Vec::new();
    }

    let mut route = vec![target];
    let mut cursor = target;
    while let Some(prev) = parent[cursor] {
        route.push(prev);
        cursor = prev;
    }
    route.reverse();
    route
}

/// Full shortest route from the nearest Genesis to `target`, Minor nodes included.
/// Empty when the target is unknown or unreachable.
pub fn unlock_route(tree: &TalentTree, target: &str) -> Vec<String> {
    let Ok(idx) = tree.index_of(target) else {
        return Vec::new();
    };
    route_indices(tree, idx)
        .into_iter()
        .map(|i| tree.nodes()[i].id.clone())
        .collect()
}

/// Shortest route to `target`, reporting only major nodes.
pub fn shortest_unlock_path(tree: &TalentTree, target: &str) -> Vec<String> {
    let Ok(idx) = tree.index_of(target) else {
        return Vec::new();
    };
    route_indices(tree, idx)
        .into_iter()
        .filter(|&i| tree.nodes()[i].kind.is_major())
        .map(|i| tree.nodes()[i].id.clone())
        .collect()
}

/// Connections along [`unlock_route`], as `(from, to)` pairs.
pub fn unlock_route_connections(tree: &TalentTree, target: &str) -> Vec<(String, String)> {
    let route = unlock_route(tree, target);
    route
        .windows(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

impl TalentTree {
    pub fn shortest_unlock_path(&self, target: &str) -> Vec<String> {
        shortest_unlock_path(self, target)
    }

    pub fn unlock_route(&self, target: &str) -> Vec<String> {
        unlock_route(self, target)
    }
}
