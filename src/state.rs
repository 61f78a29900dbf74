//! Derives every node and connection flag from the allocation set.
//!
//! Nothing here is incremental: each call rebuilds all flags from scratch, so a
//! flag can never drift away from the allocations it describes.

use crate::ir::{ConnectionFlags, NodeFlags, TalentNode};
use std::collections::HashMap;

/// Index-based view of the prerequisite and exclusivity relations.
#[derive(Debug, Clone)]
pub(crate) struct Topology {
    /// Direct prerequisites, deduplicated, authoring order.
    pub(crate) prerequisites: Vec<Vec<usize>>,
    /// Prerequisites that gate progression (everything except Minor nodes).
    pub(crate) progression: Vec<Vec<usize>>,
    /// Symmetric exclusivity partners.
    pub(crate) exclusive: Vec<Vec<usize>>,
    pub(crate) costs: Vec<u32>,
    /// Prerequisites always precede dependents in this order.
    pub(crate) order: Vec<usize>,
}

impl Topology {
    pub(crate) fn build(
        nodes: &[TalentNode],
        index: &HashMap<String, usize>,
        order: Vec<usize>,
    ) -> Self {
        let mut prerequisites = vec![Vec::new(); nodes.len()];
        let mut progression = vec![Vec::new(); nodes.len()];
        let mut exclusive: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];

        for (idx, node) in nodes.iter().enumerate() {
            for prereq in &node.prerequisites {
                let Some(&p) = index.get(prereq) else {
                    continue;
                };
                if prerequisites[idx].contains(&p) {
                    continue;
                }
                prerequisites[idx].push(p);
                if nodes[p].kind.gates_progression() {
                    progression[idx].push(p);
                }
            }
            for other in &node.exclusive_with {
                let Some(&o) = index.get(other) else {
                    continue;
                };
                if !exclusive[idx].contains(&o) {
                    exclusive[idx].push(o);
                }
                if !exclusive[o].contains(&idx) {
                    exclusive[o].push(idx);
                }
            }
        }

        Self {
            prerequisites,
            progression,
            exclusive,
            costs: nodes.iter().map(|n| n.pk_cost).collect(),
            order,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.costs.len()
    }

    pub(crate) fn progression_met(&self, idx: usize, allocated: &[bool]) -> bool {
        self.progression[idx].iter().all(|&p| allocated[p])
    }
}

/// Recomputes all node flags for the given allocation set and budget.
pub(crate) fn resolve_nodes(
    topology: &Topology,
    allocated: &[bool],
    spent_pk: u32,
    total_pk: u32,
) -> Vec<NodeFlags> {
    let n = topology.len();
    let mut permanently_locked = vec![false; n];

    // Walk prerequisites before dependents so the lock cascades down the chain.
    for &idx in &topology.order {
        let excluded = topology.exclusive[idx].iter().any(|&o| allocated[o]);
        let inherited = topology.prerequisites[idx]
            .iter()
            .any(|&p| permanently_locked[p]);
        permanently_locked[idx] = excluded || inherited;
    }

    let remaining = total_pk.saturating_sub(spent_pk);
    (0..n)
        .map(|idx| {
            let is_allocated = allocated[idx];
            let is_permanently_locked = permanently_locked[idx];
            let is_locked = is_permanently_locked || !topology.progression_met(idx, allocated);
            let affordable = topology.costs[idx] <= remaining;
            NodeFlags {
                is_allocated,
                is_locked,
                is_allocatable: !is_allocated && !is_locked && affordable,
                is_permanently_locked,
                is_visible: true,
            }
        })
        .collect()
}

pub(crate) fn resolve_connections(
    edges: &[(usize, usize)],
    allocated: &[bool],
) -> Vec<ConnectionFlags> {
    edges
        .iter()
        .map(|&(from, to)| ConnectionFlags {
            is_active: allocated[from] && allocated[to],
            is_locked: !allocated[from],
        })
        .collect()
}

/// Allocated nodes whose progression prerequisites are no longer all allocated.
pub(crate) fn orphaned(topology: &Topology, allocated: &[bool]) -> Vec<usize> {
    topology
        .order
        .iter()
        .copied()
        .filter(|&idx| allocated[idx] && !topology.progression_met(idx, allocated))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 = genesis, 1 = rite A, 2 = rite B (exclusive with A), 3 = follows B, 4 = minor under 0,
    // 5 = follows the minor node only.
    fn topology() -> Topology {
        Topology {
            prerequisites: vec![vec![], vec![0], vec![0], vec![2], vec![0], vec![4]],
            progression: vec![vec![], vec![0], vec![0], vec![2], vec![0], vec![]],
            exclusive: vec![vec![], vec![2], vec![1], vec![], vec![], vec![]],
            costs: vec![1, 2, 2, 3, 1, 1],
            order: vec![0, 1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn fresh_tree_only_offers_roots_and_minor_dependents() {
        let flags = resolve_nodes(&topology(), &[false; 6], 0, 10);
        assert!(flags[0].is_allocatable);
        assert!(flags[1].is_locked);
        assert!(!flags[1].is_allocatable);
        // Node 5 only waits on a minor node, which never gates progression.
        assert!(!flags[5].is_locked);
        assert!(flags[5].is_allocatable);
        assert!(flags.iter().all(|f| f.is_visible));
    }

    #[test]
    fn exclusive_choice_locks_partner_and_its_descendants() {
        let allocated = [true, true, false, false, false, false];
        let flags = resolve_nodes(&topology(), &allocated, 3, 10);
        assert!(flags[2].is_permanently_locked);
        assert!(flags[2].is_locked);
        assert!(flags[3].is_permanently_locked);
        assert!(!flags[1].is_permanently_locked);
        assert!(!flags[1].is_allocatable);
    }

    #[test]
    fn permanent_lock_is_rederived_not_sticky() {
        let t = topology();
        let locked = resolve_nodes(&t, &[true, true, false, false, false, false], 3, 10);
        assert!(locked[2].is_permanently_locked);
        let released = resolve_nodes(&t, &[true, false, false, false, false, false], 1, 10);
        assert!(!released[2].is_permanently_locked);
        assert!(released[2].is_allocatable);
    }

    #[test]
    fn budget_gates_allocatable_but_not_locked() {
        let flags = resolve_nodes(&topology(), &[true, false, false, false, false, false], 1, 2);
        assert!(!flags[1].is_locked);
        assert!(!flags[1].is_allocatable);
        assert!(flags[4].is_allocatable);
    }

    #[test]
    fn connection_flags_follow_endpoints() {
        let edges = [(0, 1), (1, 3)];
        let flags = resolve_connections(&edges, &[true, true, false, false]);
        assert!(flags[0].is_active);
        assert!(!flags[0].is_locked);
        assert!(!flags[1].is_active);
        assert!(!flags[1].is_locked);

        let flags = resolve_connections(&edges, &[false, false, false, false]);
        assert!(flags[0].is_locked);
    }

    #[test]
    fn orphaned_lists_allocations_missing_progression_prereqs() {
        let allocated = [false, true, false, false, true, true];
        assert_eq!(orphaned(&topology(), &allocated), vec![1, 4]);
    }
}
