use crate::blueprint::{Blueprint, topological_order};
use crate::config::EngineConfig;
use crate::error::{
    BlueprintError, EngineError, EngineResult, InvariantViolation, NotAllocatableReason,
};
use crate::ir::{ConnectionFlags, NodeFlags, NodeKind, Point, TalentConnection, TalentNode};
use crate::layout::Layout;
use crate::state::{self, Topology};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info};

/// Penalty recorded when a Schism node carrying a penalty is allocated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhilosophicalWound {
    pub node_id: String,
    pub path_id: String,
    pub text: String,
    pub spent_pk_at: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSnapshot {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub path: String,
    pub pk_cost: u32,
    pub prerequisites: Vec<String>,
    pub position: Option<Point>,
    #[serde(flatten)]
    pub flags: NodeFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub flags: ConnectionFlags,
}

/// Everything the presentation layer needs to redraw the tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeSnapshot {
    pub nodes: Vec<NodeSnapshot>,
    pub connections: Vec<ConnectionSnapshot>,
    pub total_pk: u32,
    pub spent_pk: u32,
    pub remaining_pk: u32,
    /// Allocation order.
    pub allocated: Vec<String>,
    pub chosen_paths: BTreeMap<String, String>,
    pub wounds: Vec<PhilosophicalWound>,
    pub covenant: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&TreeSnapshot) + Send>;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("count", &self.listeners.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
struct PathInfo {
    id: String,
    name: String,
    group: String,
}

/// The talent graph plus its allocation state. All mutation goes through
/// [`allocate`](Self::allocate), [`deallocate`](Self::deallocate) and [`reset`](Self::reset).
#[derive(Debug)]
pub struct TalentTree {
    nodes: Vec<TalentNode>,
    connections: Vec<TalentConnection>,
    edges: Vec<(usize, usize)>,
    index: HashMap<String, usize>,
    topology: Topology,
    paths: Vec<PathInfo>,
    total_pk: u32,
    spent_pk: u32,
    allocated: Vec<bool>,
    allocation_order: Vec<usize>,
    chosen_paths: BTreeMap<String, String>,
    wounds: Vec<PhilosophicalWound>,
    covenant: Option<serde_json::Value>,
    subscribers: Subscribers,
}

impl TalentTree {
    pub fn from_blueprint(blueprint: &Blueprint) -> Result<Self, BlueprintError> {
        let order = topological_order(blueprint)?;

        let paths: Vec<PathInfo> = blueprint
            .paths
            .iter()
            .map(|path| PathInfo {
                id: path.id.clone(),
                name: path.name.clone().unwrap_or_else(|| path.id.clone()),
                group: path.group.clone(),
            })
            .collect();

        let nodes: Vec<TalentNode> = blueprint
            .nodes()
            .map(|(path, node)| TalentNode {
                id: node.id.clone(),
                name: node.display_name().to_string(),
                kind: node.kind,
                path: path.id.clone(),
                prerequisites: node.prerequisites.clone(),
                exclusive_with: node.exclusive_with.clone(),
                pk_cost: node.cost,
                penalty: node.penalty.clone(),
                position: None,
                flags: NodeFlags::default(),
            })
            .collect();

        let index: HashMap<String, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
        let topology = Topology::build(&nodes, &index, order);

        let mut connections = Vec::new();
        let mut edges = Vec::new();
        for (to, prereqs) in topology.prerequisites.iter().enumerate() {
            for &from in prereqs {
                connections.push(TalentConnection::new(&nodes[from].id, &nodes[to].id));
                edges.push((from, to));
            }
        }

        let count = nodes.len();
        let mut tree = Self {
            nodes,
            connections,
            edges,
            index,
            topology,
            paths,
            total_pk: blueprint.total_pk,
            spent_pk: 0,
            allocated: vec![false; count],
            allocation_order: Vec::new(),
            chosen_paths: BTreeMap::new(),
            wounds: Vec::new(),
            covenant: None,
            subscribers: Subscribers::default(),
        };
        tree.refresh();
        debug!(
            nodes = tree.nodes.len(),
            connections = tree.connections.len(),
            total_pk = tree.total_pk,
            "talent tree built"
        );
        Ok(tree)
    }

    pub fn from_blueprint_with(
        blueprint: &Blueprint,
        config: &EngineConfig,
    ) -> Result<Self, BlueprintError> {
        let mut tree = Self::from_blueprint(blueprint)?;
        if let Some(total_pk) = config.total_pk {
            tree.total_pk = total_pk;
            tree.refresh();
        }
        Ok(tree)
    }

    pub fn nodes(&self) -> &[TalentNode] {
        &self.nodes
    }

    pub fn node(&self, id: &str) -> Option<&TalentNode> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn connections(&self) -> &[TalentConnection] {
        &self.connections
    }

    pub fn total_pk(&self) -> u32 {
        self.total_pk
    }

    pub fn spent_pk(&self) -> u32 {
        self.spent_pk
    }

    pub fn remaining_pk(&self) -> u32 {
        self.total_pk.saturating_sub(self.spent_pk)
    }

    pub fn is_allocated(&self, id: &str) -> bool {
        self.index
            .get(id)
            .map(|&idx| self.allocated[idx])
            .unwrap_or(false)
    }

    /// Allocated node ids in the order they were allocated.
    pub fn allocated_nodes(&self) -> Vec<&str> {
        self.allocation_order
            .iter()
            .map(|&idx| self.nodes[idx].id.as_str())
            .collect()
    }

    pub fn chosen_paths(&self) -> &BTreeMap<String, String> {
        &self.chosen_paths
    }

    pub fn wounds(&self) -> &[PhilosophicalWound] {
        &self.wounds
    }

    pub fn covenant(&self) -> Option<&serde_json::Value> {
        self.covenant.as_ref()
    }

    pub fn path_name(&self, path_id: &str) -> Option<&str> {
        self.paths
            .iter()
            .find(|p| p.id == path_id)
            .map(|p| p.name.as_str())
    }

    pub fn set_covenant(&mut self, covenant: Option<serde_json::Value>) {
        self.covenant = covenant;
        self.notify();
    }

    pub fn allocate(&mut self, id: &str) -> EngineResult<()> {
        let idx = self.index_of(id)?;
        let node = &self.nodes[idx];
        let flags = node.flags;

        if !flags.is_allocatable {
            let reason = if flags.is_allocated {
                NotAllocatableReason::AlreadyAllocated
            } else if flags.is_permanently_locked {
                NotAllocatableReason::PermanentlyLocked
            } else if flags.is_locked {
                NotAllocatableReason::Locked
            } else {
                return Err(self.budget_error(idx));
            };
            debug!(node = id, %reason, "allocation rejected");
            return Err(EngineError::not_allocatable(id, reason));
        }

        let cost = node.pk_cost;
        let spent = match self.spent_pk.checked_add(cost) {
            Some(spent) if spent <= self.total_pk => spent,
            _ => return Err(self.budget_error(idx)),
        };

        self.allocated[idx] = true;
        self.allocation_order.push(idx);
        self.spent_pk = spent;

        let node = &self.nodes[idx];
        match node.kind {
            NodeKind::Genesis => {
                if let Some(path) = self.paths.iter().find(|p| p.id == node.path) {
                    self.chosen_paths.insert(path.group.clone(), path.id.clone());
                }
            }
            NodeKind::Schism => {
                if let Some(text) = &node.penalty {
                    self.wounds.push(PhilosophicalWound {
                        node_id: node.id.clone(),
                        path_id: node.path.clone(),
                        text: text.clone(),
                        spent_pk_at: spent,
                    });
                }
            }
            _ => {}
        }

        debug!(node = id, cost, spent_pk = self.spent_pk, "allocated");
        self.refresh();
        self.notify();
        Ok(())
    }

    /// Removes `id` and every allocation that no longer has its progression
    /// prerequisites. Returns the removed ids, `id` first.
    pub fn deallocate(&mut self, id: &str) -> EngineResult<Vec<String>> {
        let idx = self.index_of(id)?;
        if !self.allocated[idx] {
            return Err(EngineError::NotAllocated(id.to_string()));
        }

        let mut removed = vec![idx];
        self.allocated[idx] = false;
        self.spent_pk -= self.topology.costs[idx];

        loop {
            let orphans = state::orphaned(&self.topology, &self.allocated);
            if orphans.is_empty() {
                break;
            }
            for orphan in orphans {
                self.allocated[orphan] = false;
                self.spent_pk -= self.topology.costs[orphan];
                removed.push(orphan);
            }
        }

        let allocated = &self.allocated;
        self.allocation_order.retain(|&i| allocated[i]);
        self.rebuild_chosen_paths();

        let removed: Vec<String> = removed
            .into_iter()
            .map(|i| self.nodes[i].id.clone())
            .collect();
        if removed.len() > 1 {
            info!(node = id, cascaded = ?&removed[1..], "deallocation cascaded");
        }
        debug!(node = id, spent_pk = self.spent_pk, "deallocated");

        self.refresh();
        self.notify();
        Ok(removed)
    }

    pub fn reset(&mut self) {
        self.allocated.iter_mut().for_each(|a| *a = false);
        self.allocation_order.clear();
        self.spent_pk = 0;
        self.chosen_paths.clear();
        self.wounds.clear();
        self.covenant = None;
        debug!("tree reset");
        self.refresh();
        self.notify();
    }

    /// Copies positions from a computed layout. Nodes missing from the layout keep no position.
    pub fn apply_layout(&mut self, layout: &Layout) -> usize {
        let mut placed = 0;
        for node in &mut self.nodes {
            node.position = layout.position(&node.id);
            if node.position.is_some() {
                placed += 1;
            }
        }
        placed
    }

    pub fn snapshot(&self) -> TreeSnapshot {
        TreeSnapshot {
            nodes: self
                .nodes
                .iter()
                .map(|node| NodeSnapshot {
                    id: node.id.clone(),
                    name: node.name.clone(),
                    kind: node.kind,
                    path: node.path.clone(),
                    pk_cost: node.pk_cost,
                    prerequisites: node.prerequisites.clone(),
                    position: node.position,
                    flags: node.flags,
                })
                .collect(),
            connections: self
                .connections
                .iter()
                .map(|c| ConnectionSnapshot {
                    from: c.from.clone(),
                    to: c.to.clone(),
                    flags: c.flags,
                })
                .collect(),
            total_pk: self.total_pk,
            spent_pk: self.spent_pk,
            remaining_pk: self.remaining_pk(),
            allocated: self
                .allocated_nodes()
                .into_iter()
                .map(str::to_string)
                .collect(),
            chosen_paths: self.chosen_paths.clone(),
            wounds: self.wounds.clone(),
            covenant: self.covenant.clone(),
        }
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&TreeSnapshot) + Send + 'static,
    {
        let id = SubscriptionId(self.subscribers.next_id);
        self.subscribers.next_id += 1;
        self.subscribers.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.listeners.len();
        self.subscribers.listeners.retain(|(sid, _)| *sid != id);
        self.subscribers.listeners.len() != before
    }

    /// Verifies the allocation invariants, reporting the first violation found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let expected: u32 = (0..self.nodes.len())
            .filter(|&i| self.allocated[i])
            .map(|i| self.topology.costs[i])
            .sum();
        if expected != self.spent_pk {
            return Err(InvariantViolation::SpentMismatch {
                spent: self.spent_pk,
                expected,
            });
        }
        if self.spent_pk > self.total_pk {
            return Err(InvariantViolation::OverBudget {
                spent: self.spent_pk,
                total: self.total_pk,
            });
        }
        if self.allocation_order.len() != self.allocated.iter().filter(|a| **a).count() {
            return Err(InvariantViolation::OrderOutOfSync);
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            if !self.allocated[idx] {
                continue;
            }
            if !self.topology.progression_met(idx, &self.allocated) {
                return Err(InvariantViolation::MissingPrerequisites(node.id.clone()));
            }
            if let Some(&other) = self.topology.exclusive[idx]
                .iter()
                .find(|&&o| self.allocated[o])
            {
                return Err(InvariantViolation::ExclusiveBoth(
                    node.id.clone(),
                    self.nodes[other].id.clone(),
                ));
            }
            if node.flags.is_allocated != self.allocated[idx] {
                return Err(InvariantViolation::StaleFlags(node.id.clone()));
            }
        }
        Ok(())
    }

    pub(crate) fn index_of(&self, id: &str) -> EngineResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))
    }

    pub(crate) fn topology(&self) -> &Topology {
        &self.topology
    }

    fn budget_error(&self, idx: usize) -> EngineError {
        let node = &self.nodes[idx];
        debug!(
            node = %node.id,
            cost = node.pk_cost,
            remaining = self.remaining_pk(),
            "allocation over budget"
        );
        EngineError::BudgetExceeded {
            id: node.id.clone(),
            cost: node.pk_cost,
            remaining: self.remaining_pk(),
        }
    }

    fn rebuild_chosen_paths(&mut self) {
        self.chosen_paths.clear();
        for &idx in &self.allocation_order {
            let node = &self.nodes[idx];
            if node.kind != NodeKind::Genesis {
                continue;
            }
            if let Some(path) = self.paths.iter().find(|p| p.id == node.path) {
                self.chosen_paths.insert(path.group.clone(), path.id.clone());
            }
        }
    }

    fn refresh(&mut self) {
        let flags = state::resolve_nodes(
            &self.topology,
            &self.allocated,
            self.spent_pk,
            self.total_pk,
        );
        for (node, flags) in self.nodes.iter_mut().zip(flags) {
            node.flags = flags;
        }
        let flags = state::resolve_connections(&self.edges, &self.allocated);
        for (connection, flags) in self.connections.iter_mut().zip(flags) {
            connection.flags = flags;
        }
    }

    fn notify(&mut self) {
        if self.subscribers.listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, listener) in &mut self.subscribers.listeners {
            listener(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::NodeBlueprint;
    use std::sync::{Arc, Mutex};

    fn chain(total_pk: u32) -> TalentTree {
        let blueprint = Blueprint::single_path(
            "gnosis",
            total_pk,
            vec![
                NodeBlueprint::new("genesis", NodeKind::Genesis, 1),
                NodeBlueprint::new("keystone", NodeKind::Keystone, 2).requires(&["genesis"]),
                NodeBlueprint::new("manifest", NodeKind::Manifestation, 4).requires(&["keystone"]),
            ],
        );
        TalentTree::from_blueprint(&blueprint).unwrap()
    }

    #[test]
    fn fresh_tree_offers_only_genesis() {
        let tree = chain(10);
        assert!(tree.node("genesis").unwrap().is_allocatable());
        assert!(tree.node("keystone").unwrap().is_locked());
        assert_eq!(tree.connections().len(), 2);
        assert!(tree.connections().iter().all(|c| c.is_locked()));
        tree.check_invariants().unwrap();
    }

    #[test]
    fn allocate_unknown_node_fails() {
        let mut tree = chain(10);
        assert_eq!(
            tree.allocate("nope"),
            Err(EngineError::UnknownNode("nope".to_string()))
        );
        assert_eq!(
            tree.deallocate("nope"),
            Err(EngineError::UnknownNode("nope".to_string()))
        );
    }

    #[test]
    fn allocate_twice_reports_already_allocated() {
        let mut tree = chain(10);
        tree.allocate("genesis").unwrap();
        assert_eq!(
            tree.allocate("genesis"),
            Err(EngineError::not_allocatable(
                "genesis",
                NotAllocatableReason::AlreadyAllocated
            ))
        );
        assert_eq!(tree.spent_pk(), 1);
    }

    #[test]
    fn allocate_locked_node_is_rejected_without_mutation() {
        let mut tree = chain(10);
        let err = tree.allocate("keystone").unwrap_err();
        assert_eq!(
            err,
            EngineError::not_allocatable("keystone", NotAllocatableReason::Locked)
        );
        assert!(err.is_not_allocatable());
        assert_eq!(tree.spent_pk(), 0);
        assert!(tree.allocated_nodes().is_empty());
    }

    #[test]
    fn genesis_records_chosen_path_and_cascade_clears_it() {
        let mut tree = chain(10);
        tree.allocate("genesis").unwrap();
        assert_eq!(tree.chosen_paths().get("primary").map(String::as_str), Some("gnosis"));
        tree.allocate("keystone").unwrap();
        let removed = tree.deallocate("genesis").unwrap();
        assert_eq!(removed, vec!["genesis".to_string(), "keystone".to_string()]);
        assert!(tree.chosen_paths().is_empty());
        assert_eq!(tree.spent_pk(), 0);
        tree.check_invariants().unwrap();
    }

    #[test]
    fn corrupted_bookkeeping_is_reported_as_typed_violation() {
        let mut tree = chain(10);
        tree.allocate("genesis").unwrap();
        tree.spent_pk = 5;
        assert_eq!(
            tree.check_invariants(),
            Err(InvariantViolation::SpentMismatch {
                spent: 5,
                expected: 1
            })
        );

        tree.spent_pk = 1;
        tree.allocation_order.clear();
        assert_eq!(tree.check_invariants(), Err(InvariantViolation::OrderOutOfSync));
    }

    #[test]
    fn deallocate_unallocated_node_fails() {
        let mut tree = chain(10);
        assert_eq!(
            tree.deallocate("genesis"),
            Err(EngineError::NotAllocated("genesis".to_string()))
        );
    }

    #[test]
    fn schism_penalty_appends_wound_that_survives_deallocation() {
        let blueprint = Blueprint::single_path(
            "gnosis",
            20,
            vec![
                NodeBlueprint::new("genesis", NodeKind::Genesis, 1),
                NodeBlueprint::new("rift", NodeKind::Schism, 3)
                    .requires(&["genesis"])
                    .with_penalty("doubt"),
                NodeBlueprint::new("quiet", NodeKind::Schism, 3).requires(&["genesis"]),
            ],
        );
        let mut tree = TalentTree::from_blueprint(&blueprint).unwrap();
        tree.allocate("genesis").unwrap();
        tree.allocate("quiet").unwrap();
        assert!(tree.wounds().is_empty());
        tree.allocate("rift").unwrap();
        assert_eq!(tree.wounds().len(), 1);
        assert_eq!(tree.wounds()[0].text, "doubt");
        assert_eq!(tree.wounds()[0].spent_pk_at, 7);

        tree.deallocate("rift").unwrap();
        assert_eq!(tree.wounds().len(), 1);
        tree.reset();
        assert!(tree.wounds().is_empty());
    }

    #[test]
    fn one_sided_exclusivity_is_symmetric() {
        let blueprint = Blueprint::single_path(
            "gnosis",
            20,
            vec![
                NodeBlueprint::new("genesis", NodeKind::Genesis, 1),
                NodeBlueprint::new("a", NodeKind::GnosticRite, 1)
                    .requires(&["genesis"])
                    .exclusive(&["b"]),
                NodeBlueprint::new("b", NodeKind::GnosticRite, 1).requires(&["genesis"]),
            ],
        );
        let mut tree = TalentTree::from_blueprint(&blueprint).unwrap();
        tree.allocate("genesis").unwrap();
        tree.allocate("b").unwrap();
        assert!(tree.node("a").unwrap().is_permanently_locked());
        assert_eq!(
            tree.allocate("a"),
            Err(EngineError::not_allocatable(
                "a",
                NotAllocatableReason::PermanentlyLocked
            ))
        );
    }

    #[test]
    fn subscribers_see_each_successful_mutation_once() {
        let mut tree = chain(10);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let id = tree.subscribe(move |snapshot| {
            sink.lock().unwrap().push(snapshot.spent_pk);
        });

        tree.allocate("genesis").unwrap();
        tree.allocate("manifest").unwrap_err();
        tree.allocate("keystone").unwrap();
        tree.reset();
        assert_eq!(*seen.lock().unwrap(), vec![1, 3, 0]);

        assert!(tree.unsubscribe(id));
        assert!(!tree.unsubscribe(id));
        tree.allocate("genesis").unwrap();
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[test]
    fn config_budget_overrides_blueprint() {
        let blueprint = Blueprint::single_path(
            "gnosis",
            1,
            vec![
                NodeBlueprint::new("genesis", NodeKind::Genesis, 1),
                NodeBlueprint::new("keystone", NodeKind::Keystone, 2).requires(&["genesis"]),
            ],
        );
        let config = EngineConfig { total_pk: Some(5) };
        let mut tree = TalentTree::from_blueprint_with(&blueprint, &config).unwrap();
        assert_eq!(tree.total_pk(), 5);
        tree.allocate("genesis").unwrap();
        tree.allocate("keystone").unwrap();
        assert_eq!(tree.remaining_pk(), 2);
    }

    #[test]
    fn snapshot_serializes_flags_inline() {
        let mut tree = chain(10);
        tree.allocate("genesis").unwrap();
        tree.set_covenant(Some(serde_json::json!({ "pact": "ember" })));
        let value = serde_json::to_value(tree.snapshot()).unwrap();
        assert_eq!(value["spentPk"], 1);
        assert_eq!(value["nodes"][0]["isAllocated"], true);
        assert_eq!(value["nodes"][1]["isAllocatable"], true);
        assert_eq!(value["connections"][0]["isLocked"], false);
        assert_eq!(value["covenant"]["pact"], "ember");
        assert_eq!(value["allocated"][0], "genesis");
    }
}
