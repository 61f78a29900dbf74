//! Static, designer-authored talent data and its construction-time checks.

use crate::error::BlueprintError;
use crate::ir::NodeKind;
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

static NODE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_.:\-]*$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    /// PK budget for the whole tree.
    pub total_pk: u32,
    pub paths: Vec<PathBlueprint>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathBlueprint {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Grouping key under which an allocated Genesis records this path as chosen.
    #[serde(default = "default_group")]
    pub group: String,
    pub layout: PathLayoutParams,
    pub nodes: Vec<NodeBlueprint>,
}

fn default_group() -> String {
    "primary".to_string()
}

/// Polar layout constants for one path. Angles are radians.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PathLayoutParams {
    pub center_x: f32,
    pub center_y: f32,
    pub main_angle: f32,
    pub angle_spread: f32,
    pub branch_count: u32,
    pub base_radius: f32,
    pub radius_step: f32,
    pub min_separation: f32,
}

impl Default for PathLayoutParams {
    fn default() -> Self {
        Self {
            center_x: 0.0,
            center_y: 0.0,
            main_angle: 0.0,
            angle_spread: std::f32::consts::FRAC_PI_2,
            branch_count: 4,
            base_radius: 80.0,
            radius_step: 60.0,
            min_separation: 48.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeBlueprint {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub kind: NodeKind,
    #[serde(default, alias = "requires")]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub exclusive_with: Vec<String>,
    #[serde(alias = "pkCost")]
    pub cost: u32,
    #[serde(default)]
    pub branch: f32,
    #[serde(default)]
    pub depth: f32,
    #[serde(default)]
    pub penalty: Option<String>,
}

impl NodeBlueprint {
    pub fn new(id: &str, kind: NodeKind, cost: u32) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            kind,
            prerequisites: Vec::new(),
            exclusive_with: Vec::new(),
            cost,
            branch: 0.0,
            depth: 0.0,
            penalty: None,
        }
    }

    pub fn requires(mut self, ids: &[&str]) -> Self {
        self.prerequisites = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn exclusive(mut self, ids: &[&str]) -> Self {
        self.exclusive_with = ids.iter().map(|id| id.to_string()).collect();
        self
    }

    pub fn at(mut self, branch: f32, depth: f32) -> Self {
        self.branch = branch;
        self.depth = depth;
        self
    }

    pub fn with_penalty(mut self, text: &str) -> Self {
        self.penalty = Some(text.to_string());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl Blueprint {
    /// Single-path blueprint with default layout constants.
    pub fn single_path(path_id: &str, total_pk: u32, nodes: Vec<NodeBlueprint>) -> Self {
        Self {
            total_pk,
            paths: vec![PathBlueprint {
                id: path_id.to_string(),
                name: None,
                group: default_group(),
                layout: PathLayoutParams::default(),
                nodes,
            }],
        }
    }

    /// Every node in authoring order, paired with its owning path.
    pub fn nodes(&self) -> impl Iterator<Item = (&PathBlueprint, &NodeBlueprint)> {
        self.paths
            .iter()
            .flat_map(|path| path.nodes.iter().map(move |node| (path, node)))
    }

    pub fn validate(&self) -> Result<(), BlueprintError> {
        topological_order(self).map(|_| ())
    }
}

pub fn parse_blueprint(input: &str) -> Result<Blueprint> {
    let blueprint: Blueprint = json5::from_str(input).context("malformed blueprint")?;
    blueprint.validate()?;
    Ok(blueprint)
}

pub fn load_blueprint(path: &Path) -> Result<Blueprint> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading blueprint {}", path.display()))?;
    parse_blueprint(&contents).with_context(|| format!("loading blueprint {}", path.display()))
}

fn validate_layout(path: &PathBlueprint) -> Result<(), BlueprintError> {
    let params = &path.layout;
    let invalid = |reason: &str| BlueprintError::InvalidLayout {
        path: path.id.clone(),
        reason: reason.to_string(),
    };
    let finite = [
        params.center_x,
        params.center_y,
        params.main_angle,
        params.angle_spread,
        params.base_radius,
        params.radius_step,
        params.min_separation,
    ];
    if finite.iter().any(|v| !v.is_finite()) {
        return Err(invalid("layout constants must be finite"));
    }
    if params.branch_count == 0 {
        return Err(invalid("branchCount must be positive"));
    }
    if params.min_separation <= 0.0 {
        return Err(invalid("minSeparation must be positive"));
    }
    if params.base_radius < 0.0 {
        return Err(invalid("baseRadius must not be negative"));
    }
    for node in &path.nodes {
        if !node.branch.is_finite() || !node.depth.is_finite() {
            return Err(invalid(&format!("node {} has a non-finite coordinate", node.id)));
        }
    }
    Ok(())
}

/// Checks the whole blueprint and returns node indices (flattened, authoring order)
/// sorted so that every prerequisite precedes its dependents.
pub(crate) fn topological_order(blueprint: &Blueprint) -> Result<Vec<usize>, BlueprintError> {
    let mut path_ids: HashSet<&str> = HashSet::new();
    for path in &blueprint.paths {
        if !path_ids.insert(path.id.as_str()) {
            return Err(BlueprintError::DuplicatePath(path.id.clone()));
        }
        if path.nodes.is_empty() {
            return Err(BlueprintError::EmptyPath {
                path: path.id.clone(),
            });
        }
        validate_layout(path)?;
    }

    let nodes: Vec<&NodeBlueprint> = blueprint.nodes().map(|(_, node)| node).collect();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for (idx, node) in nodes.iter().enumerate() {
        if !NODE_ID_RE.is_match(&node.id) {
            return Err(BlueprintError::InvalidNodeId(node.id.clone()));
        }
        if index.insert(node.id.as_str(), idx).is_some() {
            return Err(BlueprintError::DuplicateNode(node.id.clone()));
        }
    }

    for node in &nodes {
        if node.cost == 0 {
            return Err(BlueprintError::ZeroCost(node.id.clone()));
        }
        if node.kind == NodeKind::Genesis && !node.prerequisites.is_empty() {
            return Err(BlueprintError::GenesisWithPrerequisites(node.id.clone()));
        }
        for prereq in &node.prerequisites {
            if prereq == &node.id {
                return Err(BlueprintError::SelfReference(node.id.clone()));
            }
            if !index.contains_key(prereq.as_str()) {
                return Err(BlueprintError::DanglingPrerequisite {
                    node: node.id.clone(),
                    missing: prereq.clone(),
                });
            }
        }
        for other in &node.exclusive_with {
            if other == &node.id {
                return Err(BlueprintError::SelfReference(node.id.clone()));
            }
            if !index.contains_key(other.as_str()) {
                return Err(BlueprintError::DanglingExclusive {
                    node: node.id.clone(),
                    missing: other.clone(),
                });
            }
        }
    }

    // Kahn's algorithm; the queue is fed in authoring order so the result is stable.
    let mut indegree = vec![0usize; nodes.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node) in nodes.iter().enumerate() {
        let mut seen = HashSet::new();
        for prereq in &node.prerequisites {
            if !seen.insert(prereq.as_str()) {
                continue;
            }
            let from = index[prereq.as_str()];
            dependents[from].push(idx);
            indegree[idx] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());
    while let Some(idx) = queue.pop_front() {
        order.push(idx);
        for &next in &dependents[idx] {
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != nodes.len() {
        let stuck: Vec<bool> = indegree.iter().map(|&d| d > 0).collect();
        let members = cycle_members(&stuck, &dependents);
        return Err(BlueprintError::Cycle(
            members.into_iter().map(|i| nodes[i].id.clone()).collect(),
        ));
    }

    Ok(order)
}

/// Nodes Kahn's algorithm could not order are either on a cycle or merely downstream
/// of one. Peeling stuck nodes with no stuck dependents leaves the cycle members.
fn cycle_members(stuck: &[bool], dependents: &[Vec<usize>]) -> Vec<usize> {
    let mut outdegree = vec![0usize; stuck.len()];
    let mut prerequisites: Vec<Vec<usize>> = vec![Vec::new(); stuck.len()];
    for (idx, next) in dependents.iter().enumerate() {
        if !stuck[idx] {
            continue;
        }
        for &dep in next.iter().filter(|&&dep| stuck[dep]) {
            outdegree[idx] += 1;
            prerequisites[dep].push(idx);
        }
    }

    let mut peeled = vec![false; stuck.len()];
    let mut queue: VecDeque<usize> = (0..stuck.len())
        .filter(|&i| stuck[i] && outdegree[i] == 0)
        .collect();
    while let Some(idx) = queue.pop_front() {
        peeled[idx] = true;
        for &prereq in &prerequisites[idx] {
            outdegree[prereq] -= 1;
            if outdegree[prereq] == 0 {
                queue.push_back(prereq);
            }
        }
    }

    (0..stuck.len()).filter(|&i| stuck[i] && !peeled[i]).collect()
}
