mod polar;
mod relax;
pub(crate) mod types;
pub use types::*;
use polar::*;
use relax::*;

use crate::blueprint::Blueprint;
use crate::config::LayoutConfig;
use crate::error::BlueprintError;
use crate::ir::Point;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Turns each path's (branch, depth) declarations into 2D positions.
///
/// Pure function of its input: no randomness, no shared state between paths.
/// The blueprint is validated first, so ids are unique and layout constants usable.
pub fn compute_layout(
    blueprint: &Blueprint,
    config: &LayoutConfig,
) -> Result<Layout, BlueprintError> {
    blueprint.validate()?;

    let mut nodes: BTreeMap<String, NodeLayout> = BTreeMap::new();
    let mut paths = Vec::with_capacity(blueprint.paths.len());

    for path in &blueprint.paths {
        let mut placed: Vec<NodeLayout> = path
            .nodes
            .iter()
            .map(|node| place_node(&path.id, &path.layout, node))
            .collect();
        relax_positions(&mut placed, path.layout.min_separation, config);
        debug!(path = %path.id, nodes = placed.len(), "path laid out");

        paths.push(PathLayout {
            id: path.id.clone(),
            center_x: path.layout.center_x,
            center_y: path.layout.center_y,
            min_separation: path.layout.min_separation,
            nodes: placed.iter().map(|n| n.id.clone()).collect(),
        });
        for node in placed {
            nodes.insert(node.id.clone(), node);
        }
    }

    let mut edges = Vec::new();
    for (_, node) in blueprint.nodes() {
        let mut seen = HashSet::new();
        for prereq in &node.prerequisites {
            if !seen.insert(prereq.as_str()) {
                continue;
            }
            let (Some(from), Some(to)) = (nodes.get(prereq), nodes.get(&node.id)) else {
                continue;
            };
            edges.push(EdgeLayout {
                from: prereq.clone(),
                to: node.id.clone(),
                points: vec![(from.x, from.y), (to.x, to.y)],
            });
        }
    }

    let mut layout = Layout {
        nodes,
        edges,
        paths,
        width: 0.0,
        height: 0.0,
        hit_radius: config.hit_radius,
    };
    if let Some(bounds) = layout.bounds() {
        layout.width = bounds.width();
        layout.height = bounds.height();
    }
    Ok(layout)
}

impl Layout {
    pub fn position(&self, id: &str) -> Option<Point> {
        self.nodes.get(id).map(NodeLayout::point)
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut iter = self.nodes.values();
        let first = iter.next()?;
        let mut bounds = Bounds {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        for node in iter {
            bounds.min_x = bounds.min_x.min(node.x);
            bounds.min_y = bounds.min_y.min(node.y);
            bounds.max_x = bounds.max_x.max(node.x);
            bounds.max_y = bounds.max_y.max(node.y);
        }
        Some(bounds)
    }

    /// Nearest node within `hit_radius` of the probe point.
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&NodeLayout> {
        self.hit_test_within(x, y, self.hit_radius)
    }

    pub fn hit_test_within(&self, x: f32, y: f32, radius: f32) -> Option<&NodeLayout> {
        let probe = Point::new(x, y);
        let mut best: Option<(&NodeLayout, f32)> = None;
        for node in self.nodes.values() {
            let dist = node.point().distance(probe);
            if dist > radius {
                continue;
            }
            match best {
                Some((_, best_dist)) if best_dist <= dist => {}
                _ => best = Some((node, dist)),
            }
        }
        best.map(|(node, _)| node)
    }

    /// Pairs of free nodes on the same path still closer than that path's minimum separation.
    pub fn overlapping_pairs(&self) -> Vec<(String, String)> {
        const SLACK: f32 = 1e-3;
        let mut out = Vec::new();
        for path in &self.paths {
            let members: Vec<&NodeLayout> = path
                .nodes
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .filter(|n| !n.pinned)
                .collect();
            for (i, a) in members.iter().enumerate() {
                for b in &members[i + 1..] {
                    if a.point().distance(b.point()) + SLACK < path.min_separation {
                        out.push((a.id.clone(), b.id.clone()));
                    }
                }
            }
        }
        out
    }
}
