use std::collections::BTreeMap;

use crate::ir::{NodeKind, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeLayout {
    pub id: String,
    pub path: String,
    pub kind: NodeKind,
    pub x: f32,
    pub y: f32,
    /// Pinned nodes sit on their path's center and never move during relaxation.
    pub pinned: bool,
}

impl NodeLayout {
    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeLayout {
    pub from: String,
    pub to: String,
    pub points: Vec<(f32, f32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathLayout {
    pub id: String,
    pub center_x: f32,
    pub center_y: f32,
    pub min_separation: f32,
    pub nodes: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub nodes: BTreeMap<String, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub paths: Vec<PathLayout>,
    pub width: f32,
    pub height: f32,
    /// Nodes closer than this radius to a probe point count as hits.
    pub hit_radius: f32,
}
