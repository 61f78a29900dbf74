use crate::blueprint::{NodeBlueprint, PathLayoutParams};

use super::NodeLayout;

/// Angle of a branch coordinate, measured from the start of the path's fan.
pub(super) fn branch_angle(params: &PathLayoutParams, branch: f32) -> f32 {
    let start = params.main_angle - params.angle_spread / 2.0;
    start + branch * params.angle_spread / params.branch_count as f32
}

pub(super) fn depth_radius(params: &PathLayoutParams, depth: f32) -> f32 {
    params.base_radius + params.radius_step * depth
}

pub(super) fn place_node(
    path_id: &str,
    params: &PathLayoutParams,
    node: &NodeBlueprint,
) -> NodeLayout {
    let pinned = node.kind.is_pinned();
    let (x, y) = if pinned {
        (params.center_x, params.center_y)
    } else {
        let angle = branch_angle(params, node.branch);
        let radius = depth_radius(params, node.depth);
        (
            params.center_x + radius * angle.cos(),
            params.center_y + radius * angle.sin(),
        )
    };
    NodeLayout {
        id: node.id.clone(),
        path: path_id.to_string(),
        kind: node.kind,
        x,
        y,
        pinned,
    }
}
