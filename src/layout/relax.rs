use crate::config::LayoutConfig;

use super::NodeLayout;

const COINCIDENT_EPSILON: f32 = 1e-6;

/// Pushes apart every pair of nodes closer than `min_separation`.
///
/// Runs a fixed number of passes; each pass visits pairs in index order and
/// updates positions in place, so the result depends only on the input order.
/// Cost is quadratic in the node count per pass.
pub(super) fn relax_positions(
    nodes: &mut [NodeLayout],
    min_separation: f32,
    config: &LayoutConfig,
) {
    if nodes.len() < 2 || min_separation <= 0.0 {
        return;
    }
    for _ in 0..config.iterations {
        if !relax_pass(nodes, min_separation, config) {
            break;
        }
    }
}

/// One sweep over all pairs. Returns whether any node moved.
fn relax_pass(nodes: &mut [NodeLayout], min_separation: f32, config: &LayoutConfig) -> bool {
    let mut moved = false;
    for i in 0..nodes.len() {
        for j in (i + 1)..nodes.len() {
            let (a_pinned, b_pinned) = (nodes[i].pinned, nodes[j].pinned);
            if a_pinned && b_pinned {
                continue;
            }
            if (a_pinned || b_pinned) && !config.repel_pinned {
                continue;
            }

            let dx = nodes[j].x - nodes[i].x;
            let dy = nodes[j].y - nodes[i].y;
            let dist = (dx * dx + dy * dy).sqrt();
            if dist >= min_separation {
                continue;
            }

            let (ox, oy) = if dist <= COINCIDENT_EPSILON {
                // No axis to push along; split along x.
                (min_separation * config.push_factor, 0.0)
            } else {
                let push = (min_separation - dist) / dist * config.push_factor;
                (dx * push, dy * push)
            };
            if ox == 0.0 && oy == 0.0 {
                continue;
            }

            if !a_pinned {
                nodes[i].x -= ox;
                nodes[i].y -= oy;
            }
            if !b_pinned {
                nodes[j].x += ox;
                nodes[j].y += oy;
            }
            moved = true;
        }
    }
    moved
}
