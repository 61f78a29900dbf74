use crate::engine::{TalentTree, TreeSnapshot};
use crate::layout::Layout;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub paths: Vec<PathDump>,
    pub edges: Vec<EdgeDump>,
    pub tree: TreeSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_path: Option<UnlockPathDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathDump {
    pub id: String,
    pub name: String,
    pub center: [f32; 2],
    pub nodes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub from: String,
    pub to: String,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockPathDump {
    pub target: String,
    pub major_nodes: Vec<String>,
    pub connections: Vec<[String; 2]>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout, tree: &TalentTree) -> Self {
        let paths = layout
            .paths
            .iter()
            .map(|path| PathDump {
                id: path.id.clone(),
                name: tree.path_name(&path.id).unwrap_or(&path.id).to_string(),
                center: [path.center_x, path.center_y],
                nodes: path.nodes.clone(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.clone(),
                to: edge.to.clone(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            paths,
            edges,
            tree: tree.snapshot(),
            unlock_path: None,
        }
    }

    pub fn with_unlock_path(mut self, tree: &TalentTree, target: &str) -> Self {
        self.unlock_path = Some(UnlockPathDump {
            target: target.to_string(),
            major_nodes: crate::pathfind::shortest_unlock_path(tree, target),
            connections: crate::pathfind::unlock_route_connections(tree, target)
                .into_iter()
                .map(|(from, to)| [from, to])
                .collect(),
        });
        self
    }
}

pub fn write_layout_dump(path: Option<&Path>, dump: &LayoutDump) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), dump)?;
            println!();
        }
    }
    Ok(())
}
