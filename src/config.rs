use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Relaxation and hit-testing knobs shared by every path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    /// Fixed number of repulsion passes.
    pub iterations: usize,
    /// Share of the overlap each node in a pair is pushed by.
    pub push_factor: f32,
    /// Also push non-pinned nodes away from pinned (Genesis) nodes; the pinned side never moves.
    pub repel_pinned: bool,
    pub hit_radius: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            push_factor: 0.5,
            repel_pinned: false,
            hit_radius: 24.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Overrides the blueprint's PK budget when set.
    pub total_pk: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub layout: LayoutConfig,
    pub engine: EngineConfig,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let mut config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("parsing config {}", path.display()))?;

    if !config.layout.push_factor.is_finite() || config.layout.push_factor < 0.0 {
        config.layout.push_factor = LayoutConfig::default().push_factor;
    }
    if !config.layout.hit_radius.is_finite() || config.layout.hit_radius < 0.0 {
        config.layout.hit_radius = LayoutConfig::default().hit_radius;
    }

    Ok(config)
}
