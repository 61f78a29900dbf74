pub mod blueprint;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod pathfind;
mod state;

pub use blueprint::{
    Blueprint, NodeBlueprint, PathBlueprint, PathLayoutParams, load_blueprint, parse_blueprint,
};
#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{Config, EngineConfig, LayoutConfig, load_config};
pub use engine::{PhilosophicalWound, SubscriptionId, TalentTree, TreeSnapshot};
pub use error::{
    BlueprintError, EngineError, EngineResult, InvariantViolation, NotAllocatableReason,
};
pub use ir::{NodeFlags, NodeKind, Point, TalentConnection, TalentNode};
pub use layout::{Layout, compute_layout};
pub use pathfind::{shortest_unlock_path, unlock_route, unlock_route_connections};
