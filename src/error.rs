use std::fmt;

use thiserror::Error;

/// Authoring defects found while building a tree from blueprint data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlueprintError {
    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("invalid node id: {0:?}")]
    InvalidNodeId(String),

    #[error("node {node} requires unknown node {missing}")]
    DanglingPrerequisite { node: String, missing: String },

    #[error("node {node} is exclusive with unknown node {missing}")]
    DanglingExclusive { node: String, missing: String },

    #[error("node {0} references itself")]
    SelfReference(String),

    #[error("prerequisite cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("node {0} has zero PK cost")]
    ZeroCost(String),

    #[error("genesis node {0} cannot have prerequisites")]
    GenesisWithPrerequisites(String),

    #[error("path {path} has no nodes")]
    EmptyPath { path: String },

    #[error("duplicate path id: {0}")]
    DuplicatePath(String),

    #[error("invalid layout for path {path}: {reason}")]
    InvalidLayout { path: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotAllocatableReason {
    AlreadyAllocated,
    Locked,
    PermanentlyLocked,
}

impl fmt::Display for NotAllocatableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::AlreadyAllocated => "already allocated",
            Self::Locked => "prerequisites not met",
            Self::PermanentlyLocked => "locked by an exclusive choice",
        };
        f.write_str(text)
    }
}

/// Rejected user actions. These are expected outcomes and leave the tree untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("node {id} is not allocatable: {reason}")]
    NotAllocatable {
        id: String,
        reason: NotAllocatableReason,
    },

    #[error("node {0} is not allocated")]
    NotAllocated(String),

    #[error("node {id} costs {cost} PK but only {remaining} PK remain")]
    BudgetExceeded { id: String, cost: u32, remaining: u32 },
}

impl EngineError {
    pub fn not_allocatable(id: impl Into<String>, reason: NotAllocatableReason) -> Self {
        Self::NotAllocatable {
            id: id.into(),
            reason,
        }
    }

    /// Budget failures are a special case of "not allocatable".
    pub fn is_not_allocatable(&self) -> bool {
        matches!(self, Self::NotAllocatable { .. } | Self::BudgetExceeded { .. })
    }
}

/// A broken allocation invariant. Seeing one means the engine itself is wrong.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("spent {spent} PK but allocations cost {expected} PK")]
    SpentMismatch { spent: u32, expected: u32 },

    #[error("spent {spent} PK over budget {total}")]
    OverBudget { spent: u32, total: u32 },

    #[error("allocation order out of sync with the allocated set")]
    OrderOutOfSync,

    #[error("{0} is allocated without its prerequisites")]
    MissingPrerequisites(String),

    #[error("exclusive nodes {0} and {1} are both allocated")]
    ExclusiveBoth(String, String),

    #[error("{0} has stale flags")]
    StaleFlags(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
