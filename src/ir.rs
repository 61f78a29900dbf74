use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Genesis,
    Keystone,
    Manifestation,
    Axiom,
    Capstone,
    GnosticRite,
    Schism,
    Synthesis,
    Bridge,
    Minor,
}

impl NodeKind {
    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "genesis" => Some(Self::Genesis),
            "keystone" => Some(Self::Keystone),
            "manifestation" => Some(Self::Manifestation),
            "axiom" => Some(Self::Axiom),
            "capstone" => Some(Self::Capstone),
            "gnosticrite" | "gnostic_rite" | "gnostic-rite" => Some(Self::GnosticRite),
            "schism" => Some(Self::Schism),
            "synthesis" => Some(Self::Synthesis),
            "bridge" => Some(Self::Bridge),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }

    /// Kinds reported by the unlock path finder.
    pub fn is_major(self) -> bool {
        matches!(
            self,
            Self::Genesis
                | Self::Keystone
                | Self::Manifestation
                | Self::Axiom
                | Self::Capstone
                | Self::Synthesis
                | Self::Schism
        )
    }

    /// Minor nodes are leaves: a dependent never waits on them.
    pub fn gates_progression(self) -> bool {
        !matches!(self, Self::Minor)
    }

    pub fn is_pinned(self) -> bool {
        matches!(self, Self::Genesis)
    }
}

impl<'de> Deserialize<'de> for NodeKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        NodeKind::from_token(&token)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown node kind: {token}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Flags derived from the allocation set. Only the state resolver writes these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeFlags {
    pub is_allocated: bool,
    pub is_locked: bool,
    pub is_allocatable: bool,
    pub is_permanently_locked: bool,
    pub is_visible: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            is_allocated: false,
            is_locked: true,
            is_allocatable: false,
            is_permanently_locked: false,
            is_visible: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TalentNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub path: String,
    pub prerequisites: Vec<String>,
    pub exclusive_with: Vec<String>,
    pub pk_cost: u32,
    /// Wound text recorded when a Schism node is allocated.
    pub penalty: Option<String>,
    pub(crate) position: Option<Point>,
    pub(crate) flags: NodeFlags,
}

impl TalentNode {
    pub fn position(&self) -> Option<Point> {
        self.position
    }

    pub fn flags(&self) -> NodeFlags {
        self.flags
    }

    pub fn is_allocated(&self) -> bool {
        self.flags.is_allocated
    }

    pub fn is_locked(&self) -> bool {
        self.flags.is_locked
    }

    pub fn is_allocatable(&self) -> bool {
        self.flags.is_allocatable
    }

    pub fn is_permanently_locked(&self) -> bool {
        self.flags.is_permanently_locked
    }

    pub fn is_visible(&self) -> bool {
        self.flags.is_visible
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionFlags {
    pub is_active: bool,
    pub is_locked: bool,
}

/// Prerequisite edge, pointing from the prerequisite to its dependent.
#[derive(Debug, Clone)]
pub struct TalentConnection {
    pub from: String,
    pub to: String,
    pub(crate) flags: ConnectionFlags,
}

impl TalentConnection {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            flags: ConnectionFlags {
                is_active: false,
                is_locked: true,
            },
        }
    }

    pub fn flags(&self) -> ConnectionFlags {
        self.flags
    }

    pub fn is_active(&self) -> bool {
        self.flags.is_active
    }

    pub fn is_locked(&self) -> bool {
        self.flags.is_locked
    }
}
