//! Knowledge-base entity.

use serde::{Deserialize, Serialize};

/// Coarse entity class assigned by upstream named-entity recognition.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EntityKind {
    Person,
    Organization,
    Location,
    Gpe,
    Misc,
    Date,
    Time,
    Money,
    Percent,
    Number,
    /// Sentinel for mentions whose class is unknown.
    #[default]
    None,
}

/// An entity in the knowledge base. Identity is the (name, kind) pair;
/// the struct is an immutable value object used by-value in maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub kind: EntityKind,
}

impl Entity {
    /// Create an entity of unknown kind.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: EntityKind::None,
        }
    }

    pub fn with_kind(name: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{:?}]", self.name, self.kind)
    }
}
