//! Slot and unit identities shared across slotswap crates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two fixed deployment slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotName {
    A,
    B,
}

impl SlotName {
    /// Lowercase label used in unit names (`api-a`, `api-b`).
    pub fn label(&self) -> &'static str {
        match self {
            SlotName::A => "a",
            SlotName::B => "b",
        }
    }

    /// The other slot.
    pub fn other(&self) -> SlotName {
        match self {
            SlotName::A => SlotName::B,
            SlotName::B => SlotName::A,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotName::A => f.write_str("A"),
            SlotName::B => f.write_str("B"),
        }
    }
}

/// A deployment slot: an immutable `(name, port)` identity.
///
/// Slots are never created or destroyed, only occupied by different
/// runtime units over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub name: SlotName,
    pub port: u16,
}

impl Slot {
    /// Upstream dial address for this slot (`host:port`).
    pub fn dial_address(&self, host: &str) -> String {
        format!("{host}:{}", self.port)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (:{})", self.name, self.port)
    }
}

/// The two slots of a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPair {
    pub a: Slot,
    pub b: Slot,
}

impl SlotPair {
    /// Build the pair from the two configured ports.
    pub fn new(port_a: u16, port_b: u16) -> Self {
        Self {
            a: Slot {
                name: SlotName::A,
                port: port_a,
            },
            b: Slot {
                name: SlotName::B,
                port: port_b,
            },
        }
    }

    /// Look a slot up by name.
    pub fn get(&self, name: SlotName) -> Slot {
        match name {
            SlotName::A => self.a,
            SlotName::B => self.b,
        }
    }

    /// The slot bound to `port`, if any.
    pub fn by_port(&self, port: u16) -> Option<Slot> {
        if port == self.a.port {
            Some(self.a)
        } else if port == self.b.port {
            Some(self.b)
        } else {
            None
        }
    }

    /// The slot that is not bound to `port`.
    pub fn opposite(&self, port: u16) -> Option<Slot> {
        self.by_port(port).map(|slot| self.get(slot.name.other()))
    }

    pub fn iter(&self) -> impl Iterator<Item = Slot> {
        [self.a, self.b].into_iter()
    }
}

/// Name of a runtime unit (a container or process).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitName(pub String);

impl UnitName {
    /// Unit name for a slot: `{service}-{a|b}`.
    pub fn for_slot(service: &str, slot: SlotName) -> Self {
        Self(format!("{service}-{}", slot.label()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque, addressable build identifier (e.g. an image reference).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactRef(pub String);

impl ArtifactRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
