//! Walls and door state

use serde::{Deserialize, Serialize};

use crate::math::Segment;
use super::ids::WallId;

/// Door type of a wall
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorKind {
    #[default]
    None,
    Door,
    Secret,
}

/// Door state of a wall
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DoorState {
    #[default]
    Closed,
    Open,
    Locked,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Wall {
    pub id: WallId,
    pub segment: Segment,
    #[serde(default)]
    pub door: DoorKind,
    #[serde(default)]
    pub state: DoorState,
}

impl Wall {
    /// A plain wall with no door
    pub fn new(id: impl Into<WallId>, segment: Segment) -> Self {
        Self {
            id: id.into(),
            segment,
            door: DoorKind::None,
            state: DoorState::Closed,
        }
    }

    pub fn with_door(mut self, door: DoorKind, state: DoorState) -> Self {
        self.door = door;
        self.state = state;
        self
    }

    /// A door (of any kind) currently standing open
    pub fn is_open_door(&self) -> bool {
        self.door != DoorKind::None && self.state == DoorState::Open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::DVec2;

    fn seg() -> Segment {
        Segment::new(DVec2::ZERO, DVec2::new(100.0, 0.0))
    }

    #[test]
    fn test_open_door_requires_door_kind() {
        let plain = Wall::new("w", seg());
        assert!(!plain.is_open_door());

        // State alone does not make a door
        let odd = Wall::new("w", seg()).with_door(DoorKind::None, DoorState::Open);
        assert!(!odd.is_open_door());

        assert!(Wall::new("w", seg()).with_door(DoorKind::Door, DoorState::Open).is_open_door());
        assert!(Wall::new("w", seg()).with_door(DoorKind::Secret, DoorState::Open).is_open_door());
        assert!(!Wall::new("w", seg()).with_door(DoorKind::Door, DoorState::Locked).is_open_door());
    }
}
