use glam::Vec2;
use planeworks_common::{ObjectId, WorldObject};
use serde::{Deserialize, Serialize};

/// An object living in a [`World`](crate::World).
///
/// Position is read-only from outside the world: moves go through
/// [`World::move_object`](crate::World::move_object) so that crossing into or
/// out of a visible cell can be flagged immediately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameObject {
    id: ObjectId,
    pub name: String,
    position: Vec2,
    /// World pixels per tick.
    pub velocity: Vec2,
}

impl GameObject {
    pub fn new(name: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: ObjectId::new(),
            name: name.into(),
            position,
            velocity: Vec2::ZERO,
        }
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }
}

impl WorldObject for GameObject {
    fn id(&self) -> ObjectId {
        self.id
    }

    fn position(&self) -> Vec2 {
        self.position
    }
}
