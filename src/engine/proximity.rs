// Nearest-rock distance and edge-triggered collision signalling for the HUD.
// Distance checks only: nothing is pushed apart.

use glam::Vec3;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEdge {
    Entered,
    Exited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityReport {
    /// None when there are no rocks at all
    pub nearest: Option<f32>,
    /// Set only on the tick the collision state changes
    pub edge: Option<CollisionEdge>,
}

pub struct ProximityReporter {
    pub collision_radius: f32,
    colliding: bool,
}

impl ProximityReporter {
    pub fn new(collision_radius: f32) -> Self {
        Self { collision_radius, colliding: false }
    }

    pub fn update(&mut self, position: Vec3, rocks: impl IntoIterator<Item = Vec3>) -> ProximityReport {
        let nearest = rocks
            .into_iter()
            .map(|p| p.distance(position))
            .min_by(f32::total_cmp);

        let colliding = nearest.is_some_and(|d| d < self.collision_radius);
        let edge = match (self.colliding, colliding) {
            (false, true) => Some(CollisionEdge::Entered),
            (true, false) => Some(CollisionEdge::Exited),
            _ => None,
        };
        if let Some(edge) = edge {
            debug!("collision {:?}", edge);
        }
        self.colliding = colliding;

        ProximityReport { nearest, edge }
    }
}
