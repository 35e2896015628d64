// Scene setup and world queries shared by the controller and the renderer

use bevy_ecs::prelude::*;
use glam::Vec3;
use log::info;

use super::camera::CameraRig;
use super::components::{OreDeposit, Player, Tint, Transform};
use super::config::ControllerConfig;

/// Rock layout used when the config lists no resources.
pub const DEFAULT_LAYOUT: [(Vec3, u32); 3] = [
    (Vec3::new(5.0, 0.0, 5.0), 10),
    (Vec3::new(-5.0, 0.0, -5.0), 10),
    (Vec3::new(5.0, 0.0, -5.0), 10),
];

pub const ROCK_TINT: u32 = 0x7a7a8c;

/// Read-only view of one minable rock, as handed to the interaction and
/// proximity logic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceNode {
    pub entity: Entity,
    pub position: Vec3,
    pub remaining: u32,
}

/// Spawn the player and the rocks, and install the camera rig. Returns the player.
pub fn spawn_scene(world: &mut World, config: &ControllerConfig) -> Entity {
    world.insert_resource(CameraRig::default());
    let player = world.spawn((Transform::default(), Player)).id();

    let layout: Vec<(Vec3, u32)> = if config.resources.is_empty() {
        DEFAULT_LAYOUT.to_vec()
    } else {
        config.resources.iter().map(|r| (r.position, r.ore)).collect()
    };
    for &(position, ore) in &layout {
        spawn_rock(world, position, ore);
    }

    info!("Spawned player and {} rocks", layout.len());
    player
}

pub fn spawn_rock(world: &mut World, position: Vec3, ore: u32) -> Entity {
    world
        .spawn((
            Transform::from_position(position),
            OreDeposit::new(ore),
            Tint::from_hex(ROCK_TINT),
        ))
        .id()
}

/// The controlled character, if it has been spawned yet.
pub fn player_transform(world: &mut World) -> Option<(Entity, Transform)> {
    let mut query = world.query_filtered::<(Entity, &Transform), With<Player>>();
    query.get_single(world).ok().map(|(entity, t)| (entity, *t))
}

/// All rocks in spawn order, depleted ones included.
pub fn resource_nodes(world: &mut World) -> Vec<ResourceNode> {
    let mut query = world.query::<(Entity, &Transform, &OreDeposit)>();
    let mut nodes: Vec<ResourceNode> = query
        .iter(world)
        .map(|(entity, t, ore)| ResourceNode {
            entity,
            position: t.position,
            remaining: ore.remaining,
        })
        .collect();
    nodes.sort_by_key(|n| n.entity);
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::config::ResourceSpec;

    #[test]
    fn default_scene_has_three_full_rocks() {
        let mut world = World::new();
        let player = spawn_scene(&mut world, &ControllerConfig::default());

        let (found, t) = player_transform(&mut world).unwrap();
        assert_eq!(found, player);
        assert_eq!(t.position, Vec3::ZERO);

        let nodes = resource_nodes(&mut world);
        let positions: Vec<Vec3> = nodes.iter().map(|n| n.position).collect();
        assert_eq!(positions, DEFAULT_LAYOUT.iter().map(|(p, _)| *p).collect::<Vec<_>>());
        assert!(nodes.iter().all(|n| n.remaining == 10));
        assert!(world.get_resource::<CameraRig>().is_some());
    }

    #[test]
    fn config_resources_replace_default_layout() {
        let mut config = ControllerConfig::default();
        config.resources.push(ResourceSpec { position: Vec3::new(1.0, 0.0, 1.0), ore: 2 });
        let mut world = World::new();
        spawn_scene(&mut world, &config);
        let nodes = resource_nodes(&mut world);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].remaining, 2);
    }

    #[test]
    fn no_player_before_spawn() {
        let mut world = World::new();
        assert!(player_transform(&mut world).is_none());
        assert!(resource_nodes(&mut world).is_empty());
    }
}
