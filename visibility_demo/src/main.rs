//! Visibility Demo
//!
//! Headless run of the visibility engine over a field of moving ships:
//! - Ships with sphere, box and multi-part hulls drift through the world
//! - Point and spot lights scattered around, most of them casting shadows
//! - A camera orbiting the origin
//!
//! Each frame logs how many entities the camera and the shadow passes saw.
//! Pass a `.toml` or `.ron` configuration file as the first argument to
//! override the defaults; `RUST_LOG` overrides its log level.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use scene_visibility::ecs::components::LensFlareComponent;
use scene_visibility::foundation::logging;
use scene_visibility::foundation::math::{utils::deg_to_rad, Quat};
use scene_visibility::prelude::*;

// World layout
const FIELD_SIZE: f32 = 60.0;
const NUM_SHIPS: usize = 200;
const NUM_LIGHTS: usize = 12;
const FRAMES: u64 = 120;

// Motion
const MAX_SHIP_SPEED: f32 = 0.5;
const CAMERA_ORBIT_RADIUS: f32 = 45.0;

struct Ship {
    entity: Entity,
    position: Vec3,
    velocity: Vec3,
}

fn hull(rng: &mut StdRng) -> Result<CollisionShape, Box<dyn std::error::Error>> {
    let size = rng.gen_range(0.5..2.0);
    let shape = match rng.gen_range(0..3) {
        0 => CollisionShape::sphere(Vec3::zeros(), size)?,
        1 => CollisionShape::obb(
            Vec3::zeros(),
            Quat::from_axis_angle(&Vec3::y_axis(), rng.gen_range(0.0..std::f32::consts::TAU)),
            Vec3::new(size, size * 0.4, size * 1.5),
        )?,
        _ => CollisionShape::compound(vec![
            CollisionShape::sphere(Vec3::new(0.0, 0.0, -size), size * 0.6)?,
            CollisionShape::sphere(Vec3::new(0.0, 0.0, size), size * 0.6)?,
            CollisionShape::aabb(Vec3::new(-size, -0.1, -0.2), Vec3::new(size, 0.1, 0.2))?,
        ])?,
    };
    Ok(shape)
}

fn random_point(rng: &mut StdRng) -> Vec3 {
    let half = FIELD_SIZE * 0.5;
    Vec3::new(
        rng.gen_range(-half..half),
        rng.gen_range(-half * 0.25..half * 0.25),
        rng.gen_range(-half..half),
    )
}

fn spawn_ships(world: &mut SceneWorld, rng: &mut StdRng) -> Result<Vec<Ship>, Box<dyn std::error::Error>> {
    let mut ships = Vec::with_capacity(NUM_SHIPS);
    for index in 0..NUM_SHIPS {
        let position = random_point(rng);
        let entity = world.create_node(format!("ship {index}"));
        let spatial = SpatialComponent::new(hull(rng)?).with_transform(Transform::from_position(position));
        world.add_component(entity, spatial);
        
        let renderable = if rng.gen_bool(0.8) {
            RenderableComponent::new()
        } else {
            RenderableComponent::without_shadow()
        };
        world.add_component(entity, renderable);
        
        let velocity = Vec3::new(rng.gen_range(-1.0..1.0), 0.0, rng.gen_range(-1.0..1.0)) * MAX_SHIP_SPEED;
        ships.push(Ship { entity, position, velocity });
    }
    Ok(ships)
}

fn spawn_lights(world: &mut SceneWorld, rng: &mut StdRng) -> Result<(), Box<dyn std::error::Error>> {
    for index in 0..NUM_LIGHTS {
        let position = random_point(rng) + Vec3::new(0.0, 10.0, 0.0);
        let range = rng.gen_range(8.0..20.0);
        let mut light = if index % 3 == 0 {
            LightFactory::spot(position, -Vec3::y(), range, deg_to_rad(35.0))
        } else {
            LightFactory::point(position, range)
        };
        light.cast_shadows = rng.gen_bool(0.75);
        
        let entity = world.create_node(format!("light {index}"));
        world.add_component(entity, SpatialComponent::new(CollisionShape::sphere(position, 0.5)?));
        world.add_component(entity, light);
        
        if index % 4 == 0 {
            let flare = world.create_node(format!("flare {index}"));
            world.add_component(flare, SpatialComponent::new(CollisionShape::sphere(position, 1.0)?));
            world.add_component(flare, LensFlareComponent { intensity: 1.0 });
        }
    }
    Ok(())
}

fn move_ships(world: &mut SceneWorld, ships: &mut [Ship]) {
    let half = FIELD_SIZE * 0.5;
    for ship in ships {
        ship.position += ship.velocity;
        for axis in [0, 2] {
            if ship.position[axis].abs() > half {
                ship.velocity[axis] = -ship.velocity[axis];
            }
        }
        if let Some(spatial) = world.spatial_mut(ship.entity) {
            spatial.set_transform(Transform::from_position(ship.position));
        }
    }
}

fn camera(frame: u64) -> VisibilityView {
    let angle = frame as f32 * 0.05;
    let eye = Vec3::new(angle.cos() * CAMERA_ORBIT_RADIUS, 15.0, angle.sin() * CAMERA_ORBIT_RADIUS);
    let frustum = Frustum::perspective(eye, Vec3::zeros(), Vec3::y(), deg_to_rad(60.0), 16.0 / 9.0, 0.1, 120.0);
    VisibilityView::camera(frustum, eye)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => VisibilityConfig::load_from_file(&path)?,
        None => VisibilityConfig::default(),
    };
    logging::init_with_level(&config.log_level);
    
    let mut engine = VisibilityEngine::new(config)?;
    let mut world = engine.create_world();
    let mut rng = StdRng::seed_from_u64(0x5eed);
    
    let mut ships = spawn_ships(&mut world, &mut rng)?;
    spawn_lights(&mut world, &mut rng)?;
    log::info!("Spawned {} ships and {} lights", ships.len(), NUM_LIGHTS);
    
    for frame in 0..FRAMES {
        if frame > 0 {
            move_ships(&mut world, &mut ships);
        }
        
        engine.begin_frame(&mut world);
        let output = engine.run_frame(&world, &camera(frame));
        
        if frame % 20 == 0 {
            log::info!(
                "Frame {}: camera sees {} renderables, {} lights, {} flares; {} shadow lights with {} casters",
                world.timestamp(),
                output.camera.count(VisibilityGroup::Renderables),
                output.camera.count(VisibilityGroup::Lights),
                output.camera.count(VisibilityGroup::Flares),
                output.shadow_lights.len(),
                output.shadow_casters.count(VisibilityGroup::Renderables),
            );
        }
        engine.end_frame(output);
    }
    
    let stats = engine.arena_stats();
    log::info!(
        "Done: {} entities indexed, arena allocations {}, reuses {}, growths {}",
        world.spatial_index().entity_count(),
        stats.allocations,
        stats.reuses,
        stats.growths
    );
    Ok(())
}
