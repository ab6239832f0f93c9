//! Scene-level visibility tests
//!
//! Each test builds a small scene, runs full visibility passes against it
//! and checks the grouped output together with the flags left on the
//! spatial components.

use crate::collision::{BoundingSphere, CollisionShape, Frustum, ShapeError, TestVolume, AABB, MAX_SUB_SHAPES};
use crate::core::config::{SchedulerConfig, TesterConfig};
use crate::ecs::components::{
    LightFactory, RenderableComponent, SpatialComponent, SpatialFlags, VisibilityShapePolicy,
};
use crate::ecs::{Entity, SceneWorld};
use crate::foundation::math::utils::deg_to_rad;
use crate::foundation::math::{Quat, Transform, Vec3};
use crate::spatial::{Octree, OctreeConfig};
use super::*;

fn camera_view() -> VisibilityView {
    let eye = Vec3::new(0.0, 0.0, 10.0);
    let frustum = Frustum::perspective(eye, Vec3::zeros(), Vec3::y(), deg_to_rad(60.0), 16.0 / 9.0, 0.1, 100.0);
    VisibilityView::camera(frustum, eye)
}

fn box_light(center: Vec3, half: f32) -> VisibilityView {
    VisibilityView::light(TestVolume::Aabb(AABB::from_center_extents(center, Vec3::repeat(half))), center)
}

fn add_renderable(world: &mut SceneWorld, shape: CollisionShape) -> Entity {
    let entity = world.create_node("renderable");
    world.add_component(entity, SpatialComponent::new(shape));
    world.add_component(entity, RenderableComponent::new());
    entity
}

fn sphere(center: Vec3, radius: f32) -> CollisionShape {
    CollisionShape::sphere(center, radius).unwrap()
}

fn run(world: &SceneWorld, view: &VisibilityView, test: VisibilityTest, arena: &mut NodeArena) -> VisibilityTestResults {
    VisibilityTester::new(world, view, test, &TesterConfig::default()).run(arena)
}

fn entities(results: &VisibilityTestResults, group: VisibilityGroup) -> Vec<Entity> {
    results.nodes(group).iter().map(|node| node.entity).collect()
}

/// Same groups, same entities, same sub-shapes
fn snapshot(results: &VisibilityTestResults) -> Vec<(VisibilityGroup, Entity, Vec<u8>)> {
    results
        .iter()
        .map(|(group, node)| (group, node.entity, node.sub_shapes.as_slice().to_vec()))
        .collect()
}

#[test]
fn test_sphere_inside_camera_frustum_is_visible() {
    let mut world = SceneWorld::new();
    let entity = add_renderable(&mut world, sphere(Vec3::zeros(), 1.0));
    world.begin_frame();
    world.update();
    
    let mut arena = NodeArena::new();
    let results = run(&world, &camera_view(), VisibilityTest::CAMERA, &mut arena);
    
    let nodes = results.nodes(VisibilityGroup::Renderables);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].entity, entity);
    assert_eq!(nodes[0].sub_shapes.as_slice(), &[0]);
    assert_eq!(results.total_count(), 1);
    
    let flags = world.spatial(entity).unwrap().flags();
    assert!(flags.contains(SpatialFlags::VISIBLE_CAMERA));
    assert!(!flags.contains(SpatialFlags::VISIBLE_LIGHT));
    results.release(&mut arena);
}

#[test]
fn test_box_behind_far_plane_is_culled() {
    let mut world = SceneWorld::new();
    let entity = add_renderable(
        &mut world,
        CollisionShape::aabb(Vec3::new(-1.0, -1.0, -201.0), Vec3::new(1.0, 1.0, -199.0)).unwrap(),
    );
    world.begin_frame();
    world.update();
    let before = world.spatial(entity).unwrap().flags();
    
    let mut arena = NodeArena::new();
    let results = run(&world, &camera_view(), VisibilityTest::CAMERA, &mut arena);
    
    assert!(results.is_empty());
    assert_eq!(world.spatial(entity).unwrap().flags(), before);
    results.release(&mut arena);
}

#[test]
fn test_light_results_merge_in_job_order() {
    let mut world = SceneWorld::new();
    let a = add_renderable(&mut world, sphere(Vec3::new(-20.0, 0.0, 0.0), 0.5));
    let b = add_renderable(&mut world, sphere(Vec3::new(20.0, 0.0, 0.0), 0.5));
    let c = add_renderable(&mut world, sphere(Vec3::new(21.0, 0.0, 0.0), 0.5));
    world.begin_frame();
    world.update();
    
    // Visible counts per light: 1, 0, 2
    let jobs: Vec<_> = [
        box_light(Vec3::new(-20.0, 0.0, 0.0), 2.0),
        box_light(Vec3::new(0.0, 50.0, 0.0), 2.0),
        box_light(Vec3::new(20.0, 0.0, 0.0), 2.0),
    ]
    .into_iter()
    .map(|view| VisibilityJob {
        view,
        test: VisibilityTest::SHADOW_CASTERS,
    })
    .collect();
    
    let scheduler = VisibilityScheduler::new(&SchedulerConfig {
        threads: Some(3),
        ..SchedulerConfig::default()
    })
    .unwrap();
    let settings = TesterConfig::default();
    let mut arena = NodeArena::with_prewarm(8, 4);
    arena.begin_frame(world.timestamp());
    
    let per_light = scheduler.run(&world, &jobs, &settings, &mut arena);
    let counts: Vec<_> = per_light.iter().map(|r| r.count(VisibilityGroup::Renderables)).collect();
    assert_eq!(counts, vec![1, 0, 2]);
    
    let mut merged = VisibilityTestResults::create(&mut arena, &settings.reserve);
    merged.combine_with(&mut arena, per_light);
    assert_eq!(entities(&merged, VisibilityGroup::Renderables), vec![a, b, c]);
    
    for entity in [a, b, c] {
        assert!(world.spatial(entity).unwrap().flags().contains(SpatialFlags::VISIBLE_LIGHT));
    }
    
    merged.release(&mut arena);
    assert_eq!(arena.outstanding(), 0);
    arena.begin_frame(world.begin_frame());
}

#[test]
fn test_shape_update_timestamp_tracks_changes() {
    let mut world = SceneWorld::new();
    let entity = add_renderable(&mut world, sphere(Vec3::zeros(), 1.0));
    let view = camera_view();
    let mut arena = NodeArena::new();
    
    // Frames 1 and 2: created, then left alone
    world.begin_frame();
    world.update();
    world.begin_frame();
    world.update();
    
    // Frame 3: moved
    assert_eq!(world.begin_frame(), 3);
    world
        .spatial_mut(entity)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
    world.update();
    let results = run(&world, &view, VisibilityTest::CAMERA, &mut arena);
    assert_eq!(results.shape_update_timestamp(), 3);
    results.release(&mut arena);
    
    // Frame 4: nothing changed
    world.begin_frame();
    world.update();
    let results = run(&world, &view, VisibilityTest::CAMERA, &mut arena);
    assert_eq!(results.shape_update_timestamp(), 3);
    results.release(&mut arena);
}

#[test]
fn test_repeated_runs_are_identical() {
    let mut world = SceneWorld::new();
    for i in 0..10 {
        let x = i as f32 * 3.0 - 15.0;
        add_renderable(&mut world, sphere(Vec3::new(x, 0.0, -(i as f32)), 1.0));
    }
    let compound = CollisionShape::compound(vec![
        sphere(Vec3::new(0.0, 2.0, 0.0), 0.5),
        sphere(Vec3::new(0.0, 500.0, 0.0), 0.5),
    ])
    .unwrap();
    add_renderable(&mut world, compound);
    world.begin_frame();
    world.update();
    
    let mut arena = NodeArena::new();
    let first = run(&world, &camera_view(), VisibilityTest::CAMERA, &mut arena);
    let second = run(&world, &camera_view(), VisibilityTest::CAMERA, &mut arena);
    
    assert!(!first.is_empty());
    assert_eq!(snapshot(&first), snapshot(&second));
    first.release(&mut arena);
    second.release(&mut arena);
}

#[test]
fn test_combine_is_associative() {
    let mut world = SceneWorld::new();
    let ids: Vec<_> = (0..6)
        .map(|i| add_renderable(&mut world, sphere(Vec3::new(i as f32 * 10.0, 0.0, 0.0), 1.0)))
        .collect();
    world.begin_frame();
    world.update();
    
    let views = [
        box_light(Vec3::new(4.0, 0.0, 0.0), 7.0),
        box_light(Vec3::new(30.0, 0.0, 0.0), 1.0),
        box_light(Vec3::new(44.0, 0.0, 0.0), 7.0),
    ];
    let mut arena = NodeArena::new();
    let batch = |arena: &mut NodeArena| -> Vec<VisibilityTestResults> {
        views.iter().map(|view| run(&world, view, VisibilityTest::RENDERABLES, arena)).collect()
    };
    
    // (a + b) + c
    let mut left = batch(&mut arena).into_iter();
    let (a, b, c) = (left.next().unwrap(), left.next().unwrap(), left.next().unwrap());
    let mut ab = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
    ab.combine_with(&mut arena, [a, b]);
    let mut abc_left = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
    abc_left.combine_with(&mut arena, [ab, c]);
    
    // a + (b + c)
    let mut right = batch(&mut arena).into_iter();
    let (a, b, c) = (right.next().unwrap(), right.next().unwrap(), right.next().unwrap());
    let mut bc = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
    bc.combine_with(&mut arena, [b, c]);
    let mut abc_right = VisibilityTestResults::create(&mut arena, &GroupReserve::default());
    abc_right.combine_with(&mut arena, [a, bc]);
    
    assert_eq!(snapshot(&abc_left), snapshot(&abc_right));
    assert_eq!(entities(&abc_left, VisibilityGroup::Renderables), vec![ids[0], ids[1], ids[3], ids[4], ids[5]]);
    
    abc_left.release(&mut arena);
    abc_right.release(&mut arena);
    assert_eq!(arena.outstanding(), 0);
}

#[test]
fn test_shadow_pass_skips_non_casters() {
    let mut world = SceneWorld::new();
    let caster = add_renderable(&mut world, sphere(Vec3::zeros(), 1.0));
    let receiver = world.create_node("receiver");
    world.add_component(receiver, SpatialComponent::new(sphere(Vec3::new(1.0, 0.0, 0.0), 1.0)));
    world.add_component(receiver, RenderableComponent::without_shadow());
    let lamp = world.create_node("lamp");
    world.add_component(lamp, SpatialComponent::new(sphere(Vec3::new(0.0, 2.0, 0.0), 0.2)));
    world.add_component(lamp, LightFactory::point(Vec3::new(0.0, 2.0, 0.0), 10.0));
    world.begin_frame();
    world.update();
    
    let view = VisibilityView::light(TestVolume::Sphere(BoundingSphere::new(Vec3::zeros(), 10.0)), Vec3::zeros());
    let mut arena = NodeArena::new();
    
    let shadow = run(&world, &view, VisibilityTest::SHADOW_CASTERS, &mut arena);
    assert_eq!(entities(&shadow, VisibilityGroup::Renderables), vec![caster]);
    assert_eq!(shadow.count(VisibilityGroup::Lights), 0);
    shadow.release(&mut arena);
    
    let everything = run(&world, &view, VisibilityTest::CAMERA, &mut arena);
    assert_eq!(everything.count(VisibilityGroup::Renderables), 2);
    assert_eq!(entities(&everything, VisibilityGroup::Lights), vec![lamp]);
    everything.release(&mut arena);
}

#[test]
fn test_compound_sub_shapes_never_overflow_node_record() {
    let spheres = |count: usize| -> Vec<CollisionShape> {
        (0..count).map(|i| sphere(Vec3::new(i as f32, 0.0, 0.0), 0.2)).collect()
    };
    assert_eq!(
        CollisionShape::compound(spheres(MAX_SUB_SHAPES + 1)),
        Err(ShapeError::TooManySubShapes { count: MAX_SUB_SHAPES + 1, max: MAX_SUB_SHAPES })
    );
    
    let mut world = SceneWorld::new();
    let ship = add_renderable(&mut world, CollisionShape::compound(spheres(MAX_SUB_SHAPES)).unwrap());
    world.begin_frame();
    world.update();
    
    let mut arena = NodeArena::new();
    let results = run(&world, &box_light(Vec3::new(7.0, 0.0, 0.0), 10.0), VisibilityTest::RENDERABLES, &mut arena);
    let nodes = results.nodes(VisibilityGroup::Renderables);
    assert_eq!(nodes.len(), 1);
    assert_eq!(nodes[0].entity, ship);
    let expected: Vec<u8> = (0..MAX_SUB_SHAPES as u8).collect();
    assert_eq!(nodes[0].sub_shapes.as_slice(), expected.as_slice());
    results.release(&mut arena);
}

#[test]
fn test_fully_transparent_needs_near_plane_precision() {
    let mut world = SceneWorld::new();
    let glass = world.create_node("glass");
    world.add_component(
        glass,
        SpatialComponent::new(sphere(Vec3::zeros(), 1.0)).with_flags(SpatialFlags::FULLY_TRANSPARENT),
    );
    world.add_component(glass, RenderableComponent::new());
    world.begin_frame();
    world.update();
    
    let mut arena = NodeArena::new();
    let light = box_light(Vec3::zeros(), 5.0);
    let skipped = run(&world, &light, VisibilityTest::RENDERABLES, &mut arena);
    assert!(skipped.is_empty());
    assert_eq!(skipped.shape_update_timestamp(), 0);
    skipped.release(&mut arena);
    
    let precise = light.with_near_plane_precision(true);
    let tested = run(&world, &precise, VisibilityTest::RENDERABLES, &mut arena);
    assert_eq!(entities(&tested, VisibilityGroup::Renderables), vec![glass]);
    assert_eq!(tested.shape_update_timestamp(), 1);
    tested.release(&mut arena);
}

#[test]
fn test_shape_policy_changes_precision() {
    let mut world = SceneWorld::new();
    let rotated = CollisionShape::obb(
        Vec3::zeros(),
        Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4),
        Vec3::repeat(1.0),
    )
    .unwrap();
    let entity = add_renderable(&mut world, rotated);
    world.begin_frame();
    world.update();
    
    // Inside the diamond's bounding box, far from the diamond itself
    let corner_view = VisibilityView::light(
        TestVolume::Sphere(BoundingSphere::new(Vec3::new(1.3, 1.3, 0.0), 0.1)),
        Vec3::zeros(),
    );
    let mut arena = NodeArena::new();
    
    for (policy, visible) in [
        (VisibilityShapePolicy::SpheresExact, true),
        (VisibilityShapePolicy::BoundsOnly, true),
        (VisibilityShapePolicy::Exact, false),
    ] {
        let settings = TesterConfig {
            shape_policy: policy,
            ..TesterConfig::default()
        };
        let results = VisibilityTester::new(&world, &corner_view, VisibilityTest::RENDERABLES, &settings).run(&mut arena);
        assert_eq!(entities(&results, VisibilityGroup::Renderables) == vec![entity], visible, "{policy:?}");
        results.release(&mut arena);
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let mut world = SceneWorld::new();
    for i in 0..40 {
        let angle = i as f32 * 0.7;
        let shape = sphere(Vec3::new(angle.cos() * 15.0, (i % 7) as f32 - 3.0, angle.sin() * 15.0), 1.0);
        add_renderable(&mut world, shape);
    }
    world.begin_frame();
    world.update();
    
    let jobs: Vec<_> = (0..6)
        .map(|i| {
            let angle = i as f32;
            let light = LightFactory::point(Vec3::new(angle.cos() * 12.0, 0.0, angle.sin() * 12.0), 8.0);
            VisibilityJob {
                view: VisibilityView::for_light(&light),
                test: VisibilityTest::SHADOW_CASTERS,
            }
        })
        .collect();
    let settings = TesterConfig::default();
    let mut arena = NodeArena::new();
    
    let parallel = VisibilityScheduler::new(&SchedulerConfig {
        threads: Some(4),
        ..SchedulerConfig::default()
    })
    .unwrap();
    let fork_join = parallel.run(&world, &jobs, &settings, &mut arena);
    let sequential = VisibilityScheduler::sequential().run(&world, &jobs, &settings, &mut arena);
    
    assert_eq!(fork_join.len(), sequential.len());
    for (a, b) in fork_join.iter().zip(&sequential) {
        assert_eq!(snapshot(a), snapshot(b));
    }
    assert!(fork_join.iter().any(|results| !results.is_empty()));
    
    for results in fork_join.into_iter().chain(sequential) {
        results.release(&mut arena);
    }
    assert_eq!(arena.outstanding(), 0);
}

#[test]
fn test_light_views_find_every_candidate_through_index() {
    let config = OctreeConfig {
        max_entities_per_node: 2,
        max_depth: 6,
        min_node_size: 0.5,
    };
    let bounds = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(64.0));
    let mut world = SceneWorld::with_spatial_index(Octree::new(bounds, config));
    let ids: Vec<_> = (0..60)
        .map(|i| add_renderable(&mut world, sphere(Vec3::zeros(), 0.5 + (i % 3) as f32)))
        .collect();
    let place = |i: usize, frame: usize| -> Vec3 {
        if i == 0 {
            // Beyond the index bounds
            return Vec3::new(100.0 + frame as f32, 0.0, 0.0);
        }
        let angle = (i * 7 + frame * 3) as f32 * 0.37;
        Vec3::new(
            angle.cos() * (i % 40) as f32,
            ((i * frame) % 11) as f32 - 5.0,
            angle.sin() * 30.0,
        )
    };
    let regions = [
        (Vec3::zeros(), 10.0),
        (Vec3::new(20.0, 0.0, 0.0), 15.0),
        (Vec3::new(-30.0, 3.0, 10.0), 6.0),
        (Vec3::new(100.0, 0.0, 0.0), 5.0),
    ];
    let mut arena = NodeArena::new();
    
    for frame in 0..4 {
        world.begin_frame();
        for (i, &entity) in ids.iter().enumerate() {
            world.spatial_mut(entity).unwrap().set_transform(Transform::from_position(place(i, frame)));
        }
        world.update();
        
        for (center, radius) in regions {
            let sphere_region = BoundingSphere::new(center, radius);
            let box_region = AABB::from_center_extents(center, Vec3::repeat(radius));
            let views = [
                VisibilityView::light(TestVolume::Sphere(sphere_region), center),
                VisibilityView::light(TestVolume::Aabb(box_region), center),
            ];
            for view in &views {
                let results = run(&world, view, VisibilityTest::RENDERABLES, &mut arena);
                let mut found = entities(&results, VisibilityGroup::Renderables);
                found.sort();
                results.release(&mut arena);
                
                let mut expected: Vec<Entity> = world
                    .iter_spatials()
                    .filter(|entry| match (entry.spatial.collision_shape(), &view.volume) {
                        (CollisionShape::Sphere(shape), TestVolume::Sphere(region)) => shape.intersects(region),
                        (CollisionShape::Sphere(shape), TestVolume::Aabb(region)) => region.intersects_sphere(shape),
                        _ => unreachable!(),
                    })
                    .map(|entry| entry.entity)
                    .collect();
                expected.sort();
                
                assert_eq!(found, expected, "frame {frame}, region {center:?} r{radius}");
            }
        }
    }
    assert_eq!(arena.outstanding(), 0);
}

#[test]
fn test_light_timestamp_covers_shapes_within_reach() {
    let mut world = SceneWorld::new();
    let near = add_renderable(&mut world, sphere(Vec3::zeros(), 1.0));
    let far = add_renderable(&mut world, sphere(Vec3::new(200.0, 0.0, 0.0), 1.0));
    world.begin_frame();
    world.update();
    
    let light = VisibilityView::light(TestVolume::Sphere(BoundingSphere::new(Vec3::zeros(), 5.0)), Vec3::zeros());
    let mut arena = NodeArena::new();
    
    // Frame 2: a shape moves without ever coming within reach
    world.begin_frame();
    world
        .spatial_mut(far)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(10.0, 0.0, 0.0)));
    world.update();
    
    let results = run(&world, &light, VisibilityTest::RENDERABLES, &mut arena);
    assert_eq!(entities(&results, VisibilityGroup::Renderables), vec![near]);
    assert_eq!(results.shape_update_timestamp(), 1);
    results.release(&mut arena);
    
    // The camera walks every spatial and sees the change
    let results = run(&world, &camera_view(), VisibilityTest::RENDERABLES, &mut arena);
    assert_eq!(results.shape_update_timestamp(), 2);
    results.release(&mut arena);
    
    // Frame 3: the lit shape leaves; the light's view changed
    assert_eq!(world.begin_frame(), 3);
    world
        .spatial_mut(near)
        .unwrap()
        .set_transform(Transform::from_position(Vec3::new(100.0, 0.0, 0.0)));
    world.update();
    
    let results = run(&world, &light, VisibilityTest::RENDERABLES, &mut arena);
    assert!(results.is_empty());
    assert_eq!(results.shape_update_timestamp(), 3);
    results.release(&mut arena);
    
    // Frame 4: nothing moved
    world.begin_frame();
    world.update();
    let results = run(&world, &light, VisibilityTest::RENDERABLES, &mut arena);
    assert_eq!(results.shape_update_timestamp(), 0);
    results.release(&mut arena);
}
