use std::cell::RefCell;
use std::rc::Rc;

use space_physics::*;

fn no_bounce() -> Material {
    Material {
        restitution: 0.0,
        ..Material::default()
    }
}

const DT: f64 = 1.0 / 60.0;

fn weightless_world() -> PhysicsWorld {
    PhysicsWorld::rapier(WorldConfig::default().with_gravity(Vec3::ZERO)).expect("valid config")
}

fn spawn(
    world: &mut PhysicsWorld,
    scene: &mut TransformStore,
    component: u64,
    desc: RigidBodyDesc,
    position: Vec3,
) -> (BodyId, ColliderId) {
    let component = ComponentId(component);
    scene.insert(component, Transform::from_position(position));
    let body = world
        .create_rigid_body(&desc, component, &*scene)
        .expect("body created");
    let collider = world.body(body).expect("body exists").colliders()[0];
    (body, collider)
}

#[test]
fn falling_ball_lands_and_rests_on_the_floor() {
    let mut world = PhysicsWorld::rapier(WorldConfig::default()).expect("default config is valid");
    let mut scene = TransformStore::new();

    spawn(
        &mut world,
        &mut scene,
        1,
        RigidBodyDesc::fixed().with_collider(
            ColliderDesc::builder()
                .cube(Vec3::new(10.0, 0.5, 10.0))
                .material(no_bounce())
                .build(),
        ),
        Vec3::ZERO,
    );
    let (_, ball) = spawn(
        &mut world,
        &mut scene,
        2,
        RigidBodyDesc::dynamic().with_collider(
            ColliderDesc::builder()
                .sphere(0.5)
                .material(no_bounce())
                .build(),
        ),
        Vec3::new(0.0, 3.0, 0.0),
    );

    let log: Rc<RefCell<Vec<EventKind>>> = Rc::default();
    for kind in [
        EventKind::CollisionEnter,
        EventKind::CollisionStay,
        EventKind::CollisionExit,
    ] {
        let log = Rc::clone(&log);
        world
            .add_listener(ball, kind, move |_, _| {
                log.borrow_mut().push(kind);
                Ok(())
            })
            .unwrap();
    }

    for _ in 0..180 {
        world.advance(DT, &mut scene);
    }

    let log = log.borrow();
    assert_eq!(log.first(), Some(&EventKind::CollisionEnter));
    assert_eq!(log.last(), Some(&EventKind::CollisionStay), "{log:?}");

    let rest = scene.get(ComponentId(2)).unwrap().position.y;
    assert!((0.85..=1.05).contains(&rest), "ball rests at {rest}");
}

#[test]
fn sensor_overlap_reports_enter_and_exit() {
    let mut world = weightless_world();
    let mut scene = TransformStore::new();

    let (_, zone) = spawn(
        &mut world,
        &mut scene,
        1,
        RigidBodyDesc::fixed().with_collider(
            ColliderDesc::builder()
                .cube(Vec3::ONE)
                .sensor(true)
                .build(),
        ),
        Vec3::ZERO,
    );
    let (mover, _) = spawn(
        &mut world,
        &mut scene,
        2,
        RigidBodyDesc::kinematic().with_collider(ColliderDesc::builder().sphere(0.25).build()),
        Vec3::new(-3.0, 0.0, 0.0),
    );

    let log: Rc<RefCell<Vec<EventKind>>> = Rc::default();
    for kind in [EventKind::SensorEnter, EventKind::SensorExit] {
        let log = Rc::clone(&log);
        world
            .add_listener(zone, kind, move |_, _| {
                log.borrow_mut().push(kind);
                Ok(())
            })
            .unwrap();
    }

    for x in [-3.0, 0.0, 0.0, 0.0, 3.0, 3.0, 3.0] {
        scene.insert(ComponentId(2), Transform::from_position(Vec3::new(x, 0.0, 0.0)));
        world.advance(DT + 1e-6, &mut scene);
    }

    assert!(world.body(mover).unwrap().is_externally_driven());
    assert_eq!(
        *log.borrow(),
        vec![EventKind::SensorEnter, EventKind::SensorExit]
    );
}

#[test]
fn raycast_returns_the_nearest_accepted_hit() {
    let mut world = weightless_world();
    let mut scene = TransformStore::new();

    let (near_body, near) = spawn(
        &mut world,
        &mut scene,
        1,
        RigidBodyDesc::fixed().with_collider(ColliderDesc::builder().sphere(0.5).filter(0b10, u32::MAX).build()),
        Vec3::new(0.0, 0.0, 5.0),
    );
    let (_, far) = spawn(
        &mut world,
        &mut scene,
        2,
        RigidBodyDesc::fixed().with_collider(ColliderDesc::builder().cube(Vec3::splat(0.5)).build()),
        Vec3::new(0.0, 0.0, 10.0),
    );
    let (_, trigger) = spawn(
        &mut world,
        &mut scene,
        3,
        RigidBodyDesc::fixed().with_collider(ColliderDesc::builder().sphere(0.5).sensor(true).build()),
        Vec3::new(0.0, 0.0, 2.0),
    );

    // Queries read the broad phase as of the last step.
    world.advance(DT, &mut scene);

    let query = RaycastQuery::new(Vec3::ZERO, Vec3::Z, 100.0);
    let hit = world.raycast(&query).expect("hit");
    assert_eq!(hit.collider, near);
    assert_eq!(hit.body, near_body);
    assert_eq!(hit.component, ComponentId(1));
    assert!((hit.distance - 4.5).abs() < 1e-4);
    assert!((hit.normal - -Vec3::Z).length() < 1e-4);

    let with_sensors = world.raycast(&query.with_sensors(true)).expect("hit");
    assert_eq!(with_sensors.collider, trigger);

    let masked = world
        .raycast(&query.with_filter(CollisionFilter::new(u32::MAX, 0b01)))
        .expect("hit");
    assert_eq!(masked.collider, far);
    assert!((masked.distance - 9.5).abs() < 1e-4);

    let skipped = world
        .raycast_with_filter(&query, |body, _| body != near_body)
        .expect("hit");
    assert_eq!(skipped.collider, far);

    assert!(world
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::Z, 3.0))
        .is_none());
}

#[test]
fn mesh_colliders_are_hit_only_inside_their_triangles() {
    let mut world = weightless_world();
    let mut scene = TransformStore::new();
    let (ground, _) = spawn(
        &mut world,
        &mut scene,
        1,
        RigidBodyDesc::fixed().with_collider(
            ColliderDesc::builder()
                .shape(ColliderShape::Mesh {
                    vertices: vec![Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0)],
                    indices: vec![[0, 1, 2]],
                })
                .build(),
        ),
        Vec3::ZERO,
    );
    world.advance(DT, &mut scene);

    let down = |x: f32, y: f32| RaycastQuery::new(Vec3::new(x, y, 5.0), Vec3::NEG_Z, 100.0);
    assert!(world.raycast(&down(8.0, 8.0)).is_none());
    assert!(world.raycast(&down(-5.0, -5.0)).is_none());

    let hit = world.raycast(&down(1.0, 2.0)).expect("inside the triangle");
    assert_eq!(hit.body, ground);
    assert!((hit.point - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-4);
}
