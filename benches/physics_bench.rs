use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use space_physics::*;
use std::hint::black_box;

const DT: f64 = 1.0 / 60.0;

/// Floor plus a column of balls, every ball listening for collisions.
fn prepare_world(body_count: usize) -> (PhysicsWorld, TransformStore) {
    let mut world = PhysicsWorld::rapier(WorldConfig::default()).expect("valid config");
    let mut scene = TransformStore::new();

    let floor = ComponentId(0);
    scene.insert(floor, Transform::default());
    world
        .create_rigid_body(
            &RigidBodyDesc::fixed()
                .with_collider(ColliderDesc::builder().cube(Vec3::new(50.0, 0.5, 50.0)).build()),
            floor,
            &scene,
        )
        .expect("floor");

    for i in 0..body_count {
        let component = ComponentId(i as u64 + 1);
        let position = Vec3::new((i % 16) as f32 * 1.5, 1.0 + (i / 16) as f32 * 1.2, 0.0);
        scene.insert(component, Transform::from_position(position));
        let body = world
            .create_rigid_body(
                &RigidBodyDesc::dynamic().with_collider(ColliderDesc::builder().sphere(0.5).build()),
                component,
                &scene,
            )
            .expect("ball");
        let collider = world.body(body).expect("ball exists").colliders()[0];
        world
            .add_listener(collider, EventKind::CollisionStay, |event, _| {
                black_box(event.frame());
                Ok(())
            })
            .expect("listener");
    }
    (world, scene)
}

fn bench_world_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_advance");
    for &count in &[64usize, 256, 1024] {
        group.bench_with_input(BenchmarkId::new("balls", count), &count, |b, &count| {
            let (mut world, mut scene) = prepare_world(count);
            b.iter(|| black_box(world.advance(black_box(DT), &mut scene)))
        });
    }
    group.finish();
}

fn bench_raycast(c: &mut Criterion) {
    let (mut world, mut scene) = prepare_world(256);
    world.advance(DT, &mut scene);
    let query = RaycastQuery::new(Vec3::new(-5.0, 1.0, 0.0), Vec3::X, 100.0);
    c.bench_function("raycast_256", |b| b.iter(|| black_box(world.raycast(&query))));
}

criterion_group!(benches, bench_world_advance, bench_raycast);
criterion_main!(benches);
