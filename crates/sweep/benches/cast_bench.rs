use criterion::{black_box, criterion_group, criterion_main, Criterion};
use glam::Vec3;
use sweep::{
    ColliderCastInput, CollisionFilter, CollisionWorld, DistanceInput, Pose, RigidBody, Shape, World,
};

fn grid_world(side: u32, spacing: f32) -> World {
    let mut bodies = Vec::new();
    for i in 0..side {
        for j in 0..side {
            let position = Vec3::new(i as f32 * spacing, 0.0, j as f32 * spacing);
            let shape = if (i + j) % 2 == 0 {
                Shape::capsule(1.0, 0.5)
            } else {
                Shape::cuboid(Vec3::splat(0.75))
            };
            bodies.push(RigidBody::new(
                u64::from(i * side + j),
                shape,
                Pose::from_position(position),
                CollisionFilter::DEFAULT,
            ));
        }
    }
    World::new(bodies)
}

fn bench_cast_collider(c: &mut Criterion) {
    // 32x32 bodies, the sweep crosses one full row
    let world = grid_world(32, 4.0);
    let input = ColliderCastInput::new(
        Shape::sphere(0.25),
        Vec3::new(-2.0, 0.0, 40.0),
        Vec3::new(130.0, 0.0, 40.0),
    );

    c.bench_function("cast_collider_row", |b| {
        b.iter(|| black_box(world.cast_collider(black_box(&input))))
    });
}

fn bench_calculate_distance(c: &mut Criterion) {
    let world = grid_world(32, 4.0);
    let input = DistanceInput::new(Shape::sphere(1.0), Vec3::new(64.0, 0.0, 64.0), 6.0);

    c.bench_function("calculate_distance_splash", |b| {
        b.iter(|| black_box(world.calculate_distance(black_box(&input))))
    });
}

criterion_group!(benches, bench_cast_collider, bench_calculate_distance);
criterion_main!(benches);
