use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use heliodon::solar::{position_from_angles, ClockStamp, LightRig, SolarAngles};

fn bench_position_sweep(c: &mut Criterion) {
    let angles: Vec<SolarAngles> = (0..360)
        .map(|a| SolarAngles::new((a % 180) as f32 - 90.0, a as f32))
        .collect();

    c.bench_function("position_from_angles_sweep_360", |b| {
        b.iter(|| {
            let mut acc = glam::Vec3::ZERO;
            for angle in &angles {
                acc += position_from_angles(black_box(*angle), 200.0);
            }
            acc
        });
    });
}

fn bench_rig_position(c: &mut Criterion) {
    let rig = LightRig::default();
    c.bench_function("light_rig_position", |b| {
        b.iter(|| rig.position(black_box(SolarAngles::new(70.0, 180.0))));
    });
}

fn bench_clock_advance_year(c: &mut Criterion) {
    let start = ClockStamp::parse("2024-01-01", "00:00").expect("valid stamp");
    c.bench_function("clock_advance_one_year_30min", |b| {
        b.iter(|| {
            let mut stamp = start;
            for _ in 0..(366 * 48) {
                stamp = stamp.add_minutes(black_box(30));
            }
            stamp
        });
    });
}

criterion_group!(benches, bench_position_sweep, bench_rig_position, bench_clock_advance_year);
criterion_main!(benches);
