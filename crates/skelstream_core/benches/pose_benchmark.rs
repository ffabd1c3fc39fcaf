//! # Pose Write Benchmark
//!
//! Measures the per-tick hot path:
//! 1. `write_frame_to_buffer` for the procedural and clip animators
//! 2. `Player::update` end to end
//!
//! Target: well under 1% of a 33 ms frame budget at 50 bones.

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::{Mat4, Quat, Vec3};
use skelstream_core::{Animator, BoneTransform, ClipAnimator, MotionClip, Player, ProceduralAnimator, Skeleton};

fn bench_procedural_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("procedural_write");

    for bones in [16, 50, 200] {
        let mut animator = ProceduralAnimator::new(bones);
        animator.initialize("procedural").expect("procedural source");
        let mut buffer = vec![0u8; animator.get_memory_size()];

        group.throughput(Throughput::Bytes(buffer.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bones), &bones, |b, _| {
            b.iter(|| {
                animator
                    .write_frame_to_buffer(black_box(&mut buffer), 0, 1.0 / 30.0)
                    .expect("buffer sized from animator");
            });
        });
    }

    group.finish();
}

fn rotating_clip(bones: usize, frames: usize) -> Arc<MotionClip> {
    let keyframes = (0..frames)
        .flat_map(|f| {
            (0..bones).map(move |b| {
                let angle = (f * bones + b) as f32 * 0.01;
                BoneTransform::from(Mat4::from_rotation_translation(
                    Quat::from_rotation_y(angle),
                    Vec3::new(b as f32, 0.0, 0.0),
                ))
            })
        })
        .collect();
    Arc::new(MotionClip::new("bench", Skeleton::flat(bones), 1.0 / 120.0, keyframes).expect("valid clip"))
}

fn bench_clip_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("clip_write");

    for bones in [16, 50, 200] {
        let mut animator = ClipAnimator::from_clip(rotating_clip(bones, 240));
        let mut buffer = vec![0u8; animator.get_memory_size()];

        group.throughput(Throughput::Bytes(buffer.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(bones), &bones, |b, _| {
            b.iter(|| {
                animator
                    .write_frame_to_buffer(black_box(&mut buffer), 0, 1.0 / 30.0)
                    .expect("buffer sized from animator");
            });
        });
    }

    group.finish();
}

fn bench_player_update(c: &mut Criterion) {
    let mut animator = ProceduralAnimator::new(50);
    animator.initialize("procedural").expect("procedural source");
    let mut player = Player::new(animator).expect("initialized animator");
    player.play();

    c.bench_function("player_update_50_bones", |b| {
        b.iter(|| {
            player.update(black_box(1.0 / 30.0)).expect("frame write");
            black_box(player.current_pose_bytes());
        });
    });
}

criterion_group!(benches, bench_procedural_write, bench_clip_write, bench_player_update);
criterion_main!(benches);
