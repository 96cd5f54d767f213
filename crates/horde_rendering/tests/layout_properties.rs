//! Property tests for window layout, writer splitting and packed transforms.

use std::collections::HashMap;

use glam::{Vec3, Vec4Swizzles};
use horde_core::{Animation, Position};
use horde_rendering::instancing::{round_up_to_word, AttributeKind, BufferMode, EXTRA_BYTES};
use horde_rendering::kernels::math::unpack;
use horde_rendering::kernels::{fill_sprites, InstanceTransform};
use horde_rendering::{
    compute_layout, BatchDescriptor, BatchDescriptorDesc, BatchKind, HeadlessBackend,
    MaterialHandle, MeshHandle, RenderConfig,
};
use proptest::prelude::*;

const SAMPLE: &str = include_str!("../assets/render_config.toml");

fn desc(kind: BatchKind, max_instances: usize) -> BatchDescriptorDesc {
    BatchDescriptorDesc {
        label: "prop".into(),
        kind,
        material: MaterialHandle(1),
        mesh: MeshHandle(1),
        sorting_priority: 0,
        max_instances,
    }
}

proptest! {
    #[test]
    fn test_unbounded_layout_is_one_window(
        bytes_per_instance in 1usize..512,
        max_instances in 1usize..20_000,
        count in 0usize..40_000,
    ) {
        let layout = compute_layout(bytes_per_instance, max_instances, None).unwrap();
        prop_assert_eq!(layout.mode, BufferMode::SingleBuffer);
        prop_assert_eq!(layout.window_count, 1);
        prop_assert_eq!(layout.instances_per_window, max_instances);
        prop_assert_eq!(
            layout.window_size_bytes,
            round_up_to_word(bytes_per_instance * max_instances) + EXTRA_BYTES
        );
        prop_assert_eq!(layout.windows_for(count), 1);
    }

    #[test]
    fn test_bounded_windows_cover_count(
        bytes_per_instance in 1usize..512,
        bound in 512usize..70_000,
        max_instances in 1usize..50_000,
        a in 0usize..50_000,
        b in 0usize..50_000,
    ) {
        let layout = compute_layout(bytes_per_instance, max_instances, Some(bound)).unwrap();
        let per_window = layout.instances_per_window;
        prop_assert_eq!(per_window, bound / bytes_per_instance);
        prop_assert!(layout.window_count * per_window >= max_instances);
        prop_assert!((layout.window_count - 1) * per_window < max_instances);

        let (low, high) = (a.min(b), a.max(b));
        prop_assert!(layout.windows_for(low) <= layout.windows_for(high));
        let windows = layout.windows_for(high);
        prop_assert!(windows * per_window >= high);
        if high > 0 {
            prop_assert!((windows - 1) * per_window < high);
        } else {
            prop_assert_eq!(windows, 0);
        }
    }

    #[test]
    fn test_writer_chunks_partition_range(count in 0usize..600, size in 1usize..100) {
        let mut backend = HeadlessBackend::raw();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Overlay, 600)).unwrap();
        let mut lease = descriptor.lock_for_write(count, true).unwrap();
        let ranges: Vec<_> = lease.writer().chunks(size).iter().map(|w| w.range()).collect();

        let mut expected_start = 0;
        for range in &ranges {
            prop_assert_eq!(range.start, expected_start);
            prop_assert!(!range.is_empty());
            prop_assert!(range.len() <= size);
            expected_start = range.end;
        }
        prop_assert_eq!(expected_start, count);
        prop_assert_eq!(ranges.len(), count.div_ceil(size));
        lease.unlock(&mut backend).unwrap();
    }

    #[test]
    fn test_fill_chunks_write_disjoint_words(
        counts in prop::collection::vec(0usize..300, 1..6),
        chunk_size in 1usize..80,
        bounded in any::<bool>(),
    ) {
        let mut backend = if bounded {
            HeadlessBackend::constant(4096)
        } else {
            HeadlessBackend::raw()
        };
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::HealthBar, 1_500)).unwrap();
        let addressing = *descriptor.addressing();
        let total: usize = counts.iter().sum();

        let mut lease = descriptor.lock_for_write(total, true).unwrap();
        let mut chunks = Vec::new();
        let mut rest = lease.writer();
        let mut end = 0;
        for count in &counts {
            end += count;
            let (head, tail) = rest.split_at(end);
            rest = tail;
            chunks.extend(head.chunks(chunk_size).iter().map(|w| w.range()));
        }
        prop_assert!(rest.is_empty());

        let mut owner = HashMap::new();
        for (chunk, range) in chunks.iter().enumerate() {
            for index in range.clone() {
                for attribute in BatchKind::HealthBar.attributes() {
                    let first = addressing.word_of(*attribute, index).unwrap();
                    for word in first..first + attribute.size_words() {
                        let previous = owner.insert(word, chunk);
                        prop_assert!(
                            previous.is_none(),
                            "word {} written by chunks {:?} and {}", word, previous, chunk
                        );
                    }
                }
            }
        }
        drop(rest);
        lease.unlock(&mut backend).unwrap();
    }

    #[test]
    fn test_uploaded_sprite_transform_inverts(
        x in -500.0f32..500.0,
        y in -500.0f32..500.0,
        heading in -3.1f32..3.1,
        frame_number in 0u32..8,
        count in 1usize..40,
    ) {
        let mut backend = HeadlessBackend::raw();
        let probe = backend.probe();
        let mut descriptor = BatchDescriptor::new(&mut backend, desc(BatchKind::Sprite, 64)).unwrap();
        let addressing = *descriptor.addressing();
        let profile = RenderConfig::from_toml_str(SAMPLE).unwrap().creeps[1].profile().unwrap();

        let direction = [heading.cos(), heading.sin()];
        let positions: Vec<Position> = (0..count)
            .map(|i| Position::new([x + i as f32, y], direction))
            .collect();
        let animations = vec![
            Animation {
                direction,
                frame_number,
                ..Animation::default()
            };
            count
        ];

        let mut lease = descriptor.lock_for_write(count, false).unwrap();
        fill_sprites(&mut lease.writer(), &positions, &animations, &profile);
        lease.unlock(&mut backend).unwrap();

        let state = probe.state();
        let buffer = state.buffer(descriptor.buffer(0)).unwrap();
        let matrix_at = |attribute: AttributeKind, index: usize| {
            let word = addressing.word_of(attribute, index).unwrap();
            let packed: [f32; 12] = buffer[word..word + 12].try_into().unwrap();
            unpack(&packed)
        };
        let tolerance = 1e-2 * (1.0 + x.abs().max(y.abs()));
        for index in [0, count - 1] {
            let forward = matrix_at(AttributeKind::ObjectToWorld, index);
            let inverse = matrix_at(AttributeKind::WorldToObject, index);
            prop_assert!((forward.w_axis.x - positions[index].position[0]).abs() < 1e-3);
            prop_assert!((forward.w_axis.y - y).abs() < 1e-3);

            let point = Vec3::new(0.3, -0.7, 0.0).extend(1.0);
            let round_trip = inverse * (forward * point);
            prop_assert!((round_trip.xyz() - point.xyz()).length() < 1e-2);

            let back = unpack(&InstanceTransform::from_matrix(&inverse).world_to_object);
            prop_assert!(back.abs_diff_eq(forward, tolerance));
        }
    }
}
