use seqframe_core::{plan_partitions, DType, FileDescriptor, FileSet};

#[test]
fn test_partitions_cover_every_frame_exactly_once() {
    for total_frames in 0..=97 {
        for partition_count in 1..=24 {
            let parts = plan_partitions(total_frames, partition_count, &[3, 5]);
            assert_eq!(parts.len(), partition_count);

            let mut cursor = 0;
            for part in &parts {
                assert!(part.start <= part.stop, "inverted range {part:?}");
                assert_eq!(part.start, cursor, "gap or overlap at {part:?}");
                assert_eq!(part.slice.nav_range(), part.frame_range());
                assert_eq!(part.slice.sig_bounds(), vec![0..3, 0..5]);
                cursor = part.stop;
            }
            assert_eq!(cursor, total_frames);
            assert_eq!(
                parts.iter().map(|p| p.num_frames()).sum::<usize>(),
                total_frames
            );
        }
    }
}

#[test]
fn test_partitions_near_equal() {
    for total_frames in [10usize, 100, 1_000, 1_001] {
        for partition_count in [1usize, 2, 3, 7, 16] {
            let parts = plan_partitions(total_frames, partition_count, &[1, 1]);
            let per_part = total_frames / partition_count;
            for part in &parts[..parts.len() - 1] {
                assert_eq!(part.num_frames(), per_part);
            }
            let last = parts.last().unwrap();
            assert_eq!(last.num_frames(), per_part + total_frames % partition_count);
        }
    }
}

#[test]
fn test_partition_filesets_tile_dataset() {
    let fileset = FileSet::new(vec![
        FileDescriptor::new("first.seq", 0, 40, DType::U8, vec![2, 2], 0, 4, 8192),
        FileDescriptor::new("second.seq", 40, 57, DType::U8, vec![2, 2], 0, 4, 8192),
    ])
    .unwrap();

    let parts = plan_partitions(fileset.num_frames(), 6, &[2, 2]);
    let mut joined = FileSet::empty_at(0);
    for part in &parts {
        let sub = fileset.restrict(part.start, part.stop).unwrap();
        assert_eq!(sub.num_frames(), part.num_frames());
        joined = joined.concat(&sub).unwrap();
    }
    assert_eq!(joined, fileset);
}
