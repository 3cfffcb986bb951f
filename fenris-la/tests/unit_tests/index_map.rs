use fenris_la::{stack_index_maps, IndexMap, LaError};

#[test]
fn serial_index_map_owns_everything() {
    let map = IndexMap::new_serial(5);
    assert_eq!(map.rank(), 0);
    assert_eq!(map.num_ranks(), 1);
    assert_eq!(map.local_range(), 0..5);
    assert_eq!(map.size_local(), 5);
    assert_eq!(map.num_ghosts(), 0);
    assert_eq!(map.global_size(), 5);
    assert_eq!(map.local_to_global(4), Some(4));
    assert_eq!(map.local_to_global(5), None);
    assert_eq!(map.global_to_local(3), Some(3));
}

#[test]
fn ghosted_index_map_local_numbering() {
    // Three ranks owning 0..3, 3..5, 5..9. Rank 1 holds ghosts 7 and 0.
    let map = IndexMap::with_ghosts(1, vec![0, 3, 5, 9], vec![7, 0]).unwrap();
    assert_eq!(map.local_range(), 3..5);
    assert_eq!(map.size_local(), 2);
    assert_eq!(map.size_with_ghosts(), 4);
    assert_eq!(map.ghost_owners(), vec![2, 0]);
    assert_eq!(map.local_to_global(0), Some(3));
    assert_eq!(map.local_to_global(2), Some(7));
    assert_eq!(map.local_to_global(3), Some(0));
    assert_eq!(map.global_to_local(0), Some(3));
    assert_eq!(map.global_to_local(8), None);
}

#[test]
fn owner_skips_empty_ranges() {
    let map = IndexMap::with_ghosts(0, vec![0, 3, 3, 6], vec![]).unwrap();
    assert_eq!(map.owner(2), Some(0));
    assert_eq!(map.owner(3), Some(2));
    assert_eq!(map.owner(6), None);
}

#[test]
fn invalid_index_maps_are_rejected() {
    let is_invalid = |result: Result<IndexMap, LaError>| matches!(result, Err(LaError::InvalidIndexMap { .. }));
    // Owned ghost
    assert!(is_invalid(IndexMap::with_ghosts(0, vec![0, 3, 6], vec![1])));
    // Out of range
    assert!(is_invalid(IndexMap::with_ghosts(0, vec![0, 3, 6], vec![6])));
    // Duplicate
    assert!(is_invalid(IndexMap::with_ghosts(0, vec![0, 3, 6], vec![4, 4])));
    // Rank not in partition
    assert!(is_invalid(IndexMap::with_ghosts(2, vec![0, 3, 6], vec![])));
    // Decreasing partition
    assert!(is_invalid(IndexMap::with_ghosts(0, vec![0, 3, 2], vec![])));
}

#[test]
fn stacked_serial_maps() {
    let a = IndexMap::new_serial(3);
    let b = IndexMap::new_serial(2);
    let stacked = stack_index_maps(&[(&a, 1), (&b, 2)]).unwrap();
    assert_eq!(stacked.global_size(), 7);
    assert_eq!(stacked.size_local(), 7);
    assert_eq!(stacked.num_ghosts(), 0);
}

#[test]
fn stacked_ghost_global_indices() {
    // Two ranks. Block 0 (bs 1): rank 0 owns 0..2, rank 1 owns 2..5.
    // Block 1 (bs 2): rank 0 owns 0..1, rank 1 owns 1..3.
    // Stacked numbering: rank 0 owns [b0: 0, 1 | b1: 2, 3], rank 1 owns [b0: 4, 5, 6 | b1: 7, 8, 9, 10]
    let a = IndexMap::with_ghosts(0, vec![0, 2, 5], vec![3]).unwrap();
    let b = IndexMap::with_ghosts(0, vec![0, 1, 3], vec![2]).unwrap();
    let stacked = stack_index_maps(&[(&a, 1), (&b, 2)]).unwrap();
    assert_eq!(stacked.partition(), &[0, 4, 11]);
    assert_eq!(stacked.local_range(), 0..4);
    assert_eq!(stacked.ghosts(), &[5, 9, 10]);
    assert_eq!(stacked.ghost_owners(), vec![1, 1, 1]);
}

#[test]
fn stacking_maps_from_different_ranks_fails() {
    let a = IndexMap::with_ghosts(0, vec![0, 2, 4], vec![]).unwrap();
    let b = IndexMap::with_ghosts(1, vec![0, 2, 4], vec![]).unwrap();
    assert!(stack_index_maps(&[(&a, 1), (&b, 1)]).is_err());
}
