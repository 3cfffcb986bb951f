use fenris_la::{
    stacked_positions, CountingIndexSetFactory, GhostBlockLayout, IndexMap, IndexSetFactory,
    StandardIndexSetFactory,
};
use proptest::collection::vec;
use proptest::prelude::*;
use util::prefix_sum;

fn two_ghosted_maps() -> (IndexMap, IndexMap) {
    // Rank 0 of two ranks, each block has two owned entries and one ghost
    let a = IndexMap::with_ghosts(0, vec![0, 2, 4], vec![3]).unwrap();
    let b = IndexMap::with_ghosts(0, vec![0, 2, 5], vec![4]).unwrap();
    (a, b)
}

#[test]
fn trailing_layout_places_all_ghosts_after_all_owned() {
    let (a, b) = two_ghosted_maps();
    let sets = StandardIndexSetFactory.create_index_sets(&[(&a, 1), (&b, 2)], true, GhostBlockLayout::Trailing);
    assert_eq!(sets.len(), 2);
    // Owned: block 0 -> 0..2, block 1 -> 2..6. Ghosts: block 0 -> 6, block 1 -> 7..9
    assert_eq!(sets[0].indices(), &[0, 1, 6]);
    assert_eq!(sets[1].indices(), &[2, 3, 4, 5, 7, 8]);
}

#[test]
fn trailing_layout_without_ghosts_keeps_positions() {
    let (a, b) = two_ghosted_maps();
    let sets = StandardIndexSetFactory.create_index_sets(&[(&a, 1), (&b, 2)], false, GhostBlockLayout::Trailing);
    assert_eq!(sets[0].indices(), &[0, 1]);
    assert_eq!(sets[1].indices(), &[2, 3, 4, 5]);
}

#[test]
fn intertwined_layout_places_ghosts_after_each_block() {
    let (a, b) = two_ghosted_maps();
    let positions = stacked_positions(&[(&a, 1), (&b, 2)], true, GhostBlockLayout::Intertwined);
    assert_eq!(positions, vec![vec![0, 1, 2], vec![3, 4, 5, 6, 7, 8]]);
}

#[test]
fn counting_factory_tracks_live_index_sets() {
    let factory = CountingIndexSetFactory::new();
    let map = IndexMap::new_serial(4);
    {
        let sets = factory.create_index_sets(&[(&map, 1), (&map, 1)], true, GhostBlockLayout::Trailing);
        assert_eq!(sets.len(), 2);
        assert_eq!(factory.live(), 2);
        let clone = factory.clone();
        let more = clone.create_index_sets(&[(&map, 1)], true, GhostBlockLayout::Trailing);
        assert_eq!(factory.live(), 3);
        drop(more);
        assert_eq!(factory.live(), 2);
    }
    assert_eq!(factory.live(), 0);
    assert_eq!(factory.created(), 3);
}

proptest! {
    #[test]
    fn trailing_positions_cover_layout_exactly_once(
        blocks in vec((0usize..5, 0usize..3, 1usize..4), 1..6)
    ) {
        // blocks: (owned, ghosts, bs). Ghosts are owned by rank 1.
        let maps: Vec<IndexMap> = blocks
            .iter()
            .map(|&(owned, ghosts, _)| {
                let partition = vec![0, owned, owned + ghosts];
                IndexMap::with_ghosts(0, partition, (owned..owned + ghosts).collect()).unwrap()
            })
            .collect();
        let pairs: Vec<_> = maps.iter().zip(&blocks).map(|(m, &(_, _, bs))| (m, bs)).collect();
        let positions = stacked_positions(&pairs, true, GhostBlockLayout::Trailing);

        let total_owned: usize = blocks.iter().map(|&(o, _, bs)| o * bs).sum();
        let total: usize = blocks.iter().map(|&(o, g, bs)| (o + g) * bs).sum();
        let owned_offsets: Vec<_> = prefix_sum(blocks.iter().map(|&(o, _, bs)| o * bs), 0).collect();
        let ghost_offsets: Vec<_> = prefix_sum(blocks.iter().map(|&(_, g, bs)| g * bs), total_owned).collect();

        let mut all: Vec<usize> = positions.iter().flatten().copied().collect();
        all.sort_unstable();
        prop_assert_eq!(all, (0..total).collect::<Vec<_>>());

        for (i, &(owned, ghosts, bs)) in blocks.iter().enumerate() {
            let expected: Vec<usize> = (owned_offsets[i]..owned_offsets[i] + owned * bs)
                .chain(ghost_offsets[i]..ghost_offsets[i] + ghosts * bs)
                .collect();
            prop_assert_eq!(&positions[i], &expected);
        }
    }
}
