//! Operation-level tests for the shift B-tree: the concrete workload
//! scenarios the minimizer driver relies on, plus structural edge cases.

use minidex_index::{MinimizerIndex, ShiftBTree};

type Tree = ShiftBTree<i64, String>;
type SmallTree = ShiftBTree<i64, String, 3, 2>;

fn entries<const B: usize, const T: usize>(
    tree: &ShiftBTree<i64, String, B, T>,
) -> Vec<(i64, Vec<String>)> {
    tree.iter().map(|(k, s)| (k, s.to_vec())).collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_insert_accumulates_satellites_in_order() {
    let mut tree = Tree::new();
    tree.insert(5, "a".to_string());
    tree.insert(2, "b".to_string());
    tree.insert(8, "c".to_string());
    tree.insert(5, "d".to_string());

    assert_eq!(
        entries(&tree),
        vec![
            (2, strings(&["b"])),
            (5, strings(&["a", "d"])),
            (8, strings(&["c"])),
        ]
    );
}

#[test]
fn test_shift_greater_includes_the_pivot_key() {
    let mut tree = Tree::new();
    for k in [1i64, 3, 5, 7, 9, 11, 13] {
        tree.insert(k, k.to_string());
    }

    let entry = tree.shift_greater(5, 10).expect("pivot key present");
    assert_eq!(entry.value(), 15);

    assert_eq!(
        entries(&tree),
        vec![
            (1, strings(&["1"])),
            (3, strings(&["3"])),
            (15, strings(&["5"])),
            (17, strings(&["7"])),
            (19, strings(&["9"])),
            (21, strings(&["11"])),
            (23, strings(&["13"])),
        ]
    );
    assert!(tree.check_integrity());
}

#[test]
fn test_shift_greater_descends_through_internal_nodes() {
    let mut tree = SmallTree::new();
    for k in 1..=50 {
        tree.insert(k, k.to_string());
    }
    tree.shift_greater(20, 100);

    let expected: Vec<i64> = (1..20).chain((20..=50).map(|k| k + 100)).collect();
    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, expected);
    assert!(tree.check_integrity());
}

#[test]
fn test_negative_shift_closes_a_gap() {
    let mut tree = Tree::new();
    for k in [10i64, 20, 30, 40] {
        tree.insert(k, k.to_string());
    }
    // a 5-base deletion upstream of 30 pulls the tail back
    tree.shift_greater(30, -5);
    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![10, 20, 25, 35]);
    assert!(tree.check_integrity());
}

#[test]
fn test_split_and_join_round_trip() {
    let mut tree = Tree::new();
    for k in 1..=20 {
        tree.insert(k, k.to_string());
    }

    let right = tree.split(10);
    let left_keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    let right_keys: Vec<i64> = right.iter().map(|(k, _)| k).collect();
    assert_eq!(left_keys, (1..=10).collect::<Vec<_>>());
    assert_eq!(right_keys, (11..=20).collect::<Vec<_>>());
    assert!(tree.check_integrity());
    assert!(right.check_integrity());

    tree.join(right);
    let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (1..=20).collect::<Vec<_>>());
    assert!(tree.check_integrity());
}

#[test]
fn test_split_outside_the_key_range() {
    let mut tree = Tree::new();
    for k in 5..10 {
        tree.insert(k, k.to_string());
    }

    let right = tree.split(100);
    assert!(right.is_empty());
    assert_eq!(tree.iter().count(), 5);

    let right = tree.split(0);
    assert!(tree.is_empty());
    assert_eq!(right.iter().count(), 5);
    assert!(right.check_integrity());
}

#[test]
fn test_split_at_every_position_of_a_deep_tree() {
    for pivot in 0..=40 {
        let mut tree = SmallTree::new();
        for k in 1..=40 {
            tree.insert(k, k.to_string());
        }
        let right = tree.split(pivot);
        let left_keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        let right_keys: Vec<i64> = right.iter().map(|(k, _)| k).collect();
        assert_eq!(left_keys, (1..=pivot.min(40)).collect::<Vec<_>>(), "pivot {pivot}");
        assert_eq!(right_keys, (pivot.max(0) + 1..=40).collect::<Vec<_>>(), "pivot {pivot}");
        assert!(tree.check_integrity(), "left after split({pivot})");
        assert!(right.check_integrity(), "right after split({pivot})");
    }
}

#[test]
fn test_join_after_shift_preserves_effective_keys() {
    let mut left = Tree::new();
    for k in 1..=6 {
        left.insert(k, k.to_string());
    }
    let mut right = Tree::new();
    for k in 20..=26 {
        right.insert(k, k.to_string());
    }
    left.shift(2);
    right.shift(-3);

    left.join(right);
    let keys: Vec<i64> = left.iter().map(|(k, _)| k).collect();
    let expected: Vec<i64> = (1..=6).map(|k| k + 2).chain((20..=26).map(|k| k - 3)).collect();
    assert_eq!(keys, expected);
    assert!(left.check_integrity());
}

#[test]
fn test_join_where_left_holds_a_single_key() {
    let mut left = Tree::make_set(1, "one".to_string());
    let mut right = Tree::new();
    for k in 10..=30 {
        right.insert(k, k.to_string());
    }
    left.join(right);
    let keys: Vec<i64> = left.iter().map(|(k, _)| k).collect();
    let expected: Vec<i64> = std::iter::once(1).chain(10..=30).collect();
    assert_eq!(keys, expected);
    assert!(left.check_integrity());
}

#[test]
fn test_join_with_empty_sides() {
    let mut tree = Tree::new();
    tree.join(Tree::new());
    assert!(tree.is_empty());

    tree.join(Tree::make_set(5, "x".to_string()));
    assert_eq!(tree.get_min(), Some(5));

    tree.join(Tree::new());
    assert_eq!(tree.iter().count(), 1);
}

#[test]
fn test_removal_storm_at_minimum_branching() {
    let mut tree = SmallTree::new();
    for k in 1..=8 {
        tree.insert(k, k.to_string());
    }
    assert!(tree.height() <= 3);
    assert!(tree.check_integrity());

    let mut remaining: Vec<i64> = (1..=8).collect();
    for k in [4i64, 2, 6, 1, 3, 5, 7, 8] {
        let removed = tree.remove(k).expect("key present");
        assert_eq!(removed.value, k);
        assert_eq!(removed.satellites, strings(&[&k.to_string()]));
        remaining.retain(|&r| r != k);
        assert!(tree.check_integrity(), "after removing {k}");
        let keys: Vec<i64> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, remaining, "after removing {k}");
    }
    assert!(tree.is_empty());
}

#[test]
fn test_remove_after_whole_tree_shift() {
    let mut tree = SmallTree::new();
    for k in 1..=16 {
        tree.insert(k, k.to_string());
    }
    tree.shift(100);
    // the root now carries a non-zero lazy shift; removal must keep every
    // frame straight while it rotates and merges
    for k in 1..=16 {
        let removed = tree.remove(k + 100).expect("shifted key present");
        assert_eq!(removed.value, k + 100);
        assert!(tree.check_integrity(), "after removing shifted {k}");
    }
    assert!(tree.is_empty());
}

#[test]
fn test_merge_concatenates_satellites_receiver_first() {
    let mut a = Tree::new();
    a.insert(2, "x".to_string());
    a.insert(5, "y".to_string());
    let mut b = Tree::new();
    b.insert(5, "z".to_string());
    b.insert(9, "w".to_string());

    a.merge(b);
    assert_eq!(
        entries(&a),
        vec![
            (2, strings(&["x"])),
            (5, strings(&["y", "z"])),
            (9, strings(&["w"])),
        ]
    );
    assert!(a.check_integrity());
}

#[test]
fn test_merge_interleaved_ranges() {
    let mut a = SmallTree::new();
    let mut b = SmallTree::new();
    for k in (1..=40).step_by(2) {
        a.insert(k, format!("a{k}"));
    }
    for k in (2..=40).step_by(2) {
        b.insert(k, format!("b{k}"));
    }
    a.merge(b);
    let keys: Vec<i64> = a.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, (1..=40).collect::<Vec<_>>());
    assert!(a.check_integrity());
}

#[test]
fn test_merge_with_many_coincident_keys() {
    let mut a = SmallTree::new();
    let mut b = SmallTree::new();
    for k in 1..=20 {
        a.insert(k, format!("a{k}"));
    }
    for k in 10..=30 {
        b.insert(k, format!("b{k}"));
    }
    a.merge(b);
    for (k, sats) in a.iter() {
        let expected: Vec<String> = match k {
            1..=9 => vec![format!("a{k}")],
            10..=20 => vec![format!("a{k}"), format!("b{k}")],
            _ => vec![format!("b{k}")],
        };
        assert_eq!(sats.to_vec(), expected, "key {k}");
    }
    assert_eq!(a.iter().count(), 30);
    assert!(a.check_integrity());
}

#[test]
fn test_minimizer_index_workflow() {
    // the driver's usual cycle: bulk load, point the impact range, delete it,
    // shift the downstream tail, re-insert fresh minimizers
    let mut index: MinimizerIndex<String> = [
        (3i64, "ACG".to_string()),
        (9, "CGT".to_string()),
        (15, "GTT".to_string()),
        (22, "TTA".to_string()),
    ]
    .into_iter()
    .collect();

    let removed = index.remove_range(9, 15);
    assert_eq!(removed, 2);

    let suc = index.successor(15).map(|e| e.value()).expect("tail exists");
    index.shift_greater(suc, 4);

    index.insert(10, "CGA".to_string());
    index.insert(14, "GAT".to_string());

    let keys: Vec<i64> = index.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![3, 10, 14, 26]);
    assert!(index.check_integrity());
}

#[test]
fn test_predecessor_successor_across_levels() {
    let mut tree = SmallTree::new();
    for k in (0..100).step_by(5) {
        tree.insert(k, k.to_string());
    }
    for probe in 0..100i64 {
        let pred = tree.predecessor(probe).map(|e| e.value());
        let succ = tree.successor(probe).map(|e| e.value());
        let expected_pred = (probe / 5) * 5;
        assert_eq!(pred, Some(expected_pred.min(95)));
        let expected_succ = expected_pred + 5;
        if expected_succ < 100 {
            assert_eq!(succ, Some(expected_succ));
        } else {
            assert_eq!(succ, None);
        }
    }
}

#[test]
fn test_removed_entry_carries_all_satellites() {
    let mut tree = Tree::new();
    tree.insert(7, "first".to_string());
    tree.insert(7, "second".to_string());
    tree.insert(7, "third".to_string());
    let removed = tree.remove(7).expect("present");
    assert_eq!(removed.satellites, strings(&["first", "second", "third"]));
    assert!(tree.is_empty());
}
