//! Property tests for partitions (lattice laws of Eq(n))


use malcev::{BinaryRelation, Partition};
use proptest::prelude::*;

proptest! {
    /// Join and meet are commutative
    #[test]
    fn join_meet_commute((p, q) in generators::arb_partition_pair(6)) {
        prop_assert_eq!(p.join(&q).unwrap(), q.join(&p).unwrap());
        prop_assert_eq!(p.meet(&q).unwrap(), q.meet(&p).unwrap());
    }

    /// p ∨ (p ∧ q) = p and p ∧ (p ∨ q) = p
    #[test]
    fn absorption((p, q) in generators::arb_partition_pair(6)) {
        prop_assert_eq!(p.join(&p.meet(&q).unwrap()).unwrap(), p.clone());
        prop_assert_eq!(p.meet(&p.join(&q).unwrap()).unwrap(), p);
    }

    /// Join and meet are associative
    #[test]
    fn associativity((p, q, r) in generators::arb_partition_triple(5)) {
        let left = p.join(&q).unwrap().join(&r).unwrap();
        let right = p.join(&q.join(&r).unwrap()).unwrap();
        prop_assert_eq!(left, right);
        let left = p.meet(&q).unwrap().meet(&r).unwrap();
        let right = p.meet(&q.meet(&r).unwrap()).unwrap();
        prop_assert_eq!(left, right);
    }

    /// p ≤ q iff p ∧ q = p iff p ∨ q = q
    #[test]
    fn order_matches_operations((p, q) in generators::arb_partition_pair(6)) {
        let leq = p.leq(&q).unwrap();
        prop_assert_eq!(leq, p.meet(&q).unwrap() == p);
        prop_assert_eq!(leq, p.join(&q).unwrap() == q);
    }

    /// Blocks and labels describe the same partition
    #[test]
    fn blocks_roundtrip(p in (1usize..=6).prop_flat_map(generators::arb_partition)) {
        let rebuilt = Partition::from_blocks(p.size(), &p.blocks()).unwrap();
        prop_assert_eq!(rebuilt, p.clone());
        prop_assert_eq!(p.blocks().len(), p.number_of_blocks());
    }

    /// A partition's relation is an equivalence and converts back
    #[test]
    fn relation_roundtrip(p in (1usize..=6).prop_flat_map(generators::arb_partition)) {
        let rel = BinaryRelation::from(&p);
        prop_assert!(rel.is_equivalence());
        prop_assert_eq!(rel.to_partition().unwrap(), p);
    }

    /// Related pairs are exactly the off-diagonal pairs of one block
    #[test]
    fn related_pairs_match_find(p in (1usize..=6).prop_flat_map(generators::arb_partition)) {
        let n = p.size();
        let pairs: Vec<_> = p.related_pairs().collect();
        for a in 0..n {
            for b in a + 1..n {
                let related = p.find(a).unwrap() == p.find(b).unwrap();
                prop_assert_eq!(related, pairs.contains(&(a, b)));
            }
        }
    }
}
