//! Property tests for congruence closure and lattice construction


use malcev::{
    close, join_congruences, principal_congruence, AlgebraView, Congruence, CongruenceLattice,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Cg(a, b) relates a and b and is compatible with every operation
    #[test]
    fn principal_is_congruence((alg, a, b) in generators::arb_algebra_and_pair()) {
        let cg = principal_congruence(&alg, a, b).unwrap();
        prop_assert!(cg.is_related(a, b).unwrap());
        let verified = Congruence::verify(&alg, cg.partition().clone()).unwrap();
        prop_assert_eq!(verified, Some(cg));
    }

    /// Cg(a, a) is the identity and Cg(a, b) ∨ Cg(a, b) = Cg(a, b)
    #[test]
    fn principal_join_idempotent((alg, a, b) in generators::arb_algebra_and_pair()) {
        prop_assert!(principal_congruence(&alg, a, a).unwrap().is_zero());
        let cg = principal_congruence(&alg, a, b).unwrap();
        prop_assert_eq!(join_congruences(&alg, &cg, &cg).unwrap(), cg);
    }

    /// Cg(a, b) lies below every congruence relating a and b
    #[test]
    fn principal_is_least((alg, a, b) in generators::arb_algebra_and_pair()) {
        let cg = principal_congruence(&alg, a, b).unwrap();
        let mut lat = CongruenceLattice::new(&alg);
        for theta in lat.congruences().unwrap() {
            if theta.is_related(a, b).unwrap() {
                prop_assert!(cg.leq(&theta).unwrap());
            }
        }
    }

    /// Joining congruences agrees with closing the union of their pairs
    #[test]
    fn join_matches_closure((alg, a, b) in generators::arb_algebra_and_pair(), c in 0usize..4, d in 0usize..4) {
        let n = alg.cardinality();
        let (c, d) = (c % n, d % n);
        let theta = principal_congruence(&alg, a, b).unwrap();
        let phi = principal_congruence(&alg, c, d).unwrap();
        let joined = join_congruences(&alg, &theta, &phi).unwrap();
        let direct = close(&alg, [(a, b), (c, d)]).unwrap();
        prop_assert_eq!(&joined, &direct);
        prop_assert!(theta.leq(&joined).unwrap() && phi.leq(&joined).unwrap());
    }

    /// Every lattice element is a congruence, and the lattice is closed
    /// under its own join and meet
    #[test]
    fn lattice_closed(alg in generators::arb_algebra()) {
        let mut lat = CongruenceLattice::new(&alg);
        let all = lat.congruences().unwrap();
        let k = all.len();
        for theta in &all {
            let verified = Congruence::verify(&alg, theta.partition().clone()).unwrap();
            prop_assert!(verified.is_some());
        }
        for i in 0..k {
            for j in 0..k {
                let join = lat.join(i, j).unwrap();
                let meet = lat.meet(i, j).unwrap();
                let expected = join_congruences(&alg, &all[i], &all[j]).unwrap();
                prop_assert_eq!(&all[join], &expected);
                prop_assert_eq!(&all[meet], &all[i].meet(&all[j]).unwrap());
            }
        }
        prop_assert!(all[lat.zero().unwrap()].is_zero());
        prop_assert!(all[lat.one().unwrap()].is_one());
    }

    /// Covering pairs are strictly ordered with nothing in between
    #[test]
    fn covers_have_nothing_between(alg in generators::arb_algebra()) {
        let mut lat = CongruenceLattice::new(&alg);
        let k = lat.size().unwrap();
        for (lo, hi) in lat.covering_relation().unwrap() {
            prop_assert!(lo != hi && lat.leq(lo, hi).unwrap());
            for mid in 0..k {
                if mid == lo || mid == hi {
                    continue;
                }
                prop_assert!(!(lat.leq(lo, mid).unwrap() && lat.leq(mid, hi).unwrap()));
            }
        }
    }

    /// Distributive congruence lattices are modular and semidistributive
    #[test]
    fn distributive_implies_modular(alg in generators::arb_algebra()) {
        let mut lat = CongruenceLattice::new(&alg);
        if lat.is_distributive().unwrap() {
            prop_assert!(lat.is_modular().unwrap());
            prop_assert_eq!(lat.find_sd_meet_failure().unwrap(), None);
            prop_assert_eq!(lat.find_sd_join_failure().unwrap(), None);
        }
    }
}
