//! Unit tests for congruence lattices of small algebras

use malcev::{
    principal_congruence, Algebra, CongruenceLattice, LatticeConfig, MalcevError, Partition,
};

/// The Klein group as an affine algebra, `p(x,y,z) = x + y + z`
fn affine_v4() -> Algebra {
    Algebra::new("V4", 4)
        .unwrap()
        .with_fn("p", 3, |a| a[0] ^ a[1] ^ a[2])
        .unwrap()
}

#[test]
fn test_simple_algebras_have_two_congruences() {
    for alg in [
        Algebra::cyclic_group(3).unwrap(),
        Algebra::boolean_algebra().unwrap(),
        Algebra::lattice_m3().unwrap(),
    ] {
        let mut lat = CongruenceLattice::new(&alg);
        assert_eq!(lat.size().unwrap(), 2, "{}", alg.name());
        assert!(lat.is_distributive().unwrap());
    }
}

#[test]
fn test_trivial_algebra() {
    let one = Algebra::trivial();
    let mut lat = CongruenceLattice::new(&one);
    assert_eq!(lat.size().unwrap(), 1);
    assert_eq!(lat.zero().unwrap(), lat.one().unwrap());
    assert!(lat.atoms().unwrap().is_empty());
}

#[test]
fn test_pentagon_congruences() {
    // 0 < {a,b} < two incomparable collapses < 1
    let n5 = Algebra::lattice_n5().unwrap();
    let mut lat = CongruenceLattice::new(&n5);
    assert_eq!(lat.size().unwrap(), 5);
    assert!(lat.is_distributive().unwrap());

    let atoms = lat.atoms().unwrap();
    assert_eq!(atoms.len(), 1);
    let ab = lat.congruence(atoms[0]).unwrap();
    assert_eq!(ab.partition(), &Partition::from_blocks(5, &[vec![0], vec![1, 2], vec![3], vec![4]]).unwrap());
    assert_eq!(lat.coatoms().unwrap().len(), 2);
}

#[test]
fn test_affine_klein_group_is_m3() {
    let v4 = affine_v4();
    let mut lat = CongruenceLattice::new(&v4);
    assert_eq!(lat.size().unwrap(), 5);
    assert!(lat.is_modular().unwrap());
    assert!(!lat.is_distributive().unwrap());
    assert_eq!(lat.atoms().unwrap().len(), 3);

    let failure = lat.find_sd_meet_failure().unwrap().expect("M3 is not SD(∧)");
    let ab = lat.meet(failure.alpha, failure.beta).unwrap();
    let ag = lat.meet(failure.alpha, failure.gamma).unwrap();
    assert_eq!(ab, ag);
    let bg = lat.join(failure.beta, failure.gamma).unwrap();
    assert_ne!(lat.meet(failure.alpha, bg).unwrap(), ab);
    assert!(lat.find_sd_join_failure().unwrap().is_some());
}

#[test]
fn test_bare_set_gives_partition_lattice() {
    // With no operations every partition is a congruence; Π4 is not modular
    let set = Algebra::new("set4", 4).unwrap();
    let mut lat = CongruenceLattice::new(&set);
    assert_eq!(lat.size().unwrap(), 15);
    assert!(!lat.is_modular().unwrap());
    assert_eq!(lat.join_irreducibles().unwrap().len(), 6);
    assert_eq!(lat.meet_irreducibles().unwrap().len(), 7);
}

#[test]
fn test_join_meet_agree_with_order() {
    let chain = Algebra::lattice_chain(4).unwrap();
    let mut lat = CongruenceLattice::new(&chain);
    let k = lat.size().unwrap();
    // Con of an n-chain is the Boolean lattice on its n-1 covering pairs
    assert_eq!(k, 8);
    for i in 0..k {
        for j in 0..k {
            let join = lat.join(i, j).unwrap();
            let meet = lat.meet(i, j).unwrap();
            assert!(lat.leq(i, join).unwrap() && lat.leq(j, join).unwrap());
            assert!(lat.leq(meet, i).unwrap() && lat.leq(meet, j).unwrap());
            assert_eq!(lat.leq(i, j).unwrap(), join == j);
        }
    }
}

#[test]
fn test_principal_lookup_matches_closure() {
    let n5 = Algebra::lattice_n5().unwrap();
    let mut lat = CongruenceLattice::new(&n5);
    for a in 0..5 {
        for b in 0..5 {
            let direct = principal_congruence(&n5, a, b).unwrap();
            assert_eq!(lat.principal_congruence(a, b).unwrap(), direct);
            let idx = lat.principal_index(a, b).unwrap();
            assert_eq!(lat.congruence(idx).unwrap(), direct);
        }
    }
}

#[test]
fn test_ceiling_leaves_lattice_incomplete() {
    let set = Algebra::new("set4", 4).unwrap();
    let mut lat = CongruenceLattice::new(&set).with_config(LatticeConfig::new(5, 100));
    assert!(matches!(
        lat.build(),
        Err(MalcevError::ResourceLimitExceeded { .. })
    ));
    assert!(lat.is_incomplete());
    assert_eq!(lat.size(), Err(MalcevError::Incomplete));
}

#[test]
fn test_progress_reported() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let set = Algebra::new("set4", 4).unwrap();
    let mut lat = CongruenceLattice::new(&set).with_progress_callback(move |fraction, _| {
        assert!((0.0..=1.0).contains(&fraction));
        seen.fetch_add(1, Ordering::Relaxed);
    });
    lat.build().unwrap();
    assert!(calls.load(Ordering::Relaxed) > 0);
}
