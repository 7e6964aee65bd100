//! Unit tests for the term arena, term syntax and evaluation

use std::collections::HashMap;

use malcev::term::{variable_index, variable_name};
use malcev::{parse_term, Algebra, Evaluator, MalcevError, TermArena};

#[test]
fn test_parse_and_print() {
    let (arena, t) = parse_term("meet(join(x, y), z)").unwrap();
    assert_eq!(arena.to_string(t), "meet(join(x,y),z)");
    assert_eq!(arena.depth(t).unwrap(), 2);
    assert_eq!(arena.variables(t).unwrap(), vec![0, 1, 2]);
}

#[test]
fn test_shared_subterms_are_interned() {
    let mut arena = TermArena::new();
    let t = arena.parse("f(g(x,y),g(x,y))").unwrap();
    // x, y, g(x,y), f(..)
    assert_eq!(arena.size(t).unwrap(), 4);
    let again = arena.parse("f(g(x, y), g(x, y))").unwrap();
    assert_eq!(t, again);
}

#[test]
fn test_parse_errors() {
    let mut arena = TermArena::new();
    for bad in ["", "f(x", "f(x,)", "f x", "foo", "(x)"] {
        assert!(
            matches!(arena.parse(bad), Err(MalcevError::Parse(_))),
            "{bad:?} should not parse"
        );
    }
}

#[test]
fn test_variable_names() {
    for i in 0..12 {
        assert_eq!(variable_index(&variable_name(i)), Some(i));
    }
    assert_eq!(variable_index("x3"), Some(3));
    assert_eq!(variable_index("q"), None);
}

#[test]
fn test_substitute_and_compose() {
    let mut arena = TermArena::new();
    let t = arena.parse("f(x,g(y))").unwrap();
    let z = arena.make_variable(2);
    let swapped = arena
        .substitute(t, &HashMap::from([(1, z)]))
        .unwrap();
    assert_eq!(arena.to_string(swapped), "f(x,g(z))");

    let a = arena.parse("g(z)").unwrap();
    let b = arena.parse("x").unwrap();
    let composed = arena.compose(t, &[a, b]).unwrap();
    assert_eq!(arena.to_string(composed), "f(g(z),g(x))");
}

#[test]
fn test_evaluate_in_boolean_algebra() {
    let ba = Algebra::boolean_algebra().unwrap();
    let mut arena = TermArena::new();
    let implies = arena.parse("join(neg(x),y)").unwrap();
    let mut ev = Evaluator::new(&ba, &arena);
    assert_eq!(ev.term_operation(implies, 2).unwrap(), vec![1, 1, 0, 1]);
    assert_eq!(ev.eval(implies, &[1, 0]).unwrap(), 0);
}

#[test]
fn test_evaluation_errors() {
    let z3 = Algebra::cyclic_group(3).unwrap();
    let mut arena = TermArena::new();
    let unknown = arena.parse("meet(x,y)").unwrap();
    let wrong_arity = arena.parse("+(x)").unwrap();
    let uses_z = arena.parse("+(x,z)").unwrap();
    let mut ev = Evaluator::new(&z3, &arena);
    assert_eq!(
        ev.eval(unknown, &[0, 1]),
        Err(MalcevError::UnknownOperation("meet".to_string()))
    );
    assert!(matches!(
        ev.eval(wrong_arity, &[0]),
        Err(MalcevError::ArityMismatch { expected: 2, found: 1, .. })
    ));
    assert_eq!(ev.term_operation(uses_z, 2), Err(MalcevError::MissingVariable(2)));
}
