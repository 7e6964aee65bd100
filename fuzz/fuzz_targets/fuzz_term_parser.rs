//! Fuzz the term parser
//!
//! Arbitrary input must either parse or produce a `Parse` error; a parsed
//! term must print back to something that parses to the same term.

#![no_main]

use libfuzzer_sys::fuzz_target;
use malcev::{Algebra, Evaluator, MalcevError, TermArena};

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let mut arena = TermArena::new();
    match arena.parse(input) {
        Ok(t) => {
            let printed = arena.to_string(t);
            assert_eq!(arena.parse(&printed), Ok(t));

            // Evaluation reports unknown symbols and arities instead of panicking
            if let Ok(ba) = Algebra::boolean_algebra() {
                let mut ev = Evaluator::new(&ba, &arena);
                let _ = ev.eval(t, &[0, 1, 0, 1, 0, 1]);
            }
        }
        Err(MalcevError::Parse(_)) => {}
        Err(other) => panic!("unexpected error kind: {other}"),
    }
});
