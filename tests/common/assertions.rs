//! Custom assertion utilities for tests.

use std::sync::Arc;

use seqgen::{ExecutableSequence, ForwardGenerator, Sequence, TypeHierarchy};

/// Assert that a result is Ok and return the inner value.
#[allow(dead_code)]
pub fn assert_ok<T, E: std::fmt::Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("{} failed: {:?}", context, e),
    }
}

/// Every input refers strictly backwards and is assignable to the declared
/// input type.
#[allow(dead_code)]
pub fn assert_well_formed(seq: &Sequence, hierarchy: &TypeHierarchy) {
    for (index, stmt) in seq.statements().iter().enumerate() {
        for (&input, expected) in stmt.inputs().iter().zip(stmt.operation().input_types()) {
            assert!(input < index, "forward reference in\n{seq}");
            let actual = stmt.operation();
            assert!(
                hierarchy.is_assignable(expected, seq.statements()[input].output_type()),
                "input of {actual} not assignable in\n{seq}"
            );
        }
    }
    assert_ok(seq.check_well_formed(hierarchy), "check_well_formed");
}

/// Every sequence offered for a registered type has an active output usable
/// as that type.
#[allow(dead_code)]
pub fn assert_pool_sound(generator: &ForwardGenerator) {
    let hierarchy = Arc::clone(generator.hierarchy());
    let mut pool = generator.pool().clone();
    let types = pool.types().to_vec();
    for ty in &types {
        let offered: Vec<Arc<ExecutableSequence>> = pool.get(ty, false).iter().cloned().collect();
        for seq in offered {
            let s = seq.sequence();
            assert!(
                s.active_positions()
                    .filter_map(|p| s.output_type(p))
                    .any(|out| hierarchy.is_assignable(ty, out)),
                "pool offered a sequence with no active {ty} output:\n{s}"
            );
        }
    }
    assert_ok(pool.check_rep(), "pool check_rep");
}
