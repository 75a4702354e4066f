//! Response selection: condition-based pool partitioning plus weighted
//! random draw within the winning pool.
//!
//! Conditional responses model special-case overrides and always win over
//! generic ones when satisfied; weighted selection only arbitrates between
//! equally-qualified candidates.

use crate::condition::evaluate;
use crate::model::{parse_stored_conditions, MockRequest, ResponseDef};
use rand::Rng;
use std::collections::HashMap;

/// Select a response using the process RNG. `None` only for an empty input.
pub fn select_response<'a>(
    responses: &'a [ResponseDef],
    request: &MockRequest,
    path_params: &HashMap<String, String>,
) -> Option<&'a ResponseDef> {
    let mut rng = rand::thread_rng();
    select_response_with(responses, request, path_params, &mut || rng.gen::<f64>())
}

/// Select a response with an injectable randomness source.
///
/// `rand01` must yield values in `[0, 1)`; it is only consulted when a
/// weighted draw is actually needed, so deterministic paths never touch it.
pub fn select_response_with<'a>(
    responses: &'a [ResponseDef],
    request: &MockRequest,
    path_params: &HashMap<String, String>,
    rand01: &mut dyn FnMut() -> f64,
) -> Option<&'a ResponseDef> {
    match responses {
        [] => return None,
        [only] => return Some(only),
        _ => {}
    }

    let mut conditional_matches: Vec<&ResponseDef> = Vec::new();
    let mut unconditioned: Vec<&ResponseDef> = Vec::new();
    for response in responses {
        let conditions = parse_stored_conditions(response.conditions.as_deref());
        if conditions.is_empty() {
            unconditioned.push(response);
        } else if conditions.iter().all(|c| evaluate(c, request, path_params)) {
            conditional_matches.push(response);
        }
        // Partially satisfied conditions: excluded from both pools.
    }

    let pool: Vec<&ResponseDef> = if !conditional_matches.is_empty() {
        conditional_matches
    } else if !unconditioned.is_empty() {
        unconditioned
    } else {
        // All responses carry unsatisfied conditions: fall back to the
        // full original list rather than answering with nothing.
        responses.iter().collect()
    };

    if pool.len() == 1 {
        return Some(pool[0]);
    }

    weighted_pick(&pool, rand01)
}

fn weighted_pick<'a>(
    pool: &[&'a ResponseDef],
    rand01: &mut dyn FnMut() -> f64,
) -> Option<&'a ResponseDef> {
    let total_weight: u64 = pool.iter().map(|r| r.weight).sum();

    if total_weight == 0 {
        if let Some(default) = pool.iter().find(|r| r.is_default) {
            return Some(*default);
        }
        return pool.first().copied();
    }

    let mut remainder = rand01() * total_weight as f64;
    for response in pool {
        remainder -= response.weight as f64;
        if remainder <= 0.0 {
            return Some(response);
        }
    }
    // Floating-point residual after the walk: settle on the last member.
    pool.last().copied()
}
