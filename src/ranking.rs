//! Final result ordering: linear-feature dedup, per-criterion rank
//! positions, and the composite fusion.
//!
//! Each candidate is ranked independently under three orderings (feature
//! rank, viewport-center distance, user distance). The three rank positions
//! are then sorted per candidate, so a candidate that is excellent on *any*
//! criterion gets a small leading component, and candidates are emitted in
//! lexicographic order of the sorted triples. Fusing on positions rather than
//! raw scores keeps the criteria commensurable.

use std::cmp::Ordering;

use crate::candidate::{Candidate, CRITERIA_COUNT};
use crate::models::Geometry;

type CandidateCmp = fn(&Candidate, &Candidate) -> Ordering;

fn cmp_rank(a: &Candidate, b: &Candidate) -> Ordering {
    b.rank.cmp(&a.rank)
}

fn cmp_viewport_distance(a: &Candidate, b: &Candidate) -> Ordering {
    a.viewport_distance.total_cmp(&b.viewport_distance)
}

fn cmp_user_distance(a: &Candidate, b: &Candidate) -> Ordering {
    a.user_distance.total_cmp(&b.user_distance)
}

static CANDIDATE_COMPARATORS: [CandidateCmp; CRITERIA_COUNT] =
    [cmp_rank, cmp_viewport_distance, cmp_user_distance];

/// Grouping order for linear features: fragments of the same named road (or
/// rail, or river) sort adjacently; everything else keeps its relative order.
fn cmp_linear_group(a: &Candidate, b: &Candidate) -> Ordering {
    let a_linear = a.geometry == Geometry::Line;
    let b_linear = b.geometry == Geometry::Line;
    match (a_linear, b_linear) {
        (true, true) => a.types.cmp(&b.types).then_with(|| a.name.cmp(&b.name)),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

fn equal_linear_group(a: &Candidate, b: &Candidate) -> bool {
    a.geometry == Geometry::Line
        && b.geometry == Geometry::Line
        && a.types == b.types
        && a.name == b.name
}

/// Order candidates for emission. Consumes the promoted candidates in
/// matcher insertion order and returns them fully ranked.
pub(crate) fn rank_and_fuse(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
    // Collapse runs of equivalent linear fragments, keeping the first.
    candidates.sort_by(cmp_linear_group);
    candidates.dedup_by(|a, b| equal_linear_group(a, b));

    let n = candidates.len();
    let mut ranks = vec![[0usize; CRITERIA_COUNT]; n];
    let mut order: Vec<usize> = (0..n).collect();

    for (ci, cmp) in CANDIDATE_COMPARATORS.iter().enumerate() {
        order.sort_by(|&i, &j| cmp(&candidates[i], &candidates[j]));
        let mut rank = 0;
        for k in 0..n {
            if k > 0 && cmp(&candidates[order[k - 1]], &candidates[order[k]]) == Ordering::Less {
                rank += 1;
            }
            ranks[order[k]][ci] = rank;
        }
    }

    // Sort each triple so any strong criterion leads it, then order
    // lexicographically; ties fall back to per-criterion ranks and finally
    // to insertion order.
    let per_criterion = ranks.clone();
    for triple in &mut ranks {
        triple.sort_unstable();
    }

    let mut emit_order: Vec<usize> = (0..n).collect();
    emit_order.sort_by(|&i, &j| {
        ranks[i]
            .cmp(&ranks[j])
            .then_with(|| per_criterion[i].cmp(&per_criterion[j]))
            .then_with(|| i.cmp(&j))
    });

    emit_order.into_iter().map(|i| candidates[i].clone()).collect()
}
