//! Call-graph search (spec.md §4.3, C3): finding wrapper methods and
//! common ancestors of two method sets.
//!
//! Both searches are written as explicit work-stack/work-set loops
//! rather than recursion (spec.md §9 "Recursion -> iteration"), the
//! posture `dtu` takes by pushing graph traversal into bounded
//! Datalog-style scripts (`dtu/src/db/graph/cozodb.rs`) instead of
//! native call-stack recursion.

use std::collections::HashSet;

use crate::apk_info::ApkInfo;
use crate::errors::{Error, Result};
use crate::method::MethodRef;

/// Default maximum upward expansion depth for [`find_intersection`]
/// (spec.md §6 "Tunables").
pub const MAX_SEARCH_LAYER: usize = 3;

/// Depth-first traversal upward from `base` following `upperfunc` edges.
///
/// For every node reachable from `base` whose direct callers include
/// `parent`, the node itself (one hop below `parent`) is appended to
/// `out` — these are the wrapper methods `parent` uses to transitively
/// reach `base` (spec.md §4.3.1, §8 invariant 5).
///
/// `visited` prevents reprocessing a node already walked in this search;
/// callers share one `visited` set across repeated calls to accumulate
/// results without doing redundant work on a large call graph.
pub fn find_previous_method(
    apk: &dyn ApkInfo,
    base: &MethodRef,
    parent: &MethodRef,
    out: &mut Vec<MethodRef>,
    visited: &mut HashSet<MethodRef>,
) {
    let mut stack = vec![base.clone()];
    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for caller in apk.upperfunc(&current) {
            if caller == *parent {
                out.push(current.clone());
            } else {
                stack.push(caller);
            }
        }
    }
}

/// Find any non-empty overlap between two method sets, widening layer by
/// layer up to `max_layer` upward expansions (spec.md §4.3.2).
///
/// `max_layer = 0` performs only the direct intersection check with no
/// expansion — this is what stage 3 of the matcher uses to test
/// "some method directly calls both APIs" (spec.md §8 boundary:
/// "`MAX_SEARCH_LAYER = 0` degrades stage 3/4 to direct-caller-only
/// matching").
///
/// Returns `Ok(None)` if no overlap is found within the allotted depth,
/// and `Err(Error::EmptyInput)` if either input set is empty.
pub fn find_intersection(
    apk: &dyn ApkInfo,
    a: &HashSet<MethodRef>,
    b: &HashSet<MethodRef>,
    max_layer: usize,
) -> Result<Option<HashSet<MethodRef>>> {
    if a.is_empty() || b.is_empty() {
        return Err(Error::EmptyInput);
    }

    let mut cur_a = a.clone();
    let mut cur_b = b.clone();
    let mut depth = 1usize;

    loop {
        let intersection: HashSet<MethodRef> = cur_a.intersection(&cur_b).cloned().collect();
        if !intersection.is_empty() {
            return Ok(Some(intersection));
        }
        if depth > max_layer {
            return Ok(None);
        }

        // Monotone growth: each new layer is the old layer plus its
        // direct callers, never a replacement, guaranteeing termination
        // and that any common ancestor within `max_layer` hops is found.
        for m in a_snapshot(&cur_a) {
            cur_a.extend(apk.upperfunc(&m));
        }
        for m in a_snapshot(&cur_b) {
            cur_b.extend(apk.upperfunc(&m));
        }
        depth += 1;
    }
}

fn a_snapshot(set: &HashSet<MethodRef>) -> Vec<MethodRef> {
    set.iter().cloned().collect()
}
