//! Symbolic bytecode evaluator (spec.md §4.2, C2).
//!
//! Interprets a restricted set of Dalvik opcodes over a method's
//! instruction stream *in program order, with no branching*, producing a
//! table of register -> [`ValueExpr`]. This is a deliberate,
//! linear-time approximation: branches and joins are not modeled
//! (spec.md §9 "Ambiguities observed in source" — documented, not
//! silently improved on).
//!
//! A single method's own bytecode is frequently just a forwarding
//! wrapper (spec.md glossary "Wrapper method"): it calls the sensitive
//! API with no trace of that call visible above it except via a call
//! node named after the wrapper itself. To let stage 5 still see the
//! API call it's actually looking for, [`evaluate`] performs a small,
//! strictly depth-bounded inlining pass (spec.md §8 Scenario B): call
//! nodes that target another method with a known body in the same
//! application are spliced with that method's own register table,
//! folding a couple of wrapper hops into one call's trace. This does
//! not make the evaluator a general interprocedural analyzer — it never
//! models explicit `return`, never crosses a hop the evaluator hasn't
//! itself linearly executed, and the bound keeps it total and cheap.

mod opcodes;
mod state;
mod value;

pub use value::{CallNode, Literal, ValueExpr};

use std::collections::{HashMap, HashSet};

use crate::apk_info::ApkInfo;
use crate::method::MethodRef;

use state::EvalState;

/// How many additional wrapper-method bodies [`evaluate`] will fold into
/// one call's trace (spec.md §8 Scenario B "shared ancestor one hop
/// up"). Distinct from, and much smaller than, `MAX_SEARCH_LAYER`
/// (`crate::callgraph`), which bounds call-*graph* search rather than
/// per-trace inlining.
pub const INLINE_DEPTH: usize = 2;

/// Register name -> value expression, as it stands after executing a
/// method's full instruction stream once, with no branching.
#[derive(Clone, Debug, Default)]
pub struct RegisterTable {
    registers: HashMap<String, ValueExpr>,
}

impl RegisterTable {
    pub fn get(&self, register: &str) -> Option<&ValueExpr> {
        self.registers.get(register)
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// All value expressions currently held by some register, in an
    /// unspecified but stable-per-call order (backed by iteration over a
    /// `HashMap`, good enough since stage 5 only needs the *set* of
    /// traces, not their order).
    pub fn values(&self) -> impl Iterator<Item = &ValueExpr> {
        self.registers.values()
    }
}

/// Evaluate `method`'s bytecode (as supplied by `apk`) and return the
/// resulting register table, inlining up to [`INLINE_DEPTH`] wrapper
/// calls along the way. Never raises: unrecognized mnemonics are
/// skipped and missing bytecode (native/synthetic methods) yields an
/// empty table (spec.md §4.2, §8 invariant 6).
pub fn evaluate(apk: &dyn ApkInfo, method: &MethodRef) -> RegisterTable {
    evaluate_bounded(apk, method, INLINE_DEPTH, &mut HashSet::new())
}

fn evaluate_bounded(
    apk: &dyn ApkInfo,
    method: &MethodRef,
    depth: usize,
    stack: &mut HashSet<MethodRef>,
) -> RegisterTable {
    if !stack.insert(method.clone()) {
        // Already on the current inlining path: a recursive or mutually
        // recursive wrapper. Stop rather than loop.
        return RegisterTable::default();
    }

    let mut state = EvalState::new();
    for instr in apk.get_method_bytecode(method) {
        opcodes::dispatch(&mut state, &instr);
    }
    let mut registers = state.snapshot();

    if depth > 0 {
        let mut callees = HashSet::new();
        for expr in registers.values() {
            expr.for_each_call_node(&mut |node| {
                callees.insert(node.method.clone());
            });
        }
        for callee in callees {
            if apk.get_method_bytecode(&callee).is_empty() {
                continue;
            }
            let inlined = evaluate_bounded(apk, &callee, depth - 1, stack);
            let extra: Vec<ValueExpr> = inlined.values().cloned().collect();
            if extra.is_empty() {
                continue;
            }
            for v in registers.values_mut() {
                *v = splice_inline(v, &callee, &extra);
            }
        }
    }

    stack.remove(method);
    RegisterTable { registers }
}

/// Rebuild `expr`, appending `extra` (the callee's own flattened
/// register table) to the argument list of every call node that
/// invokes `target`. This is the mechanism behind [`evaluate`]'s bounded
/// inlining: the invariant that a call node's trace contains each of
/// its arguments' traces as substrings means simply appending `extra`
/// as additional arguments is enough to pull the callee's own call
/// nodes into the caller's trace.
fn splice_inline(expr: &ValueExpr, target: &MethodRef, extra: &[ValueExpr]) -> ValueExpr {
    match expr {
        ValueExpr::Call(node) => {
            let spliced_args: Vec<ValueExpr> = node
                .args
                .iter()
                .map(|a| splice_inline(a, target, extra))
                .collect();
            if &node.method == target {
                let mut combined = spliced_args;
                combined.extend(extra.iter().cloned());
                ValueExpr::call(node.method.clone(), combined)
            } else {
                ValueExpr::call(node.method.clone(), spliced_args)
            }
        }
        other => other.clone(),
    }
}
