//! Opcode handler dispatch (spec.md §9 "Opcode handler dispatch"): a
//! static table from mnemonic family to handler function, built once via
//! `once_cell`, not reflection.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::instruction::{Instruction, Operand};

use super::state::EvalState;
use super::value::{Literal, ValueExpr};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
enum Family {
    NewInstance,
    Const,
    Move,
    MoveResult,
    Invoke,
    FieldPut,
    ArrayMove,
}

type Handler = fn(&mut EvalState, &Instruction);

/// Classify a concrete mnemonic spelling (`const/4`, `move-result-object`,
/// `invoke-interface`, ...) into the opcode family that handles it.
/// Mnemonics outside these families are left unclassified and the
/// instruction is skipped (spec.md §4.2 "Opcodes outside the handled set
/// are ignored").
fn classify(mnemonic: &str) -> Option<Family> {
    if mnemonic == "new-instance" {
        Some(Family::NewInstance)
    } else if mnemonic.starts_with("const") {
        Some(Family::Const)
    } else if mnemonic.starts_with("move-result") {
        Some(Family::MoveResult)
    } else if mnemonic.starts_with("move") {
        Some(Family::Move)
    } else if mnemonic.starts_with("invoke-") {
        Some(Family::Invoke)
    } else if mnemonic.starts_with("iput") || mnemonic.starts_with("sput") {
        Some(Family::FieldPut)
    } else if mnemonic.starts_with("aput") || mnemonic.starts_with("aget") {
        Some(Family::ArrayMove)
    } else {
        None
    }
}

static DISPATCH: Lazy<HashMap<Family, Handler>> = Lazy::new(|| {
    let mut m: HashMap<Family, Handler> = HashMap::new();
    m.insert(Family::NewInstance, handle_new_instance as Handler);
    m.insert(Family::Const, handle_const as Handler);
    m.insert(Family::Move, handle_move as Handler);
    m.insert(Family::MoveResult, handle_move_result as Handler);
    m.insert(Family::Invoke, handle_invoke as Handler);
    m.insert(Family::FieldPut, handle_field_put as Handler);
    m.insert(Family::ArrayMove, handle_array_move as Handler);
    m
});

/// Run `instr` against `state`, dispatching through the static family
/// table. Unknown mnemonics are silently skipped (`EvaluatorSkip`,
/// spec.md §7) — this function never panics.
pub fn dispatch(state: &mut EvalState, instr: &Instruction) {
    let Some(family) = classify(&instr.mnemonic) else {
        return;
    };
    if let Some(handler) = DISPATCH.get(&family) {
        handler(state, instr);
    }
}

fn handle_new_instance(state: &mut EvalState, instr: &Instruction) {
    let Some(dest) = instr.registers.first() else {
        return;
    };
    let class = match &instr.parameter {
        Some(Operand::Class(c)) => c.get_smali_name().into_owned(),
        _ => return,
    };
    // A fresh, argument-less call node stands in for "uninitialized
    // instance of T" (spec.md §4.2 `new-instance`). It becomes a real
    // constructor call node once `invoke-direct` on `<init>` runs.
    let node = ValueExpr::call(
        crate::method::MethodRef::new(class, "<new-instance>", ""),
        vec![],
    );
    state.set(dest, node);
}

fn handle_const(state: &mut EvalState, instr: &Instruction) {
    let Some(dest) = instr.registers.first() else {
        return;
    };
    let value = match &instr.parameter {
        Some(Operand::String(s)) => ValueExpr::Literal(Literal::Str(s.clone())),
        Some(Operand::Number(n)) => ValueExpr::Literal(Literal::Number(*n)),
        Some(Operand::Class(c)) => {
            ValueExpr::Literal(Literal::Class(c.get_smali_name().into_owned()))
        }
        Some(Operand::Method(_)) => return,
        None => ValueExpr::Literal(Literal::Number(0)),
    };
    state.set(dest, value);
}

fn handle_move(state: &mut EvalState, instr: &Instruction) {
    if instr.registers.len() < 2 {
        return;
    }
    let dest = instr.registers[0].clone();
    let src = &instr.registers[1];
    let value = state.get_or_fabricate(src);
    state.set(&dest, value);
}

fn handle_move_result(state: &mut EvalState, instr: &Instruction) {
    let Some(dest) = instr.registers.first() else {
        return;
    };
    let value = state
        .take_result_slot()
        .unwrap_or_else(|| state.fabricate(dest));
    state.set(dest, value);
}

fn handle_invoke(state: &mut EvalState, instr: &Instruction) {
    let Some(Operand::Method(method)) = &instr.parameter else {
        return;
    };
    let args: Vec<ValueExpr> = instr
        .registers
        .iter()
        .map(|r| state.get_or_fabricate(r))
        .collect();
    let node = ValueExpr::call(method.clone(), args);
    state.set_result_slot(node.clone());
    if instr.is_constructor_invoke() {
        if let Some(receiver) = instr.registers.first() {
            state.set(receiver, node);
        }
    }
}

fn handle_field_put(_state: &mut EvalState, _instr: &Instruction) {
    // No field model: tolerated, never raises, never mutates (spec.md
    // §4.2 "iput*/sput* ignored for scoring").
}

fn handle_array_move(state: &mut EvalState, instr: &Instruction) {
    if instr.registers.len() < 2 {
        return;
    }
    if instr.mnemonic.starts_with("aget") {
        let dest = instr.registers[0].clone();
        let array_reg = &instr.registers[1];
        let value = state.get_or_fabricate(array_reg);
        state.set(&dest, value);
    } else {
        // aput: the array register "receives" the stored expression
        // verbatim, since arrays are flattened (spec.md §4.2).
        let src = instr.registers[0].clone();
        let array_reg = instr.registers[1].clone();
        let value = state.get_or_fabricate(&src);
        state.set(&array_reg, value);
    }
}
