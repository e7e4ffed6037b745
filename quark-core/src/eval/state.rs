//! Per-evaluation mutable state: the register table plus the implicit
//! result slot `move-result*` reads from (spec.md §4.2).

use std::collections::HashMap;

use super::value::ValueExpr;

/// Reserved register-table key for a dangling, unconsumed result slot.
/// Not a valid Dalvik register spelling (`v#`/`p#`), so it can never
/// collide with a real register.
const RESULT_SLOT_KEY: &str = "$result";

pub struct EvalState {
    registers: HashMap<String, ValueExpr>,
    result_slot: Option<ValueExpr>,
}

impl EvalState {
    pub fn new() -> Self {
        Self {
            registers: HashMap::new(),
            result_slot: None,
        }
    }

    /// Seed a register with an entry-parameter placeholder, e.g. `p0` for
    /// the receiver of an instance method.
    pub fn seed_parameter(&mut self, register: &str, placeholder: &str) {
        self.registers
            .insert(register.to_string(), ValueExpr::placeholder(placeholder));
    }

    pub fn get(&self, register: &str) -> Option<&ValueExpr> {
        self.registers.get(register)
    }

    pub fn set(&mut self, register: &str, value: ValueExpr) {
        self.registers.insert(register.to_string(), value);
    }

    pub fn set_result_slot(&mut self, value: ValueExpr) {
        self.result_slot = Some(value);
    }

    pub fn take_result_slot(&mut self) -> Option<ValueExpr> {
        self.result_slot.take()
    }

    #[cfg(test)]
    pub fn peek_result_slot(&self) -> Option<&ValueExpr> {
        self.result_slot.as_ref()
    }

    /// Read `register`, fabricating a named `p<idx>` placeholder on first
    /// read of an uninitialized register so evaluation stays total
    /// (spec.md §4.2 "Failure semantics").
    pub fn get_or_fabricate(&mut self, register: &str) -> ValueExpr {
        if let Some(v) = self.registers.get(register) {
            return v.clone();
        }
        let value = self.fabricate(register);
        self.registers.insert(register.to_string(), value.clone());
        value
    }

    pub fn fabricate(&self, register: &str) -> ValueExpr {
        ValueExpr::placeholder(format!("p{}", register_index(register)))
    }

    /// Snapshot the full register table as it stands right now, plus any
    /// dangling result slot under a reserved key — the value produced by
    /// a trailing `invoke-*` that no subsequent `move-result*`
    /// consumed. Without this, the call a method ends on (very often the
    /// security-relevant one, e.g. a final `sendTextMessage`) would be
    /// invisible to stage 5 since it never lands in a named register.
    pub fn snapshot(&self) -> HashMap<String, ValueExpr> {
        let mut snapshot = self.registers.clone();
        if let Some(result) = &self.result_slot {
            snapshot.insert(RESULT_SLOT_KEY.to_string(), result.clone());
        }
        snapshot
    }
}

/// Extract the numeric suffix of a register name (`v12` -> 12, `p0` -> 0),
/// falling back to 0 if the name carries no digits.
fn register_index(register: &str) -> usize {
    register
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}
