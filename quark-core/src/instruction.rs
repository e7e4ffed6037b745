//! Bytecode instruction model (spec.md §3 "Bytecode instruction").
//!
//! This is deliberately a restricted, already-decoded representation: the
//! work of turning real Dalvik bytecode or smali text into this shape is
//! APK parsing, which spec.md §1 keeps out of scope. An [`ApkInfo`]
//! implementation is expected to hand the evaluator instructions already
//! in this form.
//!
//! [`ApkInfo`]: crate::apk_info::ApkInfo

use serde::{Deserialize, Serialize};

use crate::class_name::ClassName;
use crate::method::MethodRef;

/// The opaque operand carried by some instructions (spec.md §3).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Method(MethodRef),
    String(String),
    Class(ClassName),
    Number(i64),
}

/// A single bytecode instruction: `(mnemonic, registers[], parameter?)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub mnemonic: String,
    /// Ordered register operands, e.g. `["v0", "v1"]`.
    pub registers: Vec<String>,
    pub parameter: Option<Operand>,
}

impl Instruction {
    pub fn new<M: Into<String>>(
        mnemonic: M,
        registers: Vec<String>,
        parameter: Option<Operand>,
    ) -> Self {
        Self {
            mnemonic: mnemonic.into(),
            registers,
            parameter,
        }
    }

    /// `true` for the constructor-like invoke variants that, per Dalvik
    /// convention, mutate their receiver register in place: `invoke-direct`
    /// dispatching to `<init>` (spec.md §4.2).
    pub fn is_constructor_invoke(&self) -> bool {
        self.mnemonic == "invoke-direct"
            && matches!(&self.parameter, Some(Operand::Method(m)) if m.name == "<init>")
    }

    pub fn method_operand(&self) -> Option<&MethodRef> {
        match &self.parameter {
            Some(Operand::Method(m)) => Some(m),
            _ => None,
        }
    }
}
