//! Uniform query surface over a parsed application (spec.md §4.1, C1).
//!
//! Modeled the way `dtu`'s `GraphDatabase` trait (`dtu/src/db/graph/traitdef.rs`)
//! gives the analysis core a read-only query surface over a store it does
//! not own: a production implementation wraps a real APK/dex parse and is
//! an external collaborator (spec.md §1), not part of this crate.

use std::collections::HashSet;

use crate::class_name::ClassName;
use crate::instruction::Instruction;
use crate::method::MethodRef;

/// Source snippet returned for reporting (spec.md §4.1 `get_wrapper_smali`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WrapperSmali {
    pub smali: String,
    pub hex: String,
}

/// Read-only query surface over a single parsed application.
///
/// Implementations must be deterministic: the same call, against the
/// same backing data, must yield the same iteration order every time.
/// The five-stage matcher's tie-breaking (spec.md §4.4, and the
/// "adapter-defined order" note in §4.3.2) depends on this.
#[cfg_attr(test, mockall::automock)]
pub trait ApkInfo {
    /// Exact `(class, name, descriptor)` lookup.
    fn find_method(&self, class: &ClassName, name: &str, descriptor: &str) -> Option<MethodRef>;

    /// The full method set of the application, in a stable order.
    fn all_methods(&self) -> Vec<MethodRef>;

    /// In-method-order bytecode for `m`. Empty if `m` is native, abstract,
    /// or otherwise has no body.
    fn get_method_bytecode(&self, m: &MethodRef) -> Vec<Instruction>;

    /// Direct callers of `m` (reverse call edges).
    fn upperfunc(&self, m: &MethodRef) -> HashSet<MethodRef>;

    /// Direct superclasses/interfaces of `class`.
    fn superclass_relationships(&self, class: &ClassName) -> HashSet<ClassName>;

    /// Source snippet for the wrapper method `parent`, for reporting.
    /// `first`/`second` are the two target API calls the wrapper leads to.
    fn get_wrapper_smali(
        &self,
        parent: &MethodRef,
        first: &MethodRef,
        second: &MethodRef,
    ) -> Option<WrapperSmali>;
}
