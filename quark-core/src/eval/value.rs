//! Value expressions (spec.md §3 "Register table", §9 "Polymorphism over
//! value expressions"): a tagged variant `{Literal, Placeholder, Call}`,
//! not a string. The textual `called_by_func` trace is derived from this
//! tree on demand rather than carried as the primary representation,
//! which is what lets stage 5 (`crate::matcher::check_parameter`) avoid
//! the balanced-paren reparsing spec.md §9 flags as an avoidable cost of
//! the string-first reference approach.

use std::rc::Rc;

use crate::method::MethodRef;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Str(String),
    Number(i64),
    Class(String),
}

impl Literal {
    fn trace(&self) -> String {
        match self {
            Literal::Str(s) => format!("{:?}", s),
            Literal::Number(n) => n.to_string(),
            Literal::Class(c) => c.clone(),
        }
    }
}

/// A call node: `{method, args, called_by_func}` in spec.md §3 terms. The
/// `called_by_func` string is computed by [`CallNode::trace`] rather than
/// stored, since it is fully determined by `method` and `args`.
///
/// Call nodes are cycle-free by construction (spec.md §5 "Bounded
/// resources"): each `invoke-*` creates a brand new node whose children
/// are references to expressions that were already fully computed by
/// prior instructions, so there is no way to build a node that contains
/// itself.
#[derive(Clone, Debug, PartialEq)]
pub struct CallNode {
    pub method: MethodRef,
    pub args: Vec<ValueExpr>,
}

impl CallNode {
    /// `method_pattern(arg1_trace, arg2_trace, ...)` (spec.md §4.2
    /// "Textual trace").
    pub fn trace(&self) -> String {
        let args = self
            .args
            .iter()
            .map(|a| a.trace())
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.method.pattern(), args)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ValueExpr {
    Literal(Literal),
    /// A register placeholder established at method entry (a parameter
    /// to the evaluated method), or fabricated on first read of an
    /// uninitialized register (spec.md §4.2 "Failure semantics").
    Placeholder(String),
    Call(Rc<CallNode>),
}

impl ValueExpr {
    pub fn literal_str<S: Into<String>>(s: S) -> Self {
        ValueExpr::Literal(Literal::Str(s.into()))
    }

    pub fn literal_number(n: i64) -> Self {
        ValueExpr::Literal(Literal::Number(n))
    }

    pub fn literal_class<S: Into<String>>(c: S) -> Self {
        ValueExpr::Literal(Literal::Class(c.into()))
    }

    pub fn placeholder<S: Into<String>>(name: S) -> Self {
        ValueExpr::Placeholder(name.into())
    }

    pub fn call(method: MethodRef, args: Vec<ValueExpr>) -> Self {
        ValueExpr::Call(Rc::new(CallNode { method, args }))
    }

    /// Textual trace of this expression. For a [`ValueExpr::Call`] this is
    /// `called_by_func`'s contract: every argument's trace is a substring
    /// of the parent's trace (spec.md §3 invariants), which holds
    /// structurally here since `trace()` literally concatenates them.
    pub fn trace(&self) -> String {
        match self {
            ValueExpr::Literal(l) => l.trace(),
            ValueExpr::Placeholder(p) => p.clone(),
            ValueExpr::Call(c) => c.trace(),
        }
    }

    /// Walk this expression and every call node reachable from it,
    /// innermost-argument order doesn't matter for matching purposes so
    /// pre-order is fine. Used by stage 5 to flatten a register table
    /// into the full set of call traces it could have produced.
    pub fn for_each_call_node<'a, F: FnMut(&'a CallNode)>(&'a self, f: &mut F) {
        if let ValueExpr::Call(node) = self {
            f(node);
            for arg in &node.args {
                arg.for_each_call_node(f);
            }
        }
    }
}
