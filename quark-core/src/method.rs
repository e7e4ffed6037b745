//! Method identity (spec.md §3 "Method identity").

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::class_name::ClassName;

/// A method identified by the triple `(class, name, descriptor)`.
///
/// Equality and hashing are on the triple, canonicalized through
/// [`ClassName`]'s smali form, so a method built from a java-dotted class
/// name and one built from a smali class name are the same key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: ClassName,
    pub name: String,
    /// Full Dalvik descriptor, e.g. `(Ljava/lang/String;)V`.
    pub descriptor: String,
}

impl MethodRef {
    pub fn new<C: Into<ClassName>, N: Into<String>, D: Into<String>>(
        class: C,
        name: N,
        descriptor: D,
    ) -> Self {
        Self {
            class: class.into(),
            name: name.into(),
            descriptor: descriptor.into(),
        }
    }

    /// Canonical `Lpkg/Class;->name(args)ret` textual signature.
    ///
    /// This is the string substrate stage 5 matches on (spec.md §4.2
    /// "Method pattern helper") — it must be exact, including the full
    /// argument list and return type, to avoid collisions between
    /// overloads.
    pub fn pattern(&self) -> String {
        format!(
            "{}->{}{}",
            self.class.get_smali_name(),
            self.name,
            self.descriptor
        )
    }
}

impl PartialEq for MethodRef {
    fn eq(&self, other: &Self) -> bool {
        self.class == other.class && self.name == other.name && self.descriptor == other.descriptor
    }
}

impl Eq for MethodRef {}

impl std::hash::Hash for MethodRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.class.hash(state);
        self.name.hash(state);
        self.descriptor.hash(state);
    }
}

impl Display for MethodRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern())
    }
}
