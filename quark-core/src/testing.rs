//! An in-memory, deterministic [`ApkInfo`] fixture, the same way `dtu`
//! keeps `testing/` helpers (`dtu/src/testing/`) separate from any real
//! backend so the rest of the crate can be exercised without a parsed
//! APK or a live database.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::apk_info::{ApkInfo, WrapperSmali};
use crate::class_name::ClassName;
use crate::instruction::Instruction;
use crate::method::MethodRef;

#[derive(Default)]
pub struct FakeApkInfo {
    methods: HashSet<MethodRef>,
    bytecode: HashMap<MethodRef, Vec<Instruction>>,
    /// callee -> its direct callers (what `upperfunc` returns)
    callers: HashMap<MethodRef, HashSet<MethodRef>>,
    supers: HashMap<ClassName, HashSet<ClassName>>,
}

impl FakeApkInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_method(&mut self, m: MethodRef) {
        self.methods.insert(m);
    }

    /// Registers `m` and its bytecode. Any `invoke-*` instruction in
    /// `instrs` automatically wires up the corresponding caller edge
    /// (`caller` calls whatever method each invoke targets), so tests
    /// don't need to separately call [`FakeApkInfo::add_call`] for
    /// straight-line bytecode.
    pub fn set_bytecode(&mut self, m: MethodRef, instrs: Vec<Instruction>) {
        self.add_method(m.clone());
        for i in &instrs {
            if let Some(target) = i.method_operand() {
                self.add_call(m.clone(), target.clone());
            }
        }
        self.bytecode.insert(m, instrs);
    }

    /// Registers a caller -> callee edge without attaching bytecode.
    pub fn add_call(&mut self, caller: MethodRef, callee: MethodRef) {
        self.add_method(caller.clone());
        self.add_method(callee.clone());
        self.callers.entry(callee).or_default().insert(caller);
    }

    pub fn add_super(&mut self, child: ClassName, parent: ClassName) {
        self.supers.entry(child).or_default().insert(parent);
    }
}

impl ApkInfo for FakeApkInfo {
    fn find_method(&self, class: &ClassName, name: &str, descriptor: &str) -> Option<MethodRef> {
        self.methods
            .iter()
            .find(|m| &m.class == class && m.name == name && m.descriptor == descriptor)
            .cloned()
    }

    fn all_methods(&self) -> Vec<MethodRef> {
        // BTreeMap keyed by pattern gives a stable, deterministic order
        // regardless of the backing HashSet's iteration order.
        let ordered: BTreeMap<String, MethodRef> =
            self.methods.iter().map(|m| (m.pattern(), m.clone())).collect();
        ordered.into_values().collect()
    }

    fn get_method_bytecode(&self, m: &MethodRef) -> Vec<Instruction> {
        self.bytecode.get(m).cloned().unwrap_or_default()
    }

    fn upperfunc(&self, m: &MethodRef) -> HashSet<MethodRef> {
        self.callers.get(m).cloned().unwrap_or_default()
    }

    fn superclass_relationships(&self, class: &ClassName) -> HashSet<ClassName> {
        self.supers.get(class).cloned().unwrap_or_default()
    }

    fn get_wrapper_smali(
        &self,
        parent: &MethodRef,
        first: &MethodRef,
        second: &MethodRef,
    ) -> Option<WrapperSmali> {
        if !self.methods.contains(parent) {
            return None;
        }
        Some(WrapperSmali {
            smali: format!(
                "# wrapper {} (reaches {} and {})",
                parent.pattern(),
                first.pattern(),
                second.pattern()
            ),
            hex: String::new(),
        })
    }
}
