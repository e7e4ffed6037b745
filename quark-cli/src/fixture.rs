//! JSON call-graph fixture format loaded by [`crate::analyze::Analyze`].
//!
//! Stands in for real APK parsing (kept out of scope, spec.md §1): a
//! fixture lists every method the fixture app "contains", its bytecode
//! (already decoded into [`Instruction`]s, never raw smali/dex), and any
//! superclass edges stage 1's subclass fallback needs. Caller edges are
//! not listed separately — they are derived from `invoke-*` operands the
//! same way [`FakeApkInfo::set_bytecode`] does for tests.

use std::path::Path;

use quark_core::testing::FakeApkInfo;
use quark_core::{ClassName, Instruction, MethodRef};
use serde::Deserialize;

#[derive(Deserialize)]
struct MethodEntry {
    method: MethodRef,
    #[serde(default)]
    bytecode: Vec<Instruction>,
}

#[derive(Deserialize)]
struct SuperEdge {
    child: String,
    parent: String,
}

#[derive(Deserialize, Default)]
struct ApkFixture {
    #[serde(default)]
    methods: Vec<MethodEntry>,
    #[serde(default)]
    supers: Vec<SuperEdge>,
}

/// Load a JSON fixture file into a [`FakeApkInfo`], ready to drive
/// [`quark_core::run_analysis`].
pub fn load(path: &Path) -> anyhow::Result<FakeApkInfo> {
    let text = std::fs::read_to_string(path)?;
    let fixture: ApkFixture = serde_json::from_str(&text)?;

    let mut apk = FakeApkInfo::new();
    for entry in fixture.methods {
        if entry.bytecode.is_empty() {
            apk.add_method(entry.method);
        } else {
            apk.set_bytecode(entry.method, entry.bytecode);
        }
    }
    for edge in fixture.supers {
        apk.add_super(ClassName::from(edge.child), ClassName::from(edge.parent));
    }
    Ok(apk)
}
