//! Analysis state (spec.md §4.6/§3, C6).
//!
//! A single mutable accumulator threaded explicitly through rule
//! evaluation (spec.md §9 "pass it explicitly... do not hold
//! process-wide singletons"), the same way `dtu`'s setup tasks take an
//! `&dyn EventMonitor` rather than reaching for global state.

use std::collections::{HashMap, HashSet};

use crate::apk_info::WrapperSmali;
use crate::matcher::Confidence;
use crate::method::MethodRef;

/// One piece of call-site evidence for a matched rule (spec.md §3
/// "QuarkAnalysis").
#[derive(Clone, Debug)]
pub struct Evidence {
    pub parent: MethodRef,
    pub first_call: MethodRef,
    pub second_call: MethodRef,
    /// The rule's original target APIs, which may differ from
    /// `first_call`/`second_call` when stage 1 resolved them through the
    /// subclass fallback (spec.md §4.4 "Stage-1 detail").
    pub first_api: MethodRef,
    pub second_api: MethodRef,
    pub crime: String,
}

/// Per-run accumulator. One instance per `(apk, ruleset)` run (spec.md
/// §3 "Ownership").
#[derive(Default)]
pub struct QuarkAnalysis {
    call_graph_analysis_list: Vec<Evidence>,
    /// Ancestor full name (method pattern) -> its smali snippet.
    /// Last-write-wins: deterministic because rule evaluation order is
    /// deterministic (spec.md §4.6, §5 "Ordering guarantees").
    parent_wrapper_mapping: HashMap<String, WrapperSmali>,
    permissions: HashSet<String>,
    weighted_sum: f64,
}

impl QuarkAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_evidence(&mut self, evidence: Evidence) {
        self.call_graph_analysis_list.push(evidence);
    }

    pub fn record_wrapper_smali(&mut self, parent_full_name: String, smali: WrapperSmali) {
        self.parent_wrapper_mapping.insert(parent_full_name, smali);
    }

    pub fn add_permissions<I: IntoIterator<Item = String>>(&mut self, perms: I) {
        self.permissions.extend(perms);
    }

    /// Add this rule's contribution to the running weighted sum: `score
    /// * (confidence / 100)` (spec.md §4.6 `weighted_sum`), applied once
    /// per rule at its highest reached stage.
    pub fn add_weighted_score(&mut self, score: u32, confidence: Confidence) {
        self.weighted_sum += score as f64 * confidence.as_fraction();
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.call_graph_analysis_list
    }

    pub fn wrapper_smali(&self, parent_full_name: &str) -> Option<&WrapperSmali> {
        self.parent_wrapper_mapping.get(parent_full_name)
    }

    pub fn permissions(&self) -> &HashSet<String> {
        &self.permissions
    }

    pub fn weighted_sum(&self) -> f64 {
        self.weighted_sum
    }
}
