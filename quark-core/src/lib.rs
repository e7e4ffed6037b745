//! Five-stage confidence matcher for pairs of sensitive API calls sharing
//! a data flow, over an externally-supplied, already-parsed application
//! (spec.md §1 "Scope"). This crate owns stages 1-5 and the rule model;
//! parsing an APK into an [`apk_info::ApkInfo`] implementation is a
//! separate concern left to callers, the way `dtu`'s analysis core
//! (`dtu/src/db/graph/traitdef.rs`) never itself owns a compiled build.

pub mod analysis;
pub mod apk_info;
pub mod callgraph;
pub mod class_name;
pub mod errors;
pub mod eval;
pub mod instruction;
pub mod matcher;
pub mod method;
pub mod rule;

#[cfg(any(test, feature = "testkit"))]
pub mod testing;

pub use analysis::{Evidence, QuarkAnalysis};
pub use apk_info::{ApkInfo, WrapperSmali};
pub use callgraph::{find_intersection, find_previous_method, MAX_SEARCH_LAYER};
pub use class_name::ClassName;
pub use errors::{Error, Result};
pub use eval::{evaluate, CallNode, Literal, RegisterTable, ValueExpr};
pub use instruction::{Instruction, Operand};
pub use matcher::{
    check_parameter, extract_balanced_paren_block, find_api_usage, match_rule, Confidence,
    MatcherConfig,
};
pub use method::MethodRef;
pub use rule::{ApiSpec, KeywordMode, Rule, RuleRegistry};

/// Run every rule in `registry` against `apk`, returning one
/// `(rule, confidence)` pair per rule in registry order, and accumulating
/// all evidence/scoring into `analysis` (spec.md §5 "Top-level driver").
pub fn run_analysis<'r>(
    apk: &dyn ApkInfo,
    registry: &'r RuleRegistry,
    analysis: &mut QuarkAnalysis,
    config: MatcherConfig,
) -> Vec<(&'r Rule, Confidence)> {
    registry
        .rules()
        .iter()
        .map(|rule| (rule, match_rule(apk, rule, analysis, config)))
        .collect()
}
