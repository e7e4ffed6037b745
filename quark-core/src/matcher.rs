//! Five-stage matcher (spec.md §4.4, C4): the core of the crate. Drives
//! the five checks per rule, assigns confidence, and appends evidence to
//! a [`QuarkAnalysis`].

use std::collections::HashSet;

use regex::Regex;

use crate::analysis::{Evidence, QuarkAnalysis};
use crate::apk_info::ApkInfo;
use crate::callgraph::{find_intersection, MAX_SEARCH_LAYER};
use crate::class_name::ClassName;
use crate::eval::{evaluate, CallNode};
use crate::method::MethodRef;
use crate::rule::{KeywordMode, Rule};

/// A confidence level, restricted by construction to `{0, 20, 40, 60, 80,
/// 100}` (spec.md §8 invariant 1), rather than left as a bare `u8` that
/// some caller could set to an invalid value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Confidence(u8);

impl Confidence {
    pub const ZERO: Confidence = Confidence(0);
    pub const STAGE1: Confidence = Confidence(20);
    pub const STAGE2: Confidence = Confidence(40);
    pub const STAGE3: Confidence = Confidence(60);
    pub const STAGE4: Confidence = Confidence(80);
    pub const STAGE5: Confidence = Confidence(100);

    pub fn from_percent(p: u8) -> Option<Self> {
        match p {
            0 | 20 | 40 | 60 | 80 | 100 => Some(Confidence(p)),
            _ => None,
        }
    }

    pub fn as_percent(&self) -> u8 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

/// Options controlling the search bound used by stages 3/4 and the
/// suppression threshold a caller applies to results (spec.md §6
/// "Tunables").
#[derive(Clone, Copy, Debug)]
pub struct MatcherConfig {
    pub max_search_layer: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_search_layer: MAX_SEARCH_LAYER,
        }
    }
}

/// Stage-1 detail (spec.md §4.4): resolve `target` either exactly, or via
/// the subclass fallback — all methods with a matching `(name,
/// descriptor)`, empty bytecode (abstract/interface/native shim), whose
/// declaring class is a subclass of `target.class` per
/// `superclass_relationships`, climbing up to but not past
/// `Ljava/lang/Object;`.
pub fn find_api_usage(apk: &dyn ApkInfo, target: &MethodRef) -> Vec<MethodRef> {
    if let Some(exact) = apk.find_method(&target.class, &target.name, &target.descriptor) {
        return vec![exact];
    }

    let mut result = Vec::new();
    for m in apk.all_methods() {
        if m.name != target.name || m.descriptor != target.descriptor {
            continue;
        }
        if !apk.get_method_bytecode(&m).is_empty() {
            continue;
        }
        if is_subclass_of(apk, &m.class, &target.class) {
            result.push(m);
        }
    }
    result
}

fn is_subclass_of(apk: &dyn ApkInfo, class: &ClassName, ancestor: &ClassName) -> bool {
    let mut stack = vec![class.clone()];
    let mut visited = HashSet::new();
    while let Some(current) = stack.pop() {
        if !visited.insert(current.clone()) {
            continue;
        }
        for sup in apk.superclass_relationships(&current) {
            if &sup == ancestor {
                return true;
            }
            if !sup.is_java_lang_object() {
                stack.push(sup);
            }
        }
    }
    false
}

/// Given `source` and a byte index pointing at `(`, return the substring
/// enclosed by the matching `)`, respecting nesting (spec.md §4.4
/// "Auxiliary: balanced-paren extraction").
pub fn extract_balanced_paren_block(source: &str, open_paren_index: usize) -> Option<&str> {
    let bytes = source.as_bytes();
    if bytes.get(open_paren_index) != Some(&b'(') {
        return None;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open_paren_index) {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&source[open_paren_index + 1..i]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Slice out the argument block that immediately follows `pattern`'s
/// first occurrence in `trace`.
fn extract_args_block_for<'t>(trace: &'t str, pattern: &str) -> Option<&'t str> {
    let start = trace.find(pattern)?;
    let paren_idx = start + pattern.len();
    extract_balanced_paren_block(trace, paren_idx)
}

fn match_keywords(args_block: &str, keywords: &[String], mode: KeywordMode) -> HashSet<String> {
    let mut matched = HashSet::new();
    for kw in keywords {
        match mode {
            KeywordMode::Literal => {
                if args_block.contains(kw.as_str()) {
                    matched.insert(kw.clone());
                }
            }
            KeywordMode::Regex => {
                let re = match Regex::new(kw) {
                    Ok(re) => re,
                    Err(_) => continue,
                };
                for caps in re.captures_iter(args_block) {
                    if caps.len() > 1 {
                        for g in caps.iter().skip(1).flatten() {
                            matched.insert(g.as_str().to_string());
                        }
                    } else if let Some(m) = caps.get(0) {
                        matched.insert(m.as_str().to_string());
                    }
                }
            }
        }
    }
    matched
}

/// Stage-5 keyword gate, given the two sides' argument blocks directly
/// (already sliced out of whichever trace(s) the two call nodes came
/// from). A `None` entry for one side is an unconstrained side,
/// vacuously satisfied — this is the only reading consistent with
/// spec.md §8 Scenario E, where `keywords: [["http://"], null]` succeeds
/// on the strength of the first API's match alone. Returns whether the
/// gate passed and the set of keywords actually matched (for
/// constrained sides only).
fn keywords_satisfied_blocks(
    block1: &str,
    block2: &str,
    keywords: &Option<[Option<Vec<String>>; 2]>,
    mode: KeywordMode,
) -> (bool, HashSet<String>) {
    let Some([k1, k2]) = keywords else {
        return (true, HashSet::new());
    };
    let mut matched_all = HashSet::new();
    let mut satisfied = true;
    for (block, kws) in [(block1, k1), (block2, k2)] {
        if let Some(kws) = kws {
            let matched = match_keywords(block, kws, mode);
            if matched.is_empty() {
                satisfied = false;
            } else {
                matched_all.extend(matched);
            }
        }
    }
    (satisfied, matched_all)
}

fn keywords_satisfied(
    trace: &str,
    p1: &str,
    p2: &str,
    keywords: &Option<[Option<Vec<String>>; 2]>,
    mode: KeywordMode,
) -> (bool, HashSet<String>) {
    let block1 = extract_args_block_for(trace, p1).unwrap_or("");
    let block2 = extract_args_block_for(trace, p2).unwrap_or("");
    keywords_satisfied_blocks(block1, block2, keywords, mode)
}

/// Whether two distinct call nodes targeting the same method show
/// overlapping data flow: one's trace nests inside the other's (the
/// result or an argument of one feeds the other), or they share at
/// least one argument with an identical trace (a common upstream
/// value reaches both calls).
fn call_nodes_overlap(a: &CallNode, b: &CallNode) -> bool {
    let a_trace = a.trace();
    let b_trace = b.trace();
    if a_trace.contains(&b_trace) || b_trace.contains(&a_trace) {
        return true;
    }
    a.args
        .iter()
        .any(|x| b.args.iter().any(|y| x.trace() == y.trace()))
}

/// Stage-5 detail (spec.md §4.4 "check_parameter"): does `ancestor`'s
/// register table contain a call trace naming both `m1` and `m2`,
/// satisfying the rule's keyword constraints if any? On success, one
/// evidence record is appended to `analysis` and the wrapper smali
/// snippet is recorded.
pub fn check_parameter(
    apk: &dyn ApkInfo,
    rule: &Rule,
    m1: &MethodRef,
    m2: &MethodRef,
    ancestor: &MethodRef,
    analysis: &mut QuarkAnalysis,
) -> bool {
    let table = evaluate(apk, ancestor);

    let p1 = m1.pattern();
    let p2 = m2.pattern();
    // A rule whose two target APIs are identical must not match off a
    // single call node: `trace.contains(&p1) && trace.contains(&p2)`
    // would otherwise be satisfied by one occurrence of the pattern
    // (spec.md §8 boundary). Require at least two distinct, overlapping
    // invocations instead.
    let same_method = p1 == p2;

    let mut seen_traces = HashSet::new();
    let mut success = false;

    for expr in table.values() {
        if success {
            break;
        }
        if same_method {
            let mut nodes: Vec<&CallNode> = Vec::new();
            expr.for_each_call_node(&mut |node| {
                if node.method.pattern() == p1 {
                    nodes.push(node);
                }
            });
            for i in 0..nodes.len() {
                if success {
                    break;
                }
                for j in 0..nodes.len() {
                    if i == j {
                        continue;
                    }
                    let (a, b) = (nodes[i], nodes[j]);
                    if std::ptr::eq(a, b) || !call_nodes_overlap(a, b) {
                        continue;
                    }
                    let (a_trace, b_trace) = (a.trace(), b.trace());
                    let key = format!("{}|{}", a_trace, b_trace);
                    if !seen_traces.insert(key) {
                        continue;
                    }
                    let block1 = extract_args_block_for(&a_trace, &p1).unwrap_or("");
                    let block2 = extract_args_block_for(&b_trace, &p2).unwrap_or("");
                    let (satisfied, _matched) = keywords_satisfied_blocks(
                        block1,
                        block2,
                        &rule.keywords,
                        rule.keyword_mode,
                    );
                    if satisfied {
                        success = true;
                        break;
                    }
                }
            }
        } else {
            expr.for_each_call_node(&mut |node| {
                if success {
                    return;
                }
                let trace = node.trace();
                if !seen_traces.insert(trace.clone()) {
                    return;
                }
                if !(trace.contains(&p1) && trace.contains(&p2)) {
                    return;
                }
                let (satisfied, _matched) =
                    keywords_satisfied(&trace, &p1, &p2, &rule.keywords, rule.keyword_mode);
                if satisfied {
                    success = true;
                }
            });
        }
    }

    if success {
        analysis.record_evidence(Evidence {
            parent: ancestor.clone(),
            first_call: m1.clone(),
            second_call: m2.clone(),
            first_api: rule.first_api(),
            second_api: rule.second_api(),
            crime: rule.crime.clone(),
        });
        if let Some(smali) = apk.get_wrapper_smali(ancestor, m1, m2) {
            analysis.record_wrapper_smali(ancestor.pattern(), smali);
        }
    }

    success
}

/// Drive the five-stage check for one rule against one application,
/// returning the highest confidence reached (spec.md §4.4) and
/// accumulating evidence/score into `analysis`.
pub fn match_rule(
    apk: &dyn ApkInfo,
    rule: &Rule,
    analysis: &mut QuarkAnalysis,
    config: MatcherConfig,
) -> Confidence {
    let confidence = match_rule_inner(apk, rule, analysis, config);
    // "Encountered" (spec.md §4.6 `permissions`) means the rule resolved
    // to at least some evidence of presence, not merely that it was
    // loaded — a rule whose APIs don't even resolve in this application
    // contributes nothing to the permission set.
    if confidence > Confidence::ZERO {
        analysis.add_permissions(rule.permission.iter().cloned());
    }
    analysis.add_weighted_score(rule.score, confidence);
    confidence
}

fn match_rule_inner(
    apk: &dyn ApkInfo,
    rule: &Rule,
    analysis: &mut QuarkAnalysis,
    config: MatcherConfig,
) -> Confidence {
    let api1 = rule.first_api();
    let api2 = rule.second_api();

    // Stage 1: both rule APIs resolve.
    let candidates1 = find_api_usage(apk, &api1);
    let candidates2 = find_api_usage(apk, &api2);
    if candidates1.is_empty() || candidates2.is_empty() {
        log::trace!("{}: stage 1 failed, an API never resolves", rule.crime);
        return Confidence::ZERO;
    }

    // Stage 2: either API is actually invoked anywhere.
    let invoked = candidates1
        .iter()
        .chain(candidates2.iter())
        .any(|m| !apk.upperfunc(m).is_empty());
    if !invoked {
        log::debug!("{}: stage 1 only, neither API is ever called", rule.crime);
        return Confidence::STAGE1;
    }

    let callers1: HashSet<MethodRef> = candidates1.iter().flat_map(|m| apk.upperfunc(m)).collect();
    let callers2: HashSet<MethodRef> = candidates2.iter().flat_map(|m| apk.upperfunc(m)).collect();
    if callers1.is_empty() || callers2.is_empty() {
        log::debug!("{}: stage 2 only, one API has no caller", rule.crime);
        return Confidence::STAGE2;
    }

    // Stage 3: a direct common caller, or a one-hop "triangle" ancestor.
    // Clamped by the caller's search bound so `max_search_layer = 0`
    // degrades this to direct-caller-only matching (spec.md §8 boundary).
    let stage3_layer = config.max_search_layer.min(1);
    let stage3 = find_intersection(apk, &callers1, &callers2, stage3_layer);
    if !matches!(stage3, Ok(Some(_))) {
        log::debug!("{}: stage 2 only, no nearby common caller", rule.crime);
        return Confidence::STAGE2;
    }

    // Stage 4: a common ancestor within the full search bound.
    let ancestors = match find_intersection(apk, &callers1, &callers2, config.max_search_layer) {
        Ok(Some(set)) => set,
        Ok(None) | Err(_) => {
            log::debug!(
                "{}: stage 3 only, no common ancestor within {} layers",
                rule.crime,
                config.max_search_layer
            );
            return Confidence::STAGE3;
        }
    };

    // Stage 5: shared parameter lineage in at least one ancestor.
    let mut any_stage5 = false;
    for (m1, m2, ancestor) in itertools::iproduct!(&candidates1, &candidates2, &ancestors) {
        if check_parameter(apk, rule, m1, m2, ancestor, analysis) {
            any_stage5 = true;
        }
    }

    if any_stage5 {
        log::trace!("{}: stage 5, shared parameter lineage found", rule.crime);
        Confidence::STAGE5
    } else {
        log::debug!("{}: stage 4 only, no shared parameter lineage", rule.crime);
        Confidence::STAGE4
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::instruction::{Instruction, Operand};
    use crate::rule::ApiSpec;
    use crate::testing::FakeApkInfo;

    fn api(class: &str, method: &str, descriptor: &str) -> ApiSpec {
        ApiSpec {
            class: class.into(),
            method: method.into(),
            descriptor: descriptor.into(),
        }
    }

    fn sms_loc_rule(score: u32, keywords: Option<[Option<Vec<String>>; 2]>) -> Rule {
        Rule {
            crime: "leak location over SMS".into(),
            permission: vec!["android.permission.SEND_SMS".into()],
            api: [
                api(
                    "Landroid/telephony/SmsManager;",
                    "sendTextMessage",
                    "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Landroid/app/PendingIntent;Landroid/app/PendingIntent;)V",
                ),
                api(
                    "Landroid/location/LocationManager;",
                    "getLastKnownLocation",
                    "(Ljava/lang/String;)Landroid/location/Location;",
                ),
            ],
            score,
            label: vec!["location".into(), "sms".into()],
            keywords,
            keyword_mode: KeywordMode::Literal,
        }
    }

    #[test]
    fn test_confidence_only_takes_valid_values() {
        assert!(Confidence::from_percent(50).is_none());
        assert_eq!(Confidence::from_percent(80).unwrap().as_percent(), 80);
    }

    #[rstest::rstest]
    #[case(0, true)]
    #[case(20, true)]
    #[case(40, true)]
    #[case(60, true)]
    #[case(80, true)]
    #[case(100, true)]
    #[case(10, false)]
    #[case(99, false)]
    #[case(255, false)]
    fn test_confidence_table(#[case] percent: u8, #[case] valid: bool) {
        assert_eq!(Confidence::from_percent(percent).is_some(), valid);
    }

    #[test]
    fn test_extract_balanced_paren_block_handles_nesting() {
        let s = "Lc;->d(La;->b(Lx;->y()V)Ljava/lang/String;)V";
        let idx = s.find('(').unwrap();
        let inner = extract_balanced_paren_block(s, idx).unwrap();
        assert_eq!(inner, "La;->b(Lx;->y()V)Ljava/lang/String;");
    }

    #[test]
    fn test_stage0_unresolved_api() {
        let apk = FakeApkInfo::new();
        let mut analysis = QuarkAnalysis::new();
        let rule = sms_loc_rule(5, None);
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::ZERO);
        assert!(analysis.evidence().is_empty());
    }

    #[test]
    fn test_scenario_a_direct_sibling_calls() {
        let rule = sms_loc_rule(5, None);
        let loc = rule.second_api();
        let sms = rule.first_api();

        let mut apk = FakeApkInfo::new();
        apk.add_method(loc.clone());
        apk.add_method(sms.clone());
        let leak = MethodRef::new("Lx/X;", "leak", "()V");
        apk.set_bytecode(
            leak.clone(),
            vec![
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v2".into()],
                    Some(Operand::Method(loc.clone())),
                ),
                Instruction::new("move-result-object", vec!["v1".into()], None),
                Instruction::new(
                    "invoke-virtual",
                    vec![
                        "v0".into(),
                        "v3".into(),
                        "v1".into(),
                        "v4".into(),
                        "v5".into(),
                        "v6".into(),
                    ],
                    Some(Operand::Method(sms.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE5);
        assert_eq!(analysis.evidence().len(), 1);
        assert_eq!(analysis.evidence()[0].parent, leak);
    }

    #[test]
    fn test_scenario_b_shared_ancestor_one_hop_up() {
        let rule = sms_loc_rule(5, None);
        let loc = rule.second_api();
        let sms = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let read_loc = MethodRef::new("Lx/X;", "readLoc", "()Ljava/lang/String;");
        apk.set_bytecode(
            read_loc.clone(),
            vec![
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v1".into()],
                    Some(Operand::Method(loc.clone())),
                ),
                Instruction::new("move-result-object", vec!["v2".into()], None),
            ],
        );
        let send_sms = MethodRef::new("Lx/X;", "sendSms", "(Ljava/lang/String;)V");
        apk.set_bytecode(
            send_sms.clone(),
            vec![Instruction::new(
                "invoke-virtual",
                vec![
                    "v0".into(),
                    "v2".into(),
                    "v3".into(),
                    "v4".into(),
                    "v5".into(),
                    "v6".into(),
                ],
                Some(Operand::Method(sms.clone())),
            )],
        );
        let run = MethodRef::new("Lx/X;", "run", "()V");
        apk.set_bytecode(
            run.clone(),
            vec![
                Instruction::new(
                    "invoke-direct",
                    vec!["v0".into()],
                    Some(Operand::Method(read_loc.clone())),
                ),
                Instruction::new("move-result-object", vec!["v1".into()], None),
                Instruction::new(
                    "invoke-direct",
                    vec!["v0".into(), "v1".into()],
                    Some(Operand::Method(send_sms.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE5);
        assert_eq!(analysis.evidence()[0].parent, run);
    }

    #[test]
    fn test_scenario_c_co_located_no_shared_parameter() {
        let rule = sms_loc_rule(5, None);
        let loc = rule.second_api();
        let sms = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let unrelated = MethodRef::new("Lx/X;", "unrelated", "()V");
        apk.set_bytecode(
            unrelated.clone(),
            vec![
                Instruction::new(
                    "const-string",
                    vec!["v1".into()],
                    Some(Operand::String("gps".into())),
                ),
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v1".into()],
                    Some(Operand::Method(loc.clone())),
                ),
                Instruction::new(
                    "const-string",
                    vec!["v2".into()],
                    Some(Operand::String("const body".into())),
                ),
                Instruction::new(
                    "const-string",
                    vec!["v3".into()],
                    Some(Operand::String("const dest".into())),
                ),
                Instruction::new(
                    "invoke-virtual",
                    vec![
                        "v0".into(),
                        "v3".into(),
                        "v2".into(),
                        "v4".into(),
                        "v5".into(),
                        "v6".into(),
                    ],
                    Some(Operand::Method(sms.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE4);
        assert!(analysis.evidence().is_empty());
        assert!(analysis.wrapper_smali(&unrelated.pattern()).is_none());
    }

    #[test]
    fn test_scenario_e_keyword_constraint() {
        let rule = sms_loc_rule(5, Some([Some(vec!["http://".into()]), None]));
        let loc = rule.second_api();
        let sms = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let leak = MethodRef::new("Lx/X;", "leak", "()V");
        apk.set_bytecode(
            leak.clone(),
            vec![
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v2".into()],
                    Some(Operand::Method(loc.clone())),
                ),
                Instruction::new("move-result-object", vec!["v1".into()], None),
                Instruction::new(
                    "const-string",
                    vec!["v7".into()],
                    Some(Operand::String("http://evil".into())),
                ),
                Instruction::new(
                    "invoke-virtual",
                    vec![
                        "v0".into(),
                        "v3".into(),
                        "v7".into(),
                        "v4".into(),
                        "v5".into(),
                        "v6".into(),
                    ],
                    Some(Operand::Method(sms.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE5);
        assert_eq!(analysis.evidence().len(), 1);
    }

    #[test]
    fn test_scenario_e_keyword_absent_fails_stage5() {
        let rule = sms_loc_rule(5, Some([Some(vec!["http://".into()]), None]));
        let loc = rule.second_api();
        let sms = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let leak = MethodRef::new("Lx/X;", "leak", "()V");
        apk.set_bytecode(
            leak.clone(),
            vec![
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v2".into()],
                    Some(Operand::Method(loc.clone())),
                ),
                Instruction::new("move-result-object", vec!["v1".into()], None),
                Instruction::new(
                    "const-string",
                    vec!["v7".into()],
                    Some(Operand::String("not a url".into())),
                ),
                Instruction::new(
                    "invoke-virtual",
                    vec![
                        "v0".into(),
                        "v3".into(),
                        "v7".into(),
                        "v4".into(),
                        "v5".into(),
                        "v6".into(),
                    ],
                    Some(Operand::Method(sms.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE4);
    }

    /// spec.md §8 boundary: a rule whose two target APIs are the same
    /// method must not match off a single call node — it needs at least
    /// two distinct, overlapping invocations.
    #[test]
    fn test_identical_apis_require_two_overlapping_calls() {
        let write_log = api("Lx/X;", "writeLog", "(Ljava/lang/String;)V");
        let rule = Rule {
            crime: "writes the same log call twice".into(),
            permission: vec![],
            api: [write_log.clone(), write_log.clone()],
            score: 5,
            label: vec![],
            keywords: None,
            keyword_mode: KeywordMode::Literal,
        };
        let write_log = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let report = MethodRef::new("Lx/X;", "report", "()V");
        apk.set_bytecode(
            report.clone(),
            vec![
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v1".into()],
                    Some(Operand::Method(write_log.clone())),
                ),
                Instruction::new("move-result-object", vec!["v2".into()], None),
                // second call's argument is the first call's own result,
                // so the two invocations show overlapping data flow.
                Instruction::new(
                    "invoke-virtual",
                    vec!["v0".into(), "v2".into()],
                    Some(Operand::Method(write_log.clone())),
                ),
            ],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE5);
        assert_eq!(analysis.evidence().len(), 1);
        assert_eq!(analysis.evidence()[0].parent, report);
    }

    #[test]
    fn test_identical_apis_single_call_caps_at_stage4() {
        let write_log = api("Lx/X;", "writeLog", "(Ljava/lang/String;)V");
        let rule = Rule {
            crime: "writes the same log call once".into(),
            permission: vec![],
            api: [write_log.clone(), write_log.clone()],
            score: 5,
            label: vec![],
            keywords: None,
            keyword_mode: KeywordMode::Literal,
        };
        let write_log = rule.first_api();

        let mut apk = FakeApkInfo::new();
        let report = MethodRef::new("Lx/X;", "report", "()V");
        apk.set_bytecode(
            report.clone(),
            vec![Instruction::new(
                "invoke-virtual",
                vec!["v0".into(), "v1".into()],
                Some(Operand::Method(write_log.clone())),
            )],
        );

        let mut analysis = QuarkAnalysis::new();
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert_eq!(confidence, Confidence::STAGE4);
        assert!(analysis.evidence().is_empty());
    }

    #[test]
    fn test_scenario_d_subclass_resolution() {
        // Rule names an abstract parent; the app only implements a
        // subclass override.
        let mut rule = sms_loc_rule(5, None);
        rule.api[1] = api(
            "Lcom/example/AbstractLocator;",
            "getLastKnownLocation",
            "(Ljava/lang/String;)Landroid/location/Location;",
        );

        let mut apk = FakeApkInfo::new();
        apk.add_super(
            ClassName::from("Lcom/example/ConcreteLocator;"),
            ClassName::from("Lcom/example/AbstractLocator;"),
        );
        let concrete_impl = MethodRef::new(
            "Lcom/example/ConcreteLocator;",
            "getLastKnownLocation",
            "(Ljava/lang/String;)Landroid/location/Location;",
        );
        apk.add_method(concrete_impl.clone());
        apk.add_method(rule.first_api());

        let candidates = find_api_usage(&apk, &rule.second_api());
        assert_eq!(candidates, vec![concrete_impl]);
    }

    #[test]
    fn test_invariant_confidence_always_valid_value() {
        let apk = FakeApkInfo::new();
        let mut analysis = QuarkAnalysis::new();
        let rule = sms_loc_rule(5, None);
        let confidence = match_rule(&apk, &rule, &mut analysis, MatcherConfig::default());
        assert!(Confidence::from_percent(confidence.as_percent()).is_some());
    }
}
