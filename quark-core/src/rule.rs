//! Rule model & registry (spec.md §4.5/§6, C5).
//!
//! Rules are loaded from a directory of JSON documents the way `dtu`'s
//! `Config` loads a directory of TOML documents (`dtu/src/config.rs`):
//! one file, one document, validated on load. A malformed file is
//! logged and skipped (`Error::MalformedRule`, spec.md §7), it does not
//! fail the whole registry load.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::method::MethodRef;

/// One target API entry in a rule's `api` pair.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiSpec {
    pub class: String,
    pub method: String,
    pub descriptor: String,
}

impl ApiSpec {
    pub fn to_method_ref(&self) -> MethodRef {
        MethodRef::new(self.class.clone(), self.method.clone(), self.descriptor.clone())
    }
}

/// Whether a stage-5 keyword is matched literally or as a regex
/// (spec.md §4.4 "Stage-5 detail").
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMode {
    Literal,
    Regex,
}

impl Default for KeywordMode {
    fn default() -> Self {
        KeywordMode::Literal
    }
}

/// One rule document (spec.md §6 "Rule file").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rule {
    pub crime: String,
    #[serde(default)]
    pub permission: Vec<String>,
    pub api: [ApiSpec; 2],
    pub score: u32,
    #[serde(default)]
    pub label: Vec<String>,
    /// Per spec.md §6: `[null | [keywords...], null | [keywords...]]`.
    #[serde(default)]
    pub keywords: Option<[Option<Vec<String>>; 2]>,
    /// Whether `keywords` entries are literal substrings or regexes.
    /// Not part of the original JSON shape in spec.md §6, but needed to
    /// drive stage 5's `regex` flag (spec.md §4.4 step 5); defaults to
    /// literal matching when omitted.
    #[serde(default)]
    pub keyword_mode: KeywordMode,
}

impl Rule {
    pub fn first_api(&self) -> MethodRef {
        self.api[0].to_method_ref()
    }

    pub fn second_api(&self) -> MethodRef {
        self.api[1].to_method_ref()
    }

    /// Validate the invariants spec.md §4.5 requires beyond what serde's
    /// shape already enforces: `score` must be positive.
    pub fn validate(&self, source: &str) -> Result<(), Error> {
        if self.score == 0 {
            return Err(Error::MalformedRule(
                source.to_string(),
                "score must be a positive integer".to_string(),
            ));
        }
        if self.crime.trim().is_empty() {
            return Err(Error::MalformedRule(
                source.to_string(),
                "crime must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn from_json(source: &str, text: &str) -> Result<Self, Error> {
        let rule: Rule = serde_json::from_str(text)
            .map_err(|e| Error::MalformedRule(source.to_string(), e.to_string()))?;
        rule.validate(source)?;
        Ok(rule)
    }
}

/// A loaded, validated set of rules, grouped for registry-level queries
/// (spec.md §2 C5 "group by crime/label").
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Rule>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Load every `*.json` file directly inside `dir`. Malformed files are
    /// logged via `log::warn!` and skipped; the load as a whole only
    /// fails if `dir` itself can't be read.
    pub fn load_dir(dir: &Path) -> std::io::Result<Self> {
        let mut rules = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let display = path.display().to_string();
            let text = match fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("skipping unreadable rule file {}: {}", display, e);
                    continue;
                }
            };
            match Rule::from_json(&display, &text) {
                Ok(rule) => rules.push(rule),
                Err(e) => log::warn!("{}", e),
            }
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn by_crime(&self) -> HashMap<&str, Vec<&Rule>> {
        let mut groups: HashMap<&str, Vec<&Rule>> = HashMap::new();
        for rule in &self.rules {
            groups.entry(rule.crime.as_str()).or_default().push(rule);
        }
        groups
    }

    pub fn by_label(&self) -> HashMap<&str, Vec<&Rule>> {
        let mut groups: HashMap<&str, Vec<&Rule>> = HashMap::new();
        for rule in &self.rules {
            for label in &rule.label {
                groups.entry(label.as_str()).or_default().push(rule);
            }
        }
        groups
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const VALID_RULE: &str = r#"{
        "crime": "Send SMS and leak location",
        "permission": ["android.permission.SEND_SMS"],
        "api": [
            {"class": "Landroid/telephony/SmsManager;", "method": "sendTextMessage", "descriptor": "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Landroid/app/PendingIntent;Landroid/app/PendingIntent;)V"},
            {"class": "Landroid/location/LocationManager;", "method": "getLastKnownLocation", "descriptor": "(Ljava/lang/String;)Landroid/location/Location;"}
        ],
        "score": 5,
        "label": ["location", "sms"]
    }"#;

    #[test]
    fn test_parses_valid_rule() {
        let rule = Rule::from_json("test.json", VALID_RULE).unwrap();
        assert_eq!(rule.crime, "Send SMS and leak location");
        assert_eq!(rule.score, 5);
        assert!(rule.keywords.is_none());
        assert_eq!(
            rule.first_api().pattern(),
            "Landroid/telephony/SmsManager;->sendTextMessage(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Landroid/app/PendingIntent;Landroid/app/PendingIntent;)V"
        );
    }

    #[test]
    fn test_rejects_zero_score() {
        let text = VALID_RULE.replace("\"score\": 5", "\"score\": 0");
        let err = Rule::from_json("bad.json", &text).unwrap_err();
        assert!(matches!(err, Error::MalformedRule(_, _)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Rule::from_json("bad.json", "{not json").unwrap_err();
        assert!(matches!(err, Error::MalformedRule(_, _)));
    }

    #[test]
    fn test_keywords_optional_and_nullable() {
        let text = VALID_RULE.replace(
            "\"label\": [\"location\", \"sms\"]",
            "\"label\": [\"location\", \"sms\"], \"keywords\": [[\"http://\"], null]",
        );
        let rule = Rule::from_json("test.json", &text).unwrap();
        let keywords = rule.keywords.expect("keywords present");
        assert_eq!(keywords[0], Some(vec!["http://".to_string()]));
        assert_eq!(keywords[1], None);
    }

    #[test]
    fn test_registry_groups_by_crime_and_label() {
        let rule = Rule::from_json("test.json", VALID_RULE).unwrap();
        let registry = RuleRegistry::from_rules(vec![rule]);
        assert_eq!(registry.by_crime().len(), 1);
        assert_eq!(registry.by_label()["location"].len(), 1);
        assert_eq!(registry.by_label()["sms"].len(), 1);
    }
}
