use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use quark_core::{MatcherConfig, QuarkAnalysis, RuleRegistry};

use crate::fixture;

#[derive(Args)]
pub struct Analyze {
    /// Directory of rule `*.json` files (spec.md §6).
    #[arg(long)]
    rules: PathBuf,

    /// JSON call-graph fixture standing in for a parsed APK.
    #[arg(long)]
    apk: PathBuf,

    /// Confidences at or above this threshold are printed; everything
    /// still contributes to the weighted sum regardless (spec.md §6
    /// "suppression is caller-defined").
    #[arg(long, default_value_t = 20)]
    confidence_threshold: u8,

    /// Upward call-graph search bound for stages 3/4 (spec.md §6
    /// `MAX_SEARCH_LAYER`).
    #[arg(long, default_value_t = quark_core::MAX_SEARCH_LAYER)]
    max_search_layer: usize,
}

impl Analyze {
    pub fn run(&self) -> anyhow::Result<()> {
        let registry = RuleRegistry::load_dir(&self.rules)
            .with_context(|| format!("loading rules from {}", self.rules.display()))?;
        if registry.is_empty() {
            log::warn!("no rules loaded from {}", self.rules.display());
        }

        let apk = fixture::load(&self.apk)
            .with_context(|| format!("loading apk fixture {}", self.apk.display()))?;

        let config = MatcherConfig {
            max_search_layer: self.max_search_layer,
        };
        let mut analysis = QuarkAnalysis::new();
        let results = quark_core::run_analysis(&apk, &registry, &mut analysis, config);

        println!("{:<50} {:>5}", "crime", "confidence");
        for (rule, confidence) in &results {
            if confidence.as_percent() < self.confidence_threshold {
                continue;
            }
            println!("{:<50} {:>4}%", rule.crime, confidence.as_percent());
        }

        println!();
        println!("weighted score: {:.2}", analysis.weighted_sum());
        if !analysis.permissions().is_empty() {
            let mut perms: Vec<&String> = analysis.permissions().iter().collect();
            perms.sort();
            println!("permissions encountered:");
            for p in perms {
                println!("  {}", p);
            }
        }

        Ok(())
    }
}
