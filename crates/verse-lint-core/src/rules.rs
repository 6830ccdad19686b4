//! Rule resolution engine.
//!
//! Matches document paths against configured glob rules. Every matching
//! rule contributes its settings. When two rules set the same field, the
//! pattern with more literal (non-wildcard) path segments wins. Ties go to
//! the earlier rule.

use globset::{Glob, GlobMatcher};

use crate::config::Rule;
use crate::settings::{DocumentSettings, SettingsOverride};

/// Compiled rule set for efficient matching.
#[derive(Debug, Default)]
pub struct RuleSet {
    compiled: Vec<CompiledRule>,
}

/// A single rule with pre-compiled glob matchers.
#[derive(Debug)]
struct CompiledRule {
    matchers: Vec<(GlobMatcher, usize)>, // (matcher, specificity)
    settings: SettingsOverride,
}

/// Count literal (non-wildcard) path segments in a glob pattern.
///
/// `poems/sonnets/*.txt` → 2 (`poems`, `sonnets`)
/// `poems/**/*.txt` → 1 (`poems`)
/// `**/*.txt` → 0
fn specificity(pattern: &str) -> usize {
    pattern
        .split('/')
        .filter(|seg| !seg.contains('*') && !seg.contains('?') && !seg.contains('['))
        .count()
}

impl RuleSet {
    /// Compile a list of rules into a `RuleSet`.
    ///
    /// Invalid glob patterns are skipped with a tracing warning.
    pub fn compile(rules: &[Rule]) -> Self {
        let compiled = rules
            .iter()
            .filter_map(|rule| {
                let matchers: Vec<(GlobMatcher, usize)> = rule
                    .paths
                    .iter()
                    .filter_map(|pattern| match Glob::new(pattern) {
                        Ok(glob) => Some((glob.compile_matcher(), specificity(pattern))),
                        Err(e) => {
                            tracing::warn!(pattern, error = %e, "skipping invalid glob pattern");
                            None
                        }
                    })
                    .collect();
                (!matchers.is_empty()).then(|| CompiledRule {
                    matchers,
                    settings: rule.settings.clone(),
                })
            })
            .collect();
        Self { compiled }
    }

    /// Number of usable rules.
    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    /// Returns `true` if no rule compiled.
    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// The overrides that apply to `path`, weakest first.
    ///
    /// Applying them in order leaves the most specific value for each field.
    pub fn matching(&self, path: &str) -> Vec<&SettingsOverride> {
        let mut matched: Vec<(usize, usize, &SettingsOverride)> = self
            .compiled
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                rule.matchers
                    .iter()
                    .filter(|(m, _)| m.is_match(path))
                    .map(|(_, s)| *s)
                    .max()
                    .map(|spec| (spec, index, &rule.settings))
            })
            .collect();
        // Lower specificity first; among equals the earlier rule goes last so it wins.
        matched.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        matched.into_iter().map(|(_, _, settings)| settings).collect()
    }

    /// `base` with every matching rule applied.
    pub fn resolve(&self, base: &DocumentSettings, path: &str) -> DocumentSettings {
        let mut settings = base.clone();
        for patch in self.matching(path) {
            settings.apply(patch);
        }
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::CachingStrategy;

    fn rule(paths: &[&str], settings: SettingsOverride) -> Rule {
        Rule {
            paths: paths.iter().map(|s| (*s).to_string()).collect(),
            settings,
        }
    }

    fn max_problems(n: usize) -> SettingsOverride {
        SettingsOverride {
            max_number_of_problems: Some(n),
            ..Default::default()
        }
    }

    #[test]
    fn specificity_counts_literal_segments() {
        assert_eq!(specificity("**/*.txt"), 0);
        assert_eq!(specificity("poems/**/*.txt"), 1);
        assert_eq!(specificity("poems/sonnets/*.txt"), 2);
        assert_eq!(specificity("README.md"), 1);
    }

    #[test]
    fn no_rules_leaves_base_untouched() {
        let set = RuleSet::compile(&[]);
        assert!(set.is_empty());
        let base = DocumentSettings::default();
        assert_eq!(set.resolve(&base, "anything.txt"), base);
    }

    #[test]
    fn no_match_leaves_base_untouched() {
        let set = RuleSet::compile(&[rule(&["poems/**/*.txt"], max_problems(5))]);
        let base = DocumentSettings::default();
        assert_eq!(set.resolve(&base, "src/main.rs"), base);
    }

    #[test]
    fn different_fields_accumulate() {
        let set = RuleSet::compile(&[
            rule(&["poems/**/*.txt"], max_problems(5)),
            rule(
                &["poems/drafts/*.txt"],
                SettingsOverride {
                    caching: Some(CachingStrategy::Lazy),
                    ..Default::default()
                },
            ),
        ]);
        let settings = set.resolve(&DocumentSettings::default(), "poems/drafts/ode.txt");
        assert_eq!(settings.max_number_of_problems, 5);
        assert_eq!(settings.caching, CachingStrategy::Lazy);
    }

    #[test]
    fn specific_rule_overrides_general_regardless_of_order() {
        let set = RuleSet::compile(&[
            rule(&["poems/sonnets/*.txt"], max_problems(12)),
            rule(&["poems/**/*.txt"], max_problems(8)),
        ]);
        let settings = set.resolve(&DocumentSettings::default(), "poems/sonnets/18.txt");
        assert_eq!(settings.max_number_of_problems, 12);
    }

    #[test]
    fn equal_specificity_earlier_rule_wins() {
        let set = RuleSet::compile(&[
            rule(&["poems/*.txt"], max_problems(8)),
            rule(&["poems/*.txt"], max_problems(12)),
        ]);
        let settings = set.resolve(&DocumentSettings::default(), "poems/ode.txt");
        assert_eq!(settings.max_number_of_problems, 8);
    }

    #[test]
    fn multiple_paths_in_single_rule() {
        let set = RuleSet::compile(&[rule(&["README.md", "poems/**/*.txt"], max_problems(1))]);
        assert_eq!(set.matching("README.md").len(), 1);
        assert_eq!(set.matching("poems/a/b.txt").len(), 1);
        assert!(set.matching("src/main.rs").is_empty());
    }

    #[test]
    fn invalid_glob_skipped_gracefully() {
        let set = RuleSet::compile(&[
            rule(&["[invalid", "poems/*.txt"], max_problems(2)),
            rule(&["[also-invalid"], max_problems(3)),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.resolve(&DocumentSettings::default(), "poems/ode.txt")
                .max_number_of_problems,
            2
        );
    }
}
