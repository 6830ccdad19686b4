//! Poem analysis.
//!
//! Each check is a [`DiagnosticStrategy`] in its own module, registered by
//! name in [`ALL_CHECKS`]. An [`Analyzer`] runs the enabled checks over a
//! [`ParsedPoem`] and drops any diagnostic whose range does not fit the poem.

pub mod diagnostic;
pub mod stressed_ending;
pub mod unknown_words;

use std::fmt;

pub use diagnostic::{Diagnostic, Severity};
pub use stressed_ending::StressedEnding;
pub use unknown_words::UnknownWords;

use crate::error::{ConfigError, ConfigResult};
use crate::poem::ParsedPoem;

/// A pure check over a parsed poem.
pub trait DiagnosticStrategy: Send + Sync {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Findings for `poem`. Lines without words or phonemes yield nothing.
    fn diagnose(&self, poem: &ParsedPoem) -> Vec<Diagnostic>;
}

type StrategyFactory = fn() -> Box<dyn DiagnosticStrategy>;

fn stressed_ending() -> Box<dyn DiagnosticStrategy> {
    Box::new(StressedEnding)
}

fn unknown_words() -> Box<dyn DiagnosticStrategy> {
    Box::new(UnknownWords)
}

const REGISTRY: &[(&str, StrategyFactory)] = &[
    (StressedEnding::NAME, stressed_ending),
    (UnknownWords::NAME, unknown_words),
];

/// All available check names.
pub const ALL_CHECKS: &[&str] = &[StressedEnding::NAME, UnknownWords::NAME];

fn unknown_check(name: &str) -> ConfigError {
    ConfigError::UnknownCheck {
        name: name.to_string(),
        available: ALL_CHECKS.join(", "),
    }
}

/// Resolve `checks` minus `exclude` to registered names, in registry order.
///
/// `None` for `checks` selects everything.
pub fn resolve_checks(
    checks: Option<&[String]>,
    exclude: Option<&[String]>,
) -> ConfigResult<Vec<&'static str>> {
    for name in checks.into_iter().flatten().chain(exclude.into_iter().flatten()) {
        if !ALL_CHECKS.contains(&name.as_str()) {
            return Err(unknown_check(name));
        }
    }
    if let (Some(checks), Some(exclude)) = (checks, exclude)
        && let Some(both) = checks.iter().find(|c| exclude.contains(c))
    {
        return Err(ConfigError::Conflicting(format!(
            "check {both} is both selected and excluded"
        )));
    }

    Ok(ALL_CHECKS
        .iter()
        .copied()
        .filter(|name| checks.is_none_or(|list| list.iter().any(|c| c.as_str() == *name)))
        .filter(|name| exclude.is_none_or(|list| list.iter().all(|c| c.as_str() != *name)))
        .collect())
}

/// Runs a set of checks and validates their output.
pub struct Analyzer {
    strategies: Vec<Box<dyn DiagnosticStrategy>>,
}

impl fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyzer")
            .field("checks", &self.names())
            .finish()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::with_strategies(REGISTRY.iter().map(|(_, make)| make()).collect())
    }
}

impl Analyzer {
    /// Analyzer over the checks selected by `checks` and `exclude`.
    pub fn new(checks: Option<&[String]>, exclude: Option<&[String]>) -> ConfigResult<Self> {
        let names = resolve_checks(checks, exclude)?;
        let strategies = REGISTRY
            .iter()
            .filter(|(name, _)| names.contains(name))
            .map(|(_, make)| make())
            .collect();
        Ok(Self::with_strategies(strategies))
    }

    /// Analyzer over an explicit list of strategies.
    pub fn with_strategies(strategies: Vec<Box<dyn DiagnosticStrategy>>) -> Self {
        Self { strategies }
    }

    /// Names of the enabled checks.
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run every enabled check and keep the well-formed diagnostics.
    #[tracing::instrument(skip_all, fields(lines = poem.len()))]
    pub fn analyze(&self, poem: &ParsedPoem) -> Vec<Diagnostic> {
        let diagnostics: Vec<Diagnostic> = self
            .strategies
            .iter()
            .flat_map(|strategy| strategy.diagnose(poem))
            .filter(|d| {
                let ok = d.is_well_formed(poem);
                if !ok {
                    tracing::debug!(check = %d.check, range = ?d.range, "dropping malformed diagnostic");
                }
                ok
            })
            .collect();
        tracing::debug!(count = diagnostics.len(), "analysis complete");
        diagnostics
    }
}

/// Truncate to `max` unless `show_all` is set.
pub fn cap_problems(mut diagnostics: Vec<Diagnostic>, show_all: bool, max: usize) -> Vec<Diagnostic> {
    if !show_all && diagnostics.len() > max {
        tracing::debug!(total = diagnostics.len(), max, "capping diagnostics");
        diagnostics.truncate(max);
    }
    diagnostics
}
