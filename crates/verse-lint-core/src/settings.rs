//! Per-document settings.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default cap on reported problems.
pub const DEFAULT_MAX_NUMBER_OF_PROBLEMS: usize = 1000;

/// Default completion strategy identifier.
pub const DEFAULT_PREDICTOR_TYPE: &str = "cmudict";

/// Default Gemini model.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for completion service requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Whether parsed poems are cached between diagnostics runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum CachingStrategy {
    /// Keep the last parse per document version.
    #[default]
    Eager,
    /// Parse on every request.
    Lazy,
}

impl CachingStrategy {
    /// Configuration spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Eager => "eager",
            Self::Lazy => "lazy",
        }
    }
}

/// Settings that apply to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DocumentSettings {
    /// Report every problem instead of stopping at the cap.
    pub show_all_errors: bool,
    /// Cap on reported problems.
    pub max_number_of_problems: usize,
    /// Parse caching.
    pub caching: CachingStrategy,
    /// Completion strategy identifier.
    pub predictor_type: String,
    /// Gemini API key.
    #[serde(skip_serializing)]
    pub gemini_api_key: Option<String>,
    /// Gemini model name.
    pub gemini_model: String,
    /// Timeout for completion service requests, in seconds.
    pub request_timeout_secs: u64,
    /// Checks to run. `None` runs all.
    pub checks: Option<Vec<String>>,
    /// Checks to skip.
    pub exclude: Option<Vec<String>>,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            show_all_errors: false,
            max_number_of_problems: DEFAULT_MAX_NUMBER_OF_PROBLEMS,
            caching: CachingStrategy::Eager,
            predictor_type: DEFAULT_PREDICTOR_TYPE.to_string(),
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            checks: None,
            exclude: None,
        }
    }
}

/// Partial settings from a path rule. Set fields replace the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SettingsOverride {
    /// See [`DocumentSettings::show_all_errors`].
    pub show_all_errors: Option<bool>,
    /// See [`DocumentSettings::max_number_of_problems`].
    pub max_number_of_problems: Option<usize>,
    /// See [`DocumentSettings::caching`].
    pub caching: Option<CachingStrategy>,
    /// See [`DocumentSettings::predictor_type`].
    pub predictor_type: Option<String>,
    /// See [`DocumentSettings::gemini_model`].
    pub gemini_model: Option<String>,
    /// See [`DocumentSettings::checks`].
    pub checks: Option<Vec<String>>,
    /// See [`DocumentSettings::exclude`].
    pub exclude: Option<Vec<String>>,
}

impl DocumentSettings {
    /// Apply every field set in `patch`.
    pub fn apply(&mut self, patch: &SettingsOverride) {
        if let Some(v) = patch.show_all_errors {
            self.show_all_errors = v;
        }
        if let Some(v) = patch.max_number_of_problems {
            self.max_number_of_problems = v;
        }
        if let Some(v) = patch.caching {
            self.caching = v;
        }
        if let Some(v) = &patch.predictor_type {
            self.predictor_type.clone_from(v);
        }
        if let Some(v) = &patch.gemini_model {
            self.gemini_model.clone_from(v);
        }
        if patch.checks.is_some() {
            self.checks.clone_from(&patch.checks);
        }
        if patch.exclude.is_some() {
            self.exclude.clone_from(&patch.exclude);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = DocumentSettings::default();
        assert!(!s.show_all_errors);
        assert_eq!(s.max_number_of_problems, 1000);
        assert_eq!(s.caching, CachingStrategy::Eager);
        assert_eq!(s.predictor_type, "cmudict");
        assert_eq!(s.gemini_model, "gemini-1.5-flash");
    }

    #[test]
    fn apply_only_touches_set_fields() {
        let mut s = DocumentSettings::default();
        s.apply(&SettingsOverride {
            caching: Some(CachingStrategy::Lazy),
            checks: Some(vec!["unknown_words".to_string()]),
            ..Default::default()
        });
        assert_eq!(s.caching, CachingStrategy::Lazy);
        assert_eq!(s.checks.as_deref(), Some(&["unknown_words".to_string()][..]));
        assert_eq!(s.max_number_of_problems, 1000);
        assert_eq!(s.predictor_type, "cmudict");
    }

    #[test]
    fn api_key_is_never_serialized() {
        let s = DocumentSettings {
            gemini_api_key: Some("secret".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&s).unwrap();
        assert!(!json.contains("secret"));
    }
}
