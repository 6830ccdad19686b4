//! Line completion strategies.
//!
//! Strategies are registered by identifier in [`PREDICTORS`]. A
//! [`PredictorFactory`] keeps one constructed [`Predictor`] and hands it out
//! until a request names a different identifier or the factory is
//! invalidated.

pub mod dictionary;
pub mod generative;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

pub use dictionary::DictionaryPredictor;
pub use generative::GenerativePredictor;

use crate::dictionary::DictionaryHandle;
use crate::error::{PredictionError, PredictionResult};
use crate::settings::DocumentSettings;
use crate::text::{Position, TextDocument};

/// What a candidate inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CandidateKind {
    /// Plain text.
    Text,
}

/// One suggested completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CompletionCandidate {
    /// Text to insert.
    pub label: String,
    /// Kind tag.
    pub kind: CandidateKind,
    /// Position in the strategy's result list.
    pub data: usize,
    /// Short detail, filled by [`resolve`](Self::resolve).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Longer documentation, filled by [`resolve`](Self::resolve).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
}

impl CompletionCandidate {
    /// A text candidate at position `data`.
    pub fn text(label: impl Into<String>, data: usize) -> Self {
        Self {
            label: label.into(),
            kind: CandidateKind::Text,
            data,
            detail: None,
            documentation: None,
        }
    }

    /// Fill in detail and documentation.
    #[must_use]
    pub fn resolve(mut self) -> Self {
        self.detail = Some("verse-lint suggestion".to_string());
        self.documentation = Some(format!("Suggestion #{} for completing this line.", self.data + 1));
        self
    }
}

/// Registered strategy families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictorKind {
    /// Rhymes for the endings of the previous lines.
    Dictionary,
    /// Suggestions from the Gemini API.
    Generative,
}

/// Identifier to strategy table.
pub const PREDICTORS: &[(&str, PredictorKind)] = &[
    ("cmudict", PredictorKind::Dictionary),
    ("gemini", PredictorKind::Generative),
];

impl PredictorKind {
    /// Registered identifier.
    pub fn as_str(self) -> &'static str {
        PREDICTORS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("unknown", |(name, _)| name)
    }
}

impl fmt::Display for PredictorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictorKind {
    type Err = PredictionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PREDICTORS
            .iter()
            .find(|(name, _)| *name == s)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| PredictionError::UnknownPredictor {
                name: s.to_string(),
                available: PREDICTORS
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// A constructed completion strategy.
#[derive(Debug)]
pub enum Predictor {
    /// Dictionary rhymes.
    Dictionary(DictionaryPredictor),
    /// Generative service.
    Generative(GenerativePredictor),
}

impl Predictor {
    /// Construct the strategy for `kind`.
    ///
    /// The dictionary strategy waits for the shared dictionary build.
    pub async fn create(
        kind: PredictorKind,
        settings: &DocumentSettings,
        dictionary: &Arc<DictionaryHandle>,
    ) -> PredictionResult<Self> {
        match kind {
            PredictorKind::Dictionary => Ok(Self::Dictionary(DictionaryPredictor::new(
                dictionary.get().await?,
            ))),
            PredictorKind::Generative => Ok(Self::Generative(GenerativePredictor::new(
                settings,
                Arc::clone(dictionary),
            )?)),
        }
    }

    /// Which strategy this is.
    pub const fn kind(&self) -> PredictorKind {
        match self {
            Self::Dictionary(_) => PredictorKind::Dictionary,
            Self::Generative(_) => PredictorKind::Generative,
        }
    }

    /// Ranked completions at `position`. The document text is read once.
    pub async fn predict<D>(
        &self,
        position: Position,
        document: &D,
    ) -> PredictionResult<Vec<CompletionCandidate>>
    where
        D: TextDocument + Sync + ?Sized,
    {
        let text = document.text();
        match self {
            Self::Dictionary(p) => p.predict(position, &text).await,
            Self::Generative(p) => p.predict(position, &text).await,
        }
    }
}

/// Holds the one cached strategy instance.
#[derive(Debug)]
pub struct PredictorFactory {
    dictionary: Arc<DictionaryHandle>,
    slot: Mutex<Option<(PredictorKind, Arc<Predictor>)>>,
}

impl PredictorFactory {
    /// A factory whose strategies share `dictionary`.
    pub fn new(dictionary: Arc<DictionaryHandle>) -> Self {
        Self {
            dictionary,
            slot: Mutex::new(None),
        }
    }

    /// The strategy for `settings.predictor_type`, reusing the cached one
    /// when the identifier matches.
    ///
    /// An unknown identifier fails without touching the cache. Callers
    /// holding a replaced instance can keep using it.
    #[tracing::instrument(skip_all, fields(predictor = %settings.predictor_type))]
    pub async fn get(&self, settings: &DocumentSettings) -> PredictionResult<Arc<Predictor>> {
        let kind: PredictorKind = settings.predictor_type.parse()?;
        let mut slot = self.slot.lock().await;
        if let Some((cached, predictor)) = slot.as_ref()
            && *cached == kind
        {
            return Ok(Arc::clone(predictor));
        }
        tracing::debug!("constructing predictor");
        let predictor = Arc::new(Predictor::create(kind, settings, &self.dictionary).await?);
        *slot = Some((kind, Arc::clone(&predictor)));
        Ok(predictor)
    }

    /// Drop the cached strategy.
    pub async fn invalidate(&self) {
        if self.slot.lock().await.take().is_some() {
            tracing::debug!("predictor cache invalidated");
        }
    }
}
