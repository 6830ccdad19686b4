//! Completions from the Gemini `generateContent` API.
//!
//! The request carries the lines around the cursor and, when the
//! pronunciation dictionary is available, the stress pattern of the lines
//! before it and rhymes for recent line endings. The response is
//! schema-constrained to a JSON array of `{ "completion": string }`.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::CompletionCandidate;
use super::dictionary::{LOOKBACK_LINES, preceding_line_endings};
use crate::dictionary::DictionaryHandle;
use crate::error::{DictionaryResult, PredictionError, PredictionResult};
use crate::rhyme::{DEFAULT_RHYME_LIMIT, rhymes_for_blocking};
use crate::settings::DocumentSettings;
use crate::text::{Position, split_at_char, split_lines};
use crate::tokenizer::tokenize_line_blocking;

/// Gemini REST API root.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Lines of context on each side of the cursor.
pub const CONTEXT_LINES: usize = 10;

/// Stress summary of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineProsody {
    /// The line as written.
    pub text: String,
    /// One stress digit per phoneme.
    pub stress_pattern: String,
    /// Phoneme count of the known words.
    pub syllables: usize,
}

/// Rhymes for one recent line ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RhymeHint {
    /// The ending as written.
    pub word: String,
    /// Lowercased rhymes, strongest first.
    pub rhymes: Vec<String>,
}

/// Dictionary-derived hints for the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProsodyHints {
    /// Preceding lines with at least one known word.
    pub lines: Vec<LineProsody>,
    /// Rhymes for the last words of the preceding lines.
    pub rhymes: Vec<RhymeHint>,
}

/// Everything the prompt is built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    /// Up to [`CONTEXT_LINES`] lines before the cursor, then the current
    /// line up to the cursor.
    pub before: String,
    /// The rest of the current line, then up to [`CONTEXT_LINES`] lines.
    pub after: String,
    /// The word being typed, when the cursor follows a non-space character.
    pub in_progress_word: Option<String>,
    /// Dictionary hints, if the dictionary could be used.
    pub hints: Option<ProsodyHints>,
}

impl PromptContext {
    /// Collect the text around `position`.
    pub fn gather(text: &str, position: Position) -> Self {
        let lines = split_lines(text);
        let current = lines.get(position.line).copied().unwrap_or_default();
        let (prefix, suffix) = split_at_char(current, position.character);

        let first = position.line.saturating_sub(CONTEXT_LINES);
        let mut before: Vec<&str> = lines
            .get(first..position.line.min(lines.len()))
            .unwrap_or_default()
            .to_vec();
        before.push(prefix);

        let mut after = vec![suffix];
        let next = position.line.saturating_add(1);
        if next < lines.len() {
            let last = next.saturating_add(CONTEXT_LINES).min(lines.len());
            after.extend_from_slice(&lines[next..last]);
        }

        let in_progress_word = prefix
            .chars()
            .next_back()
            .filter(|c| !c.is_whitespace())
            .and_then(|_| prefix.split_whitespace().next_back())
            .map(str::to_string);

        Self {
            before: before.join("\n"),
            after: after.join("\n"),
            in_progress_word,
            hints: None,
        }
    }
}

/// Render the instruction text sent to the model.
pub fn build_prompt(context: &PromptContext) -> String {
    let mut prompt = String::from(
        "You are a poetry editor helping a writer finish a line of verse.\n\n\
         Text before the cursor:\n<<<\n",
    );
    prompt.push_str(&context.before);
    prompt.push_str("\n>>>\n\nText after the cursor:\n<<<\n");
    prompt.push_str(&context.after);
    prompt.push_str("\n>>>\n\n");

    if let Some(word) = &context.in_progress_word {
        prompt.push_str(&format!(
            "The writer is in the middle of the word \"{word}\". Every completion must \
             continue that word, starting with exactly those letters.\n\n"
        ));
    }

    if let Some(hints) = &context.hints {
        if !hints.lines.is_empty() {
            prompt.push_str("Stress pattern of the preceding lines (1 = stressed, 0 = unstressed):\n");
            for line in &hints.lines {
                prompt.push_str(&format!(
                    "- \"{}\": {} ({} syllables)\n",
                    line.text.trim(),
                    line.stress_pattern,
                    line.syllables
                ));
            }
            prompt.push('\n');
        }
        if !hints.rhymes.is_empty() {
            prompt.push_str("Words that rhyme with recent line endings:\n");
            for hint in &hints.rhymes {
                prompt.push_str(&format!("- {}: {}\n", hint.word, hint.rhymes.join(", ")));
            }
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "Suggest a few short completions for the text at the cursor. Match the topic, \
         rhyme, and meter of the poem. Each completion is a word or a short phrase, never \
         more than it takes to finish the current line.\n\n\
         Respond with a JSON array of objects shaped like {\"completion\": string}.",
    );
    prompt
}

/// The `generateContent` request body for `prompt`.
pub fn request_body(prompt: &str) -> serde_json::Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "ARRAY",
                "description": "Possible completions for the poem",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "completion": {
                            "type": "STRING",
                            "description": "Words or a phrase that continue the poem",
                            "nullable": false
                        }
                    },
                    "required": ["completion"]
                }
            }
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Debug, Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    completion: String,
}

fn malformed(reason: impl Into<String>) -> PredictionError {
    PredictionError::MalformedResponse {
        reason: reason.into(),
    }
}

/// The generated text of the first candidate in a response body.
pub fn extract_response_text(body: &str) -> PredictionResult<String> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("response is not JSON: {e}")))?;
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| malformed("response has no candidate text"))
}

/// Parse generated text as `[{"completion": string}, ...]`.
pub fn parse_completions(text: &str) -> PredictionResult<Vec<String>> {
    let items: Vec<Completion> = serde_json::from_str(text)
        .map_err(|e| malformed(format!("expected an array of completions: {e}")))?;
    Ok(items.into_iter().map(|item| item.completion).collect())
}

/// Suggestions from the Gemini API.
pub struct GenerativePredictor {
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    dictionary: Arc<DictionaryHandle>,
}

impl fmt::Debug for GenerativePredictor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerativePredictor")
            .field("model", &self.model)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl GenerativePredictor {
    /// A predictor using the key, model, and timeout from `settings`.
    pub fn new(
        settings: &DocumentSettings,
        dictionary: Arc<DictionaryHandle>,
    ) -> PredictionResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self {
            api_key: settings.gemini_api_key.clone().filter(|k| !k.is_empty()),
            model: settings.gemini_model.clone(),
            client,
            dictionary,
        })
    }

    /// The endpoint for the configured model.
    pub fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/models/{}:generateContent", self.model)
    }

    /// Ask the model for completions at `position`.
    ///
    /// Fails with [`PredictionError::MissingCredential`] before any request
    /// when no API key is configured.
    #[tracing::instrument(skip(self, text), fields(model = %self.model))]
    pub async fn predict(
        &self,
        position: Position,
        text: &str,
    ) -> PredictionResult<Vec<CompletionCandidate>> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(PredictionError::MissingCredential)?;

        let mut context = PromptContext::gather(text, position);
        context.hints = self.hints(text, position).await;
        let body = request_body(&build_prompt(&context));

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "completion service returned an error");
            return Err(PredictionError::OracleStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completions = parse_completions(&extract_response_text(&body)?)?;
        tracing::debug!(count = completions.len(), "received completions");
        Ok(completions
            .into_iter()
            .enumerate()
            .map(|(index, label)| CompletionCandidate::text(label, index))
            .collect())
    }

    /// Dictionary hints, or `None` if the dictionary is not built yet or
    /// failed to build. Never starts a build.
    async fn hints(&self, text: &str, position: Position) -> Option<ProsodyHints> {
        if !self.dictionary.is_ready() {
            tracing::debug!("dictionary not ready; prompting without hints");
            return None;
        }
        let dictionary = match self.dictionary.get().await {
            Ok(dictionary) => dictionary,
            Err(e) => {
                tracing::warn!(error = %e, "dictionary unavailable; prompting without hints");
                return None;
            }
        };

        let lines = split_lines(text);
        let first = position.line.saturating_sub(CONTEXT_LINES);
        let preceding: Vec<String> = lines
            .get(first..position.line.min(lines.len()))
            .unwrap_or_default()
            .iter()
            .map(|l| (*l).to_string())
            .collect();
        let endings = preceding_line_endings(text, position.line, LOOKBACK_LINES);

        let gathered = tokio::task::spawn_blocking(move || -> DictionaryResult<ProsodyHints> {
            let mut hints = ProsodyHints::default();
            for raw in preceding {
                let line = tokenize_line_blocking(&dictionary, &raw)?;
                if !line.phonemes().is_empty() {
                    hints.lines.push(LineProsody {
                        syllables: line.phonemes().len(),
                        stress_pattern: line.stress_pattern(),
                        text: raw,
                    });
                }
            }
            for word in endings {
                let rhymes = rhymes_for_blocking(&dictionary, &word, DEFAULT_RHYME_LIMIT)?;
                if !rhymes.is_empty() {
                    hints.rhymes.push(RhymeHint {
                        word,
                        rhymes: rhymes.iter().map(|r| r.to_lowercase()).collect(),
                    });
                }
            }
            Ok(hints)
        })
        .await;

        match gathered {
            Ok(Ok(hints)) => Some(hints),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "could not gather prosody hints");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "prosody hint worker failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::{DictionaryOptions, DictionarySource};
    use crate::test_support::sample_handle;

    fn predictor(api_key: Option<&str>, dictionary: Arc<DictionaryHandle>) -> GenerativePredictor {
        let settings = DocumentSettings {
            gemini_api_key: api_key.map(str::to_string),
            ..Default::default()
        };
        GenerativePredictor::new(&settings, dictionary).unwrap()
    }

    #[test]
    fn context_splits_at_the_cursor() {
        let text = "Roses are red,\nViolets are blue,\nSugar is sw\nAnd so are you.";
        let ctx = PromptContext::gather(text, Position::new(2, 11));
        assert_eq!(ctx.before, "Roses are red,\nViolets are blue,\nSugar is sw");
        assert_eq!(ctx.after, "\nAnd so are you.");
        assert_eq!(ctx.in_progress_word.as_deref(), Some("sw"));
    }

    #[test]
    fn context_is_bounded_to_ten_lines_each_side() {
        let text: String = (0..30).map(|i| format!("line {i}\n")).collect();
        let ctx = PromptContext::gather(&text, Position::new(15, 0));
        assert!(ctx.before.starts_with("line 5\n"));
        assert!(!ctx.before.contains("line 4\n"));
        assert!(ctx.after.ends_with("line 25"));
        assert!(!ctx.after.contains("line 26"));
    }

    #[test]
    fn no_prefix_constraint_after_whitespace_or_at_line_start() {
        let ctx = PromptContext::gather("sugar is ", Position::new(0, 9));
        assert!(ctx.in_progress_word.is_none());
        let ctx = PromptContext::gather("sugar", Position::new(0, 0));
        assert!(ctx.in_progress_word.is_none());
        assert!(!build_prompt(&ctx).contains("in the middle of the word"));
    }

    #[test]
    fn prompt_includes_constraint_and_hints() {
        let ctx = PromptContext {
            before: "the light".to_string(),
            after: String::new(),
            in_progress_word: Some("ni".to_string()),
            hints: Some(ProsodyHints {
                lines: vec![LineProsody {
                    text: "the light".to_string(),
                    stress_pattern: "0010".to_string(),
                    syllables: 4,
                }],
                rhymes: vec![RhymeHint {
                    word: "light".to_string(),
                    rhymes: vec!["night".to_string(), "sight".to_string()],
                }],
            }),
        };
        let prompt = build_prompt(&ctx);
        assert!(prompt.contains("middle of the word \"ni\""));
        assert!(prompt.contains("\"the light\": 0010 (4 syllables)"));
        assert!(prompt.contains("- light: night, sight"));
    }

    #[test]
    fn request_body_constrains_the_response() {
        let body = request_body("hello");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        let config = &body["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(config["responseSchema"]["type"], "ARRAY");
        assert_eq!(
            config["responseSchema"]["items"]["required"],
            json!(["completion"])
        );
    }

    #[test]
    fn parses_completion_arrays() {
        let text = r#"[{"completion": "sugar"}, {"completion": "sugar is sweet"}]"#;
        assert_eq!(parse_completions(text).unwrap(), vec!["sugar", "sugar is sweet"]);
        assert!(parse_completions("[]").unwrap().is_empty());
    }

    #[test]
    fn malformed_completions_are_errors_not_empty() {
        for bad in ["not json", r#"{"completion": "x"}"#, r#"[{"text": "x"}]"#] {
            assert!(matches!(
                parse_completions(bad),
                Err(PredictionError::MalformedResponse { .. })
            ));
        }
    }

    #[test]
    fn extracts_first_candidate_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"[{\"completion\":\"night\"}]"}],"role":"model"}}]}"#;
        let text = extract_response_text(body).unwrap();
        assert_eq!(parse_completions(&text).unwrap(), vec!["night"]);

        assert!(matches!(
            extract_response_text(r#"{"candidates":[]}"#),
            Err(PredictionError::MalformedResponse { .. })
        ));
        assert!(extract_response_text("<html>").is_err());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        for key in [None, Some("")] {
            let err = predictor(key, sample_handle())
                .predict(Position::new(0, 0), "roses")
                .await
                .unwrap_err();
            assert!(matches!(err, PredictionError::MissingCredential));
        }
    }

    #[tokio::test]
    async fn hints_come_from_the_dictionary() {
        let p = predictor(Some("k"), sample_handle());
        let hints = p
            .hints("so blue\nthe light\n", Position::new(2, 0))
            .await
            .unwrap();
        assert_eq!(hints.lines.len(), 2);
        assert_eq!(hints.lines[0].stress_pattern, "01001");
        assert_eq!(hints.rhymes[1].word, "light");
        assert_eq!(hints.rhymes[1].rhymes[0], "delight");
    }

    #[tokio::test]
    async fn unavailable_dictionary_means_no_hints() {
        let broken = Arc::new(DictionaryHandle::new(DictionaryOptions::in_memory(
            DictionarySource::Inline(String::new()),
        )));
        assert!(broken.get().await.is_err());
        let p = predictor(Some("k"), broken);
        assert!(p.hints("light\n", Position::new(1, 0)).await.is_none());
    }

    #[tokio::test]
    async fn hints_never_start_a_build() {
        let cold = Arc::new(DictionaryHandle::new(DictionaryOptions::in_memory(
            DictionarySource::Inline(crate::test_support::SAMPLE_DICT.to_string()),
        )));
        let p = predictor(Some("k"), Arc::clone(&cold));
        assert!(p.hints("the light\n", Position::new(1, 0)).await.is_none());
        assert_eq!(cold.ingestions(), 0);
        assert!(!cold.is_ready());

        cold.get().await.unwrap();
        assert!(p.hints("the light\n", Position::new(1, 0)).await.is_some());
    }

    #[test]
    fn debug_hides_the_key() {
        let p = predictor(Some("very-secret"), sample_handle());
        assert!(!format!("{p:?}").contains("very-secret"));
        assert!(p.endpoint().ends_with("/models/gemini-1.5-flash:generateContent"));
    }
}
