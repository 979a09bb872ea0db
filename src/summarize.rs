//! Per-file summaries from a text-completion model.
//!
//! The model sits behind [`Summarizer`]. [`CompletionClient`] talks to an
//! OpenAI-compatible `/completions` endpoint. [`summarize_file`] wires the
//! component extractor and the summarizer together and applies the failure
//! policy: any collaborator error is logged and downgraded, never propagated.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::components::ComponentExtractor;
use crate::language::detect_language;
use crate::walker::PathEntry;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo-instruct";
pub const DEFAULT_MAX_TOKENS: u32 = 60;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Text written in place of a summary the model could not produce.
pub const PLACEHOLDER: &str = "(no summary)";

/// Errors from the summarizer.
#[derive(Debug, Error)]
pub enum SummarizeError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("completion API returned error status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion API returned no choices")]
    EmptyResponse,

    #[error("summarizer unavailable: {0}")]
    Unavailable(String),
}

/// Turns a prompt into a short description.
pub trait Summarizer {
    fn summarize(&self, prompt: &str) -> Result<String, SummarizeError>;
}

/// Connection settings for [`CompletionClient`].
#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub api_base: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Blocking client for an OpenAI-compatible completions endpoint.
pub struct CompletionClient {
    settings: CompletionSettings,
    client: Client,
}

impl CompletionClient {
    pub fn new(settings: CompletionSettings) -> Result<Self, SummarizeError> {
        let client = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/completions", self.settings.api_base.trim_end_matches('/'))
    }
}

impl Summarizer for CompletionClient {
    fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or(SummarizeError::MissingApiKey)?;

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.settings.model,
                "prompt": prompt,
                "max_tokens": self.settings.max_tokens,
            }))
            .send()?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error message".to_string());
            return Err(SummarizeError::Api { status, body });
        }

        #[derive(Deserialize)]
        struct Choice {
            text: String,
        }

        #[derive(Deserialize)]
        struct CompletionResponse {
            choices: Vec<Choice>,
        }

        let completion: CompletionResponse = response.json()?;
        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.text.trim().to_string())
            .ok_or(SummarizeError::EmptyResponse)
    }
}

/// Stands in for a completion client that could not be built.
///
/// Every request fails, so each file gets the placeholder summary.
#[derive(Debug, Clone)]
pub struct UnavailableSummarizer {
    reason: String,
}

impl UnavailableSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Summarizer for UnavailableSummarizer {
    fn summarize(&self, _prompt: &str) -> Result<String, SummarizeError> {
        Err(SummarizeError::Unavailable(self.reason.clone()))
    }
}

/// The completion client for `settings`, or an [`UnavailableSummarizer`] if
/// the HTTP client cannot be built. Never fails.
pub fn completion_summarizer(settings: CompletionSettings) -> Box<dyn Summarizer> {
    match CompletionClient::new(settings) {
        Ok(client) => Box::new(client),
        Err(e) => {
            warn!("cannot build completion client, summaries will be placeholders: {e}");
            Box::new(UnavailableSummarizer::new(e.to_string()))
        }
    }
}

/// Build the model prompt for a file.
pub fn build_prompt(path: &Path, components: &[String]) -> String {
    let subject = match detect_language(path) {
        Some(language) => format!("This is a {language} file."),
        None => "This is a source file.".to_string(),
    };

    let description = if components.is_empty() {
        "This file does not define any components.".to_string()
    } else {
        format!(
            "This file defines the following components: {}",
            components.join(", ")
        )
    };

    format!("{subject} {description}")
}

/// Outcome of summarizing one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathEntry,
    pub components: Vec<String>,
    /// `None` if the summarizer failed.
    pub summary: Option<String>,
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.path,
            self.summary.as_deref().unwrap_or(PLACEHOLDER)
        )
    }
}

/// Extract components from `root/entry` and ask the summarizer to describe them.
///
/// Extractor failures become an empty component list; summarizer failures
/// become a `None` summary. Both are logged.
pub fn summarize_file(
    root: &Path,
    entry: &PathEntry,
    extractor: &dyn ComponentExtractor,
    summarizer: &dyn Summarizer,
) -> FileSummary {
    let full_path = root.join(entry.as_str());

    let components = extractor.extract(&full_path).unwrap_or_else(|e| {
        warn!(path = %entry, "component extraction failed: {e}");
        Vec::new()
    });

    let prompt = build_prompt(&full_path, &components);
    debug!(path = %entry, %prompt, "requesting summary");

    let summary = match summarizer.summarize(&prompt) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(path = %entry, "summary failed: {e}");
            None
        }
    };

    let result = FileSummary {
        path: entry.clone(),
        components,
        summary,
    };
    info!("{result}");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ExtractError;
    use std::cell::RefCell;

    struct FixedExtractor(Result<Vec<String>, ()>);

    impl ComponentExtractor for FixedExtractor {
        fn extract(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
            self.0.clone().map_err(|()| ExtractError::UnsupportedLanguage {
                path: path.to_path_buf(),
            })
        }
    }

    /// Records prompts and answers with a fixed reply, or fails.
    struct RecordingSummarizer {
        reply: Option<&'static str>,
        prompts: RefCell<Vec<String>>,
    }

    impl RecordingSummarizer {
        fn new(reply: Option<&'static str>) -> Self {
            Self {
                reply,
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl Summarizer for RecordingSummarizer {
        fn summarize(&self, prompt: &str) -> Result<String, SummarizeError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply
                .map(str::to_string)
                .ok_or(SummarizeError::EmptyResponse)
        }
    }

    fn entry(path: &str) -> PathEntry {
        PathEntry::parse(path).unwrap()
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt(Path::new("src/app.js"), &["App".into(), "helper".into()]);
        assert_eq!(
            prompt,
            "This is a JavaScript file. This file defines the following components: App, helper"
        );

        let prompt = build_prompt(Path::new("lib.py"), &[]);
        assert_eq!(
            prompt,
            "This is a Python file. This file does not define any components."
        );

        let prompt = build_prompt(Path::new("notes.txt"), &[]);
        assert!(prompt.starts_with("This is a source file."));
    }

    #[test]
    fn test_summarize_file_success() {
        let extractor = FixedExtractor(Ok(vec!["App".into()]));
        let summarizer = RecordingSummarizer::new(Some("Renders the app."));

        let result = summarize_file(Path::new("/repo"), &entry("src/app.js"), &extractor, &summarizer);

        assert_eq!(result.components, vec!["App"]);
        assert_eq!(result.summary.as_deref(), Some("Renders the app."));
        assert_eq!(result.to_string(), "src/app.js: Renders the app.");
        assert_eq!(
            *summarizer.prompts.borrow(),
            vec!["This is a JavaScript file. This file defines the following components: App".to_string()]
        );
    }

    #[test]
    fn test_extractor_failure_downgrades_to_empty() {
        let extractor = FixedExtractor(Err(()));
        let summarizer = RecordingSummarizer::new(Some("Nothing much."));

        let result = summarize_file(Path::new("/repo"), &entry("a.js"), &extractor, &summarizer);

        assert!(result.components.is_empty());
        assert_eq!(result.summary.as_deref(), Some("Nothing much."));
        assert!(summarizer.prompts.borrow()[0].ends_with("does not define any components."));
    }

    #[test]
    fn test_summarizer_failure_downgrades_to_placeholder() {
        let extractor = FixedExtractor(Ok(vec![]));
        let summarizer = RecordingSummarizer::new(None);

        let result = summarize_file(Path::new("/repo"), &entry("a.js"), &extractor, &summarizer);

        assert!(result.summary.is_none());
        assert_eq!(result.to_string(), format!("a.js: {PLACEHOLDER}"));
    }

    #[test]
    fn test_unavailable_summarizer_yields_placeholder() {
        let extractor = FixedExtractor(Ok(vec!["App".into()]));
        let summarizer = UnavailableSummarizer::new("TLS backend missing");

        let err = summarizer.summarize("anything").unwrap_err();
        assert!(matches!(err, SummarizeError::Unavailable(ref reason) if reason == "TLS backend missing"));

        let result = summarize_file(Path::new("/repo"), &entry("src/app.js"), &extractor, &summarizer);
        assert_eq!(result.components, vec!["App"]);
        assert!(result.summary.is_none());
        assert_eq!(result.to_string(), format!("src/app.js: {PLACEHOLDER}"));
    }

    #[test]
    fn test_completion_summarizer_builds_client() {
        let summarizer = completion_summarizer(CompletionSettings::default());
        let err = summarizer.summarize("hello").unwrap_err();
        assert!(matches!(err, SummarizeError::MissingApiKey));
    }

    #[test]
    fn test_client_without_key_fails_fast() {
        let client = CompletionClient::new(CompletionSettings::default()).unwrap();
        let err = client.summarize("hello").unwrap_err();
        assert!(matches!(err, SummarizeError::MissingApiKey));
    }

    #[test]
    fn test_client_unreachable_endpoint() {
        let client = CompletionClient::new(CompletionSettings {
            api_base: "http://127.0.0.1:9/v1".to_string(),
            api_key: Some("test-key".to_string()),
            timeout: Duration::from_secs(5),
            ..Default::default()
        })
        .unwrap();

        let err = client.summarize("hello").unwrap_err();
        assert!(matches!(err, SummarizeError::Http(_)));
    }

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = CompletionClient::new(CompletionSettings {
            api_base: "http://localhost:8080/v1/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8080/v1/completions");
    }
}
