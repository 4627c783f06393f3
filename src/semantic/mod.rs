//! AI-assisted semantic judgement of a design/implementation pair.
//!
//! The advisor is best-effort: whatever the completion service does, a check
//! that reached this step still returns its pixel and SSIM results.

mod client;
mod prompt;

use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

pub use client::{
    CompletionClient, CompletionError, CompletionRequest, OpenAiCompletionClient,
    DEFAULT_API_ENDPOINT, DEFAULT_MODEL,
};
pub use prompt::PromptTemplate;

use crate::config::SemanticConfig;
use crate::{LayoutCheckError, Result};

pub const NO_DATA: &str = "No data";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticAnalysis {
    pub diff: String,
    pub match_rate: f64,
}

impl SemanticAnalysis {
    fn fallback(diff: impl Into<String>, diff_ratio: f64) -> Self {
        Self {
            diff: diff.into(),
            match_rate: diff_ratio,
        }
    }
}

pub struct SemanticDiffAdvisor {
    client: Arc<dyn CompletionClient>,
    template: PromptTemplate,
    timeout: Duration,
    max_tokens: u32,
}

impl SemanticDiffAdvisor {
    pub fn new(
        client: Arc<dyn CompletionClient>,
        template: PromptTemplate,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            template,
            timeout,
            max_tokens: 400,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Build the advisor from config, with env vars as fallback for the key,
    /// endpoint and model. `Ok(None)` when disabled or no API key is available.
    pub fn from_config(config: &SemanticConfig, timeout: Duration) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }

        let Some(api_key) = config
            .api_key
            .clone()
            .or_else(|| env_non_empty("LAYOUT_CHECKER_AI_API_KEY"))
            .or_else(|| env_non_empty("OPENAI_API_KEY"))
        else {
            debug!("no AI API key configured; semantic analysis disabled");
            return Ok(None);
        };

        let endpoint = config
            .api_endpoint
            .clone()
            .or_else(|| env_non_empty("LAYOUT_CHECKER_AI_ENDPOINT"))
            .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let model = config
            .model
            .clone()
            .or_else(|| env_non_empty("LAYOUT_CHECKER_AI_MODEL"))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let template = match &config.prompt_template {
            Some(path) => PromptTemplate::from_file(path).map_err(|e| {
                LayoutCheckError::Config(format!(
                    "Failed to read prompt template {}: {e}",
                    path.display()
                ))
            })?,
            None => PromptTemplate::default(),
        };

        let client = OpenAiCompletionClient::new(endpoint, api_key, model, timeout)
            .map_err(|e| LayoutCheckError::Config(format!("Failed to build AI client: {e}")))?;

        Ok(Some(
            Self::new(Arc::new(client), template, timeout).with_max_tokens(config.max_tokens),
        ))
    }

    /// Ask the completion service to judge the pair. Never fails; transport
    /// errors and timeouts degrade to `{diff: "No data", matchRate: diff_ratio}`.
    pub async fn advise(
        &self,
        reference_png: &[u8],
        capture_png: &[u8],
        mssim: f64,
        diff_ratio: f64,
    ) -> SemanticAnalysis {
        let request = CompletionRequest {
            text: self.template.render(mssim),
            image_urls: vec![png_data_url(reference_png), png_data_url(capture_png)],
            max_tokens: self.max_tokens,
        };

        match tokio::time::timeout(self.timeout, self.client.complete(request)).await {
            Ok(Ok(raw)) => parse_analysis(&raw, diff_ratio),
            Ok(Err(err)) => {
                warn!(error = %err, "semantic analysis failed; using fallback");
                SemanticAnalysis::fallback(NO_DATA, diff_ratio)
            }
            Err(_) => {
                warn!(timeout = ?self.timeout, "semantic analysis timed out; using fallback");
                SemanticAnalysis::fallback(NO_DATA, diff_ratio)
            }
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

/// Parse `{diff, matchRate}` from a model reply, tolerating a fenced block.
pub fn parse_analysis(raw: &str, diff_ratio: f64) -> SemanticAnalysis {
    let trimmed = raw.trim();
    let body = strip_code_fence(trimmed);

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        let diff = map.get("diff").and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        let match_rate = map.get("matchRate").and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        });
        if let (Some(diff), Some(match_rate)) = (diff, match_rate) {
            return SemanticAnalysis { diff, match_rate };
        }
    }

    warn!("semantic analysis reply was not {{diff, matchRate}} JSON; using raw text");
    if trimmed.is_empty() {
        SemanticAnalysis::fallback(NO_DATA, diff_ratio)
    } else {
        SemanticAnalysis::fallback(trimmed, diff_ratio)
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use tokio::sync::Mutex;

    struct ScriptedClient {
        reply: std::result::Result<String, String>,
        delay: Duration,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedClient {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err("connection refused".to_string()),
                delay: Duration::ZERO,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> std::result::Result<String, CompletionError> {
            self.seen.lock().await.push(request);
            tokio::time::sleep(self.delay).await;
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(_) => Err(CompletionError::Empty),
            }
        }
    }

    fn advisor(client: Arc<ScriptedClient>) -> SemanticDiffAdvisor {
        SemanticDiffAdvisor::new(
            client,
            PromptTemplate::new("mssim is {{mssim}}"),
            Duration::from_secs(2),
        )
    }

    #[test]
    fn parses_plain_json() {
        let analysis = parse_analysis(r#"{"diff":"Button is blue","matchRate":0.82}"#, 0.3);
        assert_eq!(analysis.diff, "Button is blue");
        assert_eq!(analysis.match_rate, 0.82);
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"diff\": \"Header taller\", \"matchRate\": 0.9}\n```";
        let analysis = parse_analysis(raw, 0.3);
        assert_eq!(analysis.diff, "Header taller");
        assert_eq!(analysis.match_rate, 0.9);
    }

    #[test]
    fn accepts_numeric_string_match_rate() {
        let analysis = parse_analysis(r#"{"diff":"ok","matchRate":"0.75"}"#, 0.3);
        assert_eq!(analysis.match_rate, 0.75);
    }

    #[test]
    fn prose_reply_falls_back_to_raw_text() {
        let analysis = parse_analysis("  The footer is missing.  ", 0.25);
        assert_eq!(analysis.diff, "The footer is missing.");
        assert_eq!(analysis.match_rate, 0.25);
    }

    #[test]
    fn empty_reply_falls_back_to_no_data() {
        let analysis = parse_analysis("   ", 0.4);
        assert_eq!(analysis, SemanticAnalysis::fallback(NO_DATA, 0.4));
    }

    #[test]
    fn json_missing_fields_falls_back() {
        let analysis = parse_analysis(r#"{"summary":"x"}"#, 0.1);
        assert_eq!(analysis.diff, r#"{"summary":"x"}"#);
        assert_eq!(analysis.match_rate, 0.1);
    }

    #[tokio::test]
    async fn advise_sends_rendered_prompt_and_both_images() {
        let client = Arc::new(ScriptedClient::replying(r#"{"diff":"none","matchRate":1.0}"#));
        let analysis = advisor(client.clone())
            .advise(b"ref", b"cap", 0.5, 0.0)
            .await;
        assert_eq!(analysis.diff, "none");

        let seen = client.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "mssim is 0.5000");
        assert_eq!(
            seen[0].image_urls,
            vec![
                format!("data:image/png;base64,{}", STANDARD.encode(b"ref")),
                format!("data:image/png;base64,{}", STANDARD.encode(b"cap")),
            ]
        );
        assert_eq!(seen[0].max_tokens, 400);
    }

    #[tokio::test]
    async fn transport_error_degrades_to_no_data() {
        let analysis = advisor(Arc::new(ScriptedClient::failing()))
            .advise(b"ref", b"cap", 0.9, 0.12)
            .await;
        assert_eq!(analysis, SemanticAnalysis::fallback(NO_DATA, 0.12));
    }

    #[tokio::test]
    async fn slow_client_times_out_to_fallback() {
        let client = Arc::new(ScriptedClient {
            delay: Duration::from_secs(5),
            ..ScriptedClient::replying(r#"{"diff":"late","matchRate":1}"#)
        });
        let advisor = SemanticDiffAdvisor::new(
            client,
            PromptTemplate::default(),
            Duration::from_millis(50),
        );
        let analysis = advisor.advise(b"a", b"b", 1.0, 0.0).await;
        assert_eq!(analysis, SemanticAnalysis::fallback(NO_DATA, 0.0));
    }

    #[test]
    fn disabled_config_builds_no_advisor() {
        let config = SemanticConfig {
            enabled: false,
            api_key: Some("key".into()),
            ..SemanticConfig::default()
        };
        let advisor = SemanticDiffAdvisor::from_config(&config, Duration::from_secs(1)).unwrap();
        assert!(advisor.is_none());
    }

    #[test]
    fn config_with_key_builds_advisor() {
        let config = SemanticConfig {
            api_key: Some("key".into()),
            api_endpoint: Some("http://127.0.0.1:1/v1/chat/completions".into()),
            max_tokens: 64,
            ..SemanticConfig::default()
        };
        let advisor = SemanticDiffAdvisor::from_config(&config, Duration::from_secs(1))
            .unwrap()
            .expect("advisor");
        assert_eq!(advisor.max_tokens, 64);
    }

    #[test]
    fn unreadable_prompt_template_is_config_error() {
        let config = SemanticConfig {
            api_key: Some("key".into()),
            prompt_template: Some(PathBuf::from("/nonexistent/prompt.txt")),
            ..SemanticConfig::default()
        };
        let err = SemanticDiffAdvisor::from_config(&config, Duration::from_secs(1))
            .err()
            .expect("config error");
        assert!(matches!(err, LayoutCheckError::Config(msg) if msg.contains("prompt template")));
    }
}
