//! Remote LLM fallback
//!
//! Fourth and last strategy. Posts the raw query to a generative-language
//! endpoint and reads `candidates[0].content.parts[0].text`. A body that
//! parses into the `UiResponse` wire shape is used directly; anything else
//! is wrapped as a plain-text insight. Every failure (network, non-2xx,
//! unparseable body) yields no match so the pipeline can fall through to
//! the default responder — this strategy never raises.
//!
//! An empty API key disables the strategy; key provisioning is an external
//! configuration concern.

use crate::error::{AssistantError, Result};
use crate::locale::Locale;
use crate::response::UiResponse;
use tracing::{debug, warn};

const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

pub struct GenerativeClient {
    api_key: String,
    endpoint: String,
    client: reqwest::Client,
}

impl GenerativeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Returns a response or `None`; errors are logged and swallowed.
    pub async fn generate(&self, query: &str, locale: Locale) -> Option<UiResponse> {
        if !self.is_enabled() {
            debug!("LLM fallback disabled (no API key)");
            return None;
        }
        match self.try_generate(query, locale).await {
            Ok(response) => Some(response),
            Err(e) => {
                warn!("LLM fallback yielded no match: {}", e);
                None
            }
        }
    }

    async fn try_generate(&self, query: &str, locale: Locale) -> Result<UiResponse> {
        let prompt = build_prompt(query, locale);
        let body = serde_json::json!({
            "contents": [
                {"role": "user", "parts": [{"text": prompt}]}
            ],
            "generationConfig": {
                "temperature": 0.4,
                "maxOutputTokens": 512
            }
        });

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Llm(format!("LLM call failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(AssistantError::Llm(format!(
                "LLM endpoint returned {}",
                response.status()
            )));
        }
        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Llm(format!("Bad LLM response body: {}", e)))?;
        let text = payload["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .ok_or_else(|| AssistantError::Llm("No text in LLM response".to_string()))?;

        Ok(parse_generated(text))
    }
}

fn build_prompt(query: &str, locale: Locale) -> String {
    let language = match locale {
        Locale::En => "English",
        Locale::Ko => "Korean",
    };
    format!(
        r#"You are the assistant of a personal portfolio website. Answer the visitor's question below in {}.
If you can, return ONLY a JSON object with the fields "aiInsight" (string), "results" (array), "followUpActions" (array) and "additionalInfo" (string). Otherwise answer with a short plain-text paragraph.

Visitor question: "{}""#,
        language, query
    )
}

/// A parseable `UiResponse` body is used directly; otherwise the raw text
/// becomes a plain-text insight.
pub(crate) fn parse_generated(text: &str) -> UiResponse {
    let cleaned = extract_json(text);
    match serde_json::from_str::<UiResponse>(&cleaned) {
        Ok(response) if !response.is_blank() => response,
        _ => UiResponse::insight(text.trim(), crate::response::ResponseType::Generated),
    }
}

/// Extracts a JSON object/array from an LLM reply, stripping markdown fences.
/// The span runs from the outermost opening delimiter to the outermost
/// closing one, so an object whose fields hold arrays comes out whole.
pub(crate) fn extract_json(response: &str) -> String {
    let json_start = match (response.find('{'), response.find('[')) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };
    let json_end = match (response.rfind('}'), response.rfind(']')) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    if let (Some(start), Some(end)) = (json_start, json_end) {
        if start < end {
            return response[start..=end].to_string();
        }
    }
    if let Some(start) = response.find("```json") {
        let after_start = &response[start + 7..];
        if let Some(end) = after_start.find("```") {
            return after_start[..end].trim().to_string();
        }
    }
    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseType;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let reply = "Here you go:\n```json\n{\"aiInsight\": \"hi\"}\n```";
        let extracted = extract_json(reply);
        assert!(extracted.contains("aiInsight"));
        assert!(extracted.starts_with('{'));
    }

    #[test]
    fn test_parse_generated_structured() {
        let reply = r#"{"aiInsight": "I build data tools.", "results": [], "followUpActions": [], "additionalInfo": ""}"#;
        let response = parse_generated(reply);
        assert_eq!(response.ai_insight, "I build data tools.");
        assert_eq!(response.response_type, ResponseType::Generated);
    }

    #[test]
    fn test_extract_json_spans_object_with_array_fields() {
        // Inner arrays must not shrink the extracted span to an
        // `[...]` slice of the object.
        let reply = r#"Sure, here is the answer:
{"aiInsight": "Hi", "results": [], "followUpActions": [{"label": "More"}], "additionalInfo": ""}"#;
        let extracted = extract_json(reply);
        assert!(extracted.starts_with('{'));
        assert!(extracted.ends_with('}'));

        let response = parse_generated(reply);
        assert_eq!(response.ai_insight, "Hi");
        assert_eq!(response.follow_up_actions.len(), 1);
    }

    #[test]
    fn test_extract_json_bare_array() {
        let extracted = extract_json("here: [1, 2, 3]");
        assert_eq!(extracted, "[1, 2, 3]");
    }

    #[test]
    fn test_parse_generated_plain_text() {
        let response = parse_generated("Just a plain answer.");
        assert_eq!(response.ai_insight, "Just a plain answer.");
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_without_key() {
        let client = GenerativeClient::new("");
        assert!(!client.is_enabled());
        assert!(client.generate("anything", Locale::En).await.is_none());
    }
}
