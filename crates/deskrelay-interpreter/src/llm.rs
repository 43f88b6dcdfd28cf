//! The `format_with_llm` step's chat-completion client: an OpenAI-compatible
//! `/chat/completions` caller, modeled on the same auth-style/base-url
//! configuration shape as the teacher crate's `OpenAICompatProvider`.

use std::collections::BTreeMap;
use std::time::Duration;

use deskrelay_schema::LlmFieldSpec;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Request(String),
    #[error("LLM response was not valid JSON")]
    InvalidResponse,
    #[error("missing API key environment variable {0}")]
    MissingApiKey(String),
}

#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub chat_url: String,
    pub model: String,
    pub api_key_env_var: String,
}

pub struct LlmClient {
    config: LlmClientConfig,
    client: reqwest::Client,
}

impl LlmClient {
    pub fn new(config: LlmClientConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("reqwest client builds"),
        }
    }

    /// Builds the prompt instructing the model to emit one
    /// `[field_name]\n<content>` block per requested field.
    pub fn build_prompt(input: &BTreeMap<String, String>, fields: &[LlmFieldSpec]) -> String {
        let mut prompt = String::from("Input data:\n");
        for (key, value) in input {
            prompt.push_str(&format!("{key}: {value}\n"));
        }
        prompt.push_str("\nProduce the following fields, each as:\n[field_name]\n<content>\n\n");
        for (i, field) in fields.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. {}: {}\n",
                i + 1,
                field.name,
                field.description
            ));
        }
        prompt
    }

    pub async fn format(
        &self,
        input: &BTreeMap<String, String>,
        fields: &[LlmFieldSpec],
    ) -> Result<BTreeMap<String, String>, LlmError> {
        let api_key = std::env::var(&self.config.api_key_env_var)
            .map_err(|_| LlmError::MissingApiKey(self.config.api_key_env_var.clone()))?;
        let prompt = Self::build_prompt(input, fields);

        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0.3,
            "max_tokens": 500,
        });

        let response = self
            .client
            .post(&self.config.chat_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Request(e.to_string()))?;

        let value: serde_json::Value = response
            .json()
            .await
            .map_err(|_| LlmError::InvalidResponse)?;

        let content = value
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .ok_or(LlmError::InvalidResponse)?;

        Ok(parse_llm_output(content, fields))
    }
}

/// Parses `[field_name]\n<content>` blocks, falling back to a bare
/// `field_name\n<content>` form when the bracketed pattern doesn't match.
/// Any field that cannot be located resolves to an empty string rather than
/// failing the whole parse, matching the source's lenient behavior.
pub fn parse_llm_output(content: &str, fields: &[LlmFieldSpec]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for field in fields {
        let bracketed = Regex::new(&format!(
            r"(?s)\[{}\]\s*\n(.*?)(?:\n\[|\z)",
            regex::escape(&field.name)
        ))
        .unwrap();
        if let Some(caps) = bracketed.captures(content) {
            out.insert(field.name.clone(), caps[1].trim().to_string());
            continue;
        }

        let bare = Regex::new(&format!(
            r"(?s)^{}\s*\n(.*?)(?:\n\w+\s*\n|\z)",
            regex::escape(&field.name)
        ))
        .unwrap();
        if let Some(caps) = bare.captures(content) {
            out.insert(field.name.clone(), caps[1].trim().to_string());
        } else {
            out.insert(field.name.clone(), String::new());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> Vec<LlmFieldSpec> {
        vec![
            LlmFieldSpec {
                name: "summary".into(),
                description: "one-line clinical summary".into(),
            },
            LlmFieldSpec {
                name: "icd10".into(),
                description: "ICD-10 code".into(),
            },
        ]
    }

    #[test]
    fn parses_bracketed_blocks() {
        let content = "[summary]\nPneumonia with cough\n\n[icd10]\nJ18.9";
        let parsed = parse_llm_output(content, &fields());
        assert_eq!(parsed["summary"], "Pneumonia with cough");
        assert_eq!(parsed["icd10"], "J18.9");
    }

    #[test]
    fn missing_field_resolves_to_empty_string() {
        let content = "[summary]\nPneumonia";
        let parsed = parse_llm_output(content, &fields());
        assert_eq!(parsed["summary"], "Pneumonia");
        assert_eq!(parsed["icd10"], "");
    }

    #[test]
    fn build_prompt_lists_input_and_fields() {
        let mut input = BTreeMap::new();
        input.insert("input_text".to_string(), "cough, fever".to_string());
        let prompt = LlmClient::build_prompt(&input, &fields());
        assert!(prompt.contains("input_text: cough, fever"));
        assert!(prompt.contains("summary: one-line clinical summary"));
        assert!(prompt.contains("[field_name]"));
    }
}
