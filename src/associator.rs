//! Associator client: the pluggable external semantic scorer used by
//! maintenance's association phase. The default adapter calls an
//! OpenAI-compatible chat completions endpoint; `StubAssociator` is a
//! deterministic variant for tests and offline demos.

use std::collections::HashSet;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AssocMemConfig;
use crate::error::AssocMemError;

const BODY_TRUNCATE_CHARS: usize = 1500;
const CALL_TIMEOUT: Duration = Duration::from_secs(30);

static SCORE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"0\.[0-9]+|1\.0").unwrap());

/// `associate(name_a, body_a, name_b, body_b) -> score in [0,1]`.
pub trait Associator {
    fn associate(&self, name_a: &str, body_a: &str, name_b: &str, body_b: &str) -> f64;
}

/// Deterministic stand-in for tests and demos: word-level Jaccard
/// overlap between the two bodies, already bounded to `[0,1]`.
pub struct StubAssociator;

impl Associator for StubAssociator {
    fn associate(&self, _name_a: &str, body_a: &str, _name_b: &str, body_b: &str) -> f64 {
        let a: HashSet<String> = body_a.split_whitespace().map(|w| w.to_lowercase()).collect();
        let b: HashSet<String> = body_b.split_whitespace().map(|w| w.to_lowercase()).collect();
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let intersection = a.intersection(&b).count() as f64;
        let union = a.union(&b).count() as f64;
        (intersection / union).clamp(0.0, 1.0)
    }
}

/// Default adapter: a single chat-completion call per pair, temperature
/// 0, bodies truncated to 1500 chars/side, score parsed out of the reply
/// with a bare-decimal regex. Transport, timeout, and parse failures all
/// collapse to score 0.0 and a logged `AssociatorFailure`.
pub struct HttpAssociator {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl HttpAssociator {
    pub fn new(config: &AssocMemConfig) -> Result<Self, AssocMemError> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(CALL_TIMEOUT)
            .build()
            .map_err(|e| AssocMemError::AssociatorFailure(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.llm_base_url.clone(),
            model: config.llm_model_name.clone(),
            api_key,
        })
    }

    fn call(&self, name_a: &str, body_a: &str, name_b: &str, body_b: &str) -> Result<f64, AssocMemError> {
        let truncated_a: String = body_a.chars().take(BODY_TRUNCATE_CHARS).collect();
        let truncated_b: String = body_b.chars().take(BODY_TRUNCATE_CHARS).collect();
        let prompt = format!(
            "You are a knowledge-graph assistant. Read the two documents below and rate, \
             on a scale from 0.0 to 1.0, how semantically and contextually related they are.\n\n\
             Scoring guide:\n\
             - 1.0: same topic, or one is a direct continuation or detailed elaboration of the other.\n\
             - 0.5: some shared concepts, or reading both together is informative.\n\
             - 0.0: unrelated.\n\n\
             [Document A: {name_a}]\n{truncated_a}... (truncated)\n\n\
             [Document B: {name_b}]\n{truncated_b}... (truncated)\n\n\
             Respond with the relatedness score only. Example: 0.65"
        );

        let request_body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You return relatedness scores as bare numbers."},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.0,
            "max_tokens": 10,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .map_err(|e| AssocMemError::AssociatorFailure(e.to_string()))?;

        let payload: serde_json::Value = response
            .json()
            .map_err(|e| AssocMemError::AssociatorFailure(e.to_string()))?;

        let content = payload["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim();

        match SCORE_REGEX.find(content) {
            Some(m) => {
                let score: f64 = m.as_str().parse().unwrap_or(0.0);
                Ok(score.clamp(0.0, 1.0))
            }
            None => Ok(0.0),
        }
    }
}

impl Associator for HttpAssociator {
    fn associate(&self, name_a: &str, body_a: &str, name_b: &str, body_b: &str) -> f64 {
        match self.call(name_a, body_a, name_b, body_b) {
            Ok(score) => score,
            Err(e) => {
                log::warn!("associator call failed for ({name_a}, {name_b}): {e}");
                0.0
            }
        }
    }
}
