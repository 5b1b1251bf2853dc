use std::env;
use std::path::PathBuf;

use crate::error::AssocMemError;

const DEFAULT_DOCS_DIR: &str = "./SampleDocs";
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL_NAME: &str = "gpt-4o-mini";

/// Process configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct AssocMemConfig {
    pub docs_dir: PathBuf,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model_name: String,
}

impl AssocMemConfig {
    /// Load configuration from the environment. Never fails: a missing
    /// `LLM_API_KEY` is only fatal at the point the default Associator
    /// adapter is actually constructed (see `associator::HttpAssociator::new`).
    pub fn from_env() -> Self {
        let docs_dir = env::var("DOCS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DOCS_DIR));
        let llm_api_key = env::var("LLM_API_KEY").ok();
        let llm_base_url =
            env::var("LLM_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let llm_model_name =
            env::var("LLM_MODEL_NAME").unwrap_or_else(|_| DEFAULT_MODEL_NAME.to_string());

        Self {
            docs_dir,
            llm_api_key,
            llm_base_url,
            llm_model_name,
        }
    }

    /// Fetch the API key, turning absence into the typed error the
    /// Associator adapter needs at construction time.
    pub fn require_api_key(&self) -> Result<&str, AssocMemError> {
        self.llm_api_key
            .as_deref()
            .ok_or(AssocMemError::ConfigMissing("LLM_API_KEY"))
    }
}
