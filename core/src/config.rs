//! Runtime configuration.
//!
//! Resolution order: built-in defaults, then `config.toml`, then environment
//! variables (which a front end may have populated from a `.env` file).
//! API keys are only ever read from the environment.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::conversation::DEFAULT_HISTORY_WINDOW;
use crate::embeddings::providers::openai_compatible::DEFAULT_EMBEDDING_MODEL;
use crate::embeddings::providers::openai_compatible::DEFAULT_EMBEDDING_URL;
use crate::error::RagErr;
use crate::error::Result;
use crate::generation::DEFAULT_GENERATION_BASE_URL;
use crate::generation::DEFAULT_MAX_TOKENS;
use crate::generation::DEFAULT_MODEL;
use crate::index::pinecone::DEFAULT_INDEX_NAME;
use crate::prompt::DEFAULT_EXCERPT_BUDGET_CHARS;
use crate::prompt::PromptAssembler;

/// Excerpts requested per question when not configured.
pub const DEFAULT_TOP_K: usize = 4;

pub const ENV_GENERATION_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_INDEX_API_KEY: &str = "PINECONE_API_KEY";
pub const ENV_EMBEDDING_API_KEY: &str = "EMBEDDING_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RagConfig {
    /// Chat model served by the generation backend.
    pub model: String,
    pub max_tokens: u32,
    pub generation_base_url: String,

    /// Must match the model the corpus was indexed with.
    pub embedding_model: String,
    pub embedding_url: String,

    pub index_name: String,
    /// Data-plane host of the hosted index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// K: excerpts requested per question.
    pub top_k: usize,
    /// W: most recent turns replayed into each prompt.
    pub history_window: usize,
    pub excerpt_budget_chars: usize,

    /// Per external call. Unset means no limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            generation_base_url: DEFAULT_GENERATION_BASE_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            index_host: None,
            namespace: None,
            top_k: DEFAULT_TOP_K,
            history_window: DEFAULT_HISTORY_WINDOW,
            excerpt_budget_chars: DEFAULT_EXCERPT_BUDGET_CHARS,
            request_timeout_secs: None,
        }
    }
}

/// `~/.acs-chat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".acs-chat").join("config.toml"))
}

impl RagConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| RagErr::invalid_config(e.to_string()))
    }

    /// Load from `path` (which must exist) or from the default location (which
    /// may be absent), then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.is_file()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RagErr::invalid_config(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "loaded config file");
        toml::from_str(&contents)
            .map_err(|e| RagErr::invalid_config(format!("{}: {e}", path.display())))
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = lookup("ACS_CHAT_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("ACS_CHAT_MAX_TOKENS") {
            self.max_tokens = parse_env("ACS_CHAT_MAX_TOKENS", &v)?;
        }
        if let Some(v) = lookup("ACS_CHAT_GENERATION_URL") {
            self.generation_base_url = v;
        }
        if let Some(v) = lookup("ACS_CHAT_EMBEDDING_MODEL") {
            self.embedding_model = v;
        }
        if let Some(v) = lookup("ACS_CHAT_EMBEDDING_URL") {
            self.embedding_url = v;
        }
        if let Some(v) = lookup("ACS_CHAT_INDEX_NAME") {
            self.index_name = v;
        }
        if let Some(v) = lookup("PINECONE_INDEX_HOST") {
            self.index_host = Some(v);
        }
        if let Some(v) = lookup("PINECONE_NAMESPACE") {
            self.namespace = Some(v);
        }
        if let Some(v) = lookup("ACS_CHAT_TOP_K") {
            self.top_k = parse_env("ACS_CHAT_TOP_K", &v)?;
        }
        if let Some(v) = lookup("ACS_CHAT_HISTORY_WINDOW") {
            self.history_window = parse_env("ACS_CHAT_HISTORY_WINDOW", &v)?;
        }
        if let Some(v) = lookup("ACS_CHAT_EXCERPT_BUDGET") {
            self.excerpt_budget_chars = parse_env("ACS_CHAT_EXCERPT_BUDGET", &v)?;
        }
        if let Some(v) = lookup("ACS_CHAT_TIMEOUT_SECS") {
            self.request_timeout_secs = Some(parse_env("ACS_CHAT_TIMEOUT_SECS", &v)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagErr::invalid_config("top_k must be at least 1"));
        }
        if self.history_window == 0 {
            return Err(RagErr::invalid_config("history_window must be at least 1"));
        }
        if self.max_tokens == 0 {
            return Err(RagErr::invalid_config("max_tokens must be at least 1"));
        }
        if self.excerpt_budget_chars == 0 {
            return Err(RagErr::invalid_config(
                "excerpt_budget_chars must be at least 1",
            ));
        }
        if self.model.trim().is_empty() {
            return Err(RagErr::invalid_config("model must not be empty"));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(RagErr::invalid_config(
                "request_timeout_secs must be at least 1 when set",
            ));
        }
        Ok(())
    }

    pub const fn assembler(&self) -> PromptAssembler {
        PromptAssembler::new(self.history_window, self.excerpt_budget_chars)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

fn parse_env<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RagErr::invalid_config(format!("{key}={value:?}: {e}")))
}

/// API keys for the three external services.
#[derive(Clone, Default)]
pub struct Credentials {
    pub generation_api_key: Option<String>,
    pub index_api_key: Option<String>,
    pub embedding_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            generation_api_key: lookup(ENV_GENERATION_API_KEY),
            index_api_key: lookup(ENV_INDEX_API_KEY),
            embedding_api_key: lookup(ENV_EMBEDDING_API_KEY),
        }
    }

    pub fn require_generation_key(&self) -> Result<&str> {
        self.generation_api_key
            .as_deref()
            .ok_or_else(|| RagErr::invalid_config(format!("{ENV_GENERATION_API_KEY} is not set")))
    }

    pub fn require_index_key(&self) -> Result<&str> {
        self.index_api_key
            .as_deref()
            .ok_or_else(|| RagErr::invalid_config(format!("{ENV_INDEX_API_KEY} is not set")))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("generation_api_key", &redact(&self.generation_api_key))
            .field("index_api_key", &redact(&self.index_api_key))
            .field("embedding_api_key", &redact(&self.embedding_api_key))
            .finish()
    }
}
