use log::warn;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PERSONA: &str = "You are Fiona, a friendly engineering student who loves building things: \
circuits, embedded projects, compilers and anything else that blinks or computes. \
You enjoy Python, C, Arduino and Verilog. \
Be warm, helpful and conversational, and keep answers short (a few sentences). \
When asked about yourself, talk about tinkering, projects and learning. \
You cannot browse the web or look up live information, so just chat naturally.";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown chat provider '{0}' (expected 'gemini' or 'groq')")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    Groq,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_API_KEY",
            ProviderKind::Groq => "GROQ_API_KEY",
        }
    }

    fn model_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_MODEL",
            ProviderKind::Groq => "GROQ_MODEL",
        }
    }

    fn base_url_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GEMINI_BASE_URL",
            ProviderKind::Groq => "GROQ_BASE_URL",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini-1.5-flash",
            ProviderKind::Groq => "llama-3.1-8b-instant",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::Groq => "https://api.groq.com/openai/v1",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ProviderKind::Gemini),
            "groq" | "llama" => Ok(ProviderKind::Groq),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Gemini => write!(f, "gemini"),
            ProviderKind::Groq => write!(f, "groq"),
        }
    }
}

/// Everything a provider adapter needs, fixed at start-up.
#[derive(Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl ProviderConfig {
    /// Defaults for `kind` with the given key; mostly useful in tests.
    pub fn new(kind: ProviderKind, api_key: Option<String>) -> Self {
        Self {
            kind,
            api_key,
            model: kind.default_model().to_string(),
            base_url: kind.default_base_url().to_string(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// Keep the key out of debug output.
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("kind", &self.kind)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub persona: String,
    pub provider: ProviderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let kind = match lookup("CHAT_PROVIDER") {
            Some(value) => value.parse::<ProviderKind>()?,
            None => ProviderKind::Gemini,
        };

        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = ProviderConfig {
            kind,
            api_key: non_empty(kind.credential_var()),
            model: non_empty(kind.model_var()).unwrap_or_else(|| kind.default_model().to_string()),
            base_url: non_empty(kind.base_url_var())
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| kind.default_base_url().to_string()),
            temperature: parse_or_warn(&lookup, "TEMPERATURE"),
            max_tokens: parse_or_warn(&lookup, "MAX_TOKENS"),
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or_warn(&lookup, "PORT").unwrap_or(5000),
            persona: non_empty("PERSONA").unwrap_or_else(|| DEFAULT_PERSONA.to_string()),
            provider,
        })
    }
}

fn parse_or_warn<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {} value: {}", key, raw);
            None
        }
    }
}
