use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;

use crate::types::LLMProvider;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LLMConfig,
    pub classifier: ClassifierConfig,
    pub weather: WeatherConfig,
    pub knowledge: KnowledgeConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_upload_bytes: usize,
}

#[derive(Clone, Deserialize)]
pub struct LLMConfig {
    pub openai_api_key: String,
    pub groq_api_key: String,
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl LLMConfig {
    /// API key for the configured provider, if one is set
    pub fn active_api_key(&self) -> Option<String> {
        let key = match LLMProvider::parse(&self.provider)? {
            LLMProvider::OpenAI => &self.openai_api_key,
            LLMProvider::Groq => &self.groq_api_key,
        };
        if key.is_empty() {
            None
        } else {
            Some(key.clone())
        }
    }
}

impl std::fmt::Debug for LLMConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LLMConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("configured", &self.api_key.is_some())
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct KnowledgeConfig {
    pub api_endpoint: Option<String>,
    pub token: Option<String>,
    pub keyspace: String,
    pub collection: String,
    pub top_k: usize,
}

impl KnowledgeConfig {
    pub fn is_configured(&self) -> bool {
        self.api_endpoint.is_some() && self.token.is_some()
    }
}

impl std::fmt::Debug for KnowledgeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeConfig")
            .field("api_endpoint", &self.api_endpoint)
            .field("keyspace", &self.keyspace)
            .field("collection", &self.collection)
            .field("top_k", &self.top_k)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub reports_dir: String,
}

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// An explicit model wins; otherwise the provider's default
fn model_or_default(provider: &str, model: Option<String>) -> String {
    model.unwrap_or_else(|| {
        LLMProvider::parse(provider)
            .unwrap_or(LLMProvider::OpenAI)
            .default_model()
            .to_string()
    })
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider = env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());

        let config = Self {
            server: ServerConfig {
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8501".to_string())
                    .parse()?,
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                cors_allowed_origins: env::var("ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "http://localhost:8501,http://localhost:5173".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                    .unwrap_or_else(|_| (10 * 1024 * 1024).to_string())
                    .parse()?,
            },
            llm: LLMConfig {
                openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
                groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
                model: model_or_default(&provider, non_empty("LLM_MODEL")),
                provider,
                max_tokens: env::var("LLM_MAX_TOKENS")
                    .unwrap_or_else(|_| "2048".to_string())
                    .parse()?,
                temperature: env::var("LLM_TEMPERATURE")
                    .unwrap_or_else(|_| "0.7".to_string())
                    .parse()?,
            },
            classifier: ClassifierConfig {
                url: non_empty("CLASSIFIER_URL")
                    .ok_or_else(|| anyhow!("CLASSIFIER_URL must be set"))?,
                timeout_secs: env::var("CLASSIFIER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            weather: WeatherConfig {
                api_key: non_empty("WEATHER_API_KEY"),
                api_base: env::var("WEATHER_API_BASE")
                    .unwrap_or_else(|_| "http://api.weatherapi.com/v1".to_string()),
                timeout_secs: 10,
            },
            knowledge: KnowledgeConfig {
                api_endpoint: non_empty("ASTRA_DB_API_ENDPOINT"),
                token: non_empty("ASTRA_DB_APPLICATION_TOKEN"),
                keyspace: env::var("ASTRA_DB_KEYSPACE")
                    .unwrap_or_else(|_| "default_keyspace".to_string()),
                collection: env::var("ASTRA_DB_COLLECTION")
                    .unwrap_or_else(|_| "plant_responses".to_string()),
                top_k: env::var("KNOWLEDGE_TOP_K")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()?,
            },
            storage: StorageConfig {
                reports_dir: env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Startup checks: an unknown provider or a missing key for it is fatal
    pub fn validate(&self) -> Result<()> {
        let provider = LLMProvider::parse(&self.llm.provider)
            .ok_or_else(|| anyhow!("Unsupported LLM_PROVIDER: {}", self.llm.provider))?;
        if self.llm.active_api_key().is_none() {
            return Err(anyhow!("API key for LLM provider '{}' is not set", provider));
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn test_config(reports_dir: &str) -> Config {
    Config {
        server: ServerConfig {
            port: 8501,
            host: "127.0.0.1".to_string(),
            cors_allowed_origins: vec!["http://localhost:8501".to_string()],
            max_upload_bytes: 1024 * 1024,
        },
        llm: LLMConfig {
            openai_api_key: "sk-test".to_string(),
            groq_api_key: String::new(),
            provider: "openai".to_string(),
            model: "gpt-4.1-mini".to_string(),
            max_tokens: 512,
            temperature: 0.7,
        },
        classifier: ClassifierConfig {
            url: "http://localhost:8501/v1/models/pathogen:predict".to_string(),
            timeout_secs: 5,
        },
        weather: WeatherConfig {
            api_key: None,
            api_base: "http://api.weatherapi.com/v1".to_string(),
            timeout_secs: 5,
        },
        knowledge: KnowledgeConfig {
            api_endpoint: None,
            token: None,
            keyspace: "default_keyspace".to_string(),
            collection: "plant_responses".to_string(),
            top_k: 3,
        },
        storage: StorageConfig {
            reports_dir: reports_dir.to_string(),
        },
    }
}
