use async_trait::async_trait;
use crate::types::{AppError, AppResult, LLMProvider, LLMRequest, LLMResponse};

#[async_trait]
pub trait LLMAdapter: Send + Sync {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse>;
}

/// Configuration for LLM provider (renamed to avoid conflict with LLMProvider enum in types.rs)
pub struct LLMProviderConfig {
    pub name: String,
    pub api_key: String,
}

pub struct LLM {
    adapter: Box<dyn LLMAdapter>,
    provider: LLMProvider,
}

impl LLM {
    pub fn new(config: LLMProviderConfig) -> AppResult<Self> {
        let provider = LLMProvider::parse(&config.name)
            .ok_or_else(|| AppError::LLMApi(format!("Unsupported provider: {}", config.name)))?;

        let adapter: Box<dyn LLMAdapter> = match provider {
            LLMProvider::OpenAI => Box::new(crate::llm::openai::OpenAIAdapter::new(&config.api_key)),
            LLMProvider::Groq => Box::new(crate::llm::groq::GroqAdapter::new(&config.api_key)),
        };

        Ok(Self { adapter, provider })
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }
}

#[async_trait]
impl LLMAdapter for LLM {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        self.adapter.create_chat_completion(request).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::types::TokenUsage;
    use std::sync::Mutex;

    /// Adapter that replays scripted replies and keeps every request
    #[derive(Default)]
    pub struct ScriptedLLM {
        pub replies: Mutex<Vec<AppResult<String>>>,
        pub requests: Mutex<Vec<LLMRequest>>,
    }

    impl ScriptedLLM {
        pub fn with_replies(replies: Vec<AppResult<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LLMAdapter for ScriptedLLM {
        async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                return Err(AppError::LLMApi("no scripted reply left".to_string()));
            }
            let content = replies.remove(0)?;
            Ok(LLMResponse {
                content,
                finish_reason: "stop".to_string(),
                usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 20,
                    total_tokens: 30,
                },
            })
        }
    }
}
