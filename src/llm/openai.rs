use crate::llm::{LLMAdapter, LLMRequest, LLMResponse};
use crate::types::{AppError, AppResult, LLMMessage, TokenUsage};
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

pub struct OpenAIAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAIAdapter {
    pub fn new(api_key: &str) -> Self {
        Self::new_with_api_base(api_key, OPENAI_API_BASE)
    }

    /// For OpenAI-compatible endpoints (Groq, local gateways)
    pub fn new_with_api_base(api_key: &str, api_base: &str) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base);
        Self {
            client: Client::with_config(config),
        }
    }

    fn convert_message(msg: &LLMMessage) -> AppResult<ChatCompletionRequestMessage> {
        let converted: ChatCompletionRequestMessage = match msg.role.as_str() {
            "system" => ChatCompletionRequestSystemMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(|e| AppError::LLMApi(e.to_string()))?
                .into(),
            "user" => ChatCompletionRequestUserMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(|e| AppError::LLMApi(e.to_string()))?
                .into(),
            "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
                .content(msg.content.clone())
                .build()
                .map_err(|e| AppError::LLMApi(e.to_string()))?
                .into(),
            other => {
                return Err(AppError::LLMApi(format!("Unknown message role: {}", other)));
            }
        };
        Ok(converted)
    }
}

#[async_trait]
impl LLMAdapter for OpenAIAdapter {
    async fn create_chat_completion(&self, request: &LLMRequest) -> AppResult<LLMResponse> {
        let messages = request
            .messages
            .iter()
            .map(Self::convert_message)
            .collect::<AppResult<Vec<_>>>()?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(request.model.clone()).messages(messages);
        if let Some(max_tokens) = request.max_tokens {
            args.max_completion_tokens(max_tokens);
        }
        if let Some(temperature) = request.temperature {
            args.temperature(temperature);
        }
        let chat_request = args
            .build()
            .map_err(|e| AppError::LLMApi(format!("Invalid chat request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| AppError::LLMApi(format!("OpenAI request failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LLMApi("OpenAI returned no choices".to_string()))?;

        let usage = response
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .map(|r| format!("{:?}", r).to_lowercase())
                .unwrap_or_else(|| "unknown".to_string()),
            usage,
        })
    }
}
