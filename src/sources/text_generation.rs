//! 外部テキスト生成APIによるコメントソース
//!
//! OpenAI互換のchat completionsエンドポイントに短いプロンプトを送り、
//! 返ってきた1行をコメントとして使う。失敗時はリトライしない。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CommentRequest, CommentSource, CommentSourceError};

/// テキスト生成ソースの設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextGenerationConfig {
    /// 有効化フラグ（無効時はフレーズバンクを使う）
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    /// APIキーを読む環境変数名
    pub api_key_env: String,
    pub speaker_name: String,
    pub topic: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for TextGenerationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            speaker_name: "JessicaLive".to_string(),
            topic: "livestream".to_string(),
            temperature: 0.9,
            max_tokens: 30,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// テキスト生成APIソース
pub struct TextGenerationSource {
    config: TextGenerationConfig,
    api_key: String,
    client: reqwest::Client,
}

impl TextGenerationSource {
    /// 環境変数からAPIキーを読み込んで作成
    pub fn from_env(config: TextGenerationConfig) -> Result<Self, CommentSourceError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CommentSourceError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, api_key)
    }

    pub fn new(config: TextGenerationConfig, api_key: String) -> Result<Self, CommentSourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn config(&self) -> &TextGenerationConfig {
        &self.config
    }
}

/// プロンプトを組み立てる
pub fn build_prompt(request: &CommentRequest) -> String {
    format!(
        "Generate a short {} style comment for a fake livestream hosted by {} on the topic \"{}\". Make it sound like a real chat message.",
        request.tone.as_key(),
        request.speaker_name,
        request.topic
    )
}

/// レスポンスJSONから最初の候補を取り出す
fn extract_reply(body: &str) -> Result<String, CommentSourceError> {
    let response: ChatCompletionResponse = serde_json::from_str(body)?;
    let reply = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().trim_matches('"').trim().to_string())
        .unwrap_or_default();

    if reply.is_empty() {
        return Err(CommentSourceError::EmptyReply);
    }
    Ok(reply)
}

#[async_trait]
impl CommentSource for TextGenerationSource {
    async fn produce_comment(&self, request: &CommentRequest) -> Result<String, CommentSourceError> {
        let body = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(request),
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "🤖 [TEXTGEN] Comment request rejected");
            return Err(CommentSourceError::Status(status.as_u16()));
        }

        let text = response.text().await?;
        let reply = extract_reply(&text)?;
        tracing::debug!(length = reply.len(), "🤖 [TEXTGEN] Comment generated");
        Ok(reply)
    }

    fn name(&self) -> &'static str {
        "text-generation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::CommentMode;

    #[test]
    fn test_prompt_mentions_tone_speaker_and_topic() {
        let request = CommentRequest::new(CommentMode::Troll, "MaxPlays", "speedrun");
        let prompt = build_prompt(&request);
        assert!(prompt.contains("troll style"));
        assert!(prompt.contains("hosted by MaxPlays"));
        assert!(prompt.contains("\"speedrun\""));
    }

    #[test]
    fn test_extract_reply_trims_quotes_and_whitespace() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  \"W stream!!\" \n"}}]}"#;
        assert_eq!(extract_reply(body).expect("reply"), "W stream!!");
    }

    #[test]
    fn test_extract_reply_rejects_empty_choices() {
        let body = r#"{"choices":[]}"#;
        assert!(matches!(extract_reply(body), Err(CommentSourceError::EmptyReply)));

        let blank = r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#;
        assert!(matches!(extract_reply(blank), Err(CommentSourceError::EmptyReply)));
    }

    #[test]
    fn test_extract_reply_rejects_malformed_json() {
        assert!(matches!(
            extract_reply("not json"),
            Err(CommentSourceError::JsonParse(_))
        ));
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = TextGenerationConfig {
            api_key_env: "VIRALSTAGE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        match TextGenerationSource::from_env(config) {
            Err(CommentSourceError::MissingApiKey(var)) => {
                assert_eq!(var, "VIRALSTAGE_TEST_KEY_THAT_IS_NEVER_SET")
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected missing key error"),
        }
    }
}
