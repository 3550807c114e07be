use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Chat Completions リクエスト
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Chat Completions レスポンス
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// OpenAI Chat Completions クライアント
///
/// 句読点復元とテーマ抽出が共有するテキスト生成の土台。
/// 1回の補完につき1回のブロッキング呼び出しで、リトライは
/// 行わない。エラーの種別付けは呼び出し側の責務。
pub struct ChatClient {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(api_key: &str, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Chat API HTTPクライアント作成失敗")?;

        Ok(Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            client,
        })
    }

    /// system / user プロンプトで補完を実行して本文を返す
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: Option<u32>,
    ) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature,
            max_tokens,
            response_format: ResponseFormat {
                format_type: "text".to_string(),
            },
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .context("Chat API リクエスト失敗")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat API エラー: {} - {}", status, error_text);
        }

        let chat_response: ChatResponse = response
            .json::<ChatResponse>()
            .await
            .context("Chat API レスポンスパース失敗")?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .context("Chat API レスポンスにchoicesがありません")?;

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parse() {
        let json = r##"{
            "choices": [
                {"message": {"role": "assistant", "content": "#テーマ1\n#テーマ2"}}
            ]
        }"##;
        let response: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.choices.len(), 1);
        assert_eq!(response.choices[0].message.content, "#テーマ1\n#テーマ2");
    }

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: "test".to_string(),
            }],
            temperature: 0.3,
            max_tokens: Some(100),
            response_format: ResponseFormat {
                format_type: "text".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 100);
        assert_eq!(json["response_format"]["type"], "text");
    }

    #[test]
    fn test_chat_request_omits_absent_max_tokens() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: Vec::new(),
            temperature: 0.2,
            max_tokens: None,
            response_format: ResponseFormat {
                format_type: "text".to_string(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_client_creation() {
        assert!(ChatClient::new("sk-test", "gpt-4o").is_ok());
    }
}
