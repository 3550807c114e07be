use crate::config::WhisperConfig;
use crate::error::PipelineError;
use crate::transcribe_backend::Transcribe;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

const TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// OpenAI Whisper API レスポンス
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// OpenAI Whisper API クライアント
///
/// 保存済み音声ファイルをmultipartでアップロードし、文字起こし
/// 結果のテキストを受け取る。ストリーミングは行わない。
pub struct WhisperClient {
    config: WhisperConfig,
    client: reqwest::Client,
}

impl WhisperClient {
    pub fn new(config: &WhisperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Whisper API HTTPクライアント作成失敗")?;

        Ok(Self {
            config: config.clone(),
            client,
        })
    }
}

#[async_trait]
impl Transcribe for WhisperClient {
    async fn transcribe_file(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            PipelineError::TranscriptionFailed(format!("音声ファイルの読み込みに失敗 {:?}: {}", path, e))
        })?;

        log::debug!("Whisper API: {} を送信 ({} バイト)", path.display(), bytes.len());

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio.wav".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(mime_for_path(path))
            .context("multipartパートの作成に失敗")?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());

        if let Some(ref language) = self.config.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post(TRANSCRIPTIONS_URL)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::TranscriptionFailed(format!("リクエスト失敗: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(
                PipelineError::TranscriptionFailed(format!("{} - {}", status, error_text)).into(),
            );
        }

        let whisper_response: WhisperResponse = response
            .json::<WhisperResponse>()
            .await
            .map_err(|e| PipelineError::TranscriptionFailed(format!("レスポンスパース失敗: {}", e)))?;

        log::debug!("Whisper API: 文字起こし結果 - {}", whisper_response.text);

        Ok(whisper_response.text)
    }
}

/// 拡張子からアップロード用のMIMEタイプを決める
fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_mime_for_path() {
        assert_eq!(mime_for_path(Path::new("a.wav")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("a.WAV")), "audio/wav");
        assert_eq!(mime_for_path(Path::new("memo.m4a")), "audio/mp4");
        assert_eq!(mime_for_path(Path::new("clip.webm")), "audio/webm");
        assert_eq!(
            mime_for_path(Path::new("unknown.bin")),
            "application/octet-stream"
        );
        assert_eq!(
            mime_for_path(&PathBuf::from("noext")),
            "application/octet-stream"
        );
    }

    #[test]
    fn test_whisper_response_parse() {
        let json = r#"{"text": "hello world"}"#;
        let response: WhisperResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text, "hello world");
    }

    #[test]
    fn test_client_creation() {
        let config = WhisperConfig {
            api_key: "sk-test".to_string(),
            model: "whisper-1".to_string(),
            language: Some("ja".to_string()),
        };
        assert!(WhisperClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_transcription_failure() {
        let config = WhisperConfig {
            api_key: "sk-test".to_string(),
            model: "whisper-1".to_string(),
            language: None,
        };
        let client = WhisperClient::new(&config).unwrap();

        let result = client
            .transcribe_file(Path::new("/nonexistent/audio.wav"))
            .await;
        let err = result.unwrap_err();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::TranscriptionFailed(_))));
    }
}
