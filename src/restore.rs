use crate::chat_api::ChatClient;
use crate::config::RestoreConfig;
use crate::error::PipelineError;
use anyhow::Result;

const SYSTEM_PROMPT: &str =
    "あなたは文章整形のアシスタントです。句読点と段落区切りを復元してください。";

/// 句読点・段落の復元
///
/// Whisperの出力は句読点や段落を落とすことがあるため、保存前に
/// テキスト生成APIで補う。意味の変更や内容の追加はプロンプトで
/// 禁止している。
pub struct GrammarRestorer {
    chat: ChatClient,
}

impl GrammarRestorer {
    pub fn new(api_key: &str, config: &RestoreConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(api_key, &config.model)?,
        })
    }

    /// テキストに句読点と段落区切りを補って返す
    ///
    /// # Errors
    ///
    /// API呼び出しに失敗した場合は `RestorationFailed`。呼び出し元は
    /// 生のテキストで続行してよい。
    pub async fn restore(&self, text: &str) -> Result<String> {
        let prompt = format!(
            "次のテキストには句読点や段落区切りがありません。\
             正しい句読点を付け、段落の切れ目で改行を入れて返してください。\
             意味を変えたり内容を追加したりしないでください。\n\n\
             テキスト: {}",
            text
        );

        let restored = self
            .chat
            .complete(SYSTEM_PROMPT, &prompt, 0.2, None)
            .await
            .map_err(|e| PipelineError::RestorationFailed(e.to_string()))?;

        log::info!("句読点と段落区切りを復元しました");

        Ok(restored.trim().to_string())
    }
}
