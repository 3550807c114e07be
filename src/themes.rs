use crate::chat_api::ChatClient;
use crate::config::ThemesConfig;
use crate::error::PipelineError;
use anyhow::Result;

const SYSTEM_PROMPT: &str = "あなたはテーマ抽出のアシスタントです。\
     主要なテーマをハッシュタグとして1行に1つずつ出力してください。簡潔かつ正確に。";

/// テーマ抽出器
///
/// 整形済みテキストから主要テーマを抽出し、ハッシュタグ形式の
/// 文字列リストとして返す。抽出されたテーマはノート本文の末尾に
/// 追記され、Vault側でタグとして機能する。
pub struct ThemeExtractor {
    chat: ChatClient,
    count: usize,
}

impl ThemeExtractor {
    pub fn new(api_key: &str, config: &ThemesConfig) -> Result<Self> {
        Ok(Self {
            chat: ChatClient::new(api_key, &config.model)?,
            count: config.count,
        })
    }

    /// テキストからテーマを抽出する
    ///
    /// # Returns
    ///
    /// `#` で始まるテーマ文字列のリスト。レスポンスのうち
    /// ハッシュタグ形式でない行は捨てる。
    ///
    /// # Errors
    ///
    /// API呼び出しに失敗した場合は `ThemeExtractionFailed`。
    /// 呼び出し元はタグ無しで保存を続行してよい。
    pub async fn extract_themes(&self, text: &str) -> Result<Vec<String>> {
        let prompt = format!(
            "次のテキストから主要なテーマをちょうど{count}個抽出してください。\
             各テーマはトピックや概念を表す1語か短いフレーズにしてください。\
             テーマは1行に1つ、ハッシュタグ形式で出力してください。\
             複数語のテーマは空白を入れずcamelCaseかハイフンでつなげてください。\
             番号や余計な説明は付けないでください。\n\n\
             テキスト: {text}\n\n\
             出力例:\n\
             #人工知能\n\
             #データ分析\n\
             #機械学習",
            count = self.count,
            text = text
        );

        let response = self
            .chat
            .complete(SYSTEM_PROMPT, &prompt, 0.3, Some(100))
            .await
            .map_err(|e| PipelineError::ThemeExtractionFailed(e.to_string()))?;

        let themes = parse_themes(&response);

        log::info!("{}個のテーマを抽出しました", themes.len());

        Ok(themes)
    }
}

/// レスポンス本文からハッシュタグ行を取り出す
fn parse_themes(response: &str) -> Vec<String> {
    response
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty() && line.starts_with('#'))
        .map(|line| line.to_string())
        .collect()
}
