use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// 文字起こしバックエンドの共通トレイト
///
/// パイプラインはこのトレイト経由でバックエンドを呼び出す。
/// テストではモック実装に差し替える。
#[async_trait]
pub trait Transcribe: Send + Sync {
    /// 保存済みの音声ファイルを文字起こしして本文を返す
    ///
    /// 1ファイルにつき1回のブロッキング呼び出し。リトライは行わず、
    /// 失敗は `TranscriptionFailed` として呼び出し元へそのまま
    /// 伝播する。
    async fn transcribe_file(&self, path: &Path) -> Result<String>;
}
