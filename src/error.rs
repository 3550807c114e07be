use thiserror::Error;

/// パイプライン全体で共有するエラー種別
///
/// 各コンポーネントは `anyhow::Result` で伝播しつつ、失敗の種類を
/// この列挙型で明示する。自動リトライは行わず、すべてメニュー層で
/// メッセージとして表示される。
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 指定された入力デバイスが見つからない、または開けない
    #[error("入力デバイスが利用できません: {0}")]
    DeviceUnavailable(String),

    /// 録音セッション中のI/Oエラー。部分バッファは破棄される
    #[error("録音に失敗しました: {0}")]
    RecordingFailed(String),

    /// 文字起こしAPIの呼び出し失敗。元の録音ファイルは移動しない
    #[error("文字起こしに失敗しました: {0}")]
    TranscriptionFailed(String),

    /// 句読点復元の呼び出し失敗。生の文字起こし結果で続行する
    #[error("句読点の復元に失敗しました: {0}")]
    RestorationFailed(String),

    /// テーマ抽出の呼び出し失敗。タグ無しで保存を続行する
    #[error("テーマ抽出に失敗しました: {0}")]
    ThemeExtractionFailed(String),

    /// Vault配下のディレクトリ作成・ファイル書き込み失敗
    #[error("保存先に書き込めません: {0}")]
    DestinationUnwritable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_contains_detail() {
        let err = PipelineError::DeviceUnavailable("USB Mic".to_string());
        assert!(err.to_string().contains("USB Mic"));

        let err = PipelineError::TranscriptionFailed("401 Unauthorized".to_string());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_error_downcast_through_anyhow() {
        let err: anyhow::Error = PipelineError::RecordingFailed("stream closed".to_string()).into();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::RecordingFailed(_))));
    }
}
