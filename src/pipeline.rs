use crate::restore::GrammarRestorer;
use crate::themes::ThemeExtractor;
use crate::transcribe_backend::Transcribe;
use crate::types::Transcript;
use crate::vault::VaultWriter;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// 1件の処理結果
#[derive(Debug)]
pub struct ProcessedNote {
    /// 書き込んだノートのパス
    pub transcript_path: PathBuf,

    /// 移動後の音声ファイルのパス
    pub audio_path: PathBuf,

    /// 保存した文字起こし結果
    pub transcript: Transcript,
}

/// 1クリップ分の完全な処理パイプライン
///
/// 文字起こし、句読点復元、テーマ抽出、Vault保存を統合する。
/// 復元とテーマ抽出は設定で無効化でき、失敗しても文字起こし結果の
/// 保存は続行する。文字起こし自体の失敗はそのまま伝播し、元の
/// 音声ファイルには触れない。
pub struct Pipeline {
    transcriber: Box<dyn Transcribe>,
    restorer: Option<GrammarRestorer>,
    themes: Option<ThemeExtractor>,
    vault: VaultWriter,
}

impl Pipeline {
    pub fn new(
        transcriber: Box<dyn Transcribe>,
        restorer: Option<GrammarRestorer>,
        themes: Option<ThemeExtractor>,
        vault: VaultWriter,
    ) -> Self {
        Self {
            transcriber,
            restorer,
            themes,
            vault,
        }
    }

    pub fn vault(&self) -> &VaultWriter {
        &self.vault
    }

    /// 保存済みの音声ファイルを最後まで処理する
    ///
    /// ノートの書き込みが成功するまで音声ファイルは移動しない。
    /// 途中のどの失敗でも元の録音は元の場所に残る。
    pub async fn process_file(&self, audio_path: &Path) -> Result<ProcessedNote> {
        log::info!("文字起こしを開始します: {:?}", audio_path);
        let raw_text = self.transcriber.transcribe_file(audio_path).await?;
        log::info!("文字起こし結果: {}", raw_text);

        let restored = if let Some(restorer) = &self.restorer {
            match restorer.restore(&raw_text).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("{}。整形前のテキストで続行します", e);
                    raw_text
                }
            }
        } else {
            raw_text
        };

        let themes = if let Some(extractor) = &self.themes {
            match extractor.extract_themes(&restored).await {
                Ok(themes) => themes,
                Err(e) => {
                    log::warn!("{}。タグ無しで保存します", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let transcript = Transcript {
            text: restored,
            themes,
        };
        let title = title_words(&transcript.text);

        // ノートの書き込みが成功してから音声を移動する
        let transcript_path =
            self.vault
                .save_transcription(&transcript.text, &title, &transcript.themes)?;
        let audio_path = self.vault.move_audio_file(audio_path, &title)?;

        log::info!(
            "処理が完了しました: ノート {:?}, 音声 {:?}",
            transcript_path,
            audio_path
        );

        Ok(ProcessedNote {
            transcript_path,
            audio_path,
            transcript,
        })
    }
}

/// ノートのタイトルに使う先頭3語を取り出す
pub fn title_words(text: &str) -> String {
    text.split_whitespace()
        .take(3)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::fs;
    use tempfile::TempDir;

    struct FixedTranscriber {
        text: String,
    }

    #[async_trait]
    impl Transcribe for FixedTranscriber {
        async fn transcribe_file(&self, _path: &Path) -> Result<String> {
            Ok(self.text.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl Transcribe for FailingTranscriber {
        async fn transcribe_file(&self, _path: &Path) -> Result<String> {
            Err(PipelineError::TranscriptionFailed("mock failure".to_string()).into())
        }
    }

    fn setup_vault_with_clip(temp_dir: &TempDir) -> (VaultWriter, PathBuf) {
        let vault = VaultWriter::new(temp_dir.path()).unwrap();
        let clip_path = vault.audio_input_dir().join("recording_2026_08_06__14_30_15.wav");
        fs::write(&clip_path, b"fake wav data").unwrap();
        (vault, clip_path)
    }

    fn note_files(temp_dir: &TempDir) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let text_dir = temp_dir.path().join("Audios").join("SpeechToText");
        let mut stack = vec![text_dir];
        while let Some(dir) = stack.pop() {
            for entry in fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    found.push(path);
                }
            }
        }
        found
    }

    #[tokio::test]
    async fn test_round_trip_with_mock_transcriber() {
        let temp_dir = TempDir::new().unwrap();
        let (vault, clip_path) = setup_vault_with_clip(&temp_dir);

        let pipeline = Pipeline::new(
            Box::new(FixedTranscriber {
                text: "hello world".to_string(),
            }),
            None,
            None,
            vault,
        );

        let note = pipeline.process_file(&clip_path).await.unwrap();

        let content = fs::read_to_string(&note.transcript_path).unwrap();
        assert_eq!(content, "\"hello world\"");

        // 音声は取り込みフォルダから処理済みフォルダへ移動している
        assert!(!clip_path.exists());
        assert!(note.audio_path.exists());
        assert!(note
            .audio_path
            .starts_with(temp_dir.path().join("Audios").join("Translated")));

        assert_eq!(note.transcript.text, "hello world");
        assert!(note.transcript.themes.is_empty());
    }

    #[tokio::test]
    async fn test_transcription_failure_leaves_source_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let (vault, clip_path) = setup_vault_with_clip(&temp_dir);

        let pipeline = Pipeline::new(Box::new(FailingTranscriber), None, None, vault);

        let result = pipeline.process_file(&clip_path).await;

        let err = result.unwrap_err();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::TranscriptionFailed(_))));

        // 元の録音は移動されず、ノートも書かれない
        assert!(clip_path.exists());
        assert!(note_files(&temp_dir).is_empty());
    }

    #[tokio::test]
    async fn test_note_write_failure_leaves_source_in_place() {
        let temp_dir = TempDir::new().unwrap();
        let (vault, clip_path) = setup_vault_with_clip(&temp_dir);

        // ノート書き込み先を潰して書き込みを失敗させる
        let text_dir = temp_dir.path().join("Audios").join("SpeechToText");
        fs::remove_dir_all(&text_dir).unwrap();
        fs::write(&text_dir, b"in the way").unwrap();

        let pipeline = Pipeline::new(
            Box::new(FixedTranscriber {
                text: "hello world".to_string(),
            }),
            None,
            None,
            vault,
        );

        let result = pipeline.process_file(&clip_path).await;

        let err = result.unwrap_err();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::DestinationUnwritable(_))));

        // 書き込みに失敗したら移動は行わない
        assert!(clip_path.exists());
    }

    #[test]
    fn test_title_words() {
        assert_eq!(title_words("hello world foo bar"), "hello world foo");
        assert_eq!(title_words("ひとつ ふたつ"), "ひとつ ふたつ");
        assert_eq!(title_words(""), "");
        assert_eq!(title_words("   "), "");
    }
}
