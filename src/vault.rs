use crate::error::PipelineError;
use anyhow::Result;
use chrono::{DateTime, Local};
use regex_lite::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// 取り込み対象の音声ファイル拡張子
const AUDIO_EXTENSIONS: [&str; 3] = ["m4a", "webm", "wav"];

/// Vaultへの書き込みとファイル移動
///
/// Vault内のフォルダ構成は固定:
///
/// - `Audios/Translate` - 取り込み待ちの音声 (inbox)
/// - `Audios/Translated` - 処理済みの音声
/// - `Audios/SpeechToText` - 文字起こしノート (Markdown)
///
/// ノート書き込みと音声移動はそれぞれ年/月/日のサブディレクトリに
/// 振り分けられる。書き込みに失敗した場合は `DestinationUnwritable`
/// になり、移動元の音声ファイルには触れない。
#[derive(Debug)]
pub struct VaultWriter {
    audio_input_dir: PathBuf,
    audio_output_dir: PathBuf,
    text_output_dir: PathBuf,
}

impl VaultWriter {
    /// Vaultルートからフォルダ構成を初期化する
    ///
    /// 必要なディレクトリが無ければ作成する。
    ///
    /// # Errors
    ///
    /// ディレクトリが作成できない場合は `DestinationUnwritable`。
    pub fn new<P: AsRef<Path>>(vault_root: P) -> Result<Self> {
        let audios = vault_root.as_ref().join("Audios");

        let writer = Self {
            audio_input_dir: audios.join("Translate"),
            audio_output_dir: audios.join("Translated"),
            text_output_dir: audios.join("SpeechToText"),
        };

        writer.create_directory_structure()?;

        Ok(writer)
    }

    fn create_directory_structure(&self) -> Result<()> {
        for dir in [
            &self.audio_input_dir,
            &self.audio_output_dir,
            &self.text_output_dir,
        ] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    PipelineError::DestinationUnwritable(format!("{:?}: {}", dir, e))
                })?;
                log::info!("ディレクトリを作成しました: {:?}", dir);
            }
        }
        Ok(())
    }

    /// 取り込みフォルダ (inbox) のパス
    pub fn audio_input_dir(&self) -> &Path {
        &self.audio_input_dir
    }

    /// 文字起こしノートを保存する
    ///
    /// 保存先は `SpeechToText/<年>/<月>/<日>/<タイムスタンプ>_<タイトル>.md`。
    /// 本文は引用符で囲んだテキスト、テーマがあれば空行を挟んで
    /// 1行に1つ追記する。
    pub fn save_transcription(
        &self,
        text: &str,
        title_words: &str,
        themes: &[String],
    ) -> Result<PathBuf> {
        self.save_transcription_at(text, title_words, themes, &Local::now())
    }

    /// タイムスタンプを注入できる保存処理の本体
    pub fn save_transcription_at(
        &self,
        text: &str,
        title_words: &str,
        themes: &[String],
        now: &DateTime<Local>,
    ) -> Result<PathBuf> {
        let timestamp = now.format("%Y_%m_%d__%H_%M").to_string();
        let date_dir = create_date_directory(
            &self.text_output_dir,
            &now.format("%Y").to_string(),
            &now.format("%m").to_string(),
            &now.format("%d").to_string(),
        )?;

        let filename = format!("{}_{}.md", timestamp, sanitize_title(title_words));
        let file_path = date_dir.join(filename);

        log::info!("文字起こしノートを保存します: {:?}", file_path);

        let mut content = format!("\"{}\"", text);
        if !themes.is_empty() {
            content.push_str("\n\n");
            content.push_str(&themes.join("\n"));
        }

        fs::write(&file_path, content).map_err(|e| {
            PipelineError::DestinationUnwritable(format!("{:?}: {}", file_path, e))
        })?;

        Ok(file_path)
    }

    /// 処理済み音声を `Translated` 配下へ移動する
    ///
    /// 移動先の日付はファイル名に埋め込まれたタイムスタンプ
    /// (`YYYY_MM_DD__HH_MM`) から取り、無ければ現在日時を使う。
    /// ファイルシステムをまたぐ場合はコピーと削除にフォールバック
    /// する。
    pub fn move_audio_file(&self, source: &Path, title_words: &str) -> Result<PathBuf> {
        self.move_audio_file_at(source, title_words, &Local::now())
    }

    /// タイムスタンプを注入できる移動処理の本体
    pub fn move_audio_file_at(
        &self,
        source: &Path,
        title_words: &str,
        now: &DateTime<Local>,
    ) -> Result<PathBuf> {
        if !source.exists() {
            anyhow::bail!("移動元の音声ファイルが見つかりません: {:?}", source);
        }

        let source_filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let (year, month, day, timestamp) = match extract_date_from_filename(&source_filename) {
            Some((year, month, day)) => {
                // 日付プレフィックスがあるのに分単位のタイムスタンプが
                // 取れないファイル名は不正扱い
                let timestamp = extract_timestamp_from_filename(&source_filename)
                    .ok_or_else(|| {
                        anyhow::anyhow!(
                            "ファイル名のタイムスタンプ形式が不正です: {}",
                            source_filename
                        )
                    })?;
                (year, month, day, timestamp)
            }
            None => (
                now.format("%Y").to_string(),
                now.format("%m").to_string(),
                now.format("%d").to_string(),
                now.format("%Y_%m_%d__%H_%M").to_string(),
            ),
        };

        let date_dir = create_date_directory(&self.audio_output_dir, &year, &month, &day)?;

        let extension = source
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        let new_filename = format!("{}_{}{}", timestamp, sanitize_title(title_words), extension);
        let destination = date_dir.join(new_filename);

        log::info!("音声ファイルを移動します: {:?} -> {:?}", source, destination);

        move_file(source, &destination)?;

        Ok(destination)
    }

    /// 取り込みフォルダ配下の音声ファイルを再帰的に探す
    ///
    /// 対象は m4a / webm / wav。結果はパス順に整列する。
    pub fn find_audio_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_audio_files(&self.audio_input_dir, &mut files)?;
        files.sort();
        Ok(files)
    }
}

fn collect_audio_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)
        .map_err(|e| PipelineError::DestinationUnwritable(format!("{:?}: {}", dir, e)))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_audio_files(&path, files)?;
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// ファイル名から日付成分 (年, 月, 日) を取り出す
fn extract_date_from_filename(filename: &str) -> Option<(String, String, String)> {
    let re = Regex::new(r"(\d{4})_(\d{2})_(\d{2})__").unwrap();
    let caps = re.captures(filename)?;
    Some((caps[1].to_string(), caps[2].to_string(), caps[3].to_string()))
}

/// ファイル名から分単位のタイムスタンプを取り出す
fn extract_timestamp_from_filename(filename: &str) -> Option<String> {
    let re = Regex::new(r"(\d{4}_\d{2}_\d{2}__\d{2}_\d{2})").unwrap();
    let caps = re.captures(filename)?;
    Some(caps[1].to_string())
}

fn create_date_directory(base_dir: &Path, year: &str, month: &str, day: &str) -> Result<PathBuf> {
    let date_dir = base_dir.join(year).join(month).join(day);
    fs::create_dir_all(&date_dir)
        .map_err(|e| PipelineError::DestinationUnwritable(format!("{:?}: {}", date_dir, e)))?;
    Ok(date_dir)
}

/// rename できない場合 (ファイルシステム境界など) はコピー+削除
fn move_file(source: &Path, destination: &Path) -> Result<()> {
    if fs::rename(source, destination).is_ok() {
        return Ok(());
    }

    fs::copy(source, destination).map_err(|e| {
        PipelineError::DestinationUnwritable(format!("{:?}: {}", destination, e))
    })?;
    fs::remove_file(source).map_err(|e| {
        PipelineError::DestinationUnwritable(format!("コピー後の削除に失敗 {:?}: {}", source, e))
    })?;

    Ok(())
}

/// ファイル名に使えない文字を除去し、長すぎるタイトルを切り詰める
fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') {
                '_'
            } else {
                c
            }
        })
        .collect();

    cleaned.trim().chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 8, 6, 14, 30, 15).unwrap()
    }

    #[test]
    fn test_creates_directory_structure() {
        let temp_dir = TempDir::new().unwrap();
        let _writer = VaultWriter::new(temp_dir.path()).unwrap();

        let audios = temp_dir.path().join("Audios");
        assert!(audios.join("Translate").is_dir());
        assert!(audios.join("Translated").is_dir());
        assert!(audios.join("SpeechToText").is_dir());
    }

    #[test]
    fn test_unwritable_vault_root() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("vault");
        std::fs::write(&root, b"not a directory").unwrap();

        let result = VaultWriter::new(&root);
        let err = result.unwrap_err();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::DestinationUnwritable(_))));
    }

    #[test]
    fn test_save_transcription_without_themes() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let path = writer
            .save_transcription_at("hello world", "hello world", &[], &fixed_now())
            .unwrap();

        assert_eq!(
            path,
            temp_dir
                .path()
                .join("Audios")
                .join("SpeechToText")
                .join("2026")
                .join("08")
                .join("06")
                .join("2026_08_06__14_30_hello world.md")
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "\"hello world\"");
    }

    #[test]
    fn test_save_transcription_with_themes() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let themes = vec!["#買い物メモ".to_string(), "#家計簿".to_string()];
        let path = writer
            .save_transcription_at("牛乳を買う", "牛乳を買う", &themes, &fixed_now())
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "\"牛乳を買う\"\n\n#買い物メモ\n#家計簿");
    }

    #[test]
    fn test_save_transcription_write_failure() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        // 年ディレクトリの位置にファイルを置いて書き込みを失敗させる
        let text_dir = temp_dir.path().join("Audios").join("SpeechToText");
        std::fs::write(text_dir.join("2026"), b"in the way").unwrap();

        let result = writer.save_transcription_at("x", "x", &[], &fixed_now());
        let err = result.unwrap_err();
        let kind = err.downcast_ref::<PipelineError>();
        assert!(matches!(kind, Some(PipelineError::DestinationUnwritable(_))));
    }

    #[test]
    fn test_move_audio_file_with_embedded_date() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let source = writer
            .audio_input_dir()
            .join("recording_2025_12_31__23_59_59.wav");
        std::fs::write(&source, b"fake wav").unwrap();

        let dest = writer
            .move_audio_file_at(&source, "年末メモ", &fixed_now())
            .unwrap();

        // ファイル名の日付が優先される
        assert_eq!(
            dest,
            temp_dir
                .path()
                .join("Audios")
                .join("Translated")
                .join("2025")
                .join("12")
                .join("31")
                .join("2025_12_31__23_59_年末メモ.wav")
        );
        assert!(dest.exists());
        assert!(!source.exists());
    }

    #[test]
    fn test_move_audio_file_without_date_uses_now() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let source = writer.audio_input_dir().join("memo.m4a");
        std::fs::write(&source, b"fake m4a").unwrap();

        let dest = writer
            .move_audio_file_at(&source, "memo", &fixed_now())
            .unwrap();

        assert_eq!(
            dest,
            temp_dir
                .path()
                .join("Audios")
                .join("Translated")
                .join("2026")
                .join("08")
                .join("06")
                .join("2026_08_06__14_30_memo.m4a")
        );
    }

    #[test]
    fn test_move_audio_file_invalid_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        // 日付プレフィックスはあるが分単位のタイムスタンプが無い
        let source = writer.audio_input_dir().join("2026_08_06__x.wav");
        std::fs::write(&source, b"fake wav").unwrap();

        let result = writer.move_audio_file_at(&source, "x", &fixed_now());
        assert!(result.is_err());
        // 移動元は残る
        assert!(source.exists());
    }

    #[test]
    fn test_move_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let source = writer.audio_input_dir().join("ghost.wav");
        let result = writer.move_audio_file_at(&source, "ghost", &fixed_now());
        assert!(result.is_err());
    }

    #[test]
    fn test_find_audio_files() {
        let temp_dir = TempDir::new().unwrap();
        let writer = VaultWriter::new(temp_dir.path()).unwrap();

        let inbox = writer.audio_input_dir().to_path_buf();
        std::fs::write(inbox.join("a.wav"), b"").unwrap();
        std::fs::write(inbox.join("b.m4a"), b"").unwrap();
        std::fs::write(inbox.join("c.webm"), b"").unwrap();
        std::fs::write(inbox.join("d.txt"), b"").unwrap();
        std::fs::create_dir_all(inbox.join("2026").join("08").join("06")).unwrap();
        std::fs::write(inbox.join("2026").join("08").join("06").join("e.WAV"), b"").unwrap();

        let files = writer.find_audio_files().unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(files.len(), 4);
        assert!(names.contains(&"a.wav".to_string()));
        assert!(names.contains(&"b.m4a".to_string()));
        assert!(names.contains(&"c.webm".to_string()));
        assert!(names.contains(&"e.WAV".to_string()));
        assert!(!names.contains(&"d.txt".to_string()));
    }

    #[test]
    fn test_extract_date_from_filename() {
        assert_eq!(
            extract_date_from_filename("recording_2026_08_06__14_30_15.wav"),
            Some(("2026".to_string(), "08".to_string(), "06".to_string()))
        );
        assert_eq!(extract_date_from_filename("memo.m4a"), None);
    }

    #[test]
    fn test_sanitize_title() {
        assert_eq!(sanitize_title("hello world"), "hello world");
        assert_eq!(sanitize_title("a/b\\c:d"), "a_b_c_d");

        // 40文字に切り詰め
        let long = "あ".repeat(100);
        assert_eq!(sanitize_title(&long).chars().count(), 40);
    }
}
